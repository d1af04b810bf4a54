use harrow_core::Meta;

use crate::opcode::{HALT_PC, LONG_PC, Op, Opcode};

#[test]
fn goto_round_trip() {
    let cell = Opcode::goto(b'a', b'z', 0x1234);
    assert_eq!(
        cell.decode(false),
        Op::Goto {
            lo: b'a',
            hi: b'z',
            pc: 0x1234
        }
    );
}

#[test]
fn goto_full_byte_range() {
    let cell = Opcode::goto(0x00, 0xff, 7);
    assert_eq!(
        cell.decode(false),
        Op::Goto {
            lo: 0x00,
            hi: 0xff,
            pc: 7
        }
    );
}

#[test]
fn goto_on_byte_0xff_is_not_special() {
    // lo == hi == 0xFF is a legitimate edge and must decode as GOTO
    let cell = Opcode::goto(0xff, 0xff, 42);
    assert_eq!(
        cell.decode(false),
        Op::Goto {
            lo: 0xff,
            hi: 0xff,
            pc: 42
        }
    );
}

#[test]
fn specials_round_trip() {
    assert_eq!(Opcode::take(9).decode(false), Op::Take(9));
    assert_eq!(Opcode::redo().decode(false), Op::Redo);
    assert_eq!(Opcode::head(3).decode(false), Op::Head(3));
    assert_eq!(Opcode::tail(3).decode(false), Op::Tail(3));
    assert_eq!(Opcode::halt().decode(false), Op::Halt);
}

#[test]
fn meta_goto_round_trip() {
    for meta in [Meta::BOL, Meta::EOL, Meta::BOB, Meta::EOB, Meta::WBE, Meta::DED] {
        let cell = Opcode::goto_meta(meta, 0x0042);
        assert_eq!(cell.decode(false), Op::GotoMeta { meta, pc: 0x0042 });
    }
}

#[test]
fn long_extension_decoding() {
    let goto = Opcode::goto(b'x', b'x', LONG_PC);
    assert!(goto.has_long_target());
    let ext = Opcode::long(0xdead_beef);
    assert_eq!(ext.decode(true), Op::Long(0xdead_beef));
}

#[test]
fn halt_pc_sentinel_survives() {
    let cell = Opcode::goto(0, 9, HALT_PC);
    assert_eq!(
        cell.decode(false),
        Op::Goto {
            lo: 0,
            hi: 9,
            pc: HALT_PC
        }
    );
    assert!(!cell.has_long_target());
}

#[test]
fn meta_long_target() {
    let cell = Opcode::goto_meta(Meta::EOB, LONG_PC);
    assert!(cell.has_long_target());
}
