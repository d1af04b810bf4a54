use crate::dump::dump;
use crate::opcode::{HALT_PC, LONG_PC, Opcode};
use crate::predictor::Predictor;
use crate::program::Program;

fn program(cells: Vec<Opcode>) -> Program {
    Program::new(
        cells,
        Predictor::default(),
        vec!["ab".to_string()],
        "ab".to_string(),
    )
}

#[test]
fn dump_renders_each_cell() {
    let p = program(vec![
        Opcode::take(1),
        Opcode::goto(b'a', b'b', 3),
        Opcode::goto(0, 9, HALT_PC),
        Opcode::halt(),
    ]);
    let text = dump(&p);
    assert!(text.contains("TAKE 1"));
    assert!(text.contains("GOTO 'a'..'b' -> 0003"));
    assert!(text.contains("-> HALT"));
    assert!(text.lines().any(|l| l.ends_with("HALT")));
}

#[test]
fn dump_decodes_long_extension() {
    let p = program(vec![
        Opcode::goto(b'x', b'x', LONG_PC),
        Opcode::long(0x0001_0000),
    ]);
    let text = dump(&p);
    assert!(text.contains("-> LONG"));
    assert!(text.contains("LONG 00010000"));
}

#[test]
fn subpattern_mapping() {
    let p = program(vec![Opcode::halt()]);
    assert_eq!(p.subpattern(0), Some("ab"));
    assert_eq!(p.subpattern(1), Some("ab"));
    assert_eq!(p.subpattern(2), None);
    assert_eq!(p.size(), 1);
}

#[test]
fn code_bytes_are_little_endian() {
    let p = program(vec![Opcode::goto(0x01, 0x02, 0x0304)]);
    let bytes = p.code_bytes();
    assert_eq!(bytes, vec![0x04, 0x03, 0x02, 0x01]);
    let cells = Program::cells_from_bytes(&bytes).unwrap();
    assert_eq!(cells[0], p.cells()[0]);
}
