//! 32-bit bytecode cells.
//!
//! Cell layout is `lo << 24 | hi << 16 | pc` for byte-range GOTOs, with
//! `lo <= hi`. Since a real range can never have `lo > hi`, that space
//! encodes everything else:
//!
//! - `(0xFF, sub)` with `sub < 0xFF`: TAKE / REDO / HEAD / TAIL / HALT,
//!   argument in the low 16 bits.
//! - `(0xFE, m)` with `m <= 0x0F`: GOTO on the meta symbol `0x100 + m`.
//!
//! The 16-bit pc field reserves two sentinels: [`HALT_PC`] (edge leads
//! nowhere) and [`LONG_PC`] (the next cell is a raw 32-bit target).

use harrow_core::Meta;

/// pc sentinel: this edge halts the machine.
pub const HALT_PC: u16 = 0xffff;

/// pc sentinel: the next cell holds the real 32-bit target.
pub const LONG_PC: u16 = 0xfffe;

const SPECIAL: u8 = 0xff;
const META_TAG: u8 = 0xfe;

const SUB_TAKE: u8 = 0x00;
const SUB_REDO: u8 = 0x01;
const SUB_HEAD: u8 = 0x02;
const SUB_TAIL: u8 = 0x03;
const SUB_HALT: u8 = 0x04;

/// One 32-bit bytecode cell.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Opcode(pub u32);

/// Decoded cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    /// Accept with a label; the machine keeps running for longest match.
    Take(u16),
    /// Negated accept marker from a `(?^...)` pattern.
    Redo,
    /// Lookahead begin for the given id.
    Head(u16),
    /// Lookahead end for the given id.
    Tail(u16),
    /// No transition; the machine stops here.
    Halt,
    /// On next byte `c` with `lo <= c <= hi` jump to `pc`.
    Goto { lo: u8, hi: u8, pc: u16 },
    /// Evaluate the meta predicate at the current position; jump on hold.
    GotoMeta { meta: Meta, pc: u16 },
    /// Extension cell: raw 32-bit jump target for the preceding GOTO.
    Long(u32),
}

impl Opcode {
    pub fn take(label: u16) -> Opcode {
        Opcode(cell(SPECIAL, SUB_TAKE, label))
    }

    pub fn redo() -> Opcode {
        Opcode(cell(SPECIAL, SUB_REDO, 0))
    }

    pub fn head(id: u16) -> Opcode {
        Opcode(cell(SPECIAL, SUB_HEAD, id))
    }

    pub fn tail(id: u16) -> Opcode {
        Opcode(cell(SPECIAL, SUB_TAIL, id))
    }

    pub fn halt() -> Opcode {
        Opcode(cell(SPECIAL, SUB_HALT, 0))
    }

    pub fn goto(lo: u8, hi: u8, pc: u16) -> Opcode {
        debug_assert!(lo <= hi);
        Opcode(cell(lo, hi, pc))
    }

    pub fn goto_meta(meta: Meta, pc: u16) -> Opcode {
        Opcode(cell(META_TAG, (meta as u16 - 0x100) as u8, pc))
    }

    /// Raw extension cell following a GOTO whose pc is [`LONG_PC`].
    pub fn long(target: u32) -> Opcode {
        Opcode(target)
    }

    /// Decode this cell. `after_long_goto` distinguishes an extension
    /// cell from whatever its bits would otherwise mean.
    pub fn decode(self, after_long_goto: bool) -> Op {
        if after_long_goto {
            return Op::Long(self.0);
        }
        let lo = (self.0 >> 24) as u8;
        let hi = (self.0 >> 16) as u8;
        let arg = self.0 as u16;
        if lo == SPECIAL && hi < SPECIAL {
            match hi {
                SUB_TAKE => Op::Take(arg),
                SUB_REDO => Op::Redo,
                SUB_HEAD => Op::Head(arg),
                SUB_TAIL => Op::Tail(arg),
                _ => Op::Halt,
            }
        } else if lo == META_TAG && hi <= 0x0f {
            let meta = Meta::from_u16(0x100 + hi as u16).expect("meta tag in range");
            Op::GotoMeta { meta, pc: arg }
        } else {
            Op::Goto { lo, hi, pc: arg }
        }
    }

    /// True when this cell is a GOTO (byte or meta) whose target is the
    /// following extension cell.
    pub fn has_long_target(self) -> bool {
        matches!(
            self.decode(false),
            Op::Goto { pc: LONG_PC, .. } | Op::GotoMeta { pc: LONG_PC, .. }
        )
    }
}

fn cell(lo: u8, hi: u8, arg: u16) -> u32 {
    ((lo as u32) << 24) | ((hi as u32) << 16) | arg as u32
}

impl std::fmt::Debug for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.decode(false))
    }
}
