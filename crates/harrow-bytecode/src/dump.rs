//! Human-readable bytecode dump for debugging.

use std::fmt::Write as _;

use crate::opcode::{HALT_PC, LONG_PC, Op};
use crate::program::Program;

fn write_byte(out: &mut String, b: u8) {
    if b.is_ascii_graphic() {
        let _ = write!(out, "'{}'", b as char);
    } else {
        let _ = write!(out, "{b:#04x}");
    }
}

fn write_target(out: &mut String, pc: u16) {
    match pc {
        HALT_PC => out.push_str(" -> HALT"),
        LONG_PC => out.push_str(" -> LONG"),
        _ => {
            let _ = write!(out, " -> {pc:04x}");
        }
    }
}

/// Render the program's cells, one per line, with decoded operands.
pub fn dump(program: &Program) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "pattern: {}", program.pattern());
    let _ = writeln!(
        out,
        "cells: {}  predictor: {:?}",
        program.cells().len(),
        program.predictor()
    );
    let mut after_long = false;
    for (pc, cell) in program.cells().iter().enumerate() {
        let _ = write!(out, "{pc:06x}  ");
        let op = cell.decode(after_long);
        after_long = cell.has_long_target() && !after_long;
        match op {
            Op::Take(label) => {
                let _ = write!(out, "TAKE {label}");
            }
            Op::Redo => out.push_str("REDO"),
            Op::Head(id) => {
                let _ = write!(out, "HEAD {id}");
            }
            Op::Tail(id) => {
                let _ = write!(out, "TAIL {id}");
            }
            Op::Halt => out.push_str("HALT"),
            Op::Goto { lo, hi, pc } => {
                out.push_str("GOTO ");
                write_byte(&mut out, lo);
                if lo != hi {
                    out.push_str("..");
                    write_byte(&mut out, hi);
                }
                write_target(&mut out, pc);
            }
            Op::GotoMeta { meta, pc } => {
                let _ = write!(out, "GOTO {}", meta.label());
                write_target(&mut out, pc);
            }
            Op::Long(target) => {
                let _ = write!(out, "LONG {target:08x}");
            }
        }
        out.push('\n');
    }
    out
}
