//! First pass over the expanded line stream: build the symbol table,
//! gather instruction and data records, and account instruction lengths
//! so the second pass can encode without re-reading text.

use crate::msg::Msgs;
use crate::parser::{Body, Line, Operand, Stmt, MAX_LINE};
use crate::symtab::{Section, SymTab};
use q10::{Opcode, MEMORY_START};

#[derive(Debug)]
pub struct Inst {
    pub line_no: usize,
    pub addr: u16,
    pub op: Opcode,
    pub operands: Vec<Operand>,
    /// Length in words, 1..=5.
    pub len: u16,
    /// Opcode word plus operand words, filled in by the second pass.
    pub words: Vec<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWord {
    /// Offset from the start of the data image (the DC at append time).
    pub offset: u16,
    pub value: i16,
}

#[derive(Debug)]
pub struct Program {
    pub symtab: SymTab,
    pub insts: Vec<Inst>,
    pub data: Vec<DataWord>,
    /// Final instruction counter; includes the load address.
    pub icf: u16,
    pub dcf: u16,
}

pub fn collect(lines: &[String], msgs: &mut Msgs) -> Program {
    let mut symtab = SymTab::new();
    let mut insts: Vec<Inst> = Vec::new();
    let mut data: Vec<DataWord> = Vec::new();
    let mut ic: u16 = MEMORY_START;
    let mut dc: u16 = 0;

    for (idx, raw) in lines.iter().enumerate() {
        let line = Line { no: idx + 1, raw };
        if raw.len() > MAX_LINE {
            msgs.error(
                format!("Line exceeds maximum length of {MAX_LINE} characters"),
                &line,
            );
            continue;
        }
        let Some(stmt) = Stmt::parse(&line, msgs) else {
            continue;
        };
        match stmt.body {
            Some(Body::Inst { op, operands }) => {
                if let Some(label) = &stmt.label {
                    symtab.define(label, ic, Section::Code, &line, msgs);
                }
                let Some(len) = check_inst(op, &operands, &line, msgs) else {
                    continue;
                };
                insts.push(Inst {
                    line_no: line.no,
                    addr: ic,
                    op,
                    operands,
                    len,
                    words: Vec::new(),
                });
                ic += len;
            }
            Some(Body::Data(values)) => {
                if let Some(label) = &stmt.label {
                    symtab.define(label, dc, Section::Data, &line, msgs);
                }
                for value in values {
                    data.push(DataWord { offset: dc, value });
                    dc += 1;
                }
            }
            Some(Body::Extern(name)) => symtab.declare_extern(&name, &line, msgs),
            Some(Body::Entry(name)) => symtab.declare_entry(&name, &line, msgs),
            None => {}
        }
    }

    symtab.relocate(ic);
    Program {
        symtab,
        insts,
        data,
        icf: ic,
        dcf: dc,
    }
}

/// Arity and addressing-mode legality; on success the instruction's
/// length in words. A lone operand sits in the destination slot.
fn check_inst(op: Opcode, operands: &[Operand], line: &Line, msgs: &mut Msgs) -> Option<u16> {
    if operands.len() != op.arity() {
        msgs.error(
            format!(
                "`{op}` expects {} operand(s), found {}",
                op.arity(),
                operands.len()
            ),
            line,
        );
        return None;
    }
    let (src, dest) = match operands {
        [] => (None, None),
        [dest] => (None, Some(dest)),
        [src, dest] => (Some(src), Some(dest)),
        _ => unreachable!(),
    };
    let mut ok = true;
    if let Some(src) = src {
        if !op.src_modes().contains(&src.mode()) {
            msgs.error(
                format!("Illegal addressing mode for source operand of `{op}`"),
                line,
            );
            ok = false;
        }
    }
    if let Some(dest) = dest {
        if !op.dest_modes().contains(&dest.mode()) {
            msgs.error(
                format!("Illegal addressing mode for destination operand of `{op}`"),
                line,
            );
            ok = false;
        }
    }
    ok.then(|| length(operands))
}

/// One opcode word, plus one word per operand (two for a matrix access).
/// Two register operands share a single word.
fn length(operands: &[Operand]) -> u16 {
    if let [Operand::Reg(_), Operand::Reg(_)] = operands {
        return 2;
    }
    1 + operands
        .iter()
        .map(|operand| match operand {
            Operand::Matrix { .. } => 2,
            _ => 1,
        })
        .sum::<u16>()
}
