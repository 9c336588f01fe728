use crate::mode::Mode;
use num_enum::IntoPrimitive;
use strum::{Display, EnumString};

/// The 16 mnemonics, in encoding order: the discriminant is the 4-bit
/// opcode field of the first instruction word.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, EnumString, Display,
)]
#[repr(u8)]
#[strum(serialize_all = "lowercase")]
pub enum Opcode {
    Mov,
    Cmp,
    Add,
    Sub,
    Not,
    Clr,
    Lea,
    Inc,
    Dec,
    Jmp,
    Bne,
    Red,
    Prn,
    Jsr,
    Rts,
    Stop,
}

use crate::mode::Mode::*;

const ALL: &[Mode] = &[Imm, Direct, Matrix, Reg];
const STORABLE: &[Mode] = &[Direct, Matrix, Reg];
const JUMPABLE: &[Mode] = &[Direct, Matrix];

impl Opcode {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.parse::<Self>() {
            Ok(op) => Ok(op),
            Err(_) => Err(format!("Unknown operation: {s}")),
        }
    }

    pub fn code(self) -> u8 {
        self.into()
    }

    /// Legal addressing modes for the source operand. Empty means the
    /// instruction takes no source operand.
    pub fn src_modes(self) -> &'static [Mode] {
        match self {
            Opcode::Mov | Opcode::Cmp | Opcode::Add | Opcode::Sub => ALL,
            Opcode::Lea => JUMPABLE,
            _ => &[],
        }
    }

    /// Legal addressing modes for the destination operand. Empty means
    /// the instruction takes no destination operand.
    pub fn dest_modes(self) -> &'static [Mode] {
        match self {
            Opcode::Cmp | Opcode::Prn => ALL,
            Opcode::Mov
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Lea
            | Opcode::Not
            | Opcode::Clr
            | Opcode::Inc
            | Opcode::Dec
            | Opcode::Red => STORABLE,
            Opcode::Jmp | Opcode::Bne | Opcode::Jsr => JUMPABLE,
            Opcode::Rts | Opcode::Stop => &[],
        }
    }

    /// Number of operands the instruction requires.
    pub fn arity(self) -> usize {
        let src = if self.src_modes().is_empty() { 0 } else { 1 };
        let dest = if self.dest_modes().is_empty() { 0 } else { 1 };
        src + dest
    }
}
