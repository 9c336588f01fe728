//! Second pass: resolve symbolic references and produce the machine
//! words for every instruction record.

use crate::collect::{Inst, Program};
use crate::msg::Msgs;
use crate::parser::Operand;
use crate::symtab::{Kind, SymTab};
use q10::{word, Are};

pub fn encode(prog: &mut Program, msgs: &mut Msgs) {
    let Program { symtab, insts, .. } = prog;
    for inst in insts.iter_mut() {
        encode_inst(inst, symtab, msgs);
    }
    for (name, sym) in symtab.iter() {
        if sym.kind == Kind::Entry(None) {
            msgs.error_at_end(format!(
                "Entry symbol `{name}` was declared but never defined"
            ));
        }
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Src,
    Dest,
}

fn encode_inst(inst: &mut Inst, symtab: &mut SymTab, msgs: &mut Msgs) {
    let (src, dest) = match inst.operands.as_slice() {
        [] => (None, None),
        // A lone operand is the destination.
        [dest] => (None, Some(dest)),
        [src, dest] => (Some(src), Some(dest)),
        _ => unreachable!(),
    };

    let mut words = vec![word::opcode_word(
        inst.op,
        src.map(Operand::mode),
        dest.map(Operand::mode),
    )];

    if let (Some(Operand::Reg(s)), Some(Operand::Reg(d))) = (src, dest) {
        // Two register operands share one word.
        words.push(word::regs(s.num(), d.num()));
    } else {
        for (operand, slot) in [(src, Slot::Src), (dest, Slot::Dest)] {
            let Some(operand) = operand else { continue };
            if !push_operand(operand, slot, inst.addr, inst.line_no, &mut words, symtab, msgs) {
                return;
            }
        }
    }

    if words.len() as u16 != inst.len {
        msgs.error_at(
            format!(
                "Internal error: `{}` encoded to {} words, expected {}",
                inst.op,
                words.len(),
                inst.len
            ),
            inst.line_no,
        );
        return;
    }
    inst.words = words;
}

fn push_operand(
    operand: &Operand,
    slot: Slot,
    base: u16,
    line_no: usize,
    words: &mut Vec<u16>,
    symtab: &mut SymTab,
    msgs: &mut Msgs,
) -> bool {
    match operand {
        Operand::Imm(v) => words.push(word::field(*v as u16, Are::Absolute)),
        Operand::Reg(r) => words.push(match slot {
            Slot::Src => word::regs(r.num(), 0),
            Slot::Dest => word::regs(0, r.num()),
        }),
        Operand::Direct(name) => {
            return push_symbol(name, base, line_no, words, symtab, msgs);
        }
        Operand::Matrix { name, row, col } => {
            if !push_symbol(name, base, line_no, words, symtab, msgs) {
                return false;
            }
            words.push(word::regs(row.num(), col.num()));
        }
    }
    true
}

/// The address word of a direct or matrix reference. External references
/// are tagged `b` and their emission address recorded for the `.ext`
/// listing; everything local is relocatable.
fn push_symbol(
    name: &str,
    base: u16,
    line_no: usize,
    words: &mut Vec<u16>,
    symtab: &mut SymTab,
    msgs: &mut Msgs,
) -> bool {
    let Some(sym) = symtab.get(name) else {
        msgs.error_at(format!("Undefined symbol `{name}`"), line_no);
        return false;
    };
    let external = sym.kind == Kind::External;
    let are = if external {
        Are::External
    } else {
        Are::Relocatable
    };
    words.push(word::field(sym.addr, are));
    if external {
        symtab.record_use(name, base + words.len() as u16 - 1);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect;

    fn assemble(src: &[&str]) -> (Program, Msgs) {
        let lines: Vec<String> = src.iter().map(|s| s.to_string()).collect();
        let mut msgs = Msgs::new("t.am");
        let mut prog = collect(&lines, &mut msgs);
        if !msgs.has_error() {
            encode(&mut prog, &mut msgs);
        }
        (prog, msgs)
    }

    fn rendered(inst: &Inst) -> Vec<String> {
        inst.words.iter().map(|w| word::encode(*w as i32)).collect()
    }

    #[test]
    fn test_two_register_share() {
        let (prog, msgs) = assemble(&["mov r3, r5"]);
        assert!(!msgs.has_error());
        let inst = &prog.insts[0];
        assert_eq!(inst.len, 2);
        assert_eq!(rendered(inst)[0], "aadda");
        // r3 in bits 9..6, r5 in bits 5..2
        assert_eq!((inst.words[1] >> 6) & 0xF, 3);
        assert_eq!((inst.words[1] >> 2) & 0xF, 5);
        assert_eq!(inst.words[1] & 0b11, 0);
    }

    #[test]
    fn test_external_reference() {
        let (prog, msgs) = assemble(&[".extern FOO", "jmp FOO"]);
        assert!(!msgs.has_error());
        let inst = &prog.insts[0];
        assert_eq!(inst.addr, 100);
        // reference word: address bits zero, ARE external
        assert_eq!(rendered(inst)[1], "aaaab");
        assert_eq!(prog.symtab.get("FOO").unwrap().uses, vec![101]);
    }

    #[test]
    fn test_entry_resolution() {
        let (prog, msgs) = assemble(&[".entry MAIN", "MAIN: stop"]);
        assert!(!msgs.has_error());
        assert_eq!(prog.symtab.get("MAIN").unwrap().addr, 100);
    }

    #[test]
    fn test_undefined_entry() {
        let (_, msgs) = assemble(&[".entry GHOST", "stop"]);
        assert!(msgs.has_error());
    }

    #[test]
    fn test_undefined_symbol() {
        let (_, msgs) = assemble(&["jmp NOWHERE"]);
        assert!(msgs.has_error());
    }

    #[test]
    fn test_immediate_boundaries() {
        let (prog, msgs) = assemble(&["prn #-512", "prn #511"]);
        assert!(!msgs.has_error());
        assert_eq!(rendered(&prog.insts[0])[1], "caaaa");
        assert_eq!(rendered(&prog.insts[1])[1], "bddda");
    }

    #[test]
    fn test_single_operand_in_dest_slot() {
        let (prog, msgs) = assemble(&["inc r3"]);
        assert!(!msgs.has_error());
        let inst = &prog.insts[0];
        // opcode 7, src mode 0, dest mode 3 (register)
        assert_eq!(inst.words[0], 7 << 6 | 3 << 2);
        // the register number sits in the destination bits
        assert_eq!(inst.words[1], 3 << 2);
    }

    #[test]
    fn test_register_slots() {
        let (prog, msgs) = assemble(&[".extern L", "mov r4, L", "mov L, r4"]);
        assert!(!msgs.has_error());
        // source register in bits 9..6
        assert_eq!(prog.insts[0].words[1], 4 << 6);
        // destination register in bits 5..2
        assert_eq!(prog.insts[1].words[2], 4 << 2);
    }

    #[test]
    fn test_matrix_words() {
        let (prog, msgs) = assemble(&["M: .mat [2][2]", "mov M[r2][r7], r0"]);
        assert!(!msgs.has_error());
        let inst = &prog.insts[0];
        assert_eq!(inst.len, 4);
        // first word: the base label, relocatable; M sits at ICF = 104
        assert_eq!(inst.words[1], word::field(104, Are::Relocatable));
        // second word: row r2 in bits 9..6, column r7 in bits 5..2
        assert_eq!(inst.words[2], 2 << 6 | 7 << 2);
    }

    #[test]
    fn test_direct_label_word() {
        let (prog, msgs) = assemble(&["MAIN: jmp MAIN"]);
        assert!(!msgs.has_error());
        assert_eq!(prog.insts[0].words[1], word::field(100, Are::Relocatable));
    }

    #[test]
    fn test_external_usage_order() {
        let (prog, msgs) = assemble(&[".extern F", "jmp F", "cmp F, F"]);
        assert!(!msgs.has_error());
        // jmp word at 101; cmp source word at 103, dest word at 104
        assert_eq!(prog.symtab.get("F").unwrap().uses, vec![101, 103, 104]);
    }

    #[test]
    fn test_length_consistency() {
        let (prog, msgs) = assemble(&[".extern L", "cmp L[r1][r2], #4", "mov r1, r2", "stop"]);
        assert!(!msgs.has_error());
        for inst in &prog.insts {
            assert_eq!(inst.words.len() as u16, inst.len);
            assert!((1..=5).contains(&inst.len));
            // every instruction word ends in a legal ARE digit
            for w in &inst.words {
                assert!(w & 0b11 != 3, "word {w:#x} carries an undefined ARE tag");
            }
        }
    }
}
