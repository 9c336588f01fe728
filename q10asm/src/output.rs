//! Renderers for the three output listings. They build strings; the
//! driver decides where they land on disk.

use crate::collect::Program;
use crate::symtab::Kind;
use itertools::Itertools;
use q10::{word, MEMORY_START};

/// The `.ob` object image. Header: instruction and data word counts in
/// base-4 with leading `a`s stripped. Body: one `address<TAB>word` line
/// per word, instructions first, then data above the instruction image.
pub fn object(prog: &Program) -> String {
    let mut out = String::new();
    let icf_count = prog.icf - MEMORY_START;
    out.push_str(&format!(
        "{} {}\n",
        word::strip(&word::encode(icf_count as i32)),
        word::strip(&word::encode(prog.dcf as i32)),
    ));
    for inst in &prog.insts {
        for (i, w) in inst.words.iter().enumerate() {
            out.push_str(&format!(
                "{}\t{}\n",
                word::encode((inst.addr + i as u16) as i32),
                word::encode(*w as i32),
            ));
        }
    }
    for d in &prog.data {
        out.push_str(&format!(
            "{}\t{}\n",
            word::encode((prog.icf + d.offset) as i32),
            word::encode(d.value as i32),
        ));
    }
    out
}

/// The `.ent` listing: one line per exported symbol. `None` when the
/// unit exports nothing, so no file gets created.
pub fn entries(prog: &Program) -> Option<String> {
    let lines: Vec<String> = prog
        .symtab
        .iter()
        .filter(|(_, sym)| matches!(sym.kind, Kind::Entry(Some(_))))
        .map(|(name, sym)| format!("{} {}", name, word::encode(sym.addr as i32)))
        .collect();
    (!lines.is_empty()).then(|| lines.into_iter().join("\n") + "\n")
}

/// The `.ext` listing: one line per external usage site, in the order
/// the second pass recorded them. `None` when nothing external was used.
pub fn externals(prog: &Program) -> Option<String> {
    let lines: Vec<String> = prog
        .symtab
        .iter()
        .filter(|(_, sym)| sym.kind == Kind::External)
        .flat_map(|(name, sym)| {
            sym.uses
                .iter()
                .map(move |use_addr| format!("{} {}", name, word::encode(*use_addr as i32)))
        })
        .collect();
    (!lines.is_empty()).then(|| lines.into_iter().join("\n") + "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::collect;
    use crate::encode::encode;
    use crate::msg::Msgs;

    fn assemble(src: &[&str]) -> Program {
        let lines: Vec<String> = src.iter().map(|s| s.to_string()).collect();
        let mut msgs = Msgs::new("t.am");
        let mut prog = collect(&lines, &mut msgs);
        assert!(!msgs.has_error());
        encode(&mut prog, &mut msgs);
        assert!(!msgs.has_error());
        prog
    }

    #[test]
    fn test_object_layout() {
        let prog = assemble(&["stop", "X: .data 7"]);
        let ob = object(&prog);
        let lines: Vec<&str> = ob.lines().collect();
        assert_eq!(lines[0], "b b"); // one instruction word, one data word
        assert_eq!(lines[1], "abcba\tddaaa"); // stop at 100
        assert_eq!(lines[2], "abcbb\taaabd"); // 7 at 101
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_object_header_zero_data() {
        let prog = assemble(&["stop"]);
        let ob = object(&prog);
        assert_eq!(ob.lines().next().unwrap(), "b a");
    }

    #[test]
    fn test_object_negative_data() {
        let prog = assemble(&["stop", ".data -1, 0"]);
        let lines: Vec<String> = object(&prog).lines().map(String::from).collect();
        assert_eq!(lines[2], "abcbb\tddddd");
        assert_eq!(lines[3], "abcbc\taaaaa");
    }

    #[test]
    fn test_entries_listing() {
        let prog = assemble(&[".entry MAIN", "MAIN: stop"]);
        assert_eq!(entries(&prog).unwrap(), "MAIN abcba\n");
    }

    #[test]
    fn test_no_entries_no_file() {
        let prog = assemble(&["stop"]);
        assert_eq!(entries(&prog), None);
    }

    #[test]
    fn test_externals_listing() {
        let prog = assemble(&[".extern FOO", "jmp FOO", "jsr FOO"]);
        assert_eq!(externals(&prog).unwrap(), "FOO abcbb\nFOO abcbd\n");
    }

    #[test]
    fn test_declared_but_unused_external() {
        let prog = assemble(&[".extern FOO", "stop"]);
        assert_eq!(externals(&prog), None);
    }
}
