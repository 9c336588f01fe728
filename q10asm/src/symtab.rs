use crate::msg::Msgs;
use crate::parser::{self, Line};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Code,
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Code,
    Data,
    External,
    /// Exported symbol. `None` until its local definition arrives; a
    /// unit that never defines it is in error.
    Entry(Option<Section>),
}

#[derive(Debug)]
pub struct Symbol {
    pub addr: u16,
    pub kind: Kind,
    /// Emission addresses of words referencing this symbol, in source
    /// order. Externals only.
    pub uses: Vec<u16>,
}

impl Symbol {
    fn new(addr: u16, kind: Kind) -> Self {
        Symbol {
            addr,
            kind,
            uses: Vec::new(),
        }
    }
}

/// Label dictionary with stable (insertion) iteration order, so the
/// `.ent` and `.ext` listings come out in source order.
#[derive(Debug, Default)]
pub struct SymTab {
    map: IndexMap<String, Symbol>,
}

impl SymTab {
    pub fn new() -> Self {
        SymTab::default()
    }

    fn check_name(name: &str, line: &Line, msgs: &mut Msgs) -> bool {
        if parser::reserved(name) {
            msgs.error(
                format!("`{name}` is a reserved word and cannot name a symbol"),
                line,
            );
            return false;
        }
        if !parser::valid_label(name) {
            msgs.error(
                format!(
                    "Invalid label `{name}`: a letter then letters and digits, at most {} chars",
                    parser::MAX_LABEL
                ),
                line,
            );
            return false;
        }
        true
    }

    /// A local definition: a label on an instruction or data directive.
    pub fn define(&mut self, name: &str, addr: u16, sec: Section, line: &Line, msgs: &mut Msgs) {
        if !Self::check_name(name, line, msgs) {
            return;
        }
        match self.map.get_mut(name) {
            None => {
                let kind = match sec {
                    Section::Code => Kind::Code,
                    Section::Data => Kind::Data,
                };
                self.map.insert(name.to_string(), Symbol::new(addr, kind));
            }
            Some(sym) => match sym.kind {
                Kind::External => msgs.error(
                    format!("Symbol `{name}` was declared external and is now defined locally"),
                    line,
                ),
                Kind::Code | Kind::Data | Kind::Entry(Some(_)) => {
                    msgs.error(format!("Symbol `{name}` is already defined"), line)
                }
                Kind::Entry(None) => {
                    sym.addr = addr;
                    sym.kind = Kind::Entry(Some(sec));
                }
            },
        }
    }

    pub fn declare_extern(&mut self, name: &str, line: &Line, msgs: &mut Msgs) {
        if !Self::check_name(name, line, msgs) {
            return;
        }
        match self.map.get(name) {
            None => {
                self.map
                    .insert(name.to_string(), Symbol::new(0, Kind::External));
            }
            // Declaring the same name external twice is harmless.
            Some(sym) if sym.kind == Kind::External => {}
            Some(sym) if matches!(sym.kind, Kind::Entry(_)) => msgs.error(
                format!("Symbol `{name}` cannot be both .entry and .extern"),
                line,
            ),
            Some(_) => msgs.error(
                format!("Symbol `{name}` is defined locally and declared external"),
                line,
            ),
        }
    }

    pub fn declare_entry(&mut self, name: &str, line: &Line, msgs: &mut Msgs) {
        if !Self::check_name(name, line, msgs) {
            return;
        }
        match self.map.get_mut(name) {
            None => {
                self.map
                    .insert(name.to_string(), Symbol::new(0, Kind::Entry(None)));
            }
            Some(sym) => match sym.kind {
                Kind::External => msgs.error(
                    format!("Symbol `{name}` cannot be both .entry and .extern"),
                    line,
                ),
                Kind::Code => sym.kind = Kind::Entry(Some(Section::Code)),
                Kind::Data => sym.kind = Kind::Entry(Some(Section::Data)),
                Kind::Entry(_) => {}
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.map.get(name)
    }

    /// End of the first pass: data addresses were collected as offsets
    /// from zero and move up past the instruction image.
    pub fn relocate(&mut self, icf: u16) {
        for sym in self.map.values_mut() {
            if matches!(sym.kind, Kind::Data | Kind::Entry(Some(Section::Data))) {
                sym.addr += icf;
            }
        }
    }

    /// Record the emission address of a word that references an external
    /// symbol. Calling this on anything else is a bug in the caller.
    pub fn record_use(&mut self, name: &str, addr: u16) {
        let sym = self.map.get_mut(name).expect("symbol vanished");
        assert_eq!(sym.kind, Kind::External, "usage recorded on `{name}`");
        sym.uses.push(addr);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.map.iter()
    }
}
