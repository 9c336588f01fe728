use crate::parser::Line;
use color_print::ceprintln;

// ----------------------------------------------------------------------------

/// Per-unit diagnostic collector. Errors gate the output files; warnings
/// do not.
#[derive(Debug)]
pub struct Msgs {
    file: String,
    msgs: Vec<Msg>,
}

impl Msgs {
    pub fn new(file: impl Into<String>) -> Self {
        Msgs {
            file: file.into(),
            msgs: Vec::new(),
        }
    }

    pub fn error(&mut self, text: String, line: &Line) {
        self.msgs.push(Msg {
            kind: MsgKind::Error,
            text,
            no: Some(line.no),
            raw: Some(line.raw.to_string()),
        });
    }

    pub fn warn(&mut self, text: String, line: &Line) {
        self.msgs.push(Msg {
            kind: MsgKind::Warn,
            text,
            no: Some(line.no),
            raw: Some(line.raw.to_string()),
        });
    }

    /// For the second pass, which keeps line numbers but not line text.
    pub fn error_at(&mut self, text: String, no: usize) {
        self.msgs.push(Msg {
            kind: MsgKind::Error,
            text,
            no: Some(no),
            raw: None,
        });
    }

    /// For checks that run after the line stream is gone, e.g. an entry
    /// declared but never defined.
    pub fn error_at_end(&mut self, text: String) {
        self.msgs.push(Msg {
            kind: MsgKind::Error,
            text,
            no: None,
            raw: None,
        });
    }

    pub fn has_error(&self) -> bool {
        self.msgs.iter().any(|m| m.kind == MsgKind::Error)
    }

    pub fn flush(&mut self) {
        for msg in &self.msgs {
            msg.print(&self.file);
        }
        self.msgs.clear();
    }
}

// ----------------------------------------------------------------------------

#[derive(Debug)]
struct Msg {
    kind: MsgKind,
    text: String,
    no: Option<usize>,
    raw: Option<String>,
}

#[derive(Debug, PartialEq)]
enum MsgKind {
    Error,
    Warn,
}

impl Msg {
    fn print(&self, file: &str) {
        match self.kind {
            MsgKind::Error => ceprintln!("<red,bold>error</>: {}", self.text),
            MsgKind::Warn => ceprintln!("<yellow,bold>warning</>: {}", self.text),
        }
        match self.no {
            Some(no) => ceprintln!("     <blue>--></> <underline>{}:{}</>", file, no),
            None => ceprintln!("     <blue>--></> <underline>{}</>", file),
        }
        if let (Some(no), Some(raw)) = (self.no, &self.raw) {
            ceprintln!("      <blue>|</>");
            ceprintln!(" <blue>{:>4} |</> {}", no, raw);
            ceprintln!("      <blue>|</>");
        }
    }
}
