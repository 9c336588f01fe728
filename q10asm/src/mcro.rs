//! The macro pre-processor: `mcro NAME` ... `mcroend` definitions are
//! collected from the raw source, then every other line is re-emitted
//! with call sites spliced. The expanded stream is what the passes see.

use crate::msg::Msgs;
use crate::parser::{self, Line};
use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Mcros {
    map: IndexMap<String, Vec<String>>,
}

/// Directives and the macro keywords themselves are off-limits as names,
/// on top of the usual reserved words.
fn reserved_name(name: &str) -> bool {
    parser::reserved(name)
        || matches!(
            name,
            ".data" | ".string" | ".mat" | ".extern" | ".entry" | "mcro" | "mcroend"
        )
}

impl Mcros {
    /// Definition phase. Any error reported here aborts the unit before
    /// the first pass.
    pub fn collect(lines: &[String], msgs: &mut Msgs) -> Mcros {
        let mut mcros = Mcros::default();
        let mut current: Option<(String, Vec<String>)> = None;

        for (idx, raw) in lines.iter().enumerate() {
            let line = Line { no: idx + 1, raw };
            let mut tokens = raw.split_whitespace();
            match tokens.next() {
                Some("mcro") => {
                    if current.is_some() {
                        msgs.error("Nested macro definitions are not allowed".to_string(), &line);
                        continue;
                    }
                    let Some(name) = tokens.next() else {
                        msgs.error("Macro definition is missing a name".to_string(), &line);
                        continue;
                    };
                    if tokens.next().is_some() {
                        msgs.error("Extraneous text after macro name".to_string(), &line);
                        continue;
                    }
                    if !parser::valid_label(name) || reserved_name(name) {
                        msgs.error(format!("Invalid or reserved macro name `{name}`"), &line);
                        continue;
                    }
                    if mcros.map.contains_key(name) {
                        msgs.error(format!("Macro `{name}` is already defined"), &line);
                        continue;
                    }
                    current = Some((name.to_string(), Vec::new()));
                }
                Some("mcroend") => {
                    if tokens.next().is_some() {
                        msgs.error("Extraneous text after `mcroend`".to_string(), &line);
                    }
                    match current.take() {
                        Some((name, body)) => {
                            mcros.map.insert(name, body);
                        }
                        None => {
                            msgs.error("`mcroend` without a matching `mcro`".to_string(), &line)
                        }
                    }
                }
                _ => {
                    if let Some((_, body)) = &mut current {
                        body.push(raw.clone());
                    }
                }
            }
        }

        if let Some((name, _)) = current {
            msgs.error_at_end(format!("Macro `{name}` is never closed with `mcroend`"));
        }
        mcros
    }

    /// Expansion phase. Definition lines vanish; a call site is replaced
    /// by the stored body, with any label prefix fused onto the first
    /// body line. Expansion itself cannot fail.
    pub fn expand(&self, lines: &[String]) -> Vec<String> {
        let mut out = Vec::new();
        let mut inside = false;
        for raw in lines {
            match raw.split_whitespace().next() {
                Some("mcro") => {
                    inside = true;
                    continue;
                }
                Some("mcroend") => {
                    inside = false;
                    continue;
                }
                _ => {}
            }
            if inside {
                continue;
            }
            match self.call_site(raw) {
                Some((Some(prefix), body)) => {
                    if let Some((first, rest)) = body.split_first() {
                        out.push(format!("{prefix}{first}"));
                        out.extend(rest.iter().cloned());
                    }
                }
                Some((None, body)) => out.extend(body.iter().cloned()),
                None => out.push(raw.clone()),
            }
        }
        out
    }

    /// If the line invokes a macro: the label-and-whitespace prefix to
    /// keep (when there is one) and the body to splice.
    fn call_site<'a>(&'a self, raw: &'a str) -> Option<(Option<&'a str>, &'a [String])> {
        let trimmed = raw.trim_start();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            return None;
        }
        match raw.find(':') {
            Some(pos) => {
                let after = &raw[pos + 1..];
                let callee = after.split_whitespace().next()?;
                let body = self.map.get(callee)?;
                let prefix = &raw[..raw.len() - after.trim_start().len()];
                Some((Some(prefix), body.as_slice()))
            }
            None => {
                let callee = trimmed.split_whitespace().next()?;
                let body = self.map.get(callee)?;
                Some((None, body.as_slice()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| s.to_string()).collect()
    }

    fn expand_ok(src: &[&str]) -> Vec<String> {
        let src = lines(src);
        let mut msgs = Msgs::new("t.as");
        let mcros = Mcros::collect(&src, &mut msgs);
        assert!(!msgs.has_error());
        mcros.expand(&src)
    }

    #[test]
    fn test_definition_and_expansion() {
        let out = expand_ok(&["mcro M", "inc r1", "dec r2", "mcroend", "M", "stop"]);
        assert_eq!(out, lines(&["inc r1", "dec r2", "stop"]));
    }

    #[test]
    fn test_label_fuses_with_first_body_line() {
        let out = expand_ok(&["mcro M", "inc r1", "dec r2", "mcroend", "L: M"]);
        assert_eq!(out, lines(&["L: inc r1", "dec r2"]));
    }

    #[test]
    fn test_body_kept_verbatim() {
        let out = expand_ok(&["mcro M", "\tinc r1", "", "; note", "mcroend", "M"]);
        assert_eq!(out, lines(&["\tinc r1", "", "; note"]));
    }

    #[test]
    fn test_non_call_lines_pass_through() {
        let out = expand_ok(&[
            "mcro M",
            "inc r1",
            "mcroend",
            "mov r1, r2",
            "; M is not called here",
            "PROG: stop",
        ]);
        assert_eq!(out, lines(&["mov r1, r2", "; M is not called here", "PROG: stop"]));
    }

    #[test]
    fn test_call_only_matches_first_token() {
        // M in operand position is not a call
        let out = expand_ok(&["mcro M", "inc r1", "mcroend", "jmp M"]);
        assert_eq!(out, lines(&["jmp M"]));
    }

    macro_rules! test_collect_error {
        ($($name:ident: $src:expr;)*) => {
            $(
                #[test]
                fn $name() {
                    let mut msgs = Msgs::new("t.as");
                    Mcros::collect(&lines(&$src), &mut msgs);
                    assert!(msgs.has_error());
                }
            )*
        }
    }

    test_collect_error! {
        test_err_missing_name: ["mcro", "mcroend"];
        test_err_reserved_name: ["mcro mov", "mcroend"];
        test_err_invalid_name: ["mcro 2fast", "mcroend"];
        test_err_directive_name: ["mcro .data", "mcroend"];
        test_err_extra_text_open: ["mcro M extra", "mcroend"];
        test_err_extra_text_close: ["mcro M", "mcroend extra"];
        test_err_duplicate: ["mcro M", "mcroend", "mcro M", "mcroend"];
        test_err_nested: ["mcro A", "mcro B", "mcroend"];
        test_err_dangling: ["mcro M", "inc r1"];
        test_err_close_without_open: ["mcroend"];
    }
}
