//! One-shot line decoding: each expanded source line becomes a typed
//! statement, so the second pass never re-reads operand text.

use crate::msg::Msgs;
use q10::word::{VALUE_MAX, VALUE_MIN};
use q10::{Mode, Opcode, Reg};

pub const MAX_LINE: usize = 80;
pub const MAX_LABEL: usize = 30;

/// A numbered line of the expanded stream, borrowed for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct Line<'a> {
    pub no: usize,
    pub raw: &'a str,
}

// ----------------------------------------------------------------------------
// Names

/// Label syntax: alphabetic head, alphanumeric tail, at most 30 chars.
pub fn valid_label(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_LABEL
        && s.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && s.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Mnemonics and register names cannot name a symbol.
pub fn reserved(s: &str) -> bool {
    Opcode::parse(s).is_ok() || Reg::parse(s).is_ok()
}

// ----------------------------------------------------------------------------
// Statement

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub label: Option<String>,
    pub body: Option<Body>,
}

#[derive(Debug, PartialEq)]
pub enum Body {
    Inst { op: Opcode, operands: Vec<Operand> },
    /// `.data`, `.string` and `.mat` all reduce to a run of data words.
    Data(Vec<i16>),
    Extern(String),
    Entry(String),
}

impl Stmt {
    /// Decode one line. `None` means the line contributes nothing:
    /// blank, comment, or too broken to classify (already reported).
    pub fn parse(line: &Line, msgs: &mut Msgs) -> Option<Stmt> {
        let text = line.raw.trim_start();
        if text.is_empty() || text.starts_with(';') {
            return None;
        }

        let (mut label, rest) = match text.find(':') {
            Some(pos) => {
                let candidate = &text[..pos];
                if candidate.is_empty() {
                    msgs.error("Empty label definition".to_string(), line);
                    return None;
                }
                if candidate.len() > MAX_LABEL {
                    msgs.error(
                        format!("Label `{candidate}` exceeds {MAX_LABEL} characters"),
                        line,
                    );
                    return None;
                }
                (Some(candidate.to_string()), text[pos + 1..].trim_start())
            }
            None => (None, text),
        };

        let (head, params) = match rest.split_once(char::is_whitespace) {
            Some((head, params)) => (head, params.trim()),
            None => (rest, ""),
        };
        if head.is_empty() {
            msgs.error(
                format!(
                    "Missing command or directive after label `{}`",
                    label.as_deref().unwrap_or("")
                ),
                line,
            );
            return None;
        }

        let body = if head.starts_with('.') {
            // Labels on .extern/.entry bind nothing.
            if matches!(head, ".extern" | ".entry") {
                if let Some(l) = label.take() {
                    msgs.warn(format!("Label `{l}` on {head} directive is ignored"), line);
                }
            }
            parse_directive(head, params, line, msgs)
        } else {
            parse_instruction(head, params, line, msgs)
        };

        Some(Stmt { label, body })
    }
}

// ----------------------------------------------------------------------------
// Directives

fn parse_directive(head: &str, params: &str, line: &Line, msgs: &mut Msgs) -> Option<Body> {
    match head {
        ".data" => Some(Body::Data(parse_data(params, line, msgs))),
        ".string" => Some(Body::Data(parse_string(params, line, msgs))),
        ".mat" => Some(Body::Data(parse_mat(params, line, msgs))),
        ".extern" | ".entry" => {
            let Some(name) = params.split_whitespace().next() else {
                msgs.error(format!("Missing symbol name for {head} directive"), line);
                return None;
            };
            Some(match head {
                ".extern" => Body::Extern(name.to_string()),
                _ => Body::Entry(name.to_string()),
            })
        }
        _ => {
            msgs.error(format!("Unrecognized directive `{head}`"), line);
            None
        }
    }
}

fn parse_value(s: &str) -> Result<i16, String> {
    let v: i64 = s
        .parse()
        .map_err(|_| format!("Cannot parse `{s}` as a number"))?;
    if v < VALUE_MIN as i64 || v > VALUE_MAX as i64 {
        return Err(format!(
            "Value {v} out of range [{VALUE_MIN}, {VALUE_MAX}]"
        ));
    }
    Ok(v as i16)
}

/// Comma-separated decimal values. Every bad value gets its own
/// diagnostic; the good ones still land so later addresses stay right.
fn parse_data(params: &str, line: &Line, msgs: &mut Msgs) -> Vec<i16> {
    let mut values = Vec::new();
    if params.is_empty() {
        msgs.error("Missing parameters for .data directive".to_string(), line);
        return values;
    }
    for piece in params.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            msgs.error(
                "Empty parameter or stray comma in .data directive".to_string(),
                line,
            );
            continue;
        }
        match parse_value(piece) {
            Ok(v) => values.push(v),
            Err(e) => msgs.error(e, line),
        }
    }
    values
}

/// `"..."` becomes one word per character plus a zero terminator.
fn parse_string(params: &str, line: &Line, msgs: &mut Msgs) -> Vec<i16> {
    let Some(rest) = params.strip_prefix('"') else {
        msgs.error("String must begin with a quote".to_string(), line);
        return Vec::new();
    };
    let Some(close) = rest.rfind('"') else {
        msgs.error("String must end with a quote".to_string(), line);
        return Vec::new();
    };
    if !rest[close + 1..].trim().is_empty() {
        msgs.error("Extraneous text after string".to_string(), line);
        return Vec::new();
    }
    rest[..close].chars().map(|c| c as i16).chain([0]).collect()
}

/// `[R][C] v, v, ...` — row-major, zero-filled, extras warned away.
fn parse_mat(params: &str, line: &Line, msgs: &mut Msgs) -> Vec<i16> {
    let Some((rows, cols, tail)) = mat_dims(params) else {
        msgs.error(
            "Invalid or missing matrix dimensions, expected `[rows][cols]`".to_string(),
            line,
        );
        return Vec::new();
    };
    if rows <= 0 || cols <= 0 {
        msgs.error(
            "Matrix dimensions must be positive integers".to_string(),
            line,
        );
        return Vec::new();
    }
    let cells = rows * cols;
    if cells > (q10::word::MASK as i64 + 1) {
        msgs.error(
            format!("Matrix of {cells} words exceeds machine memory"),
            line,
        );
        return Vec::new();
    }
    let cells = cells as usize;

    let mut values = Vec::new();
    let mut extra = false;
    let tail = tail.trim();
    if !tail.is_empty() {
        for piece in tail.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                msgs.error(
                    "Empty parameter or stray comma in .mat directive".to_string(),
                    line,
                );
                continue;
            }
            match parse_value(piece) {
                Ok(v) if values.len() < cells => values.push(v),
                Ok(_) => extra = true,
                Err(e) => msgs.error(e, line),
            }
        }
    }
    if extra {
        msgs.warn(
            "Too many initialisers for .mat directive, excess values ignored".to_string(),
            line,
        );
    }
    values.resize(cells, 0);
    values
}

fn mat_dims(s: &str) -> Option<(i64, i64, &str)> {
    let s = s.trim_start().strip_prefix('[')?;
    let (rows, s) = s.split_once(']')?;
    let s = s.trim_start().strip_prefix('[')?;
    let (cols, s) = s.split_once(']')?;
    Some((
        rows.trim().parse().ok()?,
        cols.trim().parse().ok()?,
        s,
    ))
}

// ----------------------------------------------------------------------------
// Instructions

fn parse_instruction(head: &str, params: &str, line: &Line, msgs: &mut Msgs) -> Option<Body> {
    let op = match Opcode::parse(head) {
        Ok(op) => op,
        Err(e) => {
            msgs.error(e, line);
            return None;
        }
    };

    let mut operands = Vec::new();
    if !params.is_empty() {
        let pieces: Vec<&str> = params.split(',').collect();
        if pieces.len() > 2 {
            msgs.error(format!("Too many operands for `{op}`"), line);
            return None;
        }
        let mut ok = true;
        for piece in pieces {
            let piece = piece.trim();
            if piece.is_empty() {
                msgs.error("Missing operand or stray comma".to_string(), line);
                ok = false;
                continue;
            }
            match Operand::parse(piece) {
                Ok(operand) => operands.push(operand),
                Err(e) => {
                    msgs.error(e, line);
                    ok = false;
                }
            }
        }
        if !ok {
            return None;
        }
    }
    Some(Body::Inst { op, operands })
}

// ----------------------------------------------------------------------------
// Operands

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Imm(i16),
    Reg(Reg),
    Direct(String),
    Matrix { name: String, row: Reg, col: Reg },
}

impl Operand {
    /// Classification is lexical: `#` opens an immediate, `r` plus one
    /// digit is register notation, a `[` makes a matrix access, anything
    /// else is a direct label.
    pub fn parse(s: &str) -> Result<Operand, String> {
        if let Some(rest) = s.strip_prefix('#') {
            let v = parse_value(rest).map_err(|e| format!("Bad immediate operand: {e}"))?;
            return Ok(Operand::Imm(v));
        }
        if let Some(reg) = register_form(s)? {
            return Ok(Operand::Reg(reg));
        }
        if s.contains('[') {
            return parse_matrix(s);
        }
        Ok(Operand::Direct(s.to_string()))
    }

    pub fn mode(&self) -> Mode {
        match self {
            Operand::Imm(_) => Mode::Imm,
            Operand::Reg(_) => Mode::Reg,
            Operand::Direct(_) => Mode::Direct,
            Operand::Matrix { .. } => Mode::Matrix,
        }
    }
}

/// `r` followed by a single digit is register notation even when the
/// digit names no register: `r9` is an invalid register, not a label.
fn register_form(s: &str) -> Result<Option<Reg>, String> {
    let mut chars = s.chars();
    if s.len() == 2 && chars.next() == Some('r') && chars.next().is_some_and(|c| c.is_ascii_digit())
    {
        return match Reg::parse(s) {
            Ok(reg) => Ok(Some(reg)),
            Err(_) => Err(format!("Invalid register `{s}`, registers are r0-r7")),
        };
    }
    Ok(None)
}

fn parse_matrix(s: &str) -> Result<Operand, String> {
    let err = || format!("Invalid matrix operand `{s}`, expected `NAME[rX][rY]`");
    let open = s.find('[').unwrap_or(s.len());
    let name = s[..open].trim_end();
    if name.is_empty() {
        return Err(err());
    }
    let (row, rest) = index_reg(&s[open..]).ok_or_else(err)?;
    let (col, rest) = index_reg(rest).ok_or_else(err)?;
    if !rest.is_empty() {
        return Err(err());
    }
    Ok(Operand::Matrix {
        name: name.to_string(),
        row,
        col,
    })
}

fn index_reg(s: &str) -> Option<(Reg, &str)> {
    let s = s.strip_prefix('[')?;
    let (body, rest) = s.split_once(']')?;
    let reg = Reg::parse(body.trim()).ok()?;
    Some((reg, rest))
}

// ----------------------------------------------------------------------------
