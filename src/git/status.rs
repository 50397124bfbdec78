//! Parser for `git status --porcelain` (v1) output.
//!
//! Each line is `XY <path>` or `XY <old> -> <new>`, where a path containing
//! whitespace, quotes or non-ASCII bytes is wrapped in double quotes and
//! escaped the way a C string literal is.

use super::FileSet;
use thiserror::Error;

/// Characters git may print in either column of the status code.
const STATUS_CHARS: &str = " MTADRCU?!";

const RENAME_ARROW: &str = " -> ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: String,
    pub path: String,
    pub original_path: Option<String>, // For renames
}

impl StatusLine {
    pub fn is_untracked(&self) -> bool {
        self.code == "??"
    }
}

/// A status line that matches none of the forms git is documented to print.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized status line {line:?}: {reason}")]
pub struct StatusParseError {
    pub line: String,
    pub reason: &'static str,
}

/// Parse a single status line. Blank lines yield `None`.
pub fn parse_status_line(line: &str) -> Result<Option<StatusLine>, StatusParseError> {
    if line.trim().is_empty() {
        return Ok(None);
    }
    let fail = |reason| StatusParseError {
        line: line.to_string(),
        reason,
    };

    let code = line.get(..2).ok_or_else(|| fail("line too short"))?;
    if !code.chars().all(|c| STATUS_CHARS.contains(c)) {
        return Err(fail("invalid status code"));
    }
    let rest = line
        .get(2..)
        .and_then(|r| r.strip_prefix(' '))
        .ok_or_else(|| fail("missing space after status code"))?;

    let (first, rest) = take_path(rest).map_err(fail)?;
    if rest.is_empty() {
        return Ok(Some(StatusLine {
            code: code.to_string(),
            path: first,
            original_path: None,
        }));
    }

    let after_arrow = rest
        .strip_prefix(RENAME_ARROW)
        .ok_or_else(|| fail("unexpected text after path"))?;
    let (second, rest) = take_path(after_arrow).map_err(fail)?;
    if !rest.is_empty() {
        return Err(fail("unexpected text after renamed path"));
    }
    Ok(Some(StatusLine {
        code: code.to_string(),
        path: second,
        original_path: Some(first),
    }))
}

/// Collect the paths of every tracked change in `output`.
/// Untracked (`??`) entries are dropped; any malformed line is an error.
pub fn parse_status(output: &str) -> Result<FileSet, StatusParseError> {
    let mut files = FileSet::new();
    for line in output.lines() {
        match parse_status_line(line)? {
            Some(entry) if !entry.is_untracked() => {
                if let Some(from) = &entry.original_path {
                    log::trace!("{} was renamed from {}", entry.path, from);
                }
                files.insert(entry.path);
            }
            _ => {}
        }
    }
    Ok(files)
}

/// Decode a path printed by git, which is either bare or C-quoted.
/// Used for `--name-only` output, where git quotes the same way.
pub fn decode_path(raw: &str) -> Result<String, &'static str> {
    match raw.strip_prefix('"') {
        Some(quoted) => match unquote(quoted)? {
            (path, "") => Ok(path),
            _ => Err("unexpected text after quoted path"),
        },
        None => Ok(raw.to_string()),
    }
}

/// Split one path token off the front of `s`, returning it decoded along
/// with the unparsed remainder.
fn take_path(s: &str) -> Result<(String, &str), &'static str> {
    if let Some(quoted) = s.strip_prefix('"') {
        return unquote(quoted);
    }
    let end = s.find(' ').unwrap_or(s.len());
    if end == 0 {
        return Err("missing path");
    }
    Ok((s[..end].to_string(), &s[end..]))
}

/// Undo git's C-style quoting. `s` starts just after the opening quote.
fn unquote(s: &str) -> Result<(String, &str), &'static str> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let path = String::from_utf8_lossy(&out).into_owned();
                return Ok((path, &s[i + 1..]));
            }
            b'\\' => {
                let esc = *bytes.get(i + 1).ok_or("dangling escape in quoted path")?;
                if esc.is_ascii_digit() {
                    let digits = bytes
                        .get(i + 1..i + 4)
                        .filter(|d| d.iter().all(|b| (b'0'..=b'7').contains(b)))
                        .ok_or("malformed octal escape in quoted path")?;
                    let value = digits
                        .iter()
                        .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                    out.push(u8::try_from(value).map_err(|_| "octal escape out of range")?);
                    i += 4;
                    continue;
                }
                out.push(match esc {
                    b'a' => 0x07,
                    b'b' => 0x08,
                    b't' => b'\t',
                    b'n' => b'\n',
                    b'v' => 0x0b,
                    b'f' => 0x0c,
                    b'r' => b'\r',
                    other => other,
                });
                i += 2;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Err("unterminated quoted path")
}
