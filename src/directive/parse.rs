//! Header scanning and directive recognition.
//!
//! Directives live in the leading header of a script: the run of blank
//! lines, `//` comments and `use` / `extern crate` statements before the
//! first item.
//!
//! ```text
//! //css_include helpers/strings.rs;
//! //css_ref $HOME/libs/libmath.rlib;
//! use std::fs;
//!
//! fn main() { ... }     <- scanning stops here
//! ```

use std::sync::LazyLock;

use regex::Regex;

static HEADER_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t]*(//|use[ \t]|pub[ \t]+use[ \t]|extern[ \t]+crate[ \t]|$)")
        .expect("valid header regex")
});

static INNER_ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(//!|/\*!|#!\[)").expect("valid inner attribute regex"));

static INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*//css_include(?:[ \t]+(.*?))?[ \t]*;?[ \t]*$").expect("valid include regex")
});

static REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[ \t]*//css_ref(?:[ \t]+(.*?))?[ \t]*;?[ \t]*$").expect("valid reference regex")
});

/// A recognized directive with its raw (unresolved) path argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    Include(&'a str),
    Reference(&'a str),
}

/// Whether `line` still belongs to the script header.
#[inline]
pub fn is_header_line(line: &str) -> bool {
    HEADER_LINE.is_match(line)
}

/// Whether `line` opens an inner attribute or inner doc comment.
///
/// Script sources are spliced into a generated module, where neither is
/// accepted, so the resolver rejects them with a positioned diagnostic.
#[inline]
pub fn is_inner_attribute(line: &str) -> bool {
    INNER_ATTRIBUTE.is_match(line)
}

/// Recognize an include or reference directive.
///
/// The argument is trimmed and unquoted; it may be empty for a malformed
/// directive, which the resolver reports.
pub fn parse_directive(line: &str) -> Option<Directive<'_>> {
    if let Some(caps) = INCLUDE.captures(line) {
        return Some(Directive::Include(argument(caps.get(1))));
    }
    if let Some(caps) = REFERENCE.captures(line) {
        return Some(Directive::Reference(argument(caps.get(1))));
    }
    None
}

fn argument(m: Option<regex::Match<'_>>) -> &str {
    let raw = m.map_or("", |m| m.as_str().trim());
    raw.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw)
}
