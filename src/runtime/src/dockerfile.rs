//! Base image declaration parser.
//!
//! Finds `FROM <reference>` declarations in build instruction text. A
//! reference may carry the internal-registry marker `{{ local }}/`, meaning
//! the base image is itself built by this factory:
//!
//! ```text
//! FROM ubuntu:22.04              external
//! FROM {{ local }}/base          internal, role "base"
//! FROM {{ local }}/lang/python   internal, role "lang/python"
//! ```
//!
//! Matching is unanchored and case-sensitive. The keyword must be followed by
//! at least one whitespace character; the reference is a non-empty run of
//! ASCII word characters and `-_/:.{}`. Marker whitespace is mandatory, so
//! `{{local}}/base` is read as an external reference.

use std::ops::Range;

/// Keyword that introduces a base image declaration.
pub const DECLARATION_KEYWORD: &str = "FROM";

/// Name inside the internal-registry marker (`{{ local }}/`).
pub const INTERNAL_MARKER_NAME: &str = "local";

/// One matched base image declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseImageDeclaration {
    /// Reference exactly as written, including any internal marker
    pub reference: String,
    /// Whether the reference carries the internal marker
    pub internal: bool,
    /// Reference with the internal marker stripped
    pub role: String,
    /// Byte range of `reference` within the scanned text
    pub span: Range<usize>,
}

impl BaseImageDeclaration {
    /// Name of the locally built parent image, if internally rooted.
    pub fn parent_name(&self) -> Option<&str> {
        self.internal.then_some(self.role.as_str())
    }
}

/// Find every declaration in `text`, left to right, non-overlapping.
///
/// The grammar is ASCII-only, so raw bytes are scanned directly and content
/// in other encodings passes through untouched.
pub fn find_declarations(text: impl AsRef<[u8]>) -> Vec<BaseImageDeclaration> {
    let bytes = text.as_ref();
    let mut found = Vec::new();
    let mut pos = 0;
    while let Some(declaration) = find_declaration_from(bytes, pos) {
        pos = declaration.span.end;
        found.push(declaration);
    }
    found
}

/// The declaration on the first line of `content` that contains one.
///
/// Spans are relative to `content`.
pub fn first_declaration(content: impl AsRef<[u8]>) -> Option<BaseImageDeclaration> {
    let mut offset = 0;
    for line in content.as_ref().split_inclusive(|&b| b == b'\n') {
        if let Some(mut declaration) = find_declaration_from(line, 0) {
            declaration.span = (declaration.span.start + offset)..(declaration.span.end + offset);
            return Some(declaration);
        }
        offset += line.len();
    }
    None
}

/// Whether a line reads like a declaration even if it fails to parse.
pub fn looks_like_declaration(line: &str) -> bool {
    let trimmed = line.trim_start();
    let keyword_len = DECLARATION_KEYWORD.len();
    if trimmed.len() < keyword_len
        || !trimmed.as_bytes()[..keyword_len].eq_ignore_ascii_case(DECLARATION_KEYWORD.as_bytes())
    {
        return false;
    }
    trimmed[keyword_len..]
        .chars()
        .next()
        .map_or(true, char::is_whitespace)
}

fn find_declaration_from(bytes: &[u8], start: usize) -> Option<BaseImageDeclaration> {
    let keyword = DECLARATION_KEYWORD.as_bytes();
    let mut search = start;
    while let Some(offset) = bytes
        .get(search..)?
        .windows(keyword.len())
        .position(|window| window == keyword)
    {
        let keyword_at = search + offset;
        if let Some(declaration) = match_after_keyword(bytes, keyword_at + keyword.len()) {
            return Some(declaration);
        }
        search = keyword_at + 1;
    }
    None
}

fn match_after_keyword(bytes: &[u8], after_keyword: usize) -> Option<BaseImageDeclaration> {
    let reference_start = skip_whitespace(bytes, after_keyword);
    if reference_start == after_keyword {
        return None;
    }

    if let Some(role_start) = match_internal_marker(bytes, reference_start) {
        let role_end = scan_reference(bytes, role_start);
        if role_end > role_start {
            return Some(BaseImageDeclaration {
                reference: ascii(&bytes[reference_start..role_end]),
                internal: true,
                role: ascii(&bytes[role_start..role_end]),
                span: reference_start..role_end,
            });
        }
    }

    // No usable marker: the whole token is an external reference
    let reference_end = scan_reference(bytes, reference_start);
    if reference_end == reference_start {
        return None;
    }
    let reference = ascii(&bytes[reference_start..reference_end]);
    Some(BaseImageDeclaration {
        role: reference.clone(),
        reference,
        internal: false,
        span: reference_start..reference_end,
    })
}

/// Matched runs only contain reference bytes, which are all ASCII.
fn ascii(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Match `{{ local }}/` at `pos`; returns the index just past the slash.
fn match_internal_marker(bytes: &[u8], pos: usize) -> Option<usize> {
    let pos = expect(bytes, pos, b"{{")?;
    let pos = expect_whitespace(bytes, pos)?;
    let pos = expect(bytes, pos, INTERNAL_MARKER_NAME.as_bytes())?;
    let pos = expect_whitespace(bytes, pos)?;
    expect(bytes, pos, b"}}/")
}

fn expect(bytes: &[u8], pos: usize, literal: &[u8]) -> Option<usize> {
    bytes
        .get(pos..pos + literal.len())
        .filter(|slice| *slice == literal)
        .map(|_| pos + literal.len())
}

fn expect_whitespace(bytes: &[u8], pos: usize) -> Option<usize> {
    let end = skip_whitespace(bytes, pos);
    (end > pos).then_some(end)
}

fn skip_whitespace(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_whitespace(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn scan_reference(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && is_reference_byte(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

fn is_reference_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'/' | b':' | b'.' | b'{' | b'}')
}
