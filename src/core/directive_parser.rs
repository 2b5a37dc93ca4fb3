//! # Directive Parser
//!
//! Turns directive files and template sources into chunks.
//!
//! A directive line is `@inherits <type>`, `@model <type>` or `@using <namespace>`.
//! Directive files are strict: apart from blank lines and `@* ... *@` comments,
//! every line must be a directive. Templates are lenient: directive lines are
//! lifted out and everything else becomes `Literal` or `Expression` chunks.

use crate::core::engine::TemplateParser;
use crate::models::{Chunk, ChunkTree, DirectiveChunk};
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    static ref DIRECTIVE_RE: Regex =
        Regex::new(r"^\s*@(inherits|model|using)(?:\s+(.*?))?\s*$").expect("valid directive regex");
    static ref COMMENT_RE: Regex = Regex::new(r"^\s*@\*.*\*@\s*$").expect("valid comment regex");
    // `@@` is an escaped `@`, `@* .. *@` an inline comment; otherwise `@a.b.c` is an expression.
    // Comments spanning several lines are not recognized.
    static ref EXPRESSION_RE: Regex =
        Regex::new(r"@@|@\*.*?\*@|@([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)")
            .expect("valid expression regex");
}

/// Longest excerpt of an offending line quoted in an error message.
const EXCERPT_LENGTH: usize = 40;

/// A syntax error with the 1-based line it was found on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct DirectiveSyntaxError {
    pub line: usize,
    pub message: String,
}

// --- PUBLIC API ---

/// Parses the content of a directive file.
///
/// # Errors
/// Returns a `DirectiveSyntaxError` for the first line that is neither blank,
/// a comment, nor a well-formed directive.
pub fn parse_directive_file(source: &str) -> Result<Vec<DirectiveChunk>, DirectiveSyntaxError> {
    let mut chunks = Vec::new();
    for (index, line) in strip_bom(source).lines().enumerate() {
        let line_no = index + 1;
        if line.trim().is_empty() || COMMENT_RE.is_match(line) {
            continue;
        }
        match parse_directive_line(line, line_no)? {
            Some(chunk) => chunks.push(chunk),
            None => {
                return Err(DirectiveSyntaxError {
                    line: line_no,
                    message: format!("expected a directive, found '{}'", excerpt(line)),
                });
            }
        }
    }
    Ok(chunks)
}

/// Parses a template into a chunk tree, lifting its directives out of the body.
///
/// # Errors
/// Fails only when a known directive keyword is missing its argument.
pub fn parse_template(source: &str) -> Result<ChunkTree, DirectiveSyntaxError> {
    let mut chunks = Vec::new();
    for (index, raw_line) in strip_bom(source).split_inclusive('\n').enumerate() {
        let line = raw_line.trim_end_matches(['\r', '\n']);
        if COMMENT_RE.is_match(line) {
            continue;
        }
        if let Some(directive) = parse_directive_line(line, index + 1)? {
            chunks.push(Chunk::Directive(directive));
            continue;
        }
        tokenize_body(raw_line, &mut chunks);
    }
    Ok(ChunkTree::new(chunks))
}

/// The default front-end parser: stateless, so a fresh one costs nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveAwareParser;

impl TemplateParser for DirectiveAwareParser {
    fn parse(&self, source: &str) -> Result<ChunkTree, DirectiveSyntaxError> {
        parse_template(source)
    }
}

// --- LINE PARSING ---

/// Returns `Ok(None)` when the line is not a directive at all.
fn parse_directive_line(
    line: &str,
    line_no: usize,
) -> Result<Option<DirectiveChunk>, DirectiveSyntaxError> {
    let Some(caps) = DIRECTIVE_RE.captures(line) else {
        return Ok(None);
    };
    let keyword = caps.get(1).map_or("", |m| m.as_str());
    let argument = caps.get(2).map_or("", |m| m.as_str()).trim();
    let argument = if keyword == "using" {
        argument.trim_end_matches(';').trim_end()
    } else {
        argument
    };

    if argument.is_empty() {
        return Err(DirectiveSyntaxError {
            line: line_no,
            message: format!("'@{}' requires an argument", keyword),
        });
    }

    let chunk = match keyword {
        "inherits" => DirectiveChunk::BaseType(argument.to_string()),
        "model" => DirectiveChunk::ModelType(argument.to_string()),
        _ => DirectiveChunk::NamespaceImport(argument.to_string()),
    };
    Ok(Some(chunk))
}

/// Splits body text into literals and `@expression` chunks.
fn tokenize_body(text: &str, chunks: &mut Vec<Chunk>) {
    let mut last_index = 0;
    for caps in EXPRESSION_RE.captures_iter(text) {
        let Some(full_match) = caps.get(0) else {
            continue;
        };
        if let Some(literal) = text.get(last_index..full_match.start()) {
            add_literal(chunks, literal);
        }
        match caps.get(1) {
            Some(expression) => chunks.push(Chunk::Expression(expression.as_str().to_string())),
            None if full_match.as_str() == "@@" => add_literal(chunks, "@"),
            None => {}
        }
        last_index = full_match.end();
    }
    if let Some(rest) = text.get(last_index..) {
        add_literal(chunks, rest);
    }
}

/// Appends a literal, merging it into the previous one when possible.
fn add_literal(chunks: &mut Vec<Chunk>, s: &str) {
    if s.is_empty() {
        return;
    }
    if let Some(Chunk::Literal(last)) = chunks.last_mut() {
        last.push_str(s);
    } else {
        chunks.push(Chunk::Literal(s.to_string()));
    }
}

fn strip_bom(source: &str) -> &str {
    source.strip_prefix('\u{feff}').unwrap_or(source)
}

fn excerpt(line: &str) -> String {
    let trimmed = line.trim();
    match trimmed.char_indices().nth(EXCERPT_LENGTH) {
        Some((cut, _)) => format!("{}...", trimmed.get(..cut).unwrap_or(trimmed)),
        None => trimmed.to_string(),
    }
}
