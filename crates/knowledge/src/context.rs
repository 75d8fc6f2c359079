//! Context formatting: merges scored matches into one cited, bounded block.

use crate::types::ScoredMatch;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Rendered in place of an empty context so prompts stay well-formed.
pub const NO_CONTEXT: &str = "No context available.";

/// Default per-chunk character budget.
pub const DEFAULT_CHUNK_CHARS: usize = 800;

const TRUNCATION_MARKER: &str = "...";

fn entry_prefix() -> &'static Regex {
    static PREFIX: OnceLock<Regex> = OnceLock::new();
    PREFIX.get_or_init(|| {
        Regex::new(r"(?m)^Source \[([^\]\n]+)\]: ").expect("valid context prefix pattern")
    })
}

/// One cited entry of a context block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub citation: String,
    pub text: String,
}

/// Ordered, cited context handed to the generation step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    pub entries: Vec<ContextEntry>,
}

impl Context {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Citation keys in entry order.
    pub fn citations(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.citation.as_str()).collect()
    }

    /// Render as `Source [<key>]: <text>` entries separated by a blank line.
    pub fn render(&self) -> String {
        if self.entries.is_empty() {
            return NO_CONTEXT.to_string();
        }

        self.entries
            .iter()
            .map(|e| format!("Source [{}]: {}", e.citation, e.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Recover entries from rendered text.
    ///
    /// Anything before the first `Source [..]: ` prefix is ignored, so the
    /// sentinel (or free text) parses to an empty context.
    pub fn parse(text: &str) -> Self {
        let prefix = entry_prefix();
        let heads: Vec<_> = prefix.captures_iter(text).collect();

        let mut entries = Vec::with_capacity(heads.len());
        for (i, caps) in heads.iter().enumerate() {
            let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let end = heads
                .get(i + 1)
                .and_then(|next| next.get(0))
                .map(|m| m.start())
                .unwrap_or(text.len());
            entries.push(ContextEntry {
                citation: key.as_str().to_string(),
                text: text[whole.end()..end].trim_end().to_string(),
            });
        }

        Self { entries }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Builds a [`Context`] from retrieval results.
#[derive(Debug, Clone, Copy)]
pub struct ContextFormatter {
    chunk_chars: usize,
}

impl Default for ContextFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_CHARS)
    }
}

impl ContextFormatter {
    pub fn new(chunk_chars: usize) -> Self {
        Self { chunk_chars }
    }

    /// Format matches in the order given. Each chunk is truncated on its
    /// own; the number of chunks does not change any chunk's budget.
    pub fn format(&self, matches: &[ScoredMatch]) -> Context {
        let entries = matches
            .iter()
            .map(|m| ContextEntry {
                citation: sanitize_citation(m.chunk.citation_key()),
                text: neutralize_entry_prefixes(&truncate_chars(
                    m.chunk.text.trim(),
                    self.chunk_chars,
                )),
            })
            .collect();

        Context { entries }
    }
}

/// Keep keys parseable: no brackets, no line breaks.
fn sanitize_citation(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '[' => '(',
            ']' => ')',
            '\n' | '\r' => ' ',
            other => other,
        })
        .collect()
}

/// Chunk text must not contain a line that parses as another entry.
fn neutralize_entry_prefixes(text: &str) -> String {
    entry_prefix()
        .replace_all(text, "Source ($1): ")
        .into_owned()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}{}", &text[..byte_idx], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
