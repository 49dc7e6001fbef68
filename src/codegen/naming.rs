//! Identifier naming
//!
//! Turns labels captured from the page into JavaScript identifiers and file
//! stems. Labels may contain any script; only ASCII letters and digits survive.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Runs of characters that cannot appear in an identifier
static WORD_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));

/// Words a JavaScript binding may not be named, in strict mode included
const RESERVED_WORDS: &[&str] = &[
    "arguments", "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default", "delete",
    "do", "else", "enum", "eval", "export", "extends", "false", "finally", "for", "function", "if", "implements",
    "import", "in", "instanceof", "interface", "let", "new", "null", "package", "private", "protected", "public",
    "return", "static", "super", "switch", "this", "throw", "true", "try", "typeof", "undefined", "var", "void",
    "while", "with", "yield",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Split at separators and at lower-to-upper case boundaries
fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    for chunk in WORD_SEPARATOR.split(text).filter(|c| !c.is_empty()) {
        let mut current = String::new();
        let mut prev_lower = false;
        for c in chunk.chars() {
            if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }
    words
}

fn capitalize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// `PascalCase`, or `fallback` when nothing usable remains. A leading digit
/// gets the fallback as prefix.
pub fn pascal_case(text: &str, fallback: &str) -> String {
    let joined: String = words(text).iter().map(|w| capitalize(w)).collect();
    if joined.is_empty() {
        return capitalize(fallback);
    }
    if joined.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("{}{}", capitalize(fallback), joined);
    }
    joined
}

/// `camelCase`, with the same fallback rules as [`pascal_case`]. A reserved
/// word gets the fallback as prefix.
pub fn camel_case(text: &str, fallback: &str) -> String {
    let pascal = pascal_case(text, fallback);
    let mut chars = pascal.chars();
    let camel = match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    if is_reserved(&camel) {
        return format!("{}{}", fallback, pascal);
    }
    camel
}

/// `snake_case` for file stems
pub fn snake_case(text: &str, fallback: &str) -> String {
    let joined = words(text)
        .iter()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("_");
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

/// Hands out names that are unique within one scope
#[derive(Debug, Default)]
pub struct NameRegistry {
    taken: HashSet<String>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `base`, or `base2`, `base3`, ... when already taken
    pub fn unique(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}{}", base, counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }

    /// Like [`unique`](Self::unique) with `_2`, `_3` suffixes, for snake_case names
    pub fn unique_snake(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_string()) {
            return base.to_string();
        }
        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}", base, counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}
