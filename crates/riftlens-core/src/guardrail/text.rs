//! Plain-text helpers: markup stripping, sentence and clause splitting.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LINE_PREFIX: Regex =
        Regex::new(r"^\s*(?:#{1,6}\s*|>\s*|[-*+•]\s+|\d{1,2}[.)]\s+)+").unwrap();
    static ref MARKDOWN_LINK: Regex = Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"</?[A-Za-z][^>]*>").unwrap();
    static ref CLAUSE_SEPARATOR: Regex = Regex::new(r"\s*[,;]\s+").unwrap();
    /// Standalone number, optionally with decimals, digit grouping or a percent sign.
    pub(crate) static ref NUMERIC_TOKEN: Regex = Regex::new(r"\b\d+(?:[.,]\d+)*\b%?").unwrap();
}

/// Remove headers, bullets, quotes, emphasis, code ticks, links and tags,
/// then collapse all whitespace onto one line.
pub(crate) fn strip_markup(text: &str) -> String {
    let without_links = MARKDOWN_LINK.replace_all(text, "$1");
    let without_tags = HTML_TAG.replace_all(&without_links, " ");

    let mut lines = Vec::new();
    for raw in without_tags.lines() {
        let line = LINE_PREFIX.replace(raw, "");
        let cleaned: String = line
            .chars()
            .filter(|c| !matches!(c, '*' | '_' | '`' | '~' | '#' | '|'))
            .collect();
        let collapsed = collapse_whitespace(&cleaned);
        if collapsed.is_empty() {
            continue;
        }
        lines.push(collapsed);
    }

    // Separate lines read as separate sentences.
    let count = lines.len();
    let mut out = String::new();
    for (i, line) in lines.into_iter().enumerate() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&line);
        let last = line.chars().last();
        if i + 1 < count && !matches!(last, Some('.' | '!' | '?' | ',' | ';' | ':')) {
            out.push('.');
        }
    }
    out
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// One sentence: its body and terminal punctuation (possibly empty).
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Sentence {
    pub(crate) body: String,
    pub(crate) terminal: String,
}

impl Sentence {
    pub(crate) fn render(&self) -> String {
        format!("{}{}", self.body, self.terminal)
    }

    /// Same sentence with `.` appended if it had no terminal punctuation.
    pub(crate) fn terminated(mut self) -> Self {
        if self.terminal.is_empty() {
            self.terminal.push('.');
        }
        self
    }

    pub(crate) fn clauses(&self) -> Vec<String> {
        CLAUSE_SEPARATOR
            .split(&self.body)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    pub(crate) fn from_clauses(clauses: &[String], terminal: &str) -> Self {
        Self {
            body: capitalize_first(&clauses.join(", ")),
            terminal: terminal.to_string(),
        }
    }
}

/// Split on `.`, `!` or `?` followed by whitespace or end of text.
/// Decimal points inside numbers do not end a sentence.
pub(crate) fn split_sentences(text: &str) -> Vec<Sentence> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut body = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if is_terminal(c) {
            let mut j = i;
            while j < chars.len() && is_terminal(chars[j]) {
                j += 1;
            }
            if j == chars.len() || chars[j].is_whitespace() {
                let terminal: String = chars[i..j].iter().collect();
                push_sentence(&mut sentences, &body, terminal);
                body.clear();
                i = j;
                continue;
            }
            body.extend(&chars[i..j]);
            i = j;
            continue;
        }
        body.push(c);
        i += 1;
    }
    push_sentence(&mut sentences, &body, String::new());
    sentences
}

fn push_sentence(out: &mut Vec<Sentence>, body: &str, terminal: String) {
    let body = body.trim();
    if body.is_empty() || !body.chars().any(char::is_alphanumeric) {
        return;
    }
    out.push(Sentence {
        body: body.to_string(),
        terminal,
    });
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

pub(crate) fn join_sentences(sentences: &[Sentence]) -> String {
    sentences
        .iter()
        .map(Sentence::render)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Cut at a word boundary so the result (with a closing `.`) fits `max_chars`.
pub(crate) fn trim_to_words(text: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for word in text.split_whitespace() {
        let candidate_len = char_len(&out) + usize::from(!out.is_empty()) + char_len(word) + 1;
        if candidate_len > max_chars {
            break;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    let trimmed = out.trim_end_matches(|c: char| !c.is_alphanumeric() && c != '%');
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}.")
}
