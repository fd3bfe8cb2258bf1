//! Small text helpers shared by the checks: sentence and word spans, phrase
//! matching, snippets. All offsets are byte offsets into the input `&str`.

use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

lazy_static! {
    static ref WORD: Regex = Regex::new(r"[\p{L}\p{M}]+(?:['’][\p{L}\p{M}]+)*").unwrap();
}

fn is_terminal(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '؟')
}

fn is_closing(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

/// Could `c` open a new sentence? Uppercase, digits, and caseless scripts such as Arabic.
fn opens_sentence(c: char) -> bool {
    c.is_uppercase()
        || c.is_numeric()
        || (c.is_alphabetic() && !c.is_lowercase())
        || matches!(c, '"' | '“' | '«' | '(')
}

/// Byte spans of the sentences in `text`, trimmed of surrounding whitespace.
///
/// A sentence ends at `.`, `!`, `?` or `؟` (plus trailing quotes/brackets) when
/// followed by whitespace and a character that can open a sentence.
pub fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut spans = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        if !is_terminal(chars[i].1) {
            i += 1;
            continue;
        }
        let mut j = i + 1;
        while j < chars.len() && (is_terminal(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let ws_start = j;
        while j < chars.len() && chars[j].1.is_whitespace() {
            j += 1;
        }
        if j > ws_start && j < chars.len() && opens_sentence(chars[j].1) {
            push_trimmed(text, start, chars[ws_start].0, &mut spans);
            start = chars[j].0;
        }
        i = j.max(i + 1);
    }
    push_trimmed(text, start, text.len(), &mut spans);
    spans
}

fn push_trimmed(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let slice = &text[start..end];
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return;
    }
    let lead = slice.len() - slice.trim_start().len();
    spans.push((start + lead, start + lead + trimmed.len()));
}

pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_spans(text)
        .into_iter()
        .map(|(s, e)| &text[s..e])
        .collect()
}

/// Byte spans of word tokens (letters, combining marks, inner apostrophes).
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    WORD.find_iter(text).map(|m| (m.start(), m.end())).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhraseMatch {
    pub start: usize,
    pub end: usize,
    /// The matched text has exactly the configured casing
    pub exact: bool,
}

/// Case-insensitive phrase matcher that respects word boundaries at phrase edges
/// made of word characters ("tbd" will not match inside "tbdx", "n/a" still matches).
#[derive(Debug, Clone)]
pub struct PhraseMatcher {
    phrase: String,
    regex: Regex,
}

impl PhraseMatcher {
    pub fn new(phrase: &str) -> Result<Self, regex::Error> {
        let phrase = phrase.trim();
        let mut pattern = String::new();
        if phrase.chars().next().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }
        pattern.push_str(&regex::escape(phrase));
        if phrase.chars().last().is_some_and(is_word_char) {
            pattern.push_str(r"\b");
        }
        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;
        Ok(Self {
            phrase: phrase.to_string(),
            regex,
        })
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn find_iter<'a>(&'a self, text: &'a str) -> impl Iterator<Item = PhraseMatch> + 'a {
        self.regex.find_iter(text).map(move |m| PhraseMatch {
            start: m.start(),
            end: m.end(),
            exact: m.as_str() == self.phrase,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Short single-line excerpt around `[start, end)`, at most `max_chars` characters.
pub fn snippet(text: &str, start: usize, end: usize, max_chars: usize) -> String {
    let start = floor_char_boundary(text, start.min(text.len()));
    let end = floor_char_boundary(text, end.min(text.len())).max(start);
    let context = max_chars.saturating_sub(text[start..end].chars().count()) / 2;

    let left: usize = text[..start]
        .char_indices()
        .rev()
        .take(context)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(start);
    let right: usize = text[end..]
        .char_indices()
        .nth(context)
        .map(|(i, _)| end + i)
        .unwrap_or(text.len());

    let excerpt: String = text[left..right].replace(['\n', '\r'], " ");
    if excerpt.chars().count() > max_chars {
        let cut: String = excerpt.chars().take(max_chars).collect();
        format!("{cut}…")
    } else {
        excerpt
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
