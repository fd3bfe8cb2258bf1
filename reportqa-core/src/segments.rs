//! Segment model: the located, ordered text units every check reads.
//!
//! Segments come from an external document parser. The engine never mutates them;
//! construction validates that locations run in document order so that sorting by
//! [`Location`] reproduces document order.

use crate::errors::ParseError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

lazy_static! {
    static ref BLANK_LINE: Regex = Regex::new(r"\r?\n[ \t]*\r?\n").unwrap();
}

/// Share of letters that must be Arabic script for a paragraph to be treated as Arabic.
const ARABIC_LETTER_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    Ar,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::Ar];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }

    /// Classify text by script: mostly-Arabic letters means Arabic, anything else English.
    pub fn detect(text: &str) -> Language {
        let mut letters = 0usize;
        let mut arabic = 0usize;
        for c in text.chars().filter(|c| c.is_alphabetic()) {
            letters += 1;
            if is_arabic_char(c) {
                arabic += 1;
            }
        }
        if letters > 0 && arabic as f64 / letters as f64 > ARABIC_LETTER_RATIO {
            Language::Ar
        } else {
            Language::En
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Language::En),
            "ar" | "arabic" => Ok(Language::Ar),
            other => Err(format!("unsupported language '{other}' (expected en or ar)")),
        }
    }
}

fn is_arabic_char(c: char) -> bool {
    matches!(c as u32,
        0x0600..=0x06FF | 0x0750..=0x077F | 0x08A0..=0x08FF | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF)
}

/// Where a segment sits in the source document.
///
/// Field order matters: the derived `Ord` compares page, then paragraph, then offset,
/// which is document order for any validated [`SegmentModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Page number (1-indexed)
    pub page: u32,
    pub paragraph_index: usize,
    /// Character offset of the segment start within the whole document text
    pub char_offset: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "p.{} ¶{} @{}",
            self.page, self.paragraph_index, self.char_offset
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    #[serde(flatten)]
    pub location: Location,
    pub language: Language,
}

impl Segment {
    pub fn new(text: impl Into<String>, location: Location, language: Language) -> Self {
        Self {
            text: text.into(),
            location,
            language,
        }
    }

    pub fn word_count(&self) -> usize {
        crate::text::word_spans(&self.text).len()
    }

    /// Heading heuristic: a short line without sentence-ending punctuation that is
    /// either title-cased or only a few words long.
    pub fn is_heading(&self, max_words: usize, max_chars: usize) -> bool {
        let text = self.text.trim();
        if text.is_empty() || text.chars().count() > max_chars {
            return false;
        }
        if text.ends_with(['.', '!', '?', '؟', ';', ',']) {
            return false;
        }
        let words: Vec<&str> = text.split_whitespace().collect();
        words.len() <= max_words || is_title_case(&words)
    }
}

fn is_title_case(words: &[&str]) -> bool {
    words
        .iter()
        .filter(|w| w.chars().next().is_some_and(char::is_alphabetic))
        .all(|w| w.chars().next().is_some_and(char::is_uppercase))
}

/// Ordered, immutable sequence of segments for one document.
#[derive(Debug, Clone)]
pub struct SegmentModel {
    segments: Arc<[Segment]>,
}

impl SegmentModel {
    /// Validate parser output and wrap it.
    ///
    /// Rejects documents without any non-blank text, page numbers of 0, and
    /// locations that do not advance in document order.
    pub fn new(segments: Vec<Segment>) -> Result<Self, ParseError> {
        if segments.iter().all(|s| s.text.trim().is_empty()) {
            return Err(ParseError::Empty);
        }

        for (index, segment) in segments.iter().enumerate() {
            if segment.location.page == 0 {
                return Err(ParseError::InvalidPage { index, page: 0 });
            }
            if index == 0 {
                continue;
            }
            let prev = &segments[index - 1].location;
            let cur = &segment.location;
            if cur.char_offset <= prev.char_offset {
                return Err(ParseError::NonMonotonic {
                    index,
                    reason: format!(
                        "char_offset {} does not follow {}",
                        cur.char_offset, prev.char_offset
                    ),
                });
            }
            if (cur.page, cur.paragraph_index) < (prev.page, prev.paragraph_index) {
                return Err(ParseError::NonMonotonic {
                    index,
                    reason: format!(
                        "page/paragraph ({}, {}) precedes ({}, {})",
                        cur.page, cur.paragraph_index, prev.page, prev.paragraph_index
                    ),
                });
            }
        }

        Ok(Self {
            segments: segments.into(),
        })
    }

    /// Build a model from plain text: blank lines separate paragraphs and form feeds
    /// separate pages. Language is detected per paragraph.
    pub fn from_plain_text(text: &str) -> Result<Self, ParseError> {
        let mut segments = Vec::new();
        let mut page_byte_start = 0usize;
        let mut paragraph_index = 0usize;

        for (page_idx, page) in text.split('\x0C').enumerate() {
            for (start, para) in paragraphs_with_offsets(page) {
                let byte_offset = page_byte_start + start;
                let char_offset = text[..byte_offset].chars().count();
                segments.push(Segment::new(
                    para,
                    Location {
                        page: page_idx as u32 + 1,
                        paragraph_index,
                        char_offset,
                    },
                    Language::detect(para),
                ));
                paragraph_index += 1;
            }
            page_byte_start += page.len() + '\x0C'.len_utf8();
        }

        Self::new(segments)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn page_count(&self) -> u32 {
        self.segments
            .iter()
            .map(|s| s.location.page)
            .max()
            .unwrap_or(0)
    }

    /// Languages present, in order of first appearance.
    pub fn languages(&self) -> Vec<Language> {
        let mut seen = Vec::new();
        for segment in self.segments.iter() {
            if !seen.contains(&segment.language) {
                seen.push(segment.language);
            }
        }
        seen
    }

    /// Split into per-language runs, each preserving document order.
    pub fn partition_by_language(&self) -> Vec<(Language, Arc<[Segment]>)> {
        self.languages()
            .into_iter()
            .map(|language| {
                let part: Vec<Segment> = self
                    .segments
                    .iter()
                    .filter(|s| s.language == language)
                    .cloned()
                    .collect();
                (language, part.into())
            })
            .collect()
    }

    /// Whether `location` names a segment of this document.
    pub fn contains_location(&self, location: &Location) -> bool {
        self.segments
            .binary_search_by(|s| s.location.cmp(location))
            .is_ok()
    }
}

impl<'a> IntoIterator for &'a SegmentModel {
    type Item = &'a Segment;
    type IntoIter = std::slice::Iter<'a, Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Non-blank paragraphs of `text` with the byte offset of each trimmed paragraph.
fn paragraphs_with_offsets(text: &str) -> Vec<(usize, &str)> {
    let mut pieces = Vec::new();
    let mut cursor = 0;
    for sep in BLANK_LINE.find_iter(text) {
        pieces.push((cursor, &text[cursor..sep.start()]));
        cursor = sep.end();
    }
    pieces.push((cursor, &text[cursor..]));

    // A single block with line breaks but no blank lines: treat each line as a paragraph
    if pieces.len() == 1 && text.trim().contains('\n') {
        pieces.clear();
        let mut cursor = 0;
        for line in text.split_inclusive('\n') {
            pieces.push((cursor, line));
            cursor += line.len();
        }
    }

    pieces
        .into_iter()
        .filter_map(|(start, piece)| {
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                return None;
            }
            let lead = piece.len() - piece.trim_start().len();
            Some((start + lead, trimmed))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(text: &str, page: u32, paragraph_index: usize, char_offset: usize) -> Segment {
        Segment::new(
            text,
            Location {
                page,
                paragraph_index,
                char_offset,
            },
            Language::En,
        )
    }

    #[test]
    fn test_rejects_empty_document() {
        assert_eq!(SegmentModel::new(vec![]).unwrap_err(), ParseError::Empty);
        let blank = vec![seg("   ", 1, 0, 0), seg("\n", 1, 1, 5)];
        assert_eq!(SegmentModel::new(blank).unwrap_err(), ParseError::Empty);
    }

    #[test]
    fn test_rejects_non_monotonic_offsets() {
        let segments = vec![seg("First.", 1, 0, 10), seg("Second.", 1, 1, 4)];
        assert!(matches!(
            SegmentModel::new(segments),
            Err(ParseError::NonMonotonic { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_page_going_backwards() {
        let segments = vec![seg("First.", 2, 0, 0), seg("Second.", 1, 1, 20)];
        assert!(matches!(
            SegmentModel::new(segments),
            Err(ParseError::NonMonotonic { index: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_page_zero() {
        let segments = vec![seg("First.", 0, 0, 0)];
        assert_eq!(
            SegmentModel::new(segments).unwrap_err(),
            ParseError::InvalidPage { index: 0, page: 0 }
        );
    }

    #[test]
    fn test_location_order_is_document_order() {
        let model = SegmentModel::new(vec![
            seg("Intro", 1, 0, 0),
            seg("Body text.", 1, 1, 7),
            seg("Next page.", 2, 2, 30),
        ])
        .unwrap();
        let locations: Vec<Location> = model.iter().map(|s| s.location).collect();
        let mut sorted = locations.clone();
        sorted.sort();
        assert_eq!(locations, sorted);
        assert_eq!(model.page_count(), 2);
        assert!(model.contains_location(&locations[1]));
    }

    #[test]
    fn test_from_plain_text_offsets_and_pages() {
        let text = "Introduction\n\nThe tank was inspected.\x0CConclusion\n\nAll good.";
        let model = SegmentModel::from_plain_text(text).unwrap();
        assert_eq!(model.len(), 4);
        assert_eq!(model.page_count(), 2);

        for segment in model.iter() {
            let start = segment.location.char_offset;
            let found: String = text
                .chars()
                .skip(start)
                .take(segment.text.chars().count())
                .collect();
            assert_eq!(found, segment.text);
        }
        assert_eq!(model.segments()[2].text, "Conclusion");
        assert_eq!(model.segments()[2].location.page, 2);
    }

    #[test]
    fn test_from_plain_text_single_newlines() {
        let model = SegmentModel::from_plain_text("Summary\nLine one.\nLine two.").unwrap();
        assert_eq!(model.len(), 3);
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::detect("The results were recorded."), Language::En);
        assert_eq!(Language::detect("تم إجراء الاختبارات في المختبر"), Language::Ar);
        assert_eq!(Language::detect("12345"), Language::En);
    }

    #[test]
    fn test_partition_preserves_order() {
        let mut segments = vec![
            seg("Intro", 1, 0, 0),
            seg("مقدمة", 1, 1, 10),
            seg("Body.", 1, 2, 20),
        ];
        segments[1].language = Language::Ar;
        let model = SegmentModel::new(segments).unwrap();
        let parts = model.partition_by_language();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].0, Language::En);
        assert_eq!(parts[0].1.len(), 2);
        assert_eq!(parts[0].1[1].text, "Body.");
        assert_eq!(model.languages(), vec![Language::En, Language::Ar]);
    }

    #[test]
    fn test_heading_heuristic() {
        assert!(seg("Conclusion", 1, 0, 0).is_heading(8, 120));
        assert!(seg("Executive Summary And Key Findings For The Board Of Directors", 1, 0, 0)
            .is_heading(8, 120));
        assert!(!seg("The conclusion is that the tank failed.", 1, 0, 0).is_heading(8, 120));
        assert!(!seg("", 1, 0, 0).is_heading(8, 120));
    }

    #[test]
    fn test_segment_json_shape() {
        let json = r#"{"text":"Hello","page":1,"paragraph_index":0,"char_offset":0,"language":"en"}"#;
        let segment: Segment = serde_json::from_str(json).unwrap();
        assert_eq!(segment.location.page, 1);
        assert_eq!(segment.language, Language::En);
    }

    #[test]
    fn test_document_segments_reload_from_json() {
        let model = SegmentModel::from_plain_text("Introduction\n\nThe pump failed.\x0CConclusion").unwrap();
        let json = serde_json::to_string(model.segments()).unwrap();
        let segments: Vec<Segment> = serde_json::from_str(&json).unwrap();
        let reloaded = SegmentModel::new(segments).unwrap();
        assert_eq!(reloaded.segments(), model.segments());
        assert_eq!(reloaded.page_count(), 2);
    }
}
