//! Text normalization and word splitting.
//!
//! The normalized text is what the context view renders and what word
//! offsets point into, so both must come from the same [`NormalizedText`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Deref;
use std::sync::Arc;

static RE_LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").unwrap());
static RE_SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Immutable display text produced once per source load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText(Arc<str>);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether two handles point at the same load.
    pub fn same_instance(&self, other: &NormalizedText) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

/// Words in reading order; every entry is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordSequence(Arc<[String]>);

impl WordSequence {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl FromIterator<String> for WordSequence {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A normalized text and the words split from it.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: NormalizedText,
    pub words: WordSequence,
}

impl Document {
    pub fn from_raw(raw: &str) -> Self {
        let text = normalize(raw);
        let words = tokenize(&text);
        Self { text, words }
    }
}

/// Unify line breaks, keep blank lines visible, then double every break so
/// paragraphs render with spacing.
pub fn normalize(raw: &str) -> NormalizedText {
    let unified = RE_LINE_BREAKS.replace_all(raw, "\n");
    let mut out = String::with_capacity(unified.len() + unified.len() / 4);
    let mut previous_was_break = false;

    for ch in unified.chars() {
        if ch == '\n' {
            if previous_was_break {
                out.push(' ');
            }
            out.push_str("\n\n");
            previous_was_break = true;
        } else {
            out.push(ch);
            previous_was_break = false;
        }
    }

    NormalizedText(Arc::from(out))
}

/// Split on whitespace runs (spaces, tabs, line breaks) into trimmed tokens.
pub fn tokenize(text: &NormalizedText) -> WordSequence {
    let flattened: String = text
        .chars()
        .map(|ch| if matches!(ch, '\t' | '\n') { ' ' } else { ch })
        .collect();
    let collapsed = RE_SPACE_RUN.replace_all(&flattened, " ");

    collapsed
        .split(' ')
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Converts between byte and char positions of one text. ASCII text maps
/// one to one and keeps no table.
#[derive(Debug, Clone, Default)]
pub struct CharIndex {
    /// Byte position of every char, ascending; `None` for ASCII text.
    starts: Option<Arc<[usize]>>,
    byte_len: usize,
    char_len: usize,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        if text.is_ascii() {
            return Self {
                starts: None,
                byte_len: text.len(),
                char_len: text.len(),
            };
        }
        let starts: Arc<[usize]> = text.char_indices().map(|(pos, _)| pos).collect();
        Self {
            char_len: starts.len(),
            starts: Some(starts),
            byte_len: text.len(),
        }
    }

    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Char position of the char starting at or containing byte `byte`; the
    /// char count at or past the end.
    pub fn char_at(&self, byte: usize) -> usize {
        match &self.starts {
            None => byte.min(self.char_len),
            Some(_) if byte >= self.byte_len => self.char_len,
            Some(starts) => match starts.binary_search(&byte) {
                Ok(index) => index,
                Err(next) => next.saturating_sub(1),
            },
        }
    }

    /// Byte position where char `index` starts; the text length past the end.
    pub fn byte_at(&self, index: usize) -> usize {
        match &self.starts {
            None => index.min(self.byte_len),
            Some(starts) => starts.get(index).copied().unwrap_or(self.byte_len),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(raw: &str) -> Vec<String> {
        Document::from_raw(raw).words.as_slice().to_vec()
    }

    #[test]
    fn splits_reference_paragraphs() {
        assert_eq!(
            words("Hello   world.\n\nThis is   great."),
            vec!["Hello", "world.", "This", "is", "great."]
        );
    }

    #[test]
    fn blank_lines_keep_a_space_between_doubled_breaks() {
        let text = normalize("a\n\nb\nc");
        assert_eq!(text.as_str(), "a\n\n \n\nb\n\nc");
    }

    #[test]
    fn carriage_returns_become_line_breaks() {
        let text = normalize("one\r\ntwo\rthree");
        assert_eq!(text.as_str(), "one\n\ntwo\n\nthree");
        assert!(!text.contains('\r'));
    }

    #[test]
    fn tabs_and_runs_collapse() {
        assert_eq!(words("\tfirst\t\tsecond   third \n"), vec!["first", "second", "third"]);
    }

    #[test]
    fn empty_and_blank_sources_yield_no_words() {
        assert!(Document::from_raw("").words.is_empty());
        assert!(Document::from_raw(" \r\n\t \n").words.is_empty());
        assert_eq!(normalize("").as_str(), "");
    }

    #[test]
    fn non_blank_text_always_has_words() {
        for sample in ["x", " y ", "\n\nz\n", "a\tb", "çà va?", "...\r\n"] {
            assert!(
                !Document::from_raw(sample).words.is_empty(),
                "expected words for {sample:?}"
            );
        }
    }

    #[test]
    fn renormalizing_only_changes_spacing() {
        let raw = "Para one\nline two\n\n\nPara   three\r\nend";
        let once = normalize(raw);
        let twice = normalize(&once);
        assert_ne!(once.as_str(), twice.as_str());
        assert_eq!(tokenize(&once), tokenize(&twice));
    }

    #[test]
    fn char_index_maps_both_ways() {
        let text = "ééé x";
        let index = CharIndex::new(text);
        assert_eq!(index.char_len(), 5);
        assert_eq!(index.char_at(7), 4);
        assert_eq!(index.byte_at(4), 7);
        assert_eq!(index.char_at(1), 0);
        assert_eq!(index.char_at(text.len()), 5);
        assert_eq!(index.byte_at(99), text.len());

        let ascii = CharIndex::new("plain");
        assert_eq!(ascii.char_at(3), 3);
        assert_eq!(ascii.byte_at(3), 3);
        assert_eq!(ascii.char_len(), 5);
    }

    #[test]
    fn every_word_is_a_substring_of_the_text() {
        let doc = Document::from_raw("It was the best of times,\nit was the worst of times.");
        for word in doc.words.iter() {
            assert!(doc.text.contains(word), "{word} missing from normalized text");
        }
    }
}
