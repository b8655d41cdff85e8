//! Maps a word index back to its offset in the normalized text.
//!
//! Resolution walks a cost ladder, cheapest first:
//! 1. cache hit,
//! 2. adjacency: the word directly after the previous cached word,
//! 3. phrase anchor: the word with a few neighbours on each side,
//! 4. boundary scan: whole-word occurrences nearest the interpolated position,
//! 5. the interpolated position itself.
//!
//! Tiers 4 and 5 are approximate when extraction left text that the joined
//! words no longer reproduce; the highlight may land near, not on, the word.
//!
//! Offsets handed out are char indices into the normalized text. Matching
//! and the cache work on byte positions; [`CharIndex`] converts between them.

use crate::tokenizer::{CharIndex, NormalizedText, WordSequence};
use tracing::{debug, trace};

pub const DEFAULT_ADJACENCY_WINDOW: usize = 32;
pub const DEFAULT_PHRASE_RADIUS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionTier {
    Cached,
    Adjacent,
    PhraseAnchor,
    BoundaryScan,
    Proportional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Char index of the word's first character.
    pub offset: usize,
    /// Byte position of the same character, for slicing the text.
    pub byte_offset: usize,
    pub tier: ResolutionTier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverTuning {
    /// Characters scanned past the previous word before giving up on tier 2.
    pub adjacency_window: usize,
    /// Neighbouring words on each side used to build the tier 3 phrase.
    pub phrase_radius: usize,
}

impl Default for ResolverTuning {
    fn default() -> Self {
        Self {
            adjacency_window: DEFAULT_ADJACENCY_WINDOW,
            phrase_radius: DEFAULT_PHRASE_RADIUS,
        }
    }
}

/// Resolved byte positions per word index. Entries are only ever added; a new load
/// builds a new cache and stop clears it wholesale.
#[derive(Debug, Clone, Default)]
pub struct PositionCache {
    slots: Vec<Option<usize>>,
    filled: usize,
}

impl PositionCache {
    pub fn with_capacity(word_count: usize) -> Self {
        Self {
            slots: vec![None; word_count],
            filled: 0,
        }
    }

    pub fn get(&self, index: usize) -> Option<usize> {
        self.slots.get(index).copied().flatten()
    }

    /// First write wins; an index never moves once resolved.
    fn insert(&mut self, index: usize, offset: usize) -> usize {
        match self.slots.get_mut(index) {
            Some(Some(existing)) => *existing,
            Some(slot) => {
                *slot = Some(offset);
                self.filled += 1;
                offset
            }
            None => offset,
        }
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.filled = 0;
    }
}

/// How often each tier answered since the last clear.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TierCounts {
    pub cached: usize,
    pub adjacent: usize,
    pub phrase_anchor: usize,
    pub boundary_scan: usize,
    pub proportional: usize,
}

impl TierCounts {
    fn record(&mut self, tier: ResolutionTier) {
        match tier {
            ResolutionTier::Cached => self.cached += 1,
            ResolutionTier::Adjacent => self.adjacent += 1,
            ResolutionTier::PhraseAnchor => self.phrase_anchor += 1,
            ResolutionTier::BoundaryScan => self.boundary_scan += 1,
            ResolutionTier::Proportional => self.proportional += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionResolver {
    text: NormalizedText,
    chars: CharIndex,
    words: WordSequence,
    tuning: ResolverTuning,
    cache: PositionCache,
    counts: TierCounts,
}

impl PositionResolver {
    pub fn new(text: NormalizedText, words: WordSequence, tuning: ResolverTuning) -> Self {
        let cache = PositionCache::with_capacity(words.len());
        Self {
            chars: CharIndex::new(&text),
            text,
            words,
            tuning,
            cache,
            counts: TierCounts::default(),
        }
    }

    pub fn text(&self) -> &NormalizedText {
        &self.text
    }

    pub fn cache(&self) -> &PositionCache {
        &self.cache
    }

    pub fn tier_counts(&self) -> TierCounts {
        self.counts
    }

    /// Char offset of word `index`; `None` only for an empty text or an index
    /// past the end of the sequence.
    pub fn resolve(&mut self, index: usize) -> Option<usize> {
        self.resolve_detailed(index)
            .map(|resolution| resolution.offset)
    }

    pub fn resolve_detailed(&mut self, index: usize) -> Option<Resolution> {
        if self.text.is_empty() || index >= self.words.len() {
            return None;
        }

        if let Some(byte_offset) = self.cache.get(index) {
            self.counts.record(ResolutionTier::Cached);
            trace!(index, byte_offset, "Word position cache hit");
            return Some(self.resolution(byte_offset, ResolutionTier::Cached));
        }

        let word = self.words.get(index)?;
        let (offset, tier) = self
            .adjacent(index, word)
            .map(|offset| (offset, ResolutionTier::Adjacent))
            .or_else(|| {
                self.phrase_anchor(index)
                    .map(|offset| (offset, ResolutionTier::PhraseAnchor))
            })
            .or_else(|| {
                self.boundary_scan(index, word)
                    .map(|offset| (offset, ResolutionTier::BoundaryScan))
            })
            .unwrap_or_else(|| (self.expected_offset(index), ResolutionTier::Proportional));

        match tier {
            ResolutionTier::Adjacent => trace!(index, offset, "Resolved word by adjacency"),
            ResolutionTier::PhraseAnchor => debug!(index, offset, "Resolved word by phrase anchor"),
            _ => debug!(index, offset, ?tier, "Resolved word by fallback"),
        }

        self.counts.record(tier);
        let byte_offset = self.cache.insert(index, offset);
        Some(self.resolution(byte_offset, tier))
    }

    fn resolution(&self, byte_offset: usize, tier: ResolutionTier) -> Resolution {
        Resolution {
            offset: self.chars.char_at(byte_offset),
            byte_offset,
            tier,
        }
    }

    /// Drop every cached offset. The text and words stay.
    pub fn clear(&mut self) {
        debug!(cached = self.cache.len(), "Clearing word position cache");
        self.cache.clear();
        self.counts = TierCounts::default();
    }

    fn adjacent(&self, index: usize, word: &str) -> Option<usize> {
        let previous = index.checked_sub(1)?;
        let previous_offset = self.cache.get(previous)?;
        let previous_word = self.words.get(previous)?;

        let text = self.text.as_str();
        let start = previous_offset + previous_word.len();
        let tail = text.get(start..)?;
        let window_end = tail
            .char_indices()
            .nth(self.tuning.adjacency_window + word.chars().count())
            .map_or(tail.len(), |(pos, _)| pos);
        let found = tail[..window_end].find(word)?;

        let gap = &tail[..found];
        if gap.is_empty() || !gap.chars().all(char::is_whitespace) {
            return None;
        }
        let offset = start + found;
        let after = text[offset + word.len()..].chars().next();
        if after.is_some_and(|ch| !ch.is_whitespace()) {
            return None;
        }
        Some(offset)
    }

    fn phrase_anchor(&self, index: usize) -> Option<usize> {
        let radius = self.tuning.phrase_radius;
        let first = index.saturating_sub(radius);
        let last = (index + radius).min(self.words.len().saturating_sub(1));
        if first == last {
            return None;
        }

        let window = &self.words.as_slice()[first..=last];
        let phrase = window.join(" ");
        let lead: usize = window[..index - first]
            .iter()
            .map(|word| word.len() + 1)
            .sum();

        let text = self.text.as_str();
        let expected = self.expected_offset(index);
        text.match_indices(phrase.as_str())
            .filter(|(pos, _)| is_bounded(text, *pos, pos + phrase.len()))
            .map(|(pos, _)| pos + lead)
            .min_by_key(|offset| offset.abs_diff(expected))
    }

    fn boundary_scan(&self, index: usize, word: &str) -> Option<usize> {
        let text = self.text.as_str();
        let expected = self.expected_offset(index);
        text.match_indices(word)
            .filter(|(pos, _)| is_bounded(text, *pos, pos + word.len()))
            .map(|(pos, _)| pos)
            .min_by_key(|pos| pos.abs_diff(expected))
    }

    /// Linear interpolation over the char length of where word `index`
    /// should sit, as a byte position.
    fn expected_offset(&self, index: usize) -> usize {
        let char_len = self.chars.char_len();
        let count = self.words.len().max(1) as u128;
        let raw = (char_len as u128 * index as u128 / count) as usize;
        self.chars.byte_at(raw.min(char_len.saturating_sub(1)))
    }
}

/// Neither neighbour of `start..end` is alphanumeric.
fn is_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
