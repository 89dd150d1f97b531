//! Dictionary tagger using an Aho-Corasick automaton.
//!
//! Terms and text are compared in Unicode lower case, on word boundaries
//! only. Among whole-word matches, overlaps resolve to the leftmost, then
//! longest term. Useful when no token-classification model is available.

use std::fs;
use std::path::Path;

use aho_corasick::{AhoCorasick, MatchKind};
use tracing::info;

use crate::{NerError, Result, SequenceTagger, TaggedSpan};

pub struct LexiconTagger {
    automaton: AhoCorasick,
    /// Tag of each pattern, by pattern index
    tags: Vec<String>,
}

impl LexiconTagger {
    /// Build from `(term, tag)` pairs. Blank terms are skipped.
    pub fn new<I, T, G>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (T, G)>,
        T: AsRef<str>,
        G: Into<String>,
    {
        let mut patterns = Vec::new();
        let mut tags = Vec::new();
        for (term, tag) in entries {
            let term = term.as_ref().trim();
            if term.is_empty() {
                continue;
            }
            patterns.push(term.to_lowercase());
            tags.push(tag.into());
        }

        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| NerError::ModelLoad(format!("Lexicon automaton: {}", e)))?;

        Ok(Self { automaton, tags })
    }

    /// Load a `term<TAB>tag` file. Blank lines and `#` comments are ignored.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;

        let mut entries = Vec::new();
        for (i, line) in content.lines().enumerate() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }
            let (term, tag) = line
                .split_once('\t')
                .map(|(term, tag)| (term.trim(), tag.trim()))
                .filter(|(term, tag)| !term.is_empty() && !tag.is_empty())
                .ok_or_else(|| NerError::Lexicon {
                    path: path.to_path_buf(),
                    line: i + 1,
                    reason: "expected `term<TAB>tag`".to_string(),
                })?;
            entries.push((term.to_string(), tag.to_string()));
        }

        let tagger = Self::new(entries)?;
        info!("Loaded lexicon with {} terms from {:?}", tagger.len(), path);
        Ok(tagger)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl SequenceTagger for LexiconTagger {
    fn tag_spans(&self, sentence: &str) -> Result<Vec<TaggedSpan>> {
        let folded = FoldedText::new(sentence);

        let mut candidates: Vec<(usize, usize, usize)> = self
            .automaton
            .find_overlapping_iter(folded.lowered.as_str())
            .filter_map(|m| {
                let (start, end) = folded.original_range(m.start(), m.end())?;
                is_word_boundary(sentence, start, end).then_some((start, end, m.pattern().as_usize()))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)).then(a.2.cmp(&b.2)));

        let mut spans = Vec::new();
        let mut covered = 0;
        for (start, end, pattern) in candidates {
            if start < covered {
                continue;
            }
            let Some(tag) = self.tags.get(pattern) else {
                continue;
            };
            if let Some(span) = TaggedSpan::from_sentence(sentence, start, end, tag.as_str(), 1.0) {
                covered = end;
                spans.push(span);
            }
        }
        Ok(spans)
    }

    fn name(&self) -> String {
        format!("lexicon ({} terms)", self.len())
    }
}

/// Lower-cased copy of a sentence with a byte map back to the original.
struct FoldedText {
    lowered: String,
    /// Original byte offset of the char each lowered byte came from
    origin: Vec<usize>,
    /// Whether a lowered byte starts the expansion of an original char
    char_start: Vec<bool>,
}

impl FoldedText {
    fn new(text: &str) -> Self {
        let mut lowered = String::with_capacity(text.len());
        let mut origin = Vec::with_capacity(text.len());
        let mut char_start = Vec::with_capacity(text.len());
        for (offset, c) in text.char_indices() {
            let before = lowered.len();
            lowered.extend(c.to_lowercase());
            origin.extend(std::iter::repeat(offset).take(lowered.len() - before));
            char_start.extend((before..lowered.len()).map(|i| i == before));
        }
        origin.push(text.len());
        char_start.push(true);
        Self { lowered, origin, char_start }
    }

    /// Original byte range of a lowered match, if it covers whole chars.
    fn original_range(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if !*self.char_start.get(start)? || !*self.char_start.get(end)? {
            return None;
        }
        Some((self.origin[start], self.origin[end]))
    }
}

fn is_word_boundary(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
}
