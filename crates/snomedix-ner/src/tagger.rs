use serde::Serialize;

use crate::Result;

/// A typed span inside one sentence.
///
/// `start..end` are byte offsets into the sentence passed to
/// [`SequenceTagger::tag_spans`]; `text` is exactly that slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedSpan {
    pub start: usize,
    pub end: usize,
    pub tag: String,
    pub text: String,
    pub score: f32,
}

impl TaggedSpan {
    /// Build a span from a sentence slice. Returns `None` for empty or
    /// out-of-bounds ranges and for ranges not on char boundaries.
    pub fn from_sentence(sentence: &str, start: usize, end: usize, tag: impl Into<String>, score: f32) -> Option<Self> {
        if start >= end {
            return None;
        }
        let text = sentence.get(start..end)?;
        Some(Self {
            start,
            end,
            tag: tag.into(),
            text: text.to_string(),
            score,
        })
    }
}

/// Detects typed spans in a single sentence.
///
/// Implementations must be usable from several request threads at once.
pub trait SequenceTagger: Send + Sync {
    fn tag_spans(&self, sentence: &str) -> Result<Vec<TaggedSpan>>;

    /// Short description for logs and health output.
    fn name(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
