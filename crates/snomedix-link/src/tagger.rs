//! Document tagging: sentence split, per-sentence span detection, linking.

use std::sync::Arc;
use std::time::Instant;

use snomedix_ner::{SentenceSplitter, SequenceTagger};
use tracing::{debug, warn};

use crate::mention::{EntityMention, TaggedText};
use crate::normalizer::Normalizer;
use crate::Result;

pub struct Tagger {
    splitter: SentenceSplitter,
    sequence_tagger: Arc<dyn SequenceTagger>,
    normalizer: Arc<Normalizer>,
}

impl Tagger {
    pub fn new(sequence_tagger: Arc<dyn SequenceTagger>, normalizer: Arc<Normalizer>) -> Self {
        Self {
            splitter: SentenceSplitter::new(),
            sequence_tagger,
            normalizer,
        }
    }

    pub fn with_splitter(mut self, splitter: SentenceSplitter) -> Self {
        self.splitter = splitter;
        self
    }

    /// Find and link the entities of `text`.
    ///
    /// The returned text is `text` trimmed; entity offsets are character
    /// offsets into it. Sentences are located by searching forward from the
    /// end of the previous sentence, so a repeated sentence never maps back
    /// onto an earlier occurrence. Any tagger or encoder failure aborts the
    /// whole call.
    pub fn tag(&self, text: &str) -> Result<TaggedText> {
        let start = Instant::now();
        let text = text.trim();
        if text.is_empty() {
            return Ok(TaggedText::default());
        }

        let mut entities = Vec::new();
        let mut cursor = 0;
        let mut chars = CharCursor::default();

        for sentence in self.splitter.split(text) {
            let offset = match text[cursor..].find(sentence) {
                Some(i) => cursor + i,
                None => {
                    warn!("Sentence not found after byte {}: {:?}", cursor, sentence);
                    continue;
                }
            };
            cursor = offset + sentence.len();

            for span in self.sequence_tagger.tag_spans(sentence)? {
                let Some(local) = sentence.get(span.start..span.end) else {
                    warn!("Dropping span {}..{} outside sentence", span.start, span.end);
                    continue;
                };
                if local.trim().is_empty() {
                    continue;
                }

                let begin = offset + span.start;
                let end = offset + span.end;
                let link = self.normalizer.normalize(local)?;

                entities.push(EntityMention {
                    id: format!("T{}", entities.len() + 1),
                    tag: span.tag,
                    offsets: vec![(chars.seek(text, begin), chars.seek(text, end))],
                    surface: local.to_string(),
                    concept_name: link.name,
                    concept_id: link.concept_id,
                });
            }
        }

        debug!("Tagged {} entities in {:?}", entities.len(), start.elapsed());
        Ok(TaggedText {
            text: text.to_string(),
            entities,
        })
    }

    pub fn sequence_tagger(&self) -> &dyn SequenceTagger {
        self.sequence_tagger.as_ref()
    }
}

/// Byte to char offset conversion for positions that mostly move forward.
#[derive(Debug, Default)]
struct CharCursor {
    byte: usize,
    chars: usize,
}

impl CharCursor {
    /// Char offset of `byte`, counting only the chars between the previous
    /// position and this one.
    fn seek(&mut self, text: &str, byte: usize) -> usize {
        if byte >= self.byte {
            self.chars += text[self.byte..byte].chars().count();
        } else {
            self.chars -= text[byte..self.byte].chars().count();
        }
        self.byte = byte;
        self.chars
    }
}
