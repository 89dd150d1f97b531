//! BIO span decoding for token-classification output.

use crate::TaggedSpan;

/// A token label split into its chunk position and entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioTag<'a> {
    Begin(&'a str),
    Inside(&'a str),
    Outside,
}

impl<'a> BioTag<'a> {
    /// Parse `B-x`, `I-x` and `O`. BIOES `S-`/`E-` map to begin/inside and a
    /// bare label (IO scheme) is treated as inside.
    pub fn parse(label: &'a str) -> Self {
        if label.is_empty() || label == "O" {
            return BioTag::Outside;
        }
        if let Some(tag) = label.strip_prefix("B-").or_else(|| label.strip_prefix("S-")) {
            return BioTag::Begin(tag);
        }
        if let Some(tag) = label.strip_prefix("I-").or_else(|| label.strip_prefix("E-")) {
            return BioTag::Inside(tag);
        }
        BioTag::Inside(label)
    }
}

/// Classifier output for one non-special token.
#[derive(Debug, Clone)]
pub struct TokenPrediction<'a> {
    pub label: &'a str,
    /// Byte offsets of the token in the sentence.
    pub start: usize,
    pub end: usize,
    pub score: f32,
    /// The token is a `##` piece of the preceding word.
    pub continues_word: bool,
}

struct OpenSpan {
    tag: String,
    start: usize,
    end: usize,
    score_sum: f32,
    tokens: usize,
}

impl OpenSpan {
    fn new(tag: &str, token: &TokenPrediction<'_>) -> Self {
        Self {
            tag: tag.to_string(),
            start: token.start,
            end: token.end,
            score_sum: token.score,
            tokens: 1,
        }
    }

    fn extend(&mut self, token: &TokenPrediction<'_>) {
        self.end = self.end.max(token.end);
        self.score_sum += token.score;
        self.tokens += 1;
    }
}

/// Merge token predictions into typed spans.
///
/// Word pieces follow the label of the word's first piece. `I-x` continues an
/// open `x` span and otherwise starts a new one. The span score is the mean
/// token score.
pub fn decode(sentence: &str, tokens: &[TokenPrediction<'_>]) -> Vec<TaggedSpan> {
    let mut spans = Vec::new();
    let mut open: Option<OpenSpan> = None;

    for token in tokens {
        if token.continues_word {
            if let Some(span) = open.as_mut() {
                span.extend(token);
            }
            continue;
        }

        match BioTag::parse(token.label) {
            BioTag::Outside => close(&mut open, sentence, &mut spans),
            BioTag::Begin(tag) => {
                close(&mut open, sentence, &mut spans);
                open = Some(OpenSpan::new(tag, token));
            }
            BioTag::Inside(tag) => {
                let continues = open.as_ref().is_some_and(|span| span.tag == tag);
                if continues {
                    if let Some(span) = open.as_mut() {
                        span.extend(token);
                    }
                } else {
                    close(&mut open, sentence, &mut spans);
                    open = Some(OpenSpan::new(tag, token));
                }
            }
        }
    }
    close(&mut open, sentence, &mut spans);

    spans
}

fn close(open: &mut Option<OpenSpan>, sentence: &str, spans: &mut Vec<TaggedSpan>) {
    if let Some(span) = open.take() {
        let score = span.score_sum / span.tokens as f32;
        if let Some(tagged) = TaggedSpan::from_sentence(sentence, span.start, span.end, span.tag, score) {
            spans.push(tagged);
        }
    }
}
