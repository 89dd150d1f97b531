//! Rule-based sentence segmentation.
//!
//! A sentence ends at a run of `.`, `!` or `?` (optionally followed by closing
//! quotes or brackets) when whitespace and a sentence opener follow: an
//! upper-case letter, a digit, or an opening quote or bracket. A period after
//! a known abbreviation or a single-letter initial does not end a sentence,
//! unless the letter follows a lower-case word ("vitamin C.").
//! Every line break ends a sentence.

use std::collections::HashSet;

use regex::Regex;

const DEFAULT_ABBREVIATIONS: &[&str] = &[
    "al", "approx", "ca", "cf", "dept", "dr", "e.g", "etc", "fig", "i.e", "inc", "jr", "ltd", "mr", "mrs", "ms",
    "no", "prof", "pt", "sr", "st", "vs",
];

/// Splits text into trimmed sentence slices borrowed from the input.
#[derive(Debug, Clone)]
pub struct SentenceSplitter {
    boundary: Regex,
    abbreviations: HashSet<String>,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new()
    }
}

impl SentenceSplitter {
    pub fn new() -> Self {
        Self::with_abbreviations(DEFAULT_ABBREVIATIONS.iter().copied())
    }

    /// Use a custom abbreviation list (compared case-insensitively, without
    /// the trailing period).
    pub fn with_abbreviations<I, S>(abbreviations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let boundary = Regex::new(r#"([.!?]+)["'”’)\]]*\s+"#).expect("sentence boundary pattern is valid");
        Self {
            boundary,
            abbreviations: abbreviations
                .into_iter()
                .map(|a| a.as_ref().trim_end_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Sentences of `text` in document order. Empty sentences are dropped.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();

        for line in text.split('\n') {
            let mut start = 0;
            for caps in self.boundary.captures_iter(line) {
                let (Some(whole), Some(terminal)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let opens = line[whole.end()..].chars().next().is_some_and(opens_sentence);
                if !opens {
                    continue;
                }
                if terminal.as_str() == "." && self.is_abbreviation(&line[..whole.start()]) {
                    continue;
                }

                let end = whole.start() + whole.as_str().trim_end().len();
                push_trimmed(&mut sentences, &line[start..end]);
                start = whole.end();
            }
            push_trimmed(&mut sentences, &line[start..]);
        }

        sentences
    }

    /// Whether the last word of `before` is an abbreviation or an initial.
    ///
    /// A single upper-case letter after a lower-case word ("vitamin C.") is a
    /// name or grade, not an initial.
    fn is_abbreviation(&self, before: &str) -> bool {
        let mut words = before
            .split_whitespace()
            .rev()
            .map(|w| w.trim_start_matches(|c: char| !c.is_alphanumeric()));
        let word = words.next().unwrap_or("");

        let mut chars = word.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if c.is_alphabetic() && c.is_uppercase() {
                let after_lowercase_word = words
                    .next()
                    .and_then(|previous| previous.chars().next())
                    .is_some_and(char::is_lowercase);
                return !after_lowercase_word;
            }
        }
        self.abbreviations.contains(&word.to_lowercase())
    }
}

fn opens_sentence(c: char) -> bool {
    c.is_uppercase() || c.is_ascii_digit() || matches!(c, '"' | '\'' | '“' | '‘' | '(' | '[')
}

fn push_trimmed<'a>(sentences: &mut Vec<&'a str>, candidate: &'a str) {
    let trimmed = candidate.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn split(text: &str) -> Vec<&str> {
        SentenceSplitter::new().split(text)
    }

    #[test]
    fn test_single_sentence() {
        assert_eq!(
            split("Today I woke up with migraine and I took an aspirine."),
            vec!["Today I woke up with migraine and I took an aspirine."]
        );
    }

    #[test]
    fn test_terminals() {
        assert_eq!(
            split("I have a headache. Is it bad? Yes! 2 tablets taken."),
            vec!["I have a headache.", "Is it bad?", "Yes!", "2 tablets taken."]
        );
    }

    #[test]
    fn test_lowercase_continuation_does_not_split() {
        assert_eq!(split("Pain was 5 out of 10. then improved."), vec!["Pain was 5 out of 10. then improved."]);
        assert_eq!(split("aspirin 81 mg.Daily"), vec!["aspirin 81 mg.Daily"]);
    }

    #[test]
    fn test_abbreviations_and_initials() {
        assert_eq!(
            split("Seen by Dr. Smith today. Pain improved."),
            vec!["Seen by Dr. Smith today.", "Pain improved."]
        );
        assert_eq!(split("J. Smith reported nausea."), vec!["J. Smith reported nausea."]);
        assert_eq!(split("Analgesics, e.g. Paracetamol, help."), vec!["Analgesics, e.g. Paracetamol, help."]);
    }

    #[test]
    fn test_letter_after_lowercase_word_ends_sentence() {
        assert_eq!(
            split("Took vitamin C. Pain improved."),
            vec!["Took vitamin C.", "Pain improved."]
        );
        assert_eq!(
            split("Seen by John F. Kennedy today."),
            vec!["Seen by John F. Kennedy today."]
        );
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        assert_eq!(
            split("He said \"stop.\" Then he left."),
            vec!["He said \"stop.\"", "Then he left."]
        );
    }

    #[test]
    fn test_line_breaks_split() {
        assert_eq!(split("Headache\r\nNausea\n\n  Vomiting  "), vec!["Headache", "Nausea", "Vomiting"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split("").is_empty());
        assert!(split("   \n\t ").is_empty());
    }

    #[test]
    fn test_sentences_borrow_from_input() {
        let text = "Fever. Cough.";
        let base = text.as_ptr() as usize;
        let starts: Vec<usize> = split(text).iter().map(|s| s.as_ptr() as usize - base).collect();
        assert_eq!(starts, vec![0, 7]);
    }

    #[test]
    fn test_custom_abbreviations() {
        let splitter = SentenceSplitter::with_abbreviations(["Hx."]);
        assert_eq!(splitter.split("Hx. Migraine noted."), vec!["Hx. Migraine noted."]);
        assert_eq!(splitter.split("Seen by Dr. Smith."), vec!["Seen by Dr.", "Smith."]);
    }
}
