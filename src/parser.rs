//! Line-oriented parser for question files.
//!
//! ```text
//! Q: <question text>
//! A) <option text>
//! B) <option text>
//! C) <option text>
//! D) <option text>
//! ANS: <0|1|2|3>
//! ```
//!
//! Blocks repeat; blank or unrecognized lines between them are ignored. Parsing never
//! fails: malformed input degrades to partial or empty output.

use crate::models::{QuestionRecord, UploadPreview};

const QUESTION_PREFIX: &str = "Q:";
const ANSWER_PREFIX: &str = "ANS:";
const OPTION_PREFIXES: [&str; 4] = ["A)", "B)", "C)", "D)"];

/// Fields collected since the last `Q:` line
#[derive(Default)]
struct PendingQuestion {
    question: Option<String>,
    options: [Option<String>; 4],
    answer: Option<String>,
}

impl PendingQuestion {
    fn starting_with(question: &str) -> Self {
        Self {
            question: Some(question.to_string()),
            ..Self::default()
        }
    }

    fn into_record(self) -> Option<QuestionRecord> {
        let question = self.question.filter(|q| !q.is_empty())?;
        let [a, b, c, d] = self.options;
        Some(QuestionRecord {
            question,
            a,
            b,
            c,
            d,
            answer: self.answer,
        })
    }
}

/// Parse raw question-file text into records, in the order their `Q:` lines appear.
pub fn parse_questions(raw: &str) -> Vec<QuestionRecord> {
    let mut parsed = Vec::new();
    let mut current = PendingQuestion::default();

    for line in raw.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix(QUESTION_PREFIX) {
            let finished = std::mem::replace(&mut current, PendingQuestion::starting_with(rest.trim()));
            parsed.extend(finished.into_record());
        } else if let Some((slot, rest)) = OPTION_PREFIXES
            .iter()
            .enumerate()
            .find_map(|(slot, prefix)| line.strip_prefix(*prefix).map(|rest| (slot, rest)))
        {
            current.options[slot] = Some(rest.trim().to_string());
        } else if let Some(rest) = line.strip_prefix(ANSWER_PREFIX) {
            current.answer = Some(rest.trim().to_string());
        }
    }

    parsed.extend(current.into_record());
    parsed
}

/// Parse an upload and report which records are incomplete.
pub fn preview_upload(raw: &str) -> UploadPreview {
    let questions = parse_questions(raw);
    let incomplete = questions
        .iter()
        .enumerate()
        .filter(|(_, q)| !q.is_complete())
        .map(|(index, _)| index)
        .collect();

    UploadPreview {
        question_count: questions.len(),
        questions,
        incomplete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Q: 2+2=?\nA) 3\nB) 4\nC) 5\nD) 6\nANS: 1\n";

    #[test]
    fn test_single_block_scenario() {
        let parsed = parse_questions(SAMPLE);
        assert_eq!(parsed.len(), 1);

        let record = &parsed[0];
        assert_eq!(record.question, "2+2=?");
        assert_eq!(record.a.as_deref(), Some("3"));
        assert_eq!(record.b.as_deref(), Some("4"));
        assert_eq!(record.c.as_deref(), Some("5"));
        assert_eq!(record.d.as_deref(), Some("6"));
        assert_eq!(record.answer.as_deref(), Some("1"));
    }

    #[test]
    fn test_multiple_blocks_keep_order_and_trim() {
        let raw = "\
            Q:   Capital of France?  \r\n\
            A) Paris\r\n\
            B)  Rome \r\n\
            C) Madrid\r\n\
            D) Berlin\r\n\
            ANS: 0\r\n\
            \r\n\
            # second block\r\n\
            Q: Largest planet?\r\n\
            A) Mars\r\n\
            B) Venus\r\n\
            C) Jupiter\r\n\
            D) Earth\r\n\
            ANS:   2\r\n";

        let parsed = parse_questions(raw);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].question, "Capital of France?");
        assert_eq!(parsed[0].b.as_deref(), Some("Rome"));
        assert_eq!(parsed[1].question, "Largest planet?");
        assert_eq!(parsed[1].answer.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_and_questionless_input() {
        assert!(parse_questions("").is_empty());
        assert!(parse_questions("\n\n   \n").is_empty());
        assert!(parse_questions("A) orphan\nB) option\nANS: 1").is_empty());
    }

    #[test]
    fn test_fields_before_first_question_are_discarded() {
        let parsed = parse_questions("A) stray\nANS: 3\nQ: real\nB) kept");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].a, None);
        assert_eq!(parsed[0].answer, None);
        assert_eq!(parsed[0].b.as_deref(), Some("kept"));
    }

    #[test]
    fn test_partial_records_are_emitted_as_is() {
        let parsed = parse_questions("Q: first\nA) only option\nQ: second\nANS: 2");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].a.as_deref(), Some("only option"));
        assert_eq!(parsed[0].answer, None);
        assert_eq!(parsed[1].a, None);
        assert_eq!(parsed[1].answer.as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_question_text_is_not_emitted() {
        let parsed = parse_questions("Q:\nA) lost\nQ: kept\nA) yes");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].question, "kept");
        assert_eq!(parsed[0].a.as_deref(), Some("yes"));

        assert!(parse_questions("Q:   \nANS: 1").is_empty());
    }

    #[test]
    fn test_prefixes_are_case_sensitive() {
        let parsed = parse_questions("q: lower\nQ: upper\na) lower option\nans: 1\nANS: 0");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].question, "upper");
        assert_eq!(parsed[0].a, None);
        assert_eq!(parsed[0].answer.as_deref(), Some("0"));
    }

    #[test]
    fn test_unknown_lines_do_not_disturb_neighbours() {
        let parsed = parse_questions("Q: one\nA) a1\nnoise line\nB) b1\n---\nANS: 1\nQ: two");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].a.as_deref(), Some("a1"));
        assert_eq!(parsed[0].b.as_deref(), Some("b1"));
        assert_eq!(parsed[0].answer.as_deref(), Some("1"));
        assert_eq!(parsed[1].question, "two");
    }

    #[test]
    fn test_parsing_is_idempotent() {
        let raw = format!("{}\nQ: second\nA) x\nANS: 0", SAMPLE);
        assert_eq!(parse_questions(&raw), parse_questions(&raw));
    }

    #[test]
    fn test_preview_flags_incomplete_records() {
        let preview = preview_upload(&format!("{}\nQ: no options\nANS: 1\nQ: bad key\nA) a\nB) b\nC) c\nD) d\nANS: 7", SAMPLE));
        assert_eq!(preview.question_count, 3);
        assert_eq!(preview.incomplete, vec![1, 2]);
    }
}
