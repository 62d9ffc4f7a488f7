//! Reply parsing: turn the model's labelled text into [`QaPair`]s.
//!
//! The prompt asks for `Question N:` / `Answer N:` blocks, but models take
//! liberties: labels in the document language ("Domanda 2:"), the text on
//! the line after the label, bold markers around everything, answers spread
//! over several lines. The parser is a small line-oriented state machine
//! that accepts all of those rather than a strict grammar that rejects
//! half of real replies.
//!
//! Label detection is deliberately tight: a line is a label only when the
//! keyword is followed by nothing but an optional number and an optional
//! colon. Prose that merely *starts* with "Questions about…" stays prose.

use crate::output::QaPair;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_QUESTION_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:questions?|domand[ae]|fragen?|preguntas?)\s*(?:\d+[.)]?)?\s*(?::\s*(.*))?$",
    )
    .unwrap()
});

static RE_ANSWER_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:answers?|rispost[ae]|r[ée]ponses?|respuestas?|antwort(?:en)?)\s*(?:\d+[.)]?)?\s*(?::\s*(.*))?$",
    )
    .unwrap()
});

/// Outcome of matching a line against a label regex.
enum Label<'a> {
    /// `Question 1: What is…` — text follows on the same line.
    Inline(&'a str),
    /// `Question 1:` or `Question 1` — text expected on the next line.
    Bare,
}

fn match_label<'a>(line: &'a str, re: &Regex) -> Option<Label<'a>> {
    let caps = re.captures(line)?;
    match caps.get(1).map(|m| m.as_str().trim()) {
        Some(text) if !text.is_empty() => Some(Label::Inline(text)),
        _ => Some(Label::Bare),
    }
}

/// Parse a model reply into question/answer pairs.
///
/// Returns pairs in reply order. Pairs whose question never materialised are
/// dropped; a trailing question with no answer is kept with an empty answer
/// so the caller can see the model trailed off.
pub fn parse_qa_response(reply: &str) -> Vec<QaPair> {
    let cleaned = strip_emphasis(reply);

    let mut pairs: Vec<QaPair> = Vec::new();
    let mut question: Option<String> = None;
    let mut answer = String::new();
    let mut expecting_question = false;
    let mut expecting_answer = false;

    for line in cleaned.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(label) = match_label(line, &RE_QUESTION_LABEL) {
            flush(&mut pairs, &mut question, &mut answer);
            expecting_answer = false;
            match label {
                Label::Inline(text) => {
                    question = Some(text.to_string());
                    expecting_question = false;
                }
                Label::Bare => {
                    question = None;
                    expecting_question = true;
                }
            }
            continue;
        }

        if expecting_question {
            question = Some(line.to_string());
            expecting_question = false;
            continue;
        }

        if let Some(label) = match_label(line, &RE_ANSWER_LABEL) {
            match label {
                Label::Inline(text) => {
                    answer = text.to_string();
                    expecting_answer = false;
                }
                Label::Bare => {
                    answer.clear();
                    expecting_answer = true;
                }
            }
            continue;
        }

        if expecting_answer {
            answer = line.to_string();
            expecting_answer = false;
            continue;
        }

        // Continuation lines extend the answer; immediately after a question
        // they begin it even without an explicit answer label.
        if !answer.is_empty() {
            answer.push(' ');
            answer.push_str(line);
        } else if question.is_some() {
            answer = line.to_string();
        }
    }

    flush(&mut pairs, &mut question, &mut answer);
    pairs
}

/// Push the pair under construction, if it has a question.
fn flush(pairs: &mut Vec<QaPair>, question: &mut Option<String>, answer: &mut String) {
    if let Some(q) = question.take() {
        let q = q.trim().to_string();
        if !q.is_empty() {
            pairs.push(QaPair::new(q, answer.trim()));
        }
    }
    answer.clear();
}

/// Remove markdown emphasis markers the model tends to sprinkle on labels.
fn strip_emphasis(text: &str) -> String {
    text.replace('*', "")
}
