//! Chunking: split extracted text into model-sized pieces.
//!
//! The splitter accumulates whole paragraphs until the next one would push
//! the chunk past the budget. Paragraphs are the natural unit: a question
//! generated from a chunk that cuts mid-sentence tends to be a question
//! about half a thought.
//!
//! A paragraph that alone exceeds the budget falls back to sentence
//! accumulation, and a single monster sentence is hard-split at a character
//! boundary. The invariant either way: **no chunk ever exceeds the budget,
//! and no text is dropped**.

use tracing::debug;

/// Split `text` into chunks of at most `max_chars` characters.
///
/// `text` is expected to be whitespace-normalised (paragraphs separated by
/// exactly one blank line, see [`crate::pipeline::extract`]). Empty input
/// yields an empty vec.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        let para_len = paragraph.chars().count();

        if para_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            split_long_paragraph(paragraph, max_chars, &mut chunks);
            continue;
        }

        // +2 for the "\n\n" joining paragraphs inside a chunk.
        let sep_len = if current.is_empty() { 0 } else { 2 };
        if current_len + sep_len + para_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
            current_len += 2;
        }
        current.push_str(paragraph);
        current_len += para_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    debug!(chunks = chunks.len(), max_chars, "Chunking complete");
    chunks
}

/// Sentence-accumulate an oversized paragraph into chunks of `max_chars`.
fn split_long_paragraph(paragraph: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut current = String::new();
    let mut current_len = 0usize;

    for sentence in split_sentences(paragraph) {
        let sentence_len = sentence.chars().count();

        if sentence_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            hard_split(sentence, max_chars, chunks);
            continue;
        }

        let sep_len = if current.is_empty() { 0 } else { 1 };
        if current_len + sep_len + sentence_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(sentence);
        current_len += sentence_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
}

/// Split a paragraph into sentences, keeping the terminator with its sentence.
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev_was_terminator = false;

    for (idx, c) in paragraph.char_indices() {
        if prev_was_terminator && c.is_whitespace() {
            let sentence = paragraph[start..idx].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = idx;
        }
        prev_was_terminator = matches!(c, '.' | '!' | '?');
    }

    let tail = paragraph[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Last resort: slice a terminator-free run at character boundaries.
fn hard_split(text: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut piece = String::with_capacity(max_chars);
    let mut piece_len = 0usize;
    for c in text.chars() {
        piece.push(c);
        piece_len += 1;
        if piece_len >= max_chars {
            chunks.push(std::mem::take(&mut piece));
            piece_len = 0;
        }
    }
    if !piece.trim().is_empty() {
        chunks.push(piece);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squeezed(text: &str) -> String {
        text.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(chunk_text("", 4000).is_empty());
        assert!(chunk_text("   \n\n  ", 4000).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("First paragraph.\n\nSecond paragraph.", 4000);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], "First paragraph.\n\nSecond paragraph.");
    }

    #[test]
    fn paragraphs_do_not_straddle_chunks() {
        let para = "x".repeat(300);
        let text = format!("{para}\n\n{para}\n\n{para}");
        let chunks = chunk_text(&text, 650);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{para}\n\n{para}"));
        assert_eq!(chunks[1], para);
    }

    #[test]
    fn no_chunk_exceeds_budget() {
        let sentences: String = (0..200)
            .map(|i| format!("Sentence number {i} says something mildly interesting. "))
            .collect();
        let text = format!("{sentences}\n\nA short closing paragraph.");
        for chunk in chunk_text(&text, 500) {
            assert!(
                chunk.chars().count() <= 500,
                "chunk of {} chars exceeds budget",
                chunk.chars().count()
            );
        }
    }

    #[test]
    fn oversized_paragraph_splits_on_sentences() {
        let text = "One sentence here. Another sentence there. A third one too.";
        let chunks = chunk_text(text, 25);
        assert!(chunks.len() >= 3);
        assert!(chunks[0].contains("One sentence"));
    }

    #[test]
    fn no_text_is_lost() {
        let text = "Alpha beta gamma. Delta epsilon zeta!\n\nEta theta iota kappa.\n\nLambda.";
        let original = squeezed(text);
        for budget in [10, 20, 30, 1000] {
            let joined: String = chunk_text(text, budget).concat();
            assert_eq!(squeezed(&joined), original, "budget {budget}");
        }
    }

    #[test]
    fn terminator_free_run_is_hard_split() {
        let text = "a".repeat(95);
        let chunks = chunk_text(&text, 30);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 30));
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert_eq!(total, 95);
    }

    #[test]
    fn sentence_splitter_keeps_terminators() {
        let sentences = split_sentences("First one. Second one! Third?");
        assert_eq!(sentences, vec!["First one.", "Second one!", "Third?"]);
    }

    #[test]
    fn sentence_splitter_ignores_decimal_points() {
        let sentences = split_sentences("Pi is 3.14 roughly. Tau is larger.");
        assert_eq!(sentences, vec!["Pi is 3.14 roughly.", "Tau is larger."]);
    }
}
