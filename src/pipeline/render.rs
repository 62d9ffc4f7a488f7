//! Output rendering: lay the collected Q&A pairs out into a PDF.
//!
//! The document is assembled directly with `lopdf`: A4 pages, the base-14
//! Helvetica faces (no font embedding, so the output stays tiny), a centred
//! title, numbered bold questions, and indented answer paragraphs.
//!
//! Line wrapping is done here, deterministically, against the Helvetica
//! advance-width table — the PDF imaging model has no notion of paragraphs,
//! so every line break on the page is one we computed. Page breaks happen
//! when the cursor passes the bottom margin, with a small look-ahead so a
//! question heading is never stranded alone at the foot of a page.
//!
//! Base-14 fonts cover WinAnsi, not Unicode. [`sanitize_latin1`] maps the
//! typographic characters models like to emit (curly quotes, en/em dashes,
//! ellipsis) onto their Latin-1 cousins and replaces anything else that
//! will not encode with `?`.

use crate::error::Pdf2QaError;
use crate::output::QaPair;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};
use std::path::Path;
use tracing::{debug, info};

// A4 in PDF points.
const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 54.0;

const TITLE_SIZE: f32 = 16.0;
const QUESTION_SIZE: f32 = 12.0;
const ANSWER_SIZE: f32 = 10.0;
const ANSWER_INDENT: f32 = 20.0;
const LINE_SPACING: f32 = 1.4;

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

/// PDF real number; `.into()` bridges whatever width lopdf's `Real` carries.
fn real(v: f32) -> Object {
    Object::Real(v.into())
}

/// Render the pairs into a finished PDF, returned as bytes.
///
/// Pure function of its inputs; the async file-writing wrapper is
/// [`render_to_file`].
pub fn build_pdf(pairs: &[QaPair], title: &str) -> Result<Vec<u8>, Pdf2QaError> {
    let mut writer = PageWriter::new();
    let text_area = PAGE_WIDTH - 2.0 * MARGIN;

    // Centred title, wrapped if a custom one runs long.
    let title_text = sanitize_latin1(title);
    for line in wrap_text(&title_text, TITLE_SIZE, true, text_area) {
        let x = ((PAGE_WIDTH - text_width(&line, TITLE_SIZE, true)) / 2.0).max(MARGIN);
        writer.put_line(&line, x, TITLE_SIZE, FONT_BOLD);
    }
    writer.advance(TITLE_SIZE);

    for (i, pair) in pairs.iter().enumerate() {
        let question = sanitize_latin1(&format!("{}. {}", i + 1, pair.question));
        let answer = sanitize_latin1(&pair.answer);

        let question_lines = wrap_text(&question, QUESTION_SIZE, true, text_area);
        let answer_lines = wrap_text(&answer, ANSWER_SIZE, false, text_area - ANSWER_INDENT);

        // Keep the question heading and at least one answer line together.
        let lead_height = question_lines.len() as f32 * QUESTION_SIZE * LINE_SPACING
            + ANSWER_SIZE * LINE_SPACING;
        writer.ensure_room(lead_height);

        for line in &question_lines {
            writer.put_line(line, MARGIN, QUESTION_SIZE, FONT_BOLD);
        }
        writer.advance(2.0);
        for line in &answer_lines {
            writer.put_line(line, MARGIN + ANSWER_INDENT, ANSWER_SIZE, FONT_REGULAR);
        }
        writer.advance(10.0);
    }

    let bytes = writer.finish(title)?;
    debug!(bytes = bytes.len(), pairs = pairs.len(), "PDF assembled");
    Ok(bytes)
}

/// Render the pairs and write the PDF to `path` atomically.
///
/// Writes to a sibling temp file first and renames into place so an
/// interrupted run never leaves a half-written PDF behind.
pub async fn render_to_file(
    pairs: &[QaPair],
    title: &str,
    path: &Path,
) -> Result<(), Pdf2QaError> {
    let bytes = {
        let pairs = pairs.to_vec();
        let title = title.to_string();
        tokio::task::spawn_blocking(move || build_pdf(&pairs, &title))
            .await
            .map_err(|e| Pdf2QaError::RenderFailed(format!("render task failed: {e}")))??
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Pdf2QaError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(|e| Pdf2QaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2QaError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

// ── Page assembly ────────────────────────────────────────────────────────

/// Accumulates text operations page by page, tracking the vertical cursor.
struct PageWriter {
    finished_pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            finished_pages: Vec::new(),
            current: Vec::new(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    /// Emit one line of text with its baseline at the current cursor.
    fn put_line(&mut self, text: &str, x: f32, size: f32, font: &str) {
        let line_height = size * LINE_SPACING;
        if self.y - line_height < MARGIN {
            self.break_page();
        }
        self.y -= line_height;

        self.current.push(Operation::new("BT", vec![]));
        self.current
            .push(Operation::new("Tf", vec![font.into(), real(size)]));
        self.current.push(Operation::new(
            "Td",
            vec![real(x), real(self.y)],
        ));
        self.current.push(Operation::new(
            "Tj",
            vec![Object::String(
                latin1_bytes(text),
                StringFormat::Literal,
            )],
        ));
        self.current.push(Operation::new("ET", vec![]));
    }

    /// Move the cursor down without emitting text.
    fn advance(&mut self, dy: f32) {
        self.y -= dy;
    }

    /// Break the page early unless `height` still fits above the margin.
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.current.is_empty() {
            self.break_page();
        }
    }

    fn break_page(&mut self) {
        self.finished_pages.push(std::mem::take(&mut self.current));
        self.y = PAGE_HEIGHT - MARGIN;
    }

    /// Assemble the accumulated pages into a serialised document.
    fn finish(mut self, title: &str) -> Result<Vec<u8>, Pdf2QaError> {
        if !self.current.is_empty() || self.finished_pages.is_empty() {
            self.finished_pages.push(std::mem::take(&mut self.current));
        }

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let font_bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                FONT_REGULAR => font_regular,
                FONT_BOLD => font_bold,
            },
        });

        let mut kids: Vec<Object> = Vec::with_capacity(self.finished_pages.len());
        for operations in self.finished_pages.drain(..) {
            let content = Content { operations };
            let encoded = content
                .encode()
                .map_err(|e| Pdf2QaError::RenderFailed(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(latin1_bytes(&sanitize_latin1(title)), StringFormat::Literal),
            "Producer" => Object::string_literal("pdf2qa"),
        });
        doc.trailer.set("Info", info_id);

        doc.compress();

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)
            .map_err(|e| Pdf2QaError::RenderFailed(e.to_string()))?;
        Ok(bytes)
    }
}

// ── Text measurement and wrapping ────────────────────────────────────────

/// Helvetica advance widths for ASCII 0x20–0x7E, in 1/1000 em (Adobe AFM).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333,
    278, 278, 556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278,
    584, 584, 584, 556, 1015, 667, 667, 722, 722, 667, 611, 778, 722, 278,
    500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944,
    667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556,
    278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Bold glyphs run wider; scaling the regular table slightly over-estimates,
/// which errs toward shorter (never overflowing) lines.
const BOLD_FACTOR: f32 = 1.09;

fn char_width(c: char) -> u16 {
    let code = c as u32;
    if (0x20..=0x7E).contains(&code) {
        HELVETICA_WIDTHS[(code - 0x20) as usize]
    } else {
        // Accented Latin-1 glyphs cluster around the lowercase average.
        556
    }
}

/// Width of `text` at `size` points.
fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = text.chars().map(|c| char_width(c) as u32).sum();
    let width = units as f32 * size / 1000.0;
    if bold {
        width * BOLD_FACTOR
    } else {
        width
    }
}

/// Greedy word wrap against `max_width` points.
///
/// A single word wider than the line is hard-broken at a character boundary
/// so the invariant (every returned line fits) holds unconditionally.
fn wrap_text(text: &str, size: f32, bold: bool, max_width: f32) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };

        if text_width(&candidate, size, bold) <= max_width {
            line = candidate;
            continue;
        }

        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }

        if text_width(word, size, bold) <= max_width {
            line = word.to_string();
        } else {
            line = break_long_word(word, size, bold, max_width, &mut lines);
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Hard-break an oversized word; returns the unfinished tail.
fn break_long_word(
    word: &str,
    size: f32,
    bold: bool,
    max_width: f32,
    lines: &mut Vec<String>,
) -> String {
    let mut piece = String::new();
    for c in word.chars() {
        piece.push(c);
        if text_width(&piece, size, bold) > max_width && piece.chars().count() > 1 {
            if let Some(tail) = piece.pop() {
                lines.push(std::mem::take(&mut piece));
                piece.push(tail);
            }
        }
    }
    piece
}

// ── Encoding ─────────────────────────────────────────────────────────────

/// Map text onto the Latin-1 repertoire the base-14 fonts can show.
///
/// Common typographic characters get a faithful substitute; everything else
/// outside Latin-1 becomes `?`.
pub fn sanitize_latin1(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' => out.push('\''),
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A0}' | '\u{2009}' | '\u{202F}' => out.push(' '),
            '\u{2022}' => out.push('-'),
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pairs(n: usize) -> Vec<QaPair> {
        (0..n)
            .map(|i| {
                QaPair::new(
                    format!("What does concept number {i} describe in the source text?"),
                    "It describes a recurring idea that the surrounding paragraphs \
                     develop in some detail, including its origins and consequences."
                        .to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn wrapped_lines_fit_the_width() {
        let text = "The quick brown fox jumps over the lazy dog near the riverbank every single morning";
        for width in [80.0, 150.0, 400.0] {
            for line in wrap_text(text, 12.0, false, width) {
                assert!(
                    text_width(&line, 12.0, false) <= width,
                    "line '{line}' overflows {width}pt"
                );
            }
        }
    }

    #[test]
    fn wrapping_preserves_every_word() {
        let text = "alpha beta gamma delta epsilon zeta eta theta";
        let lines = wrap_text(text, 10.0, false, 60.0);
        let rejoined = lines.join(" ");
        assert_eq!(rejoined, text);
    }

    #[test]
    fn oversized_word_is_hard_broken() {
        let word = "a".repeat(200);
        let lines = wrap_text(&word, 10.0, false, 100.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 10.0, false) <= 100.0 + 10.0);
        }
        let total: usize = lines.iter().map(|l| l.chars().count()).sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn sanitize_maps_typographic_chars() {
        assert_eq!(sanitize_latin1("“smart” — quotes…"), "\"smart\" - quotes...");
        assert_eq!(sanitize_latin1("café naïve"), "café naïve");
        assert_eq!(sanitize_latin1("日本語"), "???");
    }

    #[test]
    fn latin1_bytes_round_trip_ascii() {
        assert_eq!(latin1_bytes("Hello"), b"Hello".to_vec());
        assert_eq!(latin1_bytes("é"), vec![0xE9]);
    }

    #[test]
    fn build_pdf_produces_a_loadable_document() {
        let bytes = build_pdf(&sample_pairs(3), "Questions and Answers").unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn many_pairs_spill_onto_multiple_pages() {
        let bytes = build_pdf(&sample_pairs(60), "Questions and Answers").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(
            doc.get_pages().len() >= 2,
            "expected 60 pairs to need more than one page, got {}",
            doc.get_pages().len()
        );
    }

    #[test]
    fn empty_pairs_still_render_a_title_page() {
        let bytes = build_pdf(&[], "Domande e Risposte").unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[tokio::test]
    async fn render_to_file_writes_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.pdf");
        render_to_file(&sample_pairs(2), "Questions and Answers", &path)
            .await
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
