//! Prompt construction for Q&A generation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g.
//!    asking for harder questions or tweaking the output format) requires
//!    editing exactly one place.
//!
//! 2. **Testability** — unit tests can build and inspect prompts directly
//!    without a real model call, making prompt regressions easy to catch.
//!
//! Callers can override the default via
//! [`crate::config::GenerationConfig::prompt_template`]; the constants here
//! are used only when no override is provided.

use crate::config::Language;

/// Default prompt template.
///
/// Placeholders: `{count}` — pairs to generate, `{language}` — the target
/// language fragment, `{text}` — the chunk under analysis.
///
/// The explicit `Question 1: / Answer 1:` format instruction is load-bearing:
/// the reply parser in [`crate::pipeline::parse`] keys on those labels.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "\
Analyze the following text and generate {count} questions that a professor \
might ask about it in an exam, along with their answers, {language}.

Label each pair exactly as 'Question 1:', 'Answer 1:', 'Question 2:', \
'Answer 2:' and so on (use the corresponding words if writing in another \
language). Do not add commentary before or after the pairs.

Text to analyze:
{text}";

/// The `{language}` fragment inserted into the prompt.
pub fn language_fragment(language: Language) -> &'static str {
    match language {
        Language::English => "written in English",
        Language::Italian => "scritte in italiano",
        Language::French => "rédigées en français",
        Language::Spanish => "escritas en español",
        Language::German => "auf Deutsch verfasst",
    }
}

/// Localised default title for the rendered PDF.
pub fn default_title(language: Language) -> &'static str {
    match language {
        Language::English => "Questions and Answers",
        Language::Italian => "Domande e Risposte",
        Language::French => "Questions et Réponses",
        Language::Spanish => "Preguntas y Respuestas",
        Language::German => "Fragen und Antworten",
    }
}

/// Build the per-chunk prompt from an optional custom template.
///
/// A custom template only has to carry `{text}`; `{count}` and `{language}`
/// are substituted when present so templates can stay partial.
pub fn build_prompt(
    template: Option<&str>,
    count: usize,
    language: Language,
    chunk: &str,
) -> String {
    template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .replace("{count}", &count.to_string())
        .replace("{language}", language_fragment(language))
        .replace("{text}", chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prompt_substitutes_all_placeholders() {
        let prompt = build_prompt(None, 3, Language::German, "Der Rhein ist ein Fluss.");
        assert!(prompt.contains("generate 3 questions"));
        assert!(prompt.contains("auf Deutsch"));
        assert!(prompt.contains("Der Rhein ist ein Fluss."));
        assert!(!prompt.contains("{text}"));
        assert!(!prompt.contains("{count}"));
    }

    #[test]
    fn custom_template_keeps_its_wording() {
        let prompt = build_prompt(Some("Quiz me on: {text}"), 2, Language::English, "ions");
        assert_eq!(prompt, "Quiz me on: ions");
    }

    #[test]
    fn every_language_has_fragment_and_title() {
        for lang in Language::ALL {
            assert!(!language_fragment(lang).is_empty());
            assert!(!default_title(lang).is_empty());
        }
    }
}
