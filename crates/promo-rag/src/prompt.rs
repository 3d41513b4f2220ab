//! Generation prompt assembly.
//!
//! The template is deterministic and bounded: snippets are capped at 100
//! characters and the question at 200, so total prompt size depends only on
//! K, never on how verbose the scraped offers or the user are.

use promo_index::RetrievedOffer;

/// Maximum snippet length per retrieved offer, in characters.
pub const SNIPPET_MAX_CHARS: usize = 100;

/// Maximum length of the quoted user question, in characters.
pub const QUESTION_MAX_CHARS: usize = 200;

const PERSONA: &str =
    "You are PromoSensei, a smart assistant that finds and summarizes e-commerce promotions.";
const CONTEXT_HEADER: &str = "Here are some relevant offers (truncated to 100 chars each):";
const CLOSING: &str =
    "Please answer concisely and in a friendly tone, referencing the offers above.";

/// Renders retrieved offers and a question into one generation prompt.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    snippet_chars: usize,
    question_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            snippet_chars: SNIPPET_MAX_CHARS,
            question_chars: QUESTION_MAX_CHARS,
        }
    }
}

impl PromptBuilder {
    /// Build the prompt for a retrieved set and question.
    pub fn build(&self, retrieved: &[RetrievedOffer], question: &str) -> String {
        let mut lines = vec![PERSONA.to_string(), CONTEXT_HEADER.to_string()];

        for (i, offer) in retrieved.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, self.snippet(&offer.document)));
            lines.push(format!(
                "   \u{2022} Brand: {}; Discount: {}; Expiry: {}",
                offer.metadata.brand,
                offer.metadata.discount_or_placeholder(),
                offer.metadata.expiry_or_placeholder(),
            ));
        }

        lines.push(format!(
            "\nUser asked: {}",
            truncate_chars(question, self.question_chars)
        ));
        lines.push(CLOSING.to_string());

        lines.join("\n")
    }

    /// Flatten newlines, cap the length, and mark truncation.
    fn snippet(&self, document: &str) -> String {
        let flat = document.replace('\n', " ");
        let mut snippet: String = flat.chars().take(self.snippet_chars).collect();
        snippet.truncate(snippet.trim_end().len());
        if flat.chars().count() > self.snippet_chars {
            snippet.push('\u{2026}');
        }
        snippet
    }
}

/// First `max` characters of `text`, safe on multi-byte input.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
