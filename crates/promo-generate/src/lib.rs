//! # promo-generate
//!
//! Local text generation for PromoSensei.
//!
//! Wraps google/flan-t5-small running on Candle behind the [`TextGenerator`]
//! trait. Decoding uses beam search with a repetition penalty and early
//! stopping, so identical prompts always produce identical answers.

pub mod error;
pub mod generator;
pub mod t5;

pub use error::GenerateError;
pub use generator::{GenerationConfig, TextGenerator};
pub use t5::FlanT5Generator;
