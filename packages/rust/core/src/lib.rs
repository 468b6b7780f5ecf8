//! Core pipelines for ArticleSmith.
//!
//! This crate ties discovery, extraction, generation and storage together
//! into the two end-to-end workflows: [`evolution`] and [`ingest`].

pub mod evolution;
pub mod ingest;
pub mod rewriter;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use evolution::{EvolutionOrchestrator, EvolutionOutcome, EvolutionSettings, EvolutionStage};
pub use ingest::{IngestOutcome, IngestionPipeline, ProgressReporter, SilentProgress};
pub use rewriter::{
    GeminiGenerator, GenerativeRewriter, TextGenerator, build_prompt, prompt_fingerprint,
};
pub use services::Services;
