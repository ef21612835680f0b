// Resume and cover letter generation.
// Budget estimation, prompt composition, decoding and the retrying orchestrator.
// All model calls go through llm_client::ModelRuntime.

pub mod budget;
pub mod composer;
pub mod decoder;
pub mod generator;
pub mod handlers;
pub mod history;
pub mod prompts;
pub mod snapshot;
