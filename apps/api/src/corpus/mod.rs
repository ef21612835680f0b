// Candidate document corpus: chunking at scan time, persistence, and the
// lexical index used for retrieval-mode prompts.

pub mod chunker;
pub mod handlers;
pub mod index;
pub mod store;
