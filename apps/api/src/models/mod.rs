pub mod chunk;
pub mod document;
pub mod job;
pub mod profile;
pub mod resume;
