// Job description and candidate profile state.
// Generation reads through `ContextStore`; only the handlers here write.

pub mod handlers;
pub mod store;
