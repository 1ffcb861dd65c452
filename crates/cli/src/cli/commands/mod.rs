pub mod ambient;
pub mod llm;
pub mod pii;
pub mod pipeline;
pub mod prompt;
pub mod retrieval;
