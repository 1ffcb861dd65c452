//! idp-core — shared domain types, error taxonomy, and infrastructure traits
//! for the document processing and retrieval pipeline.
//!
//! Every stage crate (classifier, extractors, PII, chunking, retrieval, LLM
//! invocation) depends on this crate for its object-store, audit-store, and
//! work-queue abstractions so that a stage only needs to implement its own
//! domain logic, not its own plumbing.

// Model types use `from_str` methods that return Self (infallible parse),
// not Result<Self, Error> as std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod audit;
pub mod config;
pub mod error;
pub mod models;
pub mod object_store;
pub mod retry;
pub mod utils;
pub mod work_queue;
