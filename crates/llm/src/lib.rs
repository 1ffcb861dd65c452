//! Cascading LLM routing, health-checked backend invocation, and prompt
//! template rendering (C20-C22).
//!
//! The Router sanitizes an incoming request and decides which backend
//! should answer it, either because the caller named one explicitly or by
//! cascading through heuristic, predictive, and generative strategies until
//! one picks a backend. The decorated request is handed to the Invoker,
//! which dispatches to a health-checked backend and can escalate from a
//! weak model to a strong one when the weak reply looks insufficient. The
//! Prompt Engine sits in front of both: it renders a named template with
//! caller-supplied variables before the prompt ever reaches the Router.

pub mod invoker;
pub mod prompt_engine;
pub mod router;

pub use invoker::{BedrockDefaults, BedrockEquivalentBackend, Invoker, InvokerClassifier, LlmBackend, OllamaDefaults, OllamaEquivalentBackend};
pub use prompt_engine::{render_template, PromptEngine, PromptLibrary, PromptTemplate};
pub use router::{
    is_response_sufficient, sanitize_payload, Complexity, GenerativeRouter, HeuristicRouter, LengthOp, LengthUnit,
    LlmRouter, PredictiveRouter, PromptClassifier, RouteDecision, Rule,
};
