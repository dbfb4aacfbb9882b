//! AI assistant runtime for the portfolio backend.
//!
//! This crate is the conversational side of the system:
//! - **Classification** (`classifier`) - map raw text to a structured
//!   classification (type, intent, keywords, entities, confidence)
//! - **Prompt composition** (`prompts`) - build provider-agnostic prompts from
//!   classification plus live portfolio context
//! - **Providers** (`providers`) - interchangeable LLM backends behind one
//!   trait, driven by a manager with strict sequential fallback
//! - **Agent pipeline** (`pipeline`) - classify, generate, validate, finalize
//! - **Search orchestration** (`search`) - repository search merged across
//!   categories with a navigation/information branch and deterministic
//!   fallbacks when no provider is reachable
//!
//! # Design principle
//!
//! Providers are opaque text generators. Every decision with observable
//! semantics - which provider runs, in what order, how failures degrade,
//! what counts as a valid response - is made deterministically here, so the
//! whole control flow is testable without network access.

pub mod classifier;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod search;
pub mod service;

pub use classifier::{classify, Classification, MessageType};
pub use pipeline::{AgentExecution, AgentPipeline, ChatOutcome, ChatRequest};
pub use providers::{
    ChatProvider, GenerateOptions, GeneratedResponse, ProviderId, ProviderManager,
};
pub use search::{SearchOrchestrator, SearchOutcome, SearchQuery, SearchSummary, SearchType};
pub use service::{AiService, AiStatus};
