//! Retrieval-augmented study-content service.
//!
//! ```text
//! Ingestion:  document ──► chunker ──► embeddings (fan-out) ──► stores (bulk insert)
//!
//! Query:      query text ──► embeddings ──► stores (ranked similarity)
//!                                                 │
//! Generation:                     retrieval ──► orchestrator ──► completions (LLM)
//!
//! Outline:    syllabus (independent tree lookups over subject/paper/topic/subtopic)
//!
//! HTTP:       server (/ingest, /search, /orchestrate) over the services above
//! ```
//!
//! Every non-trivial operation is delegated: similarity ranking runs inside
//! the database's vector extension and text generation inside the hosted LLM.
//! The crate's own work is chunking, prompt assembly, and wiring.

pub mod chunker;
pub mod completions;
pub mod config;
pub mod embeddings;
pub mod orchestrator;
pub mod retrieval;
pub mod server;
pub mod stores;
pub mod syllabus;
pub mod types;

pub use config::Config;
pub use types::ServiceError;
