//! Orchestration façade, versioned entity store, and the side-effect job
//! queue seam.

pub mod facade;
pub mod jobs;
pub mod store;

pub use facade::{BookState, BookTransition, ChapterTransition, FlagUpdate, Orchestrator};
pub use jobs::{EnqueueOutcome, GenerationJob, InMemoryJobQueue, JobQueue};
pub use store::{EntityStore, Versioned};
