// Bookforge - orchestration core for a multi-stage AI book production
// pipeline: the book lifecycle machine, the per-chapter approval
// sub-machine, the pricing phase machine, and the façade that mediates
// every state mutation.

pub mod config;
pub mod entities;
pub mod error;
pub mod machines;
pub mod orchestrator;
pub mod telemetry;

// Re-export key types for easy access
pub use config::BookforgeConfig;
pub use entities::{
    Book, BookId, Chapter, ChapterFlag, ChapterId, PriceChange, PricingStrategy, StrategyId,
};
pub use error::OrchestratorError;
pub use machines::{
    Artifact, BookAction, BookStatus, ChapterAction, ChapterStatus, MarketSignals, PhaseChange,
    PhaseRules, PricingPhase,
};
pub use orchestrator::{
    BookState, BookTransition, ChapterTransition, EnqueueOutcome, FlagUpdate, GenerationJob,
    InMemoryJobQueue, JobQueue, Orchestrator, Versioned,
};
pub use telemetry::{generate_correlation_id, init_telemetry};
