//! Pure state machines: transition tables, guards, and evaluation rules.
//!
//! Nothing in this module performs IO or mutates stored entities; the
//! orchestrator loads state, consults these tables, and commits the
//! result atomically.

pub mod book;
pub mod chapter;
pub mod pricing;

pub use book::{Artifact, BookAction, BookStatus};
pub use chapter::{ChapterAction, ChapterStatus};
pub use pricing::{MarketSignals, PhaseChange, PhaseRules, PricingPhase};
