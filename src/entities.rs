//! Entity model owned by the orchestration core.
//!
//! A book exclusively owns its chapters (one per planned chapter number)
//! and at most one pricing strategy. Rows are never deleted; books retire
//! through the terminal `archived` status and chapters through
//! `published`. Everything here is plain data: all mutation goes through
//! the orchestrator, which wraps each entity in a version for optimistic
//! concurrency.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::machines::book::BookStatus;
use crate::machines::chapter::ChapterStatus;
use crate::machines::pricing::{PhaseRules, PricingPhase};

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(BookId);
entity_id!(ChapterId);
entity_id!(StrategyId);

/// A book moving through the production pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub lifecycle_status: BookStatus,
    pub target_chapter_count: u32,
    pub target_word_count: u32,
    /// Set once, on the first transition into `published_kdp`.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Book {
    pub fn new(title: impl Into<String>, target_chapter_count: u32, target_word_count: u32) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            lifecycle_status: BookStatus::ConceptPending,
            target_chapter_count,
            target_word_count,
            published_at: None,
            created_at: Utc::now(),
        }
    }
}

/// One chapter of a book. `chapter_number` is unique within the book.
///
/// `is_published` and `is_free` are monetization flags orthogonal to
/// `status`: a chapter can be made free or publicly visible in any
/// approval state. `revision_count` observes the reject/rewrite loop but
/// never guards it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: ChapterId,
    pub book_id: BookId,
    pub chapter_number: u32,
    pub status: ChapterStatus,
    pub is_published: bool,
    pub is_free: bool,
    /// Last rejection reason, shown to the rewrite worker.
    pub revision_notes: Option<String>,
    pub revision_count: u32,
    pub qa_reviewed_at: Option<DateTime<Utc>>,
    pub published_at: Option<DateTime<Utc>>,
}

impl Chapter {
    pub fn new(book_id: BookId, chapter_number: u32) -> Self {
        Self {
            id: ChapterId::new(),
            book_id,
            chapter_number,
            status: ChapterStatus::Pending,
            is_published: false,
            is_free: false,
            revision_notes: None,
            revision_count: 0,
            qa_reviewed_at: None,
            published_at: None,
        }
    }
}

/// Monetization flags settable independently of chapter status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterFlag {
    Published,
    Free,
}

impl fmt::Display for ChapterFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChapterFlag::Published => "published",
            ChapterFlag::Free => "free",
        })
    }
}

/// One immutable entry in a strategy's price-history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub price_usd: f64,
    pub phase: PricingPhase,
    pub reason: String,
    pub changed_at: DateTime<Utc>,
}

/// Commercial pricing state for one book, one-to-one with [`Book`].
///
/// `current_price_usd` and `current_phase` always mirror the most recent
/// `price_history` entry; [`PricingStrategy::log_price_change`] is the
/// only way either moves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingStrategy {
    pub id: StrategyId,
    pub book_id: BookId,
    pub current_phase: PricingPhase,
    pub current_price_usd: f64,
    pub auto_price_enabled: bool,
    pub reviews_threshold_for_growth: u32,
    pub days_in_launch_phase: u32,
    pub days_between_promotions: u32,
    pub last_promotion_date: Option<NaiveDate>,
    pub next_promotion_date: Option<NaiveDate>,
    pub price_history: Vec<PriceChange>,
}

impl PricingStrategy {
    /// New strategy in the launch phase, seeded with one ledger entry at
    /// the launch price so the mirror invariant holds from birth.
    pub fn launch(book_id: BookId, rules: &PhaseRules, now: DateTime<Utc>) -> Self {
        let mut strategy = Self {
            id: StrategyId::new(),
            book_id,
            current_phase: PricingPhase::Launch,
            current_price_usd: rules.launch_price_usd,
            auto_price_enabled: true,
            reviews_threshold_for_growth: rules.reviews_threshold_for_growth,
            days_in_launch_phase: rules.days_in_launch_phase,
            days_between_promotions: rules.days_between_promotions,
            last_promotion_date: None,
            next_promotion_date: None,
            price_history: Vec::new(),
        };
        strategy.log_price_change(rules.launch_price_usd, PricingPhase::Launch, "Initial launch", now);
        strategy
    }

    /// Append one entry to the ledger and update the current fields.
    /// Price validation happens at the façade boundary.
    pub fn log_price_change(
        &mut self,
        price_usd: f64,
        phase: PricingPhase,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) {
        self.price_history.push(PriceChange {
            price_usd,
            phase,
            reason: reason.into(),
            changed_at: now,
        });
        self.current_price_usd = price_usd;
        self.current_phase = phase;
    }
}
