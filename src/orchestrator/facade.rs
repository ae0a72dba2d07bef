//! Orchestration façade: the single entry point for every state mutation.
//!
//! Each action follows the same shape: load a versioned snapshot, check
//! the transition table, commit with compare-and-swap, then fire side
//! effects (generation jobs, chapter-row creation, pricing-strategy
//! creation). The commit is atomic per entity; side-effect enqueue
//! failures never roll back a committed transition.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::BookforgeConfig;
use crate::entities::{
    Book, BookId, Chapter, ChapterFlag, ChapterId, PriceChange, PricingStrategy, StrategyId,
};
use crate::error::{OrchestratorError, Result};
use crate::machines::book::{self, BookAction, BookStatus};
use crate::machines::chapter::{self, ChapterAction, ChapterStatus};
use crate::machines::pricing::{self, MarketSignals, PhaseChange, PricingPhase};

use super::jobs::{EnqueueOutcome, GenerationJob, JobQueue};
use super::store::{EntityStore, Versioned};

/// Result of a committed book transition.
#[derive(Debug, Clone, PartialEq)]
pub struct BookTransition {
    pub book_id: BookId,
    pub previous_status: BookStatus,
    pub new_status: BookStatus,
    pub progress: u8,
    pub version: u64,
    pub message: String,
}

/// Result of a committed chapter transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterTransition {
    pub chapter_id: ChapterId,
    pub previous_status: ChapterStatus,
    pub new_status: ChapterStatus,
    pub version: u64,
}

/// Result of a flag update. `changed` is false when the flag already held
/// the requested value; the write is skipped and the version untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagUpdate {
    pub chapter_id: ChapterId,
    pub flag: ChapterFlag,
    pub value: bool,
    pub version: u64,
    pub changed: bool,
}

/// Read model for one book: current row, display progress, and the
/// chapter status histogram (advisory, never a guard).
#[derive(Debug, Clone, PartialEq)]
pub struct BookState {
    pub book: Book,
    pub progress: u8,
    pub version: u64,
    pub chapter_histogram: BTreeMap<ChapterStatus, usize>,
}

pub struct Orchestrator {
    config: BookforgeConfig,
    books: EntityStore<BookId, Book>,
    chapters: EntityStore<ChapterId, Chapter>,
    strategies: EntityStore<StrategyId, PricingStrategy>,
    jobs: Arc<dyn JobQueue>,
}

impl Orchestrator {
    pub fn new(config: BookforgeConfig, jobs: Arc<dyn JobQueue>) -> Self {
        Self {
            config,
            books: EntityStore::new("book"),
            chapters: EntityStore::new("chapter"),
            strategies: EntityStore::new("pricing_strategy"),
            jobs,
        }
    }

    // ------------------------------------------------------------------
    // Book lifecycle
    // ------------------------------------------------------------------

    /// Register a new book in `concept_pending`.
    pub fn create_book(
        &self,
        title: impl Into<String>,
        target_chapter_count: Option<u32>,
        target_word_count: Option<u32>,
    ) -> Result<Versioned<Book>> {
        let book = Book::new(
            title,
            target_chapter_count.unwrap_or(self.config.writer.default_chapter_count),
            target_word_count.unwrap_or(self.config.writer.default_word_count),
        );
        let version = self.books.insert(book.id, book.clone())?;
        info!(book_id = %book.id, title = %book.title, "book created");
        Ok(Versioned { record: book, version })
    }

    /// Apply `action` to the book's current state.
    pub async fn transition_book(&self, book_id: BookId, action: BookAction) -> Result<BookTransition> {
        let current = self.books.get(book_id)?;
        self.transition_book_from(book_id, action, current.version).await
    }

    /// Apply `action` against the version the caller observed. Fails with
    /// `Conflict` if the book has moved since; the caller reloads and
    /// retries. This is the optimistic-concurrency entry point.
    pub async fn transition_book_from(
        &self,
        book_id: BookId,
        action: BookAction,
        expected_version: u64,
    ) -> Result<BookTransition> {
        let row = self.books.get(book_id)?;
        if row.version != expected_version {
            return Err(OrchestratorError::Conflict {
                entity: "book",
                id: book_id.to_string(),
                expected: expected_version,
                found: row.version,
            });
        }

        let previous_status = row.record.lifecycle_status;
        let new_status = book::next_status(previous_status, action)
            .ok_or_else(|| OrchestratorError::invalid_transition(previous_status, action))?;

        let mut book = row.record;
        book.lifecycle_status = new_status;
        if new_status == BookStatus::PublishedKdp && book.published_at.is_none() {
            book.published_at = Some(Utc::now());
        }

        let version = self.books.compare_and_swap(book_id, expected_version, book.clone())?;

        info!(
            book_id = %book_id,
            action = %action,
            from = %previous_status,
            to = %new_status,
            version = %version,
            "book transition committed"
        );

        // Side effects, post-commit. A failure here is logged, never
        // propagated: the state change already happened.
        if new_status == BookStatus::WritingInProgress {
            if let Err(error) = self.ensure_chapter_rows(&book) {
                warn!(book_id = %book_id, %error, "chapter row creation failed");
            }
        }
        if new_status == BookStatus::PublishedKdp {
            if let Err(error) = self.ensure_pricing_strategy(book_id) {
                warn!(book_id = %book_id, %error, "pricing strategy creation failed");
            }
        }
        if let Some(artifact) = book::triggered_artifact(new_status) {
            self.fire_job(GenerationJob::GenerateArtifact { book_id, artifact })
                .await;
        }

        Ok(BookTransition {
            book_id,
            previous_status,
            new_status,
            progress: new_status.progress_percent(),
            version,
            message: format!("Book moved from {previous_status} to {new_status}"),
        })
    }

    /// Administrative archive, outside the modeled transition table.
    /// Legal only for published books; `archived` freezes everything.
    pub fn archive_book(&self, book_id: BookId) -> Result<BookTransition> {
        let row = self.books.get(book_id)?;
        let previous_status = row.record.lifecycle_status;
        if !book::can_archive(previous_status) {
            return Err(OrchestratorError::invalid_transition(previous_status, "archive"));
        }

        let mut book = row.record;
        book.lifecycle_status = BookStatus::Archived;
        let version = self.books.compare_and_swap(book_id, row.version, book)?;

        info!(book_id = %book_id, from = %previous_status, "book archived");

        Ok(BookTransition {
            book_id,
            previous_status,
            new_status: BookStatus::Archived,
            progress: BookStatus::Archived.progress_percent(),
            version,
            message: format!("Book moved from {previous_status} to archived"),
        })
    }

    /// One row per planned chapter number, created when the book first
    /// enters writing. Idempotent across QA bounces.
    fn ensure_chapter_rows(&self, book: &Book) -> Result<usize> {
        let existing: HashSet<u32> = self
            .chapters
            .filter(|chapter| chapter.book_id == book.id)
            .into_iter()
            .map(|row| row.record.chapter_number)
            .collect();

        let mut created = 0;
        for number in 1..=book.target_chapter_count {
            if !existing.contains(&number) {
                let chapter = Chapter::new(book.id, number);
                self.chapters.insert(chapter.id, chapter)?;
                created += 1;
            }
        }
        if created > 0 {
            info!(book_id = %book.id, created = %created, "chapter rows created");
        }
        Ok(created)
    }

    fn ensure_pricing_strategy(&self, book_id: BookId) -> Result<StrategyId> {
        if let Ok(existing) = self.strategy_for_book(book_id) {
            return Ok(existing.record.id);
        }
        let strategy = PricingStrategy::launch(book_id, &self.config.pricing, Utc::now());
        let strategy_id = strategy.id;
        self.strategies.insert(strategy_id, strategy)?;
        info!(book_id = %book_id, strategy_id = %strategy_id, "pricing strategy created at launch price");
        Ok(strategy_id)
    }

    // ------------------------------------------------------------------
    // Chapter sub-machine
    // ------------------------------------------------------------------

    /// Apply `action` to the chapter's current state. Payload guards run
    /// before the table lookup, so empty rejection notes always fail
    /// `ValidationError` regardless of status.
    pub async fn transition_chapter(
        &self,
        chapter_id: ChapterId,
        action: ChapterAction,
    ) -> Result<ChapterTransition> {
        let current = self.chapters.get(chapter_id)?;
        self.transition_chapter_from(chapter_id, action, current.version)
            .await
    }

    /// Version-explicit variant of [`Orchestrator::transition_chapter`].
    pub async fn transition_chapter_from(
        &self,
        chapter_id: ChapterId,
        action: ChapterAction,
        expected_version: u64,
    ) -> Result<ChapterTransition> {
        if let ChapterAction::Reject { notes } = &action {
            if notes.trim().is_empty() {
                return Err(OrchestratorError::validation(
                    "rejection notes must not be empty",
                ));
            }
        }

        let row = self.chapters.get(chapter_id)?;
        if row.version != expected_version {
            return Err(OrchestratorError::Conflict {
                entity: "chapter",
                id: chapter_id.to_string(),
                expected: expected_version,
                found: row.version,
            });
        }

        let previous_status = row.record.status;
        let new_status = chapter::next_status(previous_status, &action)
            .ok_or_else(|| OrchestratorError::invalid_transition(previous_status, &action))?;

        let mut chapter = row.record;
        chapter.status = new_status;
        match &action {
            ChapterAction::Approve => {
                chapter.qa_reviewed_at = Some(Utc::now());
            }
            ChapterAction::Reject { notes } => {
                chapter.revision_notes = Some(notes.clone());
                chapter.revision_count += 1;
                chapter.qa_reviewed_at = Some(Utc::now());
            }
            ChapterAction::Publish => {
                chapter.published_at = Some(Utc::now());
            }
            _ => {}
        }

        let book_id = chapter.book_id;
        let version = self
            .chapters
            .compare_and_swap(chapter_id, expected_version, chapter)?;

        info!(
            chapter_id = %chapter_id,
            book_id = %book_id,
            action = %action,
            from = %previous_status,
            to = %new_status,
            version = %version,
            "chapter transition committed"
        );

        match action {
            ChapterAction::MarkReady => {
                self.fire_job(GenerationJob::WriteChapter { book_id, chapter_id })
                    .await;
            }
            ChapterAction::Reject { notes } => {
                self.fire_job(GenerationJob::RewriteChapter {
                    book_id,
                    chapter_id,
                    notes,
                })
                .await;
            }
            _ => {}
        }

        Ok(ChapterTransition {
            chapter_id,
            previous_status,
            new_status,
            version,
        })
    }

    /// Idempotent monetization-flag set, orthogonal to chapter status.
    pub fn set_chapter_flag(
        &self,
        chapter_id: ChapterId,
        flag: ChapterFlag,
        value: bool,
    ) -> Result<FlagUpdate> {
        let row = self.chapters.get(chapter_id)?;
        let mut chapter = row.record;

        let slot = match flag {
            ChapterFlag::Published => &mut chapter.is_published,
            ChapterFlag::Free => &mut chapter.is_free,
        };
        if *slot == value {
            return Ok(FlagUpdate {
                chapter_id,
                flag,
                value,
                version: row.version,
                changed: false,
            });
        }
        *slot = value;

        let version = self.chapters.compare_and_swap(chapter_id, row.version, chapter)?;
        info!(chapter_id = %chapter_id, flag = %flag, value = %value, "chapter flag updated");

        Ok(FlagUpdate {
            chapter_id,
            flag,
            value,
            version,
            changed: true,
        })
    }

    /// Queue write jobs for the next batch of ready chapters of a book in
    /// writing, oldest chapter number first, capped per sweep. The daily
    /// scheduler calls this; duplicates coalesce in the queue.
    pub async fn dispatch_ready_chapters(&self, book_id: BookId) -> Result<Vec<ChapterId>> {
        let book = self.books.get(book_id)?;
        if book.record.lifecycle_status != BookStatus::WritingInProgress {
            return Ok(Vec::new());
        }

        let mut ready: Vec<_> = self
            .chapters
            .filter(|chapter| {
                chapter.book_id == book_id && chapter.status == ChapterStatus::ReadyToWrite
            })
            .into_iter()
            .map(|row| row.record)
            .collect();
        ready.sort_by_key(|chapter| chapter.chapter_number);
        ready.truncate(self.config.writer.max_chapters_per_day as usize);

        let mut dispatched = Vec::with_capacity(ready.len());
        for chapter in ready {
            self.fire_job(GenerationJob::WriteChapter {
                book_id,
                chapter_id: chapter.id,
            })
            .await;
            dispatched.push(chapter.id);
        }
        Ok(dispatched)
    }

    // ------------------------------------------------------------------
    // Pricing
    // ------------------------------------------------------------------

    /// Append one entry to the price-history ledger and update the
    /// current price and phase. The sole way the ledger grows.
    pub fn log_price_change(
        &self,
        strategy_id: StrategyId,
        price_usd: f64,
        phase: PricingPhase,
        reason: &str,
    ) -> Result<Versioned<PricingStrategy>> {
        if !price_usd.is_finite() || price_usd < 0.0 {
            return Err(OrchestratorError::validation(format!(
                "price must be a non-negative amount, got {price_usd}"
            )));
        }
        if reason.trim().is_empty() {
            return Err(OrchestratorError::validation("price change reason must not be empty"));
        }

        let row = self.strategies.get(strategy_id)?;
        let mut strategy = row.record;
        strategy.log_price_change(price_usd, phase, reason, Utc::now());

        let version = self
            .strategies
            .compare_and_swap(strategy_id, row.version, strategy.clone())?;

        info!(
            strategy_id = %strategy_id,
            price_usd = %price_usd,
            phase = %phase,
            reason = %reason,
            "price change logged"
        );

        Ok(Versioned { record: strategy, version })
    }

    /// Daily auto-pricing check for one book. Review counts come from the
    /// external review tracker; only published books with auto pricing
    /// enabled move. Returns the applied change, if any.
    pub fn auto_transition_pricing(
        &self,
        book_id: BookId,
        review_count: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<PhaseChange>> {
        let book = self.books.get(book_id)?;
        if !book.record.lifecycle_status.is_published() {
            return Ok(None);
        }

        let row = self.strategy_for_book(book_id)?;
        let days_since_publish = book
            .record
            .published_at
            .map(|published| (now - published).num_days())
            .unwrap_or(0);
        let signals = MarketSignals {
            review_count,
            days_since_publish,
            today: now.date_naive(),
        };

        let Some(change) = pricing::evaluate_auto_transition(&row.record, &self.config.pricing, signals)
        else {
            return Ok(None);
        };

        let mut strategy = row.record;
        strategy.log_price_change(change.price_usd, change.phase, change.reason.clone(), now);
        self.strategies
            .compare_and_swap(strategy.id, row.version, strategy.clone())?;

        info!(
            book_id = %book_id,
            strategy_id = %strategy.id,
            phase = %change.phase,
            price_usd = %change.price_usd,
            "automatic pricing transition applied"
        );
        Ok(Some(change))
    }

    /// Enable or disable automatic phase transitions. Idempotent; manual
    /// price logging stays available either way.
    pub fn set_auto_pricing(
        &self,
        strategy_id: StrategyId,
        enabled: bool,
    ) -> Result<Versioned<PricingStrategy>> {
        let row = self.strategies.get(strategy_id)?;
        if row.record.auto_price_enabled == enabled {
            return Ok(row);
        }
        let mut strategy = row.record;
        strategy.auto_price_enabled = enabled;
        let version = self
            .strategies
            .compare_and_swap(strategy_id, row.version, strategy.clone())?;
        info!(strategy_id = %strategy_id, enabled = %enabled, "auto pricing toggled");
        Ok(Versioned { record: strategy, version })
    }

    /// Book the next countdown deal if the cooldown allows one.
    pub fn schedule_promotion(
        &self,
        strategy_id: StrategyId,
        today: NaiveDate,
    ) -> Result<Option<NaiveDate>> {
        let row = self.strategies.get(strategy_id)?;
        let Some(date) = pricing::next_promotion_date(&row.record, &self.config.pricing, today) else {
            return Ok(None);
        };

        let mut strategy = row.record;
        strategy.next_promotion_date = Some(date);
        self.strategies
            .compare_and_swap(strategy_id, row.version, strategy)?;

        info!(strategy_id = %strategy_id, promotion_date = %date, "countdown deal scheduled");
        Ok(Some(date))
    }

    /// Enter the promo side-state at the given deal price. Records the
    /// promotion start so the cooldown and the promo-end clock apply.
    pub fn begin_promotion(
        &self,
        strategy_id: StrategyId,
        price_usd: f64,
        today: NaiveDate,
    ) -> Result<Versioned<PricingStrategy>> {
        if !price_usd.is_finite() || price_usd < 0.0 {
            return Err(OrchestratorError::validation(format!(
                "price must be a non-negative amount, got {price_usd}"
            )));
        }

        let row = self.strategies.get(strategy_id)?;
        let mut strategy = row.record;
        strategy.log_price_change(price_usd, PricingPhase::Promo, "Countdown deal started", Utc::now());
        strategy.last_promotion_date = Some(today);
        strategy.next_promotion_date = None;

        let version = self
            .strategies
            .compare_and_swap(strategy_id, row.version, strategy.clone())?;

        info!(strategy_id = %strategy_id, price_usd = %price_usd, "promotion started");
        Ok(Versioned { record: strategy, version })
    }

    // ------------------------------------------------------------------
    // Read accessors (pure, no side effects)
    // ------------------------------------------------------------------

    pub fn get_book_state(&self, book_id: BookId) -> Result<BookState> {
        let row = self.books.get(book_id)?;
        let histogram = self.histogram_for(book_id);
        Ok(BookState {
            progress: row.record.lifecycle_status.progress_percent(),
            book: row.record,
            version: row.version,
            chapter_histogram: histogram,
        })
    }

    pub fn get_chapter_state(&self, chapter_id: ChapterId) -> Result<Versioned<Chapter>> {
        self.chapters.get(chapter_id)
    }

    /// Chapter counts per status for a book. Advisory: export gating does
    /// not consult it.
    pub fn get_chapter_histogram(&self, book_id: BookId) -> Result<BTreeMap<ChapterStatus, usize>> {
        self.books.get(book_id)?;
        Ok(self.histogram_for(book_id))
    }

    pub fn chapters_for_book(&self, book_id: BookId) -> Result<Vec<Versioned<Chapter>>> {
        self.books.get(book_id)?;
        let mut rows = self.chapters.filter(|chapter| chapter.book_id == book_id);
        rows.sort_by_key(|row| row.record.chapter_number);
        Ok(rows)
    }

    pub fn get_pricing(&self, strategy_id: StrategyId) -> Result<Versioned<PricingStrategy>> {
        self.strategies.get(strategy_id)
    }

    pub fn get_price_history(&self, strategy_id: StrategyId) -> Result<Vec<PriceChange>> {
        Ok(self.strategies.get(strategy_id)?.record.price_history)
    }

    pub fn strategy_for_book(&self, book_id: BookId) -> Result<Versioned<PricingStrategy>> {
        self.strategies
            .filter(|strategy| strategy.book_id == book_id)
            .into_iter()
            .next()
            .ok_or_else(|| OrchestratorError::not_found("pricing_strategy", book_id))
    }

    fn histogram_for(&self, book_id: BookId) -> BTreeMap<ChapterStatus, usize> {
        let mut histogram = BTreeMap::new();
        for row in self.chapters.filter(|chapter| chapter.book_id == book_id) {
            *histogram.entry(row.record.status).or_insert(0) += 1;
        }
        histogram
    }

    /// Fire-and-forget enqueue. Enqueue failure is logged and retryable
    /// via the same action; the committed transition stands.
    async fn fire_job(&self, job: GenerationJob) {
        match self.jobs.enqueue(job.clone()).await {
            Ok(EnqueueOutcome::Queued) => {
                info!(job = ?job, "generation job queued");
            }
            Ok(EnqueueOutcome::Coalesced) => {
                info!(job = ?job, "generation job coalesced with pending duplicate");
            }
            Err(error) => {
                warn!(job = ?job, %error, "generation job enqueue failed; transition already committed");
            }
        }
    }
}
