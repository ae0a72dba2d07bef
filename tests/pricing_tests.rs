//! Pricing phase machine tests.
//!
//! Coverage:
//! - Strategy creation at launch price when a book first reaches KDP
//! - The append-only price-history ledger and its mirror invariant
//! - Threshold-driven automatic phase transitions
//! - Promotion scheduling and the cooldown between countdown deals

use chrono::{Duration, NaiveDate, Utc};
use std::sync::Arc;

use bookforge::{
    BookAction, BookId, BookforgeConfig, InMemoryJobQueue, Orchestrator, OrchestratorError,
    PricingPhase, StrategyId,
};

fn setup() -> Orchestrator {
    let queue = Arc::new(InMemoryJobQueue::new());
    Orchestrator::new(BookforgeConfig::default(), queue)
}

async fn published_book(orchestrator: &Orchestrator) -> BookId {
    let book = orchestrator.create_book("Winter Orchard", Some(3), None).unwrap();
    for action in [
        BookAction::StartKeywordResearch,
        BookAction::ApproveKeywords,
        BookAction::StartWriting,
        BookAction::SubmitForQa,
        BookAction::ApproveForExport,
        BookAction::PublishToKdp,
    ] {
        orchestrator.transition_book(book.record.id, action).await.unwrap();
    }
    book.record.id
}

#[tokio::test]
async fn publishing_to_kdp_creates_a_launch_strategy() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;

    let strategy = orchestrator.strategy_for_book(book_id).unwrap();
    assert_eq!(strategy.record.current_phase, PricingPhase::Launch);
    assert_eq!(strategy.record.current_price_usd, 0.99);
    assert!(strategy.record.auto_price_enabled);
    assert_eq!(strategy.record.price_history.len(), 1);
    assert_eq!(strategy.record.price_history[0].reason, "Initial launch");
}

#[tokio::test]
async fn ledger_grows_by_exactly_one_per_logged_change() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;
    let strategy_id = orchestrator.strategy_for_book(book_id).unwrap().record.id;
    let seeded = orchestrator.get_price_history(strategy_id).unwrap().len();

    let changes = [
        (1.99, PricingPhase::Launch, "A/B price test"),
        (2.99, PricingPhase::Growth, "Manual growth bump"),
        (0.99, PricingPhase::Promo, "Flash sale"),
        (3.99, PricingPhase::Mature, "Back to list price"),
    ];
    for (index, (price, phase, reason)) in changes.iter().enumerate() {
        let updated = orchestrator
            .log_price_change(strategy_id, *price, *phase, reason)
            .unwrap();
        assert_eq!(updated.record.price_history.len(), seeded + index + 1);
        assert_eq!(updated.record.current_price_usd, *price);
        assert_eq!(updated.record.current_phase, *phase);
    }

    // The ledger is an audit trail: earlier entries are untouched.
    let history = orchestrator.get_price_history(strategy_id).unwrap();
    assert_eq!(history.len(), seeded + changes.len());
    assert_eq!(history[seeded].reason, "A/B price test");
    assert_eq!(history.last().unwrap().price_usd, 3.99);
}

#[tokio::test]
async fn price_changes_validate_amount_and_reason() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;
    let strategy_id = orchestrator.strategy_for_book(book_id).unwrap().record.id;

    for bad_price in [-0.99, f64::NAN, f64::INFINITY] {
        let err = orchestrator
            .log_price_change(strategy_id, bad_price, PricingPhase::Launch, "test")
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Validation { .. }));
    }

    let err = orchestrator
        .log_price_change(strategy_id, 1.99, PricingPhase::Launch, "  ")
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::Validation { .. }));

    assert_eq!(orchestrator.get_price_history(strategy_id).unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_strategy_is_not_found() {
    let orchestrator = setup();
    let err = orchestrator
        .log_price_change(StrategyId::new(), 1.99, PricingPhase::Launch, "test")
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound { .. }));
}

#[tokio::test]
async fn launch_moves_to_growth_only_after_days_and_reviews() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;

    // Day 3, plenty of reviews: too early.
    let early = Utc::now() + Duration::days(3);
    assert!(orchestrator
        .auto_transition_pricing(book_id, 40, early)
        .unwrap()
        .is_none());

    // Day 14, too few reviews: still waiting.
    let later = Utc::now() + Duration::days(14);
    assert!(orchestrator
        .auto_transition_pricing(book_id, 5, later)
        .unwrap()
        .is_none());

    // Both thresholds met.
    let change = orchestrator
        .auto_transition_pricing(book_id, 40, later)
        .unwrap()
        .unwrap();
    assert_eq!(change.phase, PricingPhase::Growth);
    assert_eq!(change.price_usd, 2.99);

    let strategy = orchestrator.strategy_for_book(book_id).unwrap();
    assert_eq!(strategy.record.current_phase, PricingPhase::Growth);
    assert_eq!(strategy.record.price_history.len(), 2);
}

#[tokio::test]
async fn growth_matures_and_then_rests() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;

    let day_14 = Utc::now() + Duration::days(14);
    orchestrator.auto_transition_pricing(book_id, 40, day_14).unwrap().unwrap();

    let day_45 = Utc::now() + Duration::days(45);
    let change = orchestrator
        .auto_transition_pricing(book_id, 80, day_45)
        .unwrap()
        .unwrap();
    assert_eq!(change.phase, PricingPhase::Mature);
    assert_eq!(change.price_usd, 3.99);

    // Mature is the resting phase; nothing further fires.
    let day_200 = Utc::now() + Duration::days(200);
    assert!(orchestrator
        .auto_transition_pricing(book_id, 500, day_200)
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn auto_pricing_ignores_unpublished_books() {
    let orchestrator = setup();
    let book = orchestrator.create_book("Quiet Tides", Some(3), None).unwrap();
    let result = orchestrator
        .auto_transition_pricing(book.record.id, 100, Utc::now())
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn disabled_auto_pricing_freezes_the_phase() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;
    let strategy_id = orchestrator.strategy_for_book(book_id).unwrap().record.id;

    // Operators can pin the price by turning the automation off.
    let pinned = orchestrator.set_auto_pricing(strategy_id, false).unwrap();
    assert!(!pinned.record.auto_price_enabled);

    let day_100 = Utc::now() + Duration::days(100);
    assert!(orchestrator
        .auto_transition_pricing(book_id, 500, day_100)
        .unwrap()
        .is_none());

    // Toggling is idempotent.
    let repeat = orchestrator.set_auto_pricing(strategy_id, false).unwrap();
    assert_eq!(repeat.version, pinned.version);

    // Re-enabling resumes the normal progression.
    orchestrator.set_auto_pricing(strategy_id, true).unwrap();
    let change = orchestrator
        .auto_transition_pricing(book_id, 500, day_100)
        .unwrap()
        .unwrap();
    assert_eq!(change.phase, PricingPhase::Growth);
}

#[tokio::test]
async fn promotions_respect_the_cooldown_between_deals() {
    let orchestrator = setup();
    let book_id = published_book(&orchestrator).await;
    let strategy_id = orchestrator.strategy_for_book(book_id).unwrap().record.id;

    // Move the strategy to mature, where promotions are allowed.
    orchestrator
        .log_price_change(strategy_id, 3.99, PricingPhase::Mature, "List price")
        .unwrap();

    let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    let scheduled = orchestrator.schedule_promotion(strategy_id, today).unwrap().unwrap();
    assert_eq!(scheduled, today + Duration::days(7));

    // Start the deal; the ledger records the promo entry.
    let promo = orchestrator.begin_promotion(strategy_id, 0.99, scheduled).unwrap();
    assert_eq!(promo.record.current_phase, PricingPhase::Promo);
    assert_eq!(promo.record.last_promotion_date, Some(scheduled));
    assert!(promo.record.next_promotion_date.is_none());

    // The promo window ends automatically after seven days.
    let after_window = Utc::now() + Duration::days(400);
    let change = orchestrator
        .auto_transition_pricing(book_id, 10, after_window)
        .unwrap()
        .unwrap();
    assert_eq!(change.phase, PricingPhase::Mature);

    // Another deal inside the 90-day cooldown is refused.
    let too_soon = scheduled + Duration::days(30);
    assert!(orchestrator.schedule_promotion(strategy_id, too_soon).unwrap().is_none());

    // After the cooldown it opens up again.
    let next_year = scheduled + Duration::days(120);
    assert!(orchestrator.schedule_promotion(strategy_id, next_year).unwrap().is_some());
}
