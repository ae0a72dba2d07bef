//! Pricing phase machine.
//!
//! A published book's sale price moves through launch, growth, and mature
//! phases, with promo and bundle as side states. Automatic transitions
//! are driven by elapsed time and accumulated reviews; every phase or
//! price move, automatic or manual, lands in the append-only price
//! history ledger. This module holds the pure evaluation rules; the
//! orchestrator applies them and writes the ledger.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::PricingStrategy;

/// Commercial phase governing a book's sale price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingPhase {
    Launch,
    Growth,
    Mature,
    Promo,
    Bundle,
}

impl PricingPhase {
    pub const ALL: [PricingPhase; 5] = [
        PricingPhase::Launch,
        PricingPhase::Growth,
        PricingPhase::Mature,
        PricingPhase::Promo,
        PricingPhase::Bundle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PricingPhase::Launch => "launch",
            PricingPhase::Growth => "growth",
            PricingPhase::Mature => "mature",
            PricingPhase::Promo => "promo",
            PricingPhase::Bundle => "bundle",
        }
    }
}

impl fmt::Display for PricingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunable thresholds and price points for automatic phase movement.
/// Mirrors the defaults the production pipeline ships with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseRules {
    pub launch_price_usd: f64,
    pub growth_price_usd: f64,
    pub mature_price_usd: f64,
    pub reviews_threshold_for_growth: u32,
    pub days_in_launch_phase: u32,
    pub growth_to_mature_days: u32,
    pub growth_to_mature_reviews: u32,
    pub promo_duration_days: u32,
    pub days_between_promotions: u32,
    /// Lead time between scheduling a countdown deal and it going live.
    pub promotion_lead_days: u32,
}

impl Default for PhaseRules {
    fn default() -> Self {
        Self {
            launch_price_usd: 0.99,
            growth_price_usd: 2.99,
            mature_price_usd: 3.99,
            reviews_threshold_for_growth: 20,
            days_in_launch_phase: 7,
            growth_to_mature_days: 30,
            growth_to_mature_reviews: 50,
            promo_duration_days: 7,
            days_between_promotions: 90,
            promotion_lead_days: 7,
        }
    }
}

/// A pending automatic phase change, ready to be logged to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub phase: PricingPhase,
    pub price_usd: f64,
    pub reason: String,
}

/// Signals the daily sweep feeds into the evaluation. Review counts come
/// from an external review tracker; publish age from the book row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSignals {
    pub review_count: u32,
    pub days_since_publish: i64,
    pub today: NaiveDate,
}

/// Decide whether the strategy should move phase today. Returns `None`
/// when nothing fires; never mutates. The launch gate needs both the
/// day and the review thresholds; promos end on a fixed clock.
pub fn evaluate_auto_transition(
    strategy: &PricingStrategy,
    rules: &PhaseRules,
    signals: MarketSignals,
) -> Option<PhaseChange> {
    if !strategy.auto_price_enabled {
        return None;
    }

    match strategy.current_phase {
        PricingPhase::Launch => {
            if signals.days_since_publish >= i64::from(strategy.days_in_launch_phase)
                && signals.review_count >= strategy.reviews_threshold_for_growth
            {
                Some(PhaseChange {
                    phase: PricingPhase::Growth,
                    price_usd: rules.growth_price_usd,
                    reason: format!(
                        "Launch phase complete ({} days, {} reviews)",
                        signals.days_since_publish, signals.review_count
                    ),
                })
            } else {
                None
            }
        }
        PricingPhase::Growth => {
            if signals.days_since_publish >= i64::from(rules.growth_to_mature_days)
                && signals.review_count >= rules.growth_to_mature_reviews
            {
                Some(PhaseChange {
                    phase: PricingPhase::Mature,
                    price_usd: rules.mature_price_usd,
                    reason: format!(
                        "Growth complete ({} reviews, {} days)",
                        signals.review_count, signals.days_since_publish
                    ),
                })
            } else {
                None
            }
        }
        PricingPhase::Promo => {
            let promo_started = strategy.last_promotion_date?;
            let days_in_promo = (signals.today - promo_started).num_days();
            if days_in_promo >= i64::from(rules.promo_duration_days) {
                Some(PhaseChange {
                    phase: PricingPhase::Mature,
                    price_usd: rules.mature_price_usd,
                    reason: "Promotional period ended".to_string(),
                })
            } else {
                None
            }
        }
        // Mature is the resting phase; bundles are managed manually.
        PricingPhase::Mature | PricingPhase::Bundle => None,
    }
}

/// Next countdown-deal date, if one may be scheduled. Only mature-phase
/// strategies with auto pricing qualify, and the cooldown since the last
/// promotion must have elapsed.
pub fn next_promotion_date(
    strategy: &PricingStrategy,
    rules: &PhaseRules,
    today: NaiveDate,
) -> Option<NaiveDate> {
    if !strategy.auto_price_enabled || strategy.current_phase != PricingPhase::Mature {
        return None;
    }
    if let Some(last) = strategy.last_promotion_date {
        let since = (today - last).num_days();
        if since < i64::from(strategy.days_between_promotions) {
            return None;
        }
    }
    Some(today + Duration::days(i64::from(rules.promotion_lead_days)))
}
