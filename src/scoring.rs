//! Recency, Frequency and Value score tables
//!
//! Every score is an integer in `1..=5`. The bands are static tables walked
//! top to bottom so the thresholds can be audited in one place.

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// Lowest score any dimension can receive
pub const MIN_SCORE: u8 = 1;
/// Highest score any dimension can receive
pub const MAX_SCORE: u8 = 5;

/// Recency bands as (inclusive upper bound in days, score)
const RECENCY_BANDS: [(u32, u8); 4] = [(30, MAX_SCORE), (60, 4), (90, 3), (180, 2)];

/// Frequency bands as (inclusive lower bound in orders, score)
const FREQUENCY_BANDS: [(u32, u8); 4] = [(10, MAX_SCORE), (5, 4), (3, 3), (1, 2)];

/// Value bands as (inclusive lower bound in currency units, score)
const VALUE_BANDS: [(f64, u8); 4] = [(5000.0, MAX_SCORE), (2000.0, 4), (1000.0, 3), (500.0, 2)];

/// Days elapsed since a customer's last order, relative to the window end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recency {
    /// At least one order in the window, `n` days before its end
    Days(u32),
    /// No order in the window
    NeverPurchased,
}

impl Recency {
    /// Compute recency between the last order and the window end.
    ///
    /// An order dated after the window end counts as 0 days.
    pub fn between(last_order_date: Option<NaiveDate>, window_end: NaiveDate) -> Self {
        match last_order_date {
            Some(date) => Recency::Days(days_between(date, window_end)),
            None => Recency::NeverPurchased,
        }
    }

    /// Day count, `None` for customers that never purchased
    pub fn days(&self) -> Option<u32> {
        match self {
            Recency::Days(days) => Some(*days),
            Recency::NeverPurchased => None,
        }
    }
}

// Exported as the day count, or null for the sentinel.
impl Serialize for Recency {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recency::Days(days) => serializer.serialize_u32(*days),
            Recency::NeverPurchased => serializer.serialize_none(),
        }
    }
}

/// Whole days from `from` to `to`, clamped at zero
pub fn days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let days = (to - from).num_days();
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Score how recently a customer ordered
pub fn recency_score(recency: Recency) -> u8 {
    match recency {
        Recency::Days(days) => RECENCY_BANDS
            .iter()
            .find(|(max_days, _)| days <= *max_days)
            .map(|(_, score)| *score)
            .unwrap_or(MIN_SCORE),
        Recency::NeverPurchased => MIN_SCORE,
    }
}

/// Score how often a customer ordered
pub fn frequency_score(order_count: u32) -> u8 {
    FREQUENCY_BANDS
        .iter()
        .find(|(min_orders, _)| order_count >= *min_orders)
        .map(|(_, score)| *score)
        .unwrap_or(MIN_SCORE)
}

/// Score how much a customer spent
pub fn value_score(total_spent: f64) -> u8 {
    VALUE_BANDS
        .iter()
        .find(|(min_spent, _)| total_spent >= *min_spent)
        .map(|(_, score)| *score)
        .unwrap_or(MIN_SCORE)
}

/// The three RFV scores of a single customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ScoreCard {
    pub recency: u8,
    pub frequency: u8,
    pub value: u8,
}

impl ScoreCard {
    pub fn new(recency: u8, frequency: u8, value: u8) -> Self {
        Self {
            recency,
            frequency,
            value,
        }
    }

    /// Score a customer from its raw recency, order count and spend
    pub fn score(recency: Recency, order_count: u32, total_spent: f64) -> Self {
        Self::new(
            recency_score(recency),
            frequency_score(order_count),
            value_score(total_spent),
        )
    }

    /// Sum of the three scores, always in `3..=15`
    pub fn total(&self) -> u8 {
        self.recency + self.frequency + self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_recency_boundaries() {
        assert_eq!(recency_score(Recency::Days(0)), 5);
        assert_eq!(recency_score(Recency::Days(30)), 5);
        assert_eq!(recency_score(Recency::Days(31)), 4);
        assert_eq!(recency_score(Recency::Days(60)), 4);
        assert_eq!(recency_score(Recency::Days(61)), 3);
        assert_eq!(recency_score(Recency::Days(90)), 3);
        assert_eq!(recency_score(Recency::Days(91)), 2);
        assert_eq!(recency_score(Recency::Days(180)), 2);
        assert_eq!(recency_score(Recency::Days(181)), 1);
        assert_eq!(recency_score(Recency::NeverPurchased), 1);
    }

    #[test]
    fn test_frequency_boundaries() {
        assert_eq!(frequency_score(0), 1);
        assert_eq!(frequency_score(1), 2);
        assert_eq!(frequency_score(2), 2);
        assert_eq!(frequency_score(3), 3);
        assert_eq!(frequency_score(4), 3);
        assert_eq!(frequency_score(5), 4);
        assert_eq!(frequency_score(9), 4);
        assert_eq!(frequency_score(10), 5);
        assert_eq!(frequency_score(250), 5);
    }

    #[test]
    fn test_value_boundaries() {
        assert_eq!(value_score(0.0), 1);
        assert_eq!(value_score(499.99), 1);
        assert_eq!(value_score(500.0), 2);
        assert_eq!(value_score(999.99), 2);
        assert_eq!(value_score(1000.0), 3);
        assert_eq!(value_score(2000.0), 4);
        assert_eq!(value_score(4999.99), 4);
        assert_eq!(value_score(5000.0), 5);
    }

    #[test]
    fn test_recency_between() {
        let end = date(2024, 6, 30);
        assert_eq!(
            Recency::between(Some(date(2024, 6, 20)), end),
            Recency::Days(10)
        );
        assert_eq!(Recency::between(None, end), Recency::NeverPurchased);
        // Orders past the window end clamp to zero days
        assert_eq!(
            Recency::between(Some(date(2024, 7, 5)), end),
            Recency::Days(0)
        );
    }

    #[test]
    fn test_score_card_total() {
        let card = ScoreCard::score(Recency::Days(10), 12, 6200.0);
        assert_eq!(card, ScoreCard::new(5, 5, 5));
        assert_eq!(card.total(), 15);

        let card = ScoreCard::score(Recency::NeverPurchased, 0, 0.0);
        assert_eq!(card.total(), 3);
    }

    #[test]
    fn test_recency_serializes_sentinel_as_null() {
        assert_eq!(serde_json::to_string(&Recency::Days(42)).unwrap(), "42");
        assert_eq!(
            serde_json::to_string(&Recency::NeverPurchased).unwrap(),
            "null"
        );
    }
}
