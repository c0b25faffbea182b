//! RFV model: per-customer scoring and segment assignment

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::CustomerOrderAggregate;
use crate::scoring::{days_between, Recency, ScoreCard};
use crate::segment::{classify, Segment, SegmentInput};

/// A scored and classified customer for one reporting window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RfvRecord {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub last_order_date: Option<NaiveDate>,
    pub order_count: u32,
    pub total_spent: f64,
    pub average_order_value: Option<f64>,
    pub total_items: u64,
    pub registration_date: NaiveDate,
    pub window_end_date: NaiveDate,

    /// Serialized as a day count, `null` when never purchased
    pub days_since_last_order: Recency,
    pub days_since_registration: u32,
    pub recency_score: u8,
    pub frequency_score: u8,
    pub value_score: u8,
    pub total_score: u8,
    pub segment: Segment,
    pub recommended_action: &'static str,
}

impl RfvRecord {
    pub fn scores(&self) -> ScoreCard {
        ScoreCard::new(self.recency_score, self.frequency_score, self.value_score)
    }

    /// Placed more than one order in the window
    pub fn is_recurring(&self) -> bool {
        self.order_count > 1
    }
}

/// Score and classify a single customer
pub fn score_customer(aggregate: CustomerOrderAggregate) -> RfvRecord {
    // Without orders in the window there is no last order to measure from.
    let recency = if aggregate.order_count == 0 {
        Recency::NeverPurchased
    } else {
        Recency::between(aggregate.last_order_date, aggregate.window_end_date)
    };
    let scores = ScoreCard::score(recency, aggregate.order_count, aggregate.total_spent);
    let segment = classify(&SegmentInput {
        scores,
        order_count: aggregate.order_count,
        total_spent: aggregate.total_spent,
    });

    // Zero-order customers never carry an average.
    let average_order_value = if aggregate.order_count == 0 {
        None
    } else {
        aggregate.average_order_value
    };

    RfvRecord {
        days_since_last_order: recency,
        days_since_registration: days_between(
            aggregate.registration_date,
            aggregate.window_end_date,
        ),
        recency_score: scores.recency,
        frequency_score: scores.frequency,
        value_score: scores.value,
        total_score: scores.total(),
        segment,
        recommended_action: segment.recommended_action(),
        customer_id: aggregate.customer_id,
        name: aggregate.name,
        email: aggregate.email,
        city: aggregate.city,
        state: aggregate.state,
        last_order_date: aggregate.last_order_date,
        order_count: aggregate.order_count,
        total_spent: aggregate.total_spent,
        average_order_value,
        total_items: aggregate.total_items,
        registration_date: aggregate.registration_date,
        window_end_date: aggregate.window_end_date,
    }
}

/// Classified customers for one batch, in input order
#[derive(Debug, Clone, Default, Serialize)]
pub struct RfvModel {
    pub records: Vec<RfvRecord>,
}

impl RfvModel {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Customer count per segment, in segment priority order
    pub fn segment_sizes(&self) -> Vec<(Segment, usize)> {
        Segment::ALL
            .iter()
            .map(|segment| {
                let size = self
                    .records
                    .iter()
                    .filter(|record| record.segment == *segment)
                    .count();
                (*segment, size)
            })
            .collect()
    }

    pub fn into_records(self) -> Vec<RfvRecord> {
        self.records
    }
}

/// Score and classify a whole batch. One record per input row, same order.
pub fn build_rfv_model(aggregates: Vec<CustomerOrderAggregate>) -> RfvModel {
    let records: Vec<RfvRecord> = aggregates.into_iter().map(score_customer).collect();

    tracing::info!(customers = records.len(), "rfv model built");
    for record in &records {
        tracing::trace!(
            customer_id = record.customer_id,
            segment = %record.segment,
            total_score = record.total_score,
            "customer classified"
        );
    }

    let model = RfvModel { records };
    for (segment, customers) in model.segment_sizes() {
        tracing::debug!(%segment, customers, "segment size");
    }
    model
}
