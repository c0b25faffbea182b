//! Filtering, sorting and per-segment roll-ups of classified customers

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::Serialize;

use crate::error::SegmentFilterError;
use crate::model::RfvRecord;
use crate::scoring::Recency;
use crate::segment::Segment;

/// Values meaning "no filter"
const PASSTHROUGH_NAMES: [&str; 2] = ["All", "Todos"];

/// Restricts a classified batch to one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SegmentFilter {
    #[default]
    All,
    Only(Segment),
}

impl SegmentFilter {
    pub fn matches(&self, record: &RfvRecord) -> bool {
        match self {
            SegmentFilter::All => true,
            SegmentFilter::Only(segment) => record.segment == *segment,
        }
    }

    /// Keep matching records, preserving their order
    pub fn apply(&self, mut records: Vec<RfvRecord>) -> Vec<RfvRecord> {
        records.retain(|record| self.matches(record));
        records
    }
}

impl FromStr for SegmentFilter {
    type Err = SegmentFilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if PASSTHROUGH_NAMES
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(name))
        {
            return Ok(SegmentFilter::All);
        }

        Segment::from_name(name)
            .map(SegmentFilter::Only)
            .ok_or_else(|| SegmentFilterError::Unknown {
                given: name.to_string(),
                accepted: Segment::ALL
                    .iter()
                    .map(Segment::label)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

impl fmt::Display for SegmentFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentFilter::All => f.write_str("All"),
            SegmentFilter::Only(segment) => write!(f, "{segment}"),
        }
    }
}

/// Ordering applied to customer listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
pub enum SortKey {
    /// Highest spend first
    #[default]
    TotalSpent,
    /// Most orders first
    Frequency,
    /// Most recent buyers first, never-purchased last
    Recency,
    /// Highest combined score first
    TotalScore,
}

fn recency_order(recency: Recency) -> (bool, u32) {
    match recency {
        Recency::Days(days) => (false, days),
        Recency::NeverPurchased => (true, 0),
    }
}

fn compare_by(a: &RfvRecord, b: &RfvRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::TotalSpent => b.total_spent.total_cmp(&a.total_spent),
        SortKey::Frequency => b.order_count.cmp(&a.order_count),
        SortKey::Recency => recency_order(a.days_since_last_order)
            .cmp(&recency_order(b.days_since_last_order)),
        SortKey::TotalScore => b.total_score.cmp(&a.total_score),
    }
}

/// Sort a listing by `key`, ties broken by ascending customer id
pub fn sort_records(records: &mut [RfvRecord], key: SortKey) {
    records.sort_by(|a, b| compare_by(a, b, key).then_with(|| a.customer_id.cmp(&b.customer_id)));
}

/// Roll-up of one segment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customers: usize,
    pub revenue: f64,
    /// Mean of the members' average order values, if any member ordered
    pub mean_order_value: Option<f64>,
    pub mean_recency_score: f64,
    pub mean_frequency_score: f64,
    pub mean_value_score: f64,
    pub recommended_action: &'static str,
}

impl SegmentSummary {
    pub fn mean_total_score(&self) -> f64 {
        self.mean_recency_score + self.mean_frequency_score + self.mean_value_score
    }
}

#[derive(Default)]
struct SegmentAccumulator {
    customers: usize,
    revenue: f64,
    order_value_sum: f64,
    order_value_count: usize,
    recency_sum: u64,
    frequency_sum: u64,
    value_sum: u64,
}

/// Group records by segment. Only segments with members are returned,
/// largest first, ties in segment priority order.
pub fn summarize_by_segment(records: &[RfvRecord]) -> Vec<SegmentSummary> {
    let mut groups: BTreeMap<Segment, SegmentAccumulator> = BTreeMap::new();

    for record in records {
        let acc = groups.entry(record.segment).or_default();
        acc.customers += 1;
        acc.revenue += record.total_spent;
        if let Some(value) = record.average_order_value {
            acc.order_value_sum += value;
            acc.order_value_count += 1;
        }
        acc.recency_sum += u64::from(record.recency_score);
        acc.frequency_sum += u64::from(record.frequency_score);
        acc.value_sum += u64::from(record.value_score);
    }

    let mut summaries: Vec<SegmentSummary> = groups
        .into_iter()
        .map(|(segment, acc)| {
            let n = acc.customers as f64;
            SegmentSummary {
                segment,
                customers: acc.customers,
                revenue: acc.revenue,
                mean_order_value: (acc.order_value_count > 0)
                    .then(|| acc.order_value_sum / acc.order_value_count as f64),
                mean_recency_score: acc.recency_sum as f64 / n,
                mean_frequency_score: acc.frequency_sum as f64 / n,
                mean_value_score: acc.value_sum as f64 / n,
                recommended_action: segment.recommended_action(),
            }
        })
        .collect();

    sort_summaries(&mut summaries, SummaryOrder::CustomerCount);
    summaries
}

/// Ordering applied to segment roll-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SummaryOrder {
    #[default]
    CustomerCount,
    /// Segment equivalent of a listing key: revenue, or the mean of the score
    By(SortKey),
}

/// Sort roll-ups descending by `order`, ties in segment priority order
pub fn sort_summaries(summaries: &mut [SegmentSummary], order: SummaryOrder) {
    summaries.sort_by(|a, b| {
        let primary = match order {
            SummaryOrder::CustomerCount => b.customers.cmp(&a.customers),
            SummaryOrder::By(SortKey::TotalSpent) => b.revenue.total_cmp(&a.revenue),
            SummaryOrder::By(SortKey::Frequency) => {
                b.mean_frequency_score.total_cmp(&a.mean_frequency_score)
            }
            SummaryOrder::By(SortKey::Recency) => {
                b.mean_recency_score.total_cmp(&a.mean_recency_score)
            }
            SummaryOrder::By(SortKey::TotalScore) => {
                b.mean_total_score().total_cmp(&a.mean_total_score())
            }
        };
        primary.then_with(|| a.segment.rank().cmp(&b.segment.rank()))
    });
}

/// Headline figures for a classified batch
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RfvOverview {
    pub total_customers: usize,
    /// Customers with more than one order
    pub recurring_customers: usize,
    pub total_revenue: f64,
    pub mean_spent: Option<f64>,
    /// Mean of the defined average order values
    pub mean_ticket: Option<f64>,
    pub mean_frequency: Option<f64>,
    /// Champions and VIP customers
    pub top_customers: usize,
    pub top_share_pct: Option<f64>,
}

pub fn overview(records: &[RfvRecord]) -> RfvOverview {
    if records.is_empty() {
        return RfvOverview::default();
    }

    let n = records.len() as f64;
    let total_revenue: f64 = records.iter().map(|r| r.total_spent).sum();
    let orders: u64 = records.iter().map(|r| u64::from(r.order_count)).sum();
    let tickets: Vec<f64> = records
        .iter()
        .filter_map(|r| r.average_order_value)
        .collect();
    let top_customers = records
        .iter()
        .filter(|r| matches!(r.segment, Segment::Champions | Segment::VipCustomers))
        .count();

    RfvOverview {
        total_customers: records.len(),
        recurring_customers: records.iter().filter(|r| r.is_recurring()).count(),
        total_revenue,
        mean_spent: Some(total_revenue / n),
        mean_ticket: (!tickets.is_empty())
            .then(|| tickets.iter().sum::<f64>() / tickets.len() as f64),
        mean_frequency: Some(orders as f64 / n),
        top_customers,
        top_share_pct: Some(top_customers as f64 / n * 100.0),
    }
}
