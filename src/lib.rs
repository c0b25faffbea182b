//! RfvForge: customer segmentation with RFV (Recency, Frequency, Value) scoring
//!
//! Per-customer order aggregates for a reporting window are scored on three
//! 1-5 scales, classified into one of ten segments by an ordered rule list and
//! rolled up per segment for reporting.

pub mod cli;
pub mod data;
pub mod error;
pub mod logging;
pub mod model;
pub mod scoring;
pub mod segment;
pub mod summary;
pub mod viz;

// Re-export public items for easier access
pub use cli::{Args, InputSource};
pub use data::{
    load_aggregates, load_customers, load_orders, rollup_orders, CustomerOrderAggregate,
    CustomerProfile, OrderLine, ReportingWindow,
};
pub use error::{InputError, SegmentFilterError};
pub use model::{build_rfv_model, score_customer, RfvModel, RfvRecord};
pub use scoring::{Recency, ScoreCard, MAX_SCORE, MIN_SCORE};
pub use segment::{classify, Segment, SegmentInput, SEGMENT_RULES};
pub use summary::{
    overview, sort_records, sort_summaries, summarize_by_segment, RfvOverview, SegmentFilter,
    SegmentSummary, SortKey, SummaryOrder,
};
pub use viz::generate_visualization_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
