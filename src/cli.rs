//! Command-line interface definitions and argument parsing

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::data::{parse_date, ReportingWindow};
use crate::summary::{SegmentFilter, SortKey};

/// Customer segmentation CLI using RFV (Recency, Frequency, Value) scoring
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Pre-aggregated customer CSV (one row per customer for the window)
    #[arg(short, long, env = "RFV_AGGREGATES", conflicts_with_all = ["customers", "orders"])]
    pub aggregates: Option<PathBuf>,

    /// Customer table CSV, rolled up together with --orders
    #[arg(long, env = "RFV_CUSTOMERS", requires = "orders")]
    pub customers: Option<PathBuf>,

    /// Order table CSV, rolled up together with --customers
    #[arg(long, env = "RFV_ORDERS", requires = "customers")]
    pub orders: Option<PathBuf>,

    /// First day of the reporting window (default: 365 days before --end)
    #[arg(long, env = "RFV_WINDOW_START")]
    pub start: Option<String>,

    /// Last day of the reporting window and recency reference (default: today, UTC)
    #[arg(long, env = "RFV_WINDOW_END")]
    pub end: Option<String>,

    /// Restrict the report to one segment, by name or slug ("All" keeps everyone)
    #[arg(short, long, env = "RFV_SEGMENT", default_value = "All")]
    pub segment: SegmentFilter,

    /// Ordering of the customer listing
    #[arg(long, value_enum, default_value_t = SortKey::TotalSpent)]
    pub sort_by: SortKey,

    /// Number of customers listed
    #[arg(short = 'n', long, default_value = "100", value_parser = clap::value_parser!(u16).range(10..=500))]
    pub limit: u16,

    /// Output path for the segment chart; the score chart lands next to it
    #[arg(short, long, default_value = "rfv_segments.png")]
    pub output: String,

    /// Skip PNG chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Write records, segment summaries and overview as JSON
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Where the customer aggregates come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Aggregates(PathBuf),
    Tables { customers: PathBuf, orders: PathBuf },
}

impl Args {
    /// Resolve the input flags into a single source
    pub fn input_source(&self) -> crate::Result<InputSource> {
        match (&self.aggregates, &self.customers, &self.orders) {
            (Some(path), None, None) => Ok(InputSource::Aggregates(path.clone())),
            (None, Some(customers), Some(orders)) => Ok(InputSource::Tables {
                customers: customers.clone(),
                orders: orders.clone(),
            }),
            (None, None, None) => {
                anyhow::bail!("no input given: pass --aggregates, or --customers with --orders")
            }
            _ => anyhow::bail!("use either --aggregates or --customers with --orders, not both"),
        }
    }

    /// Build the reporting window, defaulting to the year ending `today`
    pub fn window(&self, today: NaiveDate) -> crate::Result<ReportingWindow> {
        let end = match &self.end {
            Some(raw) => parse_date(raw)?,
            None => today,
        };
        let window = match &self.start {
            Some(raw) => ReportingWindow::new(parse_date(raw)?, end)?,
            None => ReportingWindow::trailing_year(end),
        };
        Ok(window)
    }
}
