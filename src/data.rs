//! Input model, CSV loading with Polars and per-customer order roll-up

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use polars::prelude::{
    col, lit, CsvReadOptions, DataFrame, DataType, IntoLazy, NamedFrom, SerReader, Series,
    SortMultipleOptions,
};
use serde::Serialize;

use crate::error::InputError;

/// Inclusive `[start, end]` date range the aggregates are computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportingWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl ReportingWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if start > end {
            return Err(InputError::InvertedWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The 365 days ending at `end`
    pub fn trailing_year(end: NaiveDate) -> Self {
        let start = end.checked_sub_days(Days::new(365)).unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Clock reference for recency
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// One customer's order activity inside a reporting window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerOrderAggregate {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    /// `None` when the customer placed no order in the window
    pub last_order_date: Option<NaiveDate>,
    /// Distinct orders in the window
    pub order_count: u32,
    pub total_spent: f64,
    /// `None` when `order_count` is zero
    pub average_order_value: Option<f64>,
    /// Units purchased across all orders
    pub total_items: u64,
    pub registration_date: NaiveDate,
    pub window_end_date: NaiveDate,
}

impl CustomerOrderAggregate {
    /// Mean order value, undefined for customers without orders
    pub fn derive_average(total_spent: f64, order_count: u32) -> Option<f64> {
        (order_count > 0).then(|| total_spent / f64::from(order_count))
    }
}

/// A row of the customer dimension
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerProfile {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub city: String,
    pub state: String,
    pub registration_date: NaiveDate,
}

/// A row of the order fact table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub order_id: i64,
    pub customer_id: i64,
    pub order_date: NaiveDate,
    pub total: f64,
    pub quantity: u32,
}

/// Parse a calendar date, accepting plain dates and timestamps.
/// Only the date part of a timestamp is kept.
pub fn parse_date(raw: &str) -> Result<NaiveDate, InputError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }

    const TIMESTAMP_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];
    for format in TIMESTAMP_FORMATS {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(timestamp.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|timestamp| timestamp.date_naive())
        .map_err(|_| InputError::InvalidDate(raw.to_string()))
}

/// Load pre-aggregated customer rows for a window
///
/// Required columns: `customer_id, name, email, city, state,
/// registration_date, last_order_date, order_count, total_spent`.
/// Optional: `average_order_value`, `total_items`. Empty cells are nulls.
pub fn load_aggregates(
    path: &Path,
    window: &ReportingWindow,
) -> crate::Result<Vec<CustomerOrderAggregate>> {
    let df = read_csv(path)?;
    let source = path.display().to_string();

    let ids = int_column(&df, "customer_id")?;
    let names = text_column(&df, "name")?;
    let emails = text_column(&df, "email")?;
    let cities = text_column(&df, "city")?;
    let states = text_column(&df, "state")?;
    let registrations = text_column(&df, "registration_date")?;
    let last_orders = text_column(&df, "last_order_date")?;
    let order_counts = int_column(&df, "order_count")?;
    let totals = float_column(&df, "total_spent")?;
    let averages = optional_float_column(&df, "average_order_value")?;
    let items = optional_int_column(&df, "total_items")?;

    let mut seen = HashSet::with_capacity(df.height());
    let mut aggregates = Vec::with_capacity(df.height());
    let mut outside_window = 0usize;

    for row in 0..df.height() {
        let at = RowRef::new(&source, row);
        let customer_id = at.required(ids[row], "customer_id")?;
        if !seen.insert(customer_id) {
            anyhow::bail!("{at}: duplicate customer_id {customer_id}");
        }

        let order_count = at.count(at.required(order_counts[row], "order_count")?, "order_count")?;
        let total_spent = at.amount(at.required(totals[row], "total_spent")?, "total_spent")?;
        let last_order_date = last_orders[row]
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| at.date(raw, "last_order_date"))
            .transpose()?;
        let registration_date = at.date(
            at.required(registrations[row].as_deref(), "registration_date")?,
            "registration_date",
        )?;

        match (order_count, last_order_date) {
            (0, Some(date)) => {
                anyhow::bail!("{at}: last_order_date {date} given for a customer with order_count 0")
            }
            (count, None) if count > 0 => {
                anyhow::bail!("{at}: order_count {count} given without a last_order_date")
            }
            _ => {}
        }
        if let Some(date) = last_order_date.filter(|date| !window.contains(*date)) {
            outside_window += 1;
            tracing::debug!(%at, %date, "last order falls outside the reporting window");
        }

        let average_order_value = if order_count == 0 {
            None
        } else {
            averages
                .as_ref()
                .and_then(|column| column[row])
                .or_else(|| CustomerOrderAggregate::derive_average(total_spent, order_count))
        };
        let total_items = match items.as_ref().and_then(|column| column[row]) {
            Some(value) => u64::try_from(value)
                .map_err(|_| anyhow::anyhow!("{at}: total_items must be non-negative, got {value}"))?,
            None => 0,
        };

        aggregates.push(CustomerOrderAggregate {
            customer_id,
            name: names[row].clone().unwrap_or_default(),
            email: emails[row].clone().unwrap_or_default(),
            city: cities[row].clone().unwrap_or_default(),
            state: states[row].clone().unwrap_or_default(),
            last_order_date,
            order_count,
            total_spent,
            average_order_value,
            total_items,
            registration_date,
            window_end_date: window.end(),
        });
    }

    if outside_window > 0 {
        tracing::warn!(
            outside_window,
            start = %window.start(),
            end = %window.end(),
            "aggregate rows with a last order outside the reporting window"
        );
    }
    tracing::info!(path = %source, customers = aggregates.len(), "loaded customer aggregates");
    Ok(aggregates)
}

/// Load the customer dimension
///
/// Columns: `customer_id, name, email, city, state, registration_date`.
pub fn load_customers(path: &Path) -> crate::Result<Vec<CustomerProfile>> {
    let df = read_csv(path)?;
    let source = path.display().to_string();

    let ids = int_column(&df, "customer_id")?;
    let names = text_column(&df, "name")?;
    let emails = text_column(&df, "email")?;
    let cities = text_column(&df, "city")?;
    let states = text_column(&df, "state")?;
    let registrations = text_column(&df, "registration_date")?;

    let mut seen = HashSet::with_capacity(df.height());
    let mut customers = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let at = RowRef::new(&source, row);
        let customer_id = at.required(ids[row], "customer_id")?;
        if !seen.insert(customer_id) {
            anyhow::bail!("{at}: duplicate customer_id {customer_id}");
        }
        let registration_date = at.date(
            at.required(registrations[row].as_deref(), "registration_date")?,
            "registration_date",
        )?;

        customers.push(CustomerProfile {
            customer_id,
            name: names[row].clone().unwrap_or_default(),
            email: emails[row].clone().unwrap_or_default(),
            city: cities[row].clone().unwrap_or_default(),
            state: states[row].clone().unwrap_or_default(),
            registration_date,
        });
    }

    tracing::info!(path = %source, customers = customers.len(), "loaded customers");
    Ok(customers)
}

/// Load the order fact table
///
/// Columns: `order_id, customer_id, order_date, total, quantity`.
pub fn load_orders(path: &Path) -> crate::Result<Vec<OrderLine>> {
    let df = read_csv(path)?;
    let source = path.display().to_string();

    let order_ids = int_column(&df, "order_id")?;
    let customer_ids = int_column(&df, "customer_id")?;
    let dates = text_column(&df, "order_date")?;
    let totals = float_column(&df, "total")?;
    let quantities = int_column(&df, "quantity")?;

    let mut orders = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let at = RowRef::new(&source, row);
        let quantity = at.count(at.required(quantities[row], "quantity")?, "quantity")?;
        orders.push(OrderLine {
            order_id: at.required(order_ids[row], "order_id")?,
            customer_id: at.required(customer_ids[row], "customer_id")?,
            order_date: at.date(at.required(dates[row].as_deref(), "order_date")?, "order_date")?,
            total: at.amount(at.required(totals[row], "total")?, "total")?,
            quantity,
        });
    }

    tracing::info!(path = %source, orders = orders.len(), "loaded order lines");
    Ok(orders)
}

/// Aggregate order lines per customer for a window
///
/// Every customer gets exactly one row, in input order, including customers
/// with no order in the window. Order lines sharing an `order_id` count as one
/// order but all of their totals are summed. Lines outside the window and
/// lines for unknown customers are ignored.
pub fn rollup_orders(
    customers: &[CustomerProfile],
    orders: &[OrderLine],
    window: &ReportingWindow,
) -> crate::Result<Vec<CustomerOrderAggregate>> {
    // Dates travel through Polars as day numbers
    let order_lines = DataFrame::new(vec![
        Series::new("order_id", orders.iter().map(|o| o.order_id).collect::<Vec<_>>()),
        Series::new("customer_id", orders.iter().map(|o| o.customer_id).collect::<Vec<_>>()),
        Series::new(
            "order_day",
            orders.iter().map(|o| o.order_date.num_days_from_ce()).collect::<Vec<_>>(),
        ),
        Series::new("total", orders.iter().map(|o| o.total).collect::<Vec<_>>()),
        Series::new(
            "quantity",
            orders.iter().map(|o| i64::from(o.quantity)).collect::<Vec<_>>(),
        ),
    ])?;

    let per_customer = order_lines
        .lazy()
        .filter(
            col("order_day")
                .gt_eq(lit(window.start().num_days_from_ce()))
                .and(col("order_day").lt_eq(lit(window.end().num_days_from_ce()))),
        )
        .group_by([col("customer_id")])
        .agg([
            col("order_day").max().alias("last_order_day"),
            col("order_id").n_unique().alias("order_count"),
            col("total").sum().alias("total_spent"),
            col("quantity").sum().alias("total_items"),
            col("order_id").count().alias("lines"),
        ])
        .collect()?;
    let in_window: i64 = int_column(&per_customer, "lines")?.into_iter().flatten().sum();

    let customer_keys = DataFrame::new(vec![
        Series::new("customer_id", customers.iter().map(|c| c.customer_id).collect::<Vec<_>>()),
        Series::new("position", (0..customers.len() as i64).collect::<Vec<_>>()),
    ])?;

    let joined = customer_keys
        .lazy()
        .left_join(per_customer.lazy(), col("customer_id"), col("customer_id"))
        .with_columns([
            col("order_count").fill_null(lit(0).cast(DataType::UInt32)),
            col("total_spent").fill_null(lit(0.0)),
            col("total_items").fill_null(lit(0)),
            col("lines").fill_null(lit(0).cast(DataType::UInt32)),
        ])
        .sort(["position"], SortMultipleOptions::default())
        .collect()?;

    let positions = int_column(&joined, "position")?;
    let last_days = int_column(&joined, "last_order_day")?;
    let order_counts = int_column(&joined, "order_count")?;
    let totals = float_column(&joined, "total_spent")?;
    let items = int_column(&joined, "total_items")?;
    let matched: i64 = int_column(&joined, "lines")?.into_iter().flatten().sum();

    let orphaned = in_window - matched;
    if orphaned > 0 {
        tracing::warn!(orphaned, "dropped order lines referencing unknown customers");
    }
    tracing::debug!(
        outside_window = orders.len() as i64 - in_window,
        "skipped order lines outside the reporting window"
    );

    let mut aggregates = Vec::with_capacity(joined.height());
    for row in 0..joined.height() {
        let customer = positions[row]
            .and_then(|position| usize::try_from(position).ok())
            .and_then(|position| customers.get(position))
            .with_context(|| format!("roll-up row {row} lost its customer"))?;
        let order_count = order_counts[row]
            .and_then(|count| u32::try_from(count).ok())
            .unwrap_or(0);
        let total_spent = totals[row].unwrap_or(0.0);
        let last_order_date = last_days[row]
            .and_then(|day| i32::try_from(day).ok())
            .and_then(NaiveDate::from_num_days_from_ce_opt);

        aggregates.push(CustomerOrderAggregate {
            customer_id: customer.customer_id,
            name: customer.name.clone(),
            email: customer.email.clone(),
            city: customer.city.clone(),
            state: customer.state.clone(),
            last_order_date,
            order_count,
            total_spent,
            average_order_value: CustomerOrderAggregate::derive_average(total_spent, order_count),
            total_items: items[row].and_then(|n| u64::try_from(n).ok()).unwrap_or(0),
            registration_date: customer.registration_date,
            window_end_date: window.end(),
        });
    }

    Ok(aggregates)
}

fn read_csv(path: &Path) -> crate::Result<DataFrame> {
    // Infer over every row so a money column that starts with whole numbers
    // still reads as a float once decimals appear further down.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("failed to open {}", path.display()))?
        .finish()
        .with_context(|| format!("failed to parse CSV {}", path.display()))?;
    Ok(df)
}

fn int_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Int64)?;
    let values = series.i64()?.into_iter().collect();
    Ok(values)
}

fn float_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn text_column(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<String>>> {
    let series = df
        .column(name)
        .with_context(|| format!("missing column '{name}'"))?
        .cast(&DataType::String)?;
    let values = series
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect();
    Ok(values)
}

fn optional_int_column(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Option<i64>>>> {
    match df.column(name) {
        Ok(_) => int_column(df, name).map(Some),
        Err(_) => Ok(None),
    }
}

fn optional_float_column(df: &DataFrame, name: &str) -> crate::Result<Option<Vec<Option<f64>>>> {
    match df.column(name) {
        Ok(_) => float_column(df, name).map(Some),
        Err(_) => Ok(None),
    }
}

/// Location of a data row, for error messages
struct RowRef<'a> {
    source: &'a str,
    line: usize,
}

impl<'a> RowRef<'a> {
    fn new(source: &'a str, row: usize) -> Self {
        // line 1 is the header
        Self {
            source,
            line: row + 2,
        }
    }

    fn required<T>(&self, value: Option<T>, column: &str) -> crate::Result<T> {
        value.ok_or_else(|| anyhow::anyhow!("{self}: missing or invalid {column}"))
    }

    fn count(&self, value: i64, column: &str) -> crate::Result<u32> {
        u32::try_from(value)
            .map_err(|_| anyhow::anyhow!("{self}: {column} must be a non-negative integer, got {value}"))
    }

    fn amount(&self, value: f64, column: &str) -> crate::Result<f64> {
        if !value.is_finite() || value < 0.0 {
            anyhow::bail!("{self}: {column} must be a non-negative amount, got {value}");
        }
        Ok(value)
    }

    fn date(&self, raw: &str, column: &str) -> crate::Result<NaiveDate> {
        parse_date(raw).with_context(|| format!("{self}: invalid {column}"))
    }
}

impl std::fmt::Display for RowRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.source, self.line)
    }
}
