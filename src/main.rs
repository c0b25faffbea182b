//! RfvForge: customer segmentation CLI using RFV scoring
//!
//! This is the main entrypoint that orchestrates data loading, scoring,
//! reporting and export.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;

use rfvforge::{
    build_rfv_model, load_aggregates, load_customers, load_orders, logging, overview,
    rollup_orders, sort_records, summarize_by_segment, viz, Args, CustomerOrderAggregate,
    InputSource, ReportingWindow, RfvOverview, RfvRecord, SegmentFilter, SegmentSummary,
};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_tracing(args.verbose);

    let today = chrono::Utc::now().date_naive();
    let window = args.window(today)?;
    let source = args.input_source()?;

    run_pipeline(&args, &source, &window)
}

/// Everything written by `--json`
#[derive(Serialize)]
struct RfvExport<'a> {
    window: &'a ReportingWindow,
    segment_filter: &'a SegmentFilter,
    overview: &'a RfvOverview,
    segments: &'a [SegmentSummary],
    customers: &'a [RfvRecord],
}

fn load_input(source: &InputSource, window: &ReportingWindow) -> Result<Vec<CustomerOrderAggregate>> {
    match source {
        InputSource::Aggregates(path) => load_aggregates(path, window),
        InputSource::Tables { customers, orders } => {
            let customers = load_customers(customers)?;
            let orders = load_orders(orders)?;
            rollup_orders(&customers, &orders, window)
        }
    }
}

fn write_json(path: &Path, export: &RfvExport<'_>) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), export)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "json export written");
    Ok(())
}

/// Run the full segmentation pipeline
fn run_pipeline(args: &Args, source: &InputSource, window: &ReportingWindow) -> Result<()> {
    let start_time = Instant::now();
    tracing::debug!(?source, start = %window.start(), end = %window.end(), "starting rfv pipeline");

    // Step 1: Load aggregates
    let aggregates = load_input(source, window)?;

    // Step 2: Score and classify the whole population, then filter
    let model = build_rfv_model(aggregates);
    let mut records = args.segment.apply(model.into_records());
    if args.segment != SegmentFilter::All {
        tracing::info!(segment = %args.segment, customers = records.len(), "segment filter applied");
    }

    // Step 3: Roll up and report
    let summaries = summarize_by_segment(&records);
    let stats = overview(&records);
    sort_records(&mut records, args.sort_by);

    if records.is_empty() {
        tracing::warn!(
            start = %window.start(),
            end = %window.end(),
            segment = %args.segment,
            "no customers found for the selected window and segment"
        );
    }

    viz::print_overview(&stats, window);
    viz::print_segment_summaries(&summaries);
    viz::print_customer_table(&records, usize::from(args.limit));

    // Step 4: Charts and export
    if !args.no_charts && !summaries.is_empty() {
        viz::generate_visualization_report(&summaries, &args.output)?;
        println!("\nSegment chart saved to: {}", args.output);
        println!(
            "Score chart saved to: {}",
            viz::scores_chart_path(&args.output)
        );
    }

    if let Some(path) = &args.json {
        write_json(
            path,
            &RfvExport {
                window,
                segment_filter: &args.segment,
                overview: &stats,
                segments: &summaries,
                customers: &records,
            },
        )?;
    }

    tracing::info!(
        customers = records.len(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "rfv pipeline complete"
    );
    Ok(())
}
