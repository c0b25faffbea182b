//! Console report and Plotters charts for segment analysis

use plotters::prelude::*;

use crate::data::ReportingWindow;
use crate::model::RfvRecord;
use crate::summary::{RfvOverview, SegmentSummary};

/// Bar colors for the recency, frequency and value means
const SCORE_COLORS: [RGBColor; 3] = [
    RGBColor(0x71, 0x5c, 0xba),
    RGBColor(0x85, 0x72, 0xc6),
    RGBColor(0x99, 0x88, 0xd2),
];

const SCORE_NAMES: [&str; 3] = ["Recency", "Frequency", "Value"];

/// Short form of a large number: 1.2K, 3.4M
pub fn compact_number(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{value:.0}")
    }
}

fn optional(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}

/// Sibling path for the score chart: `report.png` -> `report_scores.png`
pub fn scores_chart_path(base_output_path: &str) -> String {
    match base_output_path.strip_suffix(".png") {
        Some(stem) => format!("{stem}_scores.png"),
        None => format!("{base_output_path}_scores.png"),
    }
}

/// Category axis label for bar `x`, blank between bars
fn category_label(labels: &[&str], x: f64) -> String {
    let idx = x.round();
    if (x - idx).abs() > 1e-6 || idx < 0.0 {
        return String::new();
    }
    labels
        .get(idx as usize)
        .map(|label| label.to_string())
        .unwrap_or_default()
}

/// Customer count and revenue per segment, side by side
pub fn create_segment_distribution_chart(
    summaries: &[SegmentSummary],
    output_path: &str,
) -> crate::Result<()> {
    if summaries.is_empty() {
        anyhow::bail!("no segments to plot");
    }

    let labels: Vec<&str> = summaries.iter().map(|s| s.segment.label()).collect();
    let n = summaries.len() as f64;
    let max_customers = summaries.iter().map(|s| s.customers).max().unwrap_or(1).max(1) as f64;
    let max_revenue = summaries
        .iter()
        .map(|s| s.revenue)
        .fold(0.0_f64, f64::max)
        .max(1.0);

    let root = BitMapBackend::new(output_path, (1400, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled("RFV Segment Analysis", ("sans-serif", 30))?;
    let panels = root.split_evenly((1, 2));

    let mut counts = ChartBuilder::on(&panels[0])
        .caption("Customers per Segment", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(60)
        .build_cartesian_2d(-0.5..(n - 0.5), 0f64..(max_customers * 1.1))?;

    counts
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(summaries.len())
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_desc("Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, summary) in summaries.iter().enumerate() {
        let (r, g, b) = summary.segment.color();
        let x = idx as f64;
        counts.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, summary.customers as f64)],
            RGBColor(r, g, b).filled(),
        )))?;
    }

    let mut revenue = ChartBuilder::on(&panels[1])
        .caption("Revenue per Segment", ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(-0.5..(n - 0.5), 0f64..(max_revenue * 1.1))?;

    revenue
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(summaries.len())
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_label_formatter(&|y| compact_number(*y))
        .y_desc("Revenue")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (idx, summary) in summaries.iter().enumerate() {
        let (r, g, b) = summary.segment.color();
        let x = idx as f64;
        revenue.draw_series(std::iter::once(Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, summary.revenue)],
            RGBColor(r, g, b).filled(),
        )))?;
    }

    root.present()?;
    tracing::info!(path = output_path, "segment distribution chart saved");
    Ok(())
}

/// Grouped bars of mean recency, frequency and value score per segment
pub fn create_score_chart(summaries: &[SegmentSummary], output_path: &str) -> crate::Result<()> {
    if summaries.is_empty() {
        anyhow::bail!("no segments to plot");
    }

    let labels: Vec<&str> = summaries.iter().map(|s| s.segment.label()).collect();
    let n = summaries.len() as f64;

    let root = BitMapBackend::new(output_path, (1400, 620)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Mean Scores per Segment", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5..(n - 0.5), 0f64..5.2)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(summaries.len())
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_desc("Score (1-5)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (score_idx, name) in SCORE_NAMES.iter().enumerate() {
        let color = SCORE_COLORS[score_idx];
        let offset = (score_idx as f64 - 1.0) * 0.27;
        chart
            .draw_series(summaries.iter().enumerate().map(|(idx, summary)| {
                let mean = match score_idx {
                    0 => summary.mean_recency_score,
                    1 => summary.mean_frequency_score,
                    _ => summary.mean_value_score,
                };
                let x = idx as f64 + offset;
                Rectangle::new([(x - 0.12, 0.0), (x + 0.12, mean)], color.filled())
            }))?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = output_path, "score chart saved");
    Ok(())
}

/// Headline figures, one line each
pub fn overview_lines(overview: &RfvOverview, window: &ReportingWindow) -> Vec<String> {
    vec![
        format!("=== RFV Overview ({} to {}) ===", window.start(), window.end()),
        format!(
            "Total customers:   {} ({} recurring)",
            overview.total_customers, overview.recurring_customers
        ),
        format!(
            "Total revenue:     {:.2} (mean {})",
            overview.total_revenue,
            optional(overview.mean_spent, 2)
        ),
        format!(
            "Average ticket:    {} (mean frequency {})",
            optional(overview.mean_ticket, 2),
            optional(overview.mean_frequency, 1)
        ),
        format!(
            "Top customers:     {} ({}% of total)",
            overview.top_customers,
            optional(overview.top_share_pct, 1)
        ),
    ]
}

/// Print the headline figures
pub fn print_overview(overview: &RfvOverview, window: &ReportingWindow) {
    println!();
    for line in overview_lines(overview, window) {
        println!("{line}");
    }
}

/// Print the per-segment roll-up table
pub fn print_segment_summaries(summaries: &[SegmentSummary]) {
    println!("\n=== Segments ===");
    println!(
        "  {:<18} | {:>9} | {:>12} | {:>10} | {:>4} | {:>4} | {:>4} | Recommended action",
        "Segment", "Customers", "Revenue", "Avg order", "R", "F", "V"
    );
    println!("  {}", "-".repeat(110));
    for summary in summaries {
        println!(
            "  {:<18} | {:>9} | {:>12.2} | {:>10} | {:>4.2} | {:>4.2} | {:>4.2} | {}",
            summary.segment.label(),
            summary.customers,
            summary.revenue,
            optional(summary.mean_order_value, 2),
            summary.mean_recency_score,
            summary.mean_frequency_score,
            summary.mean_value_score,
            summary.recommended_action
        );
    }
}

/// Print the first `limit` customers of an already sorted listing
pub fn print_customer_table(records: &[RfvRecord], limit: usize) {
    println!(
        "\n=== Customers (showing {} of {}) ===",
        limit.min(records.len()),
        records.len()
    );
    println!(
        "  {:<24} | {:<28} | {:<16} | {:<4} | {:<18} | {:>5} | {:>5} | {:>12}",
        "Customer", "Email", "City", "UF", "Segment", "Days", "Freq", "Total spent"
    );
    println!("  {}", "-".repeat(132));
    for record in records.iter().take(limit) {
        let days = record
            .days_since_last_order
            .days()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} | {:<28} | {:<16} | {:<4} | {:<18} | {:>5} | {:>5} | {:>12.2}",
            record.name,
            record.email,
            record.city,
            record.state,
            record.segment.label(),
            days,
            record.order_count,
            record.total_spent
        );
    }
}

/// Render both charts next to `base_output_path`
pub fn generate_visualization_report(
    summaries: &[SegmentSummary],
    base_output_path: &str,
) -> crate::Result<()> {
    create_segment_distribution_chart(summaries, base_output_path)?;
    create_score_chart(summaries, &scores_chart_path(base_output_path))?;
    Ok(())
}
