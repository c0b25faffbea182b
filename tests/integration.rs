//! Integration tests for RfvForge

use chrono::NaiveDate;
use rfvforge::{
    build_rfv_model, load_aggregates, load_customers, load_orders, overview, rollup_orders,
    sort_records, summarize_by_segment, Recency, ReportingWindow, Segment, SegmentFilter, SortKey,
};
use std::io::Write;
use tempfile::NamedTempFile;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn window() -> ReportingWindow {
    ReportingWindow::new(date(2024, 1, 1), date(2024, 6, 30)).unwrap()
}

fn write_csv(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
    file
}

/// Customer table with one customer per interesting profile
fn create_customers_csv() -> NamedTempFile {
    write_csv(&[
        "customer_id,name,email,city,state,registration_date",
        // frequent, recent, high value
        "1,Ana Souza,ana@example.com,Recife,PE,2022-03-10",
        // lapsed regular
        "2,Bruno Lima,bruno@example.com,Natal,RN,2022-08-01",
        // registered, never ordered in the window
        "3,Carla Dias,carla@example.com,Belem,PA,2024-05-20",
        // single old purchase
        "4,Diego Alves,diego@example.com,Manaus,AM,2023-01-15",
        // single recent small purchase
        "5,Elisa Rocha,elisa@example.com,Santos,SP,2024-06-01",
    ])
}

fn create_orders_csv() -> NamedTempFile {
    let mut lines = vec!["order_id,customer_id,order_date,total,quantity".to_string()];

    // Customer 1: 12 orders in June, 6000 total
    for i in 0..12 {
        lines.push(format!("{},1,2024-06-{:02}T10:00:00,500.0,2", 100 + i, 10 + i));
    }
    // Customer 2: 4 orders in January, plus one before the window
    lines.push("200,2,2024-01-05,400.0,1".to_string());
    lines.push("201,2,2024-01-02,400.0,1".to_string());
    lines.push("202,2,2024-01-01,400.0,1".to_string());
    lines.push("203,2,2024-01-03 09:30:00,300.0,1".to_string());
    lines.push("204,2,2023-12-13,9999.0,1".to_string());
    // Customer 4: one purchase 170 days before the window end
    lines.push("400,4,2024-01-12,350.0,1".to_string());
    // Customer 5: one purchase, two lines
    lines.push("500,5,2024-06-25,120.0,1".to_string());
    lines.push("500,5,2024-06-25,80.0,1".to_string());
    // Unknown customer
    lines.push("900,99,2024-03-01,50.0,1".to_string());

    let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
    write_csv(&refs)
}

#[test]
fn test_end_to_end_pipeline_from_tables() {
    let customers_file = create_customers_csv();
    let orders_file = create_orders_csv();

    let customers = load_customers(customers_file.path()).unwrap();
    let orders = load_orders(orders_file.path()).unwrap();
    let aggregates = rollup_orders(&customers, &orders, &window()).unwrap();

    // One aggregate per customer, including the silent one
    assert_eq!(aggregates.len(), 5);

    let model = build_rfv_model(aggregates);
    assert_eq!(model.len(), 5);

    let by_id = |id: i64| model.records.iter().find(|r| r.customer_id == id).unwrap();

    let ana = by_id(1);
    assert_eq!(ana.order_count, 12);
    assert_eq!(ana.days_since_last_order, Recency::Days(9));
    assert_eq!(ana.segment, Segment::Champions);

    let bruno = by_id(2);
    assert_eq!(bruno.order_count, 4);
    assert!((bruno.total_spent - 1500.0).abs() < 1e-9);
    assert_eq!(bruno.days_since_last_order, Recency::Days(177));
    assert_eq!(
        (bruno.recency_score, bruno.frequency_score, bruno.value_score),
        (2, 3, 3)
    );
    assert_eq!(bruno.segment, Segment::AtRisk);

    let carla = by_id(3);
    assert_eq!(carla.days_since_last_order, Recency::NeverPurchased);
    assert_eq!(carla.average_order_value, None);
    assert_eq!(carla.segment, Segment::NewCustomer);

    let diego = by_id(4);
    assert_eq!(diego.days_since_last_order, Recency::Days(170));
    assert_eq!(diego.recency_score, 2);
    assert_eq!(diego.segment, Segment::RegularCustomer);

    let elisa = by_id(5);
    assert_eq!(elisa.order_count, 1);
    assert!((elisa.total_spent - 200.0).abs() < 1e-9);
    assert_eq!(elisa.segment, Segment::StarterCustomer);
}

#[test]
fn test_aggregates_file_pipeline() {
    let file = write_csv(&[
        "customer_id,name,email,city,state,registration_date,last_order_date,order_count,total_spent,total_items",
        "10,Ana,ana@example.com,Recife,PE,2022-01-10,2024-06-20,12,6200.0,30",
        "11,Bruno,bruno@example.com,Natal,RN,2022-01-10,,0,0,0",
        "12,Carla,carla@example.com,Belem,PA,2022-01-10,2023-12-13,4,1500.0,8",
    ]);

    let model = build_rfv_model(load_aggregates(file.path(), &window()).unwrap());
    let segments: Vec<Segment> = model.records.iter().map(|r| r.segment).collect();
    assert_eq!(
        segments,
        vec![Segment::Champions, Segment::NewCustomer, Segment::AtRisk]
    );
    assert_eq!(model.records[0].total_score, 15);
    assert_eq!(model.records[0].total_items, 30);
}

#[test]
fn test_filter_after_classification() {
    let customers_file = create_customers_csv();
    let orders_file = create_orders_csv();
    let customers = load_customers(customers_file.path()).unwrap();
    let orders = load_orders(orders_file.path()).unwrap();
    let model = build_rfv_model(rollup_orders(&customers, &orders, &window()).unwrap());

    let filter: SegmentFilter = "At Risk".parse().unwrap();
    let at_risk = filter.apply(model.records.clone());
    assert_eq!(at_risk.len(), 1);
    assert_eq!(at_risk[0].customer_id, 2);

    let everyone: SegmentFilter = "Todos".parse().unwrap();
    assert_eq!(everyone.apply(model.records.clone()).len(), 5);

    assert!("Platinum".parse::<SegmentFilter>().is_err());
}

#[test]
fn test_rollups_conserve_population_and_revenue() {
    let customers_file = create_customers_csv();
    let orders_file = create_orders_csv();
    let customers = load_customers(customers_file.path()).unwrap();
    let orders = load_orders(orders_file.path()).unwrap();
    let model = build_rfv_model(rollup_orders(&customers, &orders, &window()).unwrap());

    let summaries = summarize_by_segment(&model.records);
    let stats = overview(&model.records);

    assert_eq!(
        summaries.iter().map(|s| s.customers).sum::<usize>(),
        stats.total_customers
    );
    let revenue: f64 = summaries.iter().map(|s| s.revenue).sum();
    assert!((revenue - stats.total_revenue).abs() < 1e-6);
    assert!((stats.total_revenue - 8050.0).abs() < 1e-6);
    assert_eq!(stats.recurring_customers, 2);
    assert_eq!(stats.top_customers, 1);
}

#[test]
fn test_listing_order() {
    let customers_file = create_customers_csv();
    let orders_file = create_orders_csv();
    let customers = load_customers(customers_file.path()).unwrap();
    let orders = load_orders(orders_file.path()).unwrap();
    let mut records = build_rfv_model(rollup_orders(&customers, &orders, &window()).unwrap()).into_records();

    sort_records(&mut records, SortKey::Recency);
    let ids: Vec<i64> = records.iter().map(|r| r.customer_id).collect();
    assert_eq!(ids, vec![5, 1, 4, 2, 3]);

    sort_records(&mut records, SortKey::TotalSpent);
    let ids: Vec<i64> = records.iter().map(|r| r.customer_id).collect();
    assert_eq!(ids, vec![1, 2, 4, 5, 3]);
}

#[test]
fn test_empty_window() {
    let customers_file = create_customers_csv();
    let orders_file = create_orders_csv();
    let customers = load_customers(customers_file.path()).unwrap();
    let orders = load_orders(orders_file.path()).unwrap();

    // No customers at all
    let model = build_rfv_model(rollup_orders(&[], &orders, &window()).unwrap());
    assert!(model.is_empty());
    assert!(summarize_by_segment(&model.records).is_empty());
    assert_eq!(overview(&model.records).total_customers, 0);

    // Customers but no orders in the window: everyone is new
    let quiet = ReportingWindow::new(date(2020, 1, 1), date(2020, 12, 31)).unwrap();
    let model = build_rfv_model(rollup_orders(&customers, &orders, &quiet).unwrap());
    assert_eq!(model.len(), 5);
    assert!(model
        .records
        .iter()
        .all(|r| r.segment == Segment::NewCustomer && r.total_score == 3));
}

#[test]
fn test_error_handling_missing_column() {
    let file = write_csv(&["customer_id,name", "1,Ana"]);
    let err = load_customers(file.path()).unwrap_err();
    assert!(err.to_string().contains("email"));
}
