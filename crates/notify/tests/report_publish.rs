use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use circuit_core::common::time::to_exchange_time;
use circuit_core::scan::entity::{QualifyingResult, ScanOutcome};
use circuit_core::testing::{FailingNotifier, RecordingNotifier};
use circuit_notify::publish::{PublishStatus, publish_results};
use circuit_notify::report::{CSV_HEADERS, ReportRow, compose_issue, render_console, total_investment, write_csv};
use rust_decimal_macros::dec;

fn generated_at() -> DateTime<FixedOffset> {
    // 2026-03-20 15:40 IST
    to_exchange_time(Utc.with_ymd_and_hms(2026, 3, 20, 10, 10, 0).unwrap())
}

fn abc() -> QualifyingResult {
    QualifyingResult {
        symbol: "ABC".to_string(),
        company_name: Some("ABC Industries Limited".to_string()),
        last_price: dec!(500),
        day_high: dec!(510),
        day_low: dec!(490),
        percent_change: dec!(19.9),
        limit_percent: dec!(20),
        market_cap_crore: Some(8300.0),
        volume: dec!(10000),
        scan_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
    }
}

fn xyz() -> QualifyingResult {
    QualifyingResult {
        symbol: "XYZ".to_string(),
        company_name: None,
        last_price: dec!(1250.5),
        day_high: dec!(0),
        day_low: dec!(0),
        percent_change: dec!(4.97),
        limit_percent: dec!(5),
        market_cap_crore: None,
        volume: dec!(0),
        scan_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
    }
}

fn outcome(results: Vec<QualifyingResult>) -> ScanOutcome {
    let started_at = Utc.with_ymd_and_hms(2026, 3, 20, 10, 9, 0).unwrap();
    ScanOutcome {
        scan_date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
        started_at,
        finished_at: started_at + chrono::Duration::seconds(60),
        band_hits: results.len(),
        near_limit: results.len(),
        results,
        rejections: Vec::new(),
        source_error: None,
    }
}

#[test]
fn test_report_row_formatting() {
    let row = ReportRow::from(&abc());
    assert_eq!(row.symbol, "ABC");
    assert_eq!(row.date, "2026-03-20");
    assert_eq!(row.open, "N/A");
    assert_eq!(row.close, "₹500.00");
    assert_eq!(row.high, "₹510.00");
    assert_eq!(row.change, "19.90%");
    assert_eq!(row.circuit_limit, "20%");
    assert_eq!(row.market_cap, "₹8,300 Cr");
    assert_eq!(row.volume, "10,000");

    let row = ReportRow::from(&xyz());
    assert_eq!(row.company_name, "N/A");
    assert_eq!(row.high, "N/A");
    assert_eq!(row.low, "N/A");
    assert_eq!(row.market_cap, "N/A");
    assert_eq!(row.volume, "N/A");
}

#[test]
fn test_console_report() {
    let text = render_console(&outcome(vec![abc(), xyz()]), generated_at());
    assert!(text.contains("STOCKS THAT HIT UPPER CIRCUIT TODAY"));
    assert!(text.contains("Date: 2026-03-20 15:40:00"));
    assert!(text.contains("ABC Industries Limited"));
    assert!(text.contains("Circuit Limit"));
    assert!(text.contains("Total stocks found: 2"));
}

#[test]
fn test_console_report_empty() {
    let mut empty = outcome(Vec::new());
    empty.source_error = Some("HTTP 403".to_string());
    let text = render_console(&empty, generated_at());
    assert!(text.contains("No stocks found"));
    assert!(text.contains("HTTP 403"));
    assert!(!text.contains("Total stocks found"));
}

#[test]
fn test_issue_draft() {
    let results = vec![abc(), xyz()];
    assert_eq!(total_investment(&results), dec!(1750.5));

    let draft = compose_issue(&results, generated_at());
    assert_eq!(
        draft.title,
        "🚀 Upper Circuit Alert - March 20, 2026 [NSE-Optimized]"
    );
    assert!(draft.body.contains("You need to buy 2 stocks with ₹1,750.50"));
    assert!(draft.body.contains("**Average Price per Stock**: ₹875.25"));
    assert!(draft.body.contains("| Symbol"));
    assert!(draft.body.contains("| ABC"));
    assert!(draft.body.contains("Disclaimer"));
    // 精简表格不含成交量列
    assert!(!draft.body.contains("| Volume"));
}

#[test]
fn test_csv_export() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &[abc(), xyz()], generated_at()).unwrap();

    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("upper_circuit_stocks_20260320_154000.csv")
    );

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next(),
        Some("Symbol,Company Name,Date,Open,Close,High,Low,Change %,Circuit Limit,Market Cap,Volume")
    );
    let first = lines.next().unwrap();
    assert!(first.starts_with("ABC,ABC Industries Limited,2026-03-20,N/A,₹500.00"));
    assert!(first.contains("\"₹8,300 Cr\""));
    assert_eq!(lines.count(), 1);
}

#[test]
fn test_csv_export_without_results_has_header() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_csv(dir.path(), &[], generated_at()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines, vec![CSV_HEADERS.join(",")]);
}

#[tokio::test]
async fn test_publish_skipped_without_results() {
    let notifier = RecordingNotifier::new();
    let status = publish_results(&notifier, &[], generated_at()).await;
    assert_eq!(status, PublishStatus::Skipped);
    assert!(notifier.sent().is_empty());
}

#[tokio::test]
async fn test_publish_sends_issue_draft() {
    let notifier = RecordingNotifier::new();
    let status = publish_results(&notifier, &[abc()], generated_at()).await;

    assert!(matches!(status, PublishStatus::Published(ref d) if d.id == "1"));
    let sent = notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].0.starts_with("🚀 Upper Circuit Alert"));
    assert!(sent[0].1.contains("ABC Industries Limited"));
}

#[tokio::test]
async fn test_publish_failure_is_reported() {
    let status = publish_results(&FailingNotifier, &[abc()], generated_at()).await;
    match status {
        PublishStatus::Failed(reason) => assert!(reason.contains("simulated outage")),
        other => panic!("expected failure, got {:?}", other),
    }
}
