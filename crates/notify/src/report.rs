use crate::format::{
    self, NOT_AVAILABLE, band, optional_rupees, percent, rupees, rupees_grouped,
};
use chrono::{DateTime, FixedOffset};
use circuit_core::scan::entity::{QualifyingResult, ScanOutcome};
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::settings::Style;
use tabled::{Table, Tabled};
use thiserror::Error;

/// CSV 表头，与 `ReportRow` 字段顺序一致。
pub const CSV_HEADERS: [&str; 11] = [
    "Symbol",
    "Company Name",
    "Date",
    "Open",
    "Close",
    "High",
    "Low",
    "Change %",
    "Circuit Limit",
    "Market Cap",
    "Volume",
];

const RULE: &str = "================================================================================";

/// # Summary
/// 报告输出错误。
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// # Summary
/// 控制台表格与 CSV 共用的一行。
#[derive(Debug, Clone, PartialEq, Tabled, Serialize)]
pub struct ReportRow {
    #[tabled(rename = "Symbol")]
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[tabled(rename = "Company Name")]
    #[serde(rename = "Company Name")]
    pub company_name: String,
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    pub date: String,
    // 数据源不提供开盘价
    #[tabled(rename = "Open")]
    #[serde(rename = "Open")]
    pub open: String,
    #[tabled(rename = "Close")]
    #[serde(rename = "Close")]
    pub close: String,
    #[tabled(rename = "High")]
    #[serde(rename = "High")]
    pub high: String,
    #[tabled(rename = "Low")]
    #[serde(rename = "Low")]
    pub low: String,
    #[tabled(rename = "Change %")]
    #[serde(rename = "Change %")]
    pub change: String,
    #[tabled(rename = "Circuit Limit")]
    #[serde(rename = "Circuit Limit")]
    pub circuit_limit: String,
    #[tabled(rename = "Market Cap")]
    #[serde(rename = "Market Cap")]
    pub market_cap: String,
    #[tabled(rename = "Volume")]
    #[serde(rename = "Volume")]
    pub volume: String,
}

impl From<&QualifyingResult> for ReportRow {
    fn from(result: &QualifyingResult) -> Self {
        Self {
            symbol: result.symbol.clone(),
            company_name: company(result),
            date: result.scan_date.format("%Y-%m-%d").to_string(),
            open: NOT_AVAILABLE.to_string(),
            close: rupees(result.last_price),
            high: optional_rupees(result.day_high),
            low: optional_rupees(result.day_low),
            change: percent(result.percent_change),
            circuit_limit: band(result.limit_percent),
            market_cap: format::market_cap(result.market_cap_crore),
            volume: format::volume(result.volume),
        }
    }
}

/// 告警 issue 中的精简表格行。
#[derive(Tabled)]
struct AlertRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Company Name")]
    company_name: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Change %")]
    change: String,
    #[tabled(rename = "Circuit Limit")]
    circuit_limit: String,
    #[tabled(rename = "Market Cap")]
    market_cap: String,
}

impl From<&QualifyingResult> for AlertRow {
    fn from(result: &QualifyingResult) -> Self {
        Self {
            symbol: result.symbol.clone(),
            company_name: company(result),
            price: rupees(result.last_price),
            change: percent(result.percent_change),
            circuit_limit: band(result.limit_percent),
            market_cap: format::market_cap(result.market_cap_crore),
        }
    }
}

fn company(result: &QualifyingResult) -> String {
    result
        .company_name
        .clone()
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// # Summary
/// 渲染控制台报告。
///
/// # Logic
/// 1. 无结果时输出说明横幅。
/// 2. 否则输出标题、扫描时间、结果表格与总数。
pub fn render_console(outcome: &ScanOutcome, generated_at: DateTime<FixedOffset>) -> String {
    let mut lines: Vec<String> = vec![RULE.to_string()];

    if outcome.results.is_empty() {
        lines.push("No stocks found that hit upper circuit today but not in last 14 days.".to_string());
        lines.push("(No upper/lower circuit hits in last 14 days)".to_string());
        if let Some(err) = &outcome.source_error {
            lines.push(format!("Band hit source was unavailable: {}", err));
        }
        lines.push(RULE.to_string());
        return lines.join("\n") + "\n";
    }

    let rows: Vec<ReportRow> = outcome.results.iter().map(ReportRow::from).collect();
    let table = Table::new(rows).with(Style::psql()).to_string();

    lines.push("STOCKS THAT HIT UPPER CIRCUIT TODAY (First time in 14 days)".to_string());
    lines.push("No upper/lower circuit hit in last 14 days".to_string());
    lines.push(format!("Date: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(RULE.to_string());
    lines.push(table);
    lines.push(RULE.to_string());
    lines.push(format!("Total stocks found: {}", outcome.results.len()));
    lines.push(RULE.to_string());
    lines.join("\n") + "\n"
}

/// # Summary
/// 待发布的告警内容。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    pub title: String,
    pub body: String,
}

/// 一股一只的总投入。
pub fn total_investment(results: &[QualifyingResult]) -> Decimal {
    results.iter().map(|r| r.last_price).sum()
}

/// # Summary
/// 组装告警 issue 的标题与正文。
///
/// # Logic
/// 1. 标题带运行日期。
/// 2. 正文依次为投入概览、筛选条件、结果表格、汇总、解读与免责声明。
/// 3. 平均价格在结果为空时记为 0。
pub fn compose_issue(results: &[QualifyingResult], generated_at: DateTime<FixedOffset>) -> IssueDraft {
    let title = format!(
        "🚀 Upper Circuit Alert - {} [NSE-Optimized]",
        generated_at.format("%B %d, %Y")
    );

    let count = results.len();
    let total = total_investment(results);
    let average = if count == 0 {
        Decimal::ZERO
    } else {
        total / Decimal::from(count)
    };

    let rows: Vec<AlertRow> = results.iter().map(AlertRow::from).collect();
    let table = Table::new(rows).with(Style::markdown()).to_string();

    let body = format!(
        "# 💰 Investment Required

**You need to buy {count} stocks with {total_grouped}**

---

## 📊 Stocks That Hit Upper Circuit Today (First Time in 14 Days)

**Filtered Criteria:**
- ✅ Hit upper circuit TODAY (within 1% of limit)
- ✅ Did NOT hit upper/lower circuit in last 14 days
- ✅ Fresh momentum stocks only

{table}

---

## 📈 Summary

- **Total Stocks Found**: {count}
- **Total Investment (1 share each)**: {total_grouped}
- **Average Price per Stock**: {average_grouped}
- **Date**: {timestamp}
- **Scan Method**: NSE-Optimized (Price Band Hitter API)

---

## 🎯 What This Means

These stocks hit upper circuit today but **NO circuits** (upper or lower) in the last 14 days, indicating:
- ✅ Fresh momentum (first time in 2 weeks)
- ✅ Strong buying pressure
- ✅ Stable stock (no lower circuit volatility)
- ✅ Highest quality signals

---

## ⚠️ Disclaimer

This is an automated alert for informational purposes only. Not financial advice. Do your own research before investing.

---

*Auto-generated by Upper Circuit Finder (NSE-Optimized Mode)*
",
        total_grouped = rupees_grouped(total),
        average_grouped = rupees_grouped(average),
        timestamp = generated_at.format("%Y-%m-%d %H:%M:%S"),
    );

    IssueDraft { title, body }
}

/// # Summary
/// 将结果导出为 CSV。
///
/// # Logic
/// 1. 文件名带生成时间：`upper_circuit_stocks_YYYYmmdd_HHMMSS.csv`。
/// 2. 必要时创建目录。
/// 3. 列与控制台表格一致；没有结果时只写表头。
///
/// # Returns
/// 写入的文件路径。
pub fn write_csv(
    dir: &Path,
    results: &[QualifyingResult],
    generated_at: DateTime<FixedOffset>,
) -> Result<PathBuf, ReportError> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!(
        "upper_circuit_stocks_{}.csv",
        generated_at.format("%Y%m%d_%H%M%S")
    ));

    // 表头显式写出，没有结果时文件也带表头
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)?;
    writer.write_record(CSV_HEADERS)?;
    for result in results {
        writer.serialize(ReportRow::from(result))?;
    }
    writer.flush()?;
    Ok(path)
}
