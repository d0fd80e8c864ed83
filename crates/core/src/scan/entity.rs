use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # Summary
/// 历史 K 线中检测到的价格带触及方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LimitTouch {
    Upper,
    Lower,
}

impl std::fmt::Display for LimitTouch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitTouch::Upper => write!(f, "upper"),
            LimitTouch::Lower => write!(f, "lower"),
        }
    }
}

/// # Summary
/// 单个证券回溯窗口检查的结论。
///
/// # Invariants
/// - `Unavailable` 与 `Insufficient` 区分“查询失败”与“查询成功但数据不足”。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HistoryVerdict {
    /// 窗口内没有任何交易日触及价格带
    Clean { sessions_checked: usize },
    /// 某个交易日触及价格带 (首个命中即停止)
    Touched {
        time: DateTime<Utc>,
        touch: LimitTouch,
    },
    /// 可用 K 线少于 2 根，无法验证
    Insufficient { bars: usize },
    /// 历史数据查询或解析失败
    Unavailable { reason: String },
}

impl std::fmt::Display for HistoryVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryVerdict::Clean { sessions_checked } => {
                write!(f, "clean over {} sessions", sessions_checked)
            }
            HistoryVerdict::Touched { time, touch } => {
                write!(f, "{} circuit on {}", touch, time.date_naive())
            }
            HistoryVerdict::Insufficient { bars } => write!(f, "insufficient history ({} bars)", bars),
            HistoryVerdict::Unavailable { reason } => write!(f, "history unavailable: {}", reason),
        }
    }
}

/// # Summary
/// 通过全部筛选的证券，扫描的最终产物。
///
/// # Invariants
/// - 仅当接近度低于阈值且回溯窗口内无触及时创建。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualifyingResult {
    // 股票代码
    pub symbol: String,
    // 公司名称 (查询失败为 None)
    pub company_name: Option<String>,
    // 最新成交价
    pub last_price: Decimal,
    // 当日最高价
    pub day_high: Decimal,
    // 当日最低价
    pub day_low: Decimal,
    // 当日涨跌幅 (%)
    pub percent_change: Decimal,
    // 价格带宽度 (%)
    pub limit_percent: Decimal,
    // 市值 (亿卢比单位 crore，查询失败为 None)
    pub market_cap_crore: Option<f64>,
    // 成交量
    pub volume: Decimal,
    // 扫描日期 (交易所本地日期)
    pub scan_date: NaiveDate,
}

/// # Summary
/// 被回溯检查排除的证券及其原因。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub symbol: String,
    pub verdict: HistoryVerdict,
}

/// # Summary
/// 一次完整扫描的结果，取代在处理对象上累积的可变状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanOutcome {
    // 扫描日期 (交易所本地日期)
    pub scan_date: NaiveDate,
    // 扫描开始时间
    pub started_at: DateTime<Utc>,
    // 扫描结束时间
    pub finished_at: DateTime<Utc>,
    // 数据源返回的去重后候选数量
    pub band_hits: usize,
    // 通过接近度过滤的候选数量
    pub near_limit: usize,
    // 最终入选结果，保持候选顺序
    pub results: Vec<QualifyingResult>,
    // 被回溯检查排除的证券
    pub rejections: Vec<Rejection>,
    // 数据源不可用时的错误描述
    pub source_error: Option<String>,
}

impl ScanOutcome {
    /// 扫描耗时 (秒)。
    pub fn elapsed_secs(&self) -> f64 {
        let elapsed = self.finished_at - self.started_at;
        elapsed.to_std().map(|d| d.as_secs_f64()).unwrap_or(0.0)
    }
}
