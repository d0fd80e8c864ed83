use circuit_core::common::Stock;
use circuit_core::common::time::TimeProvider;
use circuit_core::config::{HistoryFailurePolicy, ScannerConfig};
use circuit_core::market::entity::Candle;
use circuit_core::market::port::MarketDataProvider;
use circuit_core::scan::entity::{HistoryVerdict, LimitTouch};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::sync::Arc;
use tracing::{debug, warn};

/// # Summary
/// 历史价格带触及的判定参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchRule {
    // 回溯的交易日数量 (不含最新一根)
    pub lookback_sessions: usize,
    // 涨跌幅容差，单位百分点
    pub touch_tolerance_pct: f64,
    // 收盘价与最高/最低价的比例容差
    pub extreme_ratio_tolerance: f64,
}

impl Default for TouchRule {
    fn default() -> Self {
        Self {
            lookback_sessions: 14,
            touch_tolerance_pct: 0.3,
            extreme_ratio_tolerance: 0.003,
        }
    }
}

impl From<&ScannerConfig> for TouchRule {
    fn from(config: &ScannerConfig) -> Self {
        Self {
            lookback_sessions: config.lookback_sessions,
            touch_tolerance_pct: config.touch_tolerance_pct,
            extreme_ratio_tolerance: config.extreme_ratio_tolerance,
        }
    }
}

fn is_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// # Summary
/// 选取回溯窗口：最新一根之前的交易日。
///
/// # Logic
/// 1. K 线数量 ≥ `lookback + 1` 时取最新一根之前的 `lookback` 根。
/// 2. 否则取除最新一根外的全部。
pub fn prior_window(candles: &[Candle], lookback: usize) -> &[Candle] {
    let Some(last) = candles.len().checked_sub(1) else {
        return &[];
    };
    let start = last.saturating_sub(lookback);
    &candles[start..last]
}

/// # Summary
/// 判断单个交易日是否触及价格带。
///
/// # Logic
/// 1. 开盘或收盘价缺失 (非正数或非有限值) 时跳过该交易日。
/// 2. 分别计算相对开盘价与相对前收盘价的涨跌幅；前收盘缺失时两者相同。
/// 3. 上限：最大涨幅 ≥ `limit - tolerance` 且收盘贴近最高价。
/// 4. 下限：最小涨幅 ≤ `-(limit - tolerance)` 且收盘贴近最低价。
///
/// # Arguments
/// * `candle` - 待判定的交易日。
/// * `prev_close` - 窗口内前一交易日收盘价。
/// * `limit_percent` - 价格带宽度 (%)。
/// * `rule` - 判定参数。
pub fn session_touch(
    candle: &Candle,
    prev_close: Option<f64>,
    limit_percent: f64,
    rule: &TouchRule,
) -> Option<LimitTouch> {
    if !is_price(candle.open) || !is_price(candle.close) {
        return None;
    }

    let pct_from_open = (candle.close - candle.open) / candle.open * 100.0;
    let pct_from_prev = match prev_close {
        Some(prev) if is_price(prev) => (candle.close - prev) / prev * 100.0,
        _ => pct_from_open,
    };
    let max_pct = pct_from_open.max(pct_from_prev);
    let min_pct = pct_from_open.min(pct_from_prev);

    let band = limit_percent - rule.touch_tolerance_pct;

    let high_ratio = if candle.high > 0.0 {
        candle.close / candle.high
    } else {
        0.0
    };
    if max_pct >= band && high_ratio >= 1.0 - rule.extreme_ratio_tolerance {
        return Some(LimitTouch::Upper);
    }

    let low_ratio = if candle.low > 0.0 {
        candle.close / candle.low
    } else {
        2.0
    };
    if min_pct <= -band && low_ratio <= 1.0 + rule.extreme_ratio_tolerance {
        return Some(LimitTouch::Lower);
    }

    None
}

/// # Summary
/// 对一组按时间升序的日 K 线做回溯检查。
///
/// # Logic
/// 1. 少于 2 根 K 线返回 `Insufficient`。
/// 2. 在 `prior_window` 上逐日调用 `session_touch`，首个命中立即返回 `Touched`。
/// 3. 全部未命中返回 `Clean`。
pub fn evaluate(candles: &[Candle], limit_percent: f64, rule: &TouchRule) -> HistoryVerdict {
    if candles.len() < 2 {
        return HistoryVerdict::Insufficient {
            bars: candles.len(),
        };
    }

    let window = prior_window(candles, rule.lookback_sessions);
    let mut prev_close = None;
    for candle in window {
        if let Some(touch) = session_touch(candle, prev_close, limit_percent, rule) {
            return HistoryVerdict::Touched {
                time: candle.time,
                touch,
            };
        }
        prev_close = Some(candle.close);
    }

    HistoryVerdict::Clean {
        sessions_checked: window.len(),
    }
}

/// # Summary
/// 历史价格带检查器：拉取日线并判定证券近期是否触及过价格带。
///
/// # Invariants
/// - 不向调用方抛出错误，所有失败都体现在 `HistoryVerdict` 中。
/// - 失败如何映射为“排除/保留”由 `HistoryFailurePolicy` 统一决定。
pub struct HistoryChecker {
    // 日线数据源
    provider: Arc<dyn MarketDataProvider>,
    // 时钟，决定回溯区间的终点
    clock: Arc<dyn TimeProvider>,
    // 判定参数
    rule: TouchRule,
    // 请求的自然日跨度
    calendar_days: i64,
    // 查询失败时的策略
    failure_policy: HistoryFailurePolicy,
}

impl HistoryChecker {
    pub fn new(
        provider: Arc<dyn MarketDataProvider>,
        clock: Arc<dyn TimeProvider>,
        config: &ScannerConfig,
    ) -> Self {
        Self {
            provider,
            clock,
            rule: TouchRule::from(config),
            calendar_days: config.lookback_calendar_days,
            failure_policy: config.history_failure_policy,
        }
    }

    /// # Summary
    /// 检查证券在回溯窗口内的价格带触及情况。
    ///
    /// # Logic
    /// 1. 请求 `[now - calendar_days, now]` 的日线。
    /// 2. 按复权因子调整后交给 `evaluate`。
    /// 3. 查询失败返回 `Unavailable`。
    pub async fn check(&self, stock: &Stock, limit_percent: Decimal) -> HistoryVerdict {
        let Some(limit) = limit_percent.to_f64() else {
            return HistoryVerdict::Unavailable {
                reason: format!("price band {} is not representable", limit_percent),
            };
        };

        let end = self.clock.now();
        let start = end - chrono::Duration::days(self.calendar_days);

        match self.provider.fetch_daily_candles(stock, start, end).await {
            Ok(candles) => {
                let adjusted: Vec<Candle> = candles.iter().map(Candle::adjusted).collect();
                let verdict = evaluate(&adjusted, limit, &self.rule);
                debug!("{}: {} bars, {}", stock, adjusted.len(), verdict);
                verdict
            }
            Err(e) => {
                warn!("History lookup for {} failed: {}", stock, e);
                HistoryVerdict::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// 依据失败策略判断结论是否导致排除。
    pub fn excludes(&self, verdict: &HistoryVerdict) -> bool {
        match verdict {
            HistoryVerdict::Clean { .. } => false,
            HistoryVerdict::Touched { .. } | HistoryVerdict::Insufficient { .. } => true,
            HistoryVerdict::Unavailable { .. } => {
                self.failure_policy == HistoryFailurePolicy::Exclude
            }
        }
    }

    /// # Summary
    /// 证券近期是否触及过价格带 (或无法确认)。
    ///
    /// # Returns
    /// `true` 表示应当排除该证券。
    pub async fn hit_limit_recently(&self, symbol: &str, limit_percent: Decimal) -> bool {
        let verdict = self.check(&Stock::nse(symbol), limit_percent).await;
        self.excludes(&verdict)
    }
}
