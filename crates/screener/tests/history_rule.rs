use chrono::{Duration, TimeZone, Utc};
use circuit_core::common::time::FakeClockProvider;
use circuit_core::config::{HistoryFailurePolicy, ScannerConfig};
use circuit_core::market::entity::Candle;
use circuit_core::scan::entity::{HistoryVerdict, LimitTouch};
use circuit_core::testing::ScriptedCandleProvider;
use circuit_screener::history::{HistoryChecker, TouchRule, evaluate, prior_window, session_touch};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn candle(day: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        time: Utc.with_ymd_and_hms(2026, 3, 2, 3, 45, 0).unwrap() + Duration::days(day),
        open,
        high,
        low,
        close,
        adj_close: None,
        volume: 1000.0,
    }
}

/// 平稳行情：每日 +1%，收盘远离最高价。
fn calm_series(len: u32) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let base = 100.0 + f64::from(i);
            candle(i64::from(i), base, base * 1.03, base * 0.98, base * 1.01)
        })
        .collect()
}

#[test]
fn test_upper_touch_from_open() {
    let rule = TouchRule::default();
    let c = candle(0, 100.0, 110.0, 99.0, 109.7);
    assert_eq!(session_touch(&c, None, 10.0, &rule), Some(LimitTouch::Upper));
}

#[test]
fn test_no_touch_when_far_from_band() {
    let rule = TouchRule::default();
    let c = candle(0, 100.0, 112.0, 99.0, 105.0);
    assert_eq!(session_touch(&c, None, 10.0, &rule), None);
}

#[test]
fn test_no_upper_touch_when_close_far_from_high() {
    let rule = TouchRule::default();
    // 涨幅足够，但收盘距最高价超过 0.3%
    let c = candle(0, 100.0, 115.0, 99.0, 110.0);
    assert_eq!(session_touch(&c, None, 10.0, &rule), None);
}

#[test]
fn test_upper_touch_from_previous_close() {
    let rule = TouchRule::default();
    // 高开后封板：相对开盘只涨 2%，相对前收盘涨 20%
    let c = candle(1, 117.6, 120.0, 117.0, 120.0);
    assert_eq!(session_touch(&c, None, 20.0, &rule), None);
    assert_eq!(session_touch(&c, Some(100.0), 20.0, &rule), Some(LimitTouch::Upper));
}

#[test]
fn test_lower_touch() {
    let rule = TouchRule::default();
    let c = candle(0, 100.0, 100.5, 95.0, 95.1);
    assert_eq!(session_touch(&c, None, 5.0, &rule), Some(LimitTouch::Lower));
    // 收盘离最低价太远
    let c = candle(0, 100.0, 100.5, 94.0, 95.0);
    assert_eq!(session_touch(&c, None, 5.0, &rule), None);
}

#[test]
fn test_missing_open_or_close_skips_session() {
    let rule = TouchRule::default();
    assert_eq!(session_touch(&candle(0, 0.0, 110.0, 99.0, 110.0), None, 10.0, &rule), None);
    assert_eq!(
        session_touch(&candle(0, f64::NAN, 110.0, 99.0, 110.0), None, 10.0, &rule),
        None
    );
    assert_eq!(session_touch(&candle(0, 100.0, 110.0, 99.0, 0.0), None, 10.0, &rule), None);
}

#[test]
fn test_fewer_than_two_bars_is_insufficient() {
    let rule = TouchRule::default();
    for limit in [5.0, 10.0, 20.0] {
        assert_eq!(evaluate(&[], limit, &rule), HistoryVerdict::Insufficient { bars: 0 });
        assert_eq!(
            evaluate(&calm_series(1), limit, &rule),
            HistoryVerdict::Insufficient { bars: 1 }
        );
    }
}

#[test]
fn test_prior_window_sizes() {
    assert_eq!(prior_window(&calm_series(20), 14).len(), 14);
    assert_eq!(prior_window(&calm_series(15), 14).len(), 14);
    assert_eq!(prior_window(&calm_series(10), 14).len(), 9);
    assert_eq!(prior_window(&calm_series(2), 14).len(), 1);
    assert!(prior_window(&[], 14).is_empty());

    // 窗口不含最新一根，也不含更早的第 16 根
    let series = calm_series(20);
    let window = prior_window(&series, 14);
    assert_eq!(window.first().unwrap().time, series[5].time);
    assert_eq!(window.last().unwrap().time, series[18].time);
}

#[test]
fn test_today_and_older_sessions_are_ignored() {
    let rule = TouchRule::default();
    let mut series = calm_series(20);
    // 第 0 根 (窗口之外) 与最新一根 (今天) 都是封板
    series[0] = candle(0, 100.0, 110.0, 99.0, 110.0);
    series[19] = candle(19, 100.0, 110.0, 99.0, 110.0);
    assert_eq!(
        evaluate(&series, 10.0, &rule),
        HistoryVerdict::Clean { sessions_checked: 14 }
    );

    // 窗口内的封板会被识别
    series[10] = candle(10, 100.0, 110.0, 99.0, 110.0);
    assert!(matches!(
        evaluate(&series, 10.0, &rule),
        HistoryVerdict::Touched { touch: LimitTouch::Upper, .. }
    ));
}

#[test]
fn test_partial_window_is_checked() {
    let rule = TouchRule::default();
    assert_eq!(
        evaluate(&calm_series(6), 10.0, &rule),
        HistoryVerdict::Clean { sessions_checked: 5 }
    );
}

#[test]
fn test_skipped_session_still_sets_previous_close() {
    let rule = TouchRule::default();
    let mut series = calm_series(5);
    // 开盘价缺失的交易日本身不判定，但其收盘价作为下一日的前收盘
    series[1] = candle(1, 0.0, 101.0, 99.0, 100.0);
    // 相对开盘只涨 1.7%，相对前收盘 100 涨 20%
    series[2] = candle(2, 118.0, 120.0, 117.0, 120.0);

    match evaluate(&series, 20.0, &rule) {
        HistoryVerdict::Touched { time, touch } => {
            assert_eq!(touch, LimitTouch::Upper);
            assert_eq!(time, series[2].time);
        }
        other => panic!("expected upper touch, got {:?}", other),
    }
}

fn checker(provider: ScriptedCandleProvider, policy: HistoryFailurePolicy) -> HistoryChecker {
    let config = ScannerConfig {
        history_failure_policy: policy,
        ..ScannerConfig::default()
    };
    let clock = FakeClockProvider::new(Utc.with_ymd_and_hms(2026, 3, 27, 10, 0, 0).unwrap());
    HistoryChecker::new(Arc::new(provider), Arc::new(clock), &config)
}

#[tokio::test]
async fn test_hit_limit_recently_with_no_history() {
    let checker = checker(ScriptedCandleProvider::new(), HistoryFailurePolicy::Include);
    assert!(checker.hit_limit_recently("NEWLIST", dec!(20)).await);
    assert!(checker.hit_limit_recently("NEWLIST", dec!(5)).await);
}

#[tokio::test]
async fn test_hit_limit_recently_on_clean_and_touched_history() {
    let mut touched = calm_series(16);
    touched[7] = candle(7, 100.0, 105.0, 94.9, 95.0);
    let provider = ScriptedCandleProvider::new()
        .with_candles("CALM", calm_series(16))
        .with_candles("LOCKED", touched);
    let checker = checker(provider, HistoryFailurePolicy::Exclude);

    assert!(!checker.hit_limit_recently("CALM", dec!(5)).await);
    assert!(checker.hit_limit_recently("LOCKED", dec!(5)).await);
}

#[tokio::test]
async fn test_fetch_error_follows_failure_policy() {
    let strict = checker(
        ScriptedCandleProvider::new().with_error("ERR", "timeout"),
        HistoryFailurePolicy::Exclude,
    );
    let lenient = checker(
        ScriptedCandleProvider::new().with_error("ERR", "timeout"),
        HistoryFailurePolicy::Include,
    );

    let verdict = strict.check(&circuit_core::common::Stock::nse("ERR"), dec!(10)).await;
    assert!(matches!(verdict, HistoryVerdict::Unavailable { .. }));
    assert!(strict.hit_limit_recently("ERR", dec!(10)).await);
    assert!(!lenient.hit_limit_recently("ERR", dec!(10)).await);
}

#[tokio::test]
async fn test_request_covers_lookback_calendar_days() {
    let provider = Arc::new(ScriptedCandleProvider::new());
    let clock = Arc::new(FakeClockProvider::new(
        Utc.with_ymd_and_hms(2026, 3, 27, 10, 0, 0).unwrap(),
    ));
    let checker = HistoryChecker::new(provider.clone(), clock, &ScannerConfig::default());
    checker.hit_limit_recently("ABC", dec!(20)).await;

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let (symbol, start, end) = &requests[0];
    assert_eq!(symbol, "ABC");
    assert_eq!(*end - *start, Duration::days(25));
}

#[tokio::test]
async fn test_split_adjusted_history_is_not_a_false_lower_touch() {
    // 1:2 拆股：未复权前一日收盘 200，当日 100，复权后两日连续
    let mut series = calm_series(5);
    let mut before_split = candle(1, 198.0, 206.0, 196.0, 200.0);
    before_split.adj_close = Some(100.0);
    series[1] = before_split;
    series[2] = candle(2, 100.0, 103.0, 99.9, 100.0);
    let provider = ScriptedCandleProvider::new().with_candles("SPLIT", series);
    let checker = checker(provider, HistoryFailurePolicy::Exclude);

    assert!(!checker.hit_limit_recently("SPLIT", dec!(20)).await);
}
