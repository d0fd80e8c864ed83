use circuit_core::market::entity::CandidateHit;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

/// # Summary
/// 接近度过滤器：只保留当日涨幅贴近价格带上限的候选。
///
/// # Invariants
/// - 纯函数，无内部状态；对同一输入重复应用结果不变。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosenessFilter {
    // 相对距离阈值，严格小于才保留
    threshold: Decimal,
}

impl ClosenessFilter {
    pub fn new(threshold: Decimal) -> Self {
        Self { threshold }
    }

    /// 以浮点配置值构造；无法表示的值退回默认阈值。
    pub fn from_ratio(threshold: f64) -> Self {
        Decimal::from_f64(threshold).map_or_else(Self::default, Self::new)
    }

    pub fn threshold(&self) -> Decimal {
        self.threshold
    }

    /// `pct > 0`、`limit > 0` 且 `(limit - pct) / limit < threshold` 时保留。
    pub fn keeps(&self, hit: &CandidateHit) -> bool {
        if !hit.percent_change.is_sign_positive() || hit.percent_change.is_zero() {
            return false;
        }
        if !hit.limit_percent.is_sign_positive() || hit.limit_percent.is_zero() {
            return false;
        }
        hit.closeness().is_some_and(|c| c < self.threshold)
    }

    /// 过滤候选列表，保持原有顺序。
    pub fn apply(&self, hits: Vec<CandidateHit>) -> Vec<CandidateHit> {
        hits.into_iter().filter(|hit| self.keeps(hit)).collect()
    }
}

impl Default for ClosenessFilter {
    fn default() -> Self {
        Self::new(Decimal::new(1, 2))
    }
}
