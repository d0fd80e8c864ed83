use crate::common::Stock;
use crate::market::entity::{CandidateHit, Candle, StockProfile};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// # Summary
/// 当日价格带触及列表的数据源接口。
///
/// # Invariants
/// - 返回列表按 `symbol` 去重，先出现者优先。
/// - 实现不负责接近度过滤，只负责获取与解析。
#[async_trait]
pub trait BandHitSource: Send + Sync {
    /// # Summary
    /// 获取当日触及价格带上限的证券列表。
    ///
    /// # Logic
    /// 1. 建立数据源要求的会话。
    /// 2. 请求价格带触及接口并解析所有分类。
    /// 3. 按代码去重。
    ///
    /// # Returns
    /// 成功返回候选列表；网络、状态码或解析失败返回 MarketError。
    async fn fetch_band_hits(&self) -> Result<Vec<CandidateHit>, MarketError>;
}

/// # Summary
/// 历史日线数据提供者接口。
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// # Summary
    /// 获取特定证券在指定时间范围内的日 K 线。
    ///
    /// # Arguments
    /// * `stock`: 证券身份。
    /// * `start`: 开始时间。
    /// * `end`: 结束时间。
    ///
    /// # Returns
    /// 成功返回按时间升序排列的 K 线列表。
    async fn fetch_daily_candles(
        &self,
        stock: &Stock,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketError>;
}

/// # Summary
/// 证券描述信息提供者接口。
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// # Summary
    /// 查询证券的名称与市值。
    ///
    /// # Returns
    /// * `Ok(Some(_))` 查询成功且有数据。
    /// * `Ok(None)` 查询成功但数据源没有该证券。
    /// * `Err(MarketError)` 查询失败。
    async fn fetch_profile(&self, stock: &Stock) -> Result<Option<StockProfile>, MarketError>;
}
