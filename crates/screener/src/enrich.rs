use circuit_core::common::Stock;
use circuit_core::market::entity::StockProfile;
use circuit_core::market::error::MarketError;
use circuit_core::market::port::ProfileProvider;
use std::sync::Arc;
use tracing::{debug, warn};

/// 一 crore (千万) 卢比
pub const CRORE: f64 = 1e7;

/// 市值换算为 crore 卢比：`cap × rate / 1e7`。
pub fn to_crore(market_cap: f64, usd_inr_rate: f64) -> f64 {
    market_cap * usd_inr_rate / CRORE
}

/// # Summary
/// 入选证券的描述字段；查询失败时各字段为 `None`。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enrichment {
    pub company_name: Option<String>,
    pub market_cap_crore: Option<f64>,
}

/// # Summary
/// 证券描述信息补全器。
///
/// # Invariants
/// - `enrich` 永不失败；需要区分失败与空结果时使用 `describe`。
pub struct MetadataEnricher {
    provider: Arc<dyn ProfileProvider>,
    usd_inr_rate: f64,
}

impl MetadataEnricher {
    pub fn new(provider: Arc<dyn ProfileProvider>, usd_inr_rate: f64) -> Self {
        Self {
            provider,
            usd_inr_rate,
        }
    }

    /// 原始查询结果：`Ok(None)` 表示查询成功但无数据。
    pub async fn describe(&self, stock: &Stock) -> Result<Option<StockProfile>, MarketError> {
        self.provider.fetch_profile(stock).await
    }

    /// # Summary
    /// 尽力补全名称与市值。
    ///
    /// # Logic
    /// 1. 调用 `describe`。
    /// 2. 市值按固定汇率换算为 crore。
    /// 3. 无数据或失败时返回空的 `Enrichment`，失败记录警告。
    pub async fn enrich(&self, stock: &Stock) -> Enrichment {
        match self.describe(stock).await {
            Ok(Some(profile)) => Enrichment {
                company_name: profile.name,
                market_cap_crore: profile
                    .market_cap
                    .filter(|cap| *cap > 0.0)
                    .map(|cap| to_crore(cap, self.usd_inr_rate)),
            },
            Ok(None) => {
                debug!("No profile data for {}", stock);
                Enrichment::default()
            }
            Err(e) => {
                warn!("Profile lookup for {} failed: {}", stock, e);
                Enrichment::default()
            }
        }
    }
}
