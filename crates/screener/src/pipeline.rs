use crate::closeness::ClosenessFilter;
use crate::enrich::MetadataEnricher;
use crate::history::HistoryChecker;
use circuit_core::common::Stock;
use circuit_core::common::time::{TimeProvider, exchange_date};
use circuit_core::config::ScannerConfig;
use circuit_core::market::port::{BandHitSource, MarketDataProvider, ProfileProvider};
use circuit_core::scan::entity::{QualifyingResult, Rejection, ScanOutcome};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// # Summary
/// 扫描流水线依赖的外部端口。
pub struct ScanPorts {
    // 当日价格带触及数据源
    pub source: Arc<dyn BandHitSource>,
    // 日线数据源
    pub candles: Arc<dyn MarketDataProvider>,
    // 证券资料数据源
    pub profiles: Arc<dyn ProfileProvider>,
    // 时钟
    pub clock: Arc<dyn TimeProvider>,
}

/// # Summary
/// 首次触及价格带的证券扫描器，整个系统的应用服务层门面。
///
/// # Invariants
/// - 严格顺序执行：同一时刻最多一个外部请求在途。
/// - 不持有跨运行的可变状态，每次 `run` 的结果通过返回值传递。
pub struct Scanner {
    source: Arc<dyn BandHitSource>,
    filter: ClosenessFilter,
    checker: HistoryChecker,
    enricher: MetadataEnricher,
    clock: Arc<dyn TimeProvider>,
    // 每个证券检查之后的节流间隔
    pacing: Duration,
}

impl Scanner {
    /// # Summary
    /// 组装扫描器。
    ///
    /// # Arguments
    /// * `ports` - 外部端口的具体实现。
    /// * `config` - 筛选参数。
    pub fn new(ports: ScanPorts, config: &ScannerConfig) -> Self {
        Self {
            source: ports.source,
            filter: ClosenessFilter::from_ratio(config.closeness_threshold),
            checker: HistoryChecker::new(ports.candles, ports.clock.clone(), config),
            enricher: MetadataEnricher::new(ports.profiles, config.usd_inr_rate),
            clock: ports.clock,
            pacing: Duration::from_millis(config.pacing_delay_ms),
        }
    }

    /// # Summary
    /// 执行一次完整扫描。
    ///
    /// # Logic
    /// 1. 获取当日价格带触及列表；数据源失败视为没有候选。
    /// 2. 接近度过滤。
    /// 3. 对每个候选做回溯检查，未被排除者补全资料并生成结果。
    /// 4. 每个候选处理完毕后按节流间隔等待。
    ///
    /// # Returns
    /// 本次扫描的 `ScanOutcome`；该方法不会失败。
    pub async fn run(&self) -> ScanOutcome {
        let started_at = self.clock.now();
        let scan_date = exchange_date(started_at);

        let (hits, source_error) = match self.source.fetch_band_hits().await {
            Ok(hits) => (hits, None),
            Err(e) => {
                warn!("Band hit source unavailable, treating as no candidates: {}", e);
                (Vec::new(), Some(e.to_string()))
            }
        };
        let band_hits = hits.len();

        let candidates = self.filter.apply(hits);
        info!(
            "{} of {} band hitters within {} of their limit",
            candidates.len(),
            band_hits,
            self.filter.threshold()
        );

        let mut results = Vec::new();
        let mut rejections = Vec::new();

        for hit in &candidates {
            info!(
                "Checking {} (change {:.2}%, band {}%)",
                hit.symbol, hit.percent_change, hit.limit_percent
            );
            let stock = Stock::nse(hit.symbol.clone());
            let verdict = self.checker.check(&stock, hit.limit_percent).await;

            if self.checker.excludes(&verdict) {
                info!("✗ {} excluded: {}", hit.symbol, verdict);
                rejections.push(Rejection {
                    symbol: hit.symbol.clone(),
                    verdict,
                });
            } else {
                info!("✓ {} qualifies: {}", hit.symbol, verdict);
                let enrichment = self.enricher.enrich(&stock).await;
                results.push(QualifyingResult {
                    symbol: hit.symbol.clone(),
                    company_name: enrichment.company_name,
                    last_price: hit.last_price,
                    day_high: hit.day_high,
                    day_low: hit.day_low,
                    percent_change: hit.percent_change,
                    limit_percent: hit.limit_percent,
                    market_cap_crore: enrichment.market_cap_crore,
                    volume: hit.volume,
                    scan_date,
                });
            }

            tokio::time::sleep(self.pacing).await;
        }

        let outcome = ScanOutcome {
            scan_date,
            started_at,
            finished_at: self.clock.now(),
            band_hits,
            near_limit: candidates.len(),
            results,
            rejections,
            source_error,
        };
        info!(
            "Scan complete in {:.1}s: {} qualifying, {} excluded",
            outcome.elapsed_secs(),
            outcome.results.len(),
            outcome.rejections.len()
        );
        outcome
    }
}
