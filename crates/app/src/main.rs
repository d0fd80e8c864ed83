mod logging;
mod settings;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use circuit_core::common::time::{RealTimeProvider, TimeProvider, to_exchange_time};
use circuit_feed::nse::NseBandHitSource;
use circuit_feed::yahoo::YahooProvider;
use circuit_notify::github::GithubIssueNotifier;
use circuit_notify::publish::{PublishStatus, publish_results};
use circuit_notify::report::{render_console, write_csv};
use circuit_screener::pipeline::{ScanPorts, Scanner};
use tracing::{error, info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到 Scanner，执行一次扫描后退出。
///
/// # Logic
/// 1. 加载 .env 与分层配置；配置错误是唯一的致命错误。
/// 2. 初始化全局日志与 TLS 加密后端。
/// 3. 实例化基础设施层（NSE 数据源、Yahoo 行情）。
/// 4. 构造扫描器并执行一次扫描。
/// 5. 输出控制台报告，按需导出 CSV，发布告警。
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. 配置
    dotenvy::dotenv().ok();
    let config = settings::load_settings()?;

    // 2. 日志与 TLS
    let _guard = logging::init_logging();
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("A TLS crypto provider was already installed");
    }
    info!("Upper circuit finder starting...");

    // 3. 实例化基础设施层
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let source = Arc::new(NseBandHitSource::new(&config.feed)?);
    let yahoo = Arc::new(YahooProvider::new(&config.feed)?);

    // 4. 扫描
    let scanner = Scanner::new(
        ScanPorts {
            source,
            candles: yahoo.clone(),
            profiles: yahoo,
            clock: clock.clone(),
        },
        &config.scanner,
    );
    let outcome = scanner.run().await;
    let generated_at = to_exchange_time(clock.now());

    // 5. 输出
    print!("{}", render_console(&outcome, generated_at));

    if let Some(dir) = &config.report.csv_dir {
        match write_csv(Path::new(dir), &outcome.results, generated_at) {
            Ok(path) => info!("Results exported to {}", path.display()),
            Err(e) => error!("CSV export failed: {}", e),
        }
    }

    let timeout = Duration::from_secs(config.feed.request_timeout_secs);
    match GithubIssueNotifier::new(config.github, timeout) {
        Ok(notifier) => {
            if !notifier.is_authenticated() {
                warn!("No GitHub token configured, publishing anonymously");
            }
            if let PublishStatus::Failed(reason) =
                publish_results(&notifier, &outcome.results, generated_at).await
            {
                warn!("Alert was not published: {}", reason);
            }
        }
        Err(e) => error!("GitHub notifier unavailable: {}", e),
    }

    info!(
        "Done: {} qualifying stocks in {:.1}s",
        outcome.results.len(),
        outcome.elapsed_secs()
    );
    Ok(())
}
