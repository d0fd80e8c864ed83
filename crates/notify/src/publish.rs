use crate::report::compose_issue;
use chrono::{DateTime, FixedOffset};
use circuit_core::notify::port::{Delivery, Notifier};
use circuit_core::scan::entity::QualifyingResult;
use tracing::{error, info};

/// # Summary
/// 一次发布尝试的结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    /// 没有结果，未发布
    Skipped,
    /// 发布成功
    Published(Delivery),
    /// 发布失败，附带原因
    Failed(String),
}

/// # Summary
/// 将扫描结果作为告警发布。
///
/// # Logic
/// 1. 没有结果时直接跳过。
/// 2. 组装 issue 标题与正文，交给 `Notifier` 投递。
/// 3. 投递失败只记录日志，不向上传播。
///
/// # Arguments
/// * `notifier` - 投递目标。
/// * `results` - 合格的证券列表。
/// * `generated_at` - 报告生成时间 (交易所时区)。
pub async fn publish_results(
    notifier: &dyn Notifier,
    results: &[QualifyingResult],
    generated_at: DateTime<FixedOffset>,
) -> PublishStatus {
    if results.is_empty() {
        info!("No qualifying stocks, skipping alert publication");
        return PublishStatus::Skipped;
    }

    let draft = compose_issue(results, generated_at);
    match notifier.notify(&draft.title, &draft.body).await {
        Ok(delivery) => {
            match &delivery.url {
                Some(url) => info!("Alert published: {}", url),
                None => info!("Alert published with id {}", delivery.id),
            }
            PublishStatus::Published(delivery)
        }
        Err(e) => {
            error!("Failed to publish alert: {}", e);
            PublishStatus::Failed(e.to_string())
        }
    }
}
