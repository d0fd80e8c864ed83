use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 一次成功投递的回执。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// 平台侧标识 (例如 issue 编号)
    pub id: String,
    /// 可访问的链接 (若平台提供)
    pub url: Option<String>,
}

/// # Summary
/// 发送通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync`。
/// - 标签、目标仓库等投递参数属于实现自身的配置。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 发送带有主题和内容的通知。
    ///
    /// # Logic
    /// 1. 根据目标平台要求组装请求。
    /// 2. 通过底层传输协议发送消息。
    /// 3. 返回平台回执或失败原因。
    ///
    /// # Arguments
    /// * `subject` - 通知标题或主题。
    /// * `content` - 通知的具体内容 (Markdown)。
    ///
    /// # Returns
    /// * 成功返回 `Ok(Delivery)`。
    /// * 失败返回 `Err(NotifyError)`。
    async fn notify(&self, subject: &str, content: &str) -> Result<Delivery, NotifyError>;
}
