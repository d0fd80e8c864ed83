use async_trait::async_trait;
use circuit_core::config::GithubConfig;
use circuit_core::notify::error::NotifyError;
use circuit_core::notify::port::{Delivery, Notifier};
use reqwest::header::{self, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

const USER_AGENT: &str = "upper-circuit-finder";
const API_VERSION: &str = "2022-11-28";

/// # Summary
/// 通过 GitHub Issues API 发布告警的通知器。
///
/// # Invariants
/// * `owner` 与 `repo` 非空。
/// * 令牌仅以 `SecretString` 形式保存，不会出现在日志中。
pub struct GithubIssueNotifier {
    /// 访问令牌，缺省时匿名请求
    token: Option<SecretString>,
    /// 创建 issue 的完整地址
    issues_url: String,
    /// 附加到 issue 上的标签
    labels: Vec<String>,
    /// 内部 HTTP 客户端
    client: reqwest::Client,
}

/// `POST /repos/{owner}/{repo}/issues` 请求体。
#[derive(Serialize)]
struct CreateIssue<'a> {
    title: &'a str,
    body: &'a str,
    labels: &'a [String],
}

/// 创建成功的响应中关心的字段。
#[derive(Deserialize, Debug)]
struct CreatedIssue {
    number: u64,
    #[serde(default)]
    html_url: Option<String>,
}

/// # Summary
/// 拼接 issue 创建地址。
///
/// # Returns
/// 仓库坐标为空时返回 `NotifyError::Config`。
pub fn issues_url(api_base: &str, owner: &str, repo: &str) -> Result<String, NotifyError> {
    let owner = owner.trim();
    let repo = repo.trim();
    if owner.is_empty() || repo.is_empty() {
        return Err(NotifyError::Config(
            "GitHub owner and repository must be set".to_string(),
        ));
    }
    Ok(format!(
        "{}/repos/{}/{}/issues",
        api_base.trim_end_matches('/'),
        owner,
        repo
    ))
}

/// 解析创建成功后的响应体。
pub fn parse_created(body: &str) -> Result<Delivery, NotifyError> {
    let issue: CreatedIssue = serde_json::from_str(body)
        .map_err(|e| NotifyError::Platform(format!("Unexpected GitHub response: {}", e)))?;
    Ok(Delivery {
        id: issue.number.to_string(),
        url: issue.html_url,
    })
}

impl GithubIssueNotifier {
    /// # Summary
    /// 创建 `GithubIssueNotifier`。
    ///
    /// # Logic
    /// 1. 校验仓库坐标并拼接地址。
    /// 2. 空白令牌视为未配置。
    /// 3. 设置 GitHub 推荐的默认请求头并构建客户端。
    ///
    /// # Arguments
    /// * `config` - 发布目标配置。
    /// * `timeout` - 单次请求超时。
    pub fn new(config: GithubConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let issues_url = issues_url(&config.api_base, &config.owner, &config.repo)?;

        let token = config
            .token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(SecretString::from);

        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(header::USER_AGENT, HeaderValue::from_static(USER_AGENT));
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(API_VERSION),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            token,
            issues_url,
            labels: config.labels,
            client,
        })
    }

    /// 是否携带令牌。
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

#[async_trait]
impl Notifier for GithubIssueNotifier {
    /// # Summary
    /// 在目标仓库创建一条 issue。
    ///
    /// # Logic
    /// 1. 以标题、正文和标签组装请求体。
    /// 2. 配置了令牌时使用 Bearer 认证。
    /// 3. 非 2xx 状态返回 `NotifyError::Platform`，附带响应内容。
    /// 4. 解析 issue 编号与链接。
    async fn notify(&self, subject: &str, content: &str) -> Result<Delivery, NotifyError> {
        let payload = CreateIssue {
            title: subject,
            body: content,
            labels: &self.labels,
        };

        let mut request = self.client.post(&self.issues_url).json(&payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(NotifyError::Platform(format!(
                "GitHub API error {}: {}",
                status, body
            )));
        }

        let delivery = parse_created(&body)?;
        info!("Created GitHub issue #{}", delivery.id);
        Ok(delivery)
    }
}
