use serde::{Deserialize, Serialize};

/// 全局应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scanner: ScannerConfig,
    pub feed: FeedConfig,
    pub github: GithubConfig,
    pub report: ReportConfig,
}

/// 历史数据查询失败时的处理策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryFailurePolicy {
    /// 无法验证即排除 (与数据不足时的处理一致)
    #[default]
    Exclude,
    /// 查询失败视为未触及，保留该证券
    Include,
}

/// 筛选参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// 接近度阈值，`(limit - pct) / limit` 必须严格小于该值
    pub closeness_threshold: f64,
    /// 回溯检查的交易日数量
    pub lookback_sessions: usize,
    /// 为凑足交易日而请求的自然日跨度
    pub lookback_calendar_days: i64,
    /// 涨跌幅判定容差 (百分点)
    pub touch_tolerance_pct: f64,
    /// 收盘价贴近最高/最低价的比例容差
    pub extreme_ratio_tolerance: f64,
    /// 每个证券检查之后的节流间隔
    pub pacing_delay_ms: u64,
    /// 历史数据查询失败的处理策略
    pub history_failure_policy: HistoryFailurePolicy,
    /// 市值换算汇率 (USD -> INR)
    pub usd_inr_rate: f64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            closeness_threshold: 0.01,
            lookback_sessions: 14,
            lookback_calendar_days: 25,
            touch_tolerance_pct: 0.3,
            extreme_ratio_tolerance: 0.003,
            pacing_delay_ms: 100,
            history_failure_policy: HistoryFailurePolicy::Exclude,
            usd_inr_rate: 83.0,
        }
    }
}

/// 行情数据源参数
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub nse_base_url: String,
    pub band_hitter_path: String,
    /// 预热访问的行情页面，按顺序尝试
    pub warmup_paths: Vec<String>,
    /// 预热步骤之间的停顿
    pub warmup_pause_ms: u64,
    pub yahoo_base_url: String,
    /// 单次请求超时
    pub request_timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            nse_base_url: "https://www.nseindia.com".to_string(),
            band_hitter_path: "/api/live-analysis-price-band-hitter".to_string(),
            warmup_paths: vec![
                "/market-data/live-equity-market".to_string(),
                "/market-data".to_string(),
                "/get-quotes/equity".to_string(),
            ],
            warmup_pause_ms: 1000,
            yahoo_base_url: "https://query1.finance.yahoo.com".to_string(),
            request_timeout_secs: 15,
        }
    }
}

/// 告警发布目标 (GitHub Issue)
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// 访问令牌，缺省时匿名访问
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub owner: String,
    pub repo: String,
    pub api_base: String,
    pub labels: Vec<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: "pkalyankumar1010".to_string(),
            repo: "upper_circuit_finder".to_string(),
            api_base: "https://api.github.com".to_string(),
            labels: vec![
                "upper-circuit".to_string(),
                "auto-generated".to_string(),
                "trading-alert".to_string(),
                "nse-optimized".to_string(),
            ],
        }
    }
}

impl std::fmt::Debug for GithubConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("labels", &self.labels)
            .finish()
    }
}

/// 报告输出参数
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// CSV 导出目录，缺省时不导出
    pub csv_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.scanner.closeness_threshold, 0.01);
        assert_eq!(config.scanner.lookback_sessions, 14);
        assert_eq!(config.scanner.lookback_calendar_days, 25);
        assert_eq!(config.scanner.history_failure_policy, HistoryFailurePolicy::Exclude);
        assert_eq!(config.feed.request_timeout_secs, 15);
        assert_eq!(config.github.owner, "pkalyankumar1010");
        assert_eq!(config.github.repo, "upper_circuit_finder");
        assert_eq!(config.github.labels.len(), 4);
        assert!(config.report.csv_dir.is_none());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let json = r#"{"scanner": {"history_failure_policy": "include"}, "github": {"repo": "alerts"}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.scanner.history_failure_policy, HistoryFailurePolicy::Include);
        assert_eq!(config.scanner.lookback_sessions, 14);
        assert_eq!(config.github.repo, "alerts");
        assert_eq!(config.github.owner, "pkalyankumar1010");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = GithubConfig {
            token: Some("ghp_secret".to_string()),
            ..GithubConfig::default()
        };
        let printed = format!("{:?}", config);
        assert!(!printed.contains("ghp_secret"));
        assert!(printed.contains("[REDACTED]"));
    }
}
