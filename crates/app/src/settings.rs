use circuit_core::config::{AppConfig, GithubConfig};
use config::{Config, ConfigError, Environment, File, Map};
use std::path::Path;

/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_VAR: &str = "CIRCUIT_CONFIG";
/// 工作目录下的默认配置文件，可缺省
pub const DEFAULT_CONFIG_FILE: &str = "circuit.toml";
/// 分层环境变量前缀，例如 `CIRCUIT__SCANNER__PACING_DELAY_MS`
const ENV_PREFIX: &str = "CIRCUIT";
const ENV_SEPARATOR: &str = "__";

/// # Summary
/// 加载应用配置。
///
/// # Logic
/// 1. 内置默认值。
/// 2. 叠加配置文件：`CIRCUIT_CONFIG` 指定的文件 (必须存在)，否则可缺省的 `circuit.toml`。
/// 3. 叠加 `CIRCUIT__SECTION__KEY` 形式的环境变量。
/// 4. 最后应用 GitHub 相关的常用环境变量。
///
/// # Returns
/// 配置文件或环境变量格式错误时返回 `ConfigError`。
pub fn load_settings() -> Result<AppConfig, ConfigError> {
    let explicit = std::env::var(CONFIG_PATH_VAR).ok();
    let mut settings = load_from(explicit.as_deref().map(Path::new), None)?;
    apply_github_env(&mut settings.github, |key| std::env::var(key).ok());
    Ok(settings)
}

/// # Summary
/// 从指定来源构建配置。
///
/// # Arguments
/// * `explicit` - 显式指定的配置文件；`None` 时尝试默认文件。
/// * `vars` - 替代进程环境的变量表，`None` 时读取进程环境。
pub fn load_from(
    explicit: Option<&Path>,
    vars: Option<Map<String, String>>,
) -> Result<AppConfig, ConfigError> {
    let file = match explicit {
        Some(path) => File::from(path).required(true),
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator(ENV_SEPARATOR)
                .separator(ENV_SEPARATOR)
                .try_parsing(true)
                .source(vars),
        )
        .build()?
        .try_deserialize()
}

/// # Summary
/// 应用 GitHub 常用环境变量。
///
/// # Logic
/// 1. 令牌取 `GITHUB_TOKEN`，缺失时取 `GITHUB_PAT`；空白值忽略。
/// 2. `GITHUB_USERNAME` 与 `GITHUB_REPO` 覆盖仓库坐标。
pub fn apply_github_env(github: &mut GithubConfig, lookup: impl Fn(&str) -> Option<String>) {
    let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(token) = non_blank("GITHUB_TOKEN").or_else(|| non_blank("GITHUB_PAT")) {
        github.token = Some(token);
    }
    if let Some(owner) = non_blank("GITHUB_USERNAME") {
        github.owner = owner;
    }
    if let Some(repo) = non_blank("GITHUB_REPO") {
        github.repo = repo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use circuit_core::config::HistoryFailurePolicy;
    use std::collections::HashMap;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> Option<Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults_without_sources() {
        let settings = load_from(None, vars(&[])).unwrap();
        assert_eq!(settings.scanner.lookback_sessions, 14);
        assert_eq!(settings.github.repo, "upper_circuit_finder");
        assert!(settings.report.csv_dir.is_none());
    }

    #[test]
    fn test_file_then_env_layering() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[scanner]\npacing_delay_ms = 250\nhistory_failure_policy = \"include\"\n\n[report]\ncsv_dir = \"out\"\n"
        )
        .unwrap();

        let settings = load_from(
            Some(file.path()),
            vars(&[("CIRCUIT__SCANNER__PACING_DELAY_MS", "500")]),
        )
        .unwrap();

        assert_eq!(settings.scanner.pacing_delay_ms, 500);
        assert_eq!(settings.scanner.history_failure_policy, HistoryFailurePolicy::Include);
        assert_eq!(settings.report.csv_dir.as_deref(), Some("out"));
        assert_eq!(settings.scanner.lookback_sessions, 14);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(load_from(Some(&missing), vars(&[])).is_err());
    }

    #[test]
    fn test_malformed_env_value_is_an_error() {
        let result = load_from(
            None,
            vars(&[("CIRCUIT__SCANNER__LOOKBACK_SESSIONS", "fourteen")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_github_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("GITHUB_PAT", "ghp_fallback"),
            ("GITHUB_USERNAME", "octo"),
            ("GITHUB_REPO", " "),
        ]
        .into_iter()
        .collect();

        let mut github = GithubConfig::default();
        apply_github_env(&mut github, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(github.token.as_deref(), Some("ghp_fallback"));
        assert_eq!(github.owner, "octo");
        assert_eq!(github.repo, "upper_circuit_finder");
    }

    #[test]
    fn test_github_token_takes_precedence() {
        let mut github = GithubConfig::default();
        apply_github_env(&mut github, |key| match key {
            "GITHUB_TOKEN" => Some("ghp_primary".to_string()),
            "GITHUB_PAT" => Some("ghp_fallback".to_string()),
            _ => None,
        });
        assert_eq!(github.token.as_deref(), Some("ghp_primary"));
    }
}
