pub mod time;

use serde::{Deserialize, Serialize};

/// 交易所代码：印度国家证券交易所。
pub const EXCHANGE_NSE: &str = "NSE";

/// # Summary
/// 证券标的实体，代表一次扫描中关注的特定股票。
///
/// # Invariants
/// - `symbol` 为交易所原生代码（不带数据源后缀，例如 `RELIANCE` 而不是 `RELIANCE.NS`）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Stock {
    // 股票代码 (例如: RELIANCE, TATAMOTORS)
    pub symbol: String,
    // 交易所代码 (可选，例如: NSE)
    pub exchange: Option<String>,
}

impl Stock {
    /// 构造一个 NSE 上市证券的身份。
    pub fn nse(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: Some(EXCHANGE_NSE.to_string()),
        }
    }
}

impl std::fmt::Display for Stock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.exchange {
            Some(exchange) => write!(f, "{}:{}", exchange, self.symbol),
            None => write!(f, "{}", self.symbol),
        }
    }
}
