//! 内存版端口实现，供下游 crate 的测试注入。

use crate::common::Stock;
use crate::market::entity::{CandidateHit, Candle, StockProfile};
use crate::market::error::MarketError;
use crate::market::port::{BandHitSource, MarketDataProvider, ProfileProvider};
use crate::notify::error::NotifyError;
use crate::notify::port::{Delivery, Notifier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// 返回固定候选列表（或固定错误）的数据源。
pub struct StaticBandHitSource {
    hits: Result<Vec<CandidateHit>, String>,
}

impl StaticBandHitSource {
    pub fn new(hits: Vec<CandidateHit>) -> Self {
        Self { hits: Ok(hits) }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            hits: Err(reason.into()),
        }
    }
}

#[async_trait]
impl BandHitSource for StaticBandHitSource {
    async fn fetch_band_hits(&self) -> Result<Vec<CandidateHit>, MarketError> {
        self.hits.clone().map_err(MarketError::Network)
    }
}

/// 按代码预设 K 线的历史数据源；未预设的代码返回空列表。
#[derive(Default)]
pub struct ScriptedCandleProvider {
    series: HashMap<String, Result<Vec<Candle>, String>>,
    requests: Mutex<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
}

impl ScriptedCandleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), Ok(candles));
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.series.insert(symbol.to_string(), Err(reason.to_string()));
        self
    }

    /// 已收到的请求 (代码, 开始, 结束)
    pub fn requests(&self) -> Vec<(String, DateTime<Utc>, DateTime<Utc>)> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedCandleProvider {
    async fn fetch_daily_candles(
        &self,
        stock: &Stock,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, MarketError> {
        self.requests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((stock.symbol.clone(), start, end));

        match self.series.get(&stock.symbol) {
            Some(Ok(candles)) => Ok(candles.clone()),
            Some(Err(reason)) => Err(MarketError::Network(reason.clone())),
            None => Ok(Vec::new()),
        }
    }
}

/// 按代码预设描述信息；未预设的代码返回 `Ok(None)`。
#[derive(Default)]
pub struct ScriptedProfileProvider {
    profiles: HashMap<String, Result<StockProfile, String>>,
}

impl ScriptedProfileProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, symbol: &str, profile: StockProfile) -> Self {
        self.profiles.insert(symbol.to_string(), Ok(profile));
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.profiles
            .insert(symbol.to_string(), Err(reason.to_string()));
        self
    }
}

#[async_trait]
impl ProfileProvider for ScriptedProfileProvider {
    async fn fetch_profile(&self, stock: &Stock) -> Result<Option<StockProfile>, MarketError> {
        match self.profiles.get(&stock.symbol) {
            Some(Ok(profile)) => Ok(Some(profile.clone())),
            Some(Err(reason)) => Err(MarketError::Network(reason.clone())),
            None => Ok(None),
        }
    }
}

/// 记录所有通知的 Notifier。
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已发送的 (主题, 内容)
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, subject: &str, content: &str) -> Result<Delivery, NotifyError> {
        let mut sent = self
            .sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sent.push((subject.to_string(), content.to_string()));
        Ok(Delivery {
            id: sent.len().to_string(),
            url: None,
        })
    }
}

/// 总是失败的 Notifier。
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _subject: &str, _content: &str) -> Result<Delivery, NotifyError> {
        Err(NotifyError::Platform("simulated outage".to_string()))
    }
}
