//! Notifier and message bus configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which message bus carries directory events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierBackend {
    /// Events are dropped.
    None,
    /// In-process broadcast bus.
    Memory,
    /// Redis pub/sub.
    Redis,
}

/// Event publication settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// The bus backend.
    #[serde(default = "default_backend")]
    pub backend: NotifierBackend,
    /// Redis URL, required for the `redis` backend.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Topic (channel) events are published on.
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Buffer size of in-memory broadcast channels.
    #[serde(default = "default_channel_buffer")]
    pub channel_buffer_size: usize,
    /// Log every published event.
    #[serde(default)]
    pub log_events: bool,
    /// Publication retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Exponential backoff policy for event publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Whether failed publications are retried.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_interval")]
    pub initial_interval_ms: u64,
    /// Upper bound of a single delay, in milliseconds.
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    /// Growth factor applied after each failed attempt.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl RetryConfig {
    /// Delay before the first retry.
    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    /// Upper bound of a single delay.
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_interval_ms: default_initial_interval(),
            max_interval_ms: default_max_interval(),
            multiplier: default_multiplier(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: None,
            topic: default_topic(),
            channel_buffer_size: default_channel_buffer(),
            log_events: false,
            retry: RetryConfig::default(),
        }
    }
}

fn default_backend() -> NotifierBackend {
    NotifierBackend::Memory
}

fn default_topic() -> String {
    "directories".to_string()
}

fn default_channel_buffer() -> usize {
    256
}

fn default_true() -> bool {
    true
}

fn default_initial_interval() -> u64 {
    100
}

fn default_max_interval() -> u64 {
    10_000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    8
}
