use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Durable code → long URL record.
///
/// `created_at` never changes; `updated_at` is refreshed on every successful
/// resolution and drives the inactivity expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    pub code: String,
    pub long_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UrlMapping {
    pub fn new(code: impl Into<String>, long_url: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            long_url: long_url.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 最后一次访问后 `retention` 时长即过期
    pub fn expires_at(&self, retention: Duration) -> DateTime<Utc> {
        self.updated_at + retention
    }

    pub fn is_live(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        self.updated_at >= now - retention
    }

    /// 刷新 updated_at，不允许倒退到 created_at 之前
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }
}
