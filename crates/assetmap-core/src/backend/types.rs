//! Wire types exchanged with the backend command surface.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};

/// One asset returned by a platform search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    /// Platform-specific fields the core does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResultPage {
    /// Total matches reported by the platform, across all pages.
    pub total: u64,
    #[serde(default)]
    pub results: Vec<AssetRecord>,
}

impl SearchResultPage {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Parameters of a search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub platform: Platform,
    pub query: String,
    /// 1-based page index.
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    pub fn new(platform: Platform, query: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self {
            platform,
            query: query.into(),
            page,
            page_size,
        }
    }
}

/// Time window applied to an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "1d")]
    LastDay,
    #[serde(rename = "7d")]
    LastWeek,
    #[serde(rename = "30d")]
    LastMonth,
    #[serde(rename = "90d")]
    LastQuarter,
    #[serde(rename = "365d")]
    LastYear,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::All => "all",
            TimeRange::LastDay => "1d",
            TimeRange::LastWeek => "7d",
            TimeRange::LastMonth => "30d",
            TimeRange::LastQuarter => "90d",
            TimeRange::LastYear => "365d",
            TimeRange::Custom => "custom",
        }
    }
}

/// Parameters of a multi-page export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub query: String,
    pub pages: u32,
    pub page_size: u32,
    pub time_range: TimeRange,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl ExportRequest {
    pub fn new(query: impl Into<String>, pages: u32, page_size: u32) -> Self {
        Self {
            query: query.into(),
            pages,
            page_size,
            time_range: TimeRange::All,
            start_date: None,
            end_date: None,
        }
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }

    /// Set a custom window. Also switches the range to `custom`.
    pub fn with_custom_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.time_range = TimeRange::Custom;
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    /// Start and end dates as sent on the wire.
    ///
    /// Only a custom range with both ends set sends dates; anything else
    /// sends neither.
    pub fn wire_dates(&self) -> (Option<String>, Option<String>) {
        match (self.time_range, self.start_date, self.end_date) {
            (TimeRange::Custom, Some(start), Some(end)) => (
                Some(start.format(ExportConfig::DATE_FORMAT).to_string()),
                Some(end.format(ExportConfig::DATE_FORMAT).to_string()),
            ),
            _ => (None, None),
        }
    }

    /// Local guards shared by every export path.
    pub fn validate(&self) -> Result<()> {
        if self.query.trim().is_empty() {
            return Err(AssetMapError::empty("query"));
        }
        if self.pages == 0 {
            return Err(AssetMapError::ZeroPages);
        }
        if self.page_size == 0 {
            return Err(AssetMapError::Validation {
                field: "page_size".into(),
                message: "page size must be positive".into(),
            });
        }
        Ok(())
    }
}

/// A query translated into another platform's dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub platform: String,
    pub query: String,
}

/// Keys configured for a platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyList {
    #[serde(default)]
    pub api_keys: Vec<String>,
    /// Parallel to `api_keys`; only present for platforms that pair keys with an email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emails: Option<Vec<String>>,
}

/// One configured key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ApiKeyList {
    /// Pair each key with its email, if any.
    pub fn entries(&self) -> Vec<ApiKeyEntry> {
        self.api_keys
            .iter()
            .enumerate()
            .map(|(i, key)| ApiKeyEntry {
                key: key.clone(),
                email: self
                    .emails
                    .as_ref()
                    .and_then(|emails| emails.get(i))
                    .filter(|email| !email.is_empty())
                    .cloned(),
            })
            .collect()
    }
}

/// Result of checking a key against its platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyValidation {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota: Option<serde_json::Value>,
}
