//! Typed front for the backend's query validation and translation.
//!
//! The translation algorithm itself lives in the backend. This module trims
//! input, rejects blank queries before anything is sent, and maps the
//! backend's untyped answers onto [`Platform`] and [`AssetMapError`].

use tracing::{debug, warn};

use crate::backend::{ConversionResult, SharedBackend};
use crate::dialect::Platform;
use crate::error::{AssetMapError, Result};

/// Where a conversion goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionTarget {
    Single(Platform),
    /// Every platform except the source.
    All,
}

/// A translated query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub platform: Platform,
    pub query: String,
}

/// Validation and translation calls.
#[derive(Clone)]
pub struct TranslationFacade {
    backend: SharedBackend,
}

impl std::fmt::Debug for TranslationFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationFacade").finish_non_exhaustive()
    }
}

fn trimmed(query: &str) -> Result<&str> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AssetMapError::empty("query"));
    }
    Ok(query)
}

impl TranslationFacade {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    /// Platforms the translator supports, in the backend's order.
    ///
    /// Keys this core has no dialect for are skipped.
    pub async fn supported_platforms(&self) -> Result<Vec<Platform>> {
        let keys = self.backend.get_supported_platforms().await?;
        Ok(keys
            .iter()
            .filter_map(|key| match key.parse::<Platform>() {
                Ok(platform) => Some(platform),
                Err(_) => {
                    warn!("Skipping unsupported platform key from backend: {}", key);
                    None
                }
            })
            .collect())
    }

    /// Check a query against a platform's grammar.
    ///
    /// A grammar problem is `InvalidQuery` with the backend's message;
    /// transport problems keep their own error kinds.
    pub async fn validate(&self, query: &str, platform: Platform) -> Result<()> {
        let query = trimmed(query)?;
        let invalid = |message: String| AssetMapError::InvalidQuery {
            platform: platform.to_string(),
            message,
        };
        match self.backend.validate_query_syntax(query, platform).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(invalid("query syntax is invalid".to_string())),
            Err(AssetMapError::Backend { message, .. }) => Err(invalid(message)),
            Err(other) => Err(other),
        }
    }

    /// Translate a query from one dialect to one or all others.
    pub async fn convert(
        &self,
        query: &str,
        from: Platform,
        target: ConversionTarget,
    ) -> Result<Vec<Translation>> {
        let query = trimmed(query)?;
        match target {
            ConversionTarget::Single(to) => {
                debug!("Converting query {} -> {}", from, to);
                let converted = self.backend.convert_query(query, from, to).await?;
                Ok(vec![Translation {
                    platform: to,
                    query: converted,
                }])
            }
            ConversionTarget::All => {
                debug!("Converting query {} -> all", from);
                let results = self.backend.convert_query_to_all(query, from).await?;
                Ok(typed_results(results))
            }
        }
    }
}

fn typed_results(results: Vec<ConversionResult>) -> Vec<Translation> {
    results
        .into_iter()
        .filter_map(|result| match result.platform.parse::<Platform>() {
            Ok(platform) => Some(Translation {
                platform,
                query: result.query,
            }),
            Err(_) => {
                warn!("Dropping conversion for unknown platform {}", result.platform);
                None
            }
        })
        .collect()
}

const HUNTER_EXAMPLES: [&str; 3] = [
    "ip=\"8.8.8.8\"",
    "web.title=\"登录\" && country=\"CN\"",
    "web.body=\"powered by\" && ip.port=\"80\"",
];

const FOFA_EXAMPLES: [&str; 3] = [
    "ip=\"8.8.8.8\"",
    "title=\"登录\" && country=\"CN\"",
    "body=\"powered by\" && port=\"80\"",
];

const QUAKE_EXAMPLES: [&str; 3] = [
    "ip:\"8.8.8.8\"",
    "title:\"登录\" AND country:\"CN\"",
    "body:\"powered by\" AND port:\"80\"",
];

const DAYDAYMAP_EXAMPLES: [&str; 3] = [
    "ip=\"8.8.8.8\"",
    "title=\"登录\" && country=\"CN\"",
    "body=\"powered by\" && port=\"80\"",
];

/// Sample source queries offered for a platform.
pub fn examples_for(platform: Platform) -> &'static [&'static str; 3] {
    match platform {
        Platform::Hunter => &HUNTER_EXAMPLES,
        Platform::Fofa => &FOFA_EXAMPLES,
        Platform::Quake => &QUAKE_EXAMPLES,
        Platform::DayDayMap => &DAYDAYMAP_EXAMPLES,
    }
}
