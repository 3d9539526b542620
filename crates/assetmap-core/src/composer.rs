//! Query composition on top of the dialect registry.
//!
//! The composer owns the query text of one view. Every edit recomputes the
//! advisory suggestion list; choosing a suggestion, a hint tag or a location
//! filter extends the text with the active dialect's connector.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

use crate::dialect::{dialect_for, Platform, SyntaxHint};

/// Characters that end a token: whitespace and the boolean operator characters.
static TOKEN_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s&|()]").expect("token boundary regex must compile"));

/// The token currently being typed, lowercased.
///
/// This is the substring after the final whitespace or `& | ( )` character.
pub fn last_token(text: &str) -> String {
    TOKEN_BOUNDARY
        .split(text)
        .last()
        .unwrap_or_default()
        .to_lowercase()
}

/// Hints of the platform's dialect that match the text being typed.
///
/// Blank text yields every hint. Otherwise a hint matches when its label or
/// description contains the last token, ignoring case. Registry order is kept.
pub fn autocomplete(platform: Platform, text: &str) -> Vec<SyntaxHint> {
    let hints = dialect_for(platform).hints;
    if text.trim().is_empty() {
        return hints.to_vec();
    }

    let token = last_token(text);
    hints
        .iter()
        .filter(|hint| {
            hint.label.to_lowercase().contains(&token)
                || hint.description.to_lowercase().contains(&token)
        })
        .copied()
        .collect()
}

/// Extend `existing` with `fragment`, or replace it when it is blank.
pub fn compose_append(platform: Platform, existing: &str, fragment: &str) -> String {
    if existing.trim().is_empty() {
        return fragment.to_string();
    }
    dialect_for(platform).connector.join(existing, fragment)
}

/// Province/city selection for a location filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationFilter {
    pub province: Option<String>,
    pub city: Option<String>,
    /// Join onto the current query instead of replacing it.
    pub append: bool,
}

impl LocationFilter {
    pub fn new(province: Option<&str>, city: Option<&str>, append: bool) -> Self {
        Self {
            province: province.map(String::from),
            city: city.map(String::from),
            append,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Location clause for the platform, or `None` when neither part is set.
pub fn location_clause(platform: Platform, province: Option<&str>, city: Option<&str>) -> Option<String> {
    let dialect = dialect_for(platform);
    let province = province
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| dialect.location.province_clause(v));
    let city = city
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| dialect.location.city_clause(v));

    match (province, city) {
        (Some(p), Some(c)) => Some(dialect.connector.join(&p, &c)),
        (Some(p), None) => Some(p),
        (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

/// The query after applying a location filter, or `None` for a no-op.
pub fn apply_location(platform: Platform, query: &str, filter: &LocationFilter) -> Option<String> {
    let clause = location_clause(platform, non_blank(&filter.province), non_blank(&filter.city))?;
    if filter.append && !query.trim().is_empty() {
        Some(dialect_for(platform).connector.join(query, &clause))
    } else {
        Some(clause)
    }
}

/// Query text and suggestions for one composing view.
#[derive(Debug, Clone)]
pub struct QueryComposer {
    platform: Platform,
    text: String,
    suggestions: Vec<SyntaxHint>,
}

impl QueryComposer {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            text: String::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn suggestions(&self) -> &[SyntaxHint] {
        &self.suggestions
    }

    pub fn placeholder(&self) -> &'static str {
        dialect_for(self.platform).placeholder
    }

    /// Hint tags shown under the input, in registry order.
    pub fn hint_tags(&self) -> &'static [SyntaxHint] {
        dialect_for(self.platform).hints
    }

    /// Replace the text (a keystroke) and recompute suggestions.
    pub fn set_text(&mut self, text: impl Into<String>) -> &[SyntaxHint] {
        self.text = text.into();
        self.suggestions = autocomplete(self.platform, &self.text);
        &self.suggestions
    }

    /// Apply a chosen suggestion or hint tag.
    pub fn select(&mut self, fragment: &str) {
        self.text = compose_append(self.platform, &self.text, fragment);
    }

    /// Apply a location filter. Returns false when there was nothing to apply.
    pub fn apply_location(&mut self, filter: &LocationFilter) -> bool {
        match apply_location(self.platform, &self.text, filter) {
            Some(query) => {
                self.text = query;
                true
            }
            None => false,
        }
    }

    /// Switch dialect, dropping text and suggestions valid only in the old one.
    pub fn switch_platform(&mut self, platform: Platform) {
        debug!("Composer switching platform {} -> {}", self.platform, platform);
        self.platform = platform;
        self.text.clear();
        self.suggestions.clear();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.suggestions.clear();
    }
}
