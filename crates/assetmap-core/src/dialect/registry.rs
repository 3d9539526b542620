//! Static dialect table.

use super::Platform;

/// One field example offered to the operator while composing a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxHint {
    /// Ready-to-insert query fragment, e.g. `domain="test.com"`.
    pub label: &'static str,
    pub description: &'static str,
}

/// The logical-AND token of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    /// `&&`
    Symbolic,
    /// `AND`
    Keyword,
}

impl Connector {
    pub fn token(&self) -> &'static str {
        match self {
            Connector::Symbolic => "&&",
            Connector::Keyword => "AND",
        }
    }

    /// Join two non-empty clauses with single spaces around the token.
    pub fn join(&self, left: &str, right: &str) -> String {
        format!("{} {} {}", left, self.token(), right)
    }
}

/// How a field and its quoted value are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldStyle {
    /// `field="value"`
    Equals,
    /// `field: "value"`
    ColonSpaced,
    /// `field:"value"`
    Colon,
}

impl FieldStyle {
    pub fn render(&self, field: &str, value: &str) -> String {
        match self {
            FieldStyle::Equals => format!("{}=\"{}\"", field, value),
            FieldStyle::ColonSpaced => format!("{}: \"{}\"", field, value),
            FieldStyle::Colon => format!("{}:\"{}\"", field, value),
        }
    }
}

/// Field names used for location filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationFields {
    pub province: &'static str,
    pub city: &'static str,
    pub style: FieldStyle,
}

impl LocationFields {
    pub fn province_clause(&self, value: &str) -> String {
        self.style.render(self.province, value)
    }

    pub fn city_clause(&self, value: &str) -> String {
        self.style.render(self.city, value)
    }
}

/// Grammar facts for one platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformDialect {
    pub platform: Platform,
    pub display_name: &'static str,
    pub hints: &'static [SyntaxHint],
    pub connector: Connector,
    pub placeholder: &'static str,
    pub location: LocationFields,
}

const fn hint(label: &'static str, description: &'static str) -> SyntaxHint {
    SyntaxHint { label, description }
}

const HUNTER_HINTS: &[SyntaxHint] = &[
    hint("domain.suffix=\"test.com\"", "Domain suffix"),
    hint("ip=\"1.1.1.1\"", "IP address"),
    hint("web.title=\"登录\"", "Page title"),
    hint("header=\"thinkphp\"", "HTTP header"),
    hint("app.name=\"ThinkPHP\"", "Application framework"),
    hint("port=\"3306\"", "Port"),
    hint("status_code=\"200\"", "HTTP status code"),
    hint("protocol=\"https\"", "Protocol"),
    hint("ip.province=\"北京市\"", "Province"),
    hint("ip.city=\"北京市\"", "City"),
    hint("ip.country=\"中国\"", "Country"),
    hint("web.body=\"login\"", "Page body"),
    hint("cert=\"baidu\"", "Certificate"),
    hint("banner=\"nginx\"", "Banner"),
];

const FOFA_HINTS: &[SyntaxHint] = &[
    hint("domain=\"test.com\"", "Domain"),
    hint("ip=\"1.1.1.1\"", "IP address"),
    hint("title=\"登录\"", "Page title"),
    hint("header=\"nginx\"", "HTTP header"),
    hint("server==\"Microsoft-IIS/10\"", "Server"),
    hint("port=\"6379\"", "Port"),
    hint("protocol=\"https\"", "Protocol"),
    hint("country=\"CN\"", "Country"),
    hint("region=\"Beijing\"", "Region"),
    hint("city=\"Beijing\"", "City"),
    hint("body=\"login\"", "Page body"),
    hint("cert=\"baidu\"", "Certificate"),
    hint("banner=\"nginx\"", "Banner"),
];

const QUAKE_HINTS: &[SyntaxHint] = &[
    hint("domain: test.com", "Domain"),
    hint("ip: \"1.1.1.1\"", "IP address"),
    hint("title: \"登录\"", "Page title"),
    hint("response: \"nginx\"", "Response content"),
    hint("service: \"IIS\"", "Service"),
    hint("port: 3389", "Port"),
    hint("protocol: \"https\"", "Protocol"),
    hint("country: \"China\"", "Country"),
    hint("province: \"Beijing\"", "Province"),
    hint("city: \"Beijing\"", "City"),
    hint("cert: \"baidu\"", "Certificate"),
    hint("banner: \"nginx\"", "Banner"),
];

const DAYDAYMAP_HINTS: &[SyntaxHint] = &[
    hint("domain:\"test.com\"", "Domain"),
    hint("ip:\"1.1.1.1\"", "IP address"),
    hint("ip:\"1.1.1.0/24\"", "IP range (CIDR)"),
    hint("title:\"登录\"", "Page title"),
    hint("server:\"nginx\"", "Server"),
    hint("app:\"WordPress\"", "Application"),
    hint("port:\"80\"", "Port"),
    hint("protocol:\"https\"", "Protocol"),
    hint("country:\"中国\"", "Country"),
    hint("province:\"北京\"", "Province"),
    hint("city:\"北京\"", "City"),
    hint("body:\"login\"", "Page body"),
    hint("cert:\"baidu\"", "Certificate"),
    hint("banner:\"nginx\"", "Banner"),
];

/// Indexed by `Platform as usize`; order must match [`Platform::ALL`].
static DIALECTS: [PlatformDialect; 4] = [
    PlatformDialect {
        platform: Platform::Hunter,
        display_name: "Hunter",
        hints: HUNTER_HINTS,
        connector: Connector::Symbolic,
        placeholder: "e.g. domain.suffix=\"test.com\" && ip.province=\"北京市\"",
        location: LocationFields {
            province: "ip.province",
            city: "ip.city",
            style: FieldStyle::Equals,
        },
    },
    PlatformDialect {
        platform: Platform::Fofa,
        display_name: "FOFA",
        hints: FOFA_HINTS,
        connector: Connector::Symbolic,
        placeholder: "e.g. domain=\"test.com\" && country=\"CN\"",
        location: LocationFields {
            province: "region",
            city: "city",
            style: FieldStyle::Equals,
        },
    },
    PlatformDialect {
        platform: Platform::Quake,
        display_name: "Quake",
        hints: QUAKE_HINTS,
        connector: Connector::Keyword,
        placeholder: "e.g. domain: test.com AND country: \"China\"",
        location: LocationFields {
            province: "province",
            city: "city",
            style: FieldStyle::ColonSpaced,
        },
    },
    PlatformDialect {
        platform: Platform::DayDayMap,
        display_name: "DayDayMap",
        hints: DAYDAYMAP_HINTS,
        connector: Connector::Keyword,
        placeholder: "e.g. ip:\"1.1.1.0/24\" or domain:\"test.com\" (colon and quotes)",
        location: LocationFields {
            province: "province",
            city: "city",
            style: FieldStyle::Colon,
        },
    },
];

/// Grammar facts for a platform.
pub fn dialect_for(platform: Platform) -> &'static PlatformDialect {
    &DIALECTS[platform as usize]
}

/// The logical-AND connector of a platform.
pub fn connector_for(platform: Platform) -> Connector {
    dialect_for(platform).connector
}

/// Example text shown in an empty query input.
pub fn placeholder_for(platform: Platform) -> &'static str {
    dialect_for(platform).placeholder
}

/// All dialects in registry order.
pub fn dialects() -> &'static [PlatformDialect] {
    &DIALECTS
}
