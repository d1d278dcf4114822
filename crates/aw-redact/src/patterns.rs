//! Built-in detection rules.
//!
//! Each rule is a named regex with a category and a replacement. Replacements
//! may keep capture groups (`${1}`) so that context such as `Bearer ` or
//! `/Users/` survives and only the sensitive part becomes a placeholder.
//!
//! Placeholders are bracketed upper-case tokens. Every value class below
//! excludes `[`, so no built-in rule ever matches a placeholder and
//! re-sanitizing sanitized text is a no-op.

use crate::Category;
use once_cell::sync::Lazy;
use regex::Regex;

/// Placeholder for secrets.
pub const PLACEHOLDER_SECRET: &str = "[REDACTED_SECRET]";
/// Placeholder for PEM private key material.
pub const PLACEHOLDER_PRIVATE_KEY: &str = "[REDACTED_PRIVATE_KEY]";
/// Placeholder for email addresses.
pub const PLACEHOLDER_EMAIL: &str = "[REDACTED_EMAIL]";
/// Placeholder for phone numbers.
pub const PLACEHOLDER_PHONE: &str = "[REDACTED_PHONE]";
/// Placeholder for IPv4 addresses.
pub const PLACEHOLDER_IP: &str = "[REDACTED_IP]";
/// Placeholder for card-number-shaped digit runs.
pub const PLACEHOLDER_CARD: &str = "[REDACTED_CARD]";
/// Placeholder for user names inside home directory paths.
pub const PLACEHOLDER_USER: &str = "[REDACTED_USER]";
/// Placeholder for user-supplied pattern matches.
pub const PLACEHOLDER_CUSTOM: &str = "[REDACTED_CUSTOM]";
/// Placeholder for speculative high-entropy matches.
pub const PLACEHOLDER_HIGH_ENTROPY: &str = "[REDACTED_HIGH_ENTROPY]";

/// A named detection rule.
pub struct PatternRule {
    /// Stable rule name.
    pub name: &'static str,
    /// Category the match is counted under.
    pub category: Category,
    /// Replacement template (regex expansion syntax).
    pub replacement: &'static str,
    pattern: Lazy<Regex>,
}

impl PatternRule {
    /// The compiled regex.
    pub fn regex(&self) -> &Regex {
        &self.pattern
    }
}

impl std::fmt::Debug for PatternRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternRule")
            .field("name", &self.name)
            .field("category", &self.category)
            .finish()
    }
}

// Order matters: whole PEM blocks before bare headers, provider-specific
// tokens before the generic assignment rule.
static SECRET_RULES: [PatternRule; 12] = [
    PatternRule {
        name: "private_key_block",
        category: Category::Secrets,
        replacement: PLACEHOLDER_PRIVATE_KEY,
        pattern: Lazy::new(|| {
            Regex::new(r"-----BEGIN[A-Z ]*PRIVATE KEY-----[\s\S]*?-----END[A-Z ]*PRIVATE KEY-----")
                .unwrap()
        }),
    },
    PatternRule {
        name: "private_key_header",
        category: Category::Secrets,
        replacement: PLACEHOLDER_PRIVATE_KEY,
        pattern: Lazy::new(|| Regex::new(r"-----BEGIN[A-Z ]*PRIVATE KEY-----").unwrap()),
    },
    PatternRule {
        name: "ai_api_key",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        // OpenAI: sk-..., sk-proj-...; Anthropic: sk-ant-...
        pattern: Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_-]{16,}").unwrap()),
    },
    PatternRule {
        name: "aws_access_key",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        pattern: Lazy::new(|| Regex::new(r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b").unwrap()),
    },
    PatternRule {
        name: "github_token",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        pattern: Lazy::new(|| {
            Regex::new(r"\b(?:gh[pousr]_[A-Za-z0-9_]{36,}|github_pat_[A-Za-z0-9_]{22,})").unwrap()
        }),
    },
    PatternRule {
        name: "gitlab_token",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        pattern: Lazy::new(|| Regex::new(r"\bglpat-[A-Za-z0-9_-]{20,}").unwrap()),
    },
    PatternRule {
        name: "slack_token",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        pattern: Lazy::new(|| Regex::new(r"\bxox[baprs]-[A-Za-z0-9-]{10,}").unwrap()),
    },
    PatternRule {
        name: "jwt",
        category: Category::Secrets,
        replacement: PLACEHOLDER_SECRET,
        pattern: Lazy::new(|| {
            Regex::new(r"\beyJ[A-Za-z0-9_-]+\.eyJ[A-Za-z0-9_-]+(?:\.[A-Za-z0-9_-]+)?").unwrap()
        }),
    },
    PatternRule {
        name: "bearer_token",
        category: Category::Secrets,
        replacement: "${1} [REDACTED_SECRET]",
        pattern: Lazy::new(|| Regex::new(r"(?i)\b(bearer)\s+[A-Za-z0-9._~+/=-]{8,}").unwrap()),
    },
    PatternRule {
        name: "connection_string_credentials",
        category: Category::Secrets,
        replacement: "${1}[REDACTED_SECRET]@",
        pattern: Lazy::new(|| {
            Regex::new(
                r"(?i)\b((?:postgres(?:ql)?|mysql|mongodb(?:\+srv)?|redis|amqps?)://)[^:/@\s\[]+:[^@\s]+@",
            )
            .unwrap()
        }),
    },
    PatternRule {
        name: "secret_flag",
        category: Category::Secrets,
        replacement: "${1}${2}[REDACTED_SECRET]",
        pattern: Lazy::new(|| {
            Regex::new(r#"(--(?:password|passwd|token|api[-_]?key|secret))(=|\s+)([^\s\[\]"']+)"#)
                .unwrap()
        }),
    },
    PatternRule {
        name: "secret_assignment",
        category: Category::Secrets,
        replacement: "${1}${2}${3}[REDACTED_SECRET]",
        pattern: Lazy::new(|| {
            Regex::new(
                r#"(?i)\b(api[_-]?key|apikey|secret[_-]?key|client[_-]?secret|secret|access[_-]?token|auth[_-]?token|token|password|passwd)\b(["']?\s*[:=]\s*)(["']?)([^\s"'\[\],;]{6,})"#,
            )
            .unwrap()
        }),
    },
];

static PII_RULES: [PatternRule; 4] = [
    PatternRule {
        name: "email",
        category: Category::Pii,
        replacement: PLACEHOLDER_EMAIL,
        pattern: Lazy::new(|| {
            Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
        }),
    },
    PatternRule {
        name: "card_number",
        category: Category::Pii,
        replacement: PLACEHOLDER_CARD,
        pattern: Lazy::new(|| Regex::new(r"\b(?:\d{4}[- ]){3}\d{4}\b").unwrap()),
    },
    PatternRule {
        name: "phone_number",
        category: Category::Pii,
        replacement: PLACEHOLDER_PHONE,
        pattern: Lazy::new(|| {
            Regex::new(r"(?:\+\d{1,3}[-. ]?)?\(?\b\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b").unwrap()
        }),
    },
    PatternRule {
        name: "ipv4_address",
        category: Category::Pii,
        replacement: PLACEHOLDER_IP,
        pattern: Lazy::new(|| {
            Regex::new(
                r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
            )
            .unwrap()
        }),
    },
];

static PATH_RULES: [PatternRule; 3] = [
    PatternRule {
        name: "macos_home",
        category: Category::Paths,
        replacement: "${1}[REDACTED_USER]",
        pattern: Lazy::new(|| Regex::new(r#"(/Users/)[^/\s\[\]"']+"#).unwrap()),
    },
    PatternRule {
        name: "linux_home",
        category: Category::Paths,
        replacement: "${1}[REDACTED_USER]",
        pattern: Lazy::new(|| Regex::new(r#"(/home/)[^/\s\[\]"']+"#).unwrap()),
    },
    PatternRule {
        name: "windows_home",
        category: Category::Paths,
        replacement: "${1}[REDACTED_USER]",
        pattern: Lazy::new(|| Regex::new(r#"(?i)\b([A-Z]:\\Users\\)[^\\\s\[\]"']+"#).unwrap()),
    },
];

/// Built-in rules for a category, in application order.
///
/// `Custom` and `HighEntropy` have no built-in rules.
pub fn builtin_rules(category: Category) -> &'static [PatternRule] {
    match category {
        Category::Secrets => &SECRET_RULES,
        Category::Pii => &PII_RULES,
        Category::Paths => &PATH_RULES,
        Category::Custom | Category::HighEntropy => &[],
    }
}

/// Look up a built-in rule by name.
pub fn find_rule(name: &str) -> Option<&'static PatternRule> {
    SECRET_RULES
        .iter()
        .chain(&PII_RULES)
        .chain(&PATH_RULES)
        .find(|rule| rule.name == name)
}
