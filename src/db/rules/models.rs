//! Access rule models and data structures.

use std::fmt;

/// The three independently cached rule categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    /// IP patterns that are denied.
    BannedIp,
    /// IP patterns exempt from every check.
    WhitelistIp,
    /// Path patterns that ban whoever requests them.
    AutoBanPath,
}

impl RuleKind {
    pub const ALL: [RuleKind; 3] = [RuleKind::WhitelistIp, RuleKind::BannedIp, RuleKind::AutoBanPath];

    /// The database table holding this category.
    pub fn table_name(&self) -> &'static str {
        match self {
            RuleKind::BannedIp => "banned_ips",
            RuleKind::WhitelistIp => "whitelist_ips",
            RuleKind::AutoBanPath => "autoban_paths",
        }
    }

    /// Short label used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::BannedIp => "ban",
            RuleKind::WhitelistIp => "whitelist",
            RuleKind::AutoBanPath => "autoban_path",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A banned IP pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanRecord {
    pub id: i64,
    /// IP pattern (exact or trailing-`*` prefix).
    pub pattern: String,
    pub notes: String,
    /// URL whose access created this ban; empty for admin-created bans.
    pub triggering_url: String,
    /// Advisory country code. Never used for enforcement.
    pub country_code: Option<String>,
    /// Unix timestamp when the ban was created.
    pub created_at: i64,
    /// Creating user id; 0 for bans created by the engine itself.
    pub created_by: i64,
}

/// Fields for inserting a ban row.
#[derive(Debug, Clone, Default)]
pub struct NewBan<'a> {
    pub pattern: &'a str,
    pub notes: &'a str,
    pub triggering_url: &'a str,
    pub country_code: Option<&'a str>,
    pub created_by: i64,
}

/// A whitelisted IP pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhitelistEntry {
    pub id: i64,
    pub pattern: String,
    pub notes: String,
    pub created_at: i64,
    pub created_by: i64,
}

/// A path pattern that triggers an automatic ban.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoBanPathRule {
    pub id: i64,
    pub pattern: String,
    pub notes: String,
    pub created_at: i64,
    pub created_by: i64,
}
