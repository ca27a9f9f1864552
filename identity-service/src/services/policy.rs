//! Admin policy - the rule table mapping role codes to implied permissions.
//!
//! Role codes are plain catalog data; nothing about the string
//! `SYSTEM_ADMIN` is special anywhere else in the service. This table is the
//! single place that knowledge lives, and deployments can swap it without
//! touching resolution logic.

/// One rule: role codes matching `role_pattern` imply `implied_permission`.
/// A trailing `*` makes the pattern a prefix match.
#[derive(Debug, Clone)]
pub struct PolicyRule {
    pub role_pattern: String,
    pub implied_permission: String,
}

impl PolicyRule {
    pub fn new(role_pattern: impl Into<String>, implied_permission: impl Into<String>) -> Self {
        Self {
            role_pattern: role_pattern.into(),
            implied_permission: implied_permission.into(),
        }
    }

    fn matches(&self, role_code: &str) -> bool {
        match self.role_pattern.strip_suffix('*') {
            Some(prefix) => role_code.starts_with(prefix),
            None => role_code == self.role_pattern,
        }
    }
}

/// Ordered rule table; the first matching rule wins.
#[derive(Debug, Clone)]
pub struct AdminPolicy {
    rules: Vec<PolicyRule>,
}

impl AdminPolicy {
    pub fn new(rules: Vec<PolicyRule>) -> Self {
        Self { rules }
    }

    /// Built-in table: platform and tenant admins hold the wildcard
    /// permission, which satisfies every permission check.
    pub fn standard() -> Self {
        Self::new(vec![
            PolicyRule::new("SYSTEM_ADMIN", "*"),
            PolicyRule::new("SUPER_ADMIN", "*"),
        ])
    }

    /// Permission implied by this role code, if any rule matches.
    pub fn implied_permission(&self, role_code: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matches(role_code))
            .map(|rule| rule.implied_permission.as_str())
    }
}

impl Default for AdminPolicy {
    fn default() -> Self {
        Self::standard()
    }
}
