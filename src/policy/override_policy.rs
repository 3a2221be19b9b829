//! Marker → fixed address override policy.

use std::net::Ipv4Addr;

use crate::domain::RelayInfoOption;

/// One `match_token → replacement_address` rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    pub match_token: String,
    pub replacement_address: Ipv4Addr,
}

impl OverrideRule {
    pub fn new(match_token: impl Into<String>, replacement_address: Ipv4Addr) -> Self {
        Self {
            match_token: match_token.into(),
            replacement_address,
        }
    }
}

/// Decides whether a lease's proposed address should be replaced.
///
/// Stateless: the same option always yields the same decision.
#[derive(Debug, Clone)]
pub struct OverridePolicy {
    rules: Vec<OverrideRule>,
}

impl OverridePolicy {
    pub fn new(rules: Vec<OverrideRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    /// Marker tokens in rule order, for building the parser.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|rule| rule.match_token.as_str())
    }

    /// Replacement address for `option`, if its marker matches a rule.
    ///
    /// First matching rule wins.
    pub fn evaluate(&self, option: &RelayInfoOption) -> Option<Ipv4Addr> {
        if !option.contains_marker {
            return None;
        }
        let marker = option.matched_marker.as_deref()?;

        self.rules
            .iter()
            .find(|rule| rule.match_token == marker)
            .map(|rule| rule.replacement_address)
    }
}
