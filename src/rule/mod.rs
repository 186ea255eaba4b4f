//! Allow/block rule definitions and compiled rule lists.

mod cidr;
mod country;

pub use cidr::CidrSet;
pub use country::CountrySet;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

use crate::error::RuleError;

/// What a rule value is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// Resolved country code, case-insensitive
    Country,
    /// Raw client address range
    Cidr,
}

impl RuleKind {
    /// Get the canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Country => "country",
            RuleKind::Cidr => "cidr",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single allow or block rule, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub value: String,
}

impl Rule {
    /// Create a country rule.
    pub fn country(code: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Country,
            value: code.into(),
        }
    }

    /// Create a CIDR rule.
    pub fn cidr(network: impl Into<String>) -> Self {
        Self {
            kind: RuleKind::Cidr,
            value: network.into(),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// A compiled allowlist or blocklist.
///
/// Only membership matters: the list matches when any of its rules does.
#[derive(Debug, Clone, Default)]
pub struct RuleList {
    cidrs: CidrSet,
    countries: CountrySet,
}

impl RuleList {
    /// Compile rules, validating every value.
    pub fn compile(rules: &[Rule]) -> Result<Self, RuleError> {
        let mut list = Self::default();
        for rule in rules {
            match rule.kind {
                RuleKind::Cidr => list.cidrs.add_pattern(&rule.value)?,
                RuleKind::Country => list.countries.add_pattern(&rule.value)?,
            }
        }
        Ok(list)
    }

    /// Number of distinct rules.
    pub fn len(&self) -> usize {
        self.cidrs.len() + self.countries.len()
    }

    /// Check if the list has no rules.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if any rule needs the client's country.
    pub fn has_countries(&self) -> bool {
        !self.countries.is_empty()
    }

    /// Check the CIDR rules against a raw address.
    pub fn contains_address(&self, ip: IpAddr) -> bool {
        self.cidrs.contains(ip)
    }

    /// Check the country rules against a resolved code.
    pub fn contains_country(&self, country: &str) -> bool {
        self.countries.contains(country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile() {
        let list = RuleList::compile(&[
            Rule::country("FR"),
            Rule::cidr("1.1.1.0/24"),
            Rule::cidr("2606:4700::/32"),
        ])
        .unwrap();

        assert_eq!(list.len(), 3);
        assert!(list.has_countries());
        assert!(list.contains_country("fr"));
        assert!(list.contains_address("1.1.1.1".parse().unwrap()));
        assert!(list.contains_address("2606:4700:4700::1111".parse().unwrap()));
        assert!(!list.contains_address("8.8.8.8".parse().unwrap()));
    }

    #[test]
    fn test_cidr_only_list_needs_no_country() {
        let list = RuleList::compile(&[Rule::cidr("10.0.0.0/8")]).unwrap();
        assert!(!list.has_countries());
    }

    #[test]
    fn test_compile_rejects_bad_values() {
        assert_eq!(
            RuleList::compile(&[Rule::cidr("10.0.0.0")]).unwrap_err(),
            RuleError::InvalidCidr("10.0.0.0".to_string())
        );
        assert!(matches!(
            RuleList::compile(&[Rule::country("france")]),
            Err(RuleError::InvalidCountryCode(_))
        ));
    }

    #[test]
    fn test_rule_serde() {
        let rule: Rule = serde_yaml::from_str("type: cidr\nvalue: 127.0.0.0/8\n").unwrap();
        assert_eq!(rule, Rule::cidr("127.0.0.0/8"));
        assert_eq!(rule.to_string(), "cidr:127.0.0.0/8");

        let rule: Rule = serde_json::from_str(r#"{"type":"country","value":"fr"}"#).unwrap();
        assert_eq!(rule.kind, RuleKind::Country);
    }
}
