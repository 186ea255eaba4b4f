//! Allowlist / Blocklist / DefaultAction evaluation.
//!
//! Precedence is fixed:
//! 1. Allowlist match → allowed, nothing else consulted
//! 2. Blocklist match → denied
//! 3. Default action
//!
//! The client's country is resolved at most once per evaluation and only
//! when a country rule actually has to be consulted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::engine::{CountryEngine, MaxMindEngine};
use crate::error::{Error, LookupError, Result, RuleError};
use crate::lookup::DatabaseChain;
use crate::resolver::OpenDatabase;
use crate::rule::{Rule, RuleList};

/// What to do when no rule matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAction {
    Allow,
    #[default]
    Block,
}

impl DefaultAction {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DefaultAction::Allow => "allow",
            DefaultAction::Block => "block",
        }
    }
}

impl fmt::Display for DefaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DefaultAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "allow" => Ok(DefaultAction::Allow),
            "block" => Ok(DefaultAction::Block),
            _ => Err(Error::Config(format!("invalid default action: {}", s))),
        }
    }
}

/// Outcome of evaluating one candidate address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    /// Whether the address may pass
    pub allowed: bool,
    /// Normalized country, if a lookup was needed to decide
    pub country: Option<String>,
}

/// Country of one address, resolved on first use.
struct LazyCountry<'a, E> {
    chain: &'a DatabaseChain<E>,
    ip: IpAddr,
    value: Option<String>,
}

impl<'a, E: CountryEngine> LazyCountry<'a, E> {
    fn new(chain: &'a DatabaseChain<E>, ip: IpAddr) -> Self {
        Self {
            chain,
            ip,
            value: None,
        }
    }

    fn get(&mut self) -> std::result::Result<&str, LookupError> {
        if self.value.is_none() {
            self.value = Some(self.chain.country(self.ip)?);
        }
        Ok(self.value.as_deref().unwrap_or_default())
    }
}

fn list_matches<E: CountryEngine>(
    list: &RuleList,
    ip: IpAddr,
    country: &mut LazyCountry<'_, E>,
) -> std::result::Result<bool, LookupError> {
    if list.contains_address(ip) {
        return Ok(true);
    }
    if list.has_countries() {
        return Ok(list.contains_country(country.get()?));
    }
    Ok(false)
}

/// Renders allow/deny verdicts for candidate addresses.
///
/// # Examples
/// ```ignore
/// use geoblock::{open_database, DefaultAction, Evaluator, Rule};
///
/// let mut evaluator = Evaluator::new(
///     &[Rule::country("fr")],
///     &[Rule::cidr("1.1.1.0/24")],
///     DefaultAction::Block,
/// )?;
/// evaluator.add_database(open_database("IP2LOCATION-LITE-DB1.mmdb")?);
///
/// let verdict = evaluator.evaluate("80.67.169.12")?;
/// assert!(verdict.allowed);
/// ```
#[derive(Debug)]
pub struct Evaluator<E = MaxMindEngine> {
    allowlist: RuleList,
    blocklist: RuleList,
    default_action: DefaultAction,
    chain: DatabaseChain<E>,
}

impl<E: CountryEngine> Evaluator<E> {
    /// Compile rule lists. Databases are added separately.
    pub fn new(
        allowlist: &[Rule],
        blocklist: &[Rule],
        default_action: DefaultAction,
    ) -> std::result::Result<Self, RuleError> {
        Ok(Self {
            allowlist: RuleList::compile(allowlist)?,
            blocklist: RuleList::compile(blocklist)?,
            default_action,
            chain: DatabaseChain::new(),
        })
    }

    /// Append an opened database to the lookup chain.
    pub fn add_database(&mut self, database: OpenDatabase<E>) {
        self.chain.add(database);
    }

    /// The lookup chain.
    pub fn chain(&self) -> &DatabaseChain<E> {
        &self.chain
    }

    /// The configured default action.
    pub fn default_action(&self) -> DefaultAction {
        self.default_action
    }

    /// Check if any rule can require a country lookup.
    pub fn needs_country(&self) -> bool {
        self.allowlist.has_countries() || self.blocklist.has_countries()
    }

    /// Evaluate a candidate address string.
    pub fn evaluate(&self, candidate: &str) -> Result<Evaluation> {
        let ip: IpAddr = candidate
            .trim()
            .parse()
            .map_err(|_| Error::InvalidIpAddress(candidate.to_string()))?;
        Ok(self.evaluate_ip(ip)?)
    }

    /// Evaluate a parsed address. IPv4-mapped IPv6 addresses are treated as IPv4.
    pub fn evaluate_ip(&self, ip: IpAddr) -> std::result::Result<Evaluation, LookupError> {
        let ip = ip.to_canonical();
        let mut country = LazyCountry::new(&self.chain, ip);

        let allowed = if list_matches(&self.allowlist, ip, &mut country)? {
            true
        } else if list_matches(&self.blocklist, ip, &mut country)? {
            false
        } else {
            self.default_action == DefaultAction::Allow
        };

        Ok(Evaluation {
            allowed,
            country: country.value,
        })
    }
}
