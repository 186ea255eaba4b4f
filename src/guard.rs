//! Request-level admission decisions.
//!
//! [`Guard`] is what an HTTP middleware wraps: it collects candidate client
//! addresses from forwarding headers, evaluates each one and maps the result
//! to a [`Verdict`]. It has no dependency on any HTTP library.

use std::path::Path;

use crate::assets::{self, AssetBundle};
use crate::config::Config;
use crate::engine::{CountryEngine, MaxMindEngine};
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::resolver::open_with_assets;

/// Path prefix of ACME HTTP-01 challenges.
pub const ACME_CHALLENGE_PREFIX: &str = "/.well-known/acme-challenge/";

/// Decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Pass the request on
    Allow,
    /// Reject with this status
    Deny {
        status: u16,
        /// Address that caused the rejection
        ip: String,
        /// Country of that address, if it was resolved
        country: Option<String>,
    },
}

impl Verdict {
    /// Check if the request may pass.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }
}

/// Collect candidate client addresses from `X-Forwarded-For` and
/// `X-Real-IP` header values.
///
/// Values are split on commas and trimmed; empty entries are dropped and
/// duplicates keep their first position.
pub fn candidate_ips(forwarded_for: Option<&str>, real_ip: Option<&str>) -> Vec<String> {
    let mut ips: Vec<String> = Vec::new();

    for header in [forwarded_for, real_ip].into_iter().flatten() {
        for ip in header.split(',') {
            let ip = ip.trim();
            if ip.is_empty() || ips.iter().any(|seen| seen == ip) {
                continue;
            }
            ips.push(ip.to_string());
        }
    }

    ips
}

/// Admission control front end built from a [`Config`].
#[derive(Debug)]
pub struct Guard<E = MaxMindEngine> {
    name: String,
    config: Config,
    evaluator: Option<Evaluator<E>>,
}

impl<E: CountryEngine> Guard<E> {
    /// Validate the configuration and open every configured database.
    ///
    /// Fails if any database cannot be opened; there is no partial start.
    pub fn new(name: impl Into<String>, config: Config) -> Result<Self> {
        let name = name.into();
        config.validate()?;

        if !config.enabled {
            log::info!("{}: disabled", name);
            return Ok(Self {
                name,
                config,
                evaluator: None,
            });
        }

        let local;
        let bundle: &AssetBundle = match &config.assets {
            Some(path) => {
                local = AssetBundle::load(path)?;
                &local
            }
            None => assets::embedded(),
        };

        let mut evaluator =
            Evaluator::new(&config.allowlist, &config.blocklist, config.default_action)?;
        for path in &config.databases {
            evaluator.add_database(open_with_assets(path, bundle)?);
        }

        log::info!(
            "{}: enabled with {} database(s), default action {}",
            name,
            evaluator.chain().len(),
            config.default_action
        );

        Ok(Self {
            name,
            config,
            evaluator: Some(evaluator),
        })
    }

    /// The active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The evaluator, absent when disabled.
    pub fn evaluator(&self) -> Option<&Evaluator<E>> {
        self.evaluator.as_ref()
    }

    /// Decide on a request from its path and forwarding headers.
    pub fn check(&self, path: &str, forwarded_for: Option<&str>, real_ip: Option<&str>) -> Verdict {
        let evaluator = match &self.evaluator {
            Some(evaluator) => evaluator,
            None => return Verdict::Allow,
        };

        if self.config.allow_lets_encrypt && path.starts_with(ACME_CHALLENGE_PREFIX) {
            return Verdict::Allow;
        }

        for ip in candidate_ips(forwarded_for, real_ip) {
            match evaluator.evaluate(&ip) {
                Ok(result) if result.allowed => continue,
                Ok(result) => {
                    log::info!(
                        "{}: [{}] blocked request from {} ({})",
                        self.name,
                        path,
                        ip,
                        result.country.as_deref().unwrap_or("?").to_uppercase()
                    );
                    return self.deny(ip, result.country);
                }
                Err(e) => {
                    log::warn!("{}: [{}] rejected {}: {}", self.name, path, ip, e);
                    return self.deny(ip, None);
                }
            }
        }

        Verdict::Allow
    }

    fn deny(&self, ip: String, country: Option<String>) -> Verdict {
        Verdict::Deny {
            status: self.config.disallowed_status_code,
            ip,
            country,
        }
    }
}

/// Open a guard over MaxMind databases from a YAML configuration file.
pub fn load_guard(name: &str, config_path: impl AsRef<Path>) -> Result<Guard> {
    Guard::new(name, Config::load(config_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::TableEngine;
    use crate::evaluator::DefaultAction;
    use crate::rule::Rule;
    use std::fs;

    fn guard(dir: &Path) -> Guard<TableEngine> {
        let v4 = dir.join("v4.db");
        let v6 = dir.join("v6.db");
        fs::write(&v4, "family 4\n1.1.1.0/24 US\n80.67.169.0/24 FR\n").unwrap();
        fs::write(&v6, "family 6\n2606:4700::/32 US\n2001:910::/32 FR\n").unwrap();

        let mut config = Config {
            enabled: true,
            databases: vec![v4, v6],
            ..Config::default()
        };
        config.allowlist.push(Rule::country("fr"));
        Guard::new("geoblock", config).unwrap()
    }

    #[test]
    fn test_candidate_ips() {
        assert_eq!(
            candidate_ips(Some("1.1.1.1, 2.2.2.2,,1.1.1.1"), Some(" 3.3.3.3 ,2.2.2.2")),
            vec!["1.1.1.1", "2.2.2.2", "3.3.3.3"]
        );
        assert!(candidate_ips(None, None).is_empty());
        assert!(candidate_ips(Some(""), Some(" , ")).is_empty());
    }

    #[test]
    fn test_request_scenarios() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        let cases = [
            (Some("127.0.0.1"), None, false),
            (None, Some("127.0.0.1"), false),
            (Some("1.1.1.1"), None, false),              // default action
            (Some("2606:4700:4700::1111"), None, false), // default action
            (Some("80.67.169.12"), None, true),
            (Some("2001:910:800::12"), None, true),
        ];

        for (forwarded_for, real_ip, allowed) in cases {
            let verdict = guard.check("/", forwarded_for, real_ip);
            assert_eq!(verdict.is_allowed(), allowed, "{:?} {:?}", forwarded_for, real_ip);
        }
    }

    #[test]
    fn test_mapped_forwarded_address() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        assert!(guard.check("/", Some("80.67.169.12"), None).is_allowed());
        assert!(guard.check("/", Some("::ffff:80.67.169.12"), None).is_allowed());
        assert!(!guard.check("/", Some("::ffff:1.1.1.1"), None).is_allowed());
    }

    #[test]
    fn test_any_denied_candidate_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        let verdict = guard.check("/", Some("80.67.169.12, 1.1.1.1"), None);
        assert_eq!(
            verdict,
            Verdict::Deny {
                status: 403,
                ip: "1.1.1.1".to_string(),
                country: Some("us".to_string()),
            }
        );
    }

    #[test]
    fn test_unparsable_candidate_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());

        let verdict = guard.check("/", Some("unknown"), None);
        assert!(matches!(verdict, Verdict::Deny { country: None, .. }));
    }

    #[test]
    fn test_no_candidates_passes() {
        let dir = tempfile::tempdir().unwrap();
        let guard = guard(dir.path());
        assert!(guard.check("/", None, None).is_allowed());
    }

    #[test]
    fn test_acme_challenge() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = guard(dir.path());

        let path = "/.well-known/acme-challenge/token";
        assert!(guard.check(path, Some("1.1.1.1"), None).is_allowed());

        guard.config.allow_lets_encrypt = false;
        assert!(!guard.check(path, Some("1.1.1.1"), None).is_allowed());
    }

    #[test]
    fn test_disabled_guard_passes_everything() {
        let guard: Guard<TableEngine> = Guard::new("geoblock", Config::default()).unwrap();
        assert!(guard.evaluator().is_none());
        assert!(guard.check("/", Some("127.0.0.1"), None).is_allowed());
    }

    #[test]
    fn test_missing_database_refuses_to_start() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            enabled: true,
            databases: vec![dir.path().join("absent.db")],
            assets: None,
            default_action: DefaultAction::Allow,
            ..Config::default()
        };

        let result: Result<Guard<TableEngine>> = Guard::new("geoblock", config);
        assert!(matches!(result, Err(crate::Error::Open(_))));
    }

    #[test]
    fn test_assets_bundle_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut compiler = crate::assets::AssetCompiler::new();
        compiler.add_bytes("v4.db", b"1.1.1.0/24 US\n").unwrap();
        let bundle_path = dir.path().join("assets.json");
        compiler.write(&bundle_path).unwrap();

        let config = Config {
            enabled: true,
            databases: vec![dir.path().join("v4.db")],
            assets: Some(bundle_path),
            blocklist: vec![Rule::country("us")],
            default_action: DefaultAction::Allow,
            ..Config::default()
        };

        let guard: Guard<TableEngine> = Guard::new("geoblock", config).unwrap();
        let evaluator = guard.evaluator().unwrap();
        assert_eq!(
            evaluator.chain().databases()[0].origin(),
            crate::resolver::Origin::Embedded
        );
        assert!(!guard.check("/", Some("1.1.1.1"), None).is_allowed());
        assert!(guard.check("/", Some("9.9.9.9"), None).is_allowed());
    }
}
