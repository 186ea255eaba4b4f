//! Geoblock - country and CIDR based admission control.
//!
//! For each client address the crate resolves a country from a GeoIP
//! database and renders an allow/deny verdict from an allowlist, a blocklist
//! and a default action.
//!
//! # Features
//!
//! - **Embedded databases**: database files packed at build time into a
//!   compressed, printable resource bundle
//! - **Disk first, bundle second**: an operator-supplied file always wins;
//!   the embedded copy is used only when the file is absent
//! - **No temporary files**: embedded databases are served from memory
//!   through a random-access byte source
//! - **Lazy lookups**: CIDR-only rule sets never touch the database
//! - **Thread-safe**: evaluation is read-only over immutable state
//!
//! # Quick Start
//!
//! ```ignore
//! use geoblock::{assets, open_database, AssetBundle, DefaultAction, Evaluator, Rule};
//!
//! // Optional: bundle produced by `geoblock pack`
//! assets::install(AssetBundle::load("assets.json")?)?;
//!
//! let mut evaluator = Evaluator::new(
//!     &[Rule::country("fr")],
//!     &[Rule::cidr("1.1.1.0/24")],
//!     DefaultAction::Block,
//! )?;
//! evaluator.add_database(open_database("GeoLite2-Country.mmdb")?);
//!
//! let result = evaluator.evaluate("80.67.169.12")?;
//! assert!(result.allowed);
//! ```
//!
//! # Matching Priority
//!
//! 1. Allowlist (CIDR or country) → allowed
//! 2. Blocklist (CIDR or country) → denied
//! 3. Default action

mod config;
mod error;
mod evaluator;
mod guard;
mod resolver;

pub mod assets;
pub mod engine;
pub mod lookup;
pub mod rule;
pub mod source;

// Re-export core types
pub use error::{AssetError, BuildError, Error, LookupError, OpenError, Result, RuleError};

pub use assets::{AssetBundle, AssetCompiler};
pub use config::{Config, DEFAULT_BLOCKLIST, DEFAULT_DISALLOWED_STATUS};
pub use engine::{CountryEngine, Locked, MaxMindEngine};
pub use evaluator::{DefaultAction, Evaluation, Evaluator};
pub use guard::{candidate_ips, load_guard, Guard, Verdict, ACME_CHALLENGE_PREFIX};
pub use lookup::{normalize_country, DatabaseChain, PRIVATE_ADDRESS};
pub use resolver::{open_database, open_with_assets, OpenDatabase, Origin};
pub use rule::{Rule, RuleKind, RuleList};
pub use source::{DatabaseSource, MemoryFile, ReadAt};
