//! Country resolution over opened databases.

use std::net::IpAddr;

use crate::engine::{CountryEngine, MaxMindEngine, NO_COUNTRY};
use crate::error::LookupError;
use crate::resolver::OpenDatabase;

/// Country value for private and reserved addresses.
pub const PRIVATE_ADDRESS: &str = "-";

/// Prefix engines use for records they could not resolve.
pub const INVALID_RECORD_PREFIX: &str = "invalid";

/// Normalize a raw engine country value.
///
/// Returns a lowercase two-letter code or [`PRIVATE_ADDRESS`]. Invalid-record
/// markers and anything else unexpected become [`LookupError::InvalidRecord`].
pub fn normalize_country(raw: &str) -> Result<String, LookupError> {
    let country = raw.trim().to_ascii_lowercase();

    if country.starts_with(INVALID_RECORD_PREFIX) {
        return Err(LookupError::InvalidRecord(country));
    }

    if country == NO_COUNTRY {
        return Ok(PRIVATE_ADDRESS.to_string());
    }

    if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LookupError::InvalidRecord(format!(
            "unexpected country value: {:?}",
            raw
        )));
    }

    Ok(country)
}

/// Resolve the normalized country of `ip` in one database.
pub fn country<E: CountryEngine>(engine: &E, ip: IpAddr) -> Result<String, LookupError> {
    normalize_country(&engine.query_country(ip)?)
}

/// Ordered set of opened databases queried together.
///
/// The expected configuration is one database per address family. When
/// several databases cover the same address, the last one added wins.
#[derive(Debug)]
pub struct DatabaseChain<E = MaxMindEngine> {
    databases: Vec<OpenDatabase<E>>,
}

impl<E> Default for DatabaseChain<E> {
    fn default() -> Self {
        Self {
            databases: Vec::new(),
        }
    }
}

impl<E: CountryEngine> DatabaseChain<E> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an opened database.
    pub fn add(&mut self, database: OpenDatabase<E>) {
        self.databases.push(database);
    }

    /// Number of databases.
    pub fn len(&self) -> usize {
        self.databases.len()
    }

    /// Check if the chain has no databases.
    pub fn is_empty(&self) -> bool {
        self.databases.is_empty()
    }

    /// Opened databases in add order.
    pub fn databases(&self) -> &[OpenDatabase<E>] {
        &self.databases
    }

    /// Resolve the country of `ip` across every database covering its family.
    ///
    /// IPv4-mapped IPv6 addresses are looked up as IPv4.
    pub fn country(&self, ip: IpAddr) -> Result<String, LookupError> {
        let ip = ip.to_canonical();
        let mut resolved = None;

        for database in &self.databases {
            if !database.engine().covers(ip) {
                continue;
            }

            let code = country(database.engine(), ip).map_err(|e| {
                log::debug!("{}: lookup of {} failed: {}", database.name(), ip, e);
                e
            })?;
            resolved = Some(code);
        }

        resolved.ok_or(LookupError::NoDatabase(ip))
    }
}
