//! MaxMind DB (`.mmdb`) engine.

use maxminddb::{MaxMindDBError, Metadata, Reader};
use serde::Deserialize;
use std::io;
use std::net::IpAddr;
use std::path::Path;

use super::{CountryEngine, NO_COUNTRY};
use crate::error::LookupError;
use crate::source::{DatabaseSource, MemoryFile};

#[derive(Deserialize)]
struct Country {
    iso_code: Option<String>,
}

#[derive(Deserialize)]
struct CountryRecord {
    country: Option<Country>,
    registered_country: Option<Country>,
}

impl CountryRecord {
    fn iso_code(self) -> Option<String> {
        self.country
            .and_then(|c| c.iso_code)
            .or_else(|| self.registered_country.and_then(|c| c.iso_code))
    }
}

/// Country lookups over a GeoIP2/GeoLite2 Country or City database.
///
/// Lookups take `&self` and the reader is immutable, so one handle can be
/// queried from many threads at once.
pub struct MaxMindEngine {
    reader: Reader<DatabaseSource>,
}

impl MaxMindEngine {
    fn from_source(source: DatabaseSource) -> io::Result<Self> {
        let reader = Reader::from_source(source)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(Self { reader })
    }

    /// Database metadata (type, IP version, build epoch).
    pub fn metadata(&self) -> &Metadata {
        &self.reader.metadata
    }
}

impl CountryEngine for MaxMindEngine {
    fn open_path(path: &Path) -> io::Result<Self> {
        Self::from_source(DatabaseSource::map(path)?)
    }

    fn open_memory(file: MemoryFile) -> io::Result<Self> {
        Self::from_source(DatabaseSource::from(file))
    }

    fn covers(&self, ip: IpAddr) -> bool {
        // IPv6 trees also hold the IPv4 space.
        ip.is_ipv4() || self.reader.metadata.ip_version == 6
    }

    fn query_country(&self, ip: IpAddr) -> Result<String, LookupError> {
        match self.reader.lookup::<CountryRecord>(ip) {
            Ok(record) => Ok(record.iso_code().unwrap_or_else(|| NO_COUNTRY.to_string())),
            Err(MaxMindDBError::AddressNotFoundError(_)) => Ok(NO_COUNTRY.to_string()),
            Err(e) => Err(LookupError::Engine(e.to_string())),
        }
    }
}

impl std::fmt::Debug for MaxMindEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindEngine")
            .field("database_type", &self.reader.metadata.database_type)
            .field("ip_version", &self.reader.metadata.ip_version)
            .finish()
    }
}
