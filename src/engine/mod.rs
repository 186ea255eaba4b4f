//! Geolocation database engines.
//!
//! The resolver and chain only see the [`CountryEngine`] capability set, so
//! they stay independent of the binary database format. [`MaxMindEngine`] is
//! the production implementation.

mod maxmind;
#[cfg(test)]
pub(crate) mod testing;

pub use maxmind::MaxMindEngine;

use parking_lot::Mutex;
use std::io;
use std::net::IpAddr;
use std::path::Path;

use crate::error::LookupError;
use crate::source::MemoryFile;

/// Raw country value an engine reports when a record carries no country.
pub const NO_COUNTRY: &str = "-";

/// Capabilities required from a geolocation database engine.
pub trait CountryEngine {
    /// Open a database through the engine's native file path.
    ///
    /// A missing file must surface as [`io::ErrorKind::NotFound`]; that kind
    /// is what triggers the embedded fallback.
    fn open_path(path: &Path) -> io::Result<Self>
    where
        Self: Sized;

    /// Open a database held in memory.
    fn open_memory(file: MemoryFile) -> io::Result<Self>
    where
        Self: Sized;

    /// Check if this database answers for the address family of `ip`.
    fn covers(&self, _ip: IpAddr) -> bool {
        true
    }

    /// Raw country field for `ip`, or [`NO_COUNTRY`].
    fn query_country(&self, ip: IpAddr) -> Result<String, LookupError>;
}

/// Serializes access to an engine that cannot be queried concurrently.
///
/// Each wrapped handle gets its own exclusive lock.
#[derive(Debug)]
pub struct Locked<E> {
    inner: Mutex<E>,
}

impl<E> Locked<E> {
    /// Wrap an opened engine.
    pub fn new(engine: E) -> Self {
        Self {
            inner: Mutex::new(engine),
        }
    }

    /// Unwrap the engine.
    pub fn into_inner(self) -> E {
        self.inner.into_inner()
    }
}

impl<E: CountryEngine> CountryEngine for Locked<E> {
    fn open_path(path: &Path) -> io::Result<Self> {
        E::open_path(path).map(Self::new)
    }

    fn open_memory(file: MemoryFile) -> io::Result<Self> {
        E::open_memory(file).map(Self::new)
    }

    fn covers(&self, ip: IpAddr) -> bool {
        self.inner.lock().covers(ip)
    }

    fn query_country(&self, ip: IpAddr) -> Result<String, LookupError> {
        self.inner.lock().query_country(ip)
    }
}
