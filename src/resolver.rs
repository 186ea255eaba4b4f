//! Database resolution: on-disk file first, embedded asset as fallback.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::assets::{self, AssetBundle};
use crate::engine::{CountryEngine, MaxMindEngine};
use crate::error::{AssetError, OpenError};
use crate::source::MemoryFile;

/// Where an opened database was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Operator-supplied file on disk
    Disk,
    /// Copy bundled at build time
    Embedded,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Disk => write!(f, "disk"),
            Origin::Embedded => write!(f, "embedded"),
        }
    }
}

/// A database opened at startup and held for the process lifetime.
#[derive(Debug)]
pub struct OpenDatabase<E = MaxMindEngine> {
    name: String,
    path: PathBuf,
    origin: Origin,
    engine: E,
}

impl<E> OpenDatabase<E> {
    /// Base name of the database file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configured path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the bytes came from.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// The opened engine handle.
    pub fn engine(&self) -> &E {
        &self.engine
    }
}

fn base_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

/// Open a database, falling back to the process-wide embedded bundle.
pub fn open_database<E: CountryEngine>(path: impl AsRef<Path>) -> Result<OpenDatabase<E>, OpenError> {
    open_with_assets(path, assets::embedded())
}

/// Open a database, falling back to `bundle` when the file is absent.
///
/// Only a missing file triggers the fallback. A file that exists but cannot
/// be read or parsed is an error even if an embedded copy exists.
pub fn open_with_assets<E: CountryEngine>(
    path: impl AsRef<Path>,
    bundle: &AssetBundle,
) -> Result<OpenDatabase<E>, OpenError> {
    let path = path.as_ref();
    let name = base_name(path).unwrap_or_default().to_string();

    let not_found = match E::open_path(path) {
        Ok(engine) => {
            log::info!("Opened database {}", path.display());
            return Ok(OpenDatabase {
                name,
                path: path.to_path_buf(),
                origin: Origin::Disk,
                engine,
            });
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => e,
        Err(source) => {
            return Err(OpenError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let data = match bundle.get(&name) {
        Ok(data) => data,
        Err(AssetError::NotExist(_)) => {
            return Err(OpenError::NotFound {
                path: path.to_path_buf(),
                source: not_found,
            })
        }
        Err(source) => {
            return Err(OpenError::Asset {
                path: path.to_path_buf(),
                name,
                source,
            })
        }
    };

    let engine = E::open_memory(MemoryFile::new(data)).map_err(|source| OpenError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    log::warn!(
        "Database {} not found on disk, using embedded copy of {}",
        path.display(),
        name
    );

    Ok(OpenDatabase {
        name,
        path: path.to_path_buf(),
        origin: Origin::Embedded,
        engine,
    })
}
