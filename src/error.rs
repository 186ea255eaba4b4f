//! Error types for geoblock.

use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Error type for geoblock operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Asset bundle error
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// Asset compilation error
    #[error("build error: {0}")]
    Build(#[from] BuildError),

    /// Database open error
    #[error("open error: {0}")]
    Open(#[from] OpenError),

    /// Country lookup error
    #[error("lookup error: {0}")]
    Lookup(#[from] LookupError),

    /// Rule definition error
    #[error("rule error: {0}")]
    Rule(#[from] RuleError),

    /// Invalid IP address
    #[error("invalid IP address: {0}")]
    InvalidIpAddress(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for geoblock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the embedded asset accessor.
#[derive(Error, Debug)]
pub enum AssetError {
    /// No asset registered under this name
    #[error("asset does not exist: {0}")]
    NotExist(String),

    /// Payload is not valid radix-85 text
    #[error("invalid encoded payload at offset {offset}: {reason}")]
    InvalidEncoding { offset: usize, reason: &'static str },

    /// Payload failed to inflate
    #[error("decompression failed: {0}")]
    Decompress(#[source] std::io::Error),

    /// Decoded bytes do not match the recorded size
    #[error("size mismatch for {name}: expected {expected}, got {actual}")]
    SizeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Decoded bytes do not match the recorded digest
    #[error("checksum mismatch for {0}")]
    ChecksumMismatch(String),
}

impl AssetError {
    /// Whether this error means the asset is simply not registered.
    pub fn is_not_exist(&self) -> bool {
        matches!(self, AssetError::NotExist(_))
    }
}

/// Error type for asset compilation. Always fatal for the build.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Source database could not be read
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Bundle could not be written
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Compressor failed
    #[error("compression failed for {name}: {source}")]
    Compress {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Input has no usable base name
    #[error("invalid asset path: {0}")]
    InvalidName(PathBuf),

    /// Two inputs share a base name
    #[error("duplicate asset name: {0}")]
    DuplicateName(String),

    /// Bundle serialization failed
    #[error("bundle serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error type for opening a database. Always fatal at startup.
#[derive(Error, Debug)]
pub enum OpenError {
    /// Not on disk and not embedded
    #[error("{path}: database not found: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// On-disk file exists but cannot be opened or parsed
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Embedded copy exists but cannot be decoded
    #[error("{path}: embedded asset {name}: {source}")]
    Asset {
        path: PathBuf,
        name: String,
        #[source]
        source: AssetError,
    },
}

impl OpenError {
    /// Path that failed to open.
    pub fn path(&self) -> &PathBuf {
        match self {
            OpenError::NotFound { path, .. }
            | OpenError::Io { path, .. }
            | OpenError::Asset { path, .. } => path,
        }
    }
}

/// Error type for a single country lookup. Never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Engine returned an invalid-record marker
    #[error("{0}")]
    InvalidRecord(String),

    /// Engine failed to decode the record
    #[error("database error: {0}")]
    Engine(String),

    /// No opened database covers this address family
    #[error("no database covers {0}")]
    NoDatabase(IpAddr),
}

/// Error type for rule definitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// Invalid CIDR notation
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),

    /// Invalid country code (must be 2 letters)
    #[error("invalid country code (must be 2 letters): {0}")]
    InvalidCountryCode(String),
}
