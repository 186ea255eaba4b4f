//! Embedded database assets.
//!
//! A bundle is a JSON resource file produced by [`AssetCompiler`] at build
//! time. Each asset holds a gzip-compressed copy of a database file, encoded
//! as printable radix-85 text and keyed by the hex form of the file's base
//! name. The bundle is loaded once at startup and never mutated.

pub mod codec;
mod compiler;

pub use compiler::{compress_best, select_smallest, AssetCompiler, Candidate, COMPRESSION_LEVELS};

use ahash::AHashMap;
use flate2::read::GzDecoder;
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::{AssetError, Error, Result};

/// Current bundle format version.
pub const BUNDLE_VERSION: u32 = 1;

/// Process-wide embedded bundle.
static EMBEDDED: OnceCell<AssetBundle> = OnceCell::new();

/// Returned by [`embedded`] until a bundle is installed.
static EMPTY: Lazy<AssetBundle> = Lazy::new(AssetBundle::default);

/// Install the process-wide bundle.
///
/// This should be called once at startup, before any database is opened.
pub fn install(bundle: AssetBundle) -> Result<()> {
    let count = bundle.len();
    EMBEDDED
        .set(bundle)
        .map_err(|_| Error::Config("embedded assets already installed".to_string()))?;

    log::debug!("Installed {} embedded database assets", count);
    Ok(())
}

/// Get the process-wide bundle, empty if none was installed yet.
///
/// Reading the bundle never prevents a later [`install`].
pub fn embedded() -> &'static AssetBundle {
    EMBEDDED.get().unwrap_or_else(|| Lazy::force(&EMPTY))
}

/// Stable identifier of an asset name: lowercase hex of its UTF-8 bytes.
pub fn asset_id(name: &str) -> String {
    name.bytes().map(|b| format!("{:02x}", b)).collect()
}

/// SHA-256 of a byte slice as lowercase hex.
pub(crate) fn hex_digest(data: &[u8]) -> String {
    Sha256::digest(data)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// One embedded database, as stored in the bundle file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Hex identifier derived from `name`
    pub id: String,
    /// Base name of the source file
    pub name: String,
    /// Deflate level that produced the retained payload
    pub level: u32,
    /// Size of the original file in bytes
    pub size: usize,
    /// SHA-256 of the original file, lowercase hex
    pub sha256: String,
    /// Radix-85 text of the gzip stream
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct BundleFile {
    version: u32,
    assets: Vec<AssetRecord>,
}

/// Immutable name-keyed collection of embedded database assets.
#[derive(Debug, Default)]
pub struct AssetBundle {
    assets: AHashMap<String, AssetRecord>,
}

impl AssetBundle {
    /// Build a bundle from records. Later records with a duplicate id are rejected.
    pub(crate) fn from_records(records: Vec<AssetRecord>) -> Result<Self> {
        let mut assets = AHashMap::with_capacity(records.len());
        for record in records {
            if record.id != asset_id(&record.name) {
                return Err(Error::Config(format!(
                    "asset id {} does not match name {}",
                    record.id, record.name
                )));
            }
            if assets.contains_key(&record.id) {
                return Err(Error::Config(format!("duplicate asset: {}", record.name)));
            }
            assets.insert(record.id.clone(), record);
        }
        Ok(Self { assets })
    }

    /// Parse a bundle from its JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let file: BundleFile = serde_json::from_str(text)?;
        if file.version != BUNDLE_VERSION {
            return Err(Error::Config(format!(
                "unsupported asset bundle version: {}",
                file.version
            )));
        }
        Self::from_records(file.assets)
    }

    /// Load a bundle file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let bundle = Self::from_json(&text)?;
        log::info!(
            "Loaded {} database assets from {}",
            bundle.len(),
            path.as_ref().display()
        );
        Ok(bundle)
    }

    /// Serialize the bundle to JSON, assets ordered by name.
    pub fn to_json(&self) -> Result<String> {
        Ok(self.encode_json()?)
    }

    fn encode_json(&self) -> serde_json::Result<String> {
        let mut assets: Vec<AssetRecord> = self.assets.values().cloned().collect();
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        serde_json::to_string_pretty(&BundleFile {
            version: BUNDLE_VERSION,
            assets,
        })
    }

    /// Number of assets.
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if the bundle has no assets.
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Check if an asset is registered under this name.
    pub fn contains(&self, name: &str) -> bool {
        self.assets.contains_key(&asset_id(name))
    }

    /// Get the stored record for a name.
    pub fn record(&self, name: &str) -> Option<&AssetRecord> {
        self.assets.get(&asset_id(name))
    }

    /// Names of all assets, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.assets.values().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the original bytes of an asset.
    ///
    /// Fails with [`AssetError::NotExist`] for unregistered names.
    pub fn get(&self, name: &str) -> std::result::Result<Vec<u8>, AssetError> {
        let record = self
            .record(name)
            .ok_or_else(|| AssetError::NotExist(name.to_string()))?;
        decode_record(record)
    }
}

/// Decode, inflate and verify one record.
fn decode_record(record: &AssetRecord) -> std::result::Result<Vec<u8>, AssetError> {
    let compressed = codec::decode(&record.payload)?;

    let mut data = Vec::with_capacity(record.size);
    GzDecoder::new(&compressed[..])
        .read_to_end(&mut data)
        .map_err(AssetError::Decompress)?;

    if data.len() != record.size {
        return Err(AssetError::SizeMismatch {
            name: record.name.clone(),
            expected: record.size,
            actual: data.len(),
        });
    }

    if hex_digest(&data) != record.sha256 {
        return Err(AssetError::ChecksumMismatch(record.name.clone()));
    }

    Ok(data)
}
