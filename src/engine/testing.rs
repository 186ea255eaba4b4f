//! Test doubles for the engine layer.
//!
//! [`TableEngine`] reads line-based tables: one `cidr country` pair per line,
//! an optional `family 4|6` line and `#` comments. [`MmdbBuilder`] writes
//! real MaxMind DB files for exercising [`MaxMindEngine`](super::MaxMindEngine).

use ipnet::IpNet;
use std::fs;
use std::io;
use std::net::IpAddr;
use std::path::Path;

use super::{CountryEngine, NO_COUNTRY};
use crate::error::LookupError;
use crate::source::MemoryFile;

#[derive(Debug, Default)]
pub struct TableEngine {
    pub family: Option<u8>,
    pub entries: Vec<(IpNet, String)>,
}

impl TableEngine {
    pub fn parse(data: &[u8]) -> io::Result<Self> {
        let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);
        let text = std::str::from_utf8(data).map_err(|e| invalid(e.to_string()))?;

        let mut engine = Self::default();
        for line in text.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let (left, right) = line
                .split_once(' ')
                .ok_or_else(|| invalid(format!("bad line: {}", line)))?;

            if left == "family" {
                engine.family = Some(right.trim().parse().map_err(|_| invalid(line.to_string()))?);
                continue;
            }

            let net: IpNet = left.parse().map_err(|_| invalid(line.to_string()))?;
            engine.entries.push((net, right.trim().to_string()));
        }
        Ok(engine)
    }
}

impl CountryEngine for TableEngine {
    fn open_path(path: &Path) -> io::Result<Self> {
        Self::parse(&fs::read(path)?)
    }

    fn open_memory(file: MemoryFile) -> io::Result<Self> {
        Self::parse(file.as_ref())
    }

    fn covers(&self, ip: IpAddr) -> bool {
        match self.family {
            Some(4) => ip.is_ipv4(),
            Some(6) => ip.is_ipv6(),
            _ => true,
        }
    }

    fn query_country(&self, ip: IpAddr) -> Result<String, LookupError> {
        Ok(self
            .entries
            .iter()
            .find(|(net, _)| net.contains(&ip))
            .map(|(_, country)| country.clone())
            .unwrap_or_else(|| NO_COUNTRY.to_string()))
    }
}

// MaxMind DB data section type numbers.
const TYPE_STRING: u8 = 2;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;
const TYPE_UINT64: u8 = 9;
const TYPE_ARRAY: u8 = 11;

const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";
const RECORD_SIZE: u64 = 24;

fn put_header(out: &mut Vec<u8>, type_num: u8, size: usize) {
    assert!(size < 29, "extended sizes are not needed here");
    if type_num <= 7 {
        out.push(type_num << 5 | size as u8);
    } else {
        out.push(size as u8);
        out.push(type_num - 7);
    }
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    put_header(out, TYPE_STRING, value.len());
    out.extend_from_slice(value.as_bytes());
}

fn put_uint(out: &mut Vec<u8>, type_num: u8, value: u64, width: usize) {
    put_header(out, type_num, width);
    out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
}

#[derive(Debug, Clone, Copy)]
enum Record {
    Empty,
    Node(usize),
    Data(usize),
}

/// Writes a minimal GeoIP2-Country style database with 24-bit records.
///
/// Networks must not overlap.
#[derive(Debug)]
pub struct MmdbBuilder {
    ip_version: u16,
    nodes: Vec<[Record; 2]>,
    data: Vec<u8>,
}

impl MmdbBuilder {
    pub fn new(ip_version: u16) -> Self {
        Self {
            ip_version,
            nodes: vec![[Record::Empty; 2]],
            data: Vec::new(),
        }
    }

    /// Map `network` to a record with optional `country` and
    /// `registered_country` ISO codes.
    pub fn insert(
        &mut self,
        network: &str,
        country: Option<&str>,
        registered_country: Option<&str>,
    ) -> &mut Self {
        let net: IpNet = network.parse().unwrap();
        let (bits, prefix) = match net {
            IpNet::V4(v4) if self.ip_version == 6 => {
                let mut bits = vec![0u8; 12];
                bits.extend_from_slice(&v4.network().octets());
                (bits, usize::from(v4.prefix_len()) + 96)
            }
            IpNet::V4(v4) => (v4.network().octets().to_vec(), usize::from(v4.prefix_len())),
            IpNet::V6(v6) => (v6.network().octets().to_vec(), usize::from(v6.prefix_len())),
        };
        assert!(prefix > 0);

        let offset = self.data.len();
        let fields: Vec<(&str, &str)> = [("country", country), ("registered_country", registered_country)]
            .into_iter()
            .filter_map(|(key, code)| code.map(|code| (key, code)))
            .collect();
        put_header(&mut self.data, TYPE_MAP, fields.len());
        for (key, code) in fields {
            put_str(&mut self.data, key);
            put_header(&mut self.data, TYPE_MAP, 1);
            put_str(&mut self.data, "iso_code");
            put_str(&mut self.data, code);
        }

        let mut node = 0;
        for i in 0..prefix {
            let bit = usize::from((bits[i / 8] >> (7 - i % 8)) & 1);
            if i + 1 == prefix {
                self.nodes[node][bit] = Record::Data(offset);
                break;
            }
            node = match self.nodes[node][bit] {
                Record::Node(next) => next,
                _ => {
                    self.nodes.push([Record::Empty; 2]);
                    let next = self.nodes.len() - 1;
                    self.nodes[node][bit] = Record::Node(next);
                    next
                }
            };
        }
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let node_count = self.nodes.len();
        let mut out = Vec::new();

        for node in &self.nodes {
            for record in node {
                let value = match *record {
                    Record::Empty => node_count,
                    Record::Node(next) => next,
                    Record::Data(offset) => node_count + 16 + offset,
                };
                out.extend_from_slice(&(value as u32).to_be_bytes()[1..]);
            }
        }

        out.extend_from_slice(&[0u8; 16]);
        out.extend_from_slice(&self.data);
        out.extend_from_slice(METADATA_MARKER);

        put_header(&mut out, TYPE_MAP, 9);
        put_str(&mut out, "binary_format_major_version");
        put_uint(&mut out, TYPE_UINT16, 2, 2);
        put_str(&mut out, "binary_format_minor_version");
        put_uint(&mut out, TYPE_UINT16, 0, 2);
        put_str(&mut out, "build_epoch");
        put_uint(&mut out, TYPE_UINT64, 1_700_000_000, 8);
        put_str(&mut out, "database_type");
        put_str(&mut out, "GeoLite2-Country");
        put_str(&mut out, "description");
        put_header(&mut out, TYPE_MAP, 1);
        put_str(&mut out, "en");
        put_str(&mut out, "geoblock test database");
        put_str(&mut out, "ip_version");
        put_uint(&mut out, TYPE_UINT16, u64::from(self.ip_version), 2);
        put_str(&mut out, "languages");
        put_header(&mut out, TYPE_ARRAY, 1);
        put_str(&mut out, "en");
        put_str(&mut out, "node_count");
        put_uint(&mut out, TYPE_UINT32, node_count as u64, 4);
        put_str(&mut out, "record_size");
        put_uint(&mut out, TYPE_UINT16, RECORD_SIZE, 2);

        out
    }
}
