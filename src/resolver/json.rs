//! Zone data in JSON form
//!
//! A zone file is one zone object, or an array of them:
//!
//! ```json
//! {
//!   "domain": "example.com.",
//!   "default-ttl": 7200,
//!   "resources": [
//!     { "type": "AAAA", "data": "2001:acad:ad::32" },
//!     { "name": "*.subdomain", "type": "A", "data": "192.168.1.42" }
//!   ]
//! }
//! ```
//!
//! Names without a trailing dot, inside rdata too, are relative to `domain`.

use std::convert::TryFrom;
use std::fmt;
use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::ZoneResolver;
use crate::dns_parser::{Class, DomainName, RRData, Soa, Type};
use crate::error::ZoneLoadError;
use crate::record::ResourceRecord;

/// TTL of records in a zone that sets no `default-ttl`
pub const DEFAULT_TTL: i32 = 3600;

const MAX_CHARACTER_STRING: usize = 255;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ZoneFile {
    domain: String,
    #[serde(default)]
    default_ttl: Option<i64>,
    #[serde(default)]
    resources: Vec<Resource>,
}

#[derive(Debug, Deserialize)]
struct Resource {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    ttl: Option<i64>,
    #[serde(rename = "type")]
    typ: String,
    #[serde(default)]
    class: Option<String>,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct SoaData {
    mname: String,
    rname: String,
    serial: i64,
    refresh: i64,
    retry: i64,
    expire: i64,
    minimum: i64,
}

#[derive(Debug, Deserialize)]
struct MxData {
    preference: i64,
    exchange: String,
}

#[derive(Debug, Deserialize)]
struct SrvData {
    priority: i64,
    weight: i64,
    port: i64,
    target: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TxtData {
    Single(String),
    Multiple(Vec<String>),
}

/// Where a resource entry sits, for resolving names and reporting errors
struct Entry<'a> {
    origin: &'a DomainName,
    owner: &'a DomainName,
    typ: Type,
}

impl<'a> Entry<'a> {
    fn invalid<D: fmt::Display>(&self, reason: D) -> ZoneLoadError {
        ZoneLoadError::InvalidRecord {
            name: self.owner.to_string(),
            typ: self.typ,
            reason: reason.to_string(),
        }
    }

    fn out_of_range(&self, field: &'static str, value: i64) -> ZoneLoadError {
        ZoneLoadError::ValueOutOfRange {
            name: self.owner.to_string(),
            field,
            value,
        }
    }

    fn shape<T: DeserializeOwned>(&self, data: Value) -> Result<T, ZoneLoadError> {
        serde_json::from_value(data).map_err(|err| self.invalid(err))
    }

    fn name(&self, text: &str) -> Result<DomainName, ZoneLoadError> {
        Ok(DomainName::resolve_relative(text, self.origin)?)
    }

    fn number<T: TryFrom<i64>>(&self, field: &'static str, value: i64) -> Result<T, ZoneLoadError> {
        T::try_from(value).map_err(|_| self.out_of_range(field, value))
    }

    fn address<T>(&self, data: Value) -> Result<T, ZoneLoadError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let text: String = self.shape(data)?;
        text.parse()
            .map_err(|err| self.invalid(format_args!("{:?}: {}", text, err)))
    }

    fn rdata(&self, data: Value) -> Result<RRData, ZoneLoadError> {
        let rdata = match self.typ {
            Type::A => RRData::A(self.address::<Ipv4Addr>(data)?),
            Type::AAAA => RRData::AAAA(self.address::<Ipv6Addr>(data)?),
            Type::CNAME => RRData::CNAME(self.name(&self.shape::<String>(data)?)?),
            Type::NS => RRData::NS(self.name(&self.shape::<String>(data)?)?),
            Type::PTR => RRData::PTR(self.name(&self.shape::<String>(data)?)?),
            Type::DNAME => RRData::DNAME(self.name(&self.shape::<String>(data)?)?),
            Type::TXT => {
                let strings = match self.shape::<TxtData>(data)? {
                    TxtData::Single(text) => vec![text],
                    TxtData::Multiple(texts) => texts,
                };
                if let Some(long) = strings.iter().find(|s| s.len() > MAX_CHARACTER_STRING) {
                    return Err(self.out_of_range("TXT string length", long.len() as i64));
                }
                RRData::TXT(strings.into_iter().map(String::into_bytes).collect())
            }
            Type::SOA => {
                let soa: SoaData = self.shape(data)?;
                RRData::SOA(Soa {
                    mname: self.name(&soa.mname)?,
                    rname: self.name(&soa.rname)?,
                    serial: self.number("serial", soa.serial)?,
                    refresh: self.number("refresh", soa.refresh)?,
                    retry: self.number("retry", soa.retry)?,
                    expire: self.number("expire", soa.expire)?,
                    minimum: self.number("minimum", soa.minimum)?,
                })
            }
            Type::MX => {
                let mx: MxData = self.shape(data)?;
                RRData::MX {
                    preference: self.number("preference", mx.preference)?,
                    exchange: self.name(&mx.exchange)?,
                }
            }
            Type::SRV => {
                let srv: SrvData = self.shape(data)?;
                RRData::SRV {
                    priority: self.number("priority", srv.priority)?,
                    weight: self.number("weight", srv.weight)?,
                    port: self.number("port", srv.port)?,
                    target: self.name(&srv.target)?,
                }
            }
            other => return Err(ZoneLoadError::UnsupportedType(other.to_string())),
        };
        Ok(rdata)
    }
}

impl ZoneFile {
    fn into_records(self, records: &mut Vec<ResourceRecord>) -> Result<(), ZoneLoadError> {
        let origin = DomainName::parse(&self.domain)?;
        let default_ttl = match self.default_ttl {
            Some(ttl) => ttl,
            None => i64::from(DEFAULT_TTL),
        };
        for resource in self.resources {
            let owner = DomainName::resolve_relative(resource.name.as_deref().unwrap_or("@"), &origin)?;
            let typ = resource.typ.parse::<Type>()?;
            let class = match resource.class {
                Some(ref class) => class
                    .parse::<Class>()
                    .map_err(|err| ZoneLoadError::UnknownClass(err.0))?,
                None => Class::IN,
            };
            let entry = Entry {
                origin: &origin,
                owner: &owner,
                typ,
            };
            let ttl = resource.ttl.unwrap_or(default_ttl);
            let ttl: i32 = entry.number("ttl", ttl)?;
            if ttl < 0 {
                return Err(entry.out_of_range("ttl", i64::from(ttl)));
            }
            let rdata = entry.rdata(resource.data)?;
            records.push(ResourceRecord::answer(owner, class, ttl, rdata));
        }
        Ok(())
    }
}

/// Records of a JSON document holding one zone or an array of zones
pub fn parse_zone(json: &str) -> Result<Vec<ResourceRecord>, ZoneLoadError> {
    let document: Value = serde_json::from_str(json)?;
    let zones: Vec<ZoneFile> = if document.is_array() {
        serde_json::from_value(document)?
    } else {
        vec![serde_json::from_value(document)?]
    };
    let mut records = Vec::new();
    for zone in zones {
        zone.into_records(&mut records)?;
    }
    Ok(records)
}

pub fn load_zone_file<P: AsRef<Path>>(path: P) -> Result<Vec<ResourceRecord>, ZoneLoadError> {
    let path = path.as_ref();
    let json = fs::read_to_string(path).map_err(|source| ZoneLoadError::Io {
        path: path.to_owned(),
        source,
    })?;
    let records = parse_zone(&json)?;
    debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Records of every file, in the order given
pub fn load_zone_files<I, P>(paths: I) -> Result<Vec<ResourceRecord>, ZoneLoadError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut records = Vec::new();
    for path in paths {
        records.extend(load_zone_file(path)?);
    }
    Ok(records)
}

impl ZoneResolver {
    pub fn from_json_files<I, P>(paths: I) -> Result<ZoneResolver, ZoneLoadError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        ZoneResolver::new(load_zone_files(paths)?)
    }

    pub fn from_json_str(json: &str) -> Result<ZoneResolver, ZoneLoadError> {
        ZoneResolver::new(parse_zone(json)?)
    }
}
