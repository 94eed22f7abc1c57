use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::dns_parser::{self, NameError, Type, UnknownMnemonic};

/// Errors surfaced by the codec and the resolvers
#[derive(Debug, Error)]
pub enum Error {
    /// The bytes on the wire do not form a DNS message
    #[error("malformed message: {0}")]
    MalformedMessage(#[from] dns_parser::Error),

    /// A record type the codec has no structural support for
    #[error("unsupported record type {0}")]
    UnsupportedType(String),

    /// A numeric field does not fit its wire width
    #[error("{field} value {value} is out of range")]
    ValueOutOfRange { field: &'static str, value: i64 },

    /// Rdata of one type attached to a record of another
    #[error("{rdata} rdata cannot be stored in a {declared} record")]
    RdataMismatch { declared: Type, rdata: Type },

    #[error(transparent)]
    ZoneLoad(#[from] ZoneLoadError),

    /// A configuration document that does not describe a [`Config`](crate::Config)
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Zone data that cannot be turned into a zone index
#[derive(Debug, Error)]
pub enum ZoneLoadError {
    #[error("reading zone file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("parsing zone data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported record type {0:?}")]
    UnsupportedType(String),

    #[error("unknown class {0:?}")]
    UnknownClass(String),

    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    #[error("{name} {typ}: {reason}")]
    InvalidRecord {
        name: String,
        typ: Type,
        reason: String,
    },

    #[error("{name}: {field} value {value} is out of range")]
    ValueOutOfRange {
        name: String,
        field: &'static str,
        value: i64,
    },

    #[error("{0} is a question, zones hold answers only")]
    QuestionRecord(String),
}

impl From<UnknownMnemonic> for ZoneLoadError {
    fn from(err: UnknownMnemonic) -> Self {
        ZoneLoadError::UnsupportedType(err.0)
    }
}
