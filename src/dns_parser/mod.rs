//! Wire format of DNS messages (RFC 1035)
//!
//! Parsing borrows from the packet buffer where it can; names inside rdata
//! are copied out into owned [`DomainName`]s so records outlive the buffer.

mod builder;
mod enums;
mod error;
mod header;
mod name;
mod parser;
mod rrdata;
mod structs;

pub use self::builder::{Additional, Answers, Builder, Nameservers, Questions};
pub use self::enums::{Class, Opcode, ResponseCode, Type, UnknownMnemonic};
pub use self::error::Error;
pub use self::header::{Header, HEADER_SIZE};
pub use self::name::{DomainName, Labels, Name, NameError, MAX_LABEL_LEN, MAX_NAME_LEN};
pub use self::rrdata::{has_structured_rdata, RRData, Soa};
pub use self::structs::{OptRecord, Packet, Question, ResourceRecord};
