use super::{Class, Header, Name, RRData, Type};

/// Parsed DNS packet
#[derive(Debug)]
pub struct Packet<'a> {
    pub header: Header,
    pub questions: Vec<Question<'a>>,
    pub answers: Vec<ResourceRecord<'a>>,
    pub nameservers: Vec<ResourceRecord<'a>>,
    pub additional: Vec<ResourceRecord<'a>>,
    /// Optional Pseudo-RR
    /// When present it is sent as an RR in the additional section. In this RR
    /// the `class` and `ttl` fields store max udp packet size and flags
    /// respectively. To keep `ResourceRecord` clean we store the OPT record
    /// here.
    pub opt: Option<OptRecord>,
}

/// A parsed chunk of data in the Query section of the packet
#[derive(Debug)]
pub struct Question<'a> {
    pub qname: Name<'a>,
    pub qtype: Type,
    pub qclass: Class,
}

/// A single DNS record
///
/// Records with a structured layout are fully parsed; the rest keep their
/// rdata as an opaque byte payload.
#[derive(Debug)]
pub struct ResourceRecord<'a> {
    pub name: Name<'a>,
    pub cls: Class,
    pub ttl: u32,
    pub data: RRData,
}

/// EDNS0 OPT pseudo-record (RFC 6891)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptRecord {
    pub udp: u16,
    pub extrcode: u8,
    pub version: u8,
    pub flags: u16,
}

impl OptRecord {
    pub fn dnssec_ok(&self) -> bool {
        self.flags & 0x8000 != 0
    }
}
