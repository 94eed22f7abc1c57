use std::fmt;
use std::str::FromStr;

use super::Error;

/// The TYPE value of a resource record or question
///
/// Query-only codes (AXFR, ANY, ...) live in the same enumeration so that a
/// question and an answer carry the same kind of value.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
#[allow(clippy::upper_case_acronyms)]
pub enum Type {
    A,
    NS,
    MD,
    MF,
    CNAME,
    SOA,
    MB,
    MG,
    MR,
    NULL,
    WKS,
    PTR,
    HINFO,
    MINFO,
    MX,
    TXT,
    AAAA,
    SRV,
    NAPTR,
    DNAME,
    OPT,
    DS,
    RRSIG,
    NSEC,
    DNSKEY,
    CAA,
    IXFR,
    AXFR,
    MAILB,
    MAILA,
    All,
    /// A code this crate has no name for, kept so questions can still be answered
    Unknown(u16),
}

/// The CLASS value of a resource record or question
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Class {
    /// the Internet
    IN = 1,
    /// the CSNET class (Obsolete)
    CS = 2,
    /// the CHAOS class
    CH = 3,
    /// Hesiod
    HS = 4,
    /// RFC 2136, used only by dynamic update
    None = 254,
    /// Any class, only valid in questions
    Any = 255,
}

/// The OPCODE value according to RFC 1035
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Opcode {
    StandardQuery,
    InverseQuery,
    ServerStatusRequest,
    Notify,
    Update,
    Reserved(u8),
}

/// The RCODE value according to RFC 1035
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ResponseCode {
    NoError,
    FormatError,
    ServerFailure,
    NameError,
    NotImplemented,
    Refused,
    Reserved(u8),
}

impl Type {
    /// Strict variant of [`Type::from_code`] for record sections
    pub fn parse(code: u16) -> Result<Type, Error> {
        match Type::from_code(code) {
            Type::Unknown(x) => Err(Error::InvalidType(x)),
            typ => Ok(typ),
        }
    }

    pub fn from_code(code: u16) -> Type {
        use self::Type::*;
        match code {
            1 => A,
            2 => NS,
            3 => MD,
            4 => MF,
            5 => CNAME,
            6 => SOA,
            7 => MB,
            8 => MG,
            9 => MR,
            10 => NULL,
            11 => WKS,
            12 => PTR,
            13 => HINFO,
            14 => MINFO,
            15 => MX,
            16 => TXT,
            28 => AAAA,
            33 => SRV,
            35 => NAPTR,
            39 => DNAME,
            41 => OPT,
            43 => DS,
            46 => RRSIG,
            47 => NSEC,
            48 => DNSKEY,
            257 => CAA,
            251 => IXFR,
            252 => AXFR,
            253 => MAILB,
            254 => MAILA,
            255 => All,
            x => Unknown(x),
        }
    }

    /// Codes that only make sense in the question section
    pub fn is_query_only(self) -> bool {
        matches!(
            self,
            Type::IXFR | Type::AXFR | Type::MAILB | Type::MAILA | Type::All
        )
    }

    pub fn code(self) -> u16 {
        use self::Type::*;
        match self {
            A => 1,
            NS => 2,
            MD => 3,
            MF => 4,
            CNAME => 5,
            SOA => 6,
            MB => 7,
            MG => 8,
            MR => 9,
            NULL => 10,
            WKS => 11,
            PTR => 12,
            HINFO => 13,
            MINFO => 14,
            MX => 15,
            TXT => 16,
            AAAA => 28,
            SRV => 33,
            NAPTR => 35,
            DNAME => 39,
            OPT => 41,
            DS => 43,
            RRSIG => 46,
            NSEC => 47,
            DNSKEY => 48,
            CAA => 257,
            IXFR => 251,
            AXFR => 252,
            MAILB => 253,
            MAILA => 254,
            All => 255,
            Unknown(x) => x,
        }
    }

    /// `None` for codes without a registered name
    pub fn mnemonic(self) -> Option<&'static str> {
        use self::Type::*;
        let name = match self {
            A => "A",
            NS => "NS",
            MD => "MD",
            MF => "MF",
            CNAME => "CNAME",
            SOA => "SOA",
            MB => "MB",
            MG => "MG",
            MR => "MR",
            NULL => "NULL",
            WKS => "WKS",
            PTR => "PTR",
            HINFO => "HINFO",
            MINFO => "MINFO",
            MX => "MX",
            TXT => "TXT",
            AAAA => "AAAA",
            SRV => "SRV",
            NAPTR => "NAPTR",
            DNAME => "DNAME",
            OPT => "OPT",
            DS => "DS",
            RRSIG => "RRSIG",
            NSEC => "NSEC",
            DNSKEY => "DNSKEY",
            CAA => "CAA",
            IXFR => "IXFR",
            AXFR => "AXFR",
            MAILB => "MAILB",
            MAILA => "MAILA",
            All => "ANY",
            Unknown(_) => return None,
        };
        Some(name)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.mnemonic() {
            Some(name) => f.write_str(name),
            None => write!(f, "TYPE{}", self.code()),
        }
    }
}

/// Error returned when a type or class mnemonic is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown mnemonic {0:?}")]
pub struct UnknownMnemonic(pub String);

impl FromStr for Type {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Type, UnknownMnemonic> {
        const ALL: [Type; 31] = [
            Type::A,
            Type::NS,
            Type::MD,
            Type::MF,
            Type::CNAME,
            Type::SOA,
            Type::MB,
            Type::MG,
            Type::MR,
            Type::NULL,
            Type::WKS,
            Type::PTR,
            Type::HINFO,
            Type::MINFO,
            Type::MX,
            Type::TXT,
            Type::AAAA,
            Type::SRV,
            Type::NAPTR,
            Type::DNAME,
            Type::OPT,
            Type::DS,
            Type::RRSIG,
            Type::NSEC,
            Type::DNSKEY,
            Type::CAA,
            Type::IXFR,
            Type::AXFR,
            Type::MAILB,
            Type::MAILA,
            Type::All,
        ];
        ALL.iter()
            .copied()
            .find(|typ| typ.mnemonic().map_or(false, |m| m.eq_ignore_ascii_case(s)))
            .ok_or_else(|| UnknownMnemonic(s.to_owned()))
    }
}

impl Class {
    pub fn parse(code: u16) -> Result<Class, Error> {
        use self::Class::*;
        match code {
            1 => Ok(IN),
            2 => Ok(CS),
            3 => Ok(CH),
            4 => Ok(HS),
            254 => Ok(None),
            255 => Ok(Any),
            x => Err(Error::InvalidClass(x)),
        }
    }

    /// Whether a question of class `self` is satisfied by a record of `class`
    pub fn matches(self, class: Class) -> bool {
        self == Class::Any || self == class
    }
}

impl FromStr for Class {
    type Err = UnknownMnemonic;

    fn from_str(s: &str) -> Result<Class, UnknownMnemonic> {
        match s.to_ascii_uppercase().as_str() {
            "IN" => Ok(Class::IN),
            "CS" => Ok(Class::CS),
            "CH" => Ok(Class::CH),
            "HS" => Ok(Class::HS),
            "NONE" => Ok(Class::None),
            "ANY" => Ok(Class::Any),
            _ => Err(UnknownMnemonic(s.to_owned())),
        }
    }
}

impl Opcode {
    pub fn parse(code: u8) -> Opcode {
        use self::Opcode::*;
        match code {
            0 => StandardQuery,
            1 => InverseQuery,
            2 => ServerStatusRequest,
            4 => Notify,
            5 => Update,
            x => Reserved(x),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(code: Opcode) -> u8 {
        use self::Opcode::*;
        match code {
            StandardQuery => 0,
            InverseQuery => 1,
            ServerStatusRequest => 2,
            Notify => 4,
            Update => 5,
            Reserved(x) => x,
        }
    }
}

impl ResponseCode {
    pub fn parse(code: u8) -> ResponseCode {
        use self::ResponseCode::*;
        match code {
            0 => NoError,
            1 => FormatError,
            2 => ServerFailure,
            3 => NameError,
            4 => NotImplemented,
            5 => Refused,
            x => Reserved(x),
        }
    }
}

impl From<ResponseCode> for u8 {
    fn from(r: ResponseCode) -> u8 {
        use self::ResponseCode::*;
        match r {
            NoError => 0,
            FormatError => 1,
            ServerFailure => 2,
            NameError => 3,
            NotImplemented => 4,
            Refused => 5,
            Reserved(x) => x,
        }
    }
}
