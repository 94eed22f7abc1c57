use std::convert::TryFrom;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::builder::LabelTable;
use super::{DomainName, Error, Name, Type};
use crate::error::Error as CodecError;

/// Start of authority timers and names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Soa {
    pub mname: DomainName,
    pub rname: DomainName,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
}

/// The enumeration that represents known types of DNS resource records data
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
pub enum RRData {
    CNAME(DomainName),
    NS(DomainName),
    PTR(DomainName),
    DNAME(DomainName),
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    SOA(Soa),
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    MX {
        preference: u16,
        exchange: DomainName,
    },
    /// One or more character strings
    TXT(Vec<Vec<u8>>),
    // Anything that has no structured layout here
    Unknown {
        typ: Type,
        data: Vec<u8>,
    },
}

/// Whether `typ` has a dedicated variant in [`RRData`]
pub fn has_structured_rdata(typ: Type) -> bool {
    matches!(
        typ,
        Type::CNAME
            | Type::NS
            | Type::PTR
            | Type::DNAME
            | Type::A
            | Type::AAAA
            | Type::SOA
            | Type::SRV
            | Type::MX
            | Type::TXT
    )
}

fn scan_exact(data: &[u8], original: &[u8]) -> Result<DomainName, Error> {
    let (name, size) = Name::scan(data, original)?;
    if size != data.len() {
        return Err(Error::WrongRdataLength);
    }
    Ok(name.to_domain_name())
}

impl RRData {
    pub fn typ(&self) -> Type {
        match *self {
            RRData::CNAME(..) => Type::CNAME,
            RRData::NS(..) => Type::NS,
            RRData::PTR(..) => Type::PTR,
            RRData::DNAME(..) => Type::DNAME,
            RRData::A(..) => Type::A,
            RRData::AAAA(..) => Type::AAAA,
            RRData::SOA(..) => Type::SOA,
            RRData::SRV { .. } => Type::SRV,
            RRData::MX { .. } => Type::MX,
            RRData::TXT(..) => Type::TXT,
            RRData::Unknown { typ, .. } => typ,
        }
    }

    /// The domain name this record points at, if any
    ///
    /// These are the names whose addresses belong in the additional section.
    pub fn target(&self) -> Option<&DomainName> {
        match *self {
            RRData::NS(ref name) => Some(name),
            RRData::MX { ref exchange, .. } => Some(exchange),
            RRData::SRV { ref target, .. } => Some(target),
            _ => None,
        }
    }

    pub(crate) fn write_to(&self, buf: &mut Vec<u8>, labels: &mut LabelTable) -> Result<(), CodecError> {
        match *self {
            RRData::CNAME(ref name)
            | RRData::NS(ref name)
            | RRData::PTR(ref name)
            | RRData::DNAME(ref name) => labels.write_name(buf, name, true),

            RRData::A(ip) => buf.write_u32::<BigEndian>(ip.into())?,

            RRData::AAAA(ip) => buf.extend_from_slice(&ip.octets()),

            RRData::SOA(ref soa) => {
                labels.write_name(buf, &soa.mname, true);
                labels.write_name(buf, &soa.rname, true);
                for value in &[soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum] {
                    buf.write_u32::<BigEndian>(*value)?;
                }
            }
            RRData::SRV {
                priority,
                weight,
                port,
                ref target,
            } => {
                buf.write_u16::<BigEndian>(priority)?;
                buf.write_u16::<BigEndian>(weight)?;
                buf.write_u16::<BigEndian>(port)?;
                // RFC 2782 forbids compressing the target
                labels.write_name(buf, target, false);
            }
            RRData::MX {
                preference,
                ref exchange,
            } => {
                buf.write_u16::<BigEndian>(preference)?;
                labels.write_name(buf, exchange, true);
            }
            RRData::TXT(ref strings) => {
                for string in strings {
                    let len = u8::try_from(string.len()).map_err(|_| CodecError::ValueOutOfRange {
                        field: "TXT character string length",
                        value: string.len() as i64,
                    })?;
                    buf.push(len);
                    buf.extend_from_slice(string);
                }
            }
            RRData::Unknown { ref data, .. } => buf.extend_from_slice(data),
        }
        Ok(())
    }

    pub fn parse(typ: Type, rdata: &[u8], original: &[u8]) -> Result<RRData, Error> {
        match typ {
            Type::A => {
                if rdata.len() != 4 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::A(Ipv4Addr::from(BigEndian::read_u32(rdata))))
            }
            Type::AAAA => {
                if rdata.len() != 16 {
                    return Err(Error::WrongRdataLength);
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(rdata);
                Ok(RRData::AAAA(Ipv6Addr::from(octets)))
            }
            Type::CNAME => Ok(RRData::CNAME(scan_exact(rdata, original)?)),
            Type::NS => Ok(RRData::NS(scan_exact(rdata, original)?)),
            Type::PTR => Ok(RRData::PTR(scan_exact(rdata, original)?)),
            Type::DNAME => Ok(RRData::DNAME(scan_exact(rdata, original)?)),
            Type::SOA => {
                let (mname, mname_size) = Name::scan(rdata, original)?;
                let (rname, rname_size) = Name::scan(&rdata[mname_size..], original)?;
                let timers = &rdata[mname_size + rname_size..];
                if timers.len() != 20 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::SOA(Soa {
                    mname: mname.to_domain_name(),
                    rname: rname.to_domain_name(),
                    serial: BigEndian::read_u32(&timers[..4]),
                    refresh: BigEndian::read_u32(&timers[4..8]),
                    retry: BigEndian::read_u32(&timers[8..12]),
                    expire: BigEndian::read_u32(&timers[12..16]),
                    minimum: BigEndian::read_u32(&timers[16..20]),
                }))
            }
            Type::MX => {
                if rdata.len() < 3 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::MX {
                    preference: BigEndian::read_u16(&rdata[..2]),
                    exchange: scan_exact(&rdata[2..], original)?,
                })
            }
            Type::SRV => {
                if rdata.len() < 7 {
                    return Err(Error::WrongRdataLength);
                }
                Ok(RRData::SRV {
                    priority: BigEndian::read_u16(&rdata[..2]),
                    weight: BigEndian::read_u16(&rdata[2..4]),
                    port: BigEndian::read_u16(&rdata[4..6]),
                    target: scan_exact(&rdata[6..], original)?,
                })
            }
            Type::TXT => {
                let mut strings = Vec::new();
                let mut pos = 0;
                while pos < rdata.len() {
                    let end = pos + 1 + rdata[pos] as usize;
                    if end > rdata.len() {
                        return Err(Error::WrongRdataLength);
                    }
                    strings.push(rdata[pos + 1..end].to_vec());
                    pos = end;
                }
                Ok(RRData::TXT(strings))
            }
            typ if typ.is_query_only() => Err(Error::InvalidType(typ.code())),
            typ => Ok(RRData::Unknown {
                typ,
                data: rdata.to_vec(),
            }),
        }
    }
}

impl fmt::Display for RRData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            RRData::CNAME(ref name)
            | RRData::NS(ref name)
            | RRData::PTR(ref name)
            | RRData::DNAME(ref name) => write!(f, "{}", name),
            RRData::A(ip) => write!(f, "{}", ip),
            RRData::AAAA(ip) => write!(f, "{}", ip),
            RRData::SOA(ref soa) => write!(
                f,
                "{} {} {} {} {} {} {}",
                soa.mname, soa.rname, soa.serial, soa.refresh, soa.retry, soa.expire, soa.minimum
            ),
            RRData::SRV {
                priority,
                weight,
                port,
                ref target,
            } => write!(f, "{} {} {} {}", priority, weight, port, target),
            RRData::MX {
                preference,
                ref exchange,
            } => write!(f, "{} {}", preference, exchange),
            RRData::TXT(ref strings) => {
                for (i, string) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{:?}", String::from_utf8_lossy(string))?;
                }
                Ok(())
            }
            RRData::Unknown { ref data, .. } => write!(f, "\\# {}", data.len()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn name(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    fn encode(data: &RRData) -> Vec<u8> {
        let mut buf = Vec::new();
        data.write_to(&mut buf, &mut LabelTable::disabled()).unwrap();
        buf
    }

    #[test]
    fn soa_layout() {
        let soa = RRData::SOA(Soa {
            mname: name("example.com."),
            rname: name("postmaster.example.com."),
            serial: 2,
            refresh: 3600,
            retry: 7200,
            expire: 10800,
            minimum: 3600,
        });
        let wire = encode(&soa);
        assert_eq!(wire.len(), 13 + 24 + 20);
        assert_eq!(&wire[37..41], b"\x00\x00\x00\x02");
        assert_eq!(RRData::parse(Type::SOA, &wire, &wire).unwrap(), soa);
    }

    #[test]
    fn srv_layout() {
        let srv = RRData::SRV {
            priority: 1,
            weight: 5,
            port: 389,
            target: name("ldap.example.com."),
        };
        let wire = encode(&srv);
        assert_eq!(&wire[..6], b"\x00\x01\x00\x05\x01\x85");
        assert_eq!(RRData::parse(Type::SRV, &wire, &wire).unwrap(), srv);
    }

    #[test]
    fn txt_strings() {
        let wire = b"\x05hello\x00\x05world";
        let txt = RRData::parse(Type::TXT, wire, wire).unwrap();
        assert_eq!(
            txt,
            RRData::TXT(vec![b"hello".to_vec(), vec![], b"world".to_vec()])
        );
        assert_eq!(&encode(&txt)[..], &wire[..]);
        assert_eq!(txt.to_string(), "\"hello\" \"\" \"world\"");
    }

    #[test]
    fn txt_string_too_long() {
        let txt = RRData::TXT(vec![vec![b'x'; 256]]);
        let mut buf = Vec::new();
        let err = txt
            .write_to(&mut buf, &mut LabelTable::disabled())
            .unwrap_err();
        assert!(matches!(err, CodecError::ValueOutOfRange { value: 256, .. }));
    }

    #[test]
    fn txt_overrun() {
        let wire = b"\x09short";
        assert_eq!(
            RRData::parse(Type::TXT, wire, wire).unwrap_err(),
            Error::WrongRdataLength
        );
    }

    #[test]
    fn wrong_address_length() {
        let wire = b"\x01\x02\x03";
        assert_eq!(
            RRData::parse(Type::A, wire, wire).unwrap_err(),
            Error::WrongRdataLength
        );
        assert_eq!(
            RRData::parse(Type::AAAA, wire, wire).unwrap_err(),
            Error::WrongRdataLength
        );
    }

    #[test]
    fn name_must_fill_rdata() {
        let wire = b"\x03www\x00\xff";
        assert_eq!(
            RRData::parse(Type::CNAME, wire, wire).unwrap_err(),
            Error::WrongRdataLength
        );
    }

    #[test]
    fn unknown_types_are_opaque() {
        let wire = b"\x00\x01\x02";
        assert_eq!(
            RRData::parse(Type::HINFO, wire, wire).unwrap(),
            RRData::Unknown {
                typ: Type::HINFO,
                data: wire.to_vec()
            }
        );
        assert!(RRData::parse(Type::All, wire, wire).is_err());
    }

    #[test]
    fn targets() {
        let mx = RRData::MX {
            preference: 10,
            exchange: name("mail.example.com."),
        };
        assert_eq!(mx.target(), Some(&name("mail.example.com.")));
        assert_eq!(RRData::A(Ipv4Addr::LOCALHOST).target(), None);
    }
}
