use std::cmp;

use byteorder::{BigEndian, ByteOrder};

use super::header::HEADER_SIZE;
use super::{Class, Error, Header, Name, OptRecord, Packet, Question, RRData, ResourceRecord, Type};

/// Fixed part of a resource record following its name
const RR_FIXED_SIZE: usize = 10;
/// Root name plus type and class
const MIN_QUESTION_SIZE: usize = 5;
/// Root name plus the fixed part
const MIN_RECORD_SIZE: usize = 1 + RR_FIXED_SIZE;

struct RawRecord<'a> {
    name: Name<'a>,
    typ: Type,
    cls: u16,
    ttl: u32,
    rdata: &'a [u8],
}

impl<'a> Packet<'a> {
    /// Parse a full DNS Packet and return a structure that has all the
    /// data borrowed from the passed buffer.
    pub fn parse(data: &[u8]) -> Result<Packet<'_>, Error> {
        let header = Header::parse(data)?;
        let mut offset = HEADER_SIZE;

        let mut questions = Vec::with_capacity(capacity(header.questions, data.len() - offset, MIN_QUESTION_SIZE));
        for _ in 0..header.questions {
            let (qname, size) = Name::scan(&data[offset..], data)?;
            offset += size;
            if offset + 4 > data.len() {
                return Err(Error::UnexpectedEOF);
            }
            // unknown question types are answered, not rejected
            let qtype = Type::from_code(BigEndian::read_u16(&data[offset..offset + 2]));
            let qclass = Class::parse(BigEndian::read_u16(&data[offset + 2..offset + 4]))?;
            offset += 4;
            questions.push(Question {
                qname,
                qtype,
                qclass,
            });
        }

        let mut answers = Vec::with_capacity(capacity(header.answers, data.len() - offset, MIN_RECORD_SIZE));
        for _ in 0..header.answers {
            answers.push(parse_record(data, &mut offset)?);
        }

        let mut nameservers = Vec::with_capacity(capacity(header.nameservers, data.len() - offset, MIN_RECORD_SIZE));
        for _ in 0..header.nameservers {
            nameservers.push(parse_record(data, &mut offset)?);
        }

        let mut additional = Vec::with_capacity(capacity(header.additional, data.len() - offset, MIN_RECORD_SIZE));
        let mut opt = None;
        for _ in 0..header.additional {
            let raw = scan_record(data, &mut offset)?;
            if raw.typ == Type::OPT {
                if opt.is_some() {
                    return Err(Error::DuplicateOpt);
                }
                opt = Some(parse_opt_record(&raw)?);
            } else {
                additional.push(finish_record(raw, data)?);
            }
        }

        if offset != data.len() {
            return Err(Error::TrailingData(data.len() - offset));
        }

        Ok(Packet {
            header,
            questions,
            answers,
            nameservers,
            additional,
            opt,
        })
    }
}

/// Header counts are untrusted; never reserve more entries than the
/// remaining bytes could hold
fn capacity(count: u16, remaining: usize, min_size: usize) -> usize {
    cmp::min(usize::from(count), remaining / min_size)
}

fn scan_record<'a>(data: &'a [u8], offset: &mut usize) -> Result<RawRecord<'a>, Error> {
    let (name, size) = Name::scan(&data[*offset..], data)?;
    *offset += size;
    if *offset + RR_FIXED_SIZE > data.len() {
        return Err(Error::UnexpectedEOF);
    }
    let fixed = &data[*offset..*offset + RR_FIXED_SIZE];
    let typ = Type::parse(BigEndian::read_u16(&fixed[0..2]))?;
    let cls = BigEndian::read_u16(&fixed[2..4]);
    let ttl = BigEndian::read_u32(&fixed[4..8]);
    let rdlen = BigEndian::read_u16(&fixed[8..10]) as usize;
    *offset += RR_FIXED_SIZE;
    if *offset + rdlen > data.len() {
        return Err(Error::UnexpectedEOF);
    }
    let rdata = &data[*offset..*offset + rdlen];
    *offset += rdlen;
    Ok(RawRecord {
        name,
        typ,
        cls,
        ttl,
        rdata,
    })
}

fn finish_record<'a>(raw: RawRecord<'a>, data: &'a [u8]) -> Result<ResourceRecord<'a>, Error> {
    if raw.typ == Type::OPT {
        return Err(Error::InvalidType(Type::OPT.code()));
    }
    Ok(ResourceRecord {
        name: raw.name,
        cls: Class::parse(raw.cls)?,
        ttl: raw.ttl,
        data: RRData::parse(raw.typ, raw.rdata, data)?,
    })
}

fn parse_record<'a>(data: &'a [u8], offset: &mut usize) -> Result<ResourceRecord<'a>, Error> {
    let raw = scan_record(data, offset)?;
    finish_record(raw, data)
}

fn parse_opt_record(raw: &RawRecord) -> Result<OptRecord, Error> {
    if raw.name.labels().next().is_some() {
        return Err(Error::UnknownLabelFormat);
    }
    Ok(OptRecord {
        udp: raw.cls,
        extrcode: (raw.ttl >> 24) as u8,
        version: (raw.ttl >> 16) as u8,
        flags: raw.ttl as u16,
    })
}
