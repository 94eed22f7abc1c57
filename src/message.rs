//! Whole DNS messages with every section as [`ResourceRecord`]s

use std::convert::TryFrom;

use byteorder::{BigEndian, ByteOrder};

use crate::dns_parser::{self, Builder, Header, Opcode, OptRecord, Packet, ResponseCode};
use crate::error::Error;
use crate::record::ResourceRecord;

/// A decoded DNS message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Flags and id; the section counts are recomputed on encode
    pub header: Header,
    pub questions: Vec<ResourceRecord>,
    pub answers: Vec<ResourceRecord>,
    pub authority: Vec<ResourceRecord>,
    pub additional: Vec<ResourceRecord>,
    pub edns: Option<OptRecord>,
}

/// Transaction id of a buffer, whether or not it decodes
pub fn peek_id(data: &[u8]) -> u16 {
    if data.len() < 2 {
        0
    } else {
        BigEndian::read_u16(&data[..2])
    }
}

fn convert_section(records: Vec<dns_parser::ResourceRecord>) -> Vec<ResourceRecord> {
    records
        .into_iter()
        .map(|rr| {
            // TTLs with the top bit set are read as zero (RFC 2181 section 8)
            let ttl = i32::try_from(rr.ttl).unwrap_or(0);
            ResourceRecord::answer(rr.name.to_domain_name(), rr.cls, ttl, rr.data)
        })
        .collect()
}

fn wire_ttl(record: &ResourceRecord) -> Result<u32, Error> {
    let ttl = record.ttl().unwrap_or(0);
    u32::try_from(ttl).map_err(|_| Error::ValueOutOfRange {
        field: "TTL",
        value: i64::from(ttl),
    })
}

impl Message {
    /// An empty query with a single question
    pub fn query(id: u16, question: ResourceRecord) -> Message {
        let mut header = Header::new(id, true, Opcode::StandardQuery);
        header.recursion_desired = true;
        Message {
            header,
            questions: vec![question],
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
        }
    }

    /// Header-only reply carrying `rcode`, used when a query cannot be
    /// answered at all
    pub fn error_response(id: u16, opcode: Opcode, rcode: ResponseCode) -> Message {
        let mut header = Header::new(id, false, opcode);
        header.response_code = rcode;
        Message {
            header,
            questions: Vec::new(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
        }
    }

    /// Empty response echoing the id, opcode, questions and RD/CD flags of
    /// `query`
    pub fn response_to(query: &Message) -> Message {
        let mut header = Header::new(query.header.id, false, query.header.opcode);
        header.recursion_desired = query.header.recursion_desired;
        header.checking_disabled = query.header.checking_disabled;
        Message {
            header,
            questions: query.questions.clone(),
            answers: Vec::new(),
            authority: Vec::new(),
            additional: Vec::new(),
            edns: None,
        }
    }

    /// Decodes one DNS message
    ///
    /// Any violation of the wire format fails with
    /// [`Error::MalformedMessage`]; nothing is returned for a partially
    /// readable message.
    pub fn decode(data: &[u8]) -> Result<Message, Error> {
        let packet = Packet::parse(data)?;
        let questions = packet
            .questions
            .iter()
            .map(|q| ResourceRecord::question(q.qname.to_domain_name(), q.qtype, q.qclass))
            .collect();
        Ok(Message {
            header: packet.header,
            questions,
            answers: convert_section(packet.answers),
            authority: convert_section(packet.nameservers),
            additional: convert_section(packet.additional),
            edns: packet.opt,
        })
    }

    /// Encodes the message, at most `max_size` bytes long
    ///
    /// A message that does not fit keeps its question section only and has
    /// the TC bit set.
    pub fn encode(&self, max_size: Option<usize>) -> Result<Vec<u8>, Error> {
        let mut builder = Builder::with_header(self.header);
        builder.set_max_size(max_size);
        for question in &self.questions {
            builder = builder.add_question(question.name(), question.rtype(), question.class())?;
        }
        let mut builder = builder.move_to::<dns_parser::Answers>();
        for answer in &self.answers {
            builder = builder.add_answer(answer.name(), answer.class(), wire_ttl(answer)?, rdata_of(answer)?)?;
        }
        let mut builder = builder.move_to::<dns_parser::Nameservers>();
        for record in &self.authority {
            builder =
                builder.add_nameserver(record.name(), record.class(), wire_ttl(record)?, rdata_of(record)?)?;
        }
        let mut builder = builder.move_to::<dns_parser::Additional>();
        for record in &self.additional {
            builder =
                builder.add_additional(record.name(), record.class(), wire_ttl(record)?, rdata_of(record)?)?;
        }
        if let Some(opt) = self.edns {
            builder = builder.add_opt(opt.udp, opt.dnssec_ok())?;
        }
        Ok(builder.build().unwrap_or_else(|truncated| truncated))
    }
}

fn rdata_of(record: &ResourceRecord) -> Result<&dns_parser::RRData, Error> {
    record
        .rdata()
        .ok_or_else(|| Error::UnsupportedType(format!("question {} in a record section", record)))
}
