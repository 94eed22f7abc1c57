use std::collections::HashMap;
use std::convert::TryFrom;
use std::marker::PhantomData;

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use super::header::HEADER_SIZE;
use super::{Class, DomainName, Header, Opcode, RRData, Type};
use crate::error::Error;

pub enum Questions {}
pub enum Answers {}
pub enum Nameservers {}
pub enum Additional {}

pub trait MoveTo<T> {}
impl<T> MoveTo<T> for T {}

impl MoveTo<Answers> for Questions {}

impl MoveTo<Nameservers> for Questions {}
impl MoveTo<Nameservers> for Answers {}

impl MoveTo<Additional> for Questions {}
impl MoveTo<Additional> for Answers {}
impl MoveTo<Additional> for Nameservers {}

/// Offsets of names already written to a packet, keyed by lower-cased suffix
pub(crate) struct LabelTable {
    offsets: Option<HashMap<String, u16>>,
}

/// Pointers can only address the first 16k of a packet
const MAX_POINTER_OFFSET: usize = 0x3fff;

impl LabelTable {
    pub(crate) fn new() -> LabelTable {
        LabelTable {
            offsets: Some(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn disabled() -> LabelTable {
        LabelTable { offsets: None }
    }

    /// Writes `name` at the end of `buf`
    ///
    /// With `compress` the longest suffix already present in the packet is
    /// replaced by a pointer. Suffixes written here are remembered either way.
    pub(crate) fn write_name(&mut self, buf: &mut Vec<u8>, name: &DomainName, compress: bool) {
        let labels: Vec<&str> = name.labels().collect();
        for i in 0..labels.len() {
            if let Some(ref mut offsets) = self.offsets {
                let suffix = labels[i..].join(".").to_ascii_lowercase();
                if compress {
                    if let Some(&offset) = offsets.get(&suffix) {
                        buf.extend_from_slice(&(0xc000 | offset).to_be_bytes());
                        return;
                    }
                }
                if buf.len() <= MAX_POINTER_OFFSET {
                    offsets.entry(suffix).or_insert(buf.len() as u16);
                }
            }
            buf.push(labels[i].len() as u8);
            buf.extend_from_slice(labels[i].as_bytes());
        }
        buf.push(0);
    }
}

/// Allows to build a DNS packet
///
/// Both query and answer packets may be built with this interface. Sections
/// have to be filled in order, which the type parameter enforces.
pub struct Builder<S> {
    buf: Vec<u8>,
    max_size: Option<usize>,
    labels: LabelTable,
    questions_end: usize,
    /// encoded OPT record, carried over when the packet is truncated
    opt: Option<Vec<u8>>,
    _state: PhantomData<S>,
}

impl Builder<Questions> {
    /// Creates a new query
    ///
    /// Initially all sections are empty. You're expected to fill
    /// the questions section with `add_question`
    pub fn new_query(id: u16, recursion: bool) -> Builder<Questions> {
        let mut head = Header::new(id, true, Opcode::StandardQuery);
        head.recursion_desired = recursion;
        Builder::with_header(head)
    }

    pub fn new_response(id: u16, recursion: bool, authoritative: bool) -> Builder<Questions> {
        let mut head = Header::new(id, false, Opcode::StandardQuery);
        head.recursion_desired = recursion;
        head.authoritative = authoritative;
        Builder::with_header(head)
    }

    /// Starts a packet with the flags of `head`; its section counts are
    /// ignored and maintained by the builder instead
    pub fn with_header(mut head: Header) -> Builder<Questions> {
        head.questions = 0;
        head.answers = 0;
        head.nameservers = 0;
        head.additional = 0;
        let mut buf = Vec::with_capacity(512);
        buf.extend([0u8; HEADER_SIZE].iter());
        head.write(&mut buf[..HEADER_SIZE]);
        Builder {
            buf,
            max_size: Some(512),
            labels: LabelTable::new(),
            questions_end: HEADER_SIZE,
            opt: None,
            _state: PhantomData,
        }
    }
}

fn too_many(section: &'static str) -> Error {
    Error::ValueOutOfRange {
        field: section,
        value: i64::from(u16::MAX) + 1,
    }
}

impl<T> Builder<T> {
    fn write_rr(&mut self, name: &DomainName, cls: Class, ttl: u32, data: &RRData) -> Result<(), Error> {
        self.labels.write_name(&mut self.buf, name, true);
        self.buf.write_u16::<BigEndian>(data.typ().code())?;
        self.buf.write_u16::<BigEndian>(cls as u16)?;
        self.buf.write_u32::<BigEndian>(ttl)?;

        let size_offset = self.buf.len();
        self.buf.write_u16::<BigEndian>(0)?;

        let data_offset = self.buf.len();
        data.write_to(&mut self.buf, &mut self.labels)?;
        let data_size = self.buf.len() - data_offset;

        let data_size = u16::try_from(data_size).map_err(|_| Error::ValueOutOfRange {
            field: "RDLENGTH",
            value: data_size as i64,
        })?;
        BigEndian::write_u16(&mut self.buf[size_offset..size_offset + 2], data_size);
        Ok(())
    }

    /// Returns the final packet
    ///
    /// When packet is not truncated method returns `Ok(packet)`. If
    /// packet exceeds the maximum size, every record after the question
    /// section is dropped except the OPT record, the TC bit is set and the
    /// method returns `Err(packet)`. In both cases the packet is fully valid.
    ///
    /// In the server implementation you may use
    /// `x.build().unwrap_or_else(|x| x)`.
    pub fn build(mut self) -> Result<Vec<u8>, Vec<u8>> {
        match self.max_size {
            Some(max_size) if self.buf.len() > max_size => {
                self.buf.truncate(self.questions_end);
                Header::clear_record_counts(&mut self.buf[..HEADER_SIZE]);
                Header::set_truncated(&mut self.buf[..HEADER_SIZE]);
                if let Some(opt) = self.opt {
                    self.buf.extend_from_slice(&opt);
                    // counts were just cleared, so this cannot overflow
                    let _ = Header::inc_additional(&mut self.buf);
                }
                Err(self.buf)
            }
            _ => Ok(self.buf),
        }
    }

    pub fn move_to<U>(self) -> Builder<U>
    where
        T: MoveTo<U>,
    {
        Builder {
            buf: self.buf,
            max_size: self.max_size,
            labels: self.labels,
            questions_end: self.questions_end,
            opt: self.opt,
            _state: PhantomData,
        }
    }

    pub fn set_max_size(&mut self, max_size: Option<usize>) {
        self.max_size = max_size;
    }

    pub fn is_empty(&self) -> bool {
        Header::question_count(&self.buf) == 0
            && Header::answer_count(&self.buf) == 0
            && Header::nameserver_count(&self.buf) == 0
            && Header::additional_count(&self.buf) == 0
    }
}

impl<T: MoveTo<Questions>> Builder<T> {
    /// Adds a question to the packet
    pub fn add_question(
        self,
        qname: &DomainName,
        qtype: Type,
        qclass: Class,
    ) -> Result<Builder<Questions>, Error> {
        let mut builder = self.move_to::<Questions>();

        builder.labels.write_name(&mut builder.buf, qname, true);
        builder.buf.write_u16::<BigEndian>(qtype.code())?;
        builder.buf.write_u16::<BigEndian>(qclass as u16)?;
        Header::inc_questions(&mut builder.buf).ok_or_else(|| too_many("QDCOUNT"))?;
        builder.questions_end = builder.buf.len();
        Ok(builder)
    }
}

impl<T: MoveTo<Answers>> Builder<T> {
    pub fn add_answer(
        self,
        name: &DomainName,
        cls: Class,
        ttl: u32,
        data: &RRData,
    ) -> Result<Builder<Answers>, Error> {
        let mut builder = self.move_to::<Answers>();

        builder.write_rr(name, cls, ttl, data)?;
        Header::inc_answers(&mut builder.buf).ok_or_else(|| too_many("ANCOUNT"))?;

        Ok(builder)
    }
}

impl<T: MoveTo<Nameservers>> Builder<T> {
    pub fn add_nameserver(
        self,
        name: &DomainName,
        cls: Class,
        ttl: u32,
        data: &RRData,
    ) -> Result<Builder<Nameservers>, Error> {
        let mut builder = self.move_to::<Nameservers>();

        builder.write_rr(name, cls, ttl, data)?;
        Header::inc_nameservers(&mut builder.buf).ok_or_else(|| too_many("NSCOUNT"))?;

        Ok(builder)
    }
}

impl<T: MoveTo<Additional>> Builder<T> {
    pub fn add_additional(
        self,
        name: &DomainName,
        cls: Class,
        ttl: u32,
        data: &RRData,
    ) -> Result<Builder<Additional>, Error> {
        let mut builder = self.move_to::<Additional>();

        builder.write_rr(name, cls, ttl, data)?;
        Header::inc_additional(&mut builder.buf).ok_or_else(|| too_many("ARCOUNT"))?;

        Ok(builder)
    }

    /// Adds an EDNS0 OPT pseudo-record with no options (RFC 6891)
    pub fn add_opt(self, udp_size: u16, dnssec_ok: bool) -> Result<Builder<Additional>, Error> {
        let mut builder = self.move_to::<Additional>();

        let mut opt = Vec::with_capacity(11);
        opt.push(0);
        opt.write_u16::<BigEndian>(Type::OPT.code())?;
        opt.write_u16::<BigEndian>(udp_size)?;
        let flags: u32 = if dnssec_ok { 0x8000 } else { 0 };
        opt.write_u32::<BigEndian>(flags)?;
        opt.write_u16::<BigEndian>(0)?;
        builder.buf.extend_from_slice(&opt);
        builder.opt = Some(opt);
        Header::inc_additional(&mut builder.buf).ok_or_else(|| too_many("ARCOUNT"))?;

        Ok(builder)
    }
}
