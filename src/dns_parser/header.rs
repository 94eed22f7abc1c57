use byteorder::{BigEndian, ByteOrder};

use super::{Error, Opcode, ResponseCode};

mod flag {
    pub const QUERY: u16 = 0b1000_0000_0000_0000;
    pub const OPCODE_MASK: u16 = 0b0111_1000_0000_0000;
    pub const AUTHORITATIVE: u16 = 0b0000_0100_0000_0000;
    pub const TRUNCATED: u16 = 0b0000_0010_0000_0000;
    pub const RECURSION_DESIRED: u16 = 0b0000_0001_0000_0000;
    pub const RECURSION_AVAILABLE: u16 = 0b0000_0000_1000_0000;
    pub const RESERVED_MASK: u16 = 0b0000_0000_0100_0000;
    pub const AUTHENTICATED_DATA: u16 = 0b0000_0000_0010_0000;
    pub const CHECKING_DISABLED: u16 = 0b0000_0000_0001_0000;
    pub const RESPONSE_CODE_MASK: u16 = 0b0000_0000_0000_1111;
}

/// Represents parsed header of the packet
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Header {
    pub id: u16,
    pub query: bool,
    pub opcode: Opcode,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub authenticated_data: bool,
    pub checking_disabled: bool,
    pub response_code: ResponseCode,
    pub questions: u16,
    pub answers: u16,
    pub nameservers: u16,
    pub additional: u16,
}

pub const HEADER_SIZE: usize = 12;

impl Header {
    /// A header with every flag cleared and zero counts
    pub fn new(id: u16, query: bool, opcode: Opcode) -> Header {
        Header {
            id,
            query,
            opcode,
            authoritative: false,
            truncated: false,
            recursion_desired: false,
            recursion_available: false,
            authenticated_data: false,
            checking_disabled: false,
            response_code: ResponseCode::NoError,
            questions: 0,
            answers: 0,
            nameservers: 0,
            additional: 0,
        }
    }

    pub fn parse(data: &[u8]) -> Result<Header, Error> {
        if data.len() < HEADER_SIZE {
            return Err(Error::HeaderTooShort);
        }
        let flags = BigEndian::read_u16(&data[2..4]);
        if flags & flag::RESERVED_MASK != 0 {
            return Err(Error::ReservedBitsAreNonZero);
        }
        let header = Header {
            id: BigEndian::read_u16(&data[..2]),
            query: flags & flag::QUERY == 0,
            opcode: Opcode::parse(((flags & flag::OPCODE_MASK) >> flag::OPCODE_MASK.trailing_zeros()) as u8),
            authoritative: flags & flag::AUTHORITATIVE != 0,
            truncated: flags & flag::TRUNCATED != 0,
            recursion_desired: flags & flag::RECURSION_DESIRED != 0,
            recursion_available: flags & flag::RECURSION_AVAILABLE != 0,
            authenticated_data: flags & flag::AUTHENTICATED_DATA != 0,
            checking_disabled: flags & flag::CHECKING_DISABLED != 0,
            response_code: ResponseCode::parse((flags & flag::RESPONSE_CODE_MASK) as u8),
            questions: BigEndian::read_u16(&data[4..6]),
            answers: BigEndian::read_u16(&data[6..8]),
            nameservers: BigEndian::read_u16(&data[8..10]),
            additional: BigEndian::read_u16(&data[10..12]),
        };
        Ok(header)
    }

    /// Write a header to a buffer slice
    ///
    /// # Panics
    ///
    /// When buffer size is not exactly 12 bytes
    pub fn write(&self, data: &mut [u8]) {
        if data.len() != HEADER_SIZE {
            panic!("Header size is exactly 12 bytes");
        }
        let mut flags = 0u16;
        flags |= (u16::from(u8::from(self.opcode)) << flag::OPCODE_MASK.trailing_zeros())
            & flag::OPCODE_MASK;
        flags |= u16::from(u8::from(self.response_code)) & flag::RESPONSE_CODE_MASK;
        if !self.query {
            flags |= flag::QUERY;
        }
        if self.authoritative {
            flags |= flag::AUTHORITATIVE;
        }
        if self.recursion_desired {
            flags |= flag::RECURSION_DESIRED;
        }
        if self.recursion_available {
            flags |= flag::RECURSION_AVAILABLE;
        }
        if self.truncated {
            flags |= flag::TRUNCATED;
        }
        if self.authenticated_data {
            flags |= flag::AUTHENTICATED_DATA;
        }
        if self.checking_disabled {
            flags |= flag::CHECKING_DISABLED;
        }
        BigEndian::write_u16(&mut data[..2], self.id);
        BigEndian::write_u16(&mut data[2..4], flags);
        BigEndian::write_u16(&mut data[4..6], self.questions);
        BigEndian::write_u16(&mut data[6..8], self.answers);
        BigEndian::write_u16(&mut data[8..10], self.nameservers);
        BigEndian::write_u16(&mut data[10..12], self.additional);
    }

    pub fn set_truncated(data: &mut [u8]) {
        let oldflags = BigEndian::read_u16(&data[2..4]);
        BigEndian::write_u16(&mut data[2..4], oldflags | flag::TRUNCATED);
    }

    pub fn question_count(data: &[u8]) -> u16 {
        BigEndian::read_u16(&data[4..6])
    }

    pub fn answer_count(data: &[u8]) -> u16 {
        BigEndian::read_u16(&data[6..8])
    }

    pub fn nameserver_count(data: &[u8]) -> u16 {
        BigEndian::read_u16(&data[8..10])
    }

    pub fn additional_count(data: &[u8]) -> u16 {
        BigEndian::read_u16(&data[10..12])
    }

    /// Zero the answer, authority and additional counts
    pub fn clear_record_counts(data: &mut [u8]) {
        for byte in &mut data[6..12] {
            *byte = 0;
        }
    }

    pub(crate) fn inc_questions(data: &mut [u8]) -> Option<u16> {
        Header::inc_count(&mut data[4..6])
    }

    pub(crate) fn inc_answers(data: &mut [u8]) -> Option<u16> {
        Header::inc_count(&mut data[6..8])
    }

    pub(crate) fn inc_nameservers(data: &mut [u8]) -> Option<u16> {
        Header::inc_count(&mut data[8..10])
    }

    pub(crate) fn inc_additional(data: &mut [u8]) -> Option<u16> {
        Header::inc_count(&mut data[10..12])
    }

    fn inc_count(counter: &mut [u8]) -> Option<u16> {
        let count = BigEndian::read_u16(counter).checked_add(1)?;
        BigEndian::write_u16(counter, count);
        Some(count)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_example_query() {
        let query = b"\x06%\x01\x00\x00\x01\x00\x00\x00\x00\x00\x00\
                      \x07example\x03com\x00\x00\x01\x00\x01";
        let header = Header::parse(query).unwrap();
        assert_eq!(header.id, 1573);
        assert!(header.query);
        assert_eq!(header.opcode, Opcode::StandardQuery);
        assert!(header.recursion_desired);
        assert!(!header.authoritative);
        assert_eq!(header.response_code, ResponseCode::NoError);
        assert_eq!(header.questions, 1);
        assert_eq!(header.answers, 0);
    }

    #[test]
    fn parse_dig_query_with_ad_flag() {
        let query = b"\x1b\x3a\x01\x20\x00\x01\x00\x00\x00\x00\x00\x01";
        let header = Header::parse(query).unwrap();
        assert!(header.authenticated_data);
        assert_eq!(header.additional, 1);
    }

    #[test]
    fn reserved_bit() {
        let query = b"\x00\x01\x01\x40\x00\x01\x00\x00\x00\x00\x00\x00";
        assert_eq!(Header::parse(query), Err(Error::ReservedBitsAreNonZero));
    }

    #[test]
    fn short_header() {
        assert_eq!(Header::parse(b"\x00\x01\x01"), Err(Error::HeaderTooShort));
    }

    #[test]
    fn write_then_parse() {
        let mut header = Header::new(0xbeef, false, Opcode::StandardQuery);
        header.authoritative = true;
        header.recursion_desired = true;
        header.response_code = ResponseCode::NameError;
        header.answers = 3;
        let mut buf = [0u8; HEADER_SIZE];
        header.write(&mut buf);
        assert_eq!(&buf[..4], b"\xbe\xef\x85\x03");
        assert_eq!(Header::parse(&buf).unwrap(), header);
    }

    #[test]
    fn counters_saturate() {
        let mut buf = [0u8; HEADER_SIZE];
        buf[6] = 0xff;
        buf[7] = 0xff;
        assert_eq!(Header::inc_answers(&mut buf), None);
        assert_eq!(Header::inc_questions(&mut buf), Some(1));
    }
}
