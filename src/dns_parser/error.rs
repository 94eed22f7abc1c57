use thiserror::Error;

/// Error parsing DNS packet
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("packet is smaller than header size")]
    HeaderTooShort,
    #[error("packet is has incomplete data")]
    UnexpectedEOF,
    #[error("wrong (too short or too long) size of RDATA")]
    WrongRdataLength,
    #[error("packet has non-zero reserved bits")]
    ReservedBitsAreNonZero,
    #[error("label in domain name has unknown label format")]
    UnknownLabelFormat,
    #[error("compression pointer at offset {0} does not point backwards")]
    BadPointer(usize),
    #[error("domain name is longer than 255 octets")]
    NameTooLong,
    #[error("type {0} is invalid")]
    InvalidType(u16),
    #[error("class {0} is invalid")]
    InvalidClass(u16),
    #[error("opcode {0} is invalid")]
    InvalidOpcode(u8),
    #[error("invalid characters encountered while reading label")]
    LabelIsNotAscii,
    #[error("more than one OPT record in packet")]
    DuplicateOpt,
    #[error("{0} bytes of trailing data after last record")]
    TrailingData(usize),
}
