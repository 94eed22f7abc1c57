use std::cmp::Ordering;
use std::fmt;
use std::hash;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error as ThisError;

use super::Error;

/// Maximum length of a name in wire format, terminator included
pub const MAX_NAME_LEN: usize = 255;
/// Maximum length of a single label
pub const MAX_LABEL_LEN: usize = 63;

const POINTER_MASK: u8 = 0b1100_0000;

/// The DNS name as stored in the original packet
///
/// This is contains just a reference to a slice that contains the data.
/// You may turn this into a string using `.to_string()`, or into an owned
/// [`DomainName`] using `.to_domain_name()`.
#[derive(Debug, Clone, Copy)]
pub struct Name<'a> {
    labels: &'a [u8],
    /// This is the original buffer. The compressed names in `labels` are
    /// resolved against it
    original: &'a [u8],
}

fn offset_in(original: &[u8], data: &[u8]) -> usize {
    (data.as_ptr() as usize)
        .checked_sub(original.as_ptr() as usize)
        .map_or(original.len(), |offset| offset.min(original.len()))
}

fn is_label_byte(byte: u8) -> bool {
    byte.is_ascii_graphic() && byte != b'.'
}

impl<'a> Name<'a> {
    /// Validates the name at the start of `data` and returns it together
    /// with the number of bytes it occupies in `data`
    ///
    /// `data` must be a subslice of `original`. Every compression pointer
    /// has to point before the start of the label run it terminates, so a
    /// pointer chain always moves backwards through the packet and
    /// terminates.
    pub fn scan(data: &'a [u8], original: &'a [u8]) -> Result<(Name<'a>, usize), Error> {
        let mut cursor = data;
        let mut segment_start = offset_in(original, data);
        let mut pos = 0;
        let mut consumed = None;
        let mut wire_len = 0;
        loop {
            let byte = *cursor.get(pos).ok_or(Error::UnexpectedEOF)?;
            if byte == 0 {
                wire_len += 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(Error::NameTooLong);
                }
                let size = consumed.unwrap_or(pos + 1);
                return Ok((
                    Name {
                        labels: &data[..size],
                        original,
                    },
                    size,
                ));
            } else if byte & POINTER_MASK == POINTER_MASK {
                if cursor.len() < pos + 2 {
                    return Err(Error::UnexpectedEOF);
                }
                let off = (BigEndian::read_u16(&cursor[pos..pos + 2]) & 0x3fff) as usize;
                if off >= segment_start {
                    return Err(Error::BadPointer(segment_start));
                }
                if consumed.is_none() {
                    consumed = Some(pos + 2);
                }
                cursor = original;
                segment_start = off;
                pos = off;
            } else if byte & POINTER_MASK == 0 {
                let end = pos + byte as usize + 1;
                if end >= cursor.len() {
                    return Err(Error::UnexpectedEOF);
                }
                if !cursor[pos + 1..end].iter().all(|&b| is_label_byte(b)) {
                    return Err(Error::LabelIsNotAscii);
                }
                wire_len += byte as usize + 1;
                if wire_len > MAX_NAME_LEN {
                    return Err(Error::NameTooLong);
                }
                pos = end;
            } else {
                return Err(Error::UnknownLabelFormat);
            }
        }
    }

    /// Iterates over the labels, following compression pointers
    pub fn labels(&self) -> Labels<'a> {
        Labels {
            cursor: self.labels,
            original: self.original,
            pos: 0,
        }
    }

    pub fn to_domain_name(&self) -> DomainName {
        let mut text = String::with_capacity(self.labels.len() + 1);
        for label in self.labels() {
            // scan() only lets graphic ascii through
            text.extend(label.iter().map(|&b| b as char));
            text.push('.');
        }
        if text.is_empty() {
            text.push('.');
        }
        DomainName(text.into_boxed_str())
    }
}

/// Iterator over the labels of a [`Name`]
pub struct Labels<'a> {
    cursor: &'a [u8],
    original: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Labels<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        loop {
            let byte = *self.cursor.get(self.pos)?;
            if byte == 0 {
                return None;
            } else if byte & POINTER_MASK == POINTER_MASK {
                let pointer = self.cursor.get(self.pos..self.pos + 2)?;
                self.pos = (BigEndian::read_u16(pointer) & 0x3fff) as usize;
                self.cursor = self.original;
            } else {
                let end = self.pos + byte as usize + 1;
                let label = self.cursor.get(self.pos + 1..end)?;
                self.pos = end;
                return Some(label);
            }
        }
    }
}

impl<'a> fmt::Display for Name<'a> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.to_domain_name(), fmt)
    }
}

impl<'a> PartialEq for Name<'a> {
    fn eq(&self, other: &Name) -> bool {
        self.labels()
            .zip(other.labels())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
            && self.labels().count() == other.labels().count()
    }
}

impl<'a> Eq for Name<'a> {}

/// Error building a [`DomainName`] from text
#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("domain name is empty")]
    Empty,
    #[error("domain name {0:?} contains an empty label")]
    EmptyLabel(String),
    #[error("label {0:?} is longer than 63 octets")]
    LabelTooLong(String),
    #[error("domain name {0:?} is longer than 255 octets")]
    NameTooLong(String),
    #[error("domain name {0:?} contains invalid character {1:?}")]
    InvalidCharacter(String, char),
}

/// Owned, validated, fully-qualified domain name
///
/// The text is kept as given (always with a trailing dot) so it can be
/// echoed back to clients. Equality, hashing and ordering ignore ASCII case.
#[derive(Clone)]
pub struct DomainName(Box<str>);

impl DomainName {
    pub fn parse(text: &str) -> Result<DomainName, NameError> {
        if text.is_empty() {
            return Err(NameError::Empty);
        }
        if text == "." {
            return Ok(DomainName::root());
        }
        let relative = text.strip_suffix('.').unwrap_or(text);
        let mut wire_len = 1;
        for label in relative.split('.') {
            if label.is_empty() {
                return Err(NameError::EmptyLabel(text.to_owned()));
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(NameError::LabelTooLong(label.to_owned()));
            }
            if let Some(c) = label.chars().find(|&c| !c.is_ascii() || !is_label_byte(c as u8)) {
                return Err(NameError::InvalidCharacter(text.to_owned(), c));
            }
            wire_len += label.len() + 1;
        }
        if wire_len > MAX_NAME_LEN {
            return Err(NameError::NameTooLong(text.to_owned()));
        }
        Ok(DomainName(format!("{}.", relative).into_boxed_str()))
    }

    pub fn root() -> DomainName {
        DomainName(".".into())
    }

    /// Resolves a zone-file style name against `origin`
    ///
    /// `@` is the origin itself, a name with a trailing dot is absolute and
    /// anything else is relative to the origin.
    pub fn resolve_relative(name: &str, origin: &DomainName) -> Result<DomainName, NameError> {
        if name == "@" {
            Ok(origin.clone())
        } else if name.ends_with('.') {
            DomainName::parse(name)
        } else if origin.is_root() {
            DomainName::parse(&format!("{}.", name))
        } else {
            DomainName::parse(&format!("{}.{}", name, origin))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        &*self.0 == "."
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        let relative = if self.is_root() {
            ""
        } else {
            &self.0[..self.0.len() - 1]
        };
        relative.split('.').filter(|label| !label.is_empty())
    }

    /// Length of the uncompressed wire representation
    pub fn wire_len(&self) -> usize {
        self.labels().map(|label| label.len() + 1).sum::<usize>() + 1
    }

    /// True iff the first label is literally `*`
    pub fn is_wildcard(&self) -> bool {
        self.labels().next() == Some("*")
    }

    pub fn parent(&self) -> Option<DomainName> {
        if self.is_root() {
            return None;
        }
        let rest = match self.0.find('.') {
            Some(idx) => &self.0[idx + 1..],
            None => "",
        };
        if rest.is_empty() {
            Some(DomainName::root())
        } else {
            Some(DomainName(rest.into()))
        }
    }

    /// Proper ancestors from the closest to the root (included)
    pub fn ancestors(&self) -> impl Iterator<Item = DomainName> {
        std::iter::successors(self.parent(), DomainName::parent)
    }

    /// True iff `ancestor` is this name or one of its ancestors
    pub fn is_subdomain_of(&self, ancestor: &DomainName) -> bool {
        if ancestor.is_root() {
            return true;
        }
        let this = self.0.as_bytes();
        let suffix = ancestor.0.as_bytes();
        if this.len() < suffix.len() {
            return false;
        }
        let split = this.len() - suffix.len();
        this[split..].eq_ignore_ascii_case(suffix) && (split == 0 || this[split - 1] == b'.')
    }

    pub fn prepend_label(&self, label: &str) -> Result<DomainName, NameError> {
        DomainName::resolve_relative(label, self)
    }

    /// Lower-cased copy, the form used as a lookup key
    pub fn canonical(&self) -> DomainName {
        DomainName(self.0.to_ascii_lowercase().into_boxed_str())
    }
}

impl FromStr for DomainName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<DomainName, NameError> {
        DomainName::parse(s)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &DomainName) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for DomainName {}

impl hash::Hash for DomainName {
    fn hash<H: hash::Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            state.write_u8(byte.to_ascii_lowercase());
        }
    }
}

impl Ord for DomainName {
    fn cmp(&self, other: &DomainName) -> Ordering {
        self.0
            .bytes()
            .map(|b| b.to_ascii_lowercase())
            .cmp(other.0.bytes().map(|b| b.to_ascii_lowercase()))
    }
}

impl PartialOrd for DomainName {
    fn partial_cmp(&self, other: &DomainName) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
