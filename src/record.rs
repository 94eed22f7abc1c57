use std::fmt;

use crate::dns_parser::{has_structured_rdata, Class, DomainName, RRData, Type};
use crate::error::Error;

/// What a record carries beyond its name, type and class
#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Question,
    Answer { ttl: i32, rdata: RRData },
}

/// A question entry or an answer entry
///
/// Questions carry no ttl and no rdata; answers always carry both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    name: DomainName,
    rtype: Type,
    class: Class,
    payload: Payload,
}

impl ResourceRecord {
    pub fn question(name: DomainName, rtype: Type, class: Class) -> ResourceRecord {
        ResourceRecord {
            name,
            rtype,
            class,
            payload: Payload::Question,
        }
    }

    /// Answer whose type is the one of `rdata`
    pub fn answer(name: DomainName, class: Class, ttl: i32, rdata: RRData) -> ResourceRecord {
        ResourceRecord {
            name,
            rtype: rdata.typ(),
            class,
            payload: Payload::Answer { ttl, rdata },
        }
    }

    /// Answer with an explicitly declared type
    ///
    /// Fails when the rdata shape is not the one `rtype` defines, including
    /// opaque rdata for a type that has a structured layout.
    pub fn try_answer(
        name: DomainName,
        rtype: Type,
        class: Class,
        ttl: i32,
        rdata: RRData,
    ) -> Result<ResourceRecord, Error> {
        let opaque_structured =
            matches!(rdata, RRData::Unknown { typ, .. } if has_structured_rdata(typ));
        if rdata.typ() != rtype || opaque_structured || rtype.is_query_only() {
            return Err(Error::RdataMismatch {
                declared: rtype,
                rdata: rdata.typ(),
            });
        }
        Ok(ResourceRecord::answer(name, class, ttl, rdata))
    }

    pub fn name(&self) -> &DomainName {
        &self.name
    }

    pub fn rtype(&self) -> Type {
        self.rtype
    }

    pub fn class(&self) -> Class {
        self.class
    }

    pub fn is_question(&self) -> bool {
        self.payload == Payload::Question
    }

    pub fn ttl(&self) -> Option<i32> {
        match self.payload {
            Payload::Question => None,
            Payload::Answer { ttl, .. } => Some(ttl),
        }
    }

    pub fn rdata(&self) -> Option<&RRData> {
        match self.payload {
            Payload::Question => None,
            Payload::Answer { ref rdata, .. } => Some(rdata),
        }
    }

    /// Copy of this record owned by `name`
    pub fn with_name(&self, name: DomainName) -> ResourceRecord {
        ResourceRecord {
            name,
            rtype: self.rtype,
            class: self.class,
            payload: self.payload.clone(),
        }
    }

    /// Whether this record answers `question` (ANY type/class match all)
    pub fn answers(&self, question: &ResourceRecord) -> bool {
        !self.is_question()
            && (question.rtype == Type::All || question.rtype == self.rtype)
            && question.class.matches(self.class)
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.payload {
            Payload::Question => write!(f, "{} {:?} {}", self.name, self.class, self.rtype),
            Payload::Answer { ttl, ref rdata } => write!(
                f,
                "{} {} {:?} {} {}",
                self.name, ttl, self.class, self.rtype, rdata
            ),
        }
    }
}
