//! Answering questions from locally configured zones
//!
//! A [`Resolver`] turns the questions of a query into the answer records an
//! authoritative, non-recursive server returns. "No match" is not an error:
//! it is an empty answer, and the server decides which response code that
//! maps to.

use crate::dns_parser::DomainName;
use crate::record::ResourceRecord;

mod json;
mod stack;
mod zone;

pub use self::json::{load_zone_file, load_zone_files, parse_zone, DEFAULT_TTL};
pub use self::stack::StackableResolver;
pub use self::zone::{ZoneIndex, ZoneResolver};

pub trait Resolver: Send + Sync {
    /// Answers for `questions`, concatenated in question order
    fn get_answer(&self, questions: &[ResourceRecord]) -> Vec<ResourceRecord>;

    /// Whether this resolver holds an SOA at `name` or one of its ancestors
    fn is_authority(&self, name: &DomainName) -> bool;

    /// Whether the RA flag may be set
    fn allows_recursion(&self) -> bool;

    /// True iff the first label of `name` is literally `*`
    fn is_wildcard_domain(&self, name: &DomainName) -> bool {
        name.is_wildcard()
    }

    /// Whether `name` exists at all, which turns an empty answer into NODATA
    /// instead of NXDOMAIN
    fn has_name(&self, _name: &DomainName) -> bool {
        false
    }

    /// SOA of the closest zone enclosing `name`, for negative answers
    fn soa(&self, _name: &DomainName) -> Option<ResourceRecord> {
        None
    }
}
