use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use log::{debug, trace};
use multimap::MultiMap;

use super::Resolver;
use crate::dns_parser::{DomainName, Type};
use crate::error::ZoneLoadError;
use crate::record::ResourceRecord;

/// Read-only lookup structure built from a zone's records
#[derive(Debug, Default)]
pub struct ZoneIndex {
    /// main index, canonical owner name to records in zone order
    by_name: MultiMap<DomainName, ResourceRecord>,
    /// first SOA of every zone apex
    soa: HashMap<DomainName, ResourceRecord>,
    /// names inside a zone that own nothing but have descendants
    empty_non_terminals: HashSet<DomainName>,
}

impl ZoneIndex {
    pub fn build<I>(records: I) -> Result<ZoneIndex, ZoneLoadError>
    where
        I: IntoIterator<Item = ResourceRecord>,
    {
        let mut index = ZoneIndex::default();
        for record in records {
            if record.is_question() {
                return Err(ZoneLoadError::QuestionRecord(record.to_string()));
            }
            let key = record.name().canonical();
            if record.rtype() == Type::SOA {
                index.soa.entry(key.clone()).or_insert_with(|| record.clone());
            }
            index.by_name.insert(key, record);
        }
        let apexes = &index.soa;
        let owners = &index.by_name;
        let empty_non_terminals = owners
            .iter_all()
            .map(|(owner, _)| owner)
            .filter(|owner| !apexes.contains_key(*owner) && index.closest_soa(owner).is_some())
            .flat_map(move |owner| {
                owner
                    .ancestors()
                    .take_while(move |ancestor| !apexes.contains_key(ancestor))
            })
            .filter(|ancestor| !owners.contains_key(ancestor))
            .collect();
        index.empty_non_terminals = empty_non_terminals;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.by_name.iter_all().map(|(_, records)| records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Records owned by exactly `name`
    pub fn find_by_name(&self, name: &DomainName) -> Option<&[ResourceRecord]> {
        self.by_name
            .get_vec(&name.canonical())
            .map(|records| records.as_slice())
    }

    /// Records of the most specific `*.<ancestor>` entry covering `name`
    pub fn find_wildcard(&self, name: &DomainName) -> Option<(DomainName, &[ResourceRecord])> {
        name.ancestors().find_map(|ancestor| {
            let wildcard = ancestor.canonical().prepend_label("*").ok()?;
            let records = self.by_name.get_vec(&wildcard)?;
            Some((wildcard, records.as_slice()))
        })
    }

    /// Exact records for `name`, falling back to the closest wildcard
    pub fn lookup(&self, name: &DomainName) -> Option<&[ResourceRecord]> {
        if let Some(records) = self.find_by_name(name) {
            trace!("{} found in zone", name);
            return Some(records);
        }
        let (wildcard, records) = self.find_wildcard(name)?;
        debug!("{} matched wildcard {}", name, wildcard);
        Some(records)
    }

    /// Whether `name` exists in the zone data, even without records of the
    /// type being asked for
    pub fn contains(&self, name: &DomainName) -> bool {
        self.lookup(name).is_some() || self.empty_non_terminals.contains(&name.canonical())
    }

    /// SOA at `name` or its closest ancestor holding one
    pub fn closest_soa(&self, name: &DomainName) -> Option<&ResourceRecord> {
        let name = name.canonical();
        std::iter::once(name.clone())
            .chain(name.ancestors())
            .find_map(|apex| self.soa.get(&apex))
    }
}

/// Resolver over an in-memory zone index
///
/// The index is published through an [`ArcSwap`]: `reload` builds the new
/// generation off to the side and swaps it in, so a lookup always sees one
/// complete generation.
pub struct ZoneResolver {
    index: ArcSwap<ZoneIndex>,
}

impl ZoneResolver {
    pub fn new<I>(records: I) -> Result<ZoneResolver, ZoneLoadError>
    where
        I: IntoIterator<Item = ResourceRecord>,
    {
        Ok(ZoneResolver {
            index: ArcSwap::from_pointee(ZoneIndex::build(records)?),
        })
    }

    /// Replaces the whole zone; the old index stays valid for whoever holds it
    pub fn reload<I>(&self, records: I) -> Result<(), ZoneLoadError>
    where
        I: IntoIterator<Item = ResourceRecord>,
    {
        let index = ZoneIndex::build(records)?;
        debug!("reloaded zone with {} records", index.len());
        self.index.store(Arc::new(index));
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<ZoneIndex> {
        self.index.load_full()
    }
}

impl Resolver for ZoneResolver {
    fn get_answer(&self, questions: &[ResourceRecord]) -> Vec<ResourceRecord> {
        let index = self.index.load();
        let mut answers = Vec::new();
        for question in questions {
            let records = match index.lookup(question.name()) {
                Some(records) => records,
                None => {
                    trace!("no records for {}", question.name());
                    continue;
                }
            };
            answers.extend(
                records
                    .iter()
                    .filter(|record| record.answers(question))
                    .map(|record| record.with_name(question.name().clone())),
            );
        }
        answers
    }

    fn is_authority(&self, name: &DomainName) -> bool {
        self.index.load().closest_soa(name).is_some()
    }

    fn allows_recursion(&self) -> bool {
        false
    }

    fn has_name(&self, name: &DomainName) -> bool {
        self.index.load().contains(name)
    }

    fn soa(&self, name: &DomainName) -> Option<ResourceRecord> {
        self.index.load().closest_soa(name).cloned()
    }
}
