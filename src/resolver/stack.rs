use std::sync::Arc;

use super::Resolver;
use crate::dns_parser::DomainName;
use crate::record::ResourceRecord;

/// Ordered chain of resolvers; the first one with an answer wins
#[derive(Clone, Default)]
pub struct StackableResolver {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl StackableResolver {
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> StackableResolver {
        StackableResolver { resolvers }
    }

    pub fn push(&mut self, resolver: Arc<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Resolver for StackableResolver {
    fn get_answer(&self, questions: &[ResourceRecord]) -> Vec<ResourceRecord> {
        self.resolvers
            .iter()
            .map(|resolver| resolver.get_answer(questions))
            .find(|answers| !answers.is_empty())
            .unwrap_or_default()
    }

    fn is_authority(&self, name: &DomainName) -> bool {
        self.resolvers.iter().any(|resolver| resolver.is_authority(name))
    }

    fn allows_recursion(&self) -> bool {
        self.resolvers.iter().any(|resolver| resolver.allows_recursion())
    }

    fn has_name(&self, name: &DomainName) -> bool {
        self.resolvers.iter().any(|resolver| resolver.has_name(name))
    }

    fn soa(&self, name: &DomainName) -> Option<ResourceRecord> {
        self.resolvers.iter().find_map(|resolver| resolver.soa(name))
    }
}

#[cfg(test)]
mod test {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::dns_parser::{Class, RRData, Type};
    use crate::resolver::ZoneResolver;

    struct Recursive;

    impl Resolver for Recursive {
        fn get_answer(&self, _questions: &[ResourceRecord]) -> Vec<ResourceRecord> {
            Vec::new()
        }

        fn is_authority(&self, _name: &DomainName) -> bool {
            false
        }

        fn allows_recursion(&self) -> bool {
            true
        }
    }

    fn name(s: &str) -> DomainName {
        DomainName::parse(s).unwrap()
    }

    fn zone(owner: &str, ip: [u8; 4]) -> Arc<dyn Resolver> {
        Arc::new(
            ZoneResolver::new(vec![ResourceRecord::answer(
                name(owner),
                Class::IN,
                300,
                RRData::A(Ipv4Addr::from(ip)),
            )])
            .unwrap(),
        )
    }

    #[test]
    fn first_non_empty_answer_wins() {
        let stack = StackableResolver::new(vec![
            zone("a.example.com.", [10, 0, 0, 1]),
            zone("b.example.com.", [10, 0, 0, 2]),
            zone("b.example.com.", [10, 0, 0, 3]),
        ]);
        let question = ResourceRecord::question(name("b.example.com."), Type::A, Class::IN);
        let answers = stack.get_answer(&[question]);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].rdata(), Some(&RRData::A(Ipv4Addr::new(10, 0, 0, 2))));

        let question = ResourceRecord::question(name("c.example.com."), Type::A, Class::IN);
        assert!(stack.get_answer(&[question]).is_empty());
    }

    #[test]
    fn flags_are_any_of_members() {
        let mut stack = StackableResolver::new(vec![zone("a.example.com.", [10, 0, 0, 1])]);
        assert!(!stack.allows_recursion());
        assert!(!stack.is_authority(&name("a.example.com.")));
        stack.push(Arc::new(Recursive));
        assert!(stack.allows_recursion());
        assert_eq!(stack.len(), 2);
        assert!(stack.soa(&name("a.example.com.")).is_none());
    }

    #[test]
    fn empty_stack() {
        let stack = StackableResolver::default();
        assert!(stack.is_empty());
        assert!(stack.get_answer(&[]).is_empty());
        assert!(!stack.is_authority(&name("example.com.")));
    }
}
