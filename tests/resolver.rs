use std::fs;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::Arc;

use authdns::dns_parser::{Class, DomainName, RRData, Soa, Type};
use authdns::resolver::{load_zone_files, Resolver, StackableResolver, ZoneResolver};
use authdns::{ResourceRecord, ZoneLoadError};

fn fixture(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(file)
}

fn resolver() -> ZoneResolver {
    ZoneResolver::from_json_files(&[fixture("example.com.json"), fixture("test2.com.json")]).unwrap()
}

fn name(s: &str) -> DomainName {
    DomainName::parse(s).unwrap()
}

fn question(owner: &str, rtype: Type) -> ResourceRecord {
    ResourceRecord::question(name(owner), rtype, Class::IN)
}

fn a(owner: &str, ttl: i32, ip: [u8; 4]) -> ResourceRecord {
    ResourceRecord::answer(name(owner), Class::IN, ttl, RRData::A(Ipv4Addr::from(ip)))
}

#[test]
fn get_answer() {
    let soa = ResourceRecord::answer(
        name("example.com."),
        Class::IN,
        10800,
        RRData::SOA(Soa {
            mname: name("example.com."),
            rname: name("postmaster.example.com."),
            serial: 2,
            refresh: 3600,
            retry: 7200,
            expire: 10800,
            minimum: 3600,
        }),
    );
    let aaaa = ResourceRecord::answer(
        name("example.com."),
        Class::IN,
        7200,
        RRData::AAAA("2001:acad:ad::32".parse::<Ipv6Addr>().unwrap()),
    );

    let answers = resolver().get_answer(&[
        question("example.com.", Type::SOA),
        question("example.com.", Type::AAAA),
    ]);
    assert_eq!(answers, vec![soa, aaaa]);
}

#[test]
fn unconfigured_record_does_not_resolve() {
    assert!(resolver()
        .get_answer(&[question("testestestes.com.", Type::A)])
        .is_empty());
}

#[test]
fn host_record_returns_every_address() {
    let answers = resolver().get_answer(&[question("test2.com.", Type::A)]);
    assert_eq!(
        answers,
        vec![
            a("test2.com.", 300, [111, 111, 111, 111]),
            a("test2.com.", 300, [112, 112, 112, 112]),
        ]
    );
}

#[test]
fn wildcard_domains() {
    let answers = resolver().get_answer(&[question("badcow.subdomain.example.com.", Type::A)]);
    assert_eq!(answers, vec![a("badcow.subdomain.example.com.", 7200, [192, 168, 1, 42])]);

    let answers = resolver().get_answer(&[question("deeper.x.sub.test.com.", Type::A)]);
    assert_eq!(answers, vec![a("deeper.x.sub.test.com.", 7200, [111, 111, 111, 112])]);

    // the wildcard owner itself is a plain name
    let answers = resolver().get_answer(&[question("*.subdomain.example.com.", Type::A)]);
    assert_eq!(answers.len(), 1);
}

#[test]
fn is_wildcard_domain() {
    let resolver = ZoneResolver::new(Vec::new()).unwrap();
    assert!(resolver.is_wildcard_domain(&name("*.cat.com.")));
    assert!(!resolver.is_wildcard_domain(&name("github.com.")));
}

#[test]
fn allows_recursion() {
    assert!(!resolver().allows_recursion());
}

#[test]
fn is_authority() {
    let resolver = resolver();
    assert!(resolver.is_authority(&name("example.com.")));
    assert!(resolver.is_authority(&name("badcow.subdomain.example.com.")));
    assert!(!resolver.is_authority(&name("test2.com.")));
}

#[test]
fn srv_rdata() {
    let answers = resolver().get_answer(&[question("_ldap._tcp.example.com.", Type::SRV)]);
    assert_eq!(
        answers,
        vec![ResourceRecord::answer(
            name("_ldap._tcp.example.com."),
            Class::IN,
            7200,
            RRData::SRV {
                priority: 1,
                weight: 5,
                port: 389,
                target: name("ldap.example.com."),
            },
        )]
    );
}

#[test]
fn relative_rdata_names() {
    let answers = resolver().get_answer(&[question("example.com.", Type::MX)]);
    assert_eq!(
        answers[0].rdata(),
        Some(&RRData::MX {
            preference: 15,
            exchange: name("mail.example.com."),
        })
    );
    let answers = resolver().get_answer(&[question("www.example.com.", Type::CNAME)]);
    assert_eq!(answers[0].rdata(), Some(&RRData::CNAME(name("example.com."))));
}

#[test]
fn any_returns_every_type() {
    let answers = resolver().get_answer(&[question("example.com.", Type::All)]);
    assert_eq!(answers.len(), 8);
}

#[test]
fn stacked_zones() {
    let example: Arc<dyn Resolver> =
        Arc::new(ZoneResolver::from_json_files(&[fixture("example.com.json")]).unwrap());
    let test2: Arc<dyn Resolver> =
        Arc::new(ZoneResolver::from_json_files(&[fixture("test2.com.json")]).unwrap());
    let stack = StackableResolver::new(vec![example, test2]);

    assert_eq!(stack.get_answer(&[question("test2.com.", Type::A)]).len(), 2);
    assert_eq!(stack.get_answer(&[question("example.com.", Type::A)]).len(), 2);
    assert!(stack.is_authority(&name("www.example.com.")));
    assert!(!stack.allows_recursion());
}

#[test]
fn reload_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let zone = dir.path().join("zone.json");
    fs::write(
        &zone,
        r#"{ "domain": "reload.test.", "resources": [ { "type": "A", "data": "10.0.0.1" } ] }"#,
    )
    .unwrap();
    let resolver = ZoneResolver::from_json_files(&[&zone]).unwrap();
    let before = resolver.snapshot();

    fs::write(
        &zone,
        r#"{ "domain": "reload.test.", "resources": [ { "type": "A", "data": "10.0.0.2" } ] }"#,
    )
    .unwrap();
    resolver.reload(load_zone_files(&[&zone]).unwrap()).unwrap();

    let answers = resolver.get_answer(&[question("reload.test.", Type::A)]);
    assert_eq!(answers, vec![a("reload.test.", 3600, [10, 0, 0, 2])]);
    assert_eq!(
        before.find_by_name(&name("reload.test.")).unwrap(),
        &[a("reload.test.", 3600, [10, 0, 0, 1])][..]
    );
}

#[test]
fn broken_zone_files() {
    let dir = tempfile::tempdir().unwrap();
    let zone = dir.path().join("broken.json");

    fs::write(&zone, r#"{ "domain": "x.", "resources": [ { "type": "FOO", "data": "" } ] }"#).unwrap();
    assert!(matches!(
        ZoneResolver::from_json_files(&[&zone]),
        Err(ZoneLoadError::UnsupportedType(_))
    ));

    fs::write(&zone, r#"{ "domain": "x.", "resources": [ { "type": "A", "data": "1.2.3" } ] }"#).unwrap();
    assert!(matches!(
        ZoneResolver::from_json_files(&[&zone]),
        Err(ZoneLoadError::InvalidRecord { .. })
    ));

    fs::write(
        &zone,
        r#"{ "domain": "x.", "resources": [ { "type": "MX", "data": { "preference": 65536, "exchange": "m" } } ] }"#,
    )
    .unwrap();
    assert!(matches!(
        ZoneResolver::from_json_files(&[&zone]),
        Err(ZoneLoadError::ValueOutOfRange { field: "preference", .. })
    ));

    assert!(matches!(
        ZoneResolver::from_json_files(&[dir.path().join("missing.json")]),
        Err(ZoneLoadError::Io { .. })
    ));
}
