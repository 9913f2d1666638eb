use proxyscan_domain::{DnsResult, DomainError, RecordType};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[test]
fn test_record_type_codes() {
    for rtype in [
        RecordType::A,
        RecordType::NS,
        RecordType::CNAME,
        RecordType::PTR,
        RecordType::MX,
        RecordType::TXT,
        RecordType::AAAA,
    ] {
        assert_eq!(RecordType::from_str(rtype.as_str()), Ok(rtype));
    }
    assert_eq!(RecordType::A.to_u16(), 1);
    assert_eq!(RecordType::AAAA.to_u16(), 28);
}

#[test]
fn test_record_type_parse_is_case_insensitive() {
    assert_eq!("aaaa".parse::<RecordType>(), Ok(RecordType::AAAA));
    assert_eq!("Ptr".parse::<RecordType>(), Ok(RecordType::PTR));
    assert!("SOA".parse::<RecordType>().is_err());
}

#[test]
fn test_rcode_mapping() {
    assert_eq!(DomainError::from_rcode(0), None);
    assert_eq!(DomainError::from_rcode(1), Some(DomainError::Format));
    assert_eq!(DomainError::from_rcode(2), Some(DomainError::ServerFailure));
    assert_eq!(DomainError::from_rcode(3), Some(DomainError::NameNotFound));
    assert_eq!(DomainError::from_rcode(4), Some(DomainError::NotImplemented));
    assert_eq!(DomainError::from_rcode(5), Some(DomainError::Refused));
    for rcode in 6..16 {
        assert_eq!(DomainError::from_rcode(rcode), Some(DomainError::Other));
    }
}

#[test]
fn test_error_messages() {
    assert_eq!(DomainError::NameNotFound.to_string(), "Name error");
    assert_eq!(DomainError::FdLimit.to_string(), "FD Limit reached");
    let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused by peer");
    assert_eq!(
        DomainError::network(&io).to_string(),
        "Network error: refused by peer"
    );
    assert!(DomainError::NameNotFound.is_final());
    assert!(!DomainError::Timeout.is_final());
}

#[test]
fn test_result_address_conversion() {
    let v4 = DnsResult::success(Some(1u8), "a.example".into(), RecordType::A, vec![192, 0, 2, 1]);
    assert_eq!(v4.ip_addr(), Some(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1))));

    let mut octets = [0u8; 16];
    octets[15] = 1;
    let v6 = DnsResult::success(None::<u8>, "b.example".into(), RecordType::AAAA, octets.to_vec());
    assert_eq!(v6.ip_addr(), Some(IpAddr::V6(Ipv6Addr::LOCALHOST)));

    let short = DnsResult::success(None::<u8>, "c.example".into(), RecordType::A, vec![1, 2]);
    assert_eq!(short.ip_addr(), None);

    let failed = DnsResult::failure(
        Some(2u8),
        "d.example".into(),
        RecordType::A,
        DomainError::Timeout,
    );
    assert!(!failed.is_success());
    assert!(failed.rdata().is_empty());
    assert_eq!(failed.error(), Some(&DomainError::Timeout));
    assert_eq!(failed.ip_addr(), None);
}
