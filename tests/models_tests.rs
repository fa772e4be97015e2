// Model serialization tests (JSON camelCase)

use hostmon::models::*;

#[test]
fn test_io_snapshot_serialization_camel_case() {
    let snap = IoSnapshot {
        name: "/dev/sda1".into(),
        bytes_read: 1024,
        bytes_written: 2048,
        read_rate: 512,
        write_rate: 0,
    };
    let json = serde_json::to_string(&snap).unwrap();
    assert!(json.contains("\"bytesRead\""));
    assert!(json.contains("\"readRate\""));
    let back: IoSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn test_io_snapshot_rates_default_to_zero() {
    let json = r#"{"name":"eth0","bytesRead":10,"bytesWritten":20}"#;
    let snap: IoSnapshot = serde_json::from_str(json).unwrap();
    assert_eq!(snap.read_rate, 0);
    assert_eq!(snap.write_rate, 0);
}

#[test]
fn test_counter_sample_json_roundtrip() {
    let sample = CounterSample {
        bytes_read: 42,
        bytes_written: 7,
    };
    let json = serde_json::to_string(&sample).unwrap();
    let back: CounterSample = serde_json::from_str(&json).unwrap();
    assert_eq!(back, sample);
}

#[test]
fn test_nat_type_serializes_to_camel_case() {
    assert_eq!(
        serde_json::to_string(&NatType::FullCone).unwrap(),
        "\"fullCone\""
    );
    assert_eq!(
        serde_json::to_string(&NatType::PortRestrictedCone).unwrap(),
        "\"portRestrictedCone\""
    );
    let back: NatType = serde_json::from_str("\"symmetric\"").unwrap();
    assert_eq!(back, NatType::Symmetric);
}

#[test]
fn test_nat_type_display_and_default() {
    assert_eq!(NatType::default(), NatType::Unknown);
    assert_eq!(NatType::FullOrRestrictedCone.to_string(), "FullOrRestrictedCone");
    assert_eq!(NatType::None.to_string(), "None");
}
