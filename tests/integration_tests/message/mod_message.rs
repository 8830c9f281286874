use crate::integration_tests::_support::*;
use gpwebpay_digest::{DigestInput, DigestService};

#[test]
fn create_order_request_digest_round_trip() {
    let input = DigestInput::new()
        .field("0000000001")
        .field("CREATE_ORDER")
        .field("1234567")
        .field("10000")
        .field("203")
        .field("1")
        .optional_field(None::<String>)
        .field("https://shop.example/return")
        .optional_field(Some("Objednávka č. 1234567"));
    let message = input.to_message();
    assert_eq!(message.matches('|').count(), 7);
    assert!(!message.contains("||"));

    let svc = DigestService::default();
    let cert = merchant();
    let cs = charset("windows-1250");
    let digest = svc.sign(&message, &cert, cs).unwrap();
    assert!(svc.verify(&digest, &input.to_string(), &cert, cs).unwrap());
}

#[test]
fn response_digest1_covers_merchant_number() {
    let response = DigestInput::new()
        .field("CREATE_ORDER")
        .field("1234567")
        .field("0")
        .field("0");
    let svc = DigestService::default();
    let cert = merchant();
    let cs = charset("windows-1250");

    let digest = svc.sign(&response.to_message(), &cert, cs).unwrap();
    let digest1_input = DigestInput::digest1(&response.to_message(), "0000000001");
    let digest1 = svc.sign(&digest1_input, &cert, cs).unwrap();

    assert!(svc.verify(&digest1, &digest1_input, &cert, cs).unwrap());
    assert!(!svc.verify(&digest1, &response.to_message(), &cert, cs).unwrap());
    assert_ne!(digest, digest1);
}

#[test]
fn scenario_fields_build_scenario_message() {
    let input: DigestInput = ["1400", "00", "0", "0000000001", "1", "CZ"].into_iter().collect();
    assert_eq!(input.to_message(), SCENARIO_MESSAGE);
    assert_eq!(input.fields()[5], "CZ");
}
