use gpwebpay_digest::{Certificate, Charset, DigestService, KeyStorageFlags};
use once_cell::sync::Lazy;
use proptest::prelude::*;

static MERCHANT: Lazy<Certificate> = Lazy::new(|| {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/merchant-key-pkcs1.pem");
    Certificate::from_file(path, "", KeyStorageFlags::empty()).unwrap()
});

fn charset(label: &str) -> Charset {
    gpwebpay_digest::init();
    Charset::for_label(label).unwrap()
}

proptest! {
    #![proptest_config(proptest::test_runner::Config {
        failure_persistence: Some(Box::new(proptest::test_runner::FileFailurePersistence::WithSource("proptest-regressions"))),
        cases: 16,
        .. proptest::test_runner::Config::default()
    })]
    #[test]
    fn prop_utf8_sign_verify_roundtrip(msg in "\\PC{0,64}") {
        let svc = DigestService::default();
        let cs = charset("utf-8");
        let sig = svc.sign(&msg, &MERCHANT, cs).unwrap();
        prop_assert!(svc.verify(&sig, &msg, &MERCHANT, cs).unwrap());
    }

    #[test]
    fn prop_cp1250_roundtrip_on_czech_text(msg in "[a-zA-Z0-9 |.áčďéěíňóřšťúůýžÁČĎÉĚÍŇÓŘŠŤÚŮÝŽ]{0,64}") {
        let svc = DigestService::default();
        let cs = charset("windows-1250");
        let sig = svc.sign(&msg, &MERCHANT, cs).unwrap();
        prop_assert!(svc.verify(&sig, &msg, &MERCHANT, cs).unwrap());
    }

    #[test]
    fn prop_verify_rejects_altered_message(msg in "[ -~]{1,64}", extra in "[ -~]") {
        let svc = DigestService::default();
        let cs = charset("windows-1250");
        let sig = svc.sign(&msg, &MERCHANT, cs).unwrap();
        let altered = format!("{msg}{extra}");
        prop_assert!(!svc.verify(&sig, &altered, &MERCHANT, cs).unwrap());
    }

    #[test]
    fn prop_garbage_signatures_never_panic(sig in "\\PC{0,400}") {
        let svc = DigestService::default();
        let cs = charset("utf-8");
        // Either a clean mismatch or a wrapped decoding failure.
        match svc.verify(&sig, "1400|00|0", &MERCHANT, cs) {
            Ok(valid) => prop_assert!(!valid),
            Err(e) => prop_assert!(e.cause().is_some()),
        }
    }
}
