use gpwebpay_digest::charset::{self, Charset};
use gpwebpay_digest::errors::CharsetError;

#[test]
fn registry_lists_legacy_code_pages_in_order() {
    charset::init();
    let pages = charset::registered().unwrap();
    assert!(pages.windows(2).all(|w| w[0].0 < w[1].0));
    for expected in [(1250, "windows-1250"), (28592, "ISO-8859-2"), (65001, "UTF-8"), (1200, "UTF-16LE")] {
        assert!(pages.contains(&expected), "{expected:?} missing");
    }
}

#[test]
fn init_from_many_threads() {
    let handles: Vec<_> = (0..8).map(|_| std::thread::spawn(charset::init)).collect();
    for h in handles {
        h.join().unwrap();
    }
    assert!(charset::is_initialized());
}

#[test]
fn parse_and_display() {
    gpwebpay_digest::init();
    let cs: Charset = "iso-8859-2".parse().unwrap();
    assert_eq!(cs.code_page(), Some(28592));
    assert_eq!(cs.to_string(), "ISO-8859-2");
    assert_eq!("latin2".parse::<Charset>().unwrap(), cs);
    assert!("no-such-charset".parse::<Charset>().is_err());
}

#[test]
fn latin2_and_cp1250_differ_on_czech_letters() {
    gpwebpay_digest::init();
    let latin2 = Charset::from_code_page(28592).unwrap();
    let cp1250 = Charset::from_code_page(1250).unwrap();
    assert_eq!(latin2.encode("ž"), vec![0xBE]);
    assert_eq!(cp1250.encode("ž"), vec![0x9E]);
    assert_eq!(latin2.decode(&[0xBE]), "ž");
}

#[test]
fn en_dash_exists_in_cp1250_only() {
    gpwebpay_digest::init();
    assert_eq!(Charset::from_code_page(1250).unwrap().encode("–"), vec![0x96]);
    let latin2 = Charset::from_code_page(28592).unwrap();
    assert_eq!(latin2.encode("a–b"), b"a?b".to_vec());
    let err = latin2.encode_strict("a–b").unwrap_err();
    assert!(matches!(err, CharsetError::Unmappable { ch: '–', .. }));
}

#[test]
fn unicode_fffe_is_big_endian_utf16() {
    gpwebpay_digest::init();
    let cs = Charset::for_label("unicodeFFFE").unwrap();
    assert_eq!(cs.code_page(), Some(1201));
    assert_eq!(cs.encode("A"), vec![0x00, 0x41]);
}

#[test]
fn multibyte_legacy_encodings() {
    gpwebpay_digest::init();
    let sjis = Charset::for_label("shift_jis").unwrap();
    assert_eq!(sjis.code_page(), Some(932));
    assert_eq!(sjis.encode("日本"), vec![0x93, 0xFA, 0x96, 0x7B]);
}
