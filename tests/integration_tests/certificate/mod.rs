#[path = "mod_certificate.rs"]
mod certificate_tests;
