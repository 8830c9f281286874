mod certificate;
mod diagnostics;
mod logger;
mod message;

#[path = "mod_lib.rs"]
mod lib_tests;
