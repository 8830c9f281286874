#[path = "mod_diagnostics.rs"]
mod diagnostics_tests;
