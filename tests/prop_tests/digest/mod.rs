#[path = "prop_sign.rs"]
mod prop_sign;
