#[path = "mod_message.rs"]
mod message_tests;
