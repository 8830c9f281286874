//! Digest input: the pipe-delimited concatenation of GP webpay request/response fields.
//!
//! Fields keep the protocol order. Optional fields that are absent are left out entirely
//! (no empty slot), as the gateway does when it computes its own digest.

use std::fmt;

pub const SEPARATOR: &str = "|";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestInput {
    fields: Vec<String>,
}

impl DigestInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, value: impl Into<String>) -> Self {
        self.fields.push(value.into());
        self
    }

    pub fn optional_field<S: Into<String>>(self, value: Option<S>) -> Self {
        match value {
            Some(v) => self.field(v),
            None => self,
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn to_message(&self) -> String {
        self.fields.join(SEPARATOR)
    }

    /// `DIGEST1` input of a gateway response: the `DIGEST` input followed by the merchant
    /// number.
    pub fn digest1(message: &str, merchant_number: &str) -> String {
        format!("{message}{SEPARATOR}{merchant_number}")
    }
}

impl fmt::Display for DigestInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_message())
    }
}

impl<S: Into<String>> FromIterator<S> for DigestInput {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        DigestInput { fields: iter.into_iter().map(Into::into).collect() }
    }
}
