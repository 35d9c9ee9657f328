//! Analysis subject and market context

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The security a run analyzes, normalized to an uppercase ticker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject(String);

impl Subject {
    /// Normalize and validate a raw ticker.
    ///
    /// Trims surrounding whitespace and uppercases. Rejects empty input and
    /// anything with interior whitespace.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidSubject("empty ticker".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSubject(format!(
                "ticker contains whitespace: {trimmed:?}"
            )));
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Market configuration the consumer supplies alongside the subject.
///
/// Opaque to the engine; passed through to providers with every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketContext {
    pub exchange: Option<String>,
    pub currency: Option<String>,
}

impl MarketContext {
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }
}
