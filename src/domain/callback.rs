use super::money::Amount;
use crate::error::{ReconcileError, Result};
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;
use url::Url;

/// The `status` query parameter reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum CallbackStatus {
    Successful,
    Failed,
    /// Any status string the gateway is not known to send.
    Other(String),
    Missing,
}

impl CallbackStatus {
    fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => Self::Missing,
            Some(s) if s.eq_ignore_ascii_case("successful") => Self::Successful,
            Some(s) if s.eq_ignore_ascii_case("failed") => Self::Failed,
            Some(s) => Self::Other(s.to_string()),
        }
    }
}

/// Parameters the payment gateway appends to the redirect URL.
///
/// Parsed once when the flow starts and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackParams {
    intention_id: Option<String>,
    status: CallbackStatus,
    amount: Option<Amount>,
    error_message: Option<String>,
}

impl CallbackParams {
    pub fn new(
        intention_id: Option<String>,
        status: CallbackStatus,
        amount: Option<Amount>,
        error_message: Option<String>,
    ) -> Self {
        Self {
            intention_id,
            status,
            amount,
            error_message,
        }
    }

    /// Parses the query of a redirect URL. Any scheme is accepted, so app deep
    /// links work the same as `https` redirects.
    pub fn from_url(url: &Url) -> Self {
        Self::from_pairs(url.query_pairs().map(|(k, v)| (k.into_owned(), v.into_owned())))
    }

    /// Parses a bare query string, with or without the leading `?`.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        )
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String)>) -> Self {
        let mut intention_id = None;
        let mut status = None;
        let mut amount = None;
        let mut amount_cents = None;
        let mut error_message = None;

        // First occurrence wins for repeated keys.
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "intention_id" => &mut intention_id,
                "status" => &mut status,
                "amount" => &mut amount,
                "amount_cents" => &mut amount_cents,
                "error" => &mut error_message,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        let amount = match (amount, amount_cents) {
            (Some(raw), _) => parse_amount(&raw),
            (None, Some(raw)) => parse_amount_cents(&raw),
            (None, None) => None,
        };

        Self {
            intention_id: non_empty(intention_id),
            status: CallbackStatus::parse(status.as_deref()),
            amount,
            error_message: non_empty(error_message),
        }
    }

    pub fn intention_id(&self) -> Option<&str> {
        self.intention_id.as_deref()
    }

    pub fn status(&self) -> &CallbackStatus {
        &self.status
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }
}

impl FromStr for CallbackParams {
    type Err = ReconcileError;

    /// Accepts either an absolute URL or a bare query string.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ReconcileError::InvalidCallback(
                "empty callback".to_string(),
            ));
        }
        if s.starts_with('?') || !s.contains("://") {
            return Ok(Self::from_query(s));
        }
        let url = Url::parse(s)?;
        Ok(Self::from_url(&url))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> Option<Amount> {
    raw.parse::<Amount>()
        .map_err(|e| warn!(amount = raw, "Ignoring amount parameter: {e}"))
        .ok()
}

fn parse_amount_cents(raw: &str) -> Option<Amount> {
    raw.trim()
        .parse::<i64>()
        .map_err(|e| ReconcileError::ValidationError(e.to_string()))
        .and_then(Amount::from_cents)
        .map_err(|e| warn!(amount_cents = raw, "Ignoring amount_cents parameter: {e}"))
        .ok()
}
