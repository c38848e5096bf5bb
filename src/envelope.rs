//! Response envelopes wrapping every API payload.
//!
//! Two shapes exist on the wire:
//!
//! - auth-style: `{"state": bool, "code": int, "message": str, "data": any}`
//! - passport-style: `{"code": int, "message": str, "error": str, "errno": int, "data": any}`
//!
//! `data` is kept as raw JSON until the caller picks the target type.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::error::{ApiError, Error, Result};

/// Envelope used by the authenticated API.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct AuthEnvelope {
    pub state: bool,
    pub code: i64,
    pub message: String,
    pub data: Option<Box<RawValue>>,
}

impl AuthEnvelope {
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Decodes the opaque `data` field. Absent data decodes as `null`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_data(self.data.as_deref())
    }

    pub fn to_error(&self) -> ApiError {
        ApiError::new(self.code, self.message.clone())
    }
}

impl PartialEq for AuthEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
            && self.code == other.code
            && self.message == other.message
            && raw_text(&self.data) == raw_text(&other.data)
    }
}

/// Envelope used by the passport (login) service.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct PassportEnvelope {
    pub code: i64,
    pub message: String,
    pub error: String,
    pub errno: i64,
    pub data: Option<Box<RawValue>>,
}

impl PassportEnvelope {
    pub fn decode(body: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Success needs both a zero code and an empty error string.
    pub fn is_success(&self) -> bool {
        self.code == 0 && self.error.is_empty()
    }

    /// Maps the two passport failure kinds onto [`Error`]. A non-zero code wins
    /// over a non-empty error string.
    pub fn check(&self) -> Result<()> {
        if self.code != 0 {
            return Err(Error::Api(ApiError::new(self.code, self.message.clone())));
        }
        if !self.error.is_empty() {
            return Err(Error::Passport {
                error: self.error.clone(),
                errno: self.errno,
                response: None,
            });
        }
        Ok(())
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        decode_data(self.data.as_deref())
    }
}

impl PartialEq for PassportEnvelope {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code
            && self.message == other.message
            && self.error == other.error
            && self.errno == other.errno
            && raw_text(&self.data) == raw_text(&other.data)
    }
}

fn decode_data<T: DeserializeOwned>(data: Option<&RawValue>) -> Result<T> {
    let raw = data.map_or("null", RawValue::get);
    Ok(serde_json::from_str(raw)?)
}

fn raw_text(data: &Option<Box<RawValue>>) -> Option<&str> {
    data.as_deref().map(RawValue::get)
}
