//! Transport layer: authentication headers applied to every request.
//!
//! Each request carries a `Date` header. Depending on the configured [`Authentication`], an
//! `Authorization` header is added on top:
//!
//! - `Token <token>` for token authentication
//! - an HTTP signature over the `date` line, produced by a [`RequestSigner`]
//!
//! Signing keys are not handled here. Callers that use key based authentication plug in
//! their own signer.

use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use manta_utils::http_client::RequestBuilder;
use reqwest::header::{HeaderValue, AUTHORIZATION, DATE};

use crate::error::MantaError;

#[derive(Debug, thiserror::Error)]
#[error("Signing failed: {0}")]
pub struct SigningError(pub String);

/// Produces signatures for the HTTP signature scheme.
pub trait RequestSigner: Send + Sync {
    /// Algorithm name as it appears in the header, e.g. `rsa-sha256`
    fn algorithm(&self) -> &str;
    fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SigningError>;
}

/// HTTP signature authentication for a key registered on an account or a sub-user
#[derive(Clone)]
pub struct HttpSignatureAuth {
    key_id: String,
    signer: Arc<dyn RequestSigner>,
}

impl fmt::Debug for HttpSignatureAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSignatureAuth").field("key_id", &self.key_id).finish_non_exhaustive()
    }
}

impl HttpSignatureAuth {
    pub fn new(user: &str, subuser: Option<&str>, key_id: &str, signer: Arc<dyn RequestSigner>) -> Self {
        let key_id = match subuser {
            Some(subuser) => format!("/{user}/{subuser}/keys/{key_id}"),
            None => format!("/{user}/keys/{key_id}"),
        };
        Self { key_id, signer }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    fn header_value(&self, date: &str) -> Result<String, SigningError> {
        let signature = self.signer.sign(format!("date: {date}").as_bytes())?;
        Ok(format!(
            "Signature keyId=\"{}\",algorithm=\"{}\",headers=\"date\",signature=\"{}\"",
            self.key_id,
            self.signer.algorithm(),
            STANDARD.encode(signature)
        ))
    }
}

#[derive(Debug, Clone, Default)]
pub enum Authentication {
    /// Only the `Date` header is sent
    #[default]
    None,
    Token(String),
    Signature(HttpSignatureAuth),
}

impl Authentication {
    /// Adds `Date` and, when configured, `Authorization` to the request
    pub fn apply<'a>(&self, builder: RequestBuilder<'a>, operation: &str) -> Result<RequestBuilder<'a>, MantaError> {
        self.apply_at(builder, operation, Utc::now())
    }

    fn apply_at<'a>(
        &self,
        builder: RequestBuilder<'a>,
        operation: &str,
        now: DateTime<Utc>,
    ) -> Result<RequestBuilder<'a>, MantaError> {
        let date = http_date(now);
        let builder = builder.header(DATE, header_value(operation, &date)?);

        let authorization = match self {
            Authentication::None => return Ok(builder),
            Authentication::Token(token) => format!("Token {token}"),
            Authentication::Signature(auth) => {
                auth.header_value(&date).map_err(|e| MantaError::request_error(operation, e.to_string()))?
            }
        };
        Ok(builder.header(AUTHORIZATION, header_value(operation, &authorization)?))
    }
}

/// RFC 7231 date, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) fn header_value(operation: &str, value: &str) -> Result<HeaderValue, MantaError> {
    HeaderValue::from_str(value).map_err(|e| MantaError::request_error(operation, e.to_string()))
}
