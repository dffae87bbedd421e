pub mod api;
pub mod client;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod transport;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use url::Url;

pub use crate::client::MantaClient;
pub use crate::error::MantaError;
pub use crate::transport::{Authentication, HttpSignatureAuth, RequestSigner, SigningError};

#[derive(Debug, Clone)]
pub struct MantaValidatedArgs {
    pub url: Url,
    /// Account that owns the jobs and objects
    pub user: String,
    pub subuser: Option<String>,
    /// Fingerprint of the signing key
    pub key_id: Option<String>,
    pub auth_token: Option<String>,
    /// Per request timeout, connect included
    pub timeout: Duration,
}

impl MantaValidatedArgs {
    /// Token authentication when a token is configured, none otherwise
    pub fn token_authentication(&self) -> Authentication {
        match &self.auth_token {
            Some(token) => Authentication::Token(token.clone()),
            None => Authentication::None,
        }
    }

    /// Signature authentication with `signer`, when a key id is configured
    pub fn signature_authentication(&self, signer: Arc<dyn RequestSigner>) -> Option<Authentication> {
        self.key_id.as_deref().map(|key_id| {
            Authentication::Signature(HttpSignatureAuth::new(&self.user, self.subuser.as_deref(), key_id, signer))
        })
    }
}
