//! Request signing port

use serde_json::Value;

use super::transport::OutboundRequest;

/// Errors raised while signing a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    /// A credential field is missing from `config`.
    #[error("missing signing credential: config.{0}")]
    MissingCredential(String),

    /// The request URL cannot be signed.
    #[error("cannot sign URL {url}: {message}")]
    InvalidUrl {
        /// The URL.
        url: String,
        /// What was wrong.
        message: String,
    },
}

/// Port for the request-signing transform applied to `http` tasks with
/// `auth: AWS_IAM`.
pub trait RequestSigner: Send + Sync {
    /// Adds signature headers to `request` using credentials read from the
    /// case's `config` object.
    ///
    /// # Errors
    ///
    /// Returns an error when credentials are missing or the URL is unusable.
    fn sign(&self, request: &mut OutboundRequest, config: &Value) -> Result<(), SigningError>;
}
