//! Outbound adapters: HTTP transport and request signing.

mod reqwest_transport;
mod sigv4;

pub use reqwest_transport::{DEFAULT_TIMEOUT_MS, ReqwestTransport};
pub use sigv4::SigV4Signer;
