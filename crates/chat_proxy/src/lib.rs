//! `POST /api/chat`: forwards a chat request to OpenRouter and streams the reply back as a
//! data stream.

pub mod config;
pub mod error;
pub mod routes;
pub mod translate;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use routes::{router, AppState};
pub use translate::{upstream_request, StreamTranslator};
