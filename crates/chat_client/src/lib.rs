//! Terminal chat client for the diagram chat proxy.
//!
//! [`app::App`] holds the transcript and run lifecycle, [`runtime::RuntimeController`] runs
//! each request on a worker thread through a [`chat_protocol::ChatTransport`], and
//! [`view::InlineView`] redraws the rendered transcript in place.

pub mod app;
pub mod commands;
pub mod runtime;
pub mod theme;
pub mod transport;
pub mod view;

pub use app::{App, HostOps, Mode, GREETING, SAMPLE_DIAGRAM};
pub use runtime::{ClientEvent, RuntimeController};
pub use transport::{HttpTransport, TransportError, DEFAULT_PROXY_URL};
pub use view::InlineView;
