//! Turns a transport selector into a concrete `HttpTransport`.
//!
//! # Design
//! Selection is a free function over a plain enum. There is nothing to
//! instantiate and no state to carry between calls, so the only inputs are
//! the selector and which engines were compiled into the crate.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::ConfigurationError;
#[cfg(feature = "ureq")]
use crate::transport::UreqTransport;
use crate::transport::{HttpTransport, StreamTransport};

/// Name that selects `StreamTransport`.
pub const STREAM_HANDLER: &str = "stream";

/// Name that selects `UreqTransport`.
pub const UREQ_HANDLER: &str = "ureq";

/// Which transport a client should use.
#[derive(Clone, Default)]
pub enum TransportSelector {
    /// Pick the richest transport available.
    #[default]
    Default,
    /// Pick a transport by name (`"stream"` or `"ureq"`).
    Named(String),
    /// Use this transport as-is.
    Instance(Arc<dyn HttpTransport>),
    /// Build a `UreqTransport` around a caller-configured agent.
    #[cfg(feature = "ureq")]
    Agent(ureq::Agent),
}

impl fmt::Debug for TransportSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSelector::Default => f.write_str("Default"),
            TransportSelector::Named(name) => f.debug_tuple("Named").field(name).finish(),
            TransportSelector::Instance(transport) => {
                f.debug_tuple("Instance").field(transport).finish()
            }
            #[cfg(feature = "ureq")]
            TransportSelector::Agent(_) => f.write_str("Agent(..)"),
        }
    }
}

impl From<&str> for TransportSelector {
    fn from(name: &str) -> Self {
        if name.is_empty() {
            TransportSelector::Default
        } else {
            TransportSelector::Named(name.to_string())
        }
    }
}

impl From<String> for TransportSelector {
    fn from(name: String) -> Self {
        if name.is_empty() {
            TransportSelector::Default
        } else {
            TransportSelector::Named(name)
        }
    }
}

impl From<Option<&str>> for TransportSelector {
    fn from(name: Option<&str>) -> Self {
        name.map_or(TransportSelector::Default, TransportSelector::from)
    }
}

impl From<Arc<dyn HttpTransport>> for TransportSelector {
    fn from(transport: Arc<dyn HttpTransport>) -> Self {
        TransportSelector::Instance(transport)
    }
}

#[cfg(feature = "ureq")]
impl From<ureq::Agent> for TransportSelector {
    fn from(agent: ureq::Agent) -> Self {
        TransportSelector::Agent(agent)
    }
}

/// Resolve `selector` into a transport.
///
/// Fails with `ConfigurationError::InvalidHandler` for unknown names and
/// `ConfigurationError::LibraryUnavailable` when the named engine was not
/// compiled in.
pub fn create_transport(
    selector: impl Into<TransportSelector>,
) -> Result<Arc<dyn HttpTransport>, ConfigurationError> {
    let transport: Arc<dyn HttpTransport> = match selector.into() {
        TransportSelector::Default => detect_default_transport(),
        TransportSelector::Instance(transport) => transport,
        TransportSelector::Named(name) => match name.as_str() {
            STREAM_HANDLER => Arc::new(StreamTransport::new()),
            UREQ_HANDLER => ureq_transport(&name)?,
            _ => return Err(ConfigurationError::InvalidHandler { handler: name }),
        },
        #[cfg(feature = "ureq")]
        TransportSelector::Agent(agent) => Arc::new(UreqTransport::with_agent(agent)),
    };
    debug!(transport = transport.name(), "resolved http transport");
    Ok(transport)
}

/// The richest transport compiled into this build.
#[cfg(feature = "ureq")]
pub fn detect_default_transport() -> Arc<dyn HttpTransport> {
    Arc::new(UreqTransport::new())
}

/// The richest transport compiled into this build.
#[cfg(not(feature = "ureq"))]
pub fn detect_default_transport() -> Arc<dyn HttpTransport> {
    Arc::new(StreamTransport::new())
}

#[cfg(feature = "ureq")]
fn ureq_transport(_handler: &str) -> Result<Arc<dyn HttpTransport>, ConfigurationError> {
    Ok(Arc::new(UreqTransport::new()))
}

#[cfg(not(feature = "ureq"))]
fn ureq_transport(handler: &str) -> Result<Arc<dyn HttpTransport>, ConfigurationError> {
    Err(ConfigurationError::LibraryUnavailable {
        handler: handler.to_string(),
        library: "ureq",
    })
}
