//! Trust network node.
//!
//! The node receives signed datagrams over the reliable transport,
//! authenticates them, and runs the matching handler inside the owning
//! account's dispatcher slot:
//! - Trustline commands and the epoch-based sync protocol with peer servers
//! - Payment origination and hop-by-hop path finding
//! - Signed replies to the account owner's client
//!
//! Handler side effects (ledger writes, follow-up datagrams) happen only
//! inside the slot, so all work for one account is strictly serialized.

pub mod auth;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use auth::{Authenticator, Rejection};
pub use config::NodeConfig;
pub use context::NodeContext;
pub use dispatcher::SessionDispatcher;
pub use error::{AuthError, HandlerError, NodeError};
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::RippleNode;
pub use shutdown::{ShutdownController, SignalAction, WaitGroup};
