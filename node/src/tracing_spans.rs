//! Pre-built [`tracing::Span`] constructors for common node operations.
//!
//! Consistent span names and field sets make it easy to filter and
//! correlate one datagram's handling across log lines.

use tracing::{info_span, Span};

/// Span covering authentication and handling of one inbound datagram.
pub fn datagram_span(command: &str, account: &str, counter: u32) -> Span {
    info_span!("datagram", command = %command, account = %account, counter)
}

/// Span covering one expiry sweep of the path tables.
pub fn sweep_span() -> Span {
    info_span!("path_sweep")
}
