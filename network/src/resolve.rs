//! Server address resolution.

use std::net::{IpAddr, SocketAddr};

use ripple_types::ServerAddress;

use crate::NetworkError;

/// Resolve a server address to a socket address.
///
/// Accepts `ip:port`, a bare IP, `host:port` or a bare host; bare forms
/// use `default_port`.
pub async fn resolve_server(
    server: &ServerAddress,
    default_port: u16,
) -> Result<SocketAddr, NetworkError> {
    let raw = server.as_str();
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }
    let has_port = raw
        .rsplit_once(':')
        .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
    let target = if has_port {
        raw.to_string()
    } else {
        format!("{raw}:{default_port}")
    };
    let mut found = tokio::net::lookup_host(target.as_str())
        .await
        .map_err(|e| NetworkError::Resolve(format!("{raw}: {e}")))?;
    found
        .next()
        .ok_or_else(|| NetworkError::Resolve(raw.to_string()))
}
