//! Nullable socket: record datagrams instead of sending them.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::{Mutex, MutexGuard};

use ripple_network::DatagramSocket;

/// A socket that records every send and never receives anything.
pub struct NullSocket {
    local: SocketAddr,
    sent: Mutex<Vec<(SocketAddr, Vec<u8>)>>,
}

impl NullSocket {
    pub fn new(local: SocketAddr) -> Self {
        Self {
            local,
            sent: Mutex::new(Vec::new()),
        }
    }

    fn sent_lock(&self) -> MutexGuard<'_, Vec<(SocketAddr, Vec<u8>)>> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent_lock().clone()
    }

    /// Payloads of sent message frames, without the 4-byte message id.
    /// ACK frames are skipped.
    pub fn sent_payloads(&self) -> Vec<(SocketAddr, Vec<u8>)> {
        self.sent_lock()
            .iter()
            .filter(|(_, bytes)| bytes.len() > 4)
            .map(|(to, bytes)| (*to, bytes[4..].to_vec()))
            .collect()
    }

    pub fn clear(&self) {
        self.sent_lock().clear();
    }
}

impl DatagramSocket for NullSocket {
    fn send_to<'a>(
        &'a self,
        buf: &'a [u8],
        target: SocketAddr,
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        self.sent_lock().push((target, buf.to_vec()));
        std::future::ready(Ok(buf.len()))
    }

    fn recv_from<'a>(
        &'a self,
        _buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send + 'a {
        std::future::pending()
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}
