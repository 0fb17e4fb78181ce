//! Reliable send on top of an unreliable datagram socket.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ripple_protocol::Frame;

use crate::{AckRegistry, DatagramSocket, NetworkError};

/// How hard the transport tries before giving up on a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Importance {
    /// Peer-to-peer traffic.
    Low,
    /// Responses to clients.
    High,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub low_importance_attempts: u32,
    pub high_importance_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(16),
            low_importance_attempts: 5,
            high_importance_attempts: 12,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self, importance: Importance) -> u32 {
        match importance {
            Importance::Low => self.low_importance_attempts,
            Importance::High => self.high_importance_attempts,
        }
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max_backoff)
    }
}

/// A received message frame. Nothing has been acknowledged yet: the
/// caller sends the ACK with [`ReliableTransport::acknowledge`].
#[derive(Debug, PartialEq, Eq)]
pub struct Inbound<'a> {
    pub id: u32,
    pub payload: &'a [u8],
}

/// UDP with acknowledgments and exponential-backoff retransmission.
pub struct ReliableTransport<S> {
    socket: Arc<S>,
    acks: AckRegistry,
    next_id: AtomicU32,
    policy: RetryPolicy,
}

impl<S: DatagramSocket> ReliableTransport<S> {
    pub fn new(socket: Arc<S>, policy: RetryPolicy) -> Self {
        Self {
            socket,
            acks: AckRegistry::new(),
            next_id: AtomicU32::new(1),
            policy,
        }
    }

    pub fn socket(&self) -> &Arc<S> {
        &self.socket
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn pending_acks(&self) -> usize {
        self.acks.pending()
    }

    fn allocate_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Send `payload` to `target` and wait until it is acknowledged.
    ///
    /// Makes exactly as many transmissions as the importance tier allows,
    /// waiting an exponentially growing delay after each one.
    pub async fn send(
        &self,
        payload: &[u8],
        target: SocketAddr,
        importance: Importance,
    ) -> Result<(), NetworkError> {
        let id = self.allocate_id();
        let frame = Frame::encode_message(id, payload);
        let attempts = self.policy.attempts(importance);
        let mut ack = self.acks.register(id);
        let mut delay = self.policy.initial_backoff;

        for attempt in 1..=attempts {
            if let Err(e) = self.socket.send_to(&frame, target).await {
                tracing::debug!(id, %target, attempt, error = %e, "send attempt failed");
            }
            match tokio::time::timeout(delay, &mut ack).await {
                Ok(Ok(())) => {
                    tracing::trace!(id, %target, attempt, "message acknowledged");
                    return Ok(());
                }
                Ok(Err(_)) => return Err(NetworkError::Closed),
                Err(_) => {
                    tracing::trace!(id, %target, attempt, ?delay, "no ACK yet");
                    delay = self.policy.next_backoff(delay);
                }
            }
        }

        self.acks.cancel(id);
        tracing::warn!(id, %target, attempts, "giving up on message");
        Err(NetworkError::DeliveryFailed { target, attempts })
    }

    /// Acknowledge message `id` to its sender. Fire and forget.
    pub async fn acknowledge(&self, id: u32, target: SocketAddr) {
        if let Err(e) = self.socket.send_to(&Frame::encode_ack(id), target).await {
            tracing::debug!(id, %target, error = %e, "failed to send ACK");
        }
    }

    /// Sort a received frame. ACK frames are routed to their waiting sender
    /// and yield `None`; message frames are returned for processing.
    pub fn classify<'a>(&self, bytes: &'a [u8]) -> Result<Option<Inbound<'a>>, NetworkError> {
        match Frame::parse(bytes)? {
            Frame::Ack(id) => {
                if !self.acks.resolve(id) {
                    tracing::trace!(id, "stray ACK");
                }
                Ok(None)
            }
            Frame::Message { id, payload } => Ok(Some(Inbound { id, payload })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UdpSocket;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(40),
            low_importance_attempts: 5,
            high_importance_attempts: 12,
        }
    }

    async fn loopback() -> Arc<UdpSocket> {
        Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap())
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        let mut delay = policy.initial_backoff;
        let mut seen = Vec::new();
        for _ in 0..6 {
            seen.push(delay.as_secs());
            delay = policy.next_backoff(delay);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 16]);
    }

    #[test]
    fn importance_tiers() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(Importance::Low), 5);
        assert_eq!(policy.attempts(Importance::High), 12);
    }

    #[tokio::test]
    async fn unacknowledged_low_importance_sends_five_times() {
        let sender = ReliableTransport::new(loopback().await, fast_policy());
        let silent = loopback().await;
        let target = silent.local_addr().unwrap();

        let result = sender.send(b"hello", target, Importance::Low).await;
        assert!(matches!(
            result,
            Err(NetworkError::DeliveryFailed { attempts: 5, .. })
        ));
        assert_eq!(sender.pending_acks(), 0);

        let mut count = 0;
        let mut buf = [0u8; 64];
        while let Ok(Ok((len, _))) =
            tokio::time::timeout(Duration::from_millis(50), silent.recv_from(&mut buf)).await
        {
            assert_eq!(&buf[4..len], b"hello");
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[tokio::test]
    async fn acknowledged_send_succeeds() {
        let sender = Arc::new(ReliableTransport::new(loopback().await, fast_policy()));
        let receiver = ReliableTransport::new(loopback().await, fast_policy());
        let sender_addr = sender.socket().local_addr().unwrap();
        let receiver_addr = receiver.socket().local_addr().unwrap();

        let pump = {
            let sender = Arc::clone(&sender);
            tokio::spawn(async move {
                let mut buf = [0u8; 64];
                loop {
                    let (len, _) = sender.socket().recv_from(&mut buf).await.unwrap();
                    if sender.classify(&buf[..len]).unwrap().is_none() {
                        break;
                    }
                }
            })
        };

        let echo = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, from) = receiver.socket().recv_from(&mut buf).await.unwrap();
            let inbound = receiver.classify(&buf[..len]).unwrap().unwrap();
            assert_eq!(inbound.payload, b"ping");
            receiver.acknowledge(inbound.id, from).await;
            assert_eq!(from, sender_addr);
        });

        sender
            .send(b"ping", receiver_addr, Importance::High)
            .await
            .unwrap();
        echo.await.unwrap();
        pump.await.unwrap();
    }

    #[tokio::test]
    async fn classifying_alone_does_not_acknowledge() {
        let policy = RetryPolicy {
            low_importance_attempts: 2,
            ..fast_policy()
        };
        let sender = ReliableTransport::new(loopback().await, policy);
        let receiver = ReliableTransport::new(loopback().await, fast_policy());
        let receiver_addr = receiver.socket().local_addr().unwrap();

        let reader = tokio::spawn(async move {
            let mut buf = [0u8; 64];
            let (len, _) = receiver.socket().recv_from(&mut buf).await.unwrap();
            let inbound = receiver.classify(&buf[..len]).unwrap().unwrap();
            assert_eq!(inbound.payload, b"ping");
        });

        let result = sender.send(b"ping", receiver_addr, Importance::Low).await;
        assert!(matches!(
            result,
            Err(NetworkError::DeliveryFailed { attempts: 2, .. })
        ));
        reader.await.unwrap();
    }

    #[tokio::test]
    async fn message_ids_are_unique() {
        let transport = ReliableTransport::new(loopback().await, fast_policy());
        let a = transport.allocate_id();
        let b = transport.allocate_id();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn runt_frame_is_protocol_error() {
        let transport = ReliableTransport::new(loopback().await, fast_policy());
        assert!(matches!(
            transport.classify(&[1, 2]),
            Err(NetworkError::Protocol(_))
        ));
    }
}
