//! Datagram authentication.
//!
//! Loads the key for the datagram's scope (the account's client key for
//! client commands, the relation key for peer commands), checks the MAC and
//! pre-checks the replay counter. Nothing is written here: the counter is
//! advanced by the handler in the same record write as its ledger effect.

use std::sync::Arc;

use ripple_ledger::{check_counter, LedgerError};
use ripple_protocol::{Command, CommandScope, Datagram};
use ripple_store::{KeyScope, KeyStore, LedgerStore, StoreError};
use ripple_types::SecretKey;

use crate::AuthError;

/// A refused datagram, with the key to sign an error reply when the sender
/// is a client that deserves one.
#[derive(Debug)]
pub struct Rejection {
    pub error: AuthError,
    pub reply_key: Option<SecretKey>,
}

impl Rejection {
    fn silent(error: AuthError) -> Self {
        Self {
            error,
            reply_key: None,
        }
    }
}

pub struct Authenticator {
    store: Arc<dyn LedgerStore>,
    keys: Arc<dyn KeyStore>,
}

/// The key that signs `datagram`.
pub fn key_scope(datagram: &Datagram) -> KeyScope {
    match datagram.command {
        Command::Client(_) => KeyScope::Client(datagram.username.clone()),
        Command::Peer(_) => KeyScope::Relation(datagram.relation_key()),
    }
}

impl Authenticator {
    pub fn new(store: Arc<dyn LedgerStore>, keys: Arc<dyn KeyStore>) -> Self {
        Self { store, keys }
    }

    /// Authenticate `datagram`, returning the key it was signed with.
    pub fn verify(&self, datagram: &Datagram) -> Result<SecretKey, Rejection> {
        let scope = key_scope(datagram);
        let key = match self.keys.load_key(&scope) {
            Ok(key) => key,
            Err(e) if e.is_not_found() => {
                return Err(Rejection::silent(AuthError::UnknownKey(scope)))
            }
            Err(e) => return Err(Rejection::silent(AuthError::Storage(e))),
        };

        // A client whose key we hold gets a signed explanation; peers and
        // replays get nothing.
        let reject = |error: AuthError| Rejection {
            reply_key: match (datagram.command, &error) {
                (Command::Client(_), e) if !e.is_replay() => Some(key.clone()),
                _ => None,
            },
            error,
        };

        if !datagram.verify(&key) {
            return Err(reject(AuthError::BadSignature));
        }
        let last_seen = self.last_seen(datagram).map_err(&reject)?;
        if let Err(LedgerError::Replay { counter, last_seen }) =
            check_counter(last_seen, datagram.counter)
        {
            return Err(reject(AuthError::Replay { counter, last_seen }));
        }
        Ok(key)
    }

    /// The last counter accepted in the datagram's counter scope.
    fn last_seen(&self, datagram: &Datagram) -> Result<u32, AuthError> {
        if let Command::Client(cmd) = datagram.command {
            if cmd.scope() == CommandScope::Account {
                return self
                    .store
                    .get_account(&datagram.username)
                    .map(|a| a.counter)
                    .map_err(|e| {
                        missing(e, || AuthError::UnknownAccount(datagram.username.to_string()))
                    });
            }
        }
        let key = datagram.relation_key();
        let relation = self
            .store
            .get_relation(&key)
            .map_err(|e| missing(e, || AuthError::UnknownRelation(key.to_string())))?;
        Ok(if datagram.command.is_peer() {
            relation.counter_in
        } else {
            relation.counter_out
        })
    }
}

fn missing(e: StoreError, not_found: impl FnOnce() -> AuthError) -> AuthError {
    if e.is_not_found() {
        not_found()
    } else {
        AuthError::Storage(e)
    }
}
