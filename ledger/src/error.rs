use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("counter {counter} is not greater than last seen {last_seen}")]
    Replay { counter: u32, last_seen: u32 },

    #[error("creditline {creditline} exceeds trustline {trustline}")]
    Overdrawn { trustline: u32, creditline: u32 },

    #[error("send counter exhausted")]
    CounterExhausted,
}
