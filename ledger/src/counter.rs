//! Replay counters.
//!
//! Every authenticated datagram carries a counter that must be strictly
//! greater than the last one accepted in its scope. Equal counters are
//! replays.

use crate::LedgerError;

/// Read-only freshness check.
pub fn check_counter(last_seen: u32, counter: u32) -> Result<(), LedgerError> {
    if counter > last_seen {
        Ok(())
    } else {
        Err(LedgerError::Replay { counter, last_seen })
    }
}

/// Check freshness and record `counter` as the last one seen.
pub fn advance_counter(last_seen: &mut u32, counter: u32) -> Result<(), LedgerError> {
    check_counter(*last_seen, counter)?;
    *last_seen = counter;
    Ok(())
}

/// Allocate the next outbound counter.
pub fn next_send_counter(send_counter: &mut u32) -> Result<u32, LedgerError> {
    *send_counter = send_counter
        .checked_add(1)
        .ok_or(LedgerError::CounterExhausted)?;
    Ok(*send_counter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strictly_greater_is_accepted() {
        let mut last = 3;
        advance_counter(&mut last, 5).unwrap();
        assert_eq!(last, 5);
    }

    #[test]
    fn equal_counter_is_a_replay() {
        let mut last = 5;
        assert_eq!(
            advance_counter(&mut last, 5),
            Err(LedgerError::Replay {
                counter: 5,
                last_seen: 5
            })
        );
        assert_eq!(last, 5);
    }

    #[test]
    fn lower_counter_is_a_replay() {
        assert!(check_counter(10, 2).is_err());
    }

    #[test]
    fn send_counter_increments_and_saturates() {
        let mut sent = 0;
        assert_eq!(next_send_counter(&mut sent), Ok(1));
        assert_eq!(next_send_counter(&mut sent), Ok(2));
        let mut exhausted = u32::MAX;
        assert_eq!(
            next_send_counter(&mut exhausted),
            Err(LedgerError::CounterExhausted)
        );
    }
}
