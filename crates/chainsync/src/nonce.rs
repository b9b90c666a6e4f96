//! Local transaction-ordering authority for one synchronization session.
//!
//! Several ledger-mutating calls go out back-to-back before any of them
//! confirm, and the ledger requires a signer's nonces to be contiguous. The
//! sequencer is seeded from one `transaction_count` query at session start
//! and advances only when a transaction is actually broadcast: a skipped
//! step (already-mirrored contributor, pre-broadcast rejection) must not
//! leave a gap that would stall every later transaction in the session.
//!
//! Never carry a sequencer across sessions. After a confirmation timeout the
//! local count is unreliable (the unconfirmed transaction may still land),
//! so the next session re-queries the ledger.

#[derive(Debug)]
pub struct NonceSequencer {
    starting: u64,
    current: u64,
}

impl NonceSequencer {
    /// `starting` is the signer's transaction count as reported by the
    /// ledger at session start.
    pub fn new(starting: u64) -> Self {
        Self {
            starting,
            current: starting,
        }
    }

    /// The nonce the next submission will use. Does not consume.
    pub fn peek(&self) -> u64 {
        self.current
    }

    /// Consume the current nonce. Call only after a transaction was actually
    /// broadcast with `peek()`'s value.
    pub fn advance(&mut self) -> u64 {
        let n = self.current;
        self.current += 1;
        n
    }

    pub fn starting(&self) -> u64 {
        self.starting
    }

    /// How many transactions this session has submitted.
    pub fn consumed(&self) -> u64 {
        self.current - self.starting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_contiguously_from_starting() {
        let mut seq = NonceSequencer::new(41);
        assert_eq!(seq.peek(), 41);
        assert_eq!(seq.advance(), 41);
        assert_eq!(seq.advance(), 42);
        assert_eq!(seq.peek(), 43);
        assert_eq!(seq.consumed(), 2);
        assert_eq!(seq.starting(), 41);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut seq = NonceSequencer::new(0);
        assert_eq!(seq.peek(), 0);
        assert_eq!(seq.peek(), 0);
        assert_eq!(seq.consumed(), 0);
        seq.advance();
        assert_eq!(seq.consumed(), 1);
    }
}
