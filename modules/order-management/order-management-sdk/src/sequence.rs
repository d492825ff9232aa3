//! Caller-side order id allocation.

use crate::proto::OrderRequest;

/// Monotonic order ids for one client session.
///
/// Each session owns its own sequence and threads it into request
/// construction; there is no process-wide counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderIdSequence {
    next: i32,
}

impl Default for OrderIdSequence {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl OrderIdSequence {
    #[must_use]
    pub fn starting_at(first: i32) -> Self {
        Self { next: first }
    }

    /// Id the next request will carry.
    #[must_use]
    pub fn peek(&self) -> i32 {
        self.next
    }

    /// Build a request with the next id and advance the sequence.
    pub fn next_request(&mut self, order_name: impl Into<String>) -> OrderRequest {
        let order_id = self.next;
        self.next = self.next.wrapping_add(1);
        OrderRequest {
            order_id,
            order_name: order_name.into(),
        }
    }
}
