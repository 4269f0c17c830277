//! Order Accumulator
//!
//! Append-only buffer of derived order requests, safe under concurrent
//! appenders (one per dispatch worker) and one drainer (the execution
//! engine). Append and drain are mutually exclusive under a single
//! lock, so a drain never observes a partial append and the buffer is
//! empty before the next append can land.

use parking_lot::Mutex;

use crate::domain::OrderRequest;

/// Thread-safe buffer of pending order requests.
#[derive(Debug, Default)]
pub struct OrderAccumulator {
    orders: Mutex<Vec<OrderRequest>>,
}

impl OrderAccumulator {
    /// Create an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one order; returns the number of pending orders including
    /// the new one.
    pub fn append(&self, order: OrderRequest) -> usize {
        let mut orders = self.orders.lock();
        orders.push(order);
        orders.len()
    }

    /// Take the entire current contents as one atomic snapshot, leaving
    /// the accumulator empty.
    #[must_use]
    pub fn drain(&self) -> Vec<OrderRequest> {
        std::mem::take(&mut *self.orders.lock())
    }

    /// Number of pending orders.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.lock().len()
    }

    /// Whether the accumulator is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.lock().is_empty()
    }
}
