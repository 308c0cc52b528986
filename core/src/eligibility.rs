//! Purchase eligibility rule.
//!
//! Pure business logic: given the orders found for a user, decide whether
//! they may watch the stream. No I/O happens here.

use crate::types::{OrderRecord, OrderStatus};
use std::collections::HashSet;

/// Operator-configured purchase rule.
///
/// A user is eligible iff at least one order
///
/// 1. has a status in `accepted_statuses`, and
/// 2. when `ticket_items` is non-empty, contains a position for one of those
///    products, and
/// 3. when `event` is set and the order reports its event, belongs to it.
///
/// # Example
///
/// ```
/// use ticket_gate_core::{EligibilityPolicy, OrderRecord, OrderStatus};
///
/// let policy = EligibilityPolicy::default();
/// let orders = vec![OrderRecord::new("ABC12", OrderStatus::Paid)];
/// assert!(policy.evaluate(&orders));
/// assert!(!policy.evaluate(&[]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibilityPolicy {
    accepted_statuses: HashSet<OrderStatus>,
    ticket_items: HashSet<u64>,
    event: Option<String>,
}

impl EligibilityPolicy {
    /// Create a policy accepting the given statuses.
    #[must_use]
    pub fn new(accepted_statuses: impl IntoIterator<Item = OrderStatus>) -> Self {
        Self {
            accepted_statuses: accepted_statuses.into_iter().collect(),
            ticket_items: HashSet::new(),
            event: None,
        }
    }

    /// Only count orders containing one of these products.
    #[must_use]
    pub fn with_ticket_items(mut self, items: impl IntoIterator<Item = u64>) -> Self {
        self.ticket_items = items.into_iter().collect();
        self
    }

    /// Only count orders for this event slug.
    #[must_use]
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Statuses that count as a purchase.
    #[must_use]
    pub const fn accepted_statuses(&self) -> &HashSet<OrderStatus> {
        &self.accepted_statuses
    }

    /// Decide eligibility from a user's orders.
    #[must_use]
    pub fn evaluate(&self, orders: &[OrderRecord]) -> bool {
        orders.iter().any(|order| self.qualifies(order))
    }

    fn qualifies(&self, order: &OrderRecord) -> bool {
        if !self.accepted_statuses.contains(&order.status) {
            return false;
        }

        if let (Some(wanted), Some(actual)) = (&self.event, &order.event) {
            if wanted != actual {
                return false;
            }
        }

        self.ticket_items.is_empty()
            || order.item_ids.iter().any(|item| self.ticket_items.contains(item))
    }
}

impl Default for EligibilityPolicy {
    fn default() -> Self {
        Self::new([OrderStatus::Paid])
    }
}
