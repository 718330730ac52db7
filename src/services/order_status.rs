//! Order status transition table.
//!
//! pending -> confirmed | cancelled
//! confirmed -> shipped | cancelled
//! shipped -> delivered
//!
//! `delivered` and `cancelled` are terminal. Same-state transitions are
//! rejected like any other disallowed move.

use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;

pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Confirmed)
            | (Pending, Cancelled)
            | (Confirmed, Shipped)
            | (Confirmed, Cancelled)
            | (Shipped, Delivered)
    )
}

/// Fails with `InvalidTransition` when the requested move is not in the
/// table.
pub fn check_transition(from: OrderStatus, to: OrderStatus) -> Result<(), ServiceError> {
    if is_valid_transition(from, to) {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "cannot move order from '{}' to '{}'",
            from.as_str(),
            to.as_str()
        )))
    }
}

/// Whether cancelling from this state restocks the order lines. Only
/// states that were reached before shipment hold reserved stock.
pub fn cancellation_restocks(from: OrderStatus) -> bool {
    matches!(from, OrderStatus::Pending | OrderStatus::Confirmed)
}
