//! Transfer schemas: the validated request/response shapes exposed at the
//! HTTP boundary, kept separate from the persistence entities. Each
//! submodule carries the Create/Update/Read/List variants for one resource
//! and the entity-to-response conversions.

pub mod cart;
pub mod category;
pub mod order;
pub mod product;
pub mod user;

use rust_decimal::Decimal;
use validator::ValidationError;

/// Monetary amounts are non-negative with at most two fractional digits.
pub fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() {
        return Err(ValidationError::new("negative_amount"));
    }
    if value.scale() > 2 {
        return Err(ValidationError::new("too_many_decimal_places"));
    }
    Ok(())
}
