//! Quantity ledger updates.
//!
//! Categories and items carry a denormalized `quantity` column maintained
//! alongside unit writes. Increments are unbounded; decrements clamp at
//! zero in the statement itself, so a ledger that has drifted low never
//! goes negative.

use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::ident::TableIdent;

/// Add `delta` to a row's quantity.
///
/// # Errors
///
/// `StoreError::Storage` when the update fails.
pub fn increment(
    executor: &dyn StoreExecutor,
    table: &TableIdent,
    row_id: i32,
    delta: i32,
) -> Result<(), StoreError> {
    let sql = format!(
        "UPDATE {} SET quantity = quantity + $1 WHERE id = $2",
        table.quoted()
    );
    executor.execute(&sql, &[Value::Int(Some(delta)), Value::Int(Some(row_id))])?;
    Ok(())
}

/// Subtract `delta` from a row's quantity, clamping at zero.
///
/// # Errors
///
/// `StoreError::Storage` when the update fails.
pub fn decrement_clamped(
    executor: &dyn StoreExecutor,
    table: &TableIdent,
    row_id: i32,
    delta: i32,
) -> Result<(), StoreError> {
    let sql = format!(
        "UPDATE {} SET quantity = GREATEST(quantity - $1, 0) WHERE id = $2",
        table.quoted()
    );
    executor.execute(&sql, &[Value::Int(Some(delta)), Value::Int(Some(row_id))])?;
    Ok(())
}
