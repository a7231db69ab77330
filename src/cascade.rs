//! Leaf-to-root subtree deletion.
//!
//! Dropping a category (or an item) tears down everything beneath it in a
//! fixed order: unit tables first, then the owning rows, then the owning
//! table, then the root row. The caller supplies the executor, normally a
//! [`crate::transaction::Transaction`], so the whole walk is atomic.

use log::info;
use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::ident::TableIdent;
use crate::quantity;
use crate::schema::TableLifecycle;

/// Delete a category and its whole subtree.
///
/// Order: every item's unit table, then the category's item rows, then the
/// category's item table, then the category row itself. Registry claims are
/// released as their tables go.
///
/// # Errors
///
/// `StoreError::NotFound` when no category has this id;
/// `StoreError::Storage` when any statement fails.
pub fn delete_category(executor: &dyn StoreExecutor, category_id: i32) -> Result<(), StoreError> {
    let lifecycle = TableLifecycle::new(executor);

    let row = executor
        .query_opt(
            "SELECT table_ident FROM categories WHERE id = $1",
            &[Value::Int(Some(category_id))],
        )?
        .ok_or_else(|| StoreError::NotFound(format!("category {category_id}")))?;
    let table_ident = TableIdent::checked(row.try_get::<String>("table_ident")?)?;

    if lifecycle.table_exists(&table_ident)? {
        let sql = format!("SELECT unit_ident FROM {}", table_ident.quoted());
        let items = executor.query_all(&sql, &[])?;
        for item in items {
            let unit_ident = TableIdent::checked(item.try_get::<String>("unit_ident")?)?;
            if lifecycle.table_exists(&unit_ident)? {
                lifecycle.drop_table(&unit_ident)?;
            }
            lifecycle.release_ident(&unit_ident)?;
        }
        let clear = format!("DELETE FROM {}", table_ident.quoted());
        executor.execute(&clear, &[])?;
        lifecycle.drop_table(&table_ident)?;
    }
    lifecycle.release_ident(&table_ident)?;

    executor.execute(
        "DELETE FROM categories WHERE id = $1",
        &[Value::Int(Some(category_id))],
    )?;
    info!("deleted category {category_id} and its subtree ({table_ident})");
    Ok(())
}

/// Delete one item and its unit table, settling the category's quantity.
///
/// # Errors
///
/// `StoreError::NotFound` when no item has this id in the category's table;
/// `StoreError::Storage` when any statement fails.
pub fn delete_item(
    executor: &dyn StoreExecutor,
    category_table: &TableIdent,
    item_id: i32,
) -> Result<(), StoreError> {
    let lifecycle = TableLifecycle::new(executor);

    let sql = format!(
        "SELECT parent_category_id, quantity, unit_ident FROM {} WHERE id = $1",
        category_table.quoted()
    );
    let row = executor
        .query_opt(&sql, &[Value::Int(Some(item_id))])?
        .ok_or_else(|| StoreError::NotFound(format!("item {item_id} in {category_table}")))?;
    let parent_category_id: i32 = row.try_get("parent_category_id")?;
    let item_quantity: i32 = row.try_get("quantity")?;
    let unit_ident = TableIdent::checked(row.try_get::<String>("unit_ident")?)?;

    if lifecycle.table_exists(&unit_ident)? {
        lifecycle.drop_table(&unit_ident)?;
    }
    lifecycle.release_ident(&unit_ident)?;

    quantity::decrement_clamped(
        executor,
        &TableIdent::categories(),
        parent_category_id,
        item_quantity,
    )?;

    let delete = format!("DELETE FROM {} WHERE id = $1", category_table.quoted());
    executor.execute(&delete, &[Value::Int(Some(item_id))])?;
    info!("deleted item {item_id} from {category_table} ({unit_ident})");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::value::Row;

    fn present_row() -> Vec<Row> {
        vec![Row::from_pairs([("present", Value::Int(Some(1)))])]
    }

    #[test]
    fn test_delete_category_walks_leaf_to_root() {
        let mock = MockExecutor::new().append_query_results(vec![
            vec![Row::from_pairs([(
                "table_ident",
                Value::String(Some("electronics".to_owned())),
            )])],
            present_row(), // electronics exists
            vec![Row::from_pairs([(
                "unit_ident",
                Value::String(Some("pc".to_owned())),
            )])],
            present_row(), // pc exists
        ]);
        delete_category(&mock, 7).unwrap();
        assert_eq!(
            mock.issued_sql(),
            vec![
                "SELECT table_ident FROM categories WHERE id = $1",
                "SELECT 1 AS present FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1",
                "SELECT unit_ident FROM \"electronics\"",
                "SELECT 1 AS present FROM information_schema.tables \
                 WHERE table_schema = current_schema() AND table_name = $1",
                "DROP TABLE \"pc\"",
                "DELETE FROM table_registry WHERE ident = $1",
                "DELETE FROM \"electronics\"",
                "DROP TABLE \"electronics\"",
                "DELETE FROM table_registry WHERE ident = $1",
                "DELETE FROM categories WHERE id = $1",
            ]
        );
    }

    #[test]
    fn test_delete_category_missing_is_not_found() {
        let mock = MockExecutor::new().append_query_results(vec![vec![]]);
        let err = delete_category(&mock, 99).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(mock.issued_sql().len(), 1);
    }

    #[test]
    fn test_delete_category_tolerates_missing_item_table() {
        let mock = MockExecutor::new().append_query_results(vec![
            vec![Row::from_pairs([(
                "table_ident",
                Value::String(Some("electronics".to_owned())),
            )])],
            vec![], // table never created
        ]);
        delete_category(&mock, 7).unwrap();
        let sql = mock.issued_sql();
        assert!(!sql.iter().any(|s| s.starts_with("DROP TABLE \"electronics\"")));
        assert_eq!(sql.last().unwrap(), "DELETE FROM categories WHERE id = $1");
    }

    #[test]
    fn test_delete_item_settles_category_quantity() {
        let mock = MockExecutor::new().append_query_results(vec![
            vec![Row::from_pairs([
                ("parent_category_id", Value::Int(Some(3))),
                ("quantity", Value::Int(Some(5))),
                ("unit_ident", Value::String(Some("pc".to_owned()))),
            ])],
            present_row(),
        ]);
        let table = TableIdent::checked("electronics").unwrap();
        delete_item(&mock, &table, 11).unwrap();
        let transcript = mock.transcript();
        let clamp = transcript
            .iter()
            .find(|s| s.sql.contains("GREATEST"))
            .unwrap();
        assert_eq!(
            clamp.sql,
            "UPDATE \"categories\" SET quantity = GREATEST(quantity - $1, 0) WHERE id = $2"
        );
        assert_eq!(clamp.params, vec![Value::Int(Some(5)), Value::Int(Some(3))]);
        assert_eq!(
            transcript.last().unwrap().sql,
            "DELETE FROM \"electronics\" WHERE id = $1"
        );
    }

    #[test]
    fn test_delete_item_missing_is_not_found() {
        let mock = MockExecutor::new().append_query_results(vec![vec![]]);
        let table = TableIdent::checked("electronics").unwrap();
        let err = delete_item(&mock, &table, 42).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }
}
