//! Read-only export of the full inventory tree.
//!
//! The snapshot walks categories, items, and units in one pass, probing for
//! each dynamic table before reading it. Entities whose tables never
//! materialized (or could not follow a rename) export with empty children
//! rather than failing the whole walk.

use chrono::NaiveDateTime;
use sea_query::Value;
use serde::Serialize;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::hierarchy::{Category, Item, Unit};
use crate::ident::TableIdent;
use crate::schema::TableLifecycle;

#[derive(Debug, Clone, Serialize)]
pub struct ItemExport {
    #[serde(flatten)]
    pub item: Item,
    pub units: Vec<Unit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryExport {
    #[serde(flatten)]
    pub category: Category,
    pub items: Vec<ItemExport>,
}

/// The whole inventory tree at one point in time.
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub generated_at: NaiveDateTime,
    pub categories: Vec<CategoryExport>,
}

/// Walk the full hierarchy and return it as one serializable tree.
///
/// # Errors
///
/// `StoreError::Storage` when a query fails mid-walk.
pub fn snapshot(executor: &dyn StoreExecutor) -> Result<InventorySnapshot, StoreError> {
    let lifecycle = TableLifecycle::new(executor);

    let category_rows = executor.query_all(
        "SELECT id, name, quantity, table_ident FROM categories ORDER BY id",
        &[],
    )?;
    let mut categories = Vec::with_capacity(category_rows.len());
    for row in &category_rows {
        let category = Category {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            table_ident: row.try_get("table_ident")?,
        };
        let table = TableIdent::checked(category.table_ident.clone())?;
        let items = if lifecycle.table_exists(&table)? {
            export_items(executor, &lifecycle, &table)?
        } else {
            Vec::new()
        };
        categories.push(CategoryExport { category, items });
    }

    Ok(InventorySnapshot {
        generated_at: chrono::Utc::now().naive_utc(),
        categories,
    })
}

fn export_items(
    executor: &dyn StoreExecutor,
    lifecycle: &TableLifecycle<'_>,
    table: &TableIdent,
) -> Result<Vec<ItemExport>, StoreError> {
    let sql = format!(
        "SELECT id, parent_category_id, name, quantity, code, unit_ident FROM {} ORDER BY id",
        table.quoted()
    );
    let item_rows = executor.query_all(&sql, &[])?;
    let mut items = Vec::with_capacity(item_rows.len());
    for row in &item_rows {
        let item = Item {
            id: row.try_get("id")?,
            parent_category_id: row.try_get("parent_category_id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            code: row.try_get("code")?,
            unit_ident: row.try_get("unit_ident")?,
        };
        let unit_table = TableIdent::checked(item.unit_ident.clone())?;
        let units = if lifecycle.table_exists(&unit_table)? {
            export_units(executor, &unit_table, item.id)?
        } else {
            Vec::new()
        };
        items.push(ItemExport { item, units });
    }
    Ok(items)
}

fn export_units(
    executor: &dyn StoreExecutor,
    table: &TableIdent,
    item_id: i32,
) -> Result<Vec<Unit>, StoreError> {
    let sql = format!(
        "SELECT id, parent_id, code, model, cost, issue_date, assigned_to, is_broken, \
         additional_detail FROM {} WHERE parent_id = $1 ORDER BY id",
        table.quoted()
    );
    let rows = executor.query_all(&sql, &[Value::Int(Some(item_id))])?;
    rows.iter()
        .map(|row| {
            Ok(Unit {
                id: row.try_get("id")?,
                parent_id: row.try_get("parent_id")?,
                code: row.try_get("code")?,
                model: row.try_get("model")?,
                cost: row.try_get("cost")?,
                issue_date: row.try_get("issue_date")?,
                assigned_to: row.try_get("assigned_to")?,
                is_broken: row.try_get("is_broken")?,
                additional_detail: row.try_get("additional_detail")?,
            })
        })
        .collect()
}
