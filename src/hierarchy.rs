//! The hierarchy repository: categories, items, and units.
//!
//! This is the crate's front door. Each category owns a dynamically-named
//! table of items, and each item owns a dynamically-named table of units.
//! Physical table identity is always resolved through the persisted
//! `table_ident` / `unit_ident` columns, never re-derived from display
//! names, so renames that could not move a table stay harmless.
//!
//! Update payloads arrive as JSON objects and are filtered against a
//! per-level allow-list before any SQL is assembled; unknown fields are
//! dropped silently, mistyped known fields are validation errors.

use std::str::FromStr;

use chrono::NaiveDateTime;
use log::warn;
use rust_decimal::Decimal;
use sea_query::Value;
use serde::Serialize;

use crate::cascade;
use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::ident::TableIdent;
use crate::quantity;
use crate::schema::{RenameOutcome, TableKind, TableLifecycle};
use crate::transaction::with_transaction;
use crate::value::Row;

/// A category row from the fixed root table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub quantity: i32,
    pub table_ident: String,
}

impl Category {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            table_ident: row.try_get("table_ident")?,
        })
    }
}

/// An item row from a category's table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Item {
    pub id: i32,
    pub parent_category_id: i32,
    pub name: String,
    pub quantity: i32,
    pub code: Option<String>,
    pub unit_ident: String,
}

impl Item {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
            id: row.try_get("id")?,
            parent_category_id: row.try_get("parent_category_id")?,
            name: row.try_get("name")?,
            quantity: row.try_get("quantity")?,
            code: row.try_get("code")?,
            unit_ident: row.try_get("unit_ident")?,
        })
    }
}

/// A unit row from an item's table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Unit {
    pub id: i32,
    pub parent_id: i32,
    pub code: String,
    pub model: Option<String>,
    pub cost: Option<Decimal>,
    pub issue_date: Option<NaiveDateTime>,
    pub assigned_to: Option<String>,
    pub is_broken: Option<bool>,
    pub additional_detail: Option<String>,
}

impl Unit {
    fn from_row(row: &Row) -> Result<Self, StoreError> {
        Ok(Self {
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
    }
}

/// Result of an item update.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    /// What happened to the item's unit table when the name changed.
    /// `None` when the update did not touch the name.
    pub rename: Option<RenameOutcome>,
}

#[derive(Debug, Clone, Copy)]
enum FieldKind {
    Text,
    Integer,
    Numeric,
    Boolean,
}

const CATEGORY_FIELDS: &[(&str, FieldKind)] =
    &[("name", FieldKind::Text), ("quantity", FieldKind::Integer)];

const ITEM_FIELDS: &[(&str, FieldKind)] = &[
    ("name", FieldKind::Text),
    ("quantity", FieldKind::Integer),
    ("code", FieldKind::Text),
];

const UNIT_FIELDS: &[(&str, FieldKind)] = &[
    ("code", FieldKind::Text),
    ("model", FieldKind::Text),
    ("cost", FieldKind::Numeric),
    ("assigned_to", FieldKind::Text),
    ("is_broken", FieldKind::Boolean),
    ("additional_detail", FieldKind::Text),
];

/// Stock code assigned to units created without one.
const DEFAULT_UNIT_CODE: &str = "YY--XXX";

const CATEGORY_COLUMNS: &str = "id, name, quantity, table_ident";
const ITEM_COLUMNS: &str = "id, parent_category_id, name, quantity, code, unit_ident";
const UNIT_COLUMNS: &str =
    "id, parent_id, code, model, cost, issue_date, assigned_to, is_broken, additional_detail";

/// Keep only allow-listed fields, converting each to a bind value.
///
/// Unknown fields are dropped without comment. A known field of the wrong
/// JSON type is a validation error. Output order follows the allow-list.
fn filter_fields(
    input: &serde_json::Value,
    allowed: &[(&str, FieldKind)],
) -> Result<Vec<(String, Value)>, StoreError> {
    let object = input
        .as_object()
        .ok_or_else(|| StoreError::Validation("update payload must be a JSON object".to_owned()))?;

    let mut fields = Vec::new();
    for (name, kind) in allowed {
        let Some(raw) = object.get(*name) else {
            continue;
        };
        let value = convert_field(name, *kind, raw)?;
        fields.push(((*name).to_owned(), value));
    }
    Ok(fields)
}

fn convert_field(
    name: &str,
    kind: FieldKind,
    raw: &serde_json::Value,
) -> Result<Value, StoreError> {
    if raw.is_null() {
        return Ok(match kind {
            FieldKind::Text => Value::String(None),
            FieldKind::Integer => Value::Int(None),
            FieldKind::Numeric => Value::Decimal(None),
            FieldKind::Boolean => Value::Bool(None),
        });
    }
    match kind {
        FieldKind::Text => raw
            .as_str()
            .map(|s| Value::String(Some(s.to_owned())))
            .ok_or_else(|| StoreError::Validation(format!("field {name:?} must be a string"))),
        FieldKind::Integer => raw
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(|n| Value::Int(Some(n)))
            .ok_or_else(|| StoreError::Validation(format!("field {name:?} must be an integer"))),
        FieldKind::Numeric => {
            let parsed = match raw {
                serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
                serde_json::Value::String(s) => Decimal::from_str(s).ok(),
                _ => None,
            };
            parsed
                .map(|d| Value::Decimal(Some(d)))
                .ok_or_else(|| StoreError::Validation(format!("field {name:?} must be numeric")))
        }
        FieldKind::Boolean => raw
            .as_bool()
            .map(|b| Value::Bool(Some(b)))
            .ok_or_else(|| StoreError::Validation(format!("field {name:?} must be a boolean"))),
    }
}

/// Pull the mandatory `name` out of a filtered create payload, trimmed.
///
/// The trimmed form is written back so the stored display name matches
/// what the identifier was derived from.
fn required_name(fields: &mut [(String, Value)]) -> Result<String, StoreError> {
    let Some((_, value)) = fields.iter_mut().find(|(n, _)| n == "name") else {
        return Err(StoreError::Validation("name is required".to_owned()));
    };
    let trimmed = match value {
        Value::String(Some(s)) => s.trim().to_owned(),
        _ => String::new(),
    };
    if trimmed.is_empty() {
        return Err(StoreError::Validation("name is required".to_owned()));
    }
    *value = Value::String(Some(trimmed.clone()));
    Ok(trimmed)
}

/// Assemble `a, b, c` column text and `$start, $start+1, ...` placeholders.
fn insert_clause(fields: &[(String, Value)], start: usize) -> (String, String) {
    let columns = fields
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (0..fields.len())
        .map(|i| format!("${}", start + i))
        .collect::<Vec<_>>()
        .join(", ");
    (columns, placeholders)
}

/// Assemble `SET a = $1, b = $2, ...` and the matching param vector.
fn set_clause(fields: &[(String, Value)]) -> (String, Vec<Value>) {
    let assignments = fields
        .iter()
        .enumerate()
        .map(|(i, (name, _))| format!("{name} = ${}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let params = fields.iter().map(|(_, v)| v.clone()).collect();
    (assignments, params)
}

/// CRUD over the three-level hierarchy, all through one executor.
pub struct HierarchyRepository<E: StoreExecutor> {
    executor: E,
}

impl<E: StoreExecutor> HierarchyRepository<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Create the fixed root tables if needed. Call once at startup.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when bootstrap DDL fails.
    pub fn bootstrap(&self) -> Result<(), StoreError> {
        TableLifecycle::new(&self.executor).init_store()
    }

    /// All categories, oldest first.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the query fails.
    pub fn categories(&self) -> Result<Vec<Category>, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY id");
        let rows = self.executor.query_all(&sql, &[])?;
        rows.iter().map(Category::from_row).collect()
    }

    /// One category by id.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no category has this id.
    pub fn category(&self, category_id: i32) -> Result<Category, StoreError> {
        let sql = format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1");
        let row = self
            .executor
            .query_opt(&sql, &[Value::Int(Some(category_id))])?
            .ok_or_else(|| StoreError::NotFound(format!("category {category_id}")))?;
        Category::from_row(&row)
    }

    /// Create a category and its item table from a JSON field map.
    ///
    /// The payload is filtered through the category allow-list (`name`,
    /// `quantity`); unknown fields are dropped and `name` is mandatory.
    /// The table identifier is derived from the name, claimed in the
    /// registry, and persisted on the category row, all in one transaction.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` for a missing or empty name,
    /// `StoreError::InvalidIdentifier` when the name cannot become a table
    /// identifier, `StoreError::Conflict` when another entity already claims
    /// the identifier.
    pub fn create_category(&self, fields: &serde_json::Value) -> Result<Category, StoreError> {
        let mut fields = filter_fields(fields, CATEGORY_FIELDS)?;
        let name = required_name(&mut fields)?;
        let ident = TableIdent::derive(&name)?;

        with_transaction(&self.executor, |tx| {
            let lifecycle = TableLifecycle::new(tx);
            if lifecycle.ident_claimed(&ident)? {
                return Err(StoreError::Conflict(format!(
                    "table identifier {ident} is already in use"
                )));
            }
            let (columns, placeholders) = insert_clause(&fields, 1);
            let sql = format!(
                "INSERT INTO categories ({columns}, table_ident) VALUES ({placeholders}, ${}) \
                 RETURNING {CATEGORY_COLUMNS}",
                fields.len() + 1
            );
            let mut params: Vec<Value> = fields.iter().map(|(_, v)| v.clone()).collect();
            params.push(Value::String(Some(ident.as_str().to_owned())));
            let row = tx
                .query_opt(&sql, &params)?
                .ok_or_else(|| StoreError::Storage("insert returned no row".to_owned()))?;
            let category = Category::from_row(&row)?;
            lifecycle.claim_ident(&ident, TableKind::Category, category.id)?;
            lifecycle.ensure_category_table(&ident)?;
            Ok(category)
        })
    }

    /// Update a category's own fields.
    ///
    /// Renaming a category changes only its display name. The item table
    /// keeps the identifier it was created with.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` when no updatable field is present,
    /// `StoreError::NotFound` when no category has this id.
    pub fn update_category(
        &self,
        category_id: i32,
        fields: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let fields = filter_fields(fields, CATEGORY_FIELDS)?;
        if fields.is_empty() {
            return Err(StoreError::Validation("no updatable fields in payload".to_owned()));
        }
        let (assignments, mut params) = set_clause(&fields);
        let sql = format!(
            "UPDATE categories SET {assignments} WHERE id = ${}",
            params.len() + 1
        );
        params.push(Value::Int(Some(category_id)));
        let affected = self.executor.execute(&sql, &params)?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("category {category_id}")));
        }
        Ok(())
    }

    /// Delete a category and everything beneath it.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no category has this id; the transaction
    /// rolls back on any failure mid-cascade.
    pub fn delete_category(&self, category_id: i32) -> Result<(), StoreError> {
        with_transaction(&self.executor, |tx| cascade::delete_category(tx, category_id))
    }

    /// All items of a category, oldest first.
    ///
    /// The item table is ensured first, so a category created before its
    /// table materialized still reads as empty instead of failing.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when no category has this id.
    pub fn items(&self, category_id: i32) -> Result<Vec<Item>, StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        TableLifecycle::new(&self.executor).ensure_category_table(&table)?;
        let sql = format!("SELECT {ITEM_COLUMNS} FROM {} ORDER BY id", table.quoted());
        let rows = self.executor.query_all(&sql, &[])?;
        rows.iter().map(Item::from_row).collect()
    }

    /// Create an item in a category from a JSON field map.
    ///
    /// The payload is filtered through the item allow-list (`name`,
    /// `quantity`, `code`); unknown fields are dropped and `name` is
    /// mandatory. The item's unit-table identifier is derived and claimed
    /// now; the unit table itself is created lazily on first unit access.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` for a missing or empty name,
    /// `StoreError::NotFound` for a missing category,
    /// `StoreError::InvalidIdentifier` / `StoreError::Conflict` for
    /// identifier problems.
    pub fn create_item(
        &self,
        category_id: i32,
        fields: &serde_json::Value,
    ) -> Result<Item, StoreError> {
        let mut fields = filter_fields(fields, ITEM_FIELDS)?;
        let name = required_name(&mut fields)?;
        let (_, table) = self.resolve_category(category_id)?;
        let unit_ident = TableIdent::derive(&name)?;

        with_transaction(&self.executor, |tx| {
            let lifecycle = TableLifecycle::new(tx);
            lifecycle.ensure_category_table(&table)?;
            if lifecycle.ident_claimed(&unit_ident)? {
                return Err(StoreError::Conflict(format!(
                    "table identifier {unit_ident} is already in use"
                )));
            }
            let (columns, placeholders) = insert_clause(&fields, 2);
            let sql = format!(
                "INSERT INTO {} (parent_category_id, {columns}, unit_ident) \
                 VALUES ($1, {placeholders}, ${}) RETURNING {ITEM_COLUMNS}",
                table.quoted(),
                fields.len() + 2
            );
            let mut params = vec![Value::Int(Some(category_id))];
            params.extend(fields.iter().map(|(_, v)| v.clone()));
            params.push(Value::String(Some(unit_ident.as_str().to_owned())));
            let row = tx
                .query_opt(&sql, &params)?
                .ok_or_else(|| StoreError::Storage("insert returned no row".to_owned()))?;
            let item = Item::from_row(&row)?;
            lifecycle.claim_ident(&unit_ident, TableKind::Unit, item.id)?;
            Ok(item)
        })
    }

    /// Update an item, renaming its unit table when the name changes.
    ///
    /// A rename that cannot move the table (identifier already claimed, or
    /// a physical table sits on the target name) is skipped with a warning;
    /// the item keeps its old `unit_ident` and the update still succeeds.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` when no updatable field is present,
    /// `StoreError::NotFound` when the item is not in this category.
    pub fn update_item(
        &self,
        category_id: i32,
        item_id: i32,
        fields: &serde_json::Value,
    ) -> Result<ItemUpdate, StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        let fields = filter_fields(fields, ITEM_FIELDS)?;
        if fields.is_empty() {
            return Err(StoreError::Validation("no updatable fields in payload".to_owned()));
        }
        let new_ident = fields
            .iter()
            .find(|(name, _)| name == "name")
            .and_then(|(_, v)| match v {
                Value::String(Some(s)) => Some(s.clone()),
                _ => None,
            })
            .map(|s| TableIdent::derive(&s))
            .transpose()?;

        with_transaction(&self.executor, |tx| {
            let lifecycle = TableLifecycle::new(tx);
            let select = format!(
                "SELECT unit_ident FROM {} WHERE id = $1 AND parent_category_id = $2",
                table.quoted()
            );
            let row = tx
                .query_opt(
                    &select,
                    &[Value::Int(Some(item_id)), Value::Int(Some(category_id))],
                )?
                .ok_or_else(|| {
                    StoreError::NotFound(format!("item {item_id} in category {category_id}"))
                })?;
            let old_ident = TableIdent::checked(row.try_get::<String>("unit_ident")?)?;

            let (assignments, mut params) = set_clause(&fields);
            let sql = format!(
                "UPDATE {} SET {assignments} WHERE id = ${} AND parent_category_id = ${}",
                table.quoted(),
                params.len() + 1,
                params.len() + 2
            );
            params.push(Value::Int(Some(item_id)));
            params.push(Value::Int(Some(category_id)));
            tx.execute(&sql, &params)?;

            let rename = match new_ident {
                Some(new_ident) if new_ident != old_ident => {
                    if lifecycle.ident_claimed(&new_ident)? {
                        warn!(
                            "keeping unit table {old_ident} for item {item_id}: \
                             identifier {new_ident} is already claimed"
                        );
                        Some(RenameOutcome::TargetExists)
                    } else {
                        let outcome = lifecycle.rename_table(&old_ident, &new_ident)?;
                        match outcome {
                            RenameOutcome::Renamed | RenameOutcome::SourceMissing => {
                                let repoint = format!(
                                    "UPDATE {} SET unit_ident = $1 WHERE id = $2",
                                    table.quoted()
                                );
                                tx.execute(
                                    &repoint,
                                    &[
                                        Value::String(Some(new_ident.as_str().to_owned())),
                                        Value::Int(Some(item_id)),
                                    ],
                                )?;
                                lifecycle.reassign_ident(&old_ident, &new_ident)?;
                            }
                            RenameOutcome::TargetExists => {
                                warn!(
                                    "keeping unit table {old_ident} for item {item_id}: \
                                     a table named {new_ident} already exists"
                                );
                            }
                            RenameOutcome::Unchanged => {}
                        }
                        Some(outcome)
                    }
                }
                Some(_) => Some(RenameOutcome::Unchanged),
                None => None,
            };
            Ok(ItemUpdate { rename })
        })
    }

    /// Delete an item and its unit table, settling the category quantity.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the category or item is missing.
    pub fn delete_item(&self, category_id: i32, item_id: i32) -> Result<(), StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        with_transaction(&self.executor, |tx| cascade::delete_item(tx, &table, item_id))
    }

    /// All units of an item, oldest first.
    ///
    /// Ensures the unit table first, so an item that never received a unit
    /// reads as empty.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the category or item is missing.
    pub fn units(&self, category_id: i32, item_id: i32) -> Result<Vec<Unit>, StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        let item = self.resolve_item(&table, category_id, item_id)?;
        let unit_table = TableIdent::checked(item.unit_ident)?;
        TableLifecycle::new(&self.executor).ensure_unit_table(&table, &unit_table)?;
        let sql = format!(
            "SELECT {UNIT_COLUMNS} FROM {} WHERE parent_id = $1 ORDER BY id",
            unit_table.quoted()
        );
        let rows = self
            .executor
            .query_all(&sql, &[Value::Int(Some(item_id))])?;
        rows.iter().map(Unit::from_row).collect()
    }

    /// Create a unit under an item, bumping both quantity ledgers by one.
    ///
    /// Units created without a `code` get the stock placeholder code.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the category or item is missing,
    /// `StoreError::Validation` for a mistyped field.
    pub fn create_unit(
        &self,
        category_id: i32,
        item_id: i32,
        fields: &serde_json::Value,
    ) -> Result<Unit, StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        let item = self.resolve_item(&table, category_id, item_id)?;
        let unit_table = TableIdent::checked(item.unit_ident)?;

        let mut fields = filter_fields(fields, UNIT_FIELDS)?;
        if !fields.iter().any(|(name, _)| name == "code") {
            fields.insert(
                0,
                (
                    "code".to_owned(),
                    Value::String(Some(DEFAULT_UNIT_CODE.to_owned())),
                ),
            );
        }

        with_transaction(&self.executor, |tx| {
            TableLifecycle::new(tx).ensure_unit_table(&table, &unit_table)?;

            let columns = fields
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = (0..fields.len())
                .map(|i| format!("${}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {} (parent_id, {columns}) VALUES ($1, {placeholders}) \
                 RETURNING {UNIT_COLUMNS}",
                unit_table.quoted()
            );
            let mut params = vec![Value::Int(Some(item_id))];
            params.extend(fields.iter().map(|(_, v)| v.clone()));
            let row = tx
                .query_opt(&sql, &params)?
                .ok_or_else(|| StoreError::Storage("insert returned no row".to_owned()))?;
            let unit = Unit::from_row(&row)?;

            quantity::increment(tx, &table, item_id, 1)?;
            quantity::increment(tx, &TableIdent::categories(), category_id, 1)?;
            Ok(unit)
        })
    }

    /// Update a unit's fields in place. Ledgers are untouched.
    ///
    /// # Errors
    ///
    /// `StoreError::Validation` when no updatable field is present,
    /// `StoreError::NotFound` when the unit is not under this item.
    pub fn update_unit(
        &self,
        category_id: i32,
        item_id: i32,
        unit_id: i32,
        fields: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        let item = self.resolve_item(&table, category_id, item_id)?;
        let unit_table = TableIdent::checked(item.unit_ident)?;

        let fields = filter_fields(fields, UNIT_FIELDS)?;
        if fields.is_empty() {
            return Err(StoreError::Validation("no updatable fields in payload".to_owned()));
        }
        let (assignments, mut params) = set_clause(&fields);
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ${} AND parent_id = ${}",
            unit_table.quoted(),
            params.len() + 1,
            params.len() + 2
        );
        params.push(Value::Int(Some(unit_id)));
        params.push(Value::Int(Some(item_id)));
        let affected = self.executor.execute(&sql, &params)?;
        if affected == 0 {
            return Err(StoreError::NotFound(format!("unit {unit_id} under item {item_id}")));
        }
        Ok(())
    }

    /// Delete a unit, settling both quantity ledgers.
    ///
    /// # Errors
    ///
    /// `StoreError::NotFound` when the unit is not under this item; the
    /// ledgers are untouched in that case.
    pub fn delete_unit(
        &self,
        category_id: i32,
        item_id: i32,
        unit_id: i32,
    ) -> Result<(), StoreError> {
        let (_, table) = self.resolve_category(category_id)?;
        let item = self.resolve_item(&table, category_id, item_id)?;
        let unit_table = TableIdent::checked(item.unit_ident)?;

        with_transaction(&self.executor, |tx| {
            let sql = format!(
                "DELETE FROM {} WHERE id = $1 AND parent_id = $2",
                unit_table.quoted()
            );
            let affected = tx.execute(
                &sql,
                &[Value::Int(Some(unit_id)), Value::Int(Some(item_id))],
            )?;
            if affected == 0 {
                return Err(StoreError::NotFound(format!(
                    "unit {unit_id} under item {item_id}"
                )));
            }
            quantity::decrement_clamped(tx, &table, item_id, 1)?;
            quantity::decrement_clamped(tx, &TableIdent::categories(), category_id, 1)?;
            Ok(())
        })
    }

    /// Shared access to the executor for read-only collaborators.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    fn resolve_category(&self, category_id: i32) -> Result<(Category, TableIdent), StoreError> {
        let category = self.category(category_id)?;
        let table = TableIdent::checked(category.table_ident.clone())?;
        Ok((category, table))
    }

    fn resolve_item(
        &self,
        table: &TableIdent,
        category_id: i32,
        item_id: i32,
    ) -> Result<Item, StoreError> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE id = $1 AND parent_category_id = $2",
            table.quoted()
        );
        let row = self
            .executor
            .query_opt(
                &sql,
                &[Value::Int(Some(item_id)), Value::Int(Some(category_id))],
            )?
            .ok_or_else(|| {
                StoreError::NotFound(format!("item {item_id} in category {category_id}"))
            })?;
        Item::from_row(&row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_filter_drops_unknown_fields_silently() {
        let fields = filter_fields(
            &json!({"name": "PC", "is_admin": true, "quantity": 4}),
            ITEM_FIELDS,
        )
        .unwrap();
        assert_eq!(
            fields,
            vec![
                ("name".to_owned(), Value::String(Some("PC".to_owned()))),
                ("quantity".to_owned(), Value::Int(Some(4))),
            ]
        );
    }

    #[test]
    fn test_filter_rejects_mistyped_known_field() {
        let err = filter_fields(&json!({"quantity": "many"}), ITEM_FIELDS).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
        let err = filter_fields(&json!({"is_broken": "yes"}), UNIT_FIELDS).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_filter_rejects_non_object_payload() {
        let err = filter_fields(&json!([1, 2]), UNIT_FIELDS).unwrap_err();
        assert!(matches!(err, StoreError::Validation(_)));
    }

    #[test]
    fn test_filter_maps_null_to_typed_null() {
        let fields = filter_fields(&json!({"model": null}), UNIT_FIELDS).unwrap();
        assert_eq!(fields, vec![("model".to_owned(), Value::String(None))]);
    }

    #[test]
    fn test_filter_parses_numeric_from_number_and_string() {
        let fields = filter_fields(&json!({"cost": 19.99}), UNIT_FIELDS).unwrap();
        assert_eq!(
            fields,
            vec![("cost".to_owned(), Value::Decimal(Some(Decimal::new(1999, 2))))]
        );
        let fields = filter_fields(&json!({"cost": "7.50"}), UNIT_FIELDS).unwrap();
        assert_eq!(
            fields,
            vec![("cost".to_owned(), Value::Decimal(Some(Decimal::new(750, 2))))]
        );
    }

    #[test]
    fn test_required_name_trims_and_writes_back() {
        let mut fields = filter_fields(&json!({"name": "  PC  ", "quantity": 1}), ITEM_FIELDS).unwrap();
        assert_eq!(required_name(&mut fields).unwrap(), "PC");
        assert_eq!(fields[0].1, Value::String(Some("PC".to_owned())));
    }

    #[test]
    fn test_required_name_rejects_missing_null_and_blank() {
        for payload in [json!({"quantity": 1}), json!({"name": null}), json!({"name": "  "})] {
            let mut fields = filter_fields(&payload, ITEM_FIELDS).unwrap();
            let err = required_name(&mut fields).unwrap_err();
            assert!(matches!(err, StoreError::Validation(_)));
        }
    }

    #[test]
    fn test_insert_clause_numbers_from_start() {
        let fields = vec![
            ("name".to_owned(), Value::String(Some("PC".to_owned()))),
            ("code".to_owned(), Value::String(Some("XX".to_owned()))),
        ];
        let (columns, placeholders) = insert_clause(&fields, 2);
        assert_eq!(columns, "name, code");
        assert_eq!(placeholders, "$2, $3");
    }

    #[test]
    fn test_set_clause_numbers_placeholders() {
        let (assignments, params) = set_clause(&[
            ("name".to_owned(), Value::String(Some("PC".to_owned()))),
            ("quantity".to_owned(), Value::Int(Some(2))),
        ]);
        assert_eq!(assignments, "name = $1, quantity = $2");
        assert_eq!(params.len(), 2);
    }
}
