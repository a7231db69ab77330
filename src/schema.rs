//! Table lifecycle management.
//!
//! All DDL in the crate is issued here and nowhere else: the fixed root
//! tables, the per-category item tables, and the per-item unit tables.
//! Dynamic table names are spliced into statements only as [`TableIdent`]s,
//! which are validated at construction, and every mutation is logged.
//!
//! The `table_registry` catalog records which identifier belongs to which
//! entity so sibling name collisions are caught at claim time instead of
//! surfacing later as cross-linked tables.

use log::info;
use sea_query::Value;

use crate::error::StoreError;
use crate::executor::StoreExecutor;
use crate::ident::TableIdent;

/// Fixed root table holding one row per category.
pub const CATEGORIES_TABLE: &str = "categories";
/// Catalog of every dynamically-created table identifier.
pub const REGISTRY_TABLE: &str = "table_registry";

/// What kind of entity owns a registered identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Category,
    Unit,
}

impl TableKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TableKind::Category => "category",
            TableKind::Unit => "unit",
        }
    }
}

/// Outcome of a physical table rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    /// The table was renamed.
    Renamed,
    /// Old and new identifiers are equal; nothing to do.
    Unchanged,
    /// No table with the old identifier exists; nothing to rename.
    SourceMissing,
    /// A table with the new identifier already exists; rename skipped.
    TargetExists,
}

/// Issues every schema statement in the crate.
pub struct TableLifecycle<'a> {
    executor: &'a dyn StoreExecutor,
}

impl<'a> TableLifecycle<'a> {
    pub fn new(executor: &'a dyn StoreExecutor) -> Self {
        Self { executor }
    }

    /// Create the fixed root tables if they do not exist yet.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when a statement fails.
    pub fn init_store(&self) -> Result<(), StoreError> {
        self.executor.execute(
            "CREATE TABLE IF NOT EXISTS categories (\
             id SERIAL PRIMARY KEY, \
             name VARCHAR(255) UNIQUE NOT NULL, \
             quantity INTEGER NOT NULL DEFAULT 0, \
             table_ident VARCHAR(255) NOT NULL\
             )",
            &[],
        )?;
        self.executor.execute(
            "CREATE TABLE IF NOT EXISTS table_registry (\
             ident VARCHAR(255) PRIMARY KEY, \
             kind VARCHAR(16) NOT NULL, \
             owner_id INTEGER NOT NULL\
             )",
            &[],
        )?;
        info!("root tables ready");
        Ok(())
    }

    /// Create a category's item table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the statement fails.
    pub fn ensure_category_table(&self, ident: &TableIdent) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id SERIAL PRIMARY KEY, \
             parent_category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE ON UPDATE CASCADE, \
             name VARCHAR(255) NOT NULL, \
             quantity INTEGER NOT NULL DEFAULT 0, \
             code VARCHAR(50) DEFAULT 'YY--XXX', \
             unit_ident VARCHAR(255) NOT NULL\
             )",
            ident.quoted()
        );
        self.executor.execute(&sql, &[])?;
        info!("ensured category table {ident}");
        Ok(())
    }

    /// Create an item's unit table if it does not exist yet.
    ///
    /// `parent` is the item table the units reference.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the statement fails.
    pub fn ensure_unit_table(
        &self,
        parent: &TableIdent,
        ident: &TableIdent,
    ) -> Result<(), StoreError> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id SERIAL PRIMARY KEY, \
             parent_id INTEGER NOT NULL REFERENCES {}(id) ON DELETE CASCADE ON UPDATE CASCADE, \
             code VARCHAR(255) NOT NULL, \
             model VARCHAR(255), \
             cost NUMERIC(10,2) DEFAULT 0.00, \
             issue_date TIMESTAMP DEFAULT CURRENT_TIMESTAMP, \
             assigned_to VARCHAR(255), \
             is_broken BOOLEAN DEFAULT FALSE, \
             additional_detail VARCHAR(255)\
             )",
            ident.quoted(),
            parent.quoted()
        );
        self.executor.execute(&sql, &[])?;
        info!("ensured unit table {ident}");
        Ok(())
    }

    /// Whether a table with this identifier exists in the current schema.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the catalog query fails.
    pub fn table_exists(&self, ident: &TableIdent) -> Result<bool, StoreError> {
        let row = self.executor.query_opt(
            "SELECT 1 AS present FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[Value::String(Some(ident.as_str().to_owned()))],
        )?;
        Ok(row.is_some())
    }

    /// Rename a physical table, reporting what actually happened.
    ///
    /// A missing source or an occupied target is an outcome, not an error:
    /// entity renames must go through even when their table cannot follow.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when a probe or the rename itself fails.
    pub fn rename_table(
        &self,
        old: &TableIdent,
        new: &TableIdent,
    ) -> Result<RenameOutcome, StoreError> {
        if old == new {
            return Ok(RenameOutcome::Unchanged);
        }
        if !self.table_exists(old)? {
            return Ok(RenameOutcome::SourceMissing);
        }
        if self.table_exists(new)? {
            return Ok(RenameOutcome::TargetExists);
        }
        let sql = format!("ALTER TABLE {} RENAME TO {}", old.quoted(), new.quoted());
        self.executor.execute(&sql, &[])?;
        info!("renamed table {old} to {new}");
        Ok(RenameOutcome::Renamed)
    }

    /// Drop a table. The caller is expected to have checked existence.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the statement fails.
    pub fn drop_table(&self, ident: &TableIdent) -> Result<(), StoreError> {
        let sql = format!("DROP TABLE {}", ident.quoted());
        self.executor.execute(&sql, &[])?;
        info!("dropped table {ident}");
        Ok(())
    }

    /// Whether an identifier is already claimed in the registry.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the query fails.
    pub fn ident_claimed(&self, ident: &TableIdent) -> Result<bool, StoreError> {
        let row = self.executor.query_opt(
            "SELECT 1 AS present FROM table_registry WHERE ident = $1",
            &[Value::String(Some(ident.as_str().to_owned()))],
        )?;
        Ok(row.is_some())
    }

    /// Claim an identifier for an entity.
    ///
    /// Two concurrent claims of the same identifier race to the registry
    /// primary key; the loser gets a `Storage` error and may retry with the
    /// registry now visible.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the insert fails, including on a
    /// primary-key clash.
    pub fn claim_ident(
        &self,
        ident: &TableIdent,
        kind: TableKind,
        owner_id: i32,
    ) -> Result<(), StoreError> {
        self.executor.execute(
            "INSERT INTO table_registry (ident, kind, owner_id) VALUES ($1, $2, $3)",
            &[
                Value::String(Some(ident.as_str().to_owned())),
                Value::String(Some(kind.as_str().to_owned())),
                Value::Int(Some(owner_id)),
            ],
        )?;
        Ok(())
    }

    /// Release an identifier claim. Releasing an unclaimed identifier is a
    /// no-op.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the delete fails.
    pub fn release_ident(&self, ident: &TableIdent) -> Result<(), StoreError> {
        self.executor.execute(
            "DELETE FROM table_registry WHERE ident = $1",
            &[Value::String(Some(ident.as_str().to_owned()))],
        )?;
        Ok(())
    }

    /// Move an owner's claim from one identifier to another.
    ///
    /// # Errors
    ///
    /// `StoreError::Storage` when the update fails.
    pub fn reassign_ident(
        &self,
        old: &TableIdent,
        new: &TableIdent,
    ) -> Result<(), StoreError> {
        self.executor.execute(
            "UPDATE table_registry SET ident = $2 WHERE ident = $1",
            &[
                Value::String(Some(old.as_str().to_owned())),
                Value::String(Some(new.as_str().to_owned())),
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockExecutor;
    use crate::value::Row;

    fn ident(s: &str) -> TableIdent {
        TableIdent::checked(s).unwrap()
    }

    fn present_row() -> Vec<Row> {
        vec![Row::from_pairs([("present", Value::Int(Some(1)))])]
    }

    #[test]
    fn test_init_store_creates_both_root_tables() {
        let mock = MockExecutor::new();
        TableLifecycle::new(&mock).init_store().unwrap();
        let sql = mock.issued_sql();
        assert_eq!(sql.len(), 2);
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS categories"));
        assert!(sql[1].starts_with("CREATE TABLE IF NOT EXISTS table_registry"));
    }

    #[test]
    fn test_ensure_category_table_is_idempotent_ddl() {
        let mock = MockExecutor::new();
        let lifecycle = TableLifecycle::new(&mock);
        lifecycle.ensure_category_table(&ident("electronics")).unwrap();
        lifecycle.ensure_category_table(&ident("electronics")).unwrap();
        let sql = mock.issued_sql();
        assert_eq!(sql[0], sql[1]);
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"electronics\""));
        assert!(sql[0].contains("unit_ident VARCHAR(255) NOT NULL"));
    }

    #[test]
    fn test_unit_table_references_its_parent() {
        let mock = MockExecutor::new();
        TableLifecycle::new(&mock)
            .ensure_unit_table(&ident("electronics"), &ident("pc"))
            .unwrap();
        let sql = mock.issued_sql();
        assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"pc\""));
        assert!(sql[0].contains("REFERENCES \"electronics\"(id)"));
        assert!(sql[0].contains("cost NUMERIC(10,2) DEFAULT 0.00"));
    }

    #[test]
    fn test_table_exists_probes_current_schema() {
        let mock = MockExecutor::new().append_query_results(vec![present_row(), vec![]]);
        let lifecycle = TableLifecycle::new(&mock);
        assert!(lifecycle.table_exists(&ident("pc")).unwrap());
        assert!(!lifecycle.table_exists(&ident("laptop")).unwrap());
        assert!(mock.issued_sql()[0].contains("information_schema.tables"));
        assert_eq!(
            mock.transcript()[0].params,
            vec![Value::String(Some("pc".to_owned()))]
        );
    }

    #[test]
    fn test_rename_outcomes() {
        // Unchanged short-circuits before any probe.
        let mock = MockExecutor::new();
        let lifecycle = TableLifecycle::new(&mock);
        assert_eq!(
            lifecycle.rename_table(&ident("pc"), &ident("pc")).unwrap(),
            RenameOutcome::Unchanged
        );
        assert!(mock.issued_sql().is_empty());

        // Missing source: one probe, no ALTER.
        let mock = MockExecutor::new().append_query_results(vec![vec![]]);
        let lifecycle = TableLifecycle::new(&mock);
        assert_eq!(
            lifecycle.rename_table(&ident("pc"), &ident("laptop")).unwrap(),
            RenameOutcome::SourceMissing
        );
        assert_eq!(mock.issued_sql().len(), 1);

        // Occupied target: two probes, no ALTER.
        let mock = MockExecutor::new().append_query_results(vec![present_row(), present_row()]);
        let lifecycle = TableLifecycle::new(&mock);
        assert_eq!(
            lifecycle.rename_table(&ident("pc"), &ident("laptop")).unwrap(),
            RenameOutcome::TargetExists
        );
        assert!(!mock.issued_sql().iter().any(|s| s.starts_with("ALTER")));

        // Clean rename.
        let mock = MockExecutor::new().append_query_results(vec![present_row(), vec![]]);
        let lifecycle = TableLifecycle::new(&mock);
        assert_eq!(
            lifecycle.rename_table(&ident("pc"), &ident("laptop")).unwrap(),
            RenameOutcome::Renamed
        );
        assert_eq!(
            mock.issued_sql().last().unwrap(),
            "ALTER TABLE \"pc\" RENAME TO \"laptop\""
        );
    }

    #[test]
    fn test_registry_claim_and_release() {
        let mock = MockExecutor::new().append_query_results(vec![present_row()]);
        let lifecycle = TableLifecycle::new(&mock);
        assert!(lifecycle.ident_claimed(&ident("pc")).unwrap());
        lifecycle.claim_ident(&ident("laptop"), TableKind::Unit, 4).unwrap();
        lifecycle.release_ident(&ident("laptop")).unwrap();
        let sql = mock.issued_sql();
        assert!(sql[1].starts_with("INSERT INTO table_registry"));
        assert!(sql[2].starts_with("DELETE FROM table_registry"));
        assert_eq!(
            mock.transcript()[1].params,
            vec![
                Value::String(Some("laptop".to_owned())),
                Value::String(Some("unit".to_owned())),
                Value::Int(Some(4)),
            ]
        );
    }
}
