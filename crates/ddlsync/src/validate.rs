//! Structural checks on an input model before it is diffed.

use std::collections::HashSet;

use ddlsync_model::{Database, ForeignKey, IdentifierMode, Index, Table};
use tracing::debug;

use crate::{Error, Result, Side};

/// Checks that `db` is well formed: unique table and column names, and
/// foreign keys and indices that only mention things that exist.
pub fn validate(db: &Database, side: Side, mode: IdentifierMode) -> Result<()> {
    check_model(db, side, mode)
        .inspect_err(|err| debug!(%side, model = %db.name, "invalid model: {}", err))
}

fn check_model(db: &Database, side: Side, mode: IdentifierMode) -> Result<()> {
    let mut seen = HashSet::new();
    for table in &db.tables {
        if !seen.insert(mode.key(&table.name)) {
            return Err(Error::DuplicateTable {
                side,
                table: table.name.clone(),
            });
        }
    }

    for table in &db.tables {
        check_columns(table, side, mode)?;
        for fk in &table.foreign_keys {
            check_foreign_key(db, table, fk, side, mode)?;
        }
        for index in &table.indices {
            check_index(table, index, side, mode)?;
        }
    }
    Ok(())
}

fn check_columns(table: &Table, side: Side, mode: IdentifierMode) -> Result<()> {
    let mut seen = HashSet::new();
    for column in &table.columns {
        if !seen.insert(mode.key(&column.name)) {
            return Err(Error::DuplicateColumn {
                side,
                table: table.name.clone(),
                column: column.name.clone(),
            });
        }
    }
    Ok(())
}

fn check_foreign_key(
    db: &Database,
    table: &Table,
    fk: &ForeignKey,
    side: Side,
    mode: IdentifierMode,
) -> Result<()> {
    let label = fk.name.clone().unwrap_or_else(|| fk.to_string());
    if fk.references.is_empty() {
        return Err(Error::EmptyForeignKey {
            side,
            table: table.name.clone(),
            foreign_key: label,
        });
    }

    let Some(target) = db.find_table(&fk.foreign_table, mode) else {
        return Err(Error::ForeignKeyTargetNotFound {
            side,
            table: table.name.clone(),
            foreign_key: label,
            target: fk.foreign_table.clone(),
        });
    };

    for reference in &fk.references {
        if table.find_column(&reference.local_column, mode).is_none() {
            return Err(Error::ForeignKeyColumnNotFound {
                side,
                table: table.name.clone(),
                foreign_key: label,
                column: reference.local_column.clone(),
            });
        }
        if target.find_column(&reference.foreign_column, mode).is_none() {
            return Err(Error::ForeignKeyReferencedColumnNotFound {
                side,
                table: table.name.clone(),
                foreign_key: label,
                target: target.name.clone(),
                column: reference.foreign_column.clone(),
            });
        }
    }
    Ok(())
}

fn check_index(table: &Table, index: &Index, side: Side, mode: IdentifierMode) -> Result<()> {
    match index
        .column_names()
        .find(|name| table.find_column(name, mode).is_none())
    {
        Some(missing) => Err(Error::IndexColumnNotFound {
            side,
            table: table.name.clone(),
            index: index.name.clone().unwrap_or_else(|| index.to_string()),
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlsync_model::{Column, TypeCode};

    const MODE: IdentifierMode = IdentifierMode::CaseInsensitive;

    fn parent() -> Table {
        Table::new("parent").column(Column::new("id", TypeCode::Integer).primary_key())
    }

    #[test]
    fn test_valid_model() {
        let db = Database::new("test").table(parent()).table(
            Table::new("child")
                .column(Column::new("id", TypeCode::Integer).primary_key())
                .column(Column::new("parent_id", TypeCode::Integer))
                .foreign_key(ForeignKey::new(Some("fk_parent"), "PARENT").reference("parent_id", "ID"))
                .index(Index::new(Some("idx_parent"), &["parent_id"])),
        );
        assert_eq!(validate(&db, Side::Desired, MODE), Ok(()));
    }

    #[test]
    fn test_duplicate_table_depends_on_mode() {
        let db = Database::new("test")
            .table(parent())
            .table(Table::new("PARENT").column(Column::new("id", TypeCode::Integer)));
        assert!(matches!(
            validate(&db, Side::Current, MODE),
            Err(Error::DuplicateTable { side: Side::Current, .. })
        ));
        assert_eq!(validate(&db, Side::Current, IdentifierMode::CaseSensitive), Ok(()));
    }

    #[test]
    fn test_duplicate_column() {
        let db = Database::new("test").table(
            parent().column(Column::new("Id", TypeCode::BigInt)),
        );
        assert!(matches!(
            validate(&db, Side::Desired, MODE),
            Err(Error::DuplicateColumn { ref column, .. }) if column == "Id"
        ));
    }

    #[test]
    fn test_foreign_key_problems() {
        let child = |fk: ForeignKey| {
            Table::new("child")
                .column(Column::new("parent_id", TypeCode::Integer))
                .foreign_key(fk)
        };

        let db = Database::new("test").table(child(ForeignKey::new(Some("fk"), "parent")));
        assert!(matches!(
            validate(&db, Side::Desired, MODE),
            Err(Error::EmptyForeignKey { .. })
        ));

        let db = Database::new("test")
            .table(child(ForeignKey::new(Some("fk"), "parent").reference("parent_id", "id")));
        assert!(matches!(
            validate(&db, Side::Desired, MODE),
            Err(Error::ForeignKeyTargetNotFound { ref target, .. }) if target == "parent"
        ));

        let db = Database::new("test")
            .table(parent())
            .table(child(ForeignKey::new(Some("fk"), "parent").reference("missing", "id")));
        assert!(matches!(
            validate(&db, Side::Desired, MODE),
            Err(Error::ForeignKeyColumnNotFound { ref column, .. }) if column == "missing"
        ));

        let db = Database::new("test")
            .table(parent())
            .table(child(ForeignKey::new(None, "parent").reference("parent_id", "code")));
        let err = validate(&db, Side::Current, MODE).unwrap_err();
        assert!(matches!(err, Error::ForeignKeyReferencedColumnNotFound { .. }));
        assert_eq!(
            err.to_string(),
            "current model: foreign key (parent_id) -> parent(code) of table 'child' references unknown column 'parent.code'"
        );
    }

    #[test]
    fn test_index_column_missing() {
        let db = Database::new("test").table(parent().index(Index::unique(None, &["id", "code"])));
        assert!(matches!(
            validate(&db, Side::Desired, MODE),
            Err(Error::IndexColumnNotFound { ref column, .. }) if column == "code"
        ));
    }
}
