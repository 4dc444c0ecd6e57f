//! Schema diffing - compare a current schema against a desired one.
//!
//! Tables are matched by name under the configured [`IdentifierMode`]. Each
//! matched pair is diffed column by column and key by key; unmatched tables
//! become whole-table additions or removals. The result is a [`SchemaDiff`]
//! with the changes of every table in the order that table needs them. The
//! [solver](crate::solver) turns it into one globally ordered plan.
//!
//! ### Example
//!
//! ```text
//! orders:
//!   - orders FOREIGN KEY fk_customer (customer_id) -> customer(id)
//!   - orders.note
//!   + orders.total: DECIMAL(10,2) NOT NULL after customer_id
//! invoice:
//!   + table invoice
//!   + invoice FOREIGN KEY (order_id) -> orders(id)
//! ```

mod columns;
mod keys;

use std::collections::HashSet;
use std::fmt;

use ddlsync_model::{Database, IdentifierMode, Table, TypeCapabilities};
use tracing::{debug, trace};

use crate::{Change, Result};

/// A diff between two schemas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDiff {
    /// Changes organized by table: tables of the current model in their
    /// declaration order, then tables only the desired model has.
    pub table_diffs: Vec<TableDiff>,
}

impl SchemaDiff {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.table_diffs.is_empty()
    }

    /// Count total number of changes.
    pub fn change_count(&self) -> usize {
        self.table_diffs.iter().map(|t| t.changes.len()).sum()
    }

    /// All changes, table by table.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.table_diffs.iter().flat_map(|t| t.changes.iter())
    }
}

/// Changes for a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableDiff {
    /// Table name.
    pub table: String,
    /// List of changes, in the order this table needs them.
    pub changes: Vec<Change>,
}

impl fmt::Display for SchemaDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            writeln!(f, "No changes detected.")?;
        } else {
            writeln!(f, "Changes detected:\n")?;
            for table_diff in &self.table_diffs {
                writeln!(f, "  {}:", table_diff.table)?;
                for change in &table_diff.changes {
                    writeln!(f, "    {}", change)?;
                }
            }
        }
        Ok(())
    }
}

/// Diff two validated schemas.
pub(crate) fn diff_schemas(
    current: &Database,
    desired: &Database,
    types: &dyn TypeCapabilities,
    mode: IdentifierMode,
) -> Result<SchemaDiff> {
    let mut table_diffs = Vec::new();

    // Foreign keys into these tables must be recreated around the key change
    let rekeyed: HashSet<String> = current
        .tables
        .iter()
        .filter_map(|table| {
            let other = desired.find_table(&table.name, mode)?;
            keys::primary_key_replaced(table, other, mode).then(|| mode.key(&table.name))
        })
        .collect();

    for table in &current.tables {
        let changes = match desired.find_table(&table.name, mode) {
            Some(other) => diff_table(table, other, types, &rekeyed, mode)?,
            None => remove_table(table),
        };
        push_table_diff(&mut table_diffs, &table.name, changes);
    }

    let added: Vec<&Table> = desired
        .tables
        .iter()
        .filter(|table| current.find_table(&table.name, mode).is_none())
        .collect();
    let added_names: HashSet<String> = added.iter().map(|t| mode.key(&t.name)).collect();
    for table in added {
        push_table_diff(
            &mut table_diffs,
            &table.name,
            add_table(table, &added_names, mode),
        );
    }

    Ok(SchemaDiff { table_diffs })
}

fn push_table_diff(table_diffs: &mut Vec<TableDiff>, table: &str, changes: Vec<Change>) {
    if changes.is_empty() {
        return;
    }
    debug!(table, changes = changes.len(), "table differs");
    for change in &changes {
        trace!(%change, "planned");
    }
    table_diffs.push(TableDiff {
        table: table.to_string(),
        changes,
    });
}

/// Diff two tables with the same name.
fn diff_table(
    current: &Table,
    desired: &Table,
    types: &dyn TypeCapabilities,
    rekeyed: &HashSet<String>,
    mode: IdentifierMode,
) -> Result<Vec<Change>> {
    let name = &current.name;
    let (fks_removed, fks_added) = keys::diff_foreign_keys(current, desired, rekeyed, mode)?;
    let (indices_removed, indices_added) = keys::diff_indices(current, desired, mode);
    let primary_key = keys::diff_primary_key(current, desired, mode);
    let columns = columns::diff_columns(current, desired, types, mode);

    let mut changes = Vec::new();
    changes.extend(fks_removed.into_iter().map(|foreign_key| Change::RemoveForeignKey {
        table: name.clone(),
        foreign_key,
    }));
    changes.extend(indices_removed.into_iter().map(|index| Change::RemoveIndex {
        table: name.clone(),
        index,
    }));

    let (primary_key_early, primary_key_late) =
        split_primary_key(current, primary_key, &columns.removed, mode);
    changes.extend(primary_key_early);
    changes.extend(columns.removed);
    changes.extend(columns.reordered);
    changes.extend(columns.altered);
    changes.extend(columns.added);
    changes.extend(primary_key_late);

    changes.extend(indices_added.into_iter().map(|index| Change::AddIndex {
        table: name.clone(),
        index,
    }));
    changes.extend(fks_added.into_iter().map(|foreign_key| Change::AddForeignKey {
        table: name.clone(),
        foreign_key,
    }));
    Ok(changes)
}

/// Places the primary key change of a table relative to its column changes.
///
/// A key normally follows the column additions it may need. A key that
/// loses one of its own columns has to change before that column is
/// dropped: in one step when every new key column already exists, or as a
/// removal before the drops and an addition after the new columns.
fn split_primary_key(
    current: &Table,
    primary_key: Option<Change>,
    removed_columns: &[Change],
    mode: IdentifierMode,
) -> (Option<Change>, Option<Change>) {
    let drops_key_column = removed_columns.iter().any(|change| match change {
        Change::RemoveColumn { column, .. } => current
            .find_column(column, mode)
            .is_some_and(|c| c.primary_key),
        _ => false,
    });

    match primary_key {
        Some(change @ Change::RemovePrimaryKey { .. }) => (Some(change), None),
        Some(Change::PrimaryKeyChange { table, columns }) if drops_key_column => {
            if columns
                .iter()
                .all(|name| current.find_column(name, mode).is_some())
            {
                (Some(Change::PrimaryKeyChange { table, columns }), None)
            } else {
                (
                    Some(Change::RemovePrimaryKey {
                        table: table.clone(),
                    }),
                    Some(Change::AddPrimaryKey { table, columns }),
                )
            }
        }
        other => (None, other),
    }
}

/// A table only the current model has: its own foreign keys go first.
fn remove_table(table: &Table) -> Vec<Change> {
    table
        .foreign_keys
        .iter()
        .map(|foreign_key| Change::RemoveForeignKey {
            table: table.name.clone(),
            foreign_key: foreign_key.clone(),
        })
        .chain(std::iter::once(Change::RemoveTable {
            table: table.name.clone(),
        }))
        .collect()
}

/// A table only the desired model has.
///
/// Foreign keys into tables created by the same plan (itself included) are
/// split off and added once every new table exists.
fn add_table(table: &Table, added: &HashSet<String>, mode: IdentifierMode) -> Vec<Change> {
    let (deferred, inline): (Vec<_>, Vec<_>) = table
        .foreign_keys
        .iter()
        .cloned()
        .partition(|fk| added.contains(&mode.key(&fk.foreign_table)));

    let mut changes = vec![Change::AddTable {
        table: Table {
            foreign_keys: inline,
            ..table.clone()
        },
    }];
    changes.extend(deferred.into_iter().map(|foreign_key| Change::AddForeignKey {
        table: table.name.clone(),
        foreign_key,
    }));
    changes
}
