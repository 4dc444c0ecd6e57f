//! In-memory application of changes.
//!
//! [`apply`] performs a [`Change`] on a [`Database`] value the way a database
//! would execute the corresponding statement, and refuses to do so when the
//! statement would fail: adding a foreign key to a table that does not exist
//! yet, dropping a column an index still uses, dropping a table something
//! still references, and so on.
//!
//! A plan produced by the comparator applies cleanly change by change, and
//! once applied to the current model it leaves nothing to diff against the
//! desired one. [`CompareOptions::verify`](crate::CompareOptions) uses this to
//! check plans before returning them.
//!
//! ## Example Problem
//!
//! ```text
//! - table parent                     -- fails: child.fk_parent still references it
//! - child FOREIGN KEY fk_parent ...
//!
//! - child FOREIGN KEY fk_parent ...  -- works
//! - table parent
//! ```

use ddlsync_model::{Column, Database, ForeignKey, IdentifierMode, Index, Table};
use thiserror::Error;

use crate::{Change, Error, Result};

/// A change whose precondition does not hold.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("{change}: table '{table}' does not exist")]
    TableNotFound { change: String, table: String },

    #[error("{change}: table '{table}' already exists")]
    TableAlreadyExists { change: String, table: String },

    #[error("{change}: table '{table}' still has foreign keys")]
    TableHasForeignKeys { change: String, table: String },

    #[error("{change}: table '{table}' is still referenced by table '{by}'")]
    TableReferenced {
        change: String,
        table: String,
        by: String,
    },

    #[error("{change}: column '{table}.{column}' does not exist")]
    ColumnNotFound {
        change: String,
        table: String,
        column: String,
    },

    #[error("{change}: column '{table}.{column}' already exists")]
    ColumnAlreadyExists {
        change: String,
        table: String,
        column: String,
    },

    #[error("{change}: column '{table}.{column}' is still used by {by}")]
    ColumnInUse {
        change: String,
        table: String,
        column: String,
        by: String,
    },

    #[error("{change}: table '{table}' has no primary key")]
    PrimaryKeyNotFound { change: String, table: String },

    #[error("{change}: table '{table}' already has a primary key")]
    PrimaryKeyAlreadyExists { change: String, table: String },

    #[error("{change}: primary key of '{table}' is still referenced by table '{by}'")]
    PrimaryKeyReferenced {
        change: String,
        table: String,
        by: String,
    },

    #[error("{change}: foreign key {foreign_key} does not exist on '{table}'")]
    ForeignKeyNotFound {
        change: String,
        table: String,
        foreign_key: String,
    },

    #[error("{change}: foreign key {foreign_key} already exists on '{table}'")]
    ForeignKeyAlreadyExists {
        change: String,
        table: String,
        foreign_key: String,
    },

    #[error("{change}: index {index} does not exist on '{table}'")]
    IndexNotFound {
        change: String,
        table: String,
        index: String,
    },

    #[error("{change}: index {index} already exists on '{table}'")]
    IndexAlreadyExists {
        change: String,
        table: String,
        index: String,
    },
}

/// Applies every change in order. Stops at the first change whose
/// precondition fails and reports its position in `changes`.
pub fn apply_all(db: &mut Database, changes: &[Change], mode: IdentifierMode) -> Result<()> {
    for (index, change) in changes.iter().enumerate() {
        apply(db, change, mode).map_err(|source| Error::Simulation { index, source })?;
    }
    Ok(())
}

/// Applies one change to `db`, checking its preconditions first.
///
/// On error `db` is left untouched.
pub fn apply(
    db: &mut Database,
    change: &Change,
    mode: IdentifierMode,
) -> std::result::Result<(), SimulationError> {
    let desc = change.to_string();

    match change {
        Change::AddTable { table } => {
            if db.find_table(&table.name, mode).is_some() {
                return Err(SimulationError::TableAlreadyExists {
                    change: desc,
                    table: table.name.clone(),
                });
            }
            for fk in &table.foreign_keys {
                let target = if mode.same(&fk.foreign_table, &table.name) {
                    Some(table)
                } else {
                    db.find_table(&fk.foreign_table, mode)
                };
                check_foreign_key(&desc, table, target, fk, mode)?;
            }
            db.tables.push(table.clone());
        }

        Change::RemoveTable { table } => {
            let existing = find_table(db, table, mode, &desc)?;
            if !existing.foreign_keys.is_empty() {
                return Err(SimulationError::TableHasForeignKeys {
                    change: desc,
                    table: existing.name.clone(),
                });
            }
            if let Some((by, _)) = db.references_to(table, mode).next() {
                return Err(SimulationError::TableReferenced {
                    change: desc,
                    table: table.clone(),
                    by: by.name.clone(),
                });
            }
            db.tables.retain(|t| !mode.same(&t.name, table));
        }

        Change::AddColumn {
            table,
            column,
            previous,
            ..
        } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            if existing.find_column(&column.name, mode).is_some() {
                return Err(SimulationError::ColumnAlreadyExists {
                    change: desc,
                    table: table.clone(),
                    column: column.name.clone(),
                });
            }
            let position = match previous {
                Some(previous) => column_position(existing, previous, &desc, mode)? + 1,
                None => 0,
            };
            existing.columns.insert(position, column.clone());
        }

        Change::RemoveColumn { table, column } => {
            let existing = find_table(db, table, mode, &desc)?;
            column_position(existing, column, &desc, mode)?;
            if let Some(by) = column_user(db, existing, column, mode) {
                return Err(SimulationError::ColumnInUse {
                    change: desc,
                    table: table.clone(),
                    column: column.clone(),
                    by,
                });
            }
            let existing = find_table_mut(db, table, mode, &desc)?;
            existing.columns.retain(|c| !mode.same(&c.name, column));
        }

        Change::ColumnDefinitionChange { table, column } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            let Some(current) = existing.find_column_mut(&column.name, mode) else {
                return Err(SimulationError::ColumnNotFound {
                    change: desc,
                    table: table.clone(),
                    column: column.name.clone(),
                });
            };
            *current = Column {
                name: current.name.clone(),
                primary_key: current.primary_key,
                ..column.clone()
            };
        }

        Change::ColumnOrderChange { table, positions } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            for name in positions.keys() {
                column_position(existing, name, &desc, mode)?;
            }
            let position_of = |column: &Column| {
                positions
                    .iter()
                    .find(|(name, _)| mode.same(name, &column.name))
                    .map(|(_, position)| *position)
                    .unwrap_or(usize::MAX)
            };
            existing.columns.sort_by_key(position_of);
        }

        Change::AddPrimaryKey { table, columns } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            if existing.has_primary_key() {
                return Err(SimulationError::PrimaryKeyAlreadyExists {
                    change: desc,
                    table: table.clone(),
                });
            }
            set_primary_key(existing, columns, &desc, mode)?;
        }

        Change::PrimaryKeyChange { table, columns } => {
            check_primary_key_unreferenced(db, table, &desc, mode)?;
            let existing = find_table_mut(db, table, mode, &desc)?;
            let indices = indices_outliving_key(existing, mode);
            set_primary_key(existing, columns, &desc, mode)?;
            existing.indices = indices;
        }

        Change::RemovePrimaryKey { table } => {
            check_primary_key_unreferenced(db, table, &desc, mode)?;
            let existing = find_table_mut(db, table, mode, &desc)?;
            if !existing.has_primary_key() {
                return Err(SimulationError::PrimaryKeyNotFound {
                    change: desc,
                    table: table.clone(),
                });
            }
            existing.indices = indices_outliving_key(existing, mode);
            for column in &mut existing.columns {
                column.primary_key = false;
            }
        }

        Change::AddForeignKey { table, foreign_key } => {
            let existing = find_table(db, table, mode, &desc)?;
            let target = db.find_table(&foreign_key.foreign_table, mode);
            check_foreign_key(&desc, existing, target, foreign_key, mode)?;
            if existing
                .foreign_keys
                .iter()
                .any(|fk| clashes(fk.name.as_deref(), foreign_key.name.as_deref(), mode, || {
                    fk.same_identity(foreign_key, mode)
                }))
            {
                return Err(SimulationError::ForeignKeyAlreadyExists {
                    change: desc,
                    table: table.clone(),
                    foreign_key: foreign_key.to_string(),
                });
            }
            let existing = find_table_mut(db, table, mode, &desc)?;
            existing.foreign_keys.push(foreign_key.clone());
        }

        Change::RemoveForeignKey { table, foreign_key } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            let position = existing
                .foreign_keys
                .iter()
                .position(|fk| fk == foreign_key)
                .or_else(|| {
                    existing
                        .foreign_keys
                        .iter()
                        .position(|fk| fk.same_identity(foreign_key, mode))
                });
            let Some(position) = position else {
                return Err(SimulationError::ForeignKeyNotFound {
                    change: desc,
                    table: table.clone(),
                    foreign_key: foreign_key.to_string(),
                });
            };
            existing.foreign_keys.remove(position);
        }

        Change::AddIndex { table, index } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            for name in index.column_names() {
                column_position(existing, name, &desc, mode)?;
            }
            if existing
                .indices
                .iter()
                .any(|i| clashes(i.name.as_deref(), index.name.as_deref(), mode, || {
                    i.same_identity(index, mode)
                }))
            {
                return Err(SimulationError::IndexAlreadyExists {
                    change: desc,
                    table: table.clone(),
                    index: index.to_string(),
                });
            }
            existing.indices.push(index.clone());
        }

        Change::RemoveIndex { table, index } => {
            let existing = find_table_mut(db, table, mode, &desc)?;
            let position = existing
                .indices
                .iter()
                .position(|i| i == index)
                .or_else(|| {
                    existing
                        .indices
                        .iter()
                        .position(|i| i.same_identity(index, mode))
                });
            let Some(position) = position else {
                return Err(SimulationError::IndexNotFound {
                    change: desc,
                    table: table.clone(),
                    index: index.to_string(),
                });
            };
            existing.indices.remove(position);
        }
    }

    Ok(())
}

fn find_table<'a>(
    db: &'a Database,
    name: &str,
    mode: IdentifierMode,
    desc: &str,
) -> std::result::Result<&'a Table, SimulationError> {
    db.find_table(name, mode)
        .ok_or_else(|| SimulationError::TableNotFound {
            change: desc.to_string(),
            table: name.to_string(),
        })
}

fn find_table_mut<'a>(
    db: &'a mut Database,
    name: &str,
    mode: IdentifierMode,
    desc: &str,
) -> std::result::Result<&'a mut Table, SimulationError> {
    db.find_table_mut(name, mode)
        .ok_or_else(|| SimulationError::TableNotFound {
            change: desc.to_string(),
            table: name.to_string(),
        })
}

fn column_position(
    table: &Table,
    column: &str,
    desc: &str,
    mode: IdentifierMode,
) -> std::result::Result<usize, SimulationError> {
    table
        .column_position(column, mode)
        .ok_or_else(|| SimulationError::ColumnNotFound {
            change: desc.to_string(),
            table: table.name.clone(),
            column: column.to_string(),
        })
}

/// Checks that a foreign key of `table` can be created against `target`.
fn check_foreign_key(
    desc: &str,
    table: &Table,
    target: Option<&Table>,
    fk: &ForeignKey,
    mode: IdentifierMode,
) -> std::result::Result<(), SimulationError> {
    let Some(target) = target else {
        return Err(SimulationError::TableNotFound {
            change: desc.to_string(),
            table: fk.foreign_table.clone(),
        });
    };
    for reference in &fk.references {
        column_position(table, &reference.local_column, desc, mode)?;
        column_position(target, &reference.foreign_column, desc, mode)?;
    }
    Ok(())
}

/// Describes the primary key, index or foreign key that still needs `column`.
fn column_user(db: &Database, table: &Table, column: &str, mode: IdentifierMode) -> Option<String> {
    if let Some(index) = table
        .indices
        .iter()
        .find(|i| i.column_names().any(|c| mode.same(c, column)))
    {
        return Some(format!("index {}", index));
    }
    if let Some(fk) = table
        .foreign_keys
        .iter()
        .find(|fk| fk.local_columns().any(|c| mode.same(c, column)))
    {
        return Some(format!("foreign key {}", fk));
    }
    if let Some((other, fk)) = db
        .references_to(&table.name, mode)
        .find(|(_, fk)| fk.foreign_columns().any(|c| mode.same(c, column)))
    {
        return Some(format!("foreign key {} of table '{}'", fk, other.name));
    }
    table
        .find_column(column, mode)
        .filter(|c| c.primary_key)
        .map(|_| "the primary key".to_string())
}

/// Indices of `table` that remain once its primary key is dropped. An index
/// over exactly the key columns belongs to the key and goes with it.
fn indices_outliving_key(table: &Table, mode: IdentifierMode) -> Vec<Index> {
    table
        .indices
        .iter()
        .filter(|index| !table.is_primary_key_index(index, mode))
        .cloned()
        .collect()
}

/// The primary key of `table` may only change once no foreign key points at
/// the table any more.
fn check_primary_key_unreferenced(
    db: &Database,
    table: &str,
    desc: &str,
    mode: IdentifierMode,
) -> std::result::Result<(), SimulationError> {
    find_table(db, table, mode, desc)?;
    match db.references_to(table, mode).next() {
        Some((by, _)) => Err(SimulationError::PrimaryKeyReferenced {
            change: desc.to_string(),
            table: table.to_string(),
            by: by.name.clone(),
        }),
        None => Ok(()),
    }
}

/// Whether a new constraint collides with an existing one. A named
/// constraint only collides with the one carrying its name.
fn clashes(
    existing: Option<&str>,
    new: Option<&str>,
    mode: IdentifierMode,
    same_identity: impl FnOnce() -> bool,
) -> bool {
    match new {
        Some(name) => existing.is_some_and(|existing| mode.same(existing, name)),
        None => same_identity(),
    }
}

fn set_primary_key(
    table: &mut Table,
    columns: &[String],
    desc: &str,
    mode: IdentifierMode,
) -> std::result::Result<(), SimulationError> {
    for name in columns {
        column_position(table, name, desc, mode)?;
    }
    for column in &mut table.columns {
        column.primary_key = columns.iter().any(|name| mode.same(name, &column.name));
    }
    Ok(())
}
