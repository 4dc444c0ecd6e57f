//! Primary key, foreign key and index diffing of a matched table pair.
//!
//! Foreign keys and indices are never altered in place: a key or index whose
//! definition changed is dropped and created again.

use std::collections::HashSet;

use ddlsync_model::{ForeignKey, IdentifierMode, Index, Table};

use crate::{Change, Error, Result};

/// Whether the primary key of a table that exists on both sides is dropped
/// or replaced, which forces every foreign key into it to be recreated.
pub(super) fn primary_key_replaced(
    current: &Table,
    desired: &Table,
    mode: IdentifierMode,
) -> bool {
    let before = current.primary_key_names();
    let after = desired.primary_key_names();
    !before.is_empty() && !mode.same_seq(&before, &after)
}

pub(super) fn diff_primary_key(
    current: &Table,
    desired: &Table,
    mode: IdentifierMode,
) -> Option<Change> {
    let before = current.primary_key_names();
    let after = desired.primary_key_names();
    let columns = || -> Vec<String> {
        after.iter().map(|name| name.to_string()).collect()
    };

    match (before.is_empty(), after.is_empty()) {
        (true, true) => None,
        (true, false) => Some(Change::AddPrimaryKey {
            table: current.name.clone(),
            columns: columns(),
        }),
        (false, true) => Some(Change::RemovePrimaryKey {
            table: current.name.clone(),
        }),
        (false, false) if !mode.same_seq(&before, &after) => Some(Change::PrimaryKeyChange {
            table: current.name.clone(),
            columns: columns(),
        }),
        (false, false) => None,
    }
}

/// Foreign keys to drop and to create, each in declaration order.
///
/// `rekeyed` holds the keys (see [`IdentifierMode::key`]) of tables whose
/// primary key is replaced in this comparison.
pub(super) fn diff_foreign_keys(
    current: &Table,
    desired: &Table,
    rekeyed: &HashSet<String>,
    mode: IdentifierMode,
) -> Result<(Vec<ForeignKey>, Vec<ForeignKey>)> {
    let recreate = |before: &ForeignKey, after: &ForeignKey| {
        !before.same_references(after, mode) || rekeyed.contains(&mode.key(&after.foreign_table))
    };

    let (before, after) = (&current.foreign_keys, &desired.foreign_keys);

    let mut removed = Vec::new();
    for fk in before {
        match after
            .iter()
            .find(|&other| paired(fk, before, other, after, mode))
        {
            None => removed.push(fk.clone()),
            Some(other) => {
                if let (Some(name), Some(_)) = (&fk.name, &other.name) {
                    if !mode.same(&fk.foreign_table, &other.foreign_table) {
                        return Err(Error::ForeignKeyRetargeted {
                            table: current.name.clone(),
                            foreign_key: name.clone(),
                            from: fk.foreign_table.clone(),
                            to: other.foreign_table.clone(),
                        });
                    }
                }
                if recreate(fk, other) {
                    removed.push(fk.clone());
                }
            }
        }
    }

    let mut added = Vec::new();
    for fk in after {
        match before
            .iter()
            .find(|&other| paired(other, before, fk, after, mode))
        {
            Some(other) if !recreate(other, fk) => {}
            _ => added.push(fk.clone()),
        }
    }

    Ok((removed, added))
}

/// Indices to drop and to create, each in declaration order.
///
/// An index covering exactly the primary key columns belongs to the key:
/// introspected models report it, schema files usually don't. Such an index
/// is never dropped on its own, and when the key is replaced it goes away
/// together with the old key. It is only touched when an index of the same
/// identity on the other side would clash with it.
pub(super) fn diff_indices(
    current: &Table,
    desired: &Table,
    mode: IdentifierMode,
) -> (Vec<Index>, Vec<Index>) {
    let matches = |a: &Index, b: &Index| {
        paired(a, &current.indices, b, &desired.indices, mode) && a.same_definition(b, mode)
    };
    let rekeyed = primary_key_replaced(current, desired, mode);
    let survives = |index: &Index| !(rekeyed && current.is_primary_key_index(index, mode));

    let removed: Vec<Index> = current
        .indices
        .iter()
        .filter(|&index| survives(index))
        .filter(|&index| !desired.indices.iter().any(|other| matches(index, other)))
        .filter(|&index| {
            !current.is_primary_key_index(index, mode)
                || desired
                    .indices
                    .iter()
                    .any(|other| index.same_identity(other, mode))
        })
        .cloned()
        .collect();

    let added: Vec<Index> = desired
        .indices
        .iter()
        .filter(|&index| {
            !current
                .indices
                .iter()
                .any(|other| survives(other) && matches(other, index))
        })
        .filter(|&index| {
            !desired.is_primary_key_index(index, mode)
                || current
                    .indices
                    .iter()
                    .any(|other| survives(other) && other.same_identity(index, mode))
        })
        .cloned()
        .collect();

    (removed, added)
}

/// Foreign keys and indices: optionally named, otherwise identified by
/// their definition.
trait Constraint {
    fn name(&self) -> Option<&str>;
    fn same_identity(&self, other: &Self, mode: IdentifierMode) -> bool;
}

impl Constraint for ForeignKey {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn same_identity(&self, other: &Self, mode: IdentifierMode) -> bool {
        ForeignKey::same_identity(self, other, mode)
    }
}

impl Constraint for Index {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn same_identity(&self, other: &Self, mode: IdentifierMode) -> bool {
        Index::same_identity(self, other, mode)
    }
}

/// Whether `current` (one of `current_side`) and `desired` (one of
/// `desired_side`) are the same constraint.
///
/// An unnamed constraint does not pair with a named one if its own side
/// gives that name to another constraint: the name wins.
fn paired<T: Constraint>(
    current: &T,
    current_side: &[T],
    desired: &T,
    desired_side: &[T],
    mode: IdentifierMode,
) -> bool {
    if !current.same_identity(desired, mode) {
        return false;
    }
    let declares = |side: &[T], name: &str| {
        side.iter()
            .any(|item| item.name().is_some_and(|n| mode.same(n, name)))
    };
    match (current.name(), desired.name()) {
        (Some(name), None) => !declares(desired_side, name),
        (None, Some(name)) => !declares(current_side, name),
        _ => true,
    }
}
