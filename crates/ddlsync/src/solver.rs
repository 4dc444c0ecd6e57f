//! Change sequencing - turn per-table diffs into one executable plan.
//!
//! Each table's changes already come in the order that table needs them.
//! What remains is ordering across tables, which only foreign keys make
//! interesting. The plan runs in five phases:
//!
//! 1. drop every foreign key that goes away or gets recreated,
//! 2. drop removed tables, in reverse declaration order,
//! 3. alter the tables that exist on both sides,
//! 4. create new tables,
//! 5. add foreign keys.
//!
//! With every foreign key gone before the first table or column is dropped,
//! nothing left can block a drop, not even a reference cycle between tables
//! that are removed together. Adding foreign keys last means their target
//! tables, columns and primary keys are all in place.
//!
//! ## Example Problem
//!
//! ```text
//! -- This fails:
//! ALTER TABLE a ADD CONSTRAINT fk_a_b FOREIGN KEY (b_id) REFERENCES b (id);  -- "b" doesn't exist!
//! CREATE TABLE b (...);
//!
//! -- This works:
//! CREATE TABLE b (...);
//! ALTER TABLE a ADD CONSTRAINT fk_a_b FOREIGN KEY (b_id) REFERENCES b (id);
//! ```

use crate::{Change, SchemaDiff};

/// Execution phase of a change. Phases run in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    DropForeignKeys,
    DropTables,
    AlterTables,
    CreateTables,
    AddForeignKeys,
}

impl Phase {
    pub fn of(change: &Change) -> Phase {
        match change {
            Change::RemoveForeignKey { .. } => Phase::DropForeignKeys,
            Change::RemoveTable { .. } => Phase::DropTables,
            Change::AddTable { .. } => Phase::CreateTables,
            Change::AddForeignKey { .. } => Phase::AddForeignKeys,
            _ => Phase::AlterTables,
        }
    }
}

/// Orders the changes of `diff` into an executable sequence.
///
/// Within a phase, changes keep the order of the diff: table by table, and
/// within a table in the order the table needs them. Table drops are the
/// exception and run in reverse.
pub fn order_changes(diff: SchemaDiff) -> Vec<Change> {
    let mut changes: Vec<Change> = diff
        .table_diffs
        .into_iter()
        .flat_map(|table_diff| table_diff.changes)
        .collect();

    // Stable, so the per-table order survives
    changes.sort_by_key(Phase::of);

    let drops = changes
        .iter()
        .position(|c| Phase::of(c) == Phase::DropTables)
        .map(|start| {
            let end = changes[start..]
                .iter()
                .position(|c| Phase::of(c) != Phase::DropTables)
                .map_or(changes.len(), |len| start + len);
            start..end
        });
    if let Some(range) = drops {
        changes[range].reverse();
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TableDiff;
    use ddlsync_model::{Column, ForeignKey, Table, TypeCode};

    fn table_diff(table: &str, changes: Vec<Change>) -> TableDiff {
        TableDiff {
            table: table.to_string(),
            changes,
        }
    }

    fn remove_table(name: &str) -> Change {
        Change::RemoveTable {
            table: name.to_string(),
        }
    }

    fn remove_fk(table: &str, target: &str) -> Change {
        Change::RemoveForeignKey {
            table: table.to_string(),
            foreign_key: ForeignKey::new(None, target).reference("ref_id", "id"),
        }
    }

    fn add_fk(table: &str, target: &str) -> Change {
        Change::AddForeignKey {
            table: table.to_string(),
            foreign_key: ForeignKey::new(None, target).reference("ref_id", "id"),
        }
    }

    #[test]
    fn test_phase_order() {
        assert!(Phase::DropForeignKeys < Phase::DropTables);
        assert!(Phase::DropTables < Phase::AlterTables);
        assert!(Phase::AlterTables < Phase::CreateTables);
        assert!(Phase::CreateTables < Phase::AddForeignKeys);
        assert_eq!(
            Phase::of(&Change::RemovePrimaryKey {
                table: "t".to_string()
            }),
            Phase::AlterTables
        );
    }

    #[test]
    fn test_empty_diff() {
        assert!(order_changes(SchemaDiff::default()).is_empty());
    }

    #[test]
    fn test_foreign_key_drops_come_first() {
        let diff = SchemaDiff {
            table_diffs: vec![
                table_diff(
                    "a",
                    vec![
                        Change::RemoveColumn {
                            table: "a".to_string(),
                            column: "ref_id".to_string(),
                        },
                    ],
                ),
                table_diff("b", vec![remove_fk("b", "a"), remove_table("b")]),
            ],
        };
        let plan = order_changes(diff);
        assert_eq!(plan[0], remove_fk("b", "a"));
        assert_eq!(plan[1], remove_table("b"));
        assert!(matches!(plan[2], Change::RemoveColumn { .. }));
    }

    #[test]
    fn test_removed_tables_in_reverse_order() {
        let diff = SchemaDiff {
            table_diffs: vec![
                table_diff("a", vec![remove_fk("a", "b"), remove_table("a")]),
                table_diff("b", vec![remove_fk("b", "a"), remove_table("b")]),
                table_diff("c", vec![remove_table("c")]),
            ],
        };
        assert_eq!(
            order_changes(diff),
            vec![
                remove_fk("a", "b"),
                remove_fk("b", "a"),
                remove_table("c"),
                remove_table("b"),
                remove_table("a"),
            ]
        );
    }

    #[test]
    fn test_new_tables_before_foreign_keys() {
        let new_table = |name: &str| Change::AddTable {
            table: Table::new(name).column(Column::new("id", TypeCode::Integer).primary_key()),
        };
        let diff = SchemaDiff {
            table_diffs: vec![
                table_diff("existing", vec![add_fk("existing", "b")]),
                table_diff("a", vec![new_table("a"), add_fk("a", "b")]),
                table_diff("b", vec![new_table("b"), add_fk("b", "a")]),
            ],
        };
        assert_eq!(
            order_changes(diff),
            vec![
                new_table("a"),
                new_table("b"),
                add_fk("existing", "b"),
                add_fk("a", "b"),
                add_fk("b", "a"),
            ]
        );
    }
}
