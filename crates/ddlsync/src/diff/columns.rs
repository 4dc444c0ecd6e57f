//! Column-level diffing of a matched table pair.

use ddlsync_model::{Column, DefaultValue, IdentifierMode, Table, TypeCapabilities};
use indexmap::IndexMap;

use crate::Change;

/// Column changes of one table, grouped so the caller can interleave them
/// with key and index changes.
#[derive(Debug, Default)]
pub(super) struct ColumnChanges {
    pub removed: Vec<Change>,
    pub reordered: Option<Change>,
    pub altered: Vec<Change>,
    pub added: Vec<Change>,
}

pub(super) fn diff_columns(
    current: &Table,
    desired: &Table,
    types: &dyn TypeCapabilities,
    mode: IdentifierMode,
) -> ColumnChanges {
    let mut changes = ColumnChanges::default();

    // Columns to drop
    for column in &current.columns {
        if desired.find_column(&column.name, mode).is_none() {
            changes.removed.push(Change::RemoveColumn {
                table: current.name.clone(),
                column: column.name.clone(),
            });
        }
    }

    changes.reordered = diff_order(current, desired, mode);

    // Columns in both - check for changes
    for desired_col in &desired.columns {
        if let Some(current_col) = current.find_column(&desired_col.name, mode) {
            if definition_changed(current_col, desired_col, types) {
                changes.altered.push(Change::ColumnDefinitionChange {
                    table: current.name.clone(),
                    column: desired_col.clone(),
                });
            }
        }
    }

    changes.added = added_columns(current, desired, mode);
    changes
}

/// A [`Change::ColumnOrderChange`] if the retained columns appear in a
/// different relative order in `desired`.
fn diff_order(current: &Table, desired: &Table, mode: IdentifierMode) -> Option<Change> {
    let before: Vec<&str> = current
        .columns
        .iter()
        .filter(|c| desired.find_column(&c.name, mode).is_some())
        .map(|c| c.name.as_str())
        .collect();
    let after: Vec<&str> = desired
        .columns
        .iter()
        .filter_map(|c| current.find_column(&c.name, mode))
        .map(|c| c.name.as_str())
        .collect();

    if before == after {
        return None;
    }

    let positions: IndexMap<String, usize> = before
        .iter()
        .map(|name| {
            let position = after.iter().position(|n| n == name).unwrap_or(usize::MAX);
            (name.to_string(), position)
        })
        .collect();
    Some(Change::ColumnOrderChange {
        table: current.name.clone(),
        positions,
    })
}

/// Whether `desired` differs from `current` in anything the platform would
/// actually store.
pub(super) fn definition_changed(
    current: &Column,
    desired: &Column,
    types: &dyn TypeCapabilities,
) -> bool {
    let current_type = types.target_type(current.type_code);
    let desired_type = types.target_type(desired.type_code);
    if current_type != desired_type {
        return true;
    }

    // A database reports sizes for types that have none in the schema file
    let precision_and_scale = types.has_precision_and_scale(desired_type);
    if (types.has_size(desired_type) || precision_and_scale) && current.size != desired.size {
        return true;
    }
    if precision_and_scale && current.scale != desired.scale {
        return true;
    }

    if current.required != desired.required || current.auto_increment != desired.auto_increment {
        return true;
    }

    // No default in the desired model means "leave it alone"
    match &desired.default_value {
        Some(desired_default) => match &current.default_value {
            Some(current_default) => {
                DefaultValue::parse(desired_type, current_default)
                    != DefaultValue::parse(desired_type, desired_default)
            }
            None => true,
        },
        None => false,
    }
}

/// Additions for columns only `desired` has, in desired order.
///
/// Both anchors are the column's neighbours in the desired column list.
/// Since additions run in desired order, after removals and the reorder,
/// `previous` always exists by the time the column is added.
fn added_columns(current: &Table, desired: &Table, mode: IdentifierMode) -> Vec<Change> {
    let neighbour = |position: Option<usize>| {
        position
            .and_then(|p| desired.columns.get(p))
            .map(|c| c.name.clone())
    };

    desired
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| current.find_column(&column.name, mode).is_none())
        .map(|(position, column)| Change::AddColumn {
            table: current.name.clone(),
            column: Column {
                primary_key: false,
                ..column.clone()
            },
            previous: neighbour(position.checked_sub(1)),
            next: neighbour(Some(position + 1)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlsync_model::{TypeCode, TypeInfo};

    const MODE: IdentifierMode = IdentifierMode::CaseInsensitive;

    fn table(columns: &[&str]) -> Table {
        columns.iter().fold(Table::new("t"), |t, name| {
            t.column(Column::new(*name, TypeCode::Integer))
        })
    }

    fn anchors(changes: &[Change]) -> Vec<(String, Option<String>, Option<String>)> {
        changes
            .iter()
            .filter_map(|c| match c {
                Change::AddColumn {
                    column,
                    previous,
                    next,
                    ..
                } => Some((column.name.clone(), previous.clone(), next.clone())),
                _ => None,
            })
            .collect()
    }

    fn s(name: &str) -> Option<String> {
        Some(name.to_string())
    }

    #[test]
    fn test_added_column_anchors() {
        let changes = diff_columns(
            &table(&["a", "b"]),
            &table(&["x", "a", "y", "z", "b", "w"]),
            &TypeInfo::default(),
            MODE,
        );
        assert!(changes.removed.is_empty());
        assert!(changes.reordered.is_none());
        assert_eq!(
            anchors(&changes.added),
            vec![
                ("x".to_string(), None, s("a")),
                ("y".to_string(), s("a"), s("z")),
                ("z".to_string(), s("y"), s("b")),
                ("w".to_string(), s("b"), None),
            ]
        );
    }

    #[test]
    fn test_adjacent_added_columns_anchor_on_each_other() {
        let changes = diff_columns(
            &table(&["a", "b"]),
            &table(&["a", "y", "z", "b"]),
            &TypeInfo::default(),
            MODE,
        );
        assert_eq!(
            anchors(&changes.added),
            vec![
                ("y".to_string(), s("a"), s("z")),
                ("z".to_string(), s("y"), s("b")),
            ]
        );
    }

    #[test]
    fn test_added_column_anchors_after_removal() {
        let changes = diff_columns(
            &table(&["a", "old", "b"]),
            &table(&["a", "new", "b"]),
            &TypeInfo::default(),
            MODE,
        );
        assert_eq!(changes.removed.len(), 1);
        assert_eq!(
            anchors(&changes.added),
            vec![("new".to_string(), s("a"), s("b"))]
        );
    }

    #[test]
    fn test_added_column_clears_primary_key() {
        let desired = table(&["a"]).column(Column::new("id", TypeCode::Integer).primary_key());
        let changes = diff_columns(&table(&["a"]), &desired, &TypeInfo::default(), MODE);
        match &changes.added[..] {
            [Change::AddColumn { column, .. }] => {
                assert!(!column.primary_key);
                assert!(column.required);
            }
            other => panic!("unexpected changes: {:?}", other),
        }
    }

    #[test]
    fn test_reorder_covers_retained_columns() {
        let changes = diff_columns(
            &table(&["a", "b", "gone", "c"]),
            &table(&["C", "a", "fresh", "b"]),
            &TypeInfo::default(),
            MODE,
        );
        let Some(Change::ColumnOrderChange { positions, .. }) = changes.reordered else {
            panic!("expected a column order change");
        };
        let positions: Vec<_> = positions.into_iter().collect();
        assert_eq!(
            positions,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 2),
                ("c".to_string(), 0)
            ]
        );
    }

    #[test]
    fn test_size_only_for_sized_types() {
        let types = TypeInfo::default();
        let int_with_size = Column::new("n", TypeCode::Integer).size(10);
        let int_plain = Column::new("n", TypeCode::Integer);
        assert!(!definition_changed(&int_with_size, &int_plain, &types));

        let short = Column::new("s", TypeCode::VarChar).size(20);
        let long = Column::new("s", TypeCode::VarChar).size(40);
        assert!(definition_changed(&short, &long, &types));

        let money = Column::new("m", TypeCode::Decimal).precision(10, 2);
        let finer = Column::new("m", TypeCode::Decimal).precision(10, 4);
        assert!(definition_changed(&money, &finer, &types));

        let varchar_scale = Column::new("s", TypeCode::VarChar).precision(20, 1);
        assert!(!definition_changed(&short, &varchar_scale, &types));
    }

    #[test]
    fn test_target_type_mapping() {
        let bit = Column::new("flag", TypeCode::Bit);
        let boolean = Column::new("flag", TypeCode::Boolean);
        assert!(definition_changed(&bit, &boolean, &TypeInfo::default()));
        let types = TypeInfo::default().with_target(TypeCode::Bit, TypeCode::Boolean);
        assert!(!definition_changed(&bit, &boolean, &types));
    }

    #[test]
    fn test_defaults() {
        let types = TypeInfo::default();
        let plain = Column::new("d", TypeCode::Double).default_value("10");
        let scientific = Column::new("d", TypeCode::Double).default_value("1e+1");
        let none = Column::new("d", TypeCode::Double);
        assert!(!definition_changed(&plain, &scientific, &types));
        assert!(!definition_changed(&plain, &none, &types));
        assert!(definition_changed(&none, &plain, &types));
        assert!(definition_changed(
            &plain,
            &Column::new("d", TypeCode::Double).default_value("10.5"),
            &types
        ));
    }

    #[test]
    fn test_required_and_auto_increment() {
        let types = TypeInfo::default();
        let base = Column::new("id", TypeCode::Integer);
        assert!(definition_changed(&base, &base.clone().required(), &types));
        assert!(definition_changed(&base, &base.clone().auto_increment(), &types));
        assert!(!definition_changed(&base, &base.clone(), &types));
    }
}
