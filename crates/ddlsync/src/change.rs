//! The closed set of structural changes the planner can emit.

use ddlsync_model::{Column, ForeignKey, Index, Table};
use indexmap::IndexMap;
use std::fmt;

/// A single schema change.
///
/// Every variant names exactly one table, see [`Change::changed_table`].
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Create a table, including its columns, primary key and indices.
    /// Foreign keys that point at tables created in the same plan are not
    /// part of it; they follow as [`Change::AddForeignKey`].
    AddTable { table: Table },
    /// Drop a table that no longer has foreign keys of its own.
    RemoveTable { table: String },
    /// Add a column between two siblings.
    AddColumn {
        table: String,
        /// The new column, with `primary_key` cleared
        column: Column,
        /// Column the new one goes after, `None` if it becomes the first
        previous: Option<String>,
        /// Column that follows the new one in the desired table, `None` if it
        /// becomes the last. It may itself be added later in the same plan.
        next: Option<String>,
    },
    RemoveColumn { table: String, column: String },
    /// Change type, size, nullability, auto-increment or default of a column.
    ColumnDefinitionChange {
        table: String,
        /// Complete desired definition
        column: Column,
    },
    /// Reorder the retained columns of a table.
    ColumnOrderChange {
        table: String,
        /// Current column name to its new zero-based position
        positions: IndexMap<String, usize>,
    },
    AddPrimaryKey { table: String, columns: Vec<String> },
    RemovePrimaryKey { table: String },
    /// Replace the primary key with `columns`, in key order.
    PrimaryKeyChange { table: String, columns: Vec<String> },
    AddForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    /// Drop a foreign key. Carries the key as it currently exists so that
    /// unnamed keys can be located by structure.
    RemoveForeignKey {
        table: String,
        foreign_key: ForeignKey,
    },
    AddIndex { table: String, index: Index },
    RemoveIndex { table: String, index: Index },
}

impl Change {
    /// The table this change applies to.
    pub fn changed_table(&self) -> &str {
        match self {
            Change::AddTable { table } => &table.name,
            Change::RemoveTable { table }
            | Change::AddColumn { table, .. }
            | Change::RemoveColumn { table, .. }
            | Change::ColumnDefinitionChange { table, .. }
            | Change::ColumnOrderChange { table, .. }
            | Change::AddPrimaryKey { table, .. }
            | Change::RemovePrimaryKey { table }
            | Change::PrimaryKeyChange { table, .. }
            | Change::AddForeignKey { table, .. }
            | Change::RemoveForeignKey { table, .. }
            | Change::AddIndex { table, .. }
            | Change::RemoveIndex { table, .. } => table,
        }
    }

    pub fn is_foreign_key_removal(&self) -> bool {
        matches!(self, Change::RemoveForeignKey { .. })
    }

    pub fn is_foreign_key_addition(&self) -> bool {
        matches!(self, Change::AddForeignKey { .. })
    }
}

/// Short type description such as `VARCHAR(20)` or `DECIMAL(10,2)`.
pub(crate) fn type_summary(column: &Column) -> String {
    match (column.size, column.scale) {
        (Some(size), Some(scale)) => format!("{}({},{})", column.type_code, size, scale),
        (Some(size), None) => format!("{}({})", column.type_code, size),
        _ => column.type_code.to_string(),
    }
}

fn column_summary(column: &Column) -> String {
    let mut out = type_summary(column);
    if column.required {
        out.push_str(" NOT NULL");
    }
    if column.auto_increment {
        out.push_str(" AUTO");
    }
    if let Some(default) = &column.default_value {
        out.push_str(&format!(" DEFAULT {}", default));
    }
    out
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::AddTable { table } => write!(f, "+ table {}", table.name),
            Change::RemoveTable { table } => write!(f, "- table {}", table),
            Change::AddColumn {
                table,
                column,
                previous,
                ..
            } => {
                write!(f, "+ {}.{}: {}", table, column.name, column_summary(column))?;
                match previous {
                    Some(previous) => write!(f, " after {}", previous),
                    None => write!(f, " first"),
                }
            }
            Change::RemoveColumn { table, column } => write!(f, "- {}.{}", table, column),
            Change::ColumnDefinitionChange { table, column } => {
                write!(f, "~ {}.{}: {}", table, column.name, column_summary(column))
            }
            Change::ColumnOrderChange { table, positions } => {
                let mut order: Vec<_> = positions.iter().collect();
                order.sort_by_key(|(_, position)| **position);
                let names: Vec<_> = order.into_iter().map(|(name, _)| name.as_str()).collect();
                write!(f, "~ {} column order: {}", table, names.join(", "))
            }
            Change::AddPrimaryKey { table, columns } => {
                write!(f, "+ {} PRIMARY KEY ({})", table, columns.join(", "))
            }
            Change::RemovePrimaryKey { table } => write!(f, "- {} PRIMARY KEY", table),
            Change::PrimaryKeyChange { table, columns } => {
                write!(f, "~ {} PRIMARY KEY ({})", table, columns.join(", "))
            }
            Change::AddForeignKey { table, foreign_key } => {
                write!(f, "+ {} FOREIGN KEY {}", table, foreign_key)
            }
            Change::RemoveForeignKey { table, foreign_key } => {
                write!(f, "- {} FOREIGN KEY {}", table, foreign_key)
            }
            Change::AddIndex { table, index } => write!(f, "+ {} {}", table, index),
            Change::RemoveIndex { table, index } => write!(f, "- {} {}", table, index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddlsync_model::TypeCode;

    #[test]
    fn test_changed_table() {
        let add = Change::AddTable {
            table: Table::new("orders"),
        };
        assert_eq!(add.changed_table(), "orders");

        let drop_fk = Change::RemoveForeignKey {
            table: "line_item".to_string(),
            foreign_key: ForeignKey::new(None, "orders").reference("order_id", "id"),
        };
        assert_eq!(drop_fk.changed_table(), "line_item");
        assert!(drop_fk.is_foreign_key_removal());
        assert!(!drop_fk.is_foreign_key_addition());
    }

    #[test]
    fn test_display() {
        let add_column = Change::AddColumn {
            table: "users".to_string(),
            column: Column::new("email", TypeCode::VarChar).size(200).required(),
            previous: Some("name".to_string()),
            next: None,
        };
        assert_eq!(
            add_column.to_string(),
            "+ users.email: VARCHAR(200) NOT NULL after name"
        );

        let definition = Change::ColumnDefinitionChange {
            table: "product".to_string(),
            column: Column::new("price", TypeCode::Decimal)
                .precision(10, 2)
                .default_value("0"),
        };
        assert_eq!(
            definition.to_string(),
            "~ product.price: DECIMAL(10,2) DEFAULT 0"
        );

        let mut positions = IndexMap::new();
        positions.insert("b".to_string(), 1);
        positions.insert("a".to_string(), 0);
        let reorder = Change::ColumnOrderChange {
            table: "t".to_string(),
            positions,
        };
        assert_eq!(reorder.to_string(), "~ t column order: a, b");

        let pk = Change::PrimaryKeyChange {
            table: "t".to_string(),
            columns: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(pk.to_string(), "~ t PRIMARY KEY (a, b)");
    }
}
