//! Render changes to SQL statements.
//!
//! Each [`Change`] becomes zero or more statements, each terminated by `;`.
//! Rendering needs the schema as it stands right before the change: a column
//! reorder restates column definitions the change itself doesn't carry.
//! [`render_plan`] keeps that schema up to date by applying every change
//! after rendering it.

use ddlsync::{
    Change, Column, Database, DefaultValue, ForeignKey, IdentifierMode, Index, SimulationError,
    Table, TypeCode, simulate,
};
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    AutoIncrement, ColumnAlteration, Dialect, Lit, Sizing, foreign_key_name, index_name,
    shorten_name,
};

/// Errors from rendering.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The dialect has no statement for the change.
    #[error("{dialect} cannot express '{change}'")]
    Unsupported { dialect: &'static str, change: String },

    /// The change does not fit the schema it is rendered against.
    #[error(transparent)]
    Schema(#[from] SimulationError),
}

/// Renders changes for one dialect.
#[derive(Debug, Clone, Copy)]
pub struct Renderer<'a> {
    dialect: &'a Dialect,
    mode: IdentifierMode,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a Dialect) -> Self {
        Self {
            dialect,
            mode: IdentifierMode::default(),
        }
    }

    /// How table and column names of the plan are matched against the schema.
    pub fn identifier_mode(mut self, mode: IdentifierMode) -> Self {
        self.mode = mode;
        self
    }

    /// Statements for a whole plan, starting from `current`.
    pub fn render_plan(&self, current: &Database, plan: &[Change]) -> Result<Vec<String>, RenderError> {
        let mut schema = current.clone();
        let mut statements = Vec::new();
        for change in plan {
            let rendered = self.render(change, &schema)?;
            trace!(%change, count = rendered.len(), "rendered change");
            statements.extend(rendered);
            simulate::apply(&mut schema, change, self.mode)?;
        }
        debug!(
            dialect = self.dialect.name,
            changes = plan.len(),
            statements = statements.len(),
            "rendered plan"
        );
        Ok(statements)
    }

    /// Statements for one change. `schema` is the schema right before it.
    pub fn render(&self, change: &Change, schema: &Database) -> Result<Vec<String>, RenderError> {
        let d = self.dialect;
        let statements = match change {
            Change::AddTable { table } => self.create_table(table),
            Change::RemoveTable { table } => vec![format!("DROP TABLE {};", d.quote(table))],

            Change::AddColumn {
                table,
                column,
                previous,
                ..
            } => {
                let mut sql = format!(
                    "ALTER TABLE {} {} {}",
                    d.quote(table),
                    d.add_column,
                    self.column_definition(column, false)
                );
                if d.column_positioning {
                    match previous {
                        Some(previous) => sql.push_str(&format!(" AFTER {}", d.quote(previous))),
                        None => sql.push_str(" FIRST"),
                    }
                }
                sql.push(';');

                let mut statements = vec![sql];
                statements.extend(self.sequence_trigger(table, column));
                statements
            }

            Change::RemoveColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {};",
                d.quote(table),
                d.quote(column)
            )],

            Change::ColumnDefinitionChange { table, column } => match d.column_alteration {
                ColumnAlteration::AlterColumn => {
                    let prefix = format!(
                        "ALTER TABLE {} ALTER COLUMN {}",
                        d.quote(table),
                        d.quote(&column.name)
                    );
                    let nullability = if column.required {
                        "SET NOT NULL"
                    } else {
                        "DROP NOT NULL"
                    };
                    let mut statements = vec![
                        format!("{} TYPE {};", prefix, self.type_name(column)),
                        format!("{} {};", prefix, nullability),
                    ];
                    // No default in the desired model leaves the current one alone
                    if let Some(default) = &column.default_value {
                        statements.push(format!(
                            "{} SET DEFAULT {};",
                            prefix,
                            default_literal(column, default)
                        ));
                    }
                    statements
                }
                ColumnAlteration::Redefine(keyword) => vec![format!(
                    "ALTER TABLE {} {} {};",
                    d.quote(table),
                    keyword,
                    self.column_definition(column, false)
                )],
            },

            Change::ColumnOrderChange { table, positions } => {
                let keyword = match d.column_alteration {
                    ColumnAlteration::Redefine(keyword) if d.column_positioning => keyword,
                    _ => {
                        return Err(RenderError::Unsupported {
                            dialect: d.name,
                            change: change.to_string(),
                        });
                    }
                };
                let existing = schema.find_table(table, self.mode).ok_or_else(|| {
                    SimulationError::TableNotFound {
                        change: change.to_string(),
                        table: table.clone(),
                    }
                })?;

                let mut order: Vec<_> = positions.iter().collect();
                order.sort_by_key(|(_, position)| **position);

                let mut statements = Vec::new();
                let mut previous: Option<&str> = None;
                for (name, _) in order {
                    let column = existing.find_column(name, self.mode).ok_or_else(|| {
                        SimulationError::ColumnNotFound {
                            change: change.to_string(),
                            table: table.clone(),
                            column: name.clone(),
                        }
                    })?;
                    let place = match previous {
                        Some(previous) => format!("AFTER {}", d.quote(previous)),
                        None => "FIRST".to_string(),
                    };
                    statements.push(format!(
                        "ALTER TABLE {} {} {} {};",
                        d.quote(table),
                        keyword,
                        self.column_definition(column, false),
                        place
                    ));
                    previous = Some(column.name.as_str());
                }
                statements
            }

            Change::AddPrimaryKey { table, columns } => vec![self.add_primary_key(table, columns)],
            Change::RemovePrimaryKey { table } => vec![self.drop_primary_key(table)],
            Change::PrimaryKeyChange { table, columns } => vec![
                self.drop_primary_key(table),
                self.add_primary_key(table, columns),
            ],

            Change::AddForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} ADD {};",
                d.quote(table),
                self.foreign_key_constraint(table, foreign_key)
            )],
            Change::RemoveForeignKey { table, foreign_key } => vec![format!(
                "ALTER TABLE {} {} {};",
                d.quote(table),
                d.drop_foreign_key,
                self.foreign_key_name(table, foreign_key)
            )],

            Change::AddIndex { table, index } => vec![self.create_index(table, index)],
            Change::RemoveIndex { table, index } => {
                let name = self.index_name(table, index);
                if d.drop_index_on_table {
                    vec![format!("DROP INDEX {} ON {};", name, d.quote(table))]
                } else {
                    vec![format!("DROP INDEX {};", name)]
                }
            }
        };
        Ok(statements)
    }

    /// `CREATE TABLE` followed by whatever the dialect declares separately.
    fn create_table(&self, table: &Table) -> Vec<String> {
        let d = self.dialect;
        let pk_columns = table.primary_key_names();

        // Only a single-column key goes inline
        let inline_pk = pk_columns.len() == 1;

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|col| {
                format!(
                    "    {}",
                    self.column_definition(col, col.primary_key && inline_pk)
                )
            })
            .collect();

        if pk_columns.len() > 1 {
            let quoted: Vec<_> = pk_columns.iter().map(|c| d.quote(c)).collect();
            parts.push(format!("    PRIMARY KEY ({})", quoted.join(", ")));
        }
        if d.embedded_foreign_keys {
            for fk in &table.foreign_keys {
                parts.push(format!("    {}", self.foreign_key_constraint(&table.name, fk)));
            }
        }
        if d.embedded_indices {
            for index in &table.indices {
                let unique = if index.unique { "UNIQUE " } else { "" };
                parts.push(format!(
                    "    {}INDEX {} ({})",
                    unique,
                    self.index_name(&table.name, index),
                    self.column_list(index.column_names())
                ));
            }
        }

        let mut statements = vec![format!(
            "CREATE TABLE {} (\n{}\n);",
            d.quote(&table.name),
            parts.join(",\n")
        )];

        if !d.embedded_foreign_keys {
            for fk in &table.foreign_keys {
                statements.push(format!(
                    "ALTER TABLE {} ADD {};",
                    d.quote(&table.name),
                    self.foreign_key_constraint(&table.name, fk)
                ));
            }
        }
        if !d.embedded_indices {
            for index in &table.indices {
                statements.push(self.create_index(&table.name, index));
            }
        }
        for column in &table.columns {
            statements.extend(self.sequence_trigger(&table.name, column));
        }
        statements
    }

    fn column_definition(&self, column: &Column, inline_pk: bool) -> String {
        let serial =
            column.auto_increment && self.dialect.auto_increment == AutoIncrement::Serial;
        let type_name = if serial {
            match column.type_code {
                TypeCode::BigInt => "BIGSERIAL".to_string(),
                TypeCode::SmallInt | TypeCode::TinyInt => "SMALLSERIAL".to_string(),
                _ => "SERIAL".to_string(),
            }
        } else {
            self.type_name(column)
        };

        let mut def = format!("{} {}", self.dialect.quote(&column.name), type_name);
        // DEFAULT before constraints, Oracle insists
        if let Some(default) = &column.default_value {
            if !serial {
                def.push_str(&format!(" DEFAULT {}", default_literal(column, default)));
            }
        }
        if inline_pk {
            def.push_str(" PRIMARY KEY");
        } else if column.required {
            def.push_str(" NOT NULL");
        }
        if column.auto_increment {
            if let AutoIncrement::Clause(clause) = self.dialect.auto_increment {
                def.push(' ');
                def.push_str(clause);
            }
        }
        def
    }

    fn type_name(&self, column: &Column) -> String {
        let (name, sizing) = match self.dialect.native_type(column.type_code) {
            Some(native) => (native.name, native.sizing),
            None => (column.type_code.name(), Sizing::None),
        };
        match (sizing, column.size, column.scale) {
            (Sizing::Length, Some(size), _) => format!("{}({})", name, size),
            (Sizing::PrecisionScale, Some(size), Some(scale)) => {
                format!("{}({},{})", name, size, scale)
            }
            (Sizing::PrecisionScale, Some(size), None) => format!("{}({})", name, size),
            _ => name.to_string(),
        }
    }

    fn add_primary_key(&self, table: &str, columns: &[String]) -> String {
        let d = self.dialect;
        let constraint = match d.primary_key_suffix {
            Some(suffix) => format!(
                "CONSTRAINT {} ",
                self.identifier(&format!("{}{}", table, suffix))
            ),
            None => String::new(),
        };
        format!(
            "ALTER TABLE {} ADD {}PRIMARY KEY ({});",
            d.quote(table),
            constraint,
            self.column_list(columns.iter().map(String::as_str))
        )
    }

    fn drop_primary_key(&self, table: &str) -> String {
        let d = self.dialect;
        match d.primary_key_suffix {
            Some(suffix) => format!(
                "ALTER TABLE {} DROP CONSTRAINT {};",
                d.quote(table),
                self.identifier(&format!("{}{}", table, suffix))
            ),
            None => format!("ALTER TABLE {} DROP PRIMARY KEY;", d.quote(table)),
        }
    }

    fn foreign_key_constraint(&self, table: &str, fk: &ForeignKey) -> String {
        format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
            self.foreign_key_name(table, fk),
            self.column_list(fk.local_columns()),
            self.dialect.quote(&fk.foreign_table),
            self.column_list(fk.foreign_columns())
        )
    }

    fn create_index(&self, table: &str, index: &Index) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        format!(
            "CREATE {}INDEX {} ON {} ({});",
            unique,
            self.index_name(table, index),
            self.dialect.quote(table),
            self.column_list(index.column_names())
        )
    }

    /// Sequence and trigger backing an auto-increment column, for dialects
    /// without native auto-increment.
    fn sequence_trigger(&self, table: &str, column: &Column) -> Vec<String> {
        if !column.auto_increment || self.dialect.auto_increment != AutoIncrement::SequenceTrigger
        {
            return Vec::new();
        }
        let d = self.dialect;
        let sequence = self.identifier(&format!("seq_{}_{}", table, column.name));
        let trigger = self.identifier(&format!("trg_{}_{}", table, column.name));
        let col = d.quote(&column.name);
        vec![
            format!("CREATE SEQUENCE {};", sequence),
            format!(
                "CREATE OR REPLACE TRIGGER {} BEFORE INSERT ON {} FOR EACH ROW WHEN (new.{} IS NULL) BEGIN SELECT {}.nextval INTO :new.{} FROM dual; END;",
                trigger,
                d.quote(table),
                col,
                sequence,
                col
            ),
        ]
    }

    fn foreign_key_name(&self, table: &str, fk: &ForeignKey) -> String {
        match &fk.name {
            Some(name) => self.identifier(name),
            None => {
                let columns: Vec<_> = fk.local_columns().collect();
                self.identifier(&foreign_key_name(table, &columns))
            }
        }
    }

    fn index_name(&self, table: &str, index: &Index) -> String {
        match &index.name {
            Some(name) => self.identifier(name),
            None => {
                let columns: Vec<_> = index.column_names().collect();
                self.identifier(&index_name(table, &columns, index.unique))
            }
        }
    }

    /// A quoted name, shortened to the dialect's limit.
    fn identifier(&self, name: &str) -> String {
        self.dialect
            .quote(&shorten_name(name, self.dialect.max_identifier_length))
    }

    fn column_list<'c>(&self, columns: impl Iterator<Item = &'c str>) -> String {
        columns
            .map(|c| self.dialect.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Numbers and booleans go in as written when they read as one, everything
/// else as a string.
fn default_literal(column: &Column, default: &str) -> String {
    match DefaultValue::parse(column.type_code, default) {
        DefaultValue::Exact(_) | DefaultValue::Boolean(_) => default.trim().to_string(),
        DefaultValue::Float(value) if value.is_finite() => default.trim().to_string(),
        _ => Lit(default).to_string(),
    }
}

/// Statements for one change, with default options.
pub fn render(
    change: &Change,
    dialect: &Dialect,
    schema: &Database,
) -> Result<Vec<String>, RenderError> {
    Renderer::new(dialect).render(change, schema)
}

/// Statements for a whole plan, with default options.
pub fn render_plan(
    current: &Database,
    plan: &[Change],
    dialect: &Dialect,
) -> Result<Vec<String>, RenderError> {
    Renderer::new(dialect).render_plan(current, plan)
}
