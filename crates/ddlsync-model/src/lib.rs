//! Relational schema model types for ddlsync.
//!
//! This crate contains the value types that describe one snapshot of a
//! database schema: [`Database`], [`Table`], [`Column`], [`ForeignKey`] and
//! [`Index`]. They are shared by the comparison engine (`ddlsync`) and the
//! SQL renderer (`ddlsync-sql`).
//!
//! Name comparisons are never done with `==` directly; they go through an
//! [`IdentifierMode`], because whether `Users` and `USERS` denote the same
//! table depends on whether the schema uses delimited identifiers.

mod default_value;
mod types;

pub use default_value::DefaultValue;
pub use types::{ParseTypeCodeError, TypeCapabilities, TypeCode, TypeInfo};

use std::collections::HashSet;
use std::fmt;

/// How identifiers are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierMode {
    /// Delimited identifiers: `Users` and `USERS` are different names.
    CaseSensitive,
    /// Plain identifiers: names are compared ignoring ASCII case.
    #[default]
    CaseInsensitive,
}

impl IdentifierMode {
    /// Mode to use when the schema does or does not use delimited identifiers.
    pub fn from_delimited(delimited: bool) -> Self {
        if delimited {
            IdentifierMode::CaseSensitive
        } else {
            IdentifierMode::CaseInsensitive
        }
    }

    /// Whether two identifiers denote the same name.
    pub fn same(&self, a: &str, b: &str) -> bool {
        match self {
            IdentifierMode::CaseSensitive => a == b,
            IdentifierMode::CaseInsensitive => a.eq_ignore_ascii_case(b),
        }
    }

    /// A key under which equal identifiers hash identically.
    pub fn key(&self, name: &str) -> String {
        match self {
            IdentifierMode::CaseSensitive => name.to_string(),
            IdentifierMode::CaseInsensitive => name.to_ascii_uppercase(),
        }
    }

    /// Whether two name lists are equal element by element.
    pub fn same_seq<A: AsRef<str>, B: AsRef<str>>(&self, a: &[A], b: &[B]) -> bool {
        a.len() == b.len()
            && a
                .iter()
                .zip(b)
                .all(|(x, y)| self.same(x.as_ref(), y.as_ref()))
    }
}

/// A database column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Canonical type
    pub type_code: TypeCode,
    /// Declared size or precision
    pub size: Option<u32>,
    /// Declared scale (decimal types only)
    pub scale: Option<u32>,
    /// Whether the column is NOT NULL
    pub required: bool,
    /// Whether the column is part of the primary key
    pub primary_key: bool,
    /// Whether values are generated by the database
    pub auto_increment: bool,
    /// Default value as written in the schema description
    pub default_value: Option<String>,
}

impl Column {
    /// Create a nullable column with no size, key or default.
    pub fn new(name: impl Into<String>, type_code: TypeCode) -> Self {
        Self {
            name: name.into(),
            type_code,
            size: None,
            scale: None,
            required: false,
            primary_key: false,
            auto_increment: false,
            default_value: None,
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    /// Sets precision and scale.
    pub fn precision(mut self, size: u32, scale: u32) -> Self {
        self.size = Some(size);
        self.scale = Some(scale);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the column as a primary key column. Primary key columns are
    /// always required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// The default value interpreted for this column's type.
    pub fn parsed_default(&self) -> Option<DefaultValue> {
        self.default_value
            .as_deref()
            .map(|text| DefaultValue::parse(self.type_code, text))
    }
}

/// One `(local column, foreign column)` pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    /// Column in the owning table
    pub local_column: String,
    /// Column in the referenced table
    pub foreign_column: String,
}

impl Reference {
    pub fn new(local_column: impl Into<String>, foreign_column: impl Into<String>) -> Self {
        Self {
            local_column: local_column.into(),
            foreign_column: foreign_column.into(),
        }
    }
}

/// A foreign key constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Constraint name, if the schema names it
    pub name: Option<String>,
    /// Referenced table
    pub foreign_table: String,
    /// Column pairs, in declaration order
    pub references: Vec<Reference>,
}

impl ForeignKey {
    pub fn new(name: Option<&str>, foreign_table: impl Into<String>) -> Self {
        Self {
            name: name.map(str::to_string),
            foreign_table: foreign_table.into(),
            references: Vec::new(),
        }
    }

    pub fn reference(
        mut self,
        local_column: impl Into<String>,
        foreign_column: impl Into<String>,
    ) -> Self {
        self.references
            .push(Reference::new(local_column, foreign_column));
        self
    }

    /// Local column names, in declaration order.
    pub fn local_columns(&self) -> impl Iterator<Item = &str> {
        self.references.iter().map(|r| r.local_column.as_str())
    }

    /// Referenced column names, in declaration order.
    pub fn foreign_columns(&self) -> impl Iterator<Item = &str> {
        self.references.iter().map(|r| r.foreign_column.as_str())
    }

    /// Whether both keys use the same set of column pairs.
    ///
    /// Declaration order does not matter: `(a→x, b→y)` and `(b→y, a→x)` are
    /// the same reference set.
    pub fn same_references(&self, other: &ForeignKey, mode: IdentifierMode) -> bool {
        let key = |r: &Reference| (mode.key(&r.local_column), mode.key(&r.foreign_column));
        let ours: HashSet<_> = self.references.iter().map(key).collect();
        let theirs: HashSet<_> = other.references.iter().map(key).collect();
        ours == theirs
    }

    /// Whether `other` denotes this same constraint.
    ///
    /// Named keys are identified by name. Otherwise a key is identified by
    /// its target table and reference set.
    pub fn same_identity(&self, other: &ForeignKey, mode: IdentifierMode) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => mode.same(a, b),
            _ => {
                mode.same(&self.foreign_table, &other.foreign_table)
                    && self.same_references(other, mode)
            }
        }
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "{} ", name)?;
        }
        let locals: Vec<_> = self.local_columns().collect();
        let foreigns: Vec<_> = self.foreign_columns().collect();
        write!(
            f,
            "({}) -> {}({})",
            locals.join(", "),
            self.foreign_table,
            foreigns.join(", ")
        )
    }
}

/// A column in an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    /// Column name
    pub name: String,
    /// Prefix length, for platforms that index a leading part of the value
    pub size: Option<u32>,
}

impl IndexColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
        }
    }
}

/// A database index.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    /// Index name, if the schema names it
    pub name: Option<String>,
    /// Whether this is a unique index
    pub unique: bool,
    /// Indexed columns, in order
    pub columns: Vec<IndexColumn>,
}

impl Index {
    pub fn new(name: Option<&str>, columns: &[&str]) -> Self {
        Self {
            name: name.map(str::to_string),
            unique: false,
            columns: columns.iter().map(|c| IndexColumn::new(*c)).collect(),
        }
    }

    pub fn unique(name: Option<&str>, columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(name, columns)
        }
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Whether both indexes cover the same columns in the same order with
    /// the same uniqueness.
    pub fn same_definition(&self, other: &Index, mode: IdentifierMode) -> bool {
        let ours: Vec<_> = self.column_names().collect();
        let theirs: Vec<_> = other.column_names().collect();
        self.unique == other.unique && mode.same_seq(&ours, &theirs)
    }

    /// Whether `other` denotes this same index: by name when both are named,
    /// by definition otherwise.
    pub fn same_identity(&self, other: &Index, mode: IdentifierMode) -> bool {
        match (&self.name, &other.name) {
            (Some(a), Some(b)) => mode.same(a, b),
            _ => self.same_definition(other, mode),
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unique = if self.unique { "UNIQUE " } else { "" };
        let columns: Vec<_> = self.column_names().collect();
        match &self.name {
            Some(name) => write!(f, "{}INDEX {} ({})", unique, name, columns.join(", ")),
            None => write!(f, "{}INDEX ({})", unique, columns.join(", ")),
        }
    }
}

/// A database table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name
    pub name: String,
    /// Columns, in declaration order
    pub columns: Vec<Column>,
    /// Foreign keys, in declaration order
    pub foreign_keys: Vec<ForeignKey>,
    /// Indices, in declaration order
    pub indices: Vec<Index>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            indices: Vec::new(),
        }
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indices.push(index);
        self
    }

    pub fn find_column(&self, name: &str, mode: IdentifierMode) -> Option<&Column> {
        self.columns.iter().find(|c| mode.same(&c.name, name))
    }

    pub fn find_column_mut(&mut self, name: &str, mode: IdentifierMode) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| mode.same(&c.name, name))
    }

    pub fn column_position(&self, name: &str, mode: IdentifierMode) -> Option<usize> {
        self.columns.iter().position(|c| mode.same(&c.name, name))
    }

    /// Primary key columns, in column-declaration order.
    pub fn primary_key_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    /// Primary key column names, in column-declaration order.
    pub fn primary_key_names(&self) -> Vec<&str> {
        self.primary_key_columns().map(|c| c.name.as_str()).collect()
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }

    /// Whether `index` covers exactly the primary key columns (in any order).
    ///
    /// Such an index is created and dropped together with the primary key.
    pub fn is_primary_key_index(&self, index: &Index, mode: IdentifierMode) -> bool {
        let pk: HashSet<String> = self
            .primary_key_columns()
            .map(|c| mode.key(&c.name))
            .collect();
        let cols: HashSet<String> = index.column_names().map(|c| mode.key(c)).collect();
        !pk.is_empty() && pk == cols
    }
}

/// A complete database schema.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Database {
    /// Schema name
    pub name: String,
    /// Tables, in declaration order
    pub tables: Vec<Table>,
}

impl Database {
    /// Create a new empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Get a table by name.
    pub fn find_table(&self, name: &str, mode: IdentifierMode) -> Option<&Table> {
        self.tables.iter().find(|t| mode.same(&t.name, name))
    }

    pub fn find_table_mut(&mut self, name: &str, mode: IdentifierMode) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| mode.same(&t.name, name))
    }

    /// Tables having at least one foreign key into `target`, paired with
    /// the referencing key.
    pub fn references_to<'a>(
        &'a self,
        target: &'a str,
        mode: IdentifierMode,
    ) -> impl Iterator<Item = (&'a Table, &'a ForeignKey)> + 'a {
        self.tables.iter().flat_map(move |table| {
            table
                .foreign_keys
                .iter()
                .filter(move |fk| mode.same(&fk.foreign_table, target))
                .map(move |fk| (table, fk))
        })
    }
}

#[cfg(test)]
mod tests;
