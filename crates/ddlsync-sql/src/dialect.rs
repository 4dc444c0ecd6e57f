//! Per-database capability records.

use ddlsync::{TypeCapabilities, TypeCode};

use crate::Ident;

/// Which column attributes a native type spells out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sizing {
    /// Nothing, or the size is part of the native name (`NUMBER(19)`).
    None,
    /// `NAME(size)`
    Length,
    /// `NAME(precision,scale)`
    PrecisionScale,
}

/// How a dialect spells a canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeType {
    pub type_code: TypeCode,
    pub name: &'static str,
    pub sizing: Sizing,
    /// The type the database reports back for a column created with this
    /// native type.
    pub target: TypeCode,
}

const fn plain(type_code: TypeCode, name: &'static str) -> NativeType {
    NativeType {
        type_code,
        name,
        sizing: Sizing::None,
        target: type_code,
    }
}

const fn sized(type_code: TypeCode, name: &'static str) -> NativeType {
    NativeType {
        sizing: Sizing::Length,
        ..plain(type_code, name)
    }
}

const fn scaled(type_code: TypeCode, name: &'static str) -> NativeType {
    NativeType {
        sizing: Sizing::PrecisionScale,
        ..plain(type_code, name)
    }
}

const fn mapped(type_code: TypeCode, name: &'static str, target: TypeCode) -> NativeType {
    NativeType {
        target,
        ..plain(type_code, name)
    }
}

/// How auto-increment columns are created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoIncrement {
    /// A clause appended to the column definition, e.g. `AUTO_INCREMENT`.
    Clause(&'static str),
    /// Integer types are replaced by their serial pseudo-types.
    Serial,
    /// A sequence plus a before-insert trigger filling the column.
    SequenceTrigger,
}

/// How a column definition is changed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAlteration {
    /// One `ALTER COLUMN` statement per attribute: type, nullability, default.
    AlterColumn,
    /// The whole definition is restated after this keyword.
    Redefine(&'static str),
}

/// Everything the renderer needs to know about a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub name: &'static str,
    pub identifier_quote: char,
    /// Longest identifier the database accepts, in bytes. Generated
    /// constraint and index names are shortened to fit.
    pub max_identifier_length: usize,
    /// Native spellings. Types not listed use their canonical name.
    pub native_types: &'static [NativeType],
    /// Foreign keys are declared inside `CREATE TABLE`.
    pub embedded_foreign_keys: bool,
    /// Indices are declared inside `CREATE TABLE`.
    pub embedded_indices: bool,
    pub auto_increment: AutoIncrement,
    /// `ADD COLUMN ... FIRST` / `AFTER c` and reordering existing columns.
    pub column_positioning: bool,
    pub column_alteration: ColumnAlteration,
    /// Keyword(s) after `ALTER TABLE t` that add a column.
    pub add_column: &'static str,
    /// Keyword(s) after `ALTER TABLE t` that drop a foreign key by name.
    pub drop_foreign_key: &'static str,
    /// `DROP INDEX i ON t` rather than `DROP INDEX i`.
    pub drop_index_on_table: bool,
    /// Primary keys are named `{table}{suffix}` and dropped as constraints.
    /// Without it they are dropped with `DROP PRIMARY KEY`.
    pub primary_key_suffix: Option<&'static str>,
}

impl Dialect {
    /// Quote an identifier.
    pub fn quote(&self, name: &str) -> String {
        Ident(name, self.identifier_quote).to_string()
    }

    /// Native spelling of a type, if the dialect lists one.
    pub fn native_type(&self, type_code: TypeCode) -> Option<&'static NativeType> {
        self.native_types.iter().find(|t| t.type_code == type_code)
    }
}

impl TypeCapabilities for Dialect {
    fn has_size(&self, type_code: TypeCode) -> bool {
        self.native_type(type_code)
            .is_some_and(|t| t.sizing == Sizing::Length)
    }

    fn has_precision_and_scale(&self, type_code: TypeCode) -> bool {
        self.native_type(type_code)
            .is_some_and(|t| t.sizing == Sizing::PrecisionScale)
    }

    fn target_type(&self, type_code: TypeCode) -> TypeCode {
        self.native_type(type_code)
            .map_or(type_code, |t| t.target)
    }
}

pub static POSTGRES: Dialect = Dialect {
    name: "PostgreSQL",
    identifier_quote: '"',
    max_identifier_length: 63,
    native_types: &[
        plain(TypeCode::BigInt, "BIGINT"),
        mapped(TypeCode::Binary, "BYTEA", TypeCode::LongVarBinary),
        mapped(TypeCode::Bit, "BOOLEAN", TypeCode::Boolean),
        mapped(TypeCode::Blob, "BYTEA", TypeCode::LongVarBinary),
        plain(TypeCode::Boolean, "BOOLEAN"),
        sized(TypeCode::Char, "CHAR"),
        mapped(TypeCode::Clob, "TEXT", TypeCode::LongVarChar),
        plain(TypeCode::Date, "DATE"),
        scaled(TypeCode::Decimal, "NUMERIC"),
        plain(TypeCode::Double, "DOUBLE PRECISION"),
        mapped(TypeCode::Float, "DOUBLE PRECISION", TypeCode::Double),
        plain(TypeCode::Integer, "INTEGER"),
        mapped(TypeCode::LongVarBinary, "BYTEA", TypeCode::LongVarBinary),
        mapped(TypeCode::LongVarChar, "TEXT", TypeCode::LongVarChar),
        scaled(TypeCode::Numeric, "NUMERIC"),
        plain(TypeCode::Real, "REAL"),
        plain(TypeCode::SmallInt, "SMALLINT"),
        plain(TypeCode::Time, "TIME"),
        plain(TypeCode::Timestamp, "TIMESTAMP"),
        mapped(TypeCode::TinyInt, "SMALLINT", TypeCode::SmallInt),
        mapped(TypeCode::VarBinary, "BYTEA", TypeCode::LongVarBinary),
        sized(TypeCode::VarChar, "VARCHAR"),
    ],
    embedded_foreign_keys: false,
    embedded_indices: false,
    auto_increment: AutoIncrement::Serial,
    column_positioning: false,
    column_alteration: ColumnAlteration::AlterColumn,
    add_column: "ADD COLUMN",
    drop_foreign_key: "DROP CONSTRAINT",
    drop_index_on_table: false,
    primary_key_suffix: Some("_pkey"),
};

pub static MYSQL: Dialect = Dialect {
    name: "MySQL",
    identifier_quote: '`',
    max_identifier_length: 64,
    native_types: &[
        plain(TypeCode::BigInt, "BIGINT"),
        sized(TypeCode::Binary, "BINARY"),
        plain(TypeCode::Bit, "BIT"),
        mapped(TypeCode::Blob, "LONGBLOB", TypeCode::LongVarBinary),
        mapped(TypeCode::Boolean, "BIT", TypeCode::Bit),
        sized(TypeCode::Char, "CHAR"),
        mapped(TypeCode::Clob, "LONGTEXT", TypeCode::LongVarChar),
        plain(TypeCode::Date, "DATE"),
        scaled(TypeCode::Decimal, "DECIMAL"),
        plain(TypeCode::Double, "DOUBLE"),
        mapped(TypeCode::Float, "DOUBLE", TypeCode::Double),
        plain(TypeCode::Integer, "INTEGER"),
        plain(TypeCode::LongVarBinary, "MEDIUMBLOB"),
        plain(TypeCode::LongVarChar, "MEDIUMTEXT"),
        NativeType {
            target: TypeCode::Decimal,
            ..scaled(TypeCode::Numeric, "DECIMAL")
        },
        plain(TypeCode::Real, "FLOAT"),
        plain(TypeCode::SmallInt, "SMALLINT"),
        plain(TypeCode::Time, "TIME"),
        plain(TypeCode::Timestamp, "DATETIME"),
        plain(TypeCode::TinyInt, "TINYINT"),
        sized(TypeCode::VarBinary, "VARBINARY"),
        sized(TypeCode::VarChar, "VARCHAR"),
    ],
    embedded_foreign_keys: true,
    embedded_indices: true,
    auto_increment: AutoIncrement::Clause("AUTO_INCREMENT"),
    column_positioning: true,
    column_alteration: ColumnAlteration::Redefine("MODIFY COLUMN"),
    add_column: "ADD COLUMN",
    drop_foreign_key: "DROP FOREIGN KEY",
    drop_index_on_table: true,
    primary_key_suffix: None,
};

pub static ORACLE: Dialect = Dialect {
    name: "Oracle",
    identifier_quote: '"',
    max_identifier_length: 30,
    native_types: &[
        mapped(TypeCode::BigInt, "NUMBER(19)", TypeCode::Decimal),
        sized(TypeCode::Binary, "RAW"),
        mapped(TypeCode::Bit, "NUMBER(1)", TypeCode::Decimal),
        plain(TypeCode::Blob, "BLOB"),
        mapped(TypeCode::Boolean, "NUMBER(1)", TypeCode::Decimal),
        sized(TypeCode::Char, "CHAR"),
        plain(TypeCode::Clob, "CLOB"),
        plain(TypeCode::Date, "DATE"),
        scaled(TypeCode::Decimal, "NUMBER"),
        plain(TypeCode::Double, "DOUBLE PRECISION"),
        mapped(TypeCode::Float, "DOUBLE PRECISION", TypeCode::Double),
        mapped(TypeCode::Integer, "NUMBER(10)", TypeCode::Decimal),
        mapped(TypeCode::LongVarBinary, "BLOB", TypeCode::Blob),
        mapped(TypeCode::LongVarChar, "CLOB", TypeCode::Clob),
        NativeType {
            target: TypeCode::Decimal,
            ..scaled(TypeCode::Numeric, "NUMBER")
        },
        plain(TypeCode::Real, "REAL"),
        mapped(TypeCode::SmallInt, "NUMBER(5)", TypeCode::Decimal),
        mapped(TypeCode::Time, "DATE", TypeCode::Date),
        plain(TypeCode::Timestamp, "TIMESTAMP"),
        mapped(TypeCode::TinyInt, "NUMBER(3)", TypeCode::Decimal),
        sized(TypeCode::VarBinary, "RAW"),
        sized(TypeCode::VarChar, "VARCHAR2"),
    ],
    embedded_foreign_keys: false,
    embedded_indices: false,
    auto_increment: AutoIncrement::SequenceTrigger,
    column_positioning: false,
    column_alteration: ColumnAlteration::Redefine("MODIFY"),
    add_column: "ADD",
    drop_foreign_key: "DROP CONSTRAINT",
    drop_index_on_table: false,
    primary_key_suffix: None,
};

/// The built-in dialects.
pub static DIALECTS: [&Dialect; 3] = [&POSTGRES, &MYSQL, &ORACLE];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_types_are_unique() {
        for dialect in DIALECTS {
            for (i, native) in dialect.native_types.iter().enumerate() {
                assert!(
                    dialect.native_types[i + 1..]
                        .iter()
                        .all(|other| other.type_code != native.type_code),
                    "{} lists {} twice",
                    dialect.name,
                    native.type_code
                );
            }
        }
    }

    #[test]
    fn test_type_capabilities() {
        assert!(POSTGRES.has_size(TypeCode::VarChar));
        assert!(!POSTGRES.has_size(TypeCode::Integer));
        assert!(!POSTGRES.has_size(TypeCode::VarBinary));
        assert!(POSTGRES.has_precision_and_scale(TypeCode::Decimal));
        assert_eq!(POSTGRES.target_type(TypeCode::Bit), TypeCode::Boolean);
        assert_eq!(POSTGRES.target_type(TypeCode::Array), TypeCode::Array);

        assert!(MYSQL.has_size(TypeCode::VarBinary));
        assert_eq!(MYSQL.target_type(TypeCode::Numeric), TypeCode::Decimal);
        assert_eq!(ORACLE.target_type(TypeCode::Integer), TypeCode::Decimal);
    }

    #[test]
    fn test_quote() {
        assert_eq!(POSTGRES.quote("user"), "\"user\"");
        assert_eq!(MYSQL.quote("my`table"), "`my``table`");
    }
}
