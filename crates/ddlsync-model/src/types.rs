//! Canonical column types and the capability metadata the differ consults.

use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::str::FromStr;

/// Canonical column type codes, modelled on the JDBC type catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Array,
    BigInt,
    Binary,
    Bit,
    Blob,
    Boolean,
    Char,
    Clob,
    DataLink,
    Date,
    Decimal,
    Distinct,
    Double,
    Float,
    Integer,
    JavaObject,
    LongVarBinary,
    LongVarChar,
    Null,
    Numeric,
    Other,
    Real,
    Ref,
    SmallInt,
    Struct,
    Time,
    Timestamp,
    TinyInt,
    VarBinary,
    VarChar,
}

impl TypeCode {
    /// Every type code, in catalogue order.
    pub const ALL: [TypeCode; 30] = [
        TypeCode::Array,
        TypeCode::BigInt,
        TypeCode::Binary,
        TypeCode::Bit,
        TypeCode::Blob,
        TypeCode::Boolean,
        TypeCode::Char,
        TypeCode::Clob,
        TypeCode::DataLink,
        TypeCode::Date,
        TypeCode::Decimal,
        TypeCode::Distinct,
        TypeCode::Double,
        TypeCode::Float,
        TypeCode::Integer,
        TypeCode::JavaObject,
        TypeCode::LongVarBinary,
        TypeCode::LongVarChar,
        TypeCode::Null,
        TypeCode::Numeric,
        TypeCode::Other,
        TypeCode::Real,
        TypeCode::Ref,
        TypeCode::SmallInt,
        TypeCode::Struct,
        TypeCode::Time,
        TypeCode::Timestamp,
        TypeCode::TinyInt,
        TypeCode::VarBinary,
        TypeCode::VarChar,
    ];

    /// The upper-case type name used in schema files.
    pub fn name(&self) -> &'static str {
        match self {
            TypeCode::Array => "ARRAY",
            TypeCode::BigInt => "BIGINT",
            TypeCode::Binary => "BINARY",
            TypeCode::Bit => "BIT",
            TypeCode::Blob => "BLOB",
            TypeCode::Boolean => "BOOLEAN",
            TypeCode::Char => "CHAR",
            TypeCode::Clob => "CLOB",
            TypeCode::DataLink => "DATALINK",
            TypeCode::Date => "DATE",
            TypeCode::Decimal => "DECIMAL",
            TypeCode::Distinct => "DISTINCT",
            TypeCode::Double => "DOUBLE",
            TypeCode::Float => "FLOAT",
            TypeCode::Integer => "INTEGER",
            TypeCode::JavaObject => "JAVA_OBJECT",
            TypeCode::LongVarBinary => "LONGVARBINARY",
            TypeCode::LongVarChar => "LONGVARCHAR",
            TypeCode::Null => "NULL",
            TypeCode::Numeric => "NUMERIC",
            TypeCode::Other => "OTHER",
            TypeCode::Real => "REAL",
            TypeCode::Ref => "REF",
            TypeCode::SmallInt => "SMALLINT",
            TypeCode::Struct => "STRUCT",
            TypeCode::Time => "TIME",
            TypeCode::Timestamp => "TIMESTAMP",
            TypeCode::TinyInt => "TINYINT",
            TypeCode::VarBinary => "VARBINARY",
            TypeCode::VarChar => "VARCHAR",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            TypeCode::TinyInt | TypeCode::SmallInt | TypeCode::Integer | TypeCode::BigInt
        )
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, TypeCode::Float | TypeCode::Real | TypeCode::Double)
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self, TypeCode::Decimal | TypeCode::Numeric)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating() || self.is_decimal()
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, TypeCode::Bit | TypeCode::Boolean)
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, TypeCode::Date | TypeCode::Time | TypeCode::Timestamp)
    }

    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            TypeCode::Char | TypeCode::VarChar | TypeCode::LongVarChar | TypeCode::Clob
        )
    }

    pub fn is_binary(&self) -> bool {
        matches!(
            self,
            TypeCode::Binary | TypeCode::VarBinary | TypeCode::LongVarBinary | TypeCode::Blob
        )
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a type name does not denote a known [`TypeCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown column type '{0}'")]
pub struct ParseTypeCodeError(pub String);

impl FromStr for TypeCode {
    type Err = ParseTypeCodeError;

    /// Resolves a type name (case-insensitive) to its canonical code.
    ///
    /// A few common aliases are accepted so that names reported by
    /// introspection (`INT`, `DOUBLE PRECISION`, `TEXT`) map onto the
    /// catalogue.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let alias = match upper.as_str() {
            "INT" | "INT4" => Some(TypeCode::Integer),
            "INT8" => Some(TypeCode::BigInt),
            "INT2" => Some(TypeCode::SmallInt),
            "DOUBLE PRECISION" | "FLOAT8" => Some(TypeCode::Double),
            "FLOAT4" => Some(TypeCode::Real),
            "BOOL" => Some(TypeCode::Boolean),
            "TEXT" => Some(TypeCode::LongVarChar),
            "CHARACTER VARYING" => Some(TypeCode::VarChar),
            "CHARACTER" => Some(TypeCode::Char),
            "DATETIME" => Some(TypeCode::Timestamp),
            "BYTEA" => Some(TypeCode::LongVarBinary),
            _ => None,
        };
        if let Some(code) = alias {
            return Ok(code);
        }
        TypeCode::ALL
            .iter()
            .copied()
            .find(|code| code.name() == upper)
            .ok_or_else(|| ParseTypeCodeError(s.to_string()))
    }
}

/// Read-only knowledge about how a platform treats column types.
///
/// The column differ asks this before comparing sizes: a live database will
/// happily report a size for an `INTEGER` column, which must not show up as a
/// difference against a schema file that never declared one.
pub trait TypeCapabilities: Send + Sync {
    /// Whether a declared size (length) is meaningful for this type.
    fn has_size(&self, type_code: TypeCode) -> bool;

    /// Whether precision and scale are meaningful for this type.
    fn has_precision_and_scale(&self, type_code: TypeCode) -> bool;

    /// The type a column of `type_code` actually ends up with on the platform.
    fn target_type(&self, type_code: TypeCode) -> TypeCode {
        type_code
    }
}

/// Data-driven [`TypeCapabilities`] implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeInfo {
    sized: IndexSet<TypeCode>,
    precision_and_scale: IndexSet<TypeCode>,
    targets: IndexMap<TypeCode, TypeCode>,
}

impl TypeInfo {
    /// Capabilities with no sized types and no type remapping.
    pub fn empty() -> Self {
        Self {
            sized: IndexSet::new(),
            precision_and_scale: IndexSet::new(),
            targets: IndexMap::new(),
        }
    }

    /// Marks `type_code` as carrying a meaningful size.
    pub fn with_size(mut self, type_code: TypeCode) -> Self {
        self.sized.insert(type_code);
        self
    }

    /// Marks `type_code` as carrying meaningful precision and scale.
    pub fn with_precision_and_scale(mut self, type_code: TypeCode) -> Self {
        self.precision_and_scale.insert(type_code);
        self
    }

    /// Declares that columns of type `from` are stored as `to`.
    pub fn with_target(mut self, from: TypeCode, to: TypeCode) -> Self {
        self.targets.insert(from, to);
        self
    }
}

impl Default for TypeInfo {
    /// Sized character/binary types and precision/scale decimal types.
    fn default() -> Self {
        Self::empty()
            .with_size(TypeCode::Char)
            .with_size(TypeCode::VarChar)
            .with_size(TypeCode::Binary)
            .with_size(TypeCode::VarBinary)
            .with_precision_and_scale(TypeCode::Decimal)
            .with_precision_and_scale(TypeCode::Numeric)
    }
}

impl TypeCapabilities for TypeInfo {
    fn has_size(&self, type_code: TypeCode) -> bool {
        self.sized.contains(&type_code)
    }

    fn has_precision_and_scale(&self, type_code: TypeCode) -> bool {
        self.precision_and_scale.contains(&type_code)
    }

    fn target_type(&self, type_code: TypeCode) -> TypeCode {
        self.targets.get(&type_code).copied().unwrap_or(type_code)
    }
}
