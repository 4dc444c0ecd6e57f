//! SQL rendering for ddlsync change plans.
//!
//! There is one generic renderer. What differs between databases lives in a
//! [`Dialect`] record: identifier quoting and length limits, native type
//! names, whether keys and indices go inside `CREATE TABLE`, how
//! auto-increment columns are made, and a handful of syntax variants.
//!
//! ```ignore
//! let plan = ddlsync::compare(&current, &desired)?;
//! for statement in ddlsync_sql::render_plan(&current, &plan, &ddlsync_sql::POSTGRES)? {
//!     println!("{statement}");
//! }
//! ```
//!
//! A dialect also implements [`ddlsync::TypeCapabilities`], so the same
//! record can drive the comparison:
//!
//! ```ignore
//! let dialect = ddlsync_sql::platform_for_driver("org.postgresql.Driver").unwrap();
//! let plan = ddlsync::Comparator::new(dialect).compare(&current, &desired)?;
//! ```

mod dialect;
pub use dialect::*;

mod platform;
pub use platform::*;

mod render;
pub use render::*;

/// An identifier quoted for a dialect.
///
/// Display writes the value with the dialect's quote character, doubling
/// any embedded quote characters.
pub struct Ident<'a>(pub &'a str, pub char);

impl std::fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Ident(name, quote) = *self;
        write!(f, "{}", quote)?;
        for c in name.chars() {
            if c == quote {
                write!(f, "{}{}", quote, quote)?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "{}", quote)
    }
}

/// A SQL string literal.
///
/// Display writes the value escaped and quoted with single quotes.
///
/// # Example
/// ```
/// use ddlsync_sql::Lit;
/// assert_eq!(format!("{}", Lit("foo")), "'foo'");
/// assert_eq!(format!("{}", Lit("it's")), "'it''s'");
/// ```
pub struct Lit<T: AsRef<str>>(pub T);

impl<T: AsRef<str>> std::fmt::Display for Lit<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'")?;
        for c in self.0.as_ref().chars() {
            if c == '\'' {
                write!(f, "''")?;
            } else {
                write!(f, "{}", c)?;
            }
        }
        write!(f, "'")
    }
}

/// Shorten `name` to at most `max_len` bytes.
///
/// Names that fit are returned unchanged. Longer names keep as much of
/// their start as possible and end in a stable hash of the full name, so
/// two long names sharing a prefix still come out different.
pub fn shorten_name(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }
    let hex = blake3::hash(name.as_bytes()).to_hex().to_string();
    let suffix = &hex[..8.min(max_len)];

    // prefix + "_" + suffix
    let mut len = max_len.saturating_sub(suffix.len() + 1);
    while len > 0 && !name.is_char_boundary(len) {
        len -= 1;
    }
    if len == 0 {
        return suffix.to_string();
    }
    format!("{}_{}", &name[..len], suffix)
}

/// Name for a foreign key the schema leaves unnamed.
///
/// Uses the PostgreSQL convention `{table}_{columns}_fkey`.
///
/// # Examples
///
/// ```
/// assert_eq!(ddlsync_sql::foreign_key_name("post", &["author_id"]), "post_author_id_fkey");
/// ```
pub fn foreign_key_name(table: &str, columns: &[impl AsRef<str>]) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    format!("{}_{}_fkey", table, cols.join("_"))
}

/// Name for an index the schema leaves unnamed.
///
/// Uses `idx_{table}_{columns}`, or `uq_{table}_{columns}` for unique
/// indices.
///
/// # Examples
///
/// ```
/// assert_eq!(ddlsync_sql::index_name("user", &["email"], false), "idx_user_email");
/// assert_eq!(ddlsync_sql::index_name("category", &["shop_id", "handle"], true), "uq_category_shop_id_handle");
/// ```
pub fn index_name(table: &str, columns: &[impl AsRef<str>], unique: bool) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    let prefix = if unique { "uq" } else { "idx" };
    format!("{}_{}_{}", prefix, table, cols.join("_"))
}
