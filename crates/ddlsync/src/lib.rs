//! Schema comparison and change planning.
//!
//! This crate compares two snapshots of a relational schema, a *current* one
//! (typically read from a live database) and a *desired* one (typically a
//! schema file), and produces the ordered list of [`Change`]s that turns the
//! first into the second without ever issuing a statement a database would
//! reject: columns exist before keys and indices use them, foreign keys are
//! dropped before the columns, keys and tables they depend on, and so on.
//!
//! ```ignore
//! let types = TypeInfo::default();
//! let plan = Comparator::new(&types)
//!     .with_options(CompareOptions::default().verify(true))
//!     .compare(&current, &desired)?;
//! for change in &plan {
//!     println!("{change}");
//! }
//! ```
//!
//! Nothing here talks to a database. Turning changes into SQL is the job of
//! `ddlsync-sql`.
//!
//! # Identifiers
//!
//! All name comparisons go through an [`IdentifierMode`]. With the default,
//! [`IdentifierMode::CaseInsensitive`], `Users` and `USERS` are the same
//! table; schemas that use delimited identifiers want
//! [`IdentifierMode::CaseSensitive`].
//!
//! # Verification
//!
//! With [`CompareOptions::verify`] set, the plan is applied to a copy of the
//! current model (see [`simulate`]) and the result is diffed against the
//! desired model again. A change that would fail, or anything left over,
//! is reported as an error instead of returning a plan.

mod change;
mod diff;
mod error;
pub mod simulate;
pub mod solver;
mod validate;

pub use change::Change;
pub use diff::{SchemaDiff, TableDiff};
pub use error::{Error, Side};
pub use simulate::SimulationError;
pub use solver::Phase;
pub use validate::validate;

pub use ddlsync_model::{
    Column, Database, DefaultValue, ForeignKey, IdentifierMode, Index, IndexColumn, Reference,
    Table, TypeCapabilities, TypeCode, TypeInfo,
};

use std::fmt;

use tracing::debug;

pub type Result<T> = std::result::Result<T, Error>;

/// Options controlling a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareOptions {
    /// How identifiers are compared.
    pub identifier_mode: IdentifierMode,
    /// Simulate the plan and re-diff before returning it.
    pub verify: bool,
}

impl CompareOptions {
    pub fn identifier_mode(mut self, mode: IdentifierMode) -> Self {
        self.identifier_mode = mode;
        self
    }

    /// Shorthand for the identifier mode matching (non-)delimited identifiers.
    pub fn delimited_identifiers(self, delimited: bool) -> Self {
        self.identifier_mode(IdentifierMode::from_delimited(delimited))
    }

    pub fn verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }
}

/// Compares schemas using a given set of type capabilities.
#[derive(Clone, Copy)]
pub struct Comparator<'a> {
    types: &'a dyn TypeCapabilities,
    options: CompareOptions,
}

impl fmt::Debug for Comparator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'a> Comparator<'a> {
    pub fn new(types: &'a dyn TypeCapabilities) -> Self {
        Self {
            types,
            options: CompareOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &CompareOptions {
        &self.options
    }

    /// The ordered list of changes that turns `current` into `desired`.
    pub fn compare(&self, current: &Database, desired: &Database) -> Result<Vec<Change>> {
        let span = tracing::debug_span!(
            "ddlsync.compare",
            current = %current.name,
            desired = %desired.name,
            changes = tracing::field::Empty,
        );
        let _guard = span.enter();

        let diff = self.diff(current, desired)?;
        let changes = solver::order_changes(diff);
        if self.options.verify {
            self.verify(current, desired, &changes)?;
        }

        span.record("changes", changes.len());
        Ok(changes)
    }

    /// The unordered, per-table view of the differences between `current`
    /// and `desired`.
    pub fn diff(&self, current: &Database, desired: &Database) -> Result<SchemaDiff> {
        let mode = self.options.identifier_mode;
        validate(current, Side::Current, mode)?;
        validate(desired, Side::Desired, mode)?;
        diff::diff_schemas(current, desired, self.types, mode)
    }

    fn verify(&self, current: &Database, desired: &Database, changes: &[Change]) -> Result<()> {
        let mut simulated = current.clone();
        simulate::apply_all(&mut simulated, changes, self.options.identifier_mode)?;

        let remaining = diff::diff_schemas(
            &simulated,
            desired,
            self.types,
            self.options.identifier_mode,
        )?;
        if !remaining.is_empty() {
            debug!(remaining = remaining.change_count(), "plan verification failed");
            return Err(Error::PlanIncomplete {
                remaining: remaining.changes().map(|c| c.to_string()).collect(),
            });
        }
        Ok(())
    }
}

/// Compares two schemas with default options and [`TypeInfo::default`].
pub fn compare(current: &Database, desired: &Database) -> Result<Vec<Change>> {
    let types = TypeInfo::default();
    Comparator::new(&types).compare(current, desired)
}
