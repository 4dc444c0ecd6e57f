use std::fmt;

use thiserror::Error;

use crate::simulate::SimulationError;

/// Which of the two compared models an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Current,
    Desired,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Current => write!(f, "current"),
            Side::Desired => write!(f, "desired"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{side} model: table '{table}' is declared more than once")]
    DuplicateTable { side: Side, table: String },

    #[error("{side} model: column '{table}.{column}' is declared more than once")]
    DuplicateColumn {
        side: Side,
        table: String,
        column: String,
    },

    #[error("{side} model: foreign key {foreign_key} of table '{table}' has no references")]
    EmptyForeignKey {
        side: Side,
        table: String,
        foreign_key: String,
    },

    #[error(
        "{side} model: foreign key {foreign_key} of table '{table}' references unknown table '{target}'"
    )]
    ForeignKeyTargetNotFound {
        side: Side,
        table: String,
        foreign_key: String,
        target: String,
    },

    #[error(
        "{side} model: foreign key {foreign_key} uses column '{column}' which table '{table}' does not have"
    )]
    ForeignKeyColumnNotFound {
        side: Side,
        table: String,
        foreign_key: String,
        column: String,
    },

    #[error(
        "{side} model: foreign key {foreign_key} of table '{table}' references unknown column '{target}.{column}'"
    )]
    ForeignKeyReferencedColumnNotFound {
        side: Side,
        table: String,
        foreign_key: String,
        target: String,
        column: String,
    },

    #[error("{side} model: index {index} of table '{table}' uses unknown column '{column}'")]
    IndexColumnNotFound {
        side: Side,
        table: String,
        index: String,
        column: String,
    },

    /// A named foreign key points at a different table in the desired model.
    #[error(
        "foreign key '{foreign_key}' of table '{table}' changes its target from '{from}' to '{to}'; drop it and add a differently named key instead"
    )]
    ForeignKeyRetargeted {
        table: String,
        foreign_key: String,
        from: String,
        to: String,
    },

    /// A planned change failed its precondition during verification.
    #[error("planned change {index} does not apply: {source}")]
    Simulation {
        index: usize,
        #[source]
        source: SimulationError,
    },

    /// The verified plan leaves differences behind.
    #[error("plan does not reach the desired model, still differing: {}", remaining.join("; "))]
    PlanIncomplete { remaining: Vec<String> },
}
