//! Property-based tests for the change planner.
//!
//! Schemas are generated from small name pools so that two independently
//! generated schemas share tables, columns and keys often enough to
//! exercise the interesting cases: reorders, definition changes, key
//! changes and foreign keys between tables on both sides.

use std::collections::HashSet;

use ddlsync::{
    Column, Comparator, CompareOptions, Database, ForeignKey, IdentifierMode, Index, Phase,
    Table, TypeCode, TypeInfo, compare, simulate,
};
use proptest::prelude::*;

const MODE: IdentifierMode = IdentifierMode::CaseInsensitive;

/// (target table, local column, foreign column, named), positions are
/// taken modulo the actual lengths.
type ForeignKeyDraft = (usize, usize, usize, bool);

fn table_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("users"),
        Just("orders"),
        Just("product"),
        Just("invoice"),
        Just("region"),
    ]
}

fn column_name() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("id"),
        Just("code"),
        Just("name"),
        Just("amount"),
        Just("ref_id"),
        Just("created"),
    ]
}

fn column_strategy() -> impl Strategy<Value = Column> {
    (
        column_name(),
        0usize..5,
        prop_oneof![Just(20u32), Just(40u32)],
        any::<bool>(),
        prop::bool::weighted(0.3),
        prop::option::of(0usize..3),
    )
        .prop_map(|(name, kind, size, required, primary_key, default)| {
            let (column, defaults) = match kind {
                0 => (Column::new(name, TypeCode::Integer), ["0", "1", "1e0"]),
                1 => (Column::new(name, TypeCode::BigInt).size(size), ["0", "-1", "42"]),
                2 => (Column::new(name, TypeCode::VarChar).size(size), ["", "none", "n/a"]),
                3 => (
                    Column::new(name, TypeCode::Decimal).precision(size, 2),
                    ["0", "0.00", "1.5"],
                ),
                _ => (Column::new(name, TypeCode::Double), ["10", "1e+1", "0.5"]),
            };
            let mut column = match default {
                Some(i) => column.default_value(defaults[i]),
                None => column,
            };
            if required {
                column = column.required();
            }
            if primary_key {
                column = column.primary_key();
            }
            column
        })
}

fn table_strategy() -> impl Strategy<Value = (Table, Vec<ForeignKeyDraft>)> {
    (
        table_name(),
        prop::collection::vec(column_strategy(), 1..6),
        prop::collection::vec(
            (
                prop::collection::vec(0usize..6, 1..3),
                any::<bool>(),
                any::<bool>(),
            ),
            0..3,
        ),
        prop::collection::vec(
            (0usize..5, 0usize..6, 0usize..6, any::<bool>()),
            0..3,
        ),
    )
        .prop_map(|(name, columns, index_specs, fk_specs)| {
            let mut table = Table::new(name);
            for column in columns {
                if table.find_column(&column.name, MODE).is_none() {
                    table.columns.push(column);
                }
            }

            for (k, (positions, unique, named)) in index_specs.into_iter().enumerate() {
                let mut names: Vec<&str> = Vec::new();
                for position in positions {
                    let column = table.columns[position % table.columns.len()].name.as_str();
                    if !names.contains(&column) {
                        names.push(column);
                    }
                }
                let index_name = format!("idx_{}_{}", table.name, k);
                let name = named.then_some(index_name.as_str());
                let index = if unique {
                    Index::unique(name, &names)
                } else {
                    Index::new(name, &names)
                };
                if !table
                    .indices
                    .iter()
                    .any(|other| other.same_identity(&index, MODE))
                {
                    table.indices.push(index);
                }
            }

            (table, fk_specs)
        })
}

/// A valid schema: unique table names, foreign keys only into generated
/// tables. Key names embed their target, so a named key never changes
/// target between two generated schemas.
fn schema_strategy() -> impl Strategy<Value = Database> {
    prop::collection::vec(table_strategy(), 0..5).prop_map(|specs| {
        let mut seen = HashSet::new();
        let specs: Vec<_> = specs
            .into_iter()
            .filter(|(table, _)| seen.insert(table.name.clone()))
            .collect();
        let targets: Vec<Table> = specs.iter().map(|(table, _)| table.clone()).collect();

        let mut db = Database::new("prop");
        for (mut table, fk_specs) in specs {
            for (k, (target, local, foreign, named)) in fk_specs.into_iter().enumerate() {
                let target = &targets[target % targets.len()];
                let local = table.columns[local % table.columns.len()].name.clone();
                let foreign = target.columns[foreign % target.columns.len()].name.clone();
                let name = format!("fk_{}_{}_{}", table.name, target.name, k);
                let fk = ForeignKey::new(named.then_some(name.as_str()), target.name.clone())
                    .reference(local, foreign);
                if !table
                    .foreign_keys
                    .iter()
                    .any(|other| other.same_identity(&fk, MODE))
                {
                    table.foreign_keys.push(fk);
                }
            }
            db.tables.push(table);
        }
        db
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_identical_schemas_need_no_changes(schema in schema_strategy()) {
        let plan = compare(&schema, &schema);
        prop_assert_eq!(plan, Ok(vec![]));
    }

    #[test]
    fn prop_plan_is_phase_ordered(
        current in schema_strategy(),
        desired in schema_strategy(),
    ) {
        let plan = compare(&current, &desired);
        prop_assert!(plan.is_ok(), "compare failed: {:?}", plan);
        let phases: Vec<Phase> = plan.unwrap_or_default().iter().map(Phase::of).collect();
        prop_assert!(
            phases.windows(2).all(|w| w[0] <= w[1]),
            "phases out of order: {:?}",
            phases
        );
    }

    #[test]
    fn prop_plan_applies_and_converges(
        current in schema_strategy(),
        desired in schema_strategy(),
    ) {
        let plan = compare(&current, &desired);
        prop_assert!(plan.is_ok(), "compare failed: {:?}", plan);
        let plan = plan.unwrap_or_default();

        let mut simulated = current.clone();
        let applied = simulate::apply_all(&mut simulated, &plan, MODE);
        prop_assert!(applied.is_ok(), "plan does not apply: {:?}\nplan: {:#?}", applied, plan);

        let remaining = compare(&simulated, &desired);
        prop_assert_eq!(remaining, Ok(vec![]));
    }

    #[test]
    fn prop_verified_compare_accepts_every_plan(
        current in schema_strategy(),
        desired in schema_strategy(),
    ) {
        let types = TypeInfo::default();
        let result = Comparator::new(&types)
            .with_options(CompareOptions::default().verify(true))
            .compare(&current, &desired);
        prop_assert!(result.is_ok(), "verification failed: {:?}", result);
    }
}
