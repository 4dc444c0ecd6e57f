use super::*;

#[test]
fn test_identifier_mode_comparison() {
    let insensitive = IdentifierMode::CaseInsensitive;
    let sensitive = IdentifierMode::CaseSensitive;
    assert!(insensitive.same("TableA", "TABLEA"));
    assert!(!sensitive.same("TableA", "TABLEA"));
    assert!(sensitive.same("TableA", "TableA"));
    assert_eq!(IdentifierMode::from_delimited(true), sensitive);
    assert_eq!(IdentifierMode::default(), insensitive);
}

#[test]
fn test_type_code_from_str() {
    assert_eq!("varchar".parse::<TypeCode>(), Ok(TypeCode::VarChar));
    assert_eq!("DOUBLE PRECISION".parse::<TypeCode>(), Ok(TypeCode::Double));
    assert_eq!("int".parse::<TypeCode>(), Ok(TypeCode::Integer));
    assert_eq!("JAVA_OBJECT".parse::<TypeCode>(), Ok(TypeCode::JavaObject));
    assert!("GEOMETRY".parse::<TypeCode>().is_err());
    for code in TypeCode::ALL {
        assert_eq!(code.name().parse::<TypeCode>(), Ok(code));
    }
}

#[test]
fn test_default_type_info() {
    let info = TypeInfo::default();
    assert!(info.has_size(TypeCode::VarChar));
    assert!(!info.has_size(TypeCode::Integer));
    assert!(info.has_precision_and_scale(TypeCode::Decimal));
    assert!(!info.has_precision_and_scale(TypeCode::Double));
    assert_eq!(info.target_type(TypeCode::Bit), TypeCode::Bit);

    let remapped = TypeInfo::default().with_target(TypeCode::Bit, TypeCode::Boolean);
    assert_eq!(remapped.target_type(TypeCode::Bit), TypeCode::Boolean);
}

#[test]
fn test_primary_key_in_column_order() {
    let table = Table::new("orders")
        .column(Column::new("b", TypeCode::Integer).primary_key())
        .column(Column::new("x", TypeCode::VarChar).size(20))
        .column(Column::new("a", TypeCode::Integer).primary_key());
    assert_eq!(table.primary_key_names(), vec!["b", "a"]);
    assert!(table.has_primary_key());
    assert!(table.is_primary_key_index(
        &Index::new(Some("pk_idx"), &["a", "B"]),
        IdentifierMode::CaseInsensitive
    ));
    assert!(!table.is_primary_key_index(
        &Index::new(Some("x_idx"), &["a", "x"]),
        IdentifierMode::CaseInsensitive
    ));
}

#[test]
fn test_foreign_key_reference_order_is_ignored() {
    let mode = IdentifierMode::CaseInsensitive;
    let a = ForeignKey::new(Some("TESTFK"), "TableB")
        .reference("ColFK1", "ColPK1")
        .reference("ColFK2", "ColPK2");
    let b = ForeignKey::new(Some("testfk"), "TABLEB")
        .reference("ColFK2", "ColPK2")
        .reference("ColFK1", "ColPK1");
    assert!(a.same_references(&b, mode));
    assert!(a.same_identity(&b, mode));
    assert!(!a.same_identity(&b, IdentifierMode::CaseSensitive));
}

#[test]
fn test_unnamed_foreign_key_identity_includes_target() {
    let mode = IdentifierMode::CaseSensitive;
    let a = ForeignKey::new(None, "parent").reference("parent_id", "id");
    let b = ForeignKey::new(None, "other").reference("parent_id", "id");
    assert!(a.same_references(&b, mode));
    assert!(!a.same_identity(&b, mode));
}

#[test]
fn test_index_column_order_matters() {
    let mode = IdentifierMode::CaseInsensitive;
    let a = Index::unique(Some("TESTINDEX"), &["Col1", "Col2"]);
    let b = Index::unique(Some("TESTINDEX"), &["Col2", "Col1"]);
    let c = Index::new(Some("TESTINDEX"), &["Col1", "Col2"]);
    assert!(!a.same_definition(&b, mode));
    assert!(!a.same_definition(&c, mode));
    assert!(a.same_identity(&b, mode));

    let unnamed = Index::unique(None, &["col1", "col2"]);
    assert!(unnamed.same_identity(&a, mode));
    assert!(!unnamed.same_identity(&b, mode));
}

#[test]
fn test_references_to() {
    let db = Database::new("shop")
        .table(Table::new("customer").column(Column::new("id", TypeCode::Integer).primary_key()))
        .table(
            Table::new("orders")
                .column(Column::new("id", TypeCode::Integer).primary_key())
                .column(Column::new("customer_id", TypeCode::Integer))
                .foreign_key(ForeignKey::new(None, "CUSTOMER").reference("customer_id", "id")),
        );
    let refs: Vec<_> = db
        .references_to("customer", IdentifierMode::CaseInsensitive)
        .map(|(table, _)| table.name.as_str())
        .collect();
    assert_eq!(refs, vec!["orders"]);
    assert_eq!(
        db.references_to("customer", IdentifierMode::CaseSensitive)
            .count(),
        0
    );
}

#[test]
fn test_display() {
    let fk = ForeignKey::new(Some("fk_order_customer"), "customer").reference("customer_id", "id");
    assert_eq!(fk.to_string(), "fk_order_customer (customer_id) -> customer(id)");
    let idx = Index::unique(None, &["a", "b"]);
    assert_eq!(idx.to_string(), "UNIQUE INDEX (a, b)");
}
