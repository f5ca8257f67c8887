//! Dialect builder output and unsupported-operation behavior.

use canopy_core::{DialectError, DialectId, DropSequenceBuilder, NextValueBuilder};

#[test]
fn portable_next_value_statement() {
    let sql = NextValueBuilder::new(DialectId::Default, "SEQ_1")
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT NEXT VALUE FOR SEQ_1");
}

#[test]
fn hana_next_value_statement() {
    let sql = NextValueBuilder::new(DialectId::Hana, "SEQ_1")
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT SEQ_1.NEXTVAL FROM DUMMY");
}

#[test]
fn postgres_next_value_statement() {
    let sql = NextValueBuilder::new(DialectId::Postgres, "SEQ_1")
        .build()
        .unwrap();
    assert_eq!(sql, "SELECT nextval('SEQ_1')");
}

#[test]
fn mysql_and_sybase_reject_next_value() {
    for dialect in [DialectId::MySql, DialectId::Sybase] {
        let err = NextValueBuilder::new(dialect, "SEQ_1").build().unwrap_err();
        match err {
            DialectError::UnsupportedOperation {
                dialect: named, ..
            } => assert_eq!(named, dialect),
        }
        let rendered = NextValueBuilder::new(dialect, "SEQ_1")
            .build()
            .unwrap_err()
            .to_string();
        assert!(
            rendered.contains(dialect.as_str()),
            "error must name the engine: {rendered}"
        );
    }
}

#[test]
fn building_is_stateless_per_invocation() {
    let builder = NextValueBuilder::new(DialectId::Default, "SEQ_1");
    assert_eq!(builder.build().unwrap(), builder.build().unwrap());
    assert_eq!(builder.sequence(), "SEQ_1");
}

#[test]
fn drop_sequence_statements() {
    let sql = DropSequenceBuilder::new(DialectId::Default, "SEQ_1")
        .build()
        .unwrap();
    assert_eq!(sql, "DROP SEQUENCE SEQ_1");

    let err = DropSequenceBuilder::new(DialectId::MySql, "SEQ_1")
        .build()
        .unwrap_err();
    assert!(matches!(err, DialectError::UnsupportedOperation { .. }));
}
