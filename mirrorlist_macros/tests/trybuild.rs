#[test]
fn ui_pass() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/pass/entity_custom_table_and_columns.rs");
    t.pass("tests/ui/pass/entity_option.rs");
    t.pass("tests/ui/pass/entity_keyless.rs");
    t.pass("tests/ui/pass/entity_ambiguous_key_compiles.rs");
    t.pass("tests/ui/pass/entity_raw_identifiers.rs");
}

#[test]
#[ignore = "expected .stderr snapshots are generated with TRYBUILD=overwrite"]
fn ui_compile_fail() {
    let t = trybuild::TestCases::new();
    t.compile_fail("tests/ui/fail/entity_on_enum.rs");
    t.compile_fail("tests/ui/fail/entity_tuple_struct.rs");
    t.compile_fail("tests/ui/fail/entity_unknown_field_key.rs");
    t.compile_fail("tests/ui/fail/entity_unknown_entity_key.rs");
    t.compile_fail("tests/ui/fail/entity_column_not_a_string.rs");
}
