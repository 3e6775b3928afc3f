//! trybuild UI tests for component_macros

#[test]
fn ui_injectable() {
    let t = trybuild::TestCases::new();
    t.pass("tests/trybuild/injectable_ok.rs");
}
