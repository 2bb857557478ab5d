use pretty_assertions::assert_eq;

overrides_datasmart_test!(no_override, d, {
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("testvalue".to_string()));
});

overrides_datasmart_test!(one_override, d, {
    d.set_var("TEST_bar", "testvalue2");
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("testvalue2".to_string()));
});

overrides_datasmart_test!(later_override_wins, d, {
    d.set_var("TEST_local", "testvalue3");
    d.set_var("TEST_bar", "testvalue2");
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("testvalue3".to_string()));
});

overrides_datasmart_test!(inactive_override, d, {
    d.set_var("TEST_nope", "unused");
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("testvalue".to_string()));
});

overrides_datasmart_test!(append_and_prepend, d, {
    d.set_var("TEST_append", " after");
    d.set_var("TEST_prepend", "before ");
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("before testvalue after".to_string()));
    assert_eq!(d.get_var("TEST_append"), None);

    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("before testvalue after".to_string()));
});

overrides_datasmart_test!(filtered_append, d, {
    d.set_var("TEST_append_foo", " foo");
    d.set_var("TEST_append_nope", " nope");
    d.update_data()?;
    assert_eq!(d.get_var("TEST"), Some("testvalue foo".to_string()));
    assert_eq!(d.get_var("TEST_append_nope"), Some(" nope".to_string()));
});

basic_datasmart_test!(overrides_are_expanded, d, {
    d.set_var("MACHINE", "qemuarm");
    d.set_var("OVERRIDES", "${MACHINE}:local");
    d.set_var("KERNEL", "generic");
    d.set_var("KERNEL_qemuarm", "arm");
    d.update_data()?;
    assert_eq!(d.get_var("KERNEL"), Some("arm".to_string()));
});

basic_datasmart_test!(copy_updates_stay_in_copy, d, {
    d.set_var("OVERRIDES", "x");
    d.set_var("V", "base");
    d.set_var("V_x", "x");

    let copy = d.create_copy();
    copy.update_data()?;

    assert_eq!(copy.get_var("V"), Some("x".to_string()));
    assert_eq!(d.get_var("V"), Some("base".to_string()));
});
