use pretty_assertions::assert_eq;

use metabake_datasmart::DataSmart;

use super::evaluate_recipe;
use crate::errors::MetadataError;
use crate::evaluate::EvalContext;
use crate::parse::MetadataParser;

fn with_classes<F: FnOnce(&mut EvalContext<'_>)>(classes: &[&str], d: &DataSmart, f: F) {
    let parser = MetadataParser::default();
    let mut ctx = EvalContext::new(&parser, d);
    ctx.class_stack = classes.iter().map(|c| c.to_string()).collect();
    f(&mut ctx);
}

#[test]
fn single_class_links_generic_name() {
    let d = DataSmart::new();
    with_classes(&["autotools"], &d, |ctx| {
        evaluate_recipe(
            "autotools_do_compile() {\n\toe_runmake\n}\nEXPORT_FUNCTIONS do_compile\n",
            ctx,
        )
        .unwrap();
    });

    assert_eq!(d.get_var("do_compile").as_deref(), Some("\tautotools_do_compile\n"));
    assert!(d.is_flag_set("do_compile", "export_func"));
    assert!(d.is_flag_set("do_compile", "func"));
    assert_eq!(d.get_var_flag("do_compile", "python"), None);
}

#[test]
fn python_target_gets_exec_func_stub() {
    let d = DataSmart::new();
    with_classes(&["base"], &d, |ctx| {
        evaluate_recipe(
            "python base_do_fetch() {\n    bb.fetch()\n}\nEXPORT_FUNCTIONS do_fetch\n",
            ctx,
        )
        .unwrap();
    });

    assert_eq!(
        d.get_var("do_fetch").as_deref(),
        Some("\tbb.build.exec_func('base_do_fetch', d)\n")
    );
    assert!(d.is_flag_set("do_fetch", "python"));
}

#[test]
fn user_definition_is_not_clobbered() {
    let d = DataSmart::new();
    d.set_var("do_compile", "\tmake custom\n");
    with_classes(&["autotools"], &d, |ctx| {
        evaluate_recipe("EXPORT_FUNCTIONS do_compile\n", ctx).unwrap();
    });

    assert_eq!(d.get_var("do_compile").as_deref(), Some("\tmake custom\n"));
    assert_eq!(d.get_var_flag("do_compile", "export_func"), None);
}

#[test]
fn previous_shim_is_replaced() {
    let d = DataSmart::new();
    with_classes(&["first"], &d, |ctx| {
        evaluate_recipe("python first_do_x() {\n    pass\n}\nEXPORT_FUNCTIONS do_x\n", ctx)
            .unwrap();
    });
    with_classes(&["second"], &d, |ctx| {
        evaluate_recipe("EXPORT_FUNCTIONS do_x\n", ctx).unwrap();
    });

    assert_eq!(d.get_var("do_x").as_deref(), Some("\tsecond_do_x\n"));
    assert_eq!(d.get_var_flag("do_x", "python"), None);
}

#[test]
fn dirs_flow_from_shim_to_target() {
    let d = DataSmart::new();
    with_classes(&["autotools"], &d, |ctx| {
        evaluate_recipe("do_compile[dirs] = \"${B}\"\nEXPORT_FUNCTIONS do_compile\n", ctx)
            .unwrap();
    });

    assert_eq!(
        d.get_var_flag("autotools_do_compile", "dirs").as_deref(),
        Some("${B}")
    );
}

#[test]
fn two_classes_build_a_chain() {
    let d = DataSmart::new();
    with_classes(&["outer", "inner"], &d, |ctx| {
        evaluate_recipe(
            "inner_do_install() {\n\tinstall\n}\nEXPORT_FUNCTIONS do_install\n",
            ctx,
        )
        .unwrap();
    });

    assert_eq!(d.get_var("outer_do_install").as_deref(), Some("\tinner_do_install\n"));
    assert_eq!(d.get_var("do_install").as_deref(), Some("\touter_do_install\n"));
    assert!(d.is_flag_set("outer_do_install", "export_func"));
}

#[test]
fn empty_class_stack_is_an_error() {
    let d = DataSmart::new();
    with_classes(&[], &d, |ctx| {
        let err = evaluate_recipe("EXPORT_FUNCTIONS do_compile\n", ctx).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<MetadataError>(),
            Some(MetadataError::ExportWithoutClass(f)) if f == "do_compile"
        ));
    });
}
