mod common;

use std::rc::Rc;

use pretty_assertions::assert_eq;

use common::Layer;
use metabake::errors::MetadataError;
use metabake::parse::DEPENDS;
use metabake::{MetadataParser, MethodPool};
use metabake_datasmart::DataSmart;
use metabake_syntax::{ParseError, ParseErrorKind};

#[test_log::test]
fn assignments_in_order() {
    let layer = Layer::new();
    let recipe = layer.write(
        "recipes/a.bb",
        "A = \"x\"\nA += \"y\"\nA =. \"p\"\nB ?= \"1\"\nB ?= \"2\"\n",
    );

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();
    assert_eq!(d.get_var("A").as_deref(), Some("px y"));
    assert_eq!(d.get_var("B").as_deref(), Some("1"));
    assert_eq!(d.get_var("FILE"), Some(recipe.display().to_string()));
    assert_eq!(d.get_var("TOPDIR"), Some(layer.path().display().to_string()));
}

#[test]
fn optional_include_is_skipped_required_is_fatal() {
    let layer = Layer::new();
    let optional = layer.write(
        "recipes/optional.bb",
        "include missing.inc\nAFTER = \"reached\"\n",
    );
    let required = layer.write(
        "recipes/required.bb",
        "require missing.inc\nAFTER = \"reached\"\n",
    );

    let parser = layer.parser();

    let d = DataSmart::new();
    parser.handle(&optional, &d).unwrap();
    assert_eq!(d.get_var("AFTER").as_deref(), Some("reached"));

    let d = DataSmart::new();
    let err = parser.handle(&required, &d).unwrap_err();
    assert!(MetadataError::is_not_found(&err));
    assert_eq!(d.get_var("AFTER"), None);
}

#[test]
fn includes_share_the_store_and_restore_file() {
    let layer = Layer::new();
    let inc = layer.write(
        "recipes/common.inc",
        "INC_FILE := \"${FILE}\"\nSHARED += \"from-inc\"\n",
    );
    let recipe = layer.write(
        "recipes/foo_1.0.bb",
        "SHARED = \"recipe\"\nINC = \"common.inc\"\nrequire ${INC}\nSHARED += \"after\"\n",
    );

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(d.get_var("SHARED").as_deref(), Some("recipe from-inc after"));
    assert_eq!(d.get_var("INC_FILE"), Some(inc.display().to_string()));
    assert_eq!(d.get_var("FILE"), Some(recipe.display().to_string()));
    assert_eq!(d.get_var(DEPENDS), Some(inc.display().to_string()));
}

#[test]
fn inherit_expands_class_names_and_marks_dependencies() {
    let layer = Layer::new();
    let a = layer.write("classes/a.bbclass", "FROM_A = \"1\"\n");
    let b = layer.write("classes/b.bbclass", "FROM_B = \"1\"\n");
    let recipe = layer.write(
        "recipes/r.bb",
        "EXTRA_CLASSES = \"a b\"\ninherit ${EXTRA_CLASSES}\n",
    );

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(d.get_var("FROM_A").as_deref(), Some("1"));
    assert_eq!(d.get_var("FROM_B").as_deref(), Some("1"));
    assert_eq!(
        d.get_var(DEPENDS),
        Some(format!("{} {}", a.display(), b.display()))
    );
}

#[test]
fn missing_class_is_fatal() {
    let layer = Layer::new();
    let recipe = layer.write("recipes/r.bb", "inherit nope\n");

    let err = layer.parser().handle(&recipe, &DataSmart::new()).unwrap_err();
    assert!(MetadataError::is_not_found(&err));
}

#[test]
fn three_nested_classes_export_the_same_function() {
    let layer = Layer::new();
    layer.write(
        "classes/a.bbclass",
        "inherit b\na_do_compile() {\n\tfrom a\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    layer.write(
        "classes/b.bbclass",
        "inherit c\nb_do_compile() {\n\tfrom b\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    layer.write(
        "classes/c.bbclass",
        "python c_do_compile() {\n    bb.note('c')\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    let recipe = layer.write("recipes/r.bb", "inherit a\n");

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(d.get_var("do_compile").as_deref(), Some("\ta_do_compile\n"));
    assert_eq!(d.get_var("a_do_compile").as_deref(), Some("\tfrom a\n"));
    assert_eq!(d.get_var("b_do_compile").as_deref(), Some("\tfrom b\n"));
    assert_eq!(d.get_var("c_do_compile").as_deref(), Some("    bb.note('c')\n"));
    assert!(d.is_flag_set("do_compile", "export_func"));
    assert_eq!(d.get_var_flag("do_compile", "python"), None);
}

/// Follow `export_func` shims from `func` to the body that does the work.
fn forwarding_chain(d: &DataSmart, func: &str) -> Vec<String> {
    let mut chain = vec![func.to_string()];
    while d.is_flag_set(&chain[chain.len() - 1], "export_func") {
        let body = d.get_var(&chain[chain.len() - 1]).unwrap_or_default();
        let body = body.trim();
        let target = body
            .strip_prefix("bb.build.exec_func('")
            .and_then(|rest| rest.strip_suffix("', d)"))
            .unwrap_or(body);
        chain.push(target.to_string());
    }
    chain
}

#[test]
fn nested_exports_reach_the_innermost_class_through_two_shims() {
    let layer = Layer::new();
    layer.write("classes/a.bbclass", "EXPORT_FUNCTIONS do_compile\ninherit b\n");
    layer.write("classes/b.bbclass", "EXPORT_FUNCTIONS do_compile\ninherit c\n");
    layer.write(
        "classes/c.bbclass",
        "c_do_compile() {\n\tfrom c\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    let recipe = layer.write("recipes/r.bb", "inherit a\n");

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(
        forwarding_chain(&d, "do_compile"),
        vec!["do_compile", "b_do_compile", "c_do_compile"]
    );
    assert_eq!(d.get_var("c_do_compile").as_deref(), Some("\tfrom c\n"));
    assert!(d.is_flag_set("do_compile", "func"));
    assert!(d.is_flag_set("b_do_compile", "func"));
}

#[test]
fn exports_after_inherit_add_a_hop_per_class() {
    let layer = Layer::new();
    layer.write("classes/a.bbclass", "inherit b\nEXPORT_FUNCTIONS do_compile\n");
    layer.write("classes/b.bbclass", "inherit c\nEXPORT_FUNCTIONS do_compile\n");
    layer.write(
        "classes/c.bbclass",
        "c_do_compile() {\n\tfrom c\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    let recipe = layer.write("recipes/r.bb", "inherit a\n");

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(
        forwarding_chain(&d, "do_compile"),
        vec!["do_compile", "a_do_compile", "b_do_compile", "c_do_compile"]
    );
}

#[test]
fn middle_class_without_definition_forwards() {
    let layer = Layer::new();
    layer.write("classes/outer.bbclass", "inherit inner\n");
    layer.write(
        "classes/inner.bbclass",
        "python inner_do_install() {\n    pass\n}\nEXPORT_FUNCTIONS do_install\n",
    );
    let recipe = layer.write("recipes/r.bb", "inherit outer\n");

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();

    assert_eq!(
        d.get_var("outer_do_install").as_deref(),
        Some("\tbb.build.exec_func('inner_do_install', d)\n")
    );
    assert_eq!(
        d.get_var("do_install").as_deref(),
        Some("\tbb.build.exec_func('outer_do_install', d)\n")
    );
    assert!(d.is_flag_set("do_install", "python"));
}

#[test]
fn recipe_override_survives_inherit() {
    let layer = Layer::new();
    layer.write(
        "classes/autotools.bbclass",
        "autotools_do_compile() {\n\toe_runmake\n}\nEXPORT_FUNCTIONS do_compile\n",
    );
    let recipe = layer.write(
        "recipes/r.bb",
        "do_compile() {\n\tmake custom\n}\ninherit autotools\n",
    );

    let d = DataSmart::new();
    layer.parser().handle(&recipe, &d).unwrap();
    assert_eq!(d.get_var("do_compile").as_deref(), Some("\tmake custom\n"));
}

#[test]
fn class_methods_register_once() {
    let layer = Layer::new();
    layer.write(
        "classes/helpers.bbclass",
        "def helper_name(d):\n    return 'helper'\n",
    );
    let first = layer.write("recipes/first.bb", "inherit helpers\ninherit helpers\n");
    let second = layer.write("recipes/second.bb", "inherit helpers\n");

    let pool = Rc::new(MethodPool::new());
    let parser = layer.parser().with_executor(pool.clone());

    parser.handle(&first, &DataSmart::new()).unwrap();
    parser.handle(&second, &DataSmart::new()).unwrap();

    let registered = pool.functions("helpers");
    assert_eq!(registered.len(), 1);
    assert_eq!(
        registered[0].source,
        "def helper_name(d):\n    return 'helper'"
    );
    assert!(parser.parsed_methods().is_parsed("helpers"));
    assert!(!parser.parsed_methods().is_parsed("first"));
}

#[test]
fn conf_files_reject_recipe_statements() {
    let layer = Layer::new();
    let conf = layer.write("conf/local.conf", "A = \"1\"\naddtask build\n");

    let err = layer.parser().handle(&conf, &DataSmart::new()).unwrap_err();
    let parse_error = err.downcast_ref::<ParseError>().unwrap();
    assert_eq!(parse_error.line, 2);
    assert_eq!(parse_error.text, "addtask build");
    assert_eq!(
        parse_error.kind,
        ParseErrorKind::RecipeOnlyStatement("addtask".to_string())
    );
}

#[test]
fn conf_files_are_not_finalized() {
    let layer = Layer::new();
    let conf = layer.write(
        "conf/local.conf",
        "OVERRIDES = \"local\"\nA = \"1\"\nA_local = \"2\"\n",
    );

    let d = DataSmart::new();
    let metadata = layer.parser().handle(&conf, &d).unwrap();
    assert_eq!(metadata, None);
    assert_eq!(d.get_var("A").as_deref(), Some("1"));
}

#[test]
fn unsupported_and_unreadable_files() {
    let layer = Layer::new();
    let text = layer.write("notes.txt", "A = \"1\"\n");

    let err = layer.parser().handle(&text, &DataSmart::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MetadataError>(),
        Some(MetadataError::UnsupportedFile(_))
    ));

    let dir = layer.path().join("dir.bb");
    std::fs::create_dir(&dir).unwrap();
    let err = layer.parser().handle(&dir, &DataSmart::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<MetadataError>(),
        Some(MetadataError::Read { .. })
    ));
}

#[test]
fn init_keeps_existing_settings() {
    let layer = Layer::new();
    let parser = MetadataParser::default();

    let d = DataSmart::new();
    d.set_var("TOPDIR", "/somewhere");
    d.set_var("BBPATH", layer.path().display().to_string());
    parser.init(&d).unwrap();
    assert_eq!(d.get_var("TOPDIR").as_deref(), Some("/somewhere"));

    let d = DataSmart::new();
    parser.init(&d).unwrap();
    assert_eq!(
        d.get_var("TOPDIR"),
        Some(std::env::current_dir().unwrap().display().to_string())
    );
    assert_eq!(d.get_var("BBPATH"), None);
}
