//! `EXPORT_FUNCTIONS`: makes `<class>_<func>` reachable as `<func>` through a chain of one-line
//! shim functions, one hop per class on the stack.

use tracing::{debug, trace};

use metabake_datasmart::DataSmart;

use crate::errors::MetadataError;
use crate::evaluate::EvalContext;
use crate::MetaResult;

pub(crate) fn export_functions(functions: &[String], ctx: &EvalContext<'_>) -> MetaResult<()> {
    let d = ctx.data;
    let Some(class) = ctx.class_stack.last() else {
        return Err(MetadataError::ExportWithoutClass(functions.join(" ")).into());
    };
    let parent = ctx
        .class_stack
        .len()
        .checked_sub(2)
        .map(|i| ctx.class_stack[i].as_str());

    for func in functions {
        let own = format!("{}_{}", class, func);
        // (shim, target) pairs
        let links = match parent {
            Some(parent) => {
                let inherited = format!("{}_{}", parent, func);
                vec![(inherited.clone(), own), (func.clone(), inherited)]
            }
            None => vec![(func.clone(), own)],
        };

        for (shim, target) in &links {
            link_shim(d, shim, target);
        }
    }

    Ok(())
}

fn link_shim(d: &DataSmart, shim: &str, target: &str) {
    let defined = d.get_var(shim).is_some_and(|v| !v.is_empty());
    if defined && !d.is_flag_set(shim, "export_func") {
        debug!(shim, target, "keeping user definition");
        return;
    }

    if defined {
        d.del_var_flag(shim, "python");
        d.del_var_flag(shim, "func");
    }

    for flag in ["func", "python"] {
        if let Some(value) = d.get_var_flag(target, flag).filter(|v| !v.is_empty()) {
            d.set_var_flag(shim, flag, value);
        }
    }

    if let Some(dirs) = d.get_var_flag(shim, "dirs").filter(|v| !v.is_empty()) {
        d.set_var_flag(target, "dirs", dirs);
    }

    let body = if d.is_flag_set(target, "python") {
        format!("\tbb.build.exec_func('{}', d)\n", target)
    } else {
        format!("\t{}\n", target)
    };

    trace!(shim, target, "exporting");
    d.set_var(shim, body);
    d.set_var_flag(shim, "export_func", "1");
}
