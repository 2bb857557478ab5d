use std::path::Path;

use itertools::Itertools;
use tracing::{debug, error, warn};

use metabake_datasmart::DataSmart;

use crate::build::TaskList;
use crate::errors::MetadataError;
use crate::evaluate::{AnonymousFunction, EvalContext};
use crate::event;
use crate::parse::{MetadataParser, RecipeMetadata};
use crate::MetaResult;

const ANONFUNC: &str = "__anonfunc";

pub(crate) fn finalize(ctx: &mut EvalContext<'_>, file: &Path) -> MetaResult<RecipeMetadata> {
    let parser = ctx.parser;
    let d = ctx.data;

    d.expand_keys()?;
    d.update_data()?;

    let queue = std::mem::take(&mut ctx.anon_queue);
    if !queue.is_empty() {
        run_anonymous_functions(parser, d, &queue, file)?;
    }
    d.update_data()?;

    let mut handlers = Vec::new();
    for name in event::handlers(d) {
        match d.get_var(&name) {
            Some(body) => {
                parser.events().register_handler(&name, &body)?;
                handlers.push(name);
            }
            None => warn!(handler = name.as_str(), "handler has no body, skipping"),
        }
    }

    let tasks = TaskList::from_data(d);
    debug!(file = %file.display(), tasks = tasks.len(), "finalized");
    parser.task_engine().add_tasks(&tasks, d)?;

    Ok(RecipeMetadata { tasks, handlers })
}

fn run_anonymous_functions(
    parser: &MetadataParser,
    d: &DataSmart,
    queue: &[AnonymousFunction],
    file: &Path,
) -> MetaResult<()> {
    let body = queue.iter().map(|f| f.body.as_str()).join("\n");
    d.set_var(ANONFUNC, body);
    d.set_var_flag(ANONFUNC, "python", "1");
    d.set_var_flag(ANONFUNC, "func", "1");

    let result = {
        let _restore_t = scopeguard::guard(d.get_var("T"), |saved| match saved {
            Some(t) if !t.is_empty() => d.set_var("T", t),
            _ => d.del_var("T"),
        });
        d.set_var("T", "${TMPDIR}/");
        parser.executor().execute_named_function(ANONFUNC, d)
    };
    d.del_var(ANONFUNC);

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(
                "exception when executing anonymous function for {}: {:#}",
                file.display(),
                err
            );
            Err(MetadataError::AnonymousExecution {
                file: file.to_path_buf(),
                source: err.into(),
            }
            .into())
        }
    }
}
