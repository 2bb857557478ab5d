use metabake_syntax::{parse_bitbake_from_str, ParserMode};

use crate::evaluate::{EvalContext, Evaluate};
use crate::MetaResult;

mod export_functions;

fn evaluate_recipe(input: &str, ctx: &mut EvalContext<'_>) -> MetaResult<()> {
    parse_bitbake_from_str(input, ParserMode::Recipe, "test.bb")?.evaluate(ctx)
}
