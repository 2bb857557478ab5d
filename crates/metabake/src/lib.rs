//! Evaluation of recipe, class, include and configuration files into a [`DataSmart`] store.
//!
//! [`MetadataParser`] is the entry point: [`MetadataParser::handle`] resolves a file, parses it with
//! `metabake-syntax`, evaluates each statement against the store, recursing into `include`,
//! `require` and `inherit`, and finalizes top-level recipes (key expansion, override resolution,
//! anonymous functions, handler and task registration).
//!
//! [`DataSmart`]: metabake_datasmart::DataSmart

pub mod build;
pub mod config;
pub mod cooker_data;
pub mod depends;
pub mod errors;
pub mod evaluate;
pub mod event;
mod export_functions;
mod finalize;
pub mod method_pool;
pub mod parse;
pub mod utils;

#[cfg(test)]
mod tests;

pub use build::{TaskEngine, TaskList, TaskQueue};
pub use config::EngineConfig;
pub use cooker_data::BaseConfig;
pub use errors::MetadataError;
pub use evaluate::{AnonymousFunction, EvalContext, Evaluate};
pub use event::{EventHandlers, EventRegistry};
pub use method_pool::{FunctionExecutor, MethodPool, ParsedMethods};
pub use parse::{FileKind, MetadataParser, RecipeMetadata};
pub use utils::{BbPathResolver, FileResolver};

pub type MetaResult<T> = anyhow::Result<T>;
