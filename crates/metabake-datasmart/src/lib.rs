//! The variable store metadata is evaluated into, and the string expansion engine that resolves
//! `${VAR}` references against it.
//!
//! A [`DataSmart`] maps variable names to an optional value plus a set of string flags.
//! [`DataSmart::create_copy`] forks a child layer that reads through to its parent until a key is
//! written in the child, which is how a recipe gets its own view of a shared base configuration and
//! how `:=` gets a scratch context to expand in.
//!
//! Expansion follows shell-like rules: single quotes suppress everything, backslash escapes map to
//! control characters, only all-upper-case names are resolved and lower-case references are left in
//! place for a later evaluation layer. See [`expand::Expander`].
pub mod data_smart;
pub mod errors;
pub mod expand;
mod update_data;

#[cfg(test)]
mod tests;

pub use data_smart::{DataSmart, Variable};
pub use errors::{DataSmartError, DataSmartResult};
pub use expand::{
    ExpansionCache, ExpansionError, Expander, ExpressionEvaluator, NoExpressionEvaluator,
    VariableLookup,
};
