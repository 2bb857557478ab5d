use thiserror::Error;

#[allow(clippy::module_inception)]
pub mod parser;

pub use parser::parse_bitbake_from_str;

/// An unparseable line or block. Carries enough to point a user at the offending text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parsing error in {source_name} at line {line}: {kind}\nFailing line: {text}")]
pub struct ParseError {
    pub source_name: String,
    pub line: usize,
    pub text: String,
    pub kind: ParseErrorKind,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    #[error("unrecognized statement")]
    UnrecognizedStatement,
    #[error("`{0}` is not allowed in configuration files")]
    RecipeOnlyStatement(String),
    #[error("quoted value has no closing quote before the end of the file")]
    UnterminatedQuotedValue,
    #[error("flag assignments only support `=`, found `{0}`")]
    FlagOperator(String),
    #[error("`{0}` needs at least one name")]
    MissingArguments(String),
    #[error("function body has no closing `}}` line")]
    UnterminatedFunction,
    #[error("`def` needs an indented body")]
    EmptyPythonDef,
}

pub type ParserResult<T> = Result<T, ParseError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserMode {
    /// .conf
    Conf,
    /// .bb, .bbclass, .inc
    Recipe,
}

impl ParserMode {
    pub fn is_conf(&self) -> bool {
        matches!(self, ParserMode::Conf)
    }
}
