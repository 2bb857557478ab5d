pub mod ast;
pub mod parser;

pub use ast::{
    AddHandler, AddTask, Assignment, AssignmentOperator, Export, ExportFunctions, FlagAssignment,
    FunctionDef, Include, IncludeKind, Inherit, LocatedStatement, PythonDef, Statement,
    StatementGroup, ANONYMOUS_FUNCTION,
};
pub use parser::{parse_bitbake_from_str, ParseError, ParseErrorKind, ParserMode, ParserResult};
