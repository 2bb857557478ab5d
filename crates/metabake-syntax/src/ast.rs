//! Parsed statements. Each variant carries exactly what its source form can express.

use itertools::Itertools;
use std::fmt;

/// Name given to a function definition that has no key, e.g. `python () {`.
pub const ANONYMOUS_FUNCTION: &str = "__anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    /// `=`
    Equals,
    /// `?=`
    DefaultEquals,
    /// `:=`
    ColonEquals,
    /// `+=`
    PlusEquals,
    /// `=+`
    EqualsPlus,
    /// `.=`
    DotEquals,
    /// `=.`
    EqualsDot,
}

impl fmt::Display for AssignmentOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssignmentOperator::Equals => "=",
            AssignmentOperator::DefaultEquals => "?=",
            AssignmentOperator::ColonEquals => ":=",
            AssignmentOperator::PlusEquals => "+=",
            AssignmentOperator::EqualsPlus => "=+",
            AssignmentOperator::DotEquals => ".=",
            AssignmentOperator::EqualsDot => "=.",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub exported: bool,
    pub key: String,
    pub op: AssignmentOperator,
    pub value: String,
}

/// `key[flag] = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagAssignment {
    pub key: String,
    pub flag: String,
    pub value: String,
}

/// Bare `export KEY`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    pub python: bool,
    pub fakeroot: bool,
    /// Body lines, each terminated with a newline
    pub body: String,
}

impl FunctionDef {
    pub fn is_anonymous(&self) -> bool {
        self.name == ANONYMOUS_FUNCTION
    }
}

/// `def name(args):` followed by its indented body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonDef {
    pub name: String,
    pub args: String,
    pub body: Vec<String>,
}

impl PythonDef {
    /// The definition as it would be handed to an interpreter.
    pub fn source(&self) -> String {
        std::iter::once(format!("def {}({}):", self.name, self.args))
            .chain(self.body.iter().cloned())
            .join("\n")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeKind {
    Include,
    Require,
}

impl IncludeKind {
    /// A missing `include` target is skipped, a missing `require` target is an error.
    pub fn is_optional(self) -> bool {
        self == IncludeKind::Include
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Include {
    pub kind: IncludeKind,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inherit {
    pub classes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddTask {
    pub task: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFunctions {
    pub functions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddHandler {
    pub handlers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assignment(Assignment),
    FlagAssignment(FlagAssignment),
    Export(Export),
    FunctionDef(FunctionDef),
    PythonDef(PythonDef),
    Include(Include),
    Inherit(Inherit),
    AddTask(AddTask),
    ExportFunctions(ExportFunctions),
    AddHandler(AddHandler),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedStatement {
    /// 1-based line the statement starts on
    pub line: usize,
    pub statement: Statement,
}

/// The statements of one file, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementGroup {
    pub source_name: String,
    pub statements: Vec<LocatedStatement>,
}

impl StatementGroup {
    pub fn iter(&self) -> impl Iterator<Item = &LocatedStatement> {
        self.statements.iter()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

impl<'a> IntoIterator for &'a StatementGroup {
    type Item = &'a LocatedStatement;
    type IntoIter = std::slice::Iter<'a, LocatedStatement>;

    fn into_iter(self) -> Self::IntoIter {
        self.statements.iter()
    }
}
