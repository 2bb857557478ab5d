#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Whitespace,
    Comment,
    Identifier,
    /// `[name]`, including the brackets
    Varflag,

    // Keywords
    AddHandler,
    AddTask,
    After,
    Before,
    Export,
    ExportFunctions,
    Fakeroot,
    Include,
    Inherit,
    Python,
    PythonDefKeyword,
    Require,

    // Assignment operators
    Equals,
    DefaultEquals,
    ColonEquals,
    PlusEquals,
    EqualsPlus,
    DotEquals,
    EqualsDot,

    OpenParenthesis,
    CloseParenthesis,
    OpenBrace,
    CloseBrace,
    Colon,

    /// Any single character that does not start one of the above
    Other,
}

impl TokenKind {
    pub fn is_assignment_operator(self) -> bool {
        matches!(
            self,
            TokenKind::Equals
                | TokenKind::DefaultEquals
                | TokenKind::ColonEquals
                | TokenKind::PlusEquals
                | TokenKind::EqualsPlus
                | TokenKind::DotEquals
                | TokenKind::EqualsDot
        )
    }

    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::AddHandler
                | TokenKind::AddTask
                | TokenKind::After
                | TokenKind::Before
                | TokenKind::Export
                | TokenKind::ExportFunctions
                | TokenKind::Fakeroot
                | TokenKind::Include
                | TokenKind::Inherit
                | TokenKind::Python
                | TokenKind::PythonDefKeyword
                | TokenKind::Require
        )
    }

    /// Keywords and plain identifiers both name things; `python = "1"` is a plain variable.
    pub fn is_name(self) -> bool {
        self == TokenKind::Identifier || self.is_keyword()
    }
}

#[macro_export]
macro_rules! T {
    [=] => { $crate::token::TokenKind::Equals };
    [?=] => { $crate::token::TokenKind::DefaultEquals };
    [:=] => { $crate::token::TokenKind::ColonEquals };
    [+=] => { $crate::token::TokenKind::PlusEquals };
    [=+] => { $crate::token::TokenKind::EqualsPlus };
    [.=] => { $crate::token::TokenKind::DotEquals };
    [=.] => { $crate::token::TokenKind::EqualsDot };
    ['('] => { $crate::token::TokenKind::OpenParenthesis };
    [')'] => { $crate::token::TokenKind::CloseParenthesis };
    ['{'] => { $crate::token::TokenKind::OpenBrace };
    ['}'] => { $crate::token::TokenKind::CloseBrace };
    [:] => { $crate::token::TokenKind::Colon };
}
