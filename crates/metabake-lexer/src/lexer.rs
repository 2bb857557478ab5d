//! Scanner for a single logical line of recipe text.
//!
//! The recipe language is line oriented: what a line means is decided by its first few tokens
//! (a keyword, a name followed by an operator, a name followed by `()`, ...). Everything after an
//! assignment operator or a directive keyword is raw text that the parser slices out of the line
//! by offset, so the scanner never has to understand values. Characters it has no use for come
//! out as single-character [`TokenKind::Other`] tokens.

use muncher::Muncher;
use phf::{self, phf_map};

use crate::token::TokenKind;

static BITBAKE_KEYWORDS: phf::Map<&'static str, TokenKind> = phf_map! {
    "after" => TokenKind::After,
    "addtask" => TokenKind::AddTask,
    "addhandler" => TokenKind::AddHandler,
    "before" => TokenKind::Before,
    "def" => TokenKind::PythonDefKeyword,
    "export" => TokenKind::Export,
    "fakeroot" => TokenKind::Fakeroot,
    "inherit" => TokenKind::Inherit,
    "include" => TokenKind::Include,
    "python" => TokenKind::Python,
    "require" => TokenKind::Require,
    "EXPORT_FUNCTIONS" => TokenKind::ExportFunctions,
};

pub fn is_space_or_tab(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

fn is_bitbake_first_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$')
}

fn is_bitbake_identifier_char(c: char) -> bool {
    // a-zA-Z0-9\-_+.${}/
    is_bitbake_first_identifier_char(c) || matches!(c, '-' | '+' | '.' | '{' | '}' | '/')
}

fn is_bitbake_varflag_char(c: char) -> bool {
    // a-zA-Z0-9\-_+.
    c.is_alphanumeric() || matches!(c, '-' | '_' | '+' | '.')
}

/// Look `n` characters past the cursor without consuming anything.
fn lookahead(m: &mut Muncher, n: usize) -> Option<char> {
    m.reset_peek();
    let mut ret = None;
    for _ in 0..=n {
        ret = m.peek().copied();
    }
    m.reset_peek();
    ret
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexedToken<'input> {
    pub kind: TokenKind,
    pub text: &'input str,
    /// Byte offset of `text` within the scanned line
    pub offset: usize,
}

impl LexedToken<'_> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

pub struct LineLexer<'input> {
    input: &'input str,
    muncher: Muncher<'input>,
    offset: usize,
}

impl<'input> LineLexer<'input> {
    pub fn new(input: &'input str) -> LineLexer<'input> {
        LineLexer {
            input,
            muncher: Muncher::new(input),
            offset: 0,
        }
    }

    fn eat(&mut self) -> Option<char> {
        let c = self.muncher.eat()?;
        self.offset += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = lookahead(&mut self.muncher, 0) {
            if !pred(c) {
                break;
            }
            self.eat();
        }
    }

    fn eat_if(&mut self, expected: char) -> bool {
        if lookahead(&mut self.muncher, 0) == Some(expected) {
            self.eat();
            return true;
        }
        false
    }

    fn scan_identifier(&mut self, start: usize) -> TokenKind {
        while let Some(c) = lookahead(&mut self.muncher, 0) {
            if !is_bitbake_identifier_char(c) {
                break;
            }

            // `A+=` and `A.=` end the name before the operator
            if matches!(c, '+' | '.') && lookahead(&mut self.muncher, 1) == Some('=') {
                break;
            }

            self.eat();
        }

        let text = &self.input[start..self.offset];
        match BITBAKE_KEYWORDS.get(text) {
            Some(kind) => match lookahead(&mut self.muncher, 0) {
                None | Some(' ' | '\t' | '(') => *kind,
                _ => TokenKind::Identifier,
            },
            None => TokenKind::Identifier,
        }
    }

    fn scan_varflag(&mut self) -> TokenKind {
        let mut n = 0;
        while let Some(c) = lookahead(&mut self.muncher, n) {
            if !is_bitbake_varflag_char(c) {
                break;
            }
            n += 1;
        }

        if n == 0 || lookahead(&mut self.muncher, n) != Some(']') {
            return TokenKind::Other;
        }

        for _ in 0..=n {
            self.eat();
        }
        TokenKind::Varflag
    }
}

impl<'input> Iterator for LineLexer<'input> {
    type Item = LexedToken<'input>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.offset;
        let c = self.eat()?;

        let kind = match c {
            c if is_space_or_tab(c) => {
                self.eat_while(is_space_or_tab);
                TokenKind::Whitespace
            }
            '#' => {
                self.eat_while(|_| true);
                TokenKind::Comment
            }
            '=' => {
                if self.eat_if('+') {
                    TokenKind::EqualsPlus
                } else if self.eat_if('.') {
                    TokenKind::EqualsDot
                } else {
                    TokenKind::Equals
                }
            }
            '+' if self.eat_if('=') => TokenKind::PlusEquals,
            '.' if self.eat_if('=') => TokenKind::DotEquals,
            '?' if self.eat_if('=') => TokenKind::DefaultEquals,
            ':' => {
                if self.eat_if('=') {
                    TokenKind::ColonEquals
                } else {
                    TokenKind::Colon
                }
            }
            '[' => self.scan_varflag(),
            '(' => TokenKind::OpenParenthesis,
            ')' => TokenKind::CloseParenthesis,
            '{' => TokenKind::OpenBrace,
            '}' => TokenKind::CloseBrace,
            c if is_bitbake_first_identifier_char(c) => self.scan_identifier(start),
            _ => TokenKind::Other,
        };

        Some(LexedToken {
            kind,
            text: &self.input[start..self.offset],
            offset: start,
        })
    }
}

pub fn tokenize_line(line: &str) -> Vec<LexedToken<'_>> {
    LineLexer::new(line).collect()
}
