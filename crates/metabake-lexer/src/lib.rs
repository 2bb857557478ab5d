pub mod lexer;
pub mod token;

pub use lexer::{is_space_or_tab, tokenize_line, LexedToken};
pub use token::TokenKind;
