mod lexer;
mod object;

pub(crate) use lexer::hex_value;
pub use lexer::{Lexer, Token};
pub use object::{ContentItem, Parser};
