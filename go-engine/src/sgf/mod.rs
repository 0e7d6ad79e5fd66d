mod error;
mod parser;
mod serialize;
pub mod types;

pub use error::SgfError;
pub use parser::parse;
pub use serialize::serialize;
pub use types::*;
