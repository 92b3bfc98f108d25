pub mod api;
pub mod ast;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod schema;
pub mod scope;
pub mod serialization;
pub mod utils;
pub mod value;
pub mod workspace;

#[cfg(test)]
mod testing;

#[cfg(feature = "async")]
pub use api::load_async;
pub use api::{load, parse_str, LoadResult};
pub use context::ParseContext;
pub use error::ConError;
pub use parser::{Execution, ParseOptions};
pub use scope::{Attachment, MissingObjectPolicy};
pub use serialization::SerializeOptions;
pub use workspace::Workspace;
