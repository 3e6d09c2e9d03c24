pub mod document;
pub mod encoding;

pub use document::{Document, DocumentError};
pub use encoding::{Encoding, CANDIDATES};
