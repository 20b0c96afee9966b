//! HTML document model for fragment refresh
//!
//! This crate provides the two document roles the refresh protocol needs:
//! the live page (mutated in place as regions are replaced) and fetched
//! responses (parsed only to extract region subtrees). Both use the same
//! lenient parser and arena-backed `Document`.

pub mod error;
pub mod nodes;
pub mod parser;
pub mod selector;

pub use error::{DomError, DomResult};
pub use nodes::{Document, NodeId, NodeKind};
pub use parser::SimpleHtmlParser;
pub use selector::{Selector, SimpleSelector};
