//! Request handlers for documents.

mod orders;
mod references;

pub use orders::*;
pub use references::*;
