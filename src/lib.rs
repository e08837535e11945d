//! Shelf catalog application library
//!
//! Book, genre and contributor modules for the shelf framework crates, plus
//! the bootstrap, import and seed utilities shared by the server and CLI.

pub mod app;
pub mod error;
pub mod import;
pub mod modules;
pub mod seed;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{CatalogError, CatalogResult};
