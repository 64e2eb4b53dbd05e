//! Page types and block layout.
//!
//! This module contains:
//! - [`Page`] - The populated rows of one block
//! - [`PageHeader`] - Metadata at the start of every block file
//! - [`PageKind`] - Discriminator between table and matrix blocks

#[allow(clippy::module_inception)]
mod page;
mod page_header;

pub use page::Page;
pub use page_header::{PageHeader, PageKind};
