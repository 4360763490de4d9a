//! moviesearch-core
//!
//! Domain types, catalog sources, the public search surface and the
//! configuration layer shared by the index crate and the CLI.

#![deny(warnings)]
#![deny(dead_code)]
#![deny(unused_variables)]
#![deny(unused_imports)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;
