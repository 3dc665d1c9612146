//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`encode`] - Turn a coordinate pair into a cell
//! - [`decode`] - Report the location and extent of a cell
//! - [`cover`] - Evaluate a shape expression into a cell stream
//! - [`combine`] - Set algebra over two cell streams
//! - [`normalize`] - Rewrite a cell stream at a fixed resolution
//! - [`optimize`] - Collapse sibling groups in a cell stream

pub mod combine;
pub mod common;
pub mod cover;
pub mod decode;
pub mod encode;
pub mod normalize;
pub mod optimize;
