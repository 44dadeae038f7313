//! mxlab: administration of AR equipment records and their 3D model trees
//!
//! Layers, innermost first:
//! - [`domain`]: the model tree, its pure edit operations, payload building and validation
//! - [`application`]: upload, equipment and draft services over I/O traits
//! - [`infrastructure`]: filesystem and HTTP backend implementations, service wiring
//! - [`cli`]: argument parsing and command handlers

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
