#![doc = "repo-flatten-core: core logic library for repo-flatten."]

//! This crate contains the pattern filter, the tree flattener and the sources it
//! walks (a local directory, an extracted zip archive, a GitHub repository),
//! plus the request handler shared by every entry point.
//!
//! # Usage
//! Build a [`contract::TreeSource`] and pass it to [`flatten::flatten_source`],
//! or use [`archive::flatten_archive`] / [`service::handle_request`] directly.

pub mod archive;
pub mod config;
pub mod contract;
pub mod flatten;
pub mod github;
pub mod ignore;
pub mod local;
pub mod service;
