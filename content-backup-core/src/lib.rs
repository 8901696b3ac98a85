#![doc = "content-backup-core: core logic library for content-backup."]

//! This crate holds the data model, error taxonomy and pipeline of the daily
//! content backup. The HTTP and cloud storage clients live in the binary crate
//! and plug in through the traits in [`contract`].
//!
//! # Usage
//! Drive a run with [`synchronise::run_gated`] wrapping [`synchronise::synchronise`].

pub mod archive;
pub mod asset;
pub mod clock;
pub mod config;
pub mod contract;
pub mod error;
pub mod run_marker;
pub mod synchronise;

pub use error::BackupError;
