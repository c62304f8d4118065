//! Frontdown: a versioned, hardlink-capable file-tree backup engine.
//!
//! Given one or more source trees and a backup root, Frontdown produces a
//! standalone copy, a mirror, or a space-efficient versioned snapshot whose
//! unchanged files are hardlinks into a prior backup. Output is a plain,
//! browsable directory tree — no custom archive format.
//!
//! The pipeline is single-threaded and synchronous: [`scan`] walks a tree,
//! [`diff`] pairs source and compare entries, [`plan`] turns the pairing
//! into an ordered [`action::Action`] list under one of three [`config::BackupMode`]s,
//! and [`exec`] applies that list against a [`frontdown_fs::FilesystemView`].
//! [`job`] orchestrates all of the above across a configuration's sources.

pub mod action;
pub mod cli;
pub mod compare;
pub mod config;
pub mod decision;
pub mod diff;
pub mod error;
pub mod exec;
pub mod job;
pub mod logging;
pub mod path;
pub mod plan;
pub mod progress;
pub mod scan;
pub mod stats;

pub use error::{FrontdownError, Result};
