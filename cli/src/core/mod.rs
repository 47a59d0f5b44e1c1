//! # devserve Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//!
//! ## Overview
//!
//! Building blocks that do not know about HTTP:
//! - `args`: declarative command-line parser driven by a parameter table
//! - `help`: usage text rendered from the same table
//! - `error`: the application error type and `Result` alias
//!
pub mod args;
pub mod error;
pub mod help;
