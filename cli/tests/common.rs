//! # devserve Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test file
//! declares `mod common;` and uses what it needs.
//!

// Not every test file uses every helper.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::net::TcpListener;
use std::path::PathBuf;

/// # Get devserve Command (`devserve_cmd`)
///
/// An `assert_cmd::Command` for the `devserve` binary built for this test run.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn devserve_cmd() -> Command {
    Command::cargo_bin("devserve").expect("Failed to find devserve binary for testing")
}

/// Path of the `devserve` binary, for tests that need a long-running child.
pub fn devserve_bin() -> PathBuf {
    assert_cmd::cargo::cargo_bin("devserve")
}

/// Asks the OS for a port that is free right now.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .and_then(|listener| listener.local_addr())
        .expect("Failed to find a free port")
        .port()
}
