//! Integration tests
//!
//! Exercise the public install API against an in-memory remote, and the
//! `component` binary's argument handling.

pub mod cli;
pub mod common;
pub mod install;
