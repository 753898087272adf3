//! Integration tests: the full client against a mock index server and the
//! scripted in-memory engine, in one test binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod init;
mod resolve;
mod search;
