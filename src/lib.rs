//! Merge request refresh engine - keeps merge requests in sync with branch pushes.
//!
//! When a ref update lands on the git server, every open merge request whose
//! source or target branch was pushed needs attention: merge detection,
//! added-commit notes, stale-flag resets, todo resolution, and hook delivery.
//! This library provides the domain types, planners, and service that do that
//! work, plus the HTTP surface that receives post-receive deliveries.

pub mod git;
pub mod hooks;
pub mod push;
pub mod refresh;
pub mod server;
pub mod store;
pub mod types;

#[cfg(test)]
pub mod test_utils;
