//! Support library for the mlbench CLI binary.
//!
//! Re-exports the CLI and logging modules so doctests and tests can drive the
//! benchmark pipeline without spawning a subprocess.

pub mod cli;
pub mod logging;
