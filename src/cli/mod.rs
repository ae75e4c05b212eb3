// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Subcommands behind the `fairgate-cli` binary.
//!
//! ## Usage
//!
//! ```bash
//! fairgate-cli simulate --clients 8,8      # Closed-loop fairness run
//! fairgate-cli config show                 # Effective configuration
//! fairgate-cli config validate             # Exit 2 on a bad configuration
//! ```

pub mod config_cmd;
pub mod simulate;

pub use simulate::{run_simulate, simulate, FlowReport, SimulateArgs, SimulationReport};

/// Command succeeded.
pub const EXIT_SUCCESS: i32 = 0;
/// Command ran and failed.
pub const EXIT_FAILURE: i32 = 1;
/// Arguments or configuration were invalid.
pub const EXIT_CONFIG_ERROR: i32 = 2;

/// Value following `flag` at `args[i]`, if any.
pub(crate) fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing value for {flag}"))
}
