// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! Config CLI subcommands: show, defaults, validate.
//!
//! Each reads `FAIRGATE_*` environment variables, or a TOML file when
//! `--config PATH` is given.

use std::path::PathBuf;

use super::{flag_value, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use crate::config::{self, EffectiveConfig, EngineConfig};

/// Options shared by the config subcommands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigArgs {
    pub config: Option<PathBuf>,
    pub json: bool,
}

impl ConfigArgs {
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut opts = Self::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    opts.config = Some(PathBuf::from(flag_value(args, i, "--config")?));
                    i += 2;
                }
                "--json" => {
                    opts.json = true;
                    i += 1;
                }
                other => return Err(format!("Unknown argument: {other}")),
            }
        }
        Ok(opts)
    }

    fn load(&self) -> Result<EngineConfig, config::LoadError> {
        match &self.config {
            Some(path) => config::load_file(path),
            None => Ok(config::load()),
        }
    }
}

/// Print the effective configuration to stdout.
pub fn run_show(opts: &ConfigArgs) -> i32 {
    match opts.load() {
        Ok(cfg) => print_config(&cfg.effective_config(), opts.json),
        Err(e) => {
            eprintln!("Error: {e}");
            EXIT_CONFIG_ERROR
        }
    }
}

/// Print default values, ignoring the environment.
pub fn run_defaults(opts: &ConfigArgs) -> i32 {
    print_config(&EngineConfig::default().effective_config(), opts.json)
}

/// Check the configuration the way the engine would at construction.
///
/// Returns 0 when valid, 2 when the engine would refuse it.
pub fn run_validate(opts: &ConfigArgs) -> i32 {
    let cfg = match opts.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Error: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };
    let queuing = cfg.queuing();
    if let Err(e) = queuing.validate() {
        eprintln!("ERROR: {e}");
        return EXIT_CONFIG_ERROR;
    }
    if queuing.queuing_disabled() {
        eprintln!(
            "NOTE: queuing is disabled ({}={}, {}={}); requests beyond the concurrency limit are rejected at once",
            config::ENV_QUEUES,
            cfg.queues,
            config::ENV_QUEUE_LENGTH_LIMIT,
            cfg.queue_length_limit
        );
    }
    println!("Configuration is valid.");
    EXIT_SUCCESS
}

fn print_config(cfg: &EffectiveConfig, json: bool) -> i32 {
    if json {
        return match serde_json::to_string_pretty(cfg) {
            Ok(text) => {
                println!("{text}");
                EXIT_SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                EXIT_FAILURE
            }
        };
    }
    for line in config_lines(cfg) {
        println!("{line}");
    }
    EXIT_SUCCESS
}

fn config_lines(cfg: &EffectiveConfig) -> Vec<String> {
    vec![
        format!("{}={}", config::ENV_NAME, cfg.name),
        format!("{}={}", config::ENV_QUEUES, cfg.queues),
        format!("{}={}", config::ENV_QUEUE_LENGTH_LIMIT, cfg.queue_length_limit),
        format!("{}={}", config::ENV_HAND_SIZE, cfg.hand_size),
        format!("{}={}", config::ENV_REQUEST_WAIT_LIMIT_MS, cfg.request_wait_limit_ms),
        format!("{}={}", config::ENV_CONCURRENCY_LIMIT, cfg.concurrency_limit),
        format!("{}={}", config::ENV_LOG_LEVEL, cfg.log_level),
        format!("{}={}", config::ENV_LOG_FORMAT, cfg.log_format),
    ]
}
