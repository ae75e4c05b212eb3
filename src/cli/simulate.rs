// Copyright 2024-2026 GG-CORE Contributors
// SPDX-License-Identifier: Apache-2.0

//! `simulate` subcommand: closed-loop load against an in-process queue set.
//!
//! Each entry of `--clients` is one flow with that many clients. Every client
//! submits, holds its seats for a jittered service time, finishes, and
//! submits again until the run ends. The report compares each flow's
//! measured average seat usage with the max-min fair allocation.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{flag_value, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS};
use crate::config::{self, EffectiveConfig, EngineConfig};
use crate::scheduler::{fair_alloc, ConfigError, QueueSet, QueueSetDump, RejectReason, WorkEstimate};
use crate::telemetry::{flow_key, names, rejection_key, StoreObserver};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulateArgs {
    pub config: Option<PathBuf>,
    /// Clients per flow.
    pub clients: Vec<usize>,
    pub seats: u32,
    pub service_ms: u64,
    pub duration_ms: u64,
    pub seed: u64,
    pub json: bool,
}

impl Default for SimulateArgs {
    fn default() -> Self {
        Self {
            config: None,
            clients: vec![8, 8],
            seats: 1,
            service_ms: 20,
            duration_ms: 2000,
            seed: 1,
            json: false,
        }
    }
}

impl SimulateArgs {
    /// Parse the arguments after `simulate`.
    pub fn parse(args: &[String]) -> Result<Self, String> {
        let mut opts = Self::default();
        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--config" => {
                    opts.config = Some(PathBuf::from(flag_value(args, i, "--config")?));
                    i += 2;
                }
                "--clients" => {
                    opts.clients = parse_clients(flag_value(args, i, "--clients")?)?;
                    i += 2;
                }
                "--seats" => {
                    opts.seats = parse_number(args, i, "--seats")?;
                    i += 2;
                }
                "--service-ms" => {
                    opts.service_ms = parse_number(args, i, "--service-ms")?;
                    i += 2;
                }
                "--duration-ms" => {
                    opts.duration_ms = parse_number(args, i, "--duration-ms")?;
                    i += 2;
                }
                "--seed" => {
                    opts.seed = parse_number(args, i, "--seed")?;
                    i += 2;
                }
                "--json" => {
                    opts.json = true;
                    i += 1;
                }
                other => return Err(format!("Unknown argument: {other}")),
            }
        }
        if opts.seats == 0 {
            return Err("--seats must be at least 1".to_string());
        }
        if opts.duration_ms == 0 {
            return Err("--duration-ms must be at least 1".to_string());
        }
        Ok(opts)
    }
}

fn parse_number<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let raw = flag_value(args, i, flag)?;
    raw.parse::<T>()
        .map_err(|_| format!("Invalid value for {flag}: {raw}"))
}

fn parse_clients(raw: &str) -> Result<Vec<usize>, String> {
    let clients = raw
        .split(',')
        .map(|part| match part.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("Invalid client count in --clients: {part:?}")),
        })
        .collect::<Result<Vec<_>, _>>()?;
    if clients.is_empty() {
        return Err("--clients needs at least one flow".to_string());
    }
    Ok(clients)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub flow: String,
    pub clients: usize,
    /// Seats the flow could use if it had the server to itself.
    pub demand_seats: f64,
    /// Max-min fair share of the concurrency limit.
    pub expected_seats: f64,
    /// Seat-seconds used during the run divided by the run length.
    pub measured_seats: f64,
    pub dispatched: u64,
    pub mean_wait_ms: f64,
    pub rejected: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub config: EffectiveConfig,
    pub duration_ms: u64,
    pub seed: u64,
    pub flows: Vec<FlowReport>,
    pub final_state: QueueSetDump,
}

/// Run the simulation on the current tokio runtime.
pub async fn simulate(cfg: &EngineConfig, opts: &SimulateArgs) -> Result<SimulationReport, ConfigError> {
    let observer = Arc::new(StoreObserver::new());
    let qs = QueueSet::builder(cfg.queuing())
        .dispatching(cfg.dispatching())
        .observer(observer.clone())
        .build()?;

    let work = WorkEstimate::new(opts.seats, Duration::ZERO);
    let service = Duration::from_millis(opts.service_ms);
    let window = Duration::from_millis(opts.duration_ms);
    let stop = CancellationToken::new();
    let end = Instant::now() + window;

    let mut seeds = StdRng::seed_from_u64(opts.seed);
    let labels: Vec<String> = (0..opts.clients.len()).map(|f| format!("flow-{f}")).collect();
    let mut clients = Vec::new();
    for (flow, &count) in opts.clients.iter().enumerate() {
        let flow_hash: u64 = seeds.gen();
        for _ in 0..count {
            let client = Client {
                qs: qs.clone(),
                flow_hash,
                label: labels[flow].clone(),
                work,
                service,
                stop: stop.clone(),
                end,
                rng: StdRng::seed_from_u64(seeds.gen()),
            };
            clients.push((flow, tokio::spawn(client.run())));
        }
    }
    tracing::info!(
        queue_set = %cfg.name,
        flows = opts.clients.len(),
        clients = clients.len(),
        duration_ms = opts.duration_ms,
        "simulation started"
    );

    tokio::time::sleep_until(end).await;
    stop.cancel();

    let mut seat_secs = vec![0.0; opts.clients.len()];
    for (flow, handle) in clients {
        match handle.await {
            Ok(secs) => seat_secs[flow] += secs,
            Err(e) => tracing::warn!(error = %e, flow, "simulated client failed"),
        }
    }

    let demands: Vec<f64> = opts
        .clients
        .iter()
        .map(|&n| n as f64 * f64::from(work.seats))
        .collect();
    let expected = fair_alloc(&demands, f64::from(cfg.concurrency_limit));
    let snapshot = observer.snapshot();

    let flows = labels
        .iter()
        .enumerate()
        .map(|(flow, label)| {
            let rejected = RejectReason::ALL
                .iter()
                .map(|&reason| {
                    (
                        reason.as_str().to_string(),
                        snapshot.counter(&rejection_key(label, reason)),
                    )
                })
                .filter(|(_, n)| *n > 0)
                .collect();
            let mean_wait_ms = snapshot
                .histograms
                .get(&flow_key(names::WAIT_SECONDS, label))
                .map_or(0.0, |h| h.mean() * 1000.0);
            FlowReport {
                flow: label.clone(),
                clients: opts.clients[flow],
                demand_seats: demands[flow],
                expected_seats: expected[flow],
                measured_seats: seat_secs[flow] / window.as_secs_f64(),
                dispatched: snapshot.counter(&flow_key(names::DISPATCHED_TOTAL, label)),
                mean_wait_ms,
                rejected,
            }
        })
        .collect();

    Ok(SimulationReport {
        config: cfg.effective_config(),
        duration_ms: opts.duration_ms,
        seed: opts.seed,
        flows,
        final_state: qs.dump(),
    })
}

struct Client {
    qs: QueueSet,
    flow_hash: u64,
    label: String,
    work: WorkEstimate,
    service: Duration,
    stop: CancellationToken,
    end: Instant,
    rng: StdRng,
}

impl Client {
    /// Submit until stopped. Returns seat-seconds executed before `end`.
    async fn run(mut self) -> f64 {
        let mut seat_secs = 0.0;
        while !self.stop.is_cancelled() {
            let (request, _) = self
                .qs
                .start_request(self.flow_hash, self.work, &self.label, self.stop.clone())
                .await;
            match request {
                Some(request) => {
                    let hold = self.service.mul_f64(self.rng.gen_range(0.5..1.5));
                    let began = Instant::now();
                    request.finish_async(tokio::time::sleep(hold)).await;
                    let until = Instant::now().min(self.end);
                    seat_secs +=
                        until.saturating_duration_since(began).as_secs_f64() * f64::from(self.work.seats);
                }
                None => {
                    tokio::select! {
                        _ = self.stop.cancelled() => break,
                        _ = tokio::time::sleep(self.service) => {}
                    }
                }
            }
            tokio::task::yield_now().await;
        }
        seat_secs
    }
}

/// Entry point for `fairgate-cli simulate`. Returns the process exit code.
pub async fn run_simulate(args: &[String]) -> i32 {
    let opts = match SimulateArgs::parse(args) {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("{msg}");
            eprintln!("Usage: fairgate-cli simulate [--config PATH] [--clients N,N,...] [--seats N] [--service-ms N] [--duration-ms N] [--seed N] [--json]");
            return EXIT_CONFIG_ERROR;
        }
    };
    let cfg = match &opts.config {
        Some(path) => match config::load_file(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error: {e}");
                return EXIT_CONFIG_ERROR;
            }
        },
        None => config::load(),
    };

    let report = match simulate(&cfg, &opts).await {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: invalid configuration: {e}");
            return EXIT_CONFIG_ERROR;
        }
    };

    if opts.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error: failed to encode report: {e}");
                return EXIT_FAILURE;
            }
        }
    } else {
        print_report(&report);
    }
    EXIT_SUCCESS
}

fn print_report(report: &SimulationReport) {
    let cfg = &report.config;
    println!(
        "queue set {}: {} queues, hand {}, length limit {}, concurrency limit {}",
        cfg.name, cfg.queues, cfg.hand_size, cfg.queue_length_limit, cfg.concurrency_limit
    );
    println!("duration {} ms, seed {}", report.duration_ms, report.seed);
    println!();
    println!(
        "{:<10} {:>8} {:>8} {:>10} {:>10} {:>11} {:>10}  rejected",
        "flow", "clients", "demand", "expected", "measured", "dispatched", "wait(ms)"
    );
    for flow in &report.flows {
        let rejected = if flow.rejected.is_empty() {
            "-".to_string()
        } else {
            flow.rejected
                .iter()
                .map(|(reason, n)| format!("{reason}={n}"))
                .collect::<Vec<_>>()
                .join(",")
        };
        println!(
            "{:<10} {:>8} {:>8.2} {:>10.2} {:>10.2} {:>11} {:>10.1}  {}",
            flow.flow,
            flow.clients,
            flow.demand_seats,
            flow.expected_seats,
            flow.measured_seats,
            flow.dispatched,
            flow.mean_wait_ms,
            rejected
        );
    }
}
