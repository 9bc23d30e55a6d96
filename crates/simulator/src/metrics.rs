//! Metrics collection and the end-of-run report.

use hdrhistogram::Histogram;
use sanders_mutex::MutexState;
use sanders_simulation::RoundSnapshot;
use sanders_types::NodeId;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure to set up metric storage.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("failed to create histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

/// Collects metrics during a simulation run.
pub struct MetricsCollector {
    /// Rounds between requesting and entering, one sample per entry.
    wait_rounds: Histogram<u64>,

    /// Critical-section entries already accounted for, per node.
    entries_seen: BTreeMap<NodeId, u64>,

    /// Most nodes inside a critical section at the end of one round.
    peak_in_cs: usize,

    /// Most nodes waiting at the end of one round.
    peak_waiting: usize,

    /// The latest snapshot.
    last: RoundSnapshot,

    rounds: u64,
}

impl MetricsCollector {
    /// Create a new collector.
    pub fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            wait_rounds: Histogram::new(3)?,
            entries_seen: BTreeMap::new(),
            peak_in_cs: 0,
            peak_waiting: 0,
            last: RoundSnapshot::default(),
            rounds: 0,
        })
    }

    /// Record the state after one round.
    pub fn record_round(&mut self, snapshot: &RoundSnapshot, nodes: &[MutexState]) {
        self.rounds += 1;
        self.peak_in_cs = self.peak_in_cs.max(snapshot.in_cs);
        self.peak_waiting = self.peak_waiting.max(snapshot.waiting);
        self.last = *snapshot;

        for node in nodes {
            let stats = node.stats();
            let seen = self.entries_seen.entry(node.id()).or_insert(0);
            if stats.cs_entries > *seen {
                *seen = stats.cs_entries;
                if let Some(waited) = stats.last_wait_rounds {
                    self.wait_rounds.saturating_record(waited);
                }
            }
        }
    }

    /// Number of entries recorded so far.
    pub fn entries(&self) -> u64 {
        self.wait_rounds.len()
    }

    /// Produce the final report.
    pub fn finalize(self) -> SimulationReport {
        let entries = self.wait_rounds.len();
        let quantile = |q: f64| {
            if entries == 0 {
                0
            } else {
                self.wait_rounds.value_at_quantile(q)
            }
        };

        let messages_per_entry = if entries == 0 {
            0.0
        } else {
            self.last.messages as f64 / entries as f64
        };

        SimulationReport {
            nodes: self.last.population(),
            rounds: self.rounds,
            cs_entries: entries,
            messages: self.last.messages,
            relinquishes: self.last.relinquishes,
            messages_per_entry,
            peak_in_cs: self.peak_in_cs,
            peak_waiting: self.peak_waiting,
            wait_p50: quantile(0.50),
            wait_p90: quantile(0.90),
            wait_p99: quantile(0.99),
            wait_max: if entries == 0 { 0 } else { self.wait_rounds.max() },
            wait_mean: if entries == 0 { 0.0 } else { self.wait_rounds.mean() },
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub nodes: usize,
    pub rounds: u64,
    pub cs_entries: u64,
    pub messages: u64,
    pub relinquishes: u64,
    pub messages_per_entry: f64,
    pub peak_in_cs: usize,
    pub peak_waiting: usize,
    /// Waiting time quantiles, in rounds.
    pub wait_p50: u64,
    pub wait_p90: u64,
    pub wait_p99: u64,
    pub wait_max: u64,
    pub wait_mean: f64,
}

impl SimulationReport {
    /// Print a human-readable summary to stdout.
    pub fn print(&self) {
        println!();
        println!("=== Simulation Report ===");
        println!("Nodes:              {}", self.nodes);
        println!("Rounds:             {}", self.rounds);
        println!();
        println!("--- Critical Section ---");
        println!("Entries:            {}", self.cs_entries);
        println!("Peak in CS:         {}", self.peak_in_cs);
        println!("Peak waiting:       {}", self.peak_waiting);
        println!();
        println!("--- Waiting Rounds ---");
        println!("P50:                {}", self.wait_p50);
        println!("P90:                {}", self.wait_p90);
        println!("P99:                {}", self.wait_p99);
        println!("Max:                {}", self.wait_max);
        println!("Mean:               {:.2}", self.wait_mean);
        println!();
        println!("--- Messages ---");
        println!("Total:              {}", self.messages);
        println!("Relinquish:         {}", self.relinquishes);
        println!("Per entry:          {:.2}", self.messages_per_entry);
    }
}
