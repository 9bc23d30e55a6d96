//! Per-round aggregate statistics.

use sanders_mutex::MutexState;
use sanders_types::NodeState;
use serde::{Deserialize, Serialize};

/// Population counts and cumulative message totals at the end of a round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: u64,
    pub not_in_cs: usize,
    pub waiting: usize,
    pub in_cs: usize,
    /// Messages sent by all nodes since the start of the run.
    pub messages: u64,
    /// RELINQUISH messages sent by all nodes since the start of the run.
    pub relinquishes: u64,
}

impl RoundSnapshot {
    /// CSV header matching [`RoundSnapshot::to_csv_row`].
    pub const CSV_HEADER: &'static str = "round,not_in_cs,waiting,in_cs,messages,relinquishes";

    /// Aggregate over a node table.
    pub fn collect<'a>(round: u64, nodes: impl IntoIterator<Item = &'a MutexState>) -> Self {
        let mut snapshot = Self {
            round,
            ..Default::default()
        };
        for node in nodes {
            match node.state() {
                NodeState::NotInCs => snapshot.not_in_cs += 1,
                NodeState::Waiting => snapshot.waiting += 1,
                NodeState::InCs => snapshot.in_cs += 1,
            }
            let stats = node.stats();
            snapshot.messages += stats.messages_sent;
            snapshot.relinquishes += stats.relinquish_sent;
        }
        snapshot
    }

    /// Total nodes counted.
    pub fn population(&self) -> usize {
        self.not_in_cs + self.waiting + self.in_cs
    }

    /// One CSV line, without trailing newline.
    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{},{}",
            self.round, self.not_in_cs, self.waiting, self.in_cs, self.messages, self.relinquishes
        )
    }
}
