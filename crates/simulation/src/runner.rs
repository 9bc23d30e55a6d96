//! Deterministic round-based simulation runner.
//!
//! Every node is stepped once per round, in ascending identity order. A
//! node's step is: `RoundStart`, due timers, its inbox, `RoundEnd`. Actions
//! are executed as soon as the node returns them, but messages only become
//! visible to their recipient in the following round.

use crate::invariants::check_invariants;
use crate::network::Network;
use crate::snapshot::RoundSnapshot;
use crate::timers::TimerQueue;
use crate::SimulationError;
use sanders_core::{Action, Event, ProtocolError, StateMachine};
use sanders_mutex::{MutexConfig, MutexState};
use sanders_types::{NodeId, Topology};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Statistics collected during simulation.
#[derive(Debug, Default, Clone)]
pub struct SimulationStats {
    /// Rounds completed.
    pub rounds_run: u64,
    /// Total events processed.
    pub events_processed: u64,
    /// Total actions generated.
    pub actions_generated: u64,
    /// Messages taken out of an inbox and handed to a node.
    pub messages_delivered: u64,
    /// Timers armed.
    pub timers_set: u64,
    /// Timers fired.
    pub timers_fired: u64,
}

/// Deterministic simulation runner.
///
/// Owns the node table, the network and the timers. Nodes never see each
/// other; all interaction goes through returned actions.
pub struct SimulationRunner {
    /// Read-only neighbor graph.
    topology: Arc<dyn Topology>,

    /// All nodes, ordered by identity.
    nodes: Vec<MutexState>,

    /// Node identity to position in `nodes`.
    index: BTreeMap<NodeId, usize>,

    /// Inboxes and in-flight messages.
    network: Network,

    /// Armed relative timers.
    timers: TimerQueue,

    /// The next round to run.
    round: u64,

    /// Whether to verify safety after every round.
    check_invariants: bool,

    /// One entry per completed round.
    snapshots: Vec<RoundSnapshot>,

    /// Statistics.
    stats: SimulationStats,
}

impl SimulationRunner {
    /// Create a runner with one seeded node per topology node.
    pub fn new(topology: Arc<dyn Topology>, config: &MutexConfig, seed: u64) -> Self {
        let nodes: Vec<MutexState> = topology
            .nodes()
            .iter()
            .map(|&id| {
                MutexState::new(id, topology.neighbors(id).to_vec(), config.clone(), seed)
            })
            .collect();

        info!(
            nodes = nodes.len(),
            edges = topology.edges().len(),
            seed,
            "Created simulation runner"
        );

        Self::assemble(topology, nodes)
    }

    /// Create a runner from prepared nodes.
    ///
    /// Every node must be part of `topology`.
    pub fn from_nodes(
        topology: Arc<dyn Topology>,
        nodes: Vec<MutexState>,
    ) -> Result<Self, SimulationError> {
        if let Some(unknown) = nodes.iter().find(|n| !topology.contains(n.id())) {
            return Err(SimulationError::UnknownNode(unknown.id()));
        }
        Ok(Self::assemble(topology, nodes))
    }

    fn assemble(topology: Arc<dyn Topology>, mut nodes: Vec<MutexState>) -> Self {
        nodes.sort_by_key(MutexState::id);
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.id(), i))
            .collect();

        Self {
            network: Network::new(Arc::clone(&topology)),
            topology,
            nodes,
            index,
            timers: TimerQueue::new(),
            round: 0,
            check_invariants: true,
            snapshots: Vec::new(),
            stats: SimulationStats::default(),
        }
    }

    /// Enable or disable the per-round safety check (enabled by default).
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.check_invariants = enabled;
        self
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// The next round to run.
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Get a node by identity.
    pub fn node(&self, id: NodeId) -> Option<&MutexState> {
        self.index.get(&id).map(|&i| &self.nodes[i])
    }

    /// All nodes, ordered by identity.
    pub fn nodes(&self) -> &[MutexState] {
        &self.nodes
    }

    /// The neighbor graph.
    pub fn topology(&self) -> &Arc<dyn Topology> {
        &self.topology
    }

    /// The simulated network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Per-round statistics recorded so far.
    pub fn snapshots(&self) -> &[RoundSnapshot] {
        &self.snapshots
    }

    /// Get simulation statistics.
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Driving
    // ═══════════════════════════════════════════════════════════════════════════

    /// Make `node` request its critical section before the next round.
    ///
    /// Its REQ messages are delivered in the next round, as if sent at the end
    /// of the previous one.
    pub fn request_entry(&mut self, node: NodeId) -> Result<(), SimulationError> {
        let i = *self
            .index
            .get(&node)
            .ok_or(SimulationError::UnknownNode(node))?;
        let actions = self.nodes[i].request_entry();
        let sent_in = self.round.saturating_sub(1);
        for action in actions {
            self.process_action(node, sent_in, action)?;
        }
        Ok(())
    }

    /// Run a single round.
    pub fn step(&mut self) -> Result<RoundSnapshot, SimulationError> {
        let round = self.round;
        self.network.begin_round();

        trace!(round, timers = self.timers.len(), "Running round");

        for i in 0..self.nodes.len() {
            let id = self.nodes[i].id();

            self.dispatch(i, round, Event::RoundStart { round })?;

            for timer in self.timers.take_due(id, round) {
                self.stats.timers_fired += 1;
                self.dispatch(i, round, Event::TimerFired { id: timer })?;
            }

            for envelope in self.network.take_inbox(id) {
                self.stats.messages_delivered += 1;
                self.dispatch(i, round, envelope.into())?;
            }

            self.dispatch(i, round, Event::RoundEnd { round })?;
        }

        if self.check_invariants {
            check_invariants(round, self.topology.as_ref(), &self.nodes)?;
        }

        let snapshot = RoundSnapshot::collect(round, &self.nodes);
        self.snapshots.push(snapshot);
        self.stats.rounds_run += 1;
        self.round += 1;

        trace!(
            round,
            waiting = snapshot.waiting,
            in_cs = snapshot.in_cs,
            in_flight = self.network.in_flight(),
            "Round complete"
        );

        Ok(snapshot)
    }

    /// Run `rounds` rounds.
    pub fn run(&mut self, rounds: u64) -> Result<(), SimulationError> {
        for _ in 0..rounds {
            self.step()?;
        }

        info!(
            rounds = self.stats.rounds_run,
            events = self.stats.events_processed,
            messages = self.network.posted(),
            "Simulation complete"
        );
        Ok(())
    }

    /// Run until `done` holds after a round, for at most `max_rounds` rounds.
    ///
    /// Returns whether `done` was reached.
    pub fn run_until<F>(&mut self, max_rounds: u64, mut done: F) -> Result<bool, SimulationError>
    where
        F: FnMut(&Self) -> bool,
    {
        for _ in 0..max_rounds {
            self.step()?;
            if done(self) {
                return Ok(true);
            }
        }
        debug!(max_rounds, "Round limit reached");
        Ok(false)
    }

    fn dispatch(&mut self, index: usize, round: u64, event: Event) -> Result<(), SimulationError> {
        let node = &mut self.nodes[index];
        let id = node.id();

        trace!(node = id.0, event = event.type_name(), "Dispatching");
        let actions = node
            .handle(event)
            .map_err(|source| SimulationError::Protocol {
                node: id,
                round,
                source,
            })?;

        self.stats.events_processed += 1;
        self.stats.actions_generated += actions.len() as u64;

        for action in actions {
            self.process_action(id, round, action)?;
        }
        Ok(())
    }

    /// Execute an action emitted by `from` during `round`.
    fn process_action(
        &mut self,
        from: NodeId,
        round: u64,
        action: Action,
    ) -> Result<(), SimulationError> {
        if let Some(message) = action.message() {
            trace!(node = from.0, kind = message.type_name(), "Outbound message");
        }
        match action {
            Action::Send { to, message } => {
                if !self.network.send(from, to, message) {
                    return Err(SimulationError::Protocol {
                        node: from,
                        round,
                        source: ProtocolError::NotANeighbor(to),
                    });
                }
            }

            Action::Broadcast { message } => {
                self.network.broadcast(from, message);
            }

            Action::SetTimer { id, delay_rounds } => {
                let fire_round = round.saturating_add(delay_rounds.max(1));
                self.timers.schedule(from, fire_round, id);
                self.stats.timers_set += 1;
                trace!(node = from.0, fire_round, "Timer armed");
            }
        }
        Ok(())
    }
}
