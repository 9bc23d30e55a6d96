//! Per-node protocol state machine.

use crate::{DeferredQueue, DistributionSampler, MutexConfig, Sampler};
use sanders_core::{Action, Event, ProtocolError, StateMachine, TimerId};
use sanders_messages::ProtocolMessage;
use sanders_types::{NodeId, NodeState, Timestamp, VoteRequest};
use tracing::{debug, info, warn};

/// Seed multiplier separating per-node sampler streams.
const SEED_SPREAD: u64 = 0x9E37_79B9_7F4A_7C15;

/// Read-only counters exposed for aggregation.
///
/// All counters are monotonically increasing over the node's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
    /// Messages sent, one per recipient (a broadcast counts once per neighbor).
    pub messages_sent: u64,
    /// RELINQUISH messages sent.
    pub relinquish_sent: u64,
    /// Number of times the node entered its critical section.
    pub cs_entries: u64,
    /// Rounds spent waiting before the most recent entry.
    pub last_wait_rounds: Option<u64>,
}

/// Mutual-exclusion state for a single node.
///
/// The node owns its vote: it is promised to at most one requester at a time
/// (`candidate`). Requests that cannot be granted wait in the deferred queue.
///
/// A requesting node competes for its own vote like any neighbor does. It
/// enters only while holding that vote and a YES from every neighbor, so two
/// adjacent nodes can never both be inside.
pub struct MutexState {
    /// This node's identity.
    id: NodeId,

    /// Ordered neighbor identities. Read-only.
    neighbors: Vec<NodeId>,

    /// Where we are in the CS cycle.
    state: NodeState,

    /// Logical clock; advanced once at the end of every round.
    clock: Timestamp,

    /// Current round, as announced by the runner.
    round: u64,

    /// The requester our vote is promised to, with its request timestamp.
    /// `Some` is the `hasVoted` flag. May be this node itself.
    candidate: Option<VoteRequest>,

    /// Whether we already sent INQ for the current promise.
    inquired: bool,

    /// Timestamp of our own outstanding request. Only set while waiting.
    request_ts: Option<Timestamp>,

    /// YES votes collected for the outstanding request.
    votes: usize,

    /// Round in which the outstanding request was issued.
    waiting_since: u64,

    /// Requests for our vote that could not be granted yet.
    deferred: DeferredQueue,

    /// Source for the per-round entry decision.
    entry_sampler: Box<dyn Sampler>,

    /// Source for the time spent in the critical section.
    dwell_sampler: Box<dyn Sampler>,

    /// Protocol parameters.
    config: MutexConfig,

    /// Observability counters.
    stats: NodeStats,
}

impl std::fmt::Debug for MutexState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutexState")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("candidate", &self.candidate)
            .field("inquired", &self.inquired)
            .field("request_ts", &self.request_ts)
            .field("votes", &self.votes)
            .field("deferred", &self.deferred.len())
            .finish_non_exhaustive()
    }
}

impl MutexState {
    /// Create a new node whose samplers are seeded from `seed` and the node id.
    pub fn new(id: NodeId, neighbors: Vec<NodeId>, config: MutexConfig, seed: u64) -> Self {
        let base = seed ^ u64::from(id.0).wrapping_mul(SEED_SPREAD);
        let entry = DistributionSampler::new(config.entry_distribution, base);
        let dwell = DistributionSampler::new(config.dwell_distribution, base.rotate_left(32));
        Self::with_samplers(id, neighbors, config, Box::new(entry), Box::new(dwell))
    }

    /// Create a new node with explicit sample sources.
    ///
    /// Only `entry_threshold` and `fallback_dwell_rounds` are read from
    /// `config`; the distributions are ignored.
    pub fn with_samplers(
        id: NodeId,
        mut neighbors: Vec<NodeId>,
        config: MutexConfig,
        entry_sampler: Box<dyn Sampler>,
        dwell_sampler: Box<dyn Sampler>,
    ) -> Self {
        neighbors.sort_unstable();
        neighbors.dedup();
        Self {
            id,
            neighbors,
            state: NodeState::NotInCs,
            clock: Timestamp::ZERO,
            round: 0,
            candidate: None,
            inquired: false,
            request_ts: None,
            votes: 0,
            waiting_since: 0,
            deferred: DeferredQueue::new(),
            entry_sampler,
            dwell_sampler,
            config,
            stats: NodeStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessors
    // ═══════════════════════════════════════════════════════════════════════════

    /// This node's identity.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Ordered neighbor identities.
    pub fn neighbors(&self) -> &[NodeId] {
        &self.neighbors
    }

    /// Current protocol state.
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Current logical clock.
    pub fn clock(&self) -> Timestamp {
        self.clock
    }

    /// YES votes collected for the outstanding request.
    pub fn votes(&self) -> usize {
        self.votes
    }

    /// Whether our vote is currently promised to someone.
    pub fn has_voted(&self) -> bool {
        self.candidate.is_some()
    }

    /// The requester our vote is promised to.
    pub fn candidate(&self) -> Option<VoteRequest> {
        self.candidate
    }

    /// Whether INQ was sent for the current promise.
    pub fn inquired(&self) -> bool {
        self.inquired
    }

    /// Timestamp of our outstanding request, while waiting.
    pub fn request_timestamp(&self) -> Option<Timestamp> {
        self.request_ts
    }

    /// Requests waiting for our vote.
    pub fn deferred(&self) -> &DeferredQueue {
        &self.deferred
    }

    /// Observability counters.
    pub fn stats(&self) -> NodeStats {
        self.stats
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Round lifecycle
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start of a round: an idle node samples whether it wants to enter.
    pub fn on_round_start(&mut self, round: u64) -> Vec<Action> {
        self.round = round;
        if self.state != NodeState::NotInCs || !self.wants_to_enter() {
            return vec![];
        }
        self.request_entry()
    }

    /// End of a round: advance the logical clock.
    pub fn on_round_end(&mut self) {
        self.clock = self.clock.next();
    }

    /// Move from idle to waiting and ask every neighbor for its vote.
    ///
    /// No-op unless the node is idle. A node without neighbors enters its
    /// critical section at once.
    pub fn request_entry(&mut self) -> Vec<Action> {
        if self.state != NodeState::NotInCs {
            return vec![];
        }

        let timestamp = self.clock;
        let own = VoteRequest::new(self.id, timestamp);
        self.state = NodeState::Waiting;
        self.request_ts = Some(timestamp);
        self.votes = 0;
        self.waiting_since = self.round;

        debug!(
            node = self.id.0,
            ts = timestamp.0,
            neighbors = self.neighbors.len(),
            "Requesting critical section"
        );

        let mut actions = vec![self.broadcast(ProtocolMessage::Request { timestamp })];
        match self.candidate {
            None => self.candidate = Some(own),
            Some(current) => {
                self.deferred.insert(own);
                actions.extend(self.inquire_if_outranked(own, current));
            }
        }
        actions.extend(self.try_enter());
        actions
    }

    /// Draw the entry decision. Sampling failure means "stay idle".
    fn wants_to_enter(&mut self) -> bool {
        match self.entry_sampler.sample() {
            Ok(value) => value <= self.config.entry_threshold,
            Err(e) => {
                warn!(node = self.id.0, error = %e, "Entry sampling failed, staying idle");
                false
            }
        }
    }

    /// Draw the dwell time in rounds. Sampling failure uses the fallback.
    fn dwell_rounds(&mut self) -> u64 {
        match self.dwell_sampler.sample() {
            Ok(value) if value.is_finite() && value >= 0.0 => (value.ceil() as u64).max(1),
            Ok(value) => {
                warn!(node = self.id.0, value, "Dwell sample out of range, using fallback");
                self.config.fallback_dwell_rounds.max(1)
            }
            Err(e) => {
                warn!(node = self.id.0, error = %e, "Dwell sampling failed, using fallback");
                self.config.fallback_dwell_rounds.max(1)
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Message handling
    // ═══════════════════════════════════════════════════════════════════════════

    /// Apply one inbox message.
    pub fn on_message(
        &mut self,
        from: NodeId,
        message: ProtocolMessage,
    ) -> Result<Vec<Action>, ProtocolError> {
        if self.neighbors.binary_search(&from).is_err() {
            return Err(ProtocolError::NotANeighbor(from));
        }

        match message {
            ProtocolMessage::Request { timestamp } => Ok(self.on_request(from, timestamp)),
            ProtocolMessage::Yes => self.on_yes(from),
            ProtocolMessage::Inquire { timestamp } => self.on_inquire(from, timestamp),
            ProtocolMessage::Relinquish { timestamp } => Ok(self.on_relinquish(from, timestamp)),
            ProtocolMessage::Release => Ok(self.on_release(from)),
        }
    }

    /// REQ: grant if our vote is free, otherwise defer and maybe inquire.
    fn on_request(&mut self, from: NodeId, timestamp: Timestamp) -> Vec<Action> {
        let request = VoteRequest::new(from, timestamp);

        let Some(current) = self.candidate else {
            debug!(node = self.id.0, to = from.0, ts = timestamp.0, "Granting vote");
            self.candidate = Some(request);
            return vec![self.send(from, ProtocolMessage::Yes)];
        };

        self.deferred.insert(request);
        debug!(
            node = self.id.0,
            from = from.0,
            ts = timestamp.0,
            candidate = current.requester.0,
            deferred = self.deferred.len(),
            "Deferring request"
        );

        if current.requester != self.id {
            return self.inquire_if_outranked(request, current);
        }

        // Our own vote is withdrawn locally, but never from inside the CS.
        if self.state != NodeState::Waiting || !request.has_priority_over(&current) {
            return vec![];
        }
        debug!(
            node = self.id.0,
            to = from.0,
            own_ts = current.timestamp.0,
            "Yielding own vote"
        );
        self.deferred.insert(current);
        self.cast_vote()
    }

    /// Send INQ to the current candidate, once, if `request` outranks it.
    fn inquire_if_outranked(&mut self, request: VoteRequest, current: VoteRequest) -> Vec<Action> {
        if self.inquired || !request.has_priority_over(&current) {
            return vec![];
        }

        self.inquired = true;
        debug!(
            node = self.id.0,
            candidate = current.requester.0,
            ts = current.timestamp.0,
            "Inquiring current candidate"
        );
        vec![self.send(
            current.requester,
            ProtocolMessage::Inquire {
                timestamp: current.timestamp,
            },
        )]
    }

    /// YES: count the vote, enter the CS once every neighbor has voted.
    fn on_yes(&mut self, from: NodeId) -> Result<Vec<Action>, ProtocolError> {
        if self.state != NodeState::Waiting {
            return Err(ProtocolError::UnexpectedVote {
                from,
                state: self.state,
            });
        }

        self.votes += 1;
        if self.votes > self.neighbors.len() {
            return Err(ProtocolError::VoteOverflow {
                votes: self.votes,
                neighbors: self.neighbors.len(),
            });
        }

        debug!(
            node = self.id.0,
            from = from.0,
            votes = self.votes,
            needed = self.neighbors.len(),
            "Vote received"
        );

        Ok(self.try_enter())
    }

    /// INQ: give back the vote `from` granted us, if it is for our current request.
    fn on_inquire(
        &mut self,
        from: NodeId,
        timestamp: Timestamp,
    ) -> Result<Vec<Action>, ProtocolError> {
        if self.state != NodeState::Waiting || self.request_ts != Some(timestamp) {
            debug!(
                node = self.id.0,
                from = from.0,
                ts = timestamp.0,
                state = %self.state,
                "Ignoring stale inquiry"
            );
            return Ok(vec![]);
        }

        if self.votes == 0 {
            return Err(ProtocolError::VoteUnderflow { to: from });
        }
        self.votes -= 1;
        self.stats.relinquish_sent += 1;

        debug!(
            node = self.id.0,
            to = from.0,
            ts = timestamp.0,
            votes = self.votes,
            "Relinquishing vote"
        );
        Ok(vec![self.send(from, ProtocolMessage::Relinquish { timestamp })])
    }

    /// RELINQUISH: re-queue the relinquishing node, then re-cast our vote.
    fn on_relinquish(&mut self, from: NodeId, timestamp: Timestamp) -> Vec<Action> {
        self.deferred.insert(VoteRequest::new(from, timestamp));
        self.cast_vote()
    }

    /// RELEASE: our vote is free; re-cast it.
    fn on_release(&mut self, from: NodeId) -> Vec<Action> {
        debug!(node = self.id.0, from = from.0, "Vote released");
        self.cast_vote()
    }

    /// Grant our vote to the highest-priority deferred request, or clear it.
    fn cast_vote(&mut self) -> Vec<Action> {
        self.inquired = false;
        match self.deferred.extract_min() {
            Some(next) if next.requester == self.id => {
                debug!(
                    node = self.id.0,
                    ts = next.timestamp.0,
                    "Casting vote for own request"
                );
                self.candidate = Some(next);
                self.try_enter()
            }
            Some(next) => {
                debug!(
                    node = self.id.0,
                    to = next.requester.0,
                    ts = next.timestamp.0,
                    remaining = self.deferred.len(),
                    "Granting vote to deferred request"
                );
                self.candidate = Some(next);
                vec![self.send(next.requester, ProtocolMessage::Yes)]
            }
            None => {
                self.candidate = None;
                vec![]
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Critical section
    // ═══════════════════════════════════════════════════════════════════════════

    /// Enter once waiting with our own vote and every neighbor's.
    fn try_enter(&mut self) -> Vec<Action> {
        let holds_own = self.candidate.is_some_and(|c| c.requester == self.id);
        if self.state == NodeState::Waiting && holds_own && self.votes == self.neighbors.len() {
            return self.enter_critical_section();
        }
        vec![]
    }

    fn enter_critical_section(&mut self) -> Vec<Action> {
        let waited = self.round.saturating_sub(self.waiting_since);
        self.state = NodeState::InCs;
        self.request_ts = None;
        self.stats.cs_entries += 1;
        self.stats.last_wait_rounds = Some(waited);

        let delay_rounds = self.dwell_rounds();
        info!(
            node = self.id.0,
            round = self.round,
            waited,
            dwell = delay_rounds,
            "Entered critical section"
        );

        vec![Action::SetTimer {
            id: TimerId::LeaveCriticalSection,
            delay_rounds,
        }]
    }

    /// Leave the critical section and free every vote we hold.
    pub fn on_timer(&mut self, id: TimerId) -> Result<Vec<Action>, ProtocolError> {
        match id {
            TimerId::LeaveCriticalSection => self.leave_critical_section(),
        }
    }

    fn leave_critical_section(&mut self) -> Result<Vec<Action>, ProtocolError> {
        if self.state != NodeState::InCs {
            return Err(ProtocolError::UnexpectedTimer { state: self.state });
        }

        self.state = NodeState::NotInCs;
        self.votes = 0;
        info!(node = self.id.0, round = self.round, "Left critical section");

        // Our own vote goes to whoever waited for it.
        let mut actions = vec![self.broadcast(ProtocolMessage::Release)];
        actions.extend(self.cast_vote());
        Ok(actions)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Outbound
    // ═══════════════════════════════════════════════════════════════════════════

    fn send(&mut self, to: NodeId, message: ProtocolMessage) -> Action {
        self.stats.messages_sent += 1;
        Action::Send { to, message }
    }

    fn broadcast(&mut self, message: ProtocolMessage) -> Action {
        self.stats.messages_sent += self.neighbors.len() as u64;
        Action::Broadcast { message }
    }
}

impl StateMachine for MutexState {
    fn handle(&mut self, event: Event) -> Result<Vec<Action>, ProtocolError> {
        match event {
            Event::RoundStart { round } => Ok(self.on_round_start(round)),
            Event::TimerFired { id } => self.on_timer(id),
            Event::MessageReceived { from, message } => self.on_message(from, message),
            Event::RoundEnd { .. } => {
                self.on_round_end();
                Ok(vec![])
            }
        }
    }

    fn round(&self) -> u64 {
        self.round
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SamplingError;
    use tracing_test::traced_test;

    fn fixed(value: f64) -> Box<dyn Sampler> {
        Box::new(move || -> Result<f64, SamplingError> { Ok(value) })
    }

    fn failing() -> Box<dyn Sampler> {
        Box::new(|| -> Result<f64, SamplingError> {
            Err(SamplingError::Unavailable("no distribution configured".into()))
        })
    }

    fn ids(raw: &[u32]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    /// A node that never wants to enter on its own and dwells 3 rounds.
    fn make_node(id: u32, neighbors: &[u32]) -> MutexState {
        MutexState::with_samplers(
            NodeId(id),
            ids(neighbors),
            MutexConfig::default(),
            fixed(1.0),
            fixed(3.0),
        )
    }

    fn req(ts: u64) -> ProtocolMessage {
        ProtocolMessage::Request {
            timestamp: Timestamp(ts),
        }
    }

    fn advance_clock(node: &mut MutexState, rounds: u64) {
        for _ in 0..rounds {
            node.on_round_end();
        }
    }

    #[traced_test]
    #[test]
    fn test_entry_broadcasts_request_with_clock() {
        let mut node = MutexState::with_samplers(
            NodeId(1),
            ids(&[2, 3]),
            MutexConfig::default(),
            fixed(0.0),
            fixed(3.0),
        );
        advance_clock(&mut node, 7);

        let actions = node.on_round_start(7);

        assert_eq!(node.state(), NodeState::Waiting);
        assert_eq!(node.request_timestamp(), Some(Timestamp(7)));
        assert_eq!(node.votes(), 0);
        assert_eq!(
            actions,
            vec![Action::Broadcast {
                message: req(7)
            }]
        );
        assert_eq!(node.stats().messages_sent, 2);
    }

    #[traced_test]
    #[test]
    fn test_threshold_blocks_entry() {
        let mut node = make_node(1, &[2]);
        assert!(node.on_round_start(0).is_empty());
        assert_eq!(node.state(), NodeState::NotInCs);
    }

    #[traced_test]
    #[test]
    fn test_entry_sampling_failure_stays_idle() {
        let mut node = MutexState::with_samplers(
            NodeId(1),
            ids(&[2]),
            MutexConfig::default(),
            failing(),
            fixed(3.0),
        );

        assert!(node.on_round_start(0).is_empty());
        assert_eq!(node.state(), NodeState::NotInCs);
        assert!(logs_contain("Entry sampling failed"));
    }

    #[traced_test]
    #[test]
    fn test_request_granted_when_vote_free() {
        let mut node = make_node(2, &[1, 3]);

        let actions = node.on_message(NodeId(1), req(10)).unwrap();

        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(1),
                message: ProtocolMessage::Yes
            }]
        );
        assert!(node.has_voted());
        assert_eq!(
            node.candidate(),
            Some(VoteRequest::new(NodeId(1), Timestamp(10)))
        );
        assert!(node.deferred().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_higher_priority_request_triggers_single_inquiry() {
        let mut node = make_node(2, &[1, 3, 4]);
        node.on_message(NodeId(1), req(10)).unwrap();

        let actions = node.on_message(NodeId(3), req(4)).unwrap();
        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(1),
                message: ProtocolMessage::Inquire {
                    timestamp: Timestamp(10)
                }
            }]
        );
        assert!(node.inquired());
        assert_eq!(node.deferred().len(), 1);

        // Even higher priority: queued, but no second inquiry.
        let actions = node.on_message(NodeId(4), req(2)).unwrap();
        assert!(actions.is_empty());
        assert_eq!(node.deferred().len(), 2);
    }

    #[traced_test]
    #[test]
    fn test_lower_priority_request_is_only_deferred() {
        let mut node = make_node(2, &[1, 3]);
        node.on_message(NodeId(1), req(4)).unwrap();

        // Same timestamp, higher id: lower priority.
        assert!(node.on_message(NodeId(3), req(4)).unwrap().is_empty());
        assert!(!node.inquired());
        assert_eq!(
            node.deferred().peek(),
            Some(&VoteRequest::new(NodeId(3), Timestamp(4)))
        );
    }

    #[traced_test]
    #[test]
    fn test_tie_on_timestamp_lower_id_inquires() {
        let mut node = make_node(5, &[3, 7]);
        node.on_message(NodeId(7), req(4)).unwrap();

        let actions = node.on_message(NodeId(3), req(4)).unwrap();
        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(7),
                message: ProtocolMessage::Inquire {
                    timestamp: Timestamp(4)
                }
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_all_votes_enter_critical_section() {
        let mut node = make_node(1, &[2, 3]);
        node.request_entry();

        assert!(node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap().is_empty());
        assert_eq!(node.state(), NodeState::Waiting);

        let actions = node.on_message(NodeId(3), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.state(), NodeState::InCs);
        assert_eq!(node.votes(), 2);
        assert_eq!(node.request_timestamp(), None);
        assert_eq!(
            actions,
            vec![Action::SetTimer {
                id: TimerId::LeaveCriticalSection,
                delay_rounds: 3
            }]
        );
        assert_eq!(node.stats().cs_entries, 1);
    }

    #[traced_test]
    #[test]
    fn test_dwell_sampling_failure_uses_fallback() {
        let mut node = MutexState::with_samplers(
            NodeId(1),
            ids(&[2]),
            MutexConfig::default().with_fallback_dwell_rounds(9),
            fixed(1.0),
            failing(),
        );
        node.request_entry();

        let actions = node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(
            actions,
            vec![Action::SetTimer {
                id: TimerId::LeaveCriticalSection,
                delay_rounds: 9
            }]
        );
        assert!(logs_contain("Dwell sampling failed"));
    }

    #[traced_test]
    #[test]
    fn test_fractional_dwell_rounds_up() {
        let mut node = MutexState::with_samplers(
            NodeId(1),
            ids(&[2]),
            MutexConfig::default(),
            fixed(1.0),
            fixed(0.2),
        );
        node.request_entry();
        let actions = node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(
            actions,
            vec![Action::SetTimer {
                id: TimerId::LeaveCriticalSection,
                delay_rounds: 1
            }]
        );
    }

    #[traced_test]
    #[test]
    fn test_inquiry_for_current_request_relinquishes() {
        let mut node = make_node(1, &[2, 3]);
        advance_clock(&mut node, 10);
        node.request_entry();
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();

        let actions = node
            .on_message(
                NodeId(2),
                ProtocolMessage::Inquire {
                    timestamp: Timestamp(10),
                },
            )
            .unwrap();

        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(2),
                message: ProtocolMessage::Relinquish {
                    timestamp: Timestamp(10)
                }
            }]
        );
        assert_eq!(node.votes(), 0);
        assert_eq!(node.state(), NodeState::Waiting);
        assert_eq!(node.stats().relinquish_sent, 1);
    }

    #[traced_test]
    #[test]
    fn test_stale_inquiry_is_ignored() {
        let mut node = make_node(1, &[2]);
        advance_clock(&mut node, 10);

        // Idle.
        let inquiry = ProtocolMessage::Inquire {
            timestamp: Timestamp(10),
        };
        assert!(node.on_message(NodeId(2), inquiry).unwrap().is_empty());

        // Waiting, but for a different timestamp.
        node.request_entry();
        let old = ProtocolMessage::Inquire {
            timestamp: Timestamp(3),
        };
        assert!(node.on_message(NodeId(2), old).unwrap().is_empty());

        // In the critical section.
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.state(), NodeState::InCs);
        assert!(node.on_message(NodeId(2), inquiry).unwrap().is_empty());
        assert_eq!(node.stats().relinquish_sent, 0);
    }

    #[traced_test]
    #[test]
    fn test_relinquish_requeues_and_grants_highest_priority() {
        // B = 2 voted for A = 1 at ts 10; C = 3 asks with ts 4.
        let mut b = make_node(2, &[1, 3]);
        b.on_message(NodeId(1), req(10)).unwrap();
        b.on_message(NodeId(3), req(4)).unwrap();

        let actions = b
            .on_message(
                NodeId(1),
                ProtocolMessage::Relinquish {
                    timestamp: Timestamp(10),
                },
            )
            .unwrap();

        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(3),
                message: ProtocolMessage::Yes
            }]
        );
        assert_eq!(
            b.candidate(),
            Some(VoteRequest::new(NodeId(3), Timestamp(4)))
        );
        assert!(!b.inquired());
        assert_eq!(
            b.deferred().peek(),
            Some(&VoteRequest::new(NodeId(1), Timestamp(10)))
        );
    }

    #[traced_test]
    #[test]
    fn test_release_grants_next_or_clears() {
        let mut node = make_node(2, &[1, 3]);
        node.on_message(NodeId(1), req(1)).unwrap();
        node.on_message(NodeId(3), req(5)).unwrap();

        let actions = node.on_message(NodeId(1), ProtocolMessage::Release).unwrap();
        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(3),
                message: ProtocolMessage::Yes
            }]
        );
        assert!(node.has_voted());

        assert!(node.on_message(NodeId(3), ProtocolMessage::Release).unwrap().is_empty());
        assert!(!node.has_voted());
        assert_eq!(node.candidate(), None);
    }

    #[traced_test]
    #[test]
    fn test_release_with_empty_queue_is_idempotent() {
        let mut node = make_node(2, &[1]);
        let before = node.stats();

        for _ in 0..3 {
            assert!(node.on_message(NodeId(1), ProtocolMessage::Release).unwrap().is_empty());
            assert!(!node.has_voted());
            assert!(!node.inquired());
        }
        assert_eq!(node.stats(), before);
    }

    #[traced_test]
    #[test]
    fn test_leave_broadcasts_release_and_resets_votes() {
        let mut node = make_node(1, &[2, 3]);
        node.request_entry();
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        node.on_message(NodeId(3), ProtocolMessage::Yes).unwrap();

        let actions = node.on_timer(TimerId::LeaveCriticalSection).unwrap();

        assert_eq!(
            actions,
            vec![Action::Broadcast {
                message: ProtocolMessage::Release
            }]
        );
        assert_eq!(node.state(), NodeState::NotInCs);
        assert_eq!(node.votes(), 0);
        // REQ x2 + RELEASE x2.
        assert_eq!(node.stats().messages_sent, 4);
    }

    #[traced_test]
    #[test]
    fn test_isolated_node_enters_immediately() {
        let mut node = make_node(1, &[]);
        let actions = node.request_entry();

        assert_eq!(node.state(), NodeState::InCs);
        assert!(actions.contains(&Action::SetTimer {
            id: TimerId::LeaveCriticalSection,
            delay_rounds: 3
        }));
    }

    #[traced_test]
    #[test]
    fn test_clock_advances_every_round() {
        let mut node = make_node(1, &[2]);
        for round in 0..5 {
            node.handle(Event::RoundStart { round }).unwrap();
            node.handle(Event::RoundEnd { round }).unwrap();
        }
        assert_eq!(node.clock(), Timestamp(5));
        assert_eq!(node.round(), 4);
    }

    #[traced_test]
    #[test]
    fn test_wait_rounds_recorded() {
        let mut node = make_node(1, &[2]);
        node.on_round_start(3);
        node.request_entry();
        node.on_round_start(8);
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.stats().last_wait_rounds, Some(5));
    }

    #[traced_test]
    #[test]
    fn test_protocol_violations() {
        let mut node = make_node(1, &[2]);

        assert_eq!(
            node.on_message(NodeId(2), ProtocolMessage::Yes),
            Err(ProtocolError::UnexpectedVote {
                from: NodeId(2),
                state: NodeState::NotInCs
            })
        );
        assert_eq!(
            node.on_timer(TimerId::LeaveCriticalSection),
            Err(ProtocolError::UnexpectedTimer {
                state: NodeState::NotInCs
            })
        );
        assert_eq!(
            node.on_message(NodeId(9), req(1)),
            Err(ProtocolError::NotANeighbor(NodeId(9)))
        );

        // A second YES from the only neighbor while in the CS.
        node.request_entry();
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert!(matches!(
            node.on_message(NodeId(2), ProtocolMessage::Yes),
            Err(ProtocolError::UnexpectedVote {
                state: NodeState::InCs,
                ..
            })
        ));
    }

    #[traced_test]
    #[test]
    fn test_relinquished_vote_is_regained() {
        let mut node = make_node(1, &[2, 3]);
        node.request_entry();
        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        node.on_message(
            NodeId(2),
            ProtocolMessage::Inquire {
                timestamp: Timestamp(0),
            },
        )
        .unwrap();
        assert_eq!(node.votes(), 0);

        node.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.votes(), 1);
        node.on_message(NodeId(3), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.state(), NodeState::InCs);
    }

    #[traced_test]
    #[test]
    fn test_requesting_node_holds_own_vote() {
        let mut node = make_node(2, &[1, 3]);
        node.request_entry();
        assert_eq!(
            node.candidate(),
            Some(VoteRequest::new(NodeId(2), Timestamp(0)))
        );

        // Same timestamp, higher id: deferred, no YES and no INQ.
        assert!(node.on_message(NodeId(3), req(0)).unwrap().is_empty());
        assert_eq!(
            node.deferred().peek(),
            Some(&VoteRequest::new(NodeId(3), Timestamp(0)))
        );
        assert_eq!(node.candidate().map(|c| c.requester), Some(NodeId(2)));
    }

    #[traced_test]
    #[test]
    fn test_simultaneous_neighbors_enter_one_at_a_time() {
        let mut a = make_node(1, &[2]);
        let mut b = make_node(2, &[1]);
        a.request_entry();
        b.request_entry();

        // A outranks B: A keeps its vote, B yields its own to A.
        assert!(a.on_message(NodeId(2), req(0)).unwrap().is_empty());
        let actions = b.on_message(NodeId(1), req(0)).unwrap();
        assert_eq!(
            actions,
            vec![Action::Send {
                to: NodeId(1),
                message: ProtocolMessage::Yes
            }]
        );
        assert_eq!(b.candidate().map(|c| c.requester), Some(NodeId(1)));

        a.on_message(NodeId(2), ProtocolMessage::Yes).unwrap();
        assert_eq!(a.state(), NodeState::InCs);
        assert_eq!(b.state(), NodeState::Waiting);

        // Leaving hands A's own vote to B along with the RELEASE.
        let actions = a.on_timer(TimerId::LeaveCriticalSection).unwrap();
        assert_eq!(
            actions,
            vec![
                Action::Broadcast {
                    message: ProtocolMessage::Release
                },
                Action::Send {
                    to: NodeId(2),
                    message: ProtocolMessage::Yes
                },
            ]
        );
        assert_eq!(a.candidate().map(|c| c.requester), Some(NodeId(2)));

        b.on_message(NodeId(1), ProtocolMessage::Release).unwrap();
        assert_eq!(b.state(), NodeState::Waiting);
        b.on_message(NodeId(1), ProtocolMessage::Yes).unwrap();
        assert_eq!(b.state(), NodeState::InCs);
    }

    #[traced_test]
    #[test]
    fn test_node_in_cs_defers_higher_priority_request() {
        let mut node = make_node(2, &[1, 3]);
        advance_clock(&mut node, 5);
        node.request_entry();
        node.on_message(NodeId(1), ProtocolMessage::Yes).unwrap();
        node.on_message(NodeId(3), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.state(), NodeState::InCs);

        assert!(node.on_message(NodeId(1), req(0)).unwrap().is_empty());
        assert_eq!(node.candidate().map(|c| c.requester), Some(NodeId(2)));
        assert!(!node.inquired());

        let actions = node.on_timer(TimerId::LeaveCriticalSection).unwrap();
        assert!(actions.contains(&Action::Send {
            to: NodeId(1),
            message: ProtocolMessage::Yes
        }));
    }

    #[traced_test]
    #[test]
    fn test_request_while_vote_promised_inquires_for_own() {
        let mut node = make_node(2, &[1, 3]);
        node.on_message(NodeId(3), req(5)).unwrap();

        let actions = node.request_entry();
        assert_eq!(
            actions,
            vec![
                Action::Broadcast { message: req(0) },
                Action::Send {
                    to: NodeId(3),
                    message: ProtocolMessage::Inquire {
                        timestamp: Timestamp(5)
                    }
                },
            ]
        );
        assert!(node.inquired());
        assert_eq!(
            node.deferred().peek(),
            Some(&VoteRequest::new(NodeId(2), Timestamp(0)))
        );

        // Node 3 gives the vote back; it is cast for our own request.
        node.on_message(NodeId(1), ProtocolMessage::Yes).unwrap();
        let actions = node
            .on_message(
                NodeId(3),
                ProtocolMessage::Relinquish {
                    timestamp: Timestamp(5),
                },
            )
            .unwrap();
        assert!(actions.is_empty());
        assert_eq!(node.candidate().map(|c| c.requester), Some(NodeId(2)));
        assert!(!node.inquired());
        assert_eq!(node.state(), NodeState::Waiting);

        let actions = node.on_message(NodeId(3), ProtocolMessage::Yes).unwrap();
        assert_eq!(node.state(), NodeState::InCs);
        assert!(matches!(
            actions.as_slice(),
            [Action::SetTimer {
                id: TimerId::LeaveCriticalSection,
                ..
            }]
        ));
    }

    #[traced_test]
    #[test]
    fn test_seeded_nodes_are_reproducible() {
        let config = MutexConfig::default().with_entry_threshold(0.5);
        let mut a = MutexState::new(NodeId(4), ids(&[1]), config.clone(), 99);
        let mut b = MutexState::new(NodeId(4), ids(&[1]), config, 99);

        for round in 0..20 {
            assert_eq!(a.on_round_start(round), b.on_round_start(round));
        }
        assert_eq!(a.state(), b.state());
    }
}
