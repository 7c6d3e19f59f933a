use abn::{
    build_hand, Allocation, CardInstance, CardType, DealHand, DealtCards, Hand, InstanceId,
    Outcome, Side, SideAssignment,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    CancelHandle, CommitStatus, MatchService, PlayError, PollConfig, RoundCoordinator,
    RoundReport, SessionContext, SessionSnapshot, SessionStore,
};

/// Where a session is in its lifecycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// The hand has not been dealt yet.
    Loading,
    /// A card can be selected and committed.
    Play,
    /// A card was committed, the opponent's is not known yet.
    Waiting,
    /// Both results are known. Waits for [`SessionController::continue_round`].
    Resolved,
    /// No more cards are accepted.
    Ended,
}

/// Rounds won per side.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub local: u32,
    pub opponent: u32,
}

pub const INITIAL_HEALTH: u32 = 100;

/// Only for display. Running out of health does not end a match.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub local: u32,
    pub opponent: u32,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            local: INITIAL_HEALTH,
            opponent: INITIAL_HEALTH,
        }
    }
}

/// Everything a player has to look at when choosing a card.
#[derive(Clone, Copy, Debug)]
pub struct TableView<'a> {
    pub side: Side,
    pub hand: &'a Hand,
    /// The opponent's cards as of the last deal. `None` if they have none left.
    pub opponent_remaining: Option<&'a Allocation>,
    pub score: Score,
    pub health: Health,
    pub rounds_played: u32,
}

/// Owns the local side of one match: hand, score and the current round.
///
/// Operations that don't fit the current [`Phase`] fail with
/// [`PlayError::WrongPhase`] without contacting the service.
pub struct SessionController<S, K> {
    service: S,
    store: K,
    context: SessionContext,
    poll: PollConfig,
    phase: Phase,
    assignment: Option<SideAssignment>,
    initial_deal: Option<DealtCards>,
    latest_deal: Option<DealtCards>,
    hand: Hand,
    selection: Option<InstanceId>,
    round: Option<RoundCoordinator>,
    last_report: Option<RoundReport>,
    score: Score,
    health: Health,
    rounds_played: u32,
    termination_unverified: bool,
}

impl<S: MatchService, K: SessionStore> SessionController<S, K> {
    pub fn new(service: S, store: K, context: SessionContext, poll: PollConfig) -> Self {
        Self {
            service,
            store,
            context,
            poll,
            phase: Phase::Loading,
            assignment: None,
            initial_deal: None,
            latest_deal: None,
            hand: Hand::default(),
            selection: None,
            round: None,
            last_report: None,
            score: Score::default(),
            health: Health::default(),
            rounds_played: 0,
            termination_unverified: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn poll_config(&self) -> PollConfig {
        self.poll
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn hand(&self) -> &Hand {
        &self.hand
    }

    pub fn score(&self) -> Score {
        self.score
    }

    pub fn health(&self) -> Health {
        self.health
    }

    pub fn rounds_played(&self) -> u32 {
        self.rounds_played
    }

    pub fn side(&self) -> Option<Side> {
        self.assignment.map(|assignment| assignment.side)
    }

    /// The staged card, waiting for confirmation.
    pub fn selection(&self) -> Option<&CardInstance> {
        self.selection.and_then(|id| self.hand.get(id))
    }

    /// The opponent's card of the current round, once it is known.
    pub fn opponent_preview(&self) -> Option<CardType> {
        self.round.as_ref().and_then(RoundCoordinator::opponent_preview)
    }

    pub fn last_report(&self) -> Option<&RoundReport> {
        self.last_report.as_ref()
    }

    pub fn opponent_remaining(&self) -> Option<&Allocation> {
        let assignment = self.assignment.as_ref()?;
        assignment.split(self.latest_deal.as_ref()?).opponent
    }

    /// True if the last check for remaining cards failed and the session
    /// carried on without knowing whether the match is over.
    pub fn termination_unverified(&self) -> bool {
        self.termination_unverified
    }

    pub fn cancel_handle(&self) -> Option<CancelHandle> {
        self.round.as_ref().map(RoundCoordinator::cancel_handle)
    }

    pub fn table_view(&self) -> TableView<'_> {
        TableView {
            side: self.side().unwrap_or(Side::A),
            hand: &self.hand,
            opponent_remaining: self.opponent_remaining(),
            score: self.score,
            health: self.health,
            rounds_played: self.rounds_played,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.context.session_id.clone(),
            phase: self.phase,
            score: self.score,
            health: self.health,
            rounds_played: self.rounds_played,
            hand: self.hand.clone(),
            committed: self
                .round
                .as_ref()
                .and_then(|round| round.committed().copied()),
            last_report: self.last_report.clone(),
        }
    }

    /// Fetches the hand and decides the local side.
    ///
    /// Progress stored for this session is picked up again, including a
    /// round that was committed but not resolved.
    pub async fn load(&mut self) -> Result<Phase, PlayError> {
        self.expect_phase(Phase::Loading)?;
        let dealt = self.service.deal_hand(&self.deal_request()).await?;
        let assignment = abn::resolve_side(&self.context.hints, &dealt.tim1, &dealt.tim2);
        let split = assignment.split(&dealt);
        info!(
            side = ?assignment.side,
            rule = ?assignment.rule,
            team = %split.local_team,
            "Resolved the local side"
        );
        self.hand = split.local.map(build_hand).unwrap_or_default();
        self.assignment = Some(assignment);
        self.initial_deal = Some(dealt.clone());
        self.latest_deal = Some(dealt);
        self.phase = if self.hand.is_empty() {
            Phase::Ended
        } else {
            Phase::Play
        };
        self.restore();
        self.persist();
        debug!(phase = ?self.phase, cards = self.hand.len(), "Loaded");
        Ok(self.phase)
    }

    /// Stages a card for the next commit.
    pub fn select(&mut self, id: InstanceId) -> Result<&CardInstance, PlayError> {
        self.expect_phase(Phase::Play)?;
        if self.hand.is_empty() {
            return Err(PlayError::EmptyHand);
        }
        let card = self.hand.get(id).ok_or(PlayError::CardNotInHand(id))?;
        self.selection = Some(id);
        Ok(card)
    }

    pub fn cancel_selection(&mut self) {
        self.selection = None;
    }

    /// Commits the staged card.
    ///
    /// The selection is cleared whether this succeeds or not. On failure the
    /// session stays in [`Phase::Play`] with the card still in the hand.
    pub async fn confirm(&mut self) -> Result<CommitStatus, PlayError> {
        self.expect_phase(Phase::Play)?;
        let id = self.selection.take().ok_or(PlayError::NothingSelected)?;
        let mut round = RoundCoordinator::new(self.side().unwrap_or(Side::A), self.poll);
        match round
            .commit(&self.service, &self.context, &mut self.hand, id)
            .await
        {
            Ok(status) => {
                self.round = Some(round);
                self.phase = Phase::Waiting;
                self.persist();
                Ok(status)
            }
            Err(err) => {
                warn!(%err, "Commit failed");
                Err(err)
            }
        }
    }

    /// Waits for the opponent, resolves the round and books the result.
    pub async fn await_round(&mut self) -> Result<RoundReport, PlayError> {
        self.expect_phase(Phase::Waiting)?;
        let round = self.round.as_mut().ok_or(PlayError::WrongPhase {
            expected: Phase::Waiting,
            actual: Phase::Play,
        })?;
        let report = match round.run(&self.service, &self.context).await {
            Ok(report) => report,
            Err(err) => {
                if err.is_retryable() {
                    warn!(%err, "Resolving the round failed");
                }
                return Err(err);
            }
        };

        if report.local_outcome == Outcome::Win {
            self.score.local += 1;
        }
        if report.opponent_outcome == Outcome::Win {
            self.score.opponent += 1;
        }
        self.health.local = self.health.local.saturating_sub(report.clash.local_damage);
        self.health.opponent = self
            .health
            .opponent
            .saturating_sub(report.clash.opponent_damage);
        self.rounds_played += 1;
        info!(
            round = self.rounds_played,
            local = %report.local_card,
            opponent = %report.opponent_card,
            outcome = %report.local_outcome,
            "Round resolved"
        );
        self.last_report = Some(report.clone());
        self.phase = Phase::Resolved;
        self.persist();
        Ok(report)
    }

    /// Leaves a resolved round, to the next one or to the end of the match.
    pub async fn continue_round(&mut self) -> Result<Phase, PlayError> {
        self.expect_phase(Phase::Resolved)?;
        self.round = None;
        self.selection = None;
        self.last_report = None;
        self.phase = self.recheck_remaining().await;
        self.persist();
        Ok(self.phase)
    }

    /// Asks the service again whether the match is over.
    ///
    /// Meant for when the local hand ran empty in [`Phase::Play`], which on
    /// its own does not end the match.
    pub async fn refresh(&mut self) -> Result<Phase, PlayError> {
        self.expect_phase(Phase::Play)?;
        self.phase = self.recheck_remaining().await;
        self.persist();
        Ok(self.phase)
    }

    /// Starts over from the hand dealt at load time, without asking the service.
    ///
    /// Score, health and round count are reset.
    pub fn restart(&mut self) {
        self.teardown_round();
        self.selection = None;
        self.last_report = None;
        self.score = Score::default();
        self.health = Health::default();
        self.rounds_played = 0;
        self.termination_unverified = false;
        self.latest_deal = self.initial_deal.clone();
        self.hand = match (&self.assignment, &self.initial_deal) {
            (Some(assignment), Some(dealt)) => assignment
                .split(dealt)
                .local
                .map(build_hand)
                .unwrap_or_default(),
            _ => Hand::default(),
        };
        self.phase = if self.hand.is_empty() {
            Phase::Loading
        } else {
            Phase::Play
        };
        info!(phase = ?self.phase, cards = self.hand.len(), "Restarted");
        self.persist();
    }

    /// Drops everything this session knows, including what was persisted.
    pub fn exit(&mut self) -> Result<(), PlayError> {
        self.teardown_round();
        self.selection = None;
        self.last_report = None;
        self.hand = Hand::default();
        self.initial_deal = None;
        self.latest_deal = None;
        self.score = Score::default();
        self.health = Health::default();
        self.rounds_played = 0;
        self.termination_unverified = false;
        self.phase = Phase::Ended;
        self.store
            .remove(&self.context.session_id)
            .map_err(PlayError::Store)
    }

    fn deal_request(&self) -> DealHand {
        DealHand {
            session_id: self.context.session_id.clone(),
            post_id: self.context.post_id,
        }
    }

    fn expect_phase(&self, expected: Phase) -> Result<(), PlayError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(PlayError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn teardown_round(&mut self) {
        if let Some(round) = self.round.take() {
            round.cancel_handle().cancel();
        }
    }

    /// Decides between [`Phase::Play`] and [`Phase::Ended`] from a fresh deal.
    ///
    /// If the deal fails the session carries on in [`Phase::Play`] and the
    /// next check gets another chance to end it.
    async fn recheck_remaining(&mut self) -> Phase {
        let dealt = match self.service.deal_hand(&self.deal_request()).await {
            Ok(dealt) => dealt,
            Err(err) => {
                warn!(
                    %err,
                    "Could not check the remaining cards; continuing without knowing whether the match is over"
                );
                self.termination_unverified = true;
                return Phase::Play;
            }
        };
        self.termination_unverified = false;
        let local_remaining = self
            .assignment
            .as_ref()
            .and_then(|assignment| assignment.split(&dealt).local)
            .map_or(0, Allocation::total);
        if local_remaining as usize != self.hand.len() {
            warn!(
                service = local_remaining,
                local = self.hand.len(),
                "The local hand disagrees with the service"
            );
        }
        let ended = dealt.is_exhausted() || local_remaining == 0;
        self.latest_deal = Some(dealt);
        if ended {
            info!(rounds = self.rounds_played, "No cards left, the match is over");
            Phase::Ended
        } else {
            Phase::Play
        }
    }

    fn restore(&mut self) {
        let snapshot = match self.store.load(&self.context.session_id) {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return,
            Err(err) => {
                warn!(%err, "Could not read the stored session");
                return;
            }
        };
        self.score = snapshot.score;
        self.health = snapshot.health;
        self.rounds_played = snapshot.rounds_played;
        let side = self.side().unwrap_or(Side::A);
        match (snapshot.phase, snapshot.committed, snapshot.last_report) {
            (Phase::Resolved, _, Some(report)) => {
                self.last_report = Some(report);
                self.phase = Phase::Resolved;
            }
            (Phase::Waiting, Some(committed), _) => {
                self.round = Some(RoundCoordinator::resume(side, self.poll, committed));
                self.phase = Phase::Waiting;
            }
            _ => {}
        }
        info!(
            phase = ?self.phase,
            rounds = self.rounds_played,
            "Picked up a stored session"
        );
    }

    fn persist(&self) {
        if let Err(err) = self.store.save(&self.snapshot()) {
            warn!(%err, "Could not store the session");
        }
    }
}
