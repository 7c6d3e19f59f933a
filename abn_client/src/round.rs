use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use abn::{
    resolve, CardInstance, CardType, CheckReady, Clash, CommitCard, Hand, InstanceId, Outcome,
    Rejection, ResolveRound, RoundResolution, Side,
};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::{MatchService, Phase, PlayError, ServiceError, SessionContext};

/// How often to ask the match service whether the opponent has committed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// The wait before the first poll after a commit.
    pub first_poll_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            first_poll_delay: Duration::from_secs(1),
        }
    }
}

/// Tears down a [`RoundCoordinator`] from the outside.
///
/// Cancelling is sticky: every pending and future wait of that coordinator
/// returns [`PlayError::Cancelled`].
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// How the service took a commit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CommitStatus {
    Accepted,
    /// The service already had a commitment for this round, most likely from
    /// an earlier attempt whose acknowledgement got lost.
    AlreadyCommitted,
}

/// A resolved round, seen from the local side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub local_card: CardType,
    pub opponent_card: CardType,
    pub local_outcome: Outcome,
    pub opponent_outcome: Outcome,
    /// The damage numbers, computed locally from the revealed cards.
    pub clash: Clash,
}

impl RoundReport {
    pub fn new(side: Side, resolution: &RoundResolution) -> Self {
        let local_card = resolution.card(side);
        let opponent_card = resolution.card(side.other());
        Self {
            local_card,
            opponent_card,
            local_outcome: resolution.outcome(side),
            opponent_outcome: resolution.outcome(side.other()),
            clash: resolve(local_card, opponent_card),
        }
    }
}

/// Drives a single round: commit, wait for the opponent, resolve.
///
/// There is one coordinator per round. It never resolves a round twice: once
/// a resolution came back, it is cached and handed out again.
pub struct RoundCoordinator {
    side: Side,
    poll: PollConfig,
    cancel: CancelHandle,
    cancelled: watch::Receiver<bool>,
    committed: Option<CardInstance>,
    opponent_preview: Option<CardType>,
    both_committed: Option<(CardType, CardType)>,
    report: Option<RoundReport>,
    polls: u32,
}

impl RoundCoordinator {
    pub fn new(side: Side, poll: PollConfig) -> Self {
        let (tx, cancelled) = watch::channel(false);
        Self {
            side,
            poll,
            cancel: CancelHandle { tx: Arc::new(tx) },
            cancelled,
            committed: None,
            opponent_preview: None,
            both_committed: None,
            report: None,
            polls: 0,
        }
    }

    /// Picks up a round whose commit already went through, e.g. after a reload.
    pub fn resume(side: Side, poll: PollConfig, committed: CardInstance) -> Self {
        let mut round = Self::new(side, poll);
        round.committed = Some(committed);
        round
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn committed(&self) -> Option<&CardInstance> {
        self.committed.as_ref()
    }

    /// The opponent's committed card, as soon as a poll has shown it.
    pub fn opponent_preview(&self) -> Option<CardType> {
        self.opponent_preview
    }

    pub fn report(&self) -> Option<&RoundReport> {
        self.report.as_ref()
    }

    /// How many polls were sent so far, failed ones included.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Commits the card `id` from `hand`.
    ///
    /// The card only leaves the hand once the service has taken it. On any
    /// error the hand is untouched and the commit can be retried.
    pub async fn commit<S: MatchService>(
        &mut self,
        service: &S,
        session: &SessionContext,
        hand: &mut Hand,
        id: InstanceId,
    ) -> Result<CommitStatus, PlayError> {
        if self.committed.is_some() {
            return Err(PlayError::WrongPhase {
                expected: Phase::Play,
                actual: Phase::Waiting,
            });
        }
        let card = *hand.get(id).ok_or(PlayError::CardNotInHand(id))?;
        let req = CommitCard {
            session_id: session.session_id.clone(),
            card: card.card_type,
        };
        let status = match self.guard(service.commit_card(&req)).await? {
            Ok(_) => CommitStatus::Accepted,
            Err(ServiceError::Rejected(Rejection::AlreadyCommitted)) => {
                warn!(card = %card.card_type, "The service already had a commitment for this round");
                CommitStatus::AlreadyCommitted
            }
            Err(err) => return Err(err.into()),
        };
        hand.remove(id);
        self.committed = Some(card);
        debug!(card = %card.card_type, instance = %card.id, "Committed");
        Ok(status)
    }

    /// Polls until both commitments are visible.
    ///
    /// Failed polls are logged and retried after the regular interval, for as
    /// long as it takes. Only cancellation stops the loop early.
    pub async fn rendezvous<S: MatchService>(
        &mut self,
        service: &S,
        session: &SessionContext,
    ) -> Result<(CardType, CardType), PlayError> {
        if let Some(both) = self.both_committed {
            return Ok(both);
        }
        if self.committed.is_none() {
            return Err(PlayError::NothingSelected);
        }
        let req = CheckReady {
            session_id: session.session_id.clone(),
            post_id: session.post_id,
        };
        let mut delay = self.poll.first_poll_delay;
        loop {
            self.guard(tokio::time::sleep(delay)).await?;
            delay = self.poll.interval;
            self.polls += 1;
            match self.guard(service.check_ready(&req)).await? {
                Ok(check) => {
                    if let Some(card) = check.commitment(self.side.other()) {
                        if self.opponent_preview != Some(card) {
                            info!(card = %card, "Opponent committed");
                        }
                        self.opponent_preview = Some(card);
                    }
                    if let Some(both) = check.both_committed() {
                        self.both_committed = Some(both);
                        return Ok(both);
                    }
                    trace!(poll = self.polls, "Still waiting for the opponent");
                }
                Err(err) => {
                    warn!(poll = self.polls, %err, "Polling failed, trying again");
                }
            }
        }
    }

    /// Asks the service to resolve the round, once both commitments are in.
    ///
    /// A failed resolve leaves the round unresolved; calling this again retries it.
    pub async fn resolve<S: MatchService>(
        &mut self,
        service: &S,
        session: &SessionContext,
    ) -> Result<RoundReport, PlayError> {
        if let Some(report) = &self.report {
            return Ok(report.clone());
        }
        let (card1, card2) = self.both_committed.ok_or(PlayError::WrongPhase {
            expected: Phase::Waiting,
            actual: Phase::Play,
        })?;
        let req = ResolveRound {
            session_id: session.session_id.clone(),
            card1,
            card2,
        };
        let resolution = self.guard(service.resolve_round(&req)).await??;
        let report = RoundReport::new(self.side, &resolution);
        if let Some(committed) = self.committed {
            if committed.card_type != report.local_card {
                warn!(
                    committed = %committed.card_type,
                    revealed = %report.local_card,
                    "The service revealed a different card than the one committed"
                );
            }
        }
        self.opponent_preview = Some(report.opponent_card);
        self.report = Some(report.clone());
        Ok(report)
    }

    /// Waits for the opponent and resolves the round.
    pub async fn run<S: MatchService>(
        &mut self,
        service: &S,
        session: &SessionContext,
    ) -> Result<RoundReport, PlayError> {
        self.rendezvous(service, session).await?;
        self.resolve(service, session).await
    }

    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, PlayError> {
        let mut cancelled = self.cancelled.clone();
        tokio::select! {
            biased;
            _ = cancelled.wait_for(|&c| c) => Err(PlayError::Cancelled),
            output = fut => Ok(output),
        }
    }
}
