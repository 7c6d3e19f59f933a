use std::collections::HashMap;

use abn::{
    resolve_both, Allocation, CardType, CheckReady, CommitCard, DealHand, DealtCards, Okay,
    Outcome, ReadyCheck, Rejection, Reply, Request, ResolveRound, RoundResolution, Side, TeamId,
};
use tracing::{debug, info};

/// The rendezvous point for both players of every running match.
///
/// All requests for one session are serialized by whoever owns the table.
/// Which team is calling is not part of a request; the caller passes it in.
#[derive(Default)]
pub struct MatchTable {
    sessions: HashMap<String, MatchState>,
}

struct MatchState {
    post_id: Option<u32>,
    teams: [TeamId; 2],
    remaining: [Allocation; 2],
    /// Number of cards each side has committed so far.
    commits: [usize; 2],
    rounds: Vec<Round>,
    scores: [u32; 2],
}

#[derive(Clone, Debug, Default)]
struct Round {
    cards: [Option<CardType>; 2],
    results: Option<[Outcome; 2]>,
}

/// The state of a session at a glance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Standings {
    pub post_id: Option<u32>,
    pub teams: [TeamId; 2],
    /// Rounds won, per side.
    pub scores: [u32; 2],
    pub rounds_resolved: usize,
    /// Cards left, per side.
    pub remaining: [u32; 2],
}

impl MatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a match between `teams[0]` (side A) and `teams[1]` (side B).
    ///
    /// Unknown card types in the hands are dropped.
    pub fn open_session(
        &mut self,
        session_id: &str,
        post_id: Option<u32>,
        teams: [TeamId; 2],
        hands: [&Allocation; 2],
    ) -> anyhow::Result<()> {
        if self.sessions.contains_key(session_id) {
            anyhow::bail!("Session '{}' is already open", session_id);
        }
        if teams[0] == teams[1] {
            anyhow::bail!("Both sides of session '{}' are team {}", session_id, teams[0]);
        }
        let normalize = |hand: &Allocation| {
            hand.known()
                .fold(Allocation::new(), |acc, (card_type, quantity)| {
                    acc.with(card_type, quantity)
                })
        };
        info!(session_id, tim1 = %teams[0], tim2 = %teams[1], "Opening session");
        self.sessions.insert(
            String::from(session_id),
            MatchState {
                post_id,
                teams,
                remaining: [normalize(hands[0]), normalize(hands[1])],
                commits: [0, 0],
                rounds: Vec::new(),
                scores: [0, 0],
            },
        );
        Ok(())
    }

    pub fn close_session(&mut self, session_id: &str) -> Option<Standings> {
        self.sessions
            .remove(session_id)
            .map(|state| state.standings())
    }

    pub fn standings(&self, session_id: &str) -> Option<Standings> {
        self.sessions.get(session_id).map(MatchState::standings)
    }

    pub fn deal_hand(&self, caller: &TeamId, req: &DealHand) -> Result<DealtCards, Rejection> {
        let (state, _) = self.participant(&req.session_id, caller)?;
        let remaining = |side: Side| {
            Some(state.remaining[side.index()].clone()).filter(|hand| !hand.is_empty())
        };
        Ok(DealtCards {
            tim1: state.teams[0].clone(),
            tim2: state.teams[1].clone(),
            card_tim1: remaining(Side::A),
            card_tim2: remaining(Side::B),
        })
    }

    /// Records the caller's card for its next round.
    ///
    /// A side can only move on to the next round once its current one is resolved.
    pub fn commit_card(&mut self, caller: &TeamId, req: &CommitCard) -> Result<Okay, Rejection> {
        let (state, side) = self.participant_mut(&req.session_id, caller)?;
        let idx = side.index();
        if let Some(current) = state.current_round(side) {
            if current.results.is_none() {
                return Err(Rejection::AlreadyCommitted);
            }
        }
        if !state.remaining[idx].remove_one(req.card) {
            return Err(Rejection::CardNotAvailable { card: req.card });
        }
        let round_idx = state.commits[idx];
        state.commits[idx] += 1;
        if state.rounds.len() <= round_idx {
            state.rounds.resize_with(round_idx + 1, Round::default);
        }
        state.rounds[round_idx].cards[idx] = Some(req.card);
        debug!(session_id = req.session_id, team = %caller, card = %req.card, round = round_idx, "Commit");
        Ok(Okay())
    }

    /// The caller's current round: the one of its latest commit.
    pub fn check_ready(&self, caller: &TeamId, req: &CheckReady) -> Result<ReadyCheck, Rejection> {
        let (state, side) = self.participant(&req.session_id, caller)?;
        let mut check = ReadyCheck {
            tim1: Some(state.teams[0].clone()),
            tim2: Some(state.teams[1].clone()),
            ..ReadyCheck::default()
        };
        if let Some(round) = state.current_round(side) {
            check.card_tim1 = round.cards[0];
            check.card_tim2 = round.cards[1];
            check.result1 = round.results.map(|results| results[0]);
            check.result2 = round.results.map(|results| results[1]);
        }
        Ok(check)
    }

    /// Resolves the caller's current round.
    ///
    /// Only the first call computes the results and updates the scores.
    /// Every later call for the same round returns the same resolution.
    pub fn resolve_round(
        &mut self,
        caller: &TeamId,
        req: &ResolveRound,
    ) -> Result<RoundResolution, Rejection> {
        let (state, side) = self.participant_mut(&req.session_id, caller)?;
        let round_idx = state.commits[side.index()]
            .checked_sub(1)
            .ok_or(Rejection::RoundNotReady)?;
        let round = &mut state.rounds[round_idx];
        let [Some(card1), Some(card2)] = round.cards else {
            return Err(Rejection::RoundNotReady);
        };
        if (card1, card2) != (req.card1, req.card2) {
            return Err(Rejection::CardsMismatch {
                committed: [card1, card2],
                requested: [req.card1, req.card2],
            });
        }
        let results = match round.results {
            Some(results) => results,
            None => {
                let results = resolve_both(card1, card2);
                round.results = Some(results);
                for (score, result) in state.scores.iter_mut().zip(results) {
                    if result == Outcome::Win {
                        *score += 1;
                    }
                }
                info!(
                    session_id = req.session_id,
                    round = round_idx,
                    %card1,
                    %card2,
                    result1 = %results[0],
                    result2 = %results[1],
                    "Round resolved"
                );
                results
            }
        };
        Ok(RoundResolution {
            tim1: state.teams[0].clone(),
            tim2: state.teams[1].clone(),
            card_tim1: card1,
            card_tim2: card2,
            result1: results[0],
            result2: results[1],
        })
    }

    /// Answers one request line from `caller` with one reply line.
    pub fn respond(&mut self, caller: &TeamId, line: &str) -> serde_json::Result<String> {
        let req = match serde_json::from_str::<Request>(line) {
            Ok(req) => req,
            Err(err) => {
                return serde_json::to_string(&Reply::<Okay>::failed(format!(
                    "Malformed request: {}",
                    err
                )))
            }
        };
        match req {
            Request::DealHand(req) => {
                serde_json::to_string(&Reply::from(self.deal_hand(caller, &req)))
            }
            Request::CommitCard(req) => {
                serde_json::to_string(&Reply::from(self.commit_card(caller, &req)))
            }
            Request::CheckReady(req) => {
                serde_json::to_string(&Reply::from(self.check_ready(caller, &req)))
            }
            Request::ResolveRound(req) => {
                serde_json::to_string(&Reply::from(self.resolve_round(caller, &req)))
            }
        }
    }

    fn participant(&self, session_id: &str, caller: &TeamId) -> Result<(&MatchState, Side), Rejection> {
        let state = self
            .sessions
            .get(session_id)
            .ok_or_else(|| Rejection::UnknownSession {
                session_id: String::from(session_id),
            })?;
        let side = state.side_of(caller)?;
        Ok((state, side))
    }

    fn participant_mut(
        &mut self,
        session_id: &str,
        caller: &TeamId,
    ) -> Result<(&mut MatchState, Side), Rejection> {
        let state = self
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| Rejection::UnknownSession {
                session_id: String::from(session_id),
            })?;
        let side = state.side_of(caller)?;
        Ok((state, side))
    }
}

impl MatchState {
    fn side_of(&self, caller: &TeamId) -> Result<Side, Rejection> {
        if *caller == self.teams[0] {
            Ok(Side::A)
        } else if *caller == self.teams[1] {
            Ok(Side::B)
        } else {
            Err(Rejection::NotAParticipant)
        }
    }

    fn current_round(&self, side: Side) -> Option<&Round> {
        let round_idx = self.commits[side.index()].checked_sub(1)?;
        self.rounds.get(round_idx)
    }

    fn standings(&self) -> Standings {
        Standings {
            post_id: self.post_id,
            teams: self.teams.clone(),
            scores: self.scores,
            rounds_resolved: self
                .rounds
                .iter()
                .filter(|round| round.results.is_some())
                .count(),
            remaining: [self.remaining[0].total(), self.remaining[1].total()],
        }
    }
}
