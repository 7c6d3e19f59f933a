use serde::{Deserialize, Serialize};

use crate::{Allocation, CardType, Outcome, Rejection, Side, TeamId};

/// A request from a player to the match service.
///
/// The caller's identity is not part of the request. It is implied by the
/// connection the request arrives on.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Ask for the remaining cards of both teams.
    ///
    /// The reply data is a [`DealtCards`].
    DealHand(DealHand),
    /// Commit one card for the current round.
    ///
    /// The reply data is an [`Okay`].
    CommitCard(CommitCard),
    /// Ask which commitments of the current round are in.
    ///
    /// The reply data is a [`ReadyCheck`].
    CheckReady(CheckReady),
    /// Resolve the current round once both commitments are in.
    ///
    /// The reply data is a [`RoundResolution`]. Asking again for the same
    /// round returns the same resolution.
    ResolveRound(ResolveRound),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealHand {
    #[serde(rename = "game_session_id")]
    pub session_id: String,
    #[serde(rename = "penpos_id", default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitCard {
    #[serde(rename = "game_session_id")]
    pub session_id: String,
    pub card: CardType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReady {
    #[serde(rename = "game_session_id")]
    pub session_id: String,
    #[serde(rename = "penpos_id", default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveRound {
    #[serde(rename = "game_session_id")]
    pub session_id: String,
    /// Side A's committed card.
    pub card1: CardType,
    /// Side B's committed card.
    pub card2: CardType,
}

/// Dummy struct for use in player communication.
///
/// Used to signal an acknowledgement without data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Okay();

/// The remaining cards of both teams.
///
/// A team with no cards left has `None` instead of an empty map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DealtCards {
    pub tim1: TeamId,
    pub tim2: TeamId,
    #[serde(default)]
    pub card_tim1: Option<Allocation>,
    #[serde(default)]
    pub card_tim2: Option<Allocation>,
}

impl DealtCards {
    /// True if neither team has a card left.
    pub fn is_exhausted(&self) -> bool {
        self.card_tim1.as_ref().map_or(true, Allocation::is_empty)
            && self.card_tim2.as_ref().map_or(true, Allocation::is_empty)
    }
}

/// The state of the current round as seen by the caller.
///
/// Each commitment is only present once that team has committed, and the
/// results only once the round has been resolved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadyCheck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tim1: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tim2: Option<TeamId>,
    #[serde(default)]
    pub card_tim1: Option<CardType>,
    #[serde(default)]
    pub card_tim2: Option<CardType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result1: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result2: Option<Outcome>,
}

impl ReadyCheck {
    pub fn commitment(&self, side: Side) -> Option<CardType> {
        side.pick(self.card_tim1, self.card_tim2)
    }

    /// Both committed cards, side A first, once both are in.
    pub fn both_committed(&self) -> Option<(CardType, CardType)> {
        Some((self.card_tim1?, self.card_tim2?))
    }
}

/// The resolved outcome of a round, for both teams.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundResolution {
    pub tim1: TeamId,
    pub tim2: TeamId,
    pub card_tim1: CardType,
    pub card_tim2: CardType,
    pub result1: Outcome,
    pub result2: Outcome,
}

impl RoundResolution {
    pub fn outcome(&self, side: Side) -> Outcome {
        side.pick(self.result1, self.result2)
    }

    pub fn card(&self, side: Side) -> CardType {
        side.pick(self.card_tim1, self.card_tim2)
    }
}

/// The envelope every reply from the match service is wrapped in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection: Option<Rejection>,
}

impl<T> Reply<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            rejection: None,
        }
    }

    pub fn rejected(rejection: Rejection) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(rejection.to_string()),
            rejection: Some(rejection),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            rejection: None,
        }
    }
}

impl<T> From<Result<T, Rejection>> for Reply<T> {
    fn from(result: Result<T, Rejection>) -> Self {
        match result {
            Ok(data) => Reply::ok(data),
            Err(rejection) => Reply::rejected(rejection),
        }
    }
}
