use serde::{Deserialize, Serialize};

use crate::CardType;

/// Why the match service refused a request.
///
/// Rejections are part of the protocol: they are sent back to the player
/// inside a [`Reply`](crate::Reply).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rejection {
    UnknownSession { session_id: String },
    NotAParticipant,
    /// The caller already has an unresolved commitment in the current round.
    AlreadyCommitted,
    CardNotAvailable { card: CardType },
    /// Resolution was requested before both commitments were in.
    RoundNotReady,
    /// The cards passed for resolution are not the ones that were committed.
    CardsMismatch {
        committed: [CardType; 2],
        requested: [CardType; 2],
    },
}

impl std::error::Error for Rejection {}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::UnknownSession { session_id } => {
                write!(f, "There is no game session with id '{}'", session_id)
            }
            Rejection::NotAParticipant => {
                write!(f, "The caller is not one of the two teams in this session")
            }
            Rejection::AlreadyCommitted => write!(
                f,
                "A card was already committed for this round and the round is not resolved yet"
            ),
            Rejection::CardNotAvailable { card } => {
                write!(f, "No {} card is left in the caller's hand", card)
            }
            Rejection::RoundNotReady => {
                write!(f, "Not both teams have committed a card in this round")
            }
            Rejection::CardsMismatch {
                committed,
                requested,
            } => write!(
                f,
                "Requested resolution of {} vs {}, but {} vs {} were committed",
                requested[0], requested[1], committed[0], committed[1]
            ),
        }
    }
}
