use serde::{Deserialize, Serialize};

use crate::{Card, CardType};

/// The result of one round, from the point of view of one side.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "menang")]
    Win,
    #[serde(rename = "kalah")]
    Lose,
    #[serde(rename = "seri")]
    Draw,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "win"),
            Outcome::Lose => write!(f, "lose"),
            Outcome::Draw => write!(f, "draw"),
        }
    }
}

/// What happens when a local card meets an opponent card.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clash {
    pub outcome: Outcome,
    /// Damage dealt to the local side. Only non-zero on [`Outcome::Lose`].
    pub local_damage: u32,
    /// Damage dealt to the opponent. Only non-zero on [`Outcome::Win`].
    pub opponent_damage: u32,
    /// The local card's power after applying its effectiveness multiplier.
    pub local_power: f64,
    /// The opponent card's base power. The opponent's multiplier only applies
    /// when the clash is resolved from the opponent's side.
    pub opponent_power: f64,
}

/// Resolves a clash from the local side's perspective.
///
/// Only the local card's effectiveness is applied, so swapping the arguments
/// does not in general mirror the result.
pub fn resolve(local: CardType, opponent: CardType) -> Clash {
    let local_card = Card::of(local);
    let opponent_card = Card::of(opponent);

    let local_power = local_card.power as f64 * local_card.effectiveness_against(opponent);
    let opponent_power = opponent_card.power as f64;

    if local_power > opponent_power {
        Clash {
            outcome: Outcome::Win,
            local_damage: 0,
            opponent_damage: (local_power - opponent_power).ceil() as u32,
            local_power,
            opponent_power,
        }
    } else if local_power < opponent_power {
        Clash {
            outcome: Outcome::Lose,
            local_damage: (opponent_power - local_power).ceil() as u32,
            opponent_damage: 0,
            local_power,
            opponent_power,
        }
    } else {
        Clash {
            outcome: Outcome::Draw,
            local_damage: 0,
            opponent_damage: 0,
            local_power,
            opponent_power,
        }
    }
}

/// Resolves a round for both sides at once, each from its own perspective.
///
/// Returns the outcomes for side A and side B, in that order.
pub fn resolve_both(side_a: CardType, side_b: CardType) -> [Outcome; 2] {
    [
        resolve(side_a, side_b).outcome,
        resolve(side_b, side_a).outcome,
    ]
}

#[cfg(test)]
mod tests {
    use quickcheck::quickcheck;

    use super::*;
    use crate::ALL_CARD_TYPES;

    quickcheck! {
        fn resolve_is_pure(local: CardType, opponent: CardType) -> bool {
            resolve(local, opponent) == resolve(local, opponent)
        }

        fn damage_only_hits_the_loser(local: CardType, opponent: CardType) -> bool {
            let clash = resolve(local, opponent);
            match clash.outcome {
                Outcome::Win => clash.local_damage == 0 && clash.opponent_damage > 0,
                Outcome::Lose => clash.opponent_damage == 0 && clash.local_damage > 0,
                Outcome::Draw => clash.local_damage == 0 && clash.opponent_damage == 0,
            }
        }

        fn mirror_match_is_a_draw(card_type: CardType) -> bool {
            let clash = resolve(card_type, card_type);
            clash.outcome == Outcome::Draw
                && clash.local_damage == 0
                && clash.opponent_damage == 0
        }
    }

    #[test]
    fn strong_acid_beats_weak_base() {
        let clash = resolve(CardType::StrongAcid, CardType::WeakBase);
        assert_eq!(clash.outcome, Outcome::Win);
        assert!((clash.local_power - 9.6).abs() < 1e-9);
        assert_eq!(clash.opponent_power, 5.0);
        assert_eq!(clash.opponent_damage, 5);
        assert_eq!(clash.local_damage, 0);

        let other_side = resolve(CardType::WeakBase, CardType::StrongAcid);
        assert_eq!(other_side.outcome, Outcome::Lose);
        // 5 * 1.5 = 7.5 against 8
        assert_eq!(other_side.local_damage, 1);
        assert_eq!(
            resolve_both(CardType::StrongAcid, CardType::WeakBase),
            [Outcome::Win, Outcome::Lose]
        );
    }

    #[test]
    fn neutral_mirror_is_a_draw() {
        let clash = resolve(CardType::Neutral, CardType::Neutral);
        assert_eq!(clash.outcome, Outcome::Draw);
        assert_eq!(clash.local_power, 6.0);
        assert_eq!(
            resolve_both(CardType::Neutral, CardType::Neutral),
            [Outcome::Draw, Outcome::Draw]
        );
    }

    #[test]
    fn results_are_not_always_mirrored() {
        // Both strong cards are halved against each other, so each loses from its own side.
        assert_eq!(
            resolve_both(CardType::StrongAcid, CardType::StrongBase),
            [Outcome::Lose, Outcome::Lose]
        );

        let mut asymmetric_damage = false;
        for x in ALL_CARD_TYPES {
            for y in ALL_CARD_TYPES {
                let forward = resolve(x, y);
                let backward = resolve(y, x);
                if forward.opponent_damage != backward.local_damage {
                    asymmetric_damage = true;
                }
            }
        }
        assert!(asymmetric_damage);
    }

    #[test]
    fn outcome_wire_names() {
        assert_eq!(serde_json::to_string(&Outcome::Win).unwrap(), "\"menang\"");
        assert_eq!(serde_json::to_string(&Outcome::Lose).unwrap(), "\"kalah\"");
        assert_eq!(serde_json::to_string(&Outcome::Draw).unwrap(), "\"seri\"");
    }
}
