use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The five kinds of combat card.
///
/// On the wire each type is identified by its Indonesian id (`asam_kuat`, ...).
/// The English snake-case names are accepted as aliases when parsing.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CardType {
    #[serde(rename = "asam_kuat", alias = "strong_acid")]
    StrongAcid,
    #[serde(rename = "asam_lemah", alias = "weak_acid")]
    WeakAcid,
    #[serde(rename = "basa_kuat", alias = "strong_base")]
    StrongBase,
    #[serde(rename = "basa_lemah", alias = "weak_base")]
    WeakBase,
    #[serde(rename = "netral", alias = "neutral")]
    Neutral,
}

pub static ALL_CARD_TYPES: [CardType; 5] = [
    CardType::StrongAcid,
    CardType::WeakAcid,
    CardType::StrongBase,
    CardType::WeakBase,
    CardType::Neutral,
];

/// The static stats of a card type.
///
/// Cards are immutable values; two cards of the same type are interchangeable
/// for combat purposes. Hands distinguish them by instance id instead, see
/// [`CardInstance`](crate::CardInstance).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Card {
    pub card_type: CardType,
    pub power: u32,
    /// Multiplier applied to `power` when matched against the given type.
    /// Types that are not listed default to 1.0.
    effectiveness: &'static [(CardType, f64)],
}

static STRONG_ACID: Card = Card {
    card_type: CardType::StrongAcid,
    power: 8,
    effectiveness: &[
        (CardType::WeakAcid, 1.5),
        (CardType::StrongBase, 0.5),
        (CardType::WeakBase, 1.2),
        (CardType::Neutral, 1.0),
    ],
};

static WEAK_ACID: Card = Card {
    card_type: CardType::WeakAcid,
    power: 5,
    effectiveness: &[
        (CardType::StrongAcid, 0.7),
        (CardType::StrongBase, 0.3),
        (CardType::WeakBase, 1.5),
        (CardType::Neutral, 1.0),
    ],
};

static STRONG_BASE: Card = Card {
    card_type: CardType::StrongBase,
    power: 8,
    effectiveness: &[
        (CardType::StrongAcid, 0.5),
        (CardType::WeakAcid, 1.5),
        (CardType::WeakBase, 1.2),
        (CardType::Neutral, 1.0),
    ],
};

static WEAK_BASE: Card = Card {
    card_type: CardType::WeakBase,
    power: 5,
    effectiveness: &[
        (CardType::StrongAcid, 1.5),
        (CardType::WeakAcid, 0.3),
        (CardType::StrongBase, 0.7),
        (CardType::Neutral, 1.0),
    ],
};

static NEUTRAL: Card = Card {
    card_type: CardType::Neutral,
    power: 6,
    effectiveness: &[
        (CardType::StrongAcid, 1.0),
        (CardType::WeakAcid, 1.0),
        (CardType::StrongBase, 1.0),
        (CardType::WeakBase, 1.0),
    ],
};

impl Card {
    pub fn of(card_type: CardType) -> Card {
        match card_type {
            CardType::StrongAcid => STRONG_ACID,
            CardType::WeakAcid => WEAK_ACID,
            CardType::StrongBase => STRONG_BASE,
            CardType::WeakBase => WEAK_BASE,
            CardType::Neutral => NEUTRAL,
        }
    }

    pub fn effectiveness_against(&self, opponent: CardType) -> f64 {
        self.effectiveness
            .iter()
            .find(|(card_type, _)| *card_type == opponent)
            .map(|&(_, multiplier)| multiplier)
            .unwrap_or(1.0)
    }
}

impl CardType {
    /// The id used in the wire protocol.
    pub fn wire_id(self) -> &'static str {
        match self {
            CardType::StrongAcid => "asam_kuat",
            CardType::WeakAcid => "asam_lemah",
            CardType::StrongBase => "basa_kuat",
            CardType::WeakBase => "basa_lemah",
            CardType::Neutral => "netral",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            CardType::StrongAcid => "Asam Kuat",
            CardType::WeakAcid => "Asam Lemah",
            CardType::StrongBase => "Basa Kuat",
            CardType::WeakBase => "Basa Lemah",
            CardType::Neutral => "Netral",
        }
    }

    fn english_id(self) -> &'static str {
        match self {
            CardType::StrongAcid => "strong_acid",
            CardType::WeakAcid => "weak_acid",
            CardType::StrongBase => "strong_base",
            CardType::WeakBase => "weak_base",
            CardType::Neutral => "neutral",
        }
    }

    pub fn card(self) -> Card {
        Card::of(self)
    }
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// The error type for the [`FromStr`] instance of [`CardType`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCardType(pub String);

impl std::error::Error for UnknownCardType {}

impl std::fmt::Display for UnknownCardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "'{}' is not a known card type", self.0)
    }
}

impl FromStr for CardType {
    type Err = UnknownCardType;

    /// Only exact wire ids and English ids match.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_CARD_TYPES
            .iter()
            .copied()
            .find(|card_type| card_type.wire_id() == s || card_type.english_id() == s)
            .ok_or_else(|| UnknownCardType(String::from(s)))
    }
}
