use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Allocation, DealtCards};

/// A team identifier as handed out by the match service.
///
/// Ids arrive either as JSON numbers or strings. They are compared strictly:
/// `3` and `"3"` are different teams.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamId {
    Number(i64),
    Text(String),
}

impl std::fmt::Display for TeamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamId::Number(num) => write!(f, "{}", num),
            TeamId::Text(text) => write!(f, "{}", text),
        }
    }
}

impl From<&str> for TeamId {
    fn from(text: &str) -> Self {
        TeamId::Text(String::from(text))
    }
}

impl From<i64> for TeamId {
    fn from(num: i64) -> Self {
        TeamId::Number(num)
    }
}

/// One of the two logical slots of a head-to-head match.
///
/// Side A is called `tim1` on the wire, side B `tim2`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    pub fn index(self) -> usize {
        match self {
            Side::A => 0,
            Side::B => 1,
        }
    }

    pub fn other(self) -> Side {
        match self {
            Side::A => Side::B,
            Side::B => Side::A,
        }
    }

    /// Picks whichever of the two per-side values belongs to this side.
    pub fn pick<T>(self, side_a: T, side_b: T) -> T {
        match self {
            Side::A => side_a,
            Side::B => side_b,
        }
    }
}

/// Whatever the player process knows about its own identity.
///
/// Both fields are optional because the surrounding application does not
/// always provide them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionHints {
    /// The local team id, if known.
    pub team_id: Option<TeamId>,
    /// The stored session payload, either a JSON object or a plain string.
    pub payload: Option<Value>,
}

/// The rules used to decide which side the local player is on.
///
/// They are tried in [`RESOLUTION_ORDER`]; the first one that applies wins.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResolutionRule {
    TeamIdIsSideA,
    TeamIdIsSideB,
    PayloadMentionsSideA,
    PayloadMentionsSideB,
    DefaultToSideA,
}

pub static RESOLUTION_ORDER: [ResolutionRule; 5] = [
    ResolutionRule::TeamIdIsSideA,
    ResolutionRule::TeamIdIsSideB,
    ResolutionRule::PayloadMentionsSideA,
    ResolutionRule::PayloadMentionsSideB,
    ResolutionRule::DefaultToSideA,
];

const SIDE_A_FIELDS: [&str; 2] = ["tim1", "team1"];
const SIDE_B_FIELDS: [&str; 2] = ["tim2", "team2"];

impl ResolutionRule {
    /// Returns the side this rule decides on, or `None` if it does not apply.
    pub fn apply(self, hints: &SessionHints, tim1: &TeamId, tim2: &TeamId) -> Option<Side> {
        match self {
            ResolutionRule::TeamIdIsSideA => {
                (hints.team_id.as_ref() == Some(tim1)).then_some(Side::A)
            }
            ResolutionRule::TeamIdIsSideB => {
                (hints.team_id.as_ref() == Some(tim2)).then_some(Side::B)
            }
            ResolutionRule::PayloadMentionsSideA => hints
                .payload
                .as_ref()
                .filter(|payload| mentions_any(payload, &SIDE_A_FIELDS))
                .map(|_| Side::A),
            ResolutionRule::PayloadMentionsSideB => hints
                .payload
                .as_ref()
                .filter(|payload| mentions_any(payload, &SIDE_B_FIELDS))
                .map(|_| Side::B),
            ResolutionRule::DefaultToSideA => Some(Side::A),
        }
    }
}

fn mentions_any(payload: &Value, names: &[&str]) -> bool {
    match payload {
        Value::Object(map) => names
            .iter()
            .any(|name| map.get(*name).is_some_and(is_truthy)),
        Value::String(text) => names.iter().any(|name| text.contains(name)),
        _ => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(num) => num.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Which side the local player is on, and which rule decided it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SideAssignment {
    pub side: Side,
    pub rule: ResolutionRule,
}

/// The local and opponent halves of a dealt payload.
#[derive(Clone, Debug, PartialEq)]
pub struct HandSplit<'a> {
    pub local_team: &'a TeamId,
    pub local: Option<&'a Allocation>,
    pub opponent: Option<&'a Allocation>,
}

/// Runs the resolution rules in order and returns the first match.
pub fn resolve_side(hints: &SessionHints, tim1: &TeamId, tim2: &TeamId) -> SideAssignment {
    RESOLUTION_ORDER
        .iter()
        .find_map(|&rule| {
            rule.apply(hints, tim1, tim2)
                .map(|side| SideAssignment { side, rule })
        })
        .unwrap_or(SideAssignment {
            side: Side::A,
            rule: ResolutionRule::DefaultToSideA,
        })
}

impl SideAssignment {
    pub fn split<'a>(&self, dealt: &'a DealtCards) -> HandSplit<'a> {
        HandSplit {
            local_team: self.side.pick(&dealt.tim1, &dealt.tim2),
            local: self.side.pick(dealt.card_tim1.as_ref(), dealt.card_tim2.as_ref()),
            opponent: self
                .side
                .other()
                .pick(dealt.card_tim1.as_ref(), dealt.card_tim2.as_ref()),
        }
    }
}
