use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::CardType;

/// The most cards of one type an allocation entry counts for.
///
/// Larger quantities from the wire are capped to this.
pub const MAX_QUANTITY: u32 = 1000;

/// A quantity per card type, as dealt by the match service.
///
/// Keys are kept as the raw strings from the wire so that a payload with an
/// unknown card type still deserializes. Unknown keys and non-positive
/// quantities are ignored by every accessor and by [`build_hand`], and
/// quantities above [`MAX_QUANTITY`] count as that much.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Allocation(pub BTreeMap<String, i64>);

impl Allocation {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style helper, mostly for configs and tests.
    #[must_use]
    pub fn with(mut self, card_type: CardType, quantity: u32) -> Self {
        let entry = self.0.entry(String::from(card_type.wire_id())).or_insert(0);
        *entry = entry.saturating_add(i64::from(quantity));
        self
    }

    /// The known card types with a positive quantity, in key order.
    pub fn known(&self) -> impl Iterator<Item = (CardType, u32)> + '_ {
        self.0.iter().filter_map(|(key, &quantity)| {
            let card_type = key.parse::<CardType>().ok()?;
            let quantity = quantity.clamp(0, i64::from(MAX_QUANTITY)) as u32;
            (quantity > 0).then_some((card_type, quantity))
        })
    }

    pub fn quantity(&self, card_type: CardType) -> u32 {
        self.known()
            .filter(|&(t, _)| t == card_type)
            .fold(0, |sum, (_, quantity)| sum.saturating_add(quantity))
    }

    pub fn total(&self) -> u32 {
        self.known()
            .fold(0, |sum, (_, quantity)| sum.saturating_add(quantity))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Takes one unit of `card_type` out of the allocation.
    ///
    /// Returns `false` if there was none left.
    pub fn remove_one(&mut self, card_type: CardType) -> bool {
        let key = self.0.iter().find_map(|(key, &quantity)| {
            (quantity > 0 && key.parse::<CardType>() == Ok(card_type)).then(|| key.clone())
        });
        match key.and_then(|key| self.0.get_mut(&key)) {
            Some(quantity) => {
                *quantity -= 1;
                true
            }
            None => false,
        }
    }
}

/// Distinguishes otherwise identical cards within one hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card_{}", self.0)
    }
}

/// One playable card in a hand.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: InstanceId,
    pub card_type: CardType,
}

/// The ordered cards owned by one side.
///
/// Cards only ever leave a hand; nothing in this crate puts a removed card back.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hand {
    cards: Vec<CardInstance>,
}

/// Turns an allocation into one card instance per unit of quantity.
///
/// Instance ids are assigned sequentially from zero, in allocation order.
pub fn build_hand(allocation: &Allocation) -> Hand {
    let mut cards = Vec::new();
    let mut next_id = 0;
    for (card_type, quantity) in allocation.known() {
        for _ in 0..quantity {
            cards.push(CardInstance {
                id: InstanceId(next_id),
                card_type,
            });
            next_id += 1;
        }
    }
    Hand { cards }
}

impl Hand {
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CardInstance> {
        self.cards.iter()
    }

    pub fn get(&self, id: InstanceId) -> Option<&CardInstance> {
        self.cards.iter().find(|card| card.id == id)
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.get(id).is_some()
    }

    /// Removes a card for good.
    pub fn remove(&mut self, id: InstanceId) -> Option<CardInstance> {
        let idx = self.cards.iter().position(|card| card.id == id)?;
        Some(self.cards.remove(idx))
    }
}

impl<'a> IntoIterator for &'a Hand {
    type Item = &'a CardInstance;
    type IntoIter = std::slice::Iter<'a, CardInstance>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use quickcheck::quickcheck;

    use super::*;
    use crate::arbitrary::WireAllocation;
    use crate::DealtCards;

    quickcheck! {
        fn hand_size_matches_known_quantities(input: WireAllocation) -> bool {
            let allocation = input.0;
            let expected: i64 = allocation
                .0
                .iter()
                .filter(|(key, _)| key.parse::<CardType>().is_ok())
                .map(|(_, &quantity)| quantity.max(0))
                .sum();
            build_hand(&allocation).len() as i64 == expected
        }

        fn instance_ids_are_unique(input: WireAllocation) -> bool {
            let hand = build_hand(&input.0);
            let ids: BTreeSet<InstanceId> = hand.iter().map(|card| card.id).collect();
            ids.len() == hand.len()
        }

        fn removed_cards_stay_removed(input: WireAllocation, picks: Vec<u8>) -> bool {
            let mut hand = build_hand(&input.0);
            let mut removed = Vec::new();
            for pick in picks {
                if hand.is_empty() {
                    break;
                }
                let before = hand.len();
                let id = hand.iter().nth(pick as usize % before).map(|card| card.id);
                if let Some(card) = id.and_then(|id| hand.remove(id)) {
                    removed.push(card.id);
                }
                if hand.len() != before - 1 {
                    return false;
                }
            }
            removed.iter().all(|&id| !hand.contains(id))
        }
    }

    #[test]
    fn unknown_types_are_skipped() {
        let mut raw = BTreeMap::new();
        raw.insert(String::from("asam_kuat"), 2);
        raw.insert(String::from("garam"), 3);
        raw.insert(String::from("netral"), -1);
        raw.insert(String::from("basa_lemah"), 1);
        let hand = build_hand(&Allocation(raw));

        let types: Vec<CardType> = hand.iter().map(|card| card.card_type).collect();
        assert_eq!(
            types,
            vec![CardType::StrongAcid, CardType::StrongAcid, CardType::WeakBase]
        );
        let ids: Vec<String> = hand.iter().map(|card| card.id.to_string()).collect();
        assert_eq!(ids, vec!["card_0", "card_1", "card_2"]);
    }

    #[test]
    fn empty_allocation_gives_empty_hand() {
        assert!(build_hand(&Allocation::new()).is_empty());
    }

    #[test]
    fn remove_one() {
        let mut allocation = Allocation::new()
            .with(CardType::Neutral, 1)
            .with(CardType::WeakAcid, 2);
        assert!(allocation.remove_one(CardType::WeakAcid));
        assert!(allocation.remove_one(CardType::Neutral));
        assert!(!allocation.remove_one(CardType::Neutral));
        assert_eq!(allocation.quantity(CardType::WeakAcid), 1);
        assert_eq!(allocation.total(), 1);
        assert_eq!(build_hand(&allocation).len(), 1);
    }

    #[test]
    fn oversized_quantities_are_capped() {
        let dealt: DealtCards = serde_json::from_str(
            r#"{
                "tim1": 1,
                "tim2": 2,
                "card_tim1": {"asam_kuat": 3000000000, "asam_lemah": 3000000000},
                "card_tim2": {"netral": 9223372036854775807, "neutral": 9223372036854775807}
            }"#,
        )
        .unwrap();
        assert!(!dealt.is_exhausted());

        let tim1 = dealt.card_tim1.unwrap();
        assert_eq!(tim1.quantity(CardType::StrongAcid), MAX_QUANTITY);
        assert_eq!(tim1.total(), 2 * MAX_QUANTITY);
        let tim2 = dealt.card_tim2.unwrap();
        assert_eq!(tim2.quantity(CardType::Neutral), 2 * MAX_QUANTITY);
        assert_eq!(build_hand(&tim2).len(), 2 * MAX_QUANTITY as usize);

        let mut grown = tim2.with(CardType::Neutral, u32::MAX);
        assert_eq!(grown.0["netral"], i64::MAX);
        assert!(grown.remove_one(CardType::Neutral));
        assert_eq!(grown.total(), 2 * MAX_QUANTITY);
    }
}
