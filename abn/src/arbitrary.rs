use std::collections::BTreeMap;

use quickcheck::{Arbitrary, Gen};

use crate::{Allocation, CardType, ALL_CARD_TYPES};

/// An allocation as it might arrive from the wire: known and unknown keys,
/// English aliases, and the occasional non-positive quantity.
#[derive(Clone, Debug)]
pub struct WireAllocation(pub Allocation);

impl Arbitrary for WireAllocation {
    fn arbitrary(g: &mut Gen) -> Self {
        let keys = [
            "asam_kuat",
            "asam_lemah",
            "basa_kuat",
            "basa_lemah",
            "netral",
            "strong_acid",
            "weak_base",
            "garam",
            "",
        ];
        let mut raw = BTreeMap::new();
        for _ in 0..(u8::arbitrary(g) % 8) {
            let key = *g.choose(&keys).unwrap();
            let quantity = (u8::arbitrary(g) % 9) as i64 - 2;
            raw.insert(String::from(key), quantity);
        }
        WireAllocation(Allocation(raw))
    }
}

impl Arbitrary for CardType {
    fn arbitrary(g: &mut Gen) -> Self {
        *g.choose(&ALL_CARD_TYPES).unwrap()
    }
}
