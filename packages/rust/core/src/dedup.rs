//! Work-level deduplication.
//!
//! Unlike the resolver this is not interval based: sentences have
//! independent offset spaces, so records are compared by exact
//! `(place_name, sentence)` equality.

use std::collections::HashMap;

use chimei_shared::ResolvedPlace;

/// Collapse records sharing `(place_name, sentence)` to the highest-confidence
/// one. Ties keep the first occurrence. Survivors stay at the position of the
/// first record of their key.
pub fn dedup_work(places: Vec<ResolvedPlace>) -> Vec<ResolvedPlace> {
    let mut slots: HashMap<(String, String), usize> = HashMap::new();
    let mut kept: Vec<ResolvedPlace> = Vec::with_capacity(places.len());

    for place in places {
        let key = (place.place_name.clone(), place.sentence.clone());
        match slots.get(&key) {
            Some(&slot) => {
                if place.confidence.get() > kept[slot].confidence.get() {
                    kept[slot] = place;
                }
            }
            None => {
                slots.insert(key, kept.len());
                kept.push(place);
            }
        }
    }

    kept
}
