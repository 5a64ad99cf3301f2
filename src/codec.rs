//! Locator codec
//!
//! A locator is one decimal digit per region, in the fixed region order.
//! Encoding always yields exactly `order.len()` digits. Decoding never fails:
//! missing, non-digit or out-of-range characters decode to `Unvisited` and
//! extra characters are ignored.

use tracing::debug;

use crate::level::LevelColor;
use crate::mapping::StateMapping;
use crate::regions::RegionOrder;

pub fn encode(mapping: &StateMapping, order: &RegionOrder) -> String {
    order
        .iter()
        .map(|region| char::from(b'0' + score_of(mapping.get(region))))
        .collect()
}

/// Decode a locator into a mapping with an entry for every region in `order`
pub fn decode(locator: &str, order: &RegionOrder) -> StateMapping {
    let mut digits = locator.chars();
    order
        .iter()
        .map(|region| {
            let color = match digits.next() {
                Some(ch) => decode_digit(ch).unwrap_or_else(|| {
                    debug!(region = %region, char = %ch, "Invalid locator character, using unvisited");
                    LevelColor::Unvisited
                }),
                None => LevelColor::Unvisited,
            };
            (region, color)
        })
        .collect()
}

fn decode_digit(ch: char) -> Option<LevelColor> {
    ch.to_digit(10)
        .and_then(|d| u8::try_from(d).ok())
        .and_then(LevelColor::from_score)
}

pub fn score_of(color: LevelColor) -> u8 {
    color.score()
}

/// Score of a storage color name; unknown names score 0
pub fn score_of_name(name: &str) -> u8 {
    LevelColor::from_storage_name(name).map_or(0, score_of)
}
