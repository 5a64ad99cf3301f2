//! Aggregate score

use crate::codec::score_of;
use crate::mapping::StateMapping;

/// Sum of the scores of all present entries
pub fn total_score(mapping: &StateMapping) -> u32 {
    mapping.iter().map(|(_, color)| u32::from(score_of(color))).sum()
}
