//! Region → level mapping

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::level::LevelColor;

/// Mapping from region id to its visit level.
/// Absent regions read as `LevelColor::Unvisited`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateMapping {
    levels: BTreeMap<String, LevelColor>,
}

impl StateMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, region: &str) -> LevelColor {
        self.levels.get(region).copied().unwrap_or_default()
    }

    /// Whether the region has an entry (explicit `Unvisited` counts)
    pub fn contains(&self, region: &str) -> bool {
        self.levels.contains_key(region)
    }

    pub(crate) fn set(&mut self, region: &str, color: LevelColor) {
        self.levels.insert(region.to_string(), color);
    }

    pub(crate) fn clear(&mut self) {
        self.levels.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LevelColor)> {
        self.levels.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, LevelColor)> for StateMapping {
    fn from_iter<I: IntoIterator<Item = (S, LevelColor)>>(iter: I) -> Self {
        Self {
            levels: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
