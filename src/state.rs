//! Session state: the canonical level mapping and its persistence
//!
//! `StateStore` is the only writer of the mapping. Every mutation rewrites
//! durable storage (best effort) and the share link's locator before
//! returning.

use tracing::{debug, info, warn};

use crate::codec;
use crate::level::LevelColor;
use crate::mapping::StateMapping;
use crate::persistence::{parse_mapping, serialize_mapping, DurableStorage};
use crate::regions::RegionOrder;
use crate::score::total_score;
use crate::share::ShareLink;

/// Where the initial mapping came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoredFrom {
    Locator,
    Storage,
    Empty,
}

pub struct StateStore {
    regions: RegionOrder,
    mapping: StateMapping,
    storage: Box<dyn DurableStorage>,
    link: ShareLink,
    restored_from: RestoredFrom,
}

impl StateStore {
    /// Restore state: a non-empty locator in `link` wins and durable storage
    /// is not read at all; otherwise storage is parsed, falling back to an
    /// empty mapping on any failure.
    pub fn init(regions: RegionOrder, storage: Box<dyn DurableStorage>, link: ShareLink) -> Self {
        let (mapping, restored_from) = match link.locator() {
            Some(locator) => {
                info!(locator = %locator, regions = regions.len(), "Restoring levels from share link");
                (codec::decode(locator, &regions), RestoredFrom::Locator)
            }
            None => Self::restore_from_storage(storage.as_ref()),
        };

        Self {
            regions,
            mapping,
            storage,
            link,
            restored_from,
        }
    }

    fn restore_from_storage(storage: &dyn DurableStorage) -> (StateMapping, RestoredFrom) {
        let contents = match storage.read() {
            Ok(Some(contents)) => contents,
            Ok(None) => {
                debug!("No stored levels, starting empty");
                return (StateMapping::new(), RestoredFrom::Empty);
            }
            Err(e) => {
                warn!(error = %e, "Failed to read durable storage, starting empty");
                return (StateMapping::new(), RestoredFrom::Empty);
            }
        };

        match parse_mapping(&contents) {
            Ok(mapping) => (mapping, RestoredFrom::Storage),
            Err(e) => {
                warn!(error = %e, "Stored levels are malformed, starting empty");
                (StateMapping::new(), RestoredFrom::Empty)
            }
        }
    }

    pub fn get_level(&self, region: &str) -> LevelColor {
        self.mapping.get(region)
    }

    pub fn set_level(&mut self, region: &str, color: LevelColor) {
        if !self.regions.contains(region) {
            debug!(region = %region, "Setting level for region outside the locator order");
        }
        info!(region = %region, level = ?color, "Setting level");
        self.mapping.set(region, color);
        self.persist();
    }

    /// Clear every level. Callers confirm with the user first.
    pub fn reset_all(&mut self) {
        info!(entries = self.mapping.len(), "Resetting all levels");
        self.mapping.clear();
        self.persist();
    }

    fn persist(&mut self) {
        match serialize_mapping(&self.mapping).and_then(|json| self.storage.write(&json)) {
            Ok(()) => debug!("Saved levels to durable storage"),
            Err(e) => warn!(error = %e, "Failed to save levels to durable storage"),
        }
        let locator = codec::encode(&self.mapping, &self.regions);
        self.link.replace_locator(&locator);
    }

    pub fn mapping(&self) -> &StateMapping {
        &self.mapping
    }

    pub fn regions(&self) -> &RegionOrder {
        &self.regions
    }

    pub fn restored_from(&self) -> RestoredFrom {
        self.restored_from
    }

    /// Locator for the current mapping
    pub fn locator(&self) -> String {
        codec::encode(&self.mapping, &self.regions)
    }

    pub fn total_score(&self) -> u32 {
        total_score(&self.mapping)
    }

    pub fn share_link(&self) -> &ShareLink {
        &self.link
    }

    /// Share link carrying the current locator, even before the first mutation
    pub fn shareable_link(&self) -> ShareLink {
        let mut link = self.link.clone();
        link.replace_locator(&self.locator());
        link
    }

    pub fn display_name(&self) -> Option<&str> {
        self.link.display_name()
    }

    pub fn set_display_name(&mut self, name: &str) {
        self.link.set_display_name(name);
        info!(name = ?self.link.display_name(), "Updated display name");
    }
}
