#![forbid(unsafe_code)]

//! ShanghaiEx (制沪等级): rate every district of Shanghai by how well you
//! know it, share the result as a link and export it as an image.

pub mod cli;
pub mod codec;
pub mod config;
pub mod constants;
pub mod level;
pub mod mapping;
pub mod persistence;
pub mod regions;
pub mod score;
pub mod share;
pub mod snapshot;
pub mod state;

pub use level::LevelColor;
pub use mapping::StateMapping;
pub use regions::{RegionMap, RegionOrder};
pub use share::ShareLink;
pub use snapshot::{Snapshot, SnapshotRenderer, SnapshotRequest};
pub use state::StateStore;
