//! Snapshot export
//!
//! Pipeline: recolor the map SVG (pure) → rasterize on the blocking pool
//! (the only suspension point) → composite title, legend and watermark
//! (pure) → encode PNG (pure). Any stage failing aborts the export; no
//! partial image is returned.

pub mod compose;
pub mod font;
pub mod raster;
pub mod svg;

pub use compose::Layout;
pub use font::FontRenderer;
pub use raster::{Rasterizer, ResvgRasterizer};

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::constants::text::{FILE_PREFIX, TITLE_OWNER_SUFFIX, TITLE_PREFIX};
use crate::mapping::StateMapping;
use crate::regions::RegionMap;

/// Everything one export reads; nothing here is mutated
#[derive(Debug, Clone, Copy)]
pub struct SnapshotRequest<'a> {
    pub mapping: &'a StateMapping,
    pub map: &'a RegionMap,
    pub display_name: Option<&'a str>,
    pub score: u32,
}

/// Encoded export result
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub file_name: String,
    pub score: u32,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Snapshot {
    /// Write the PNG into `dir` under its file name
    pub fn save_in(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;
        let path = dir.join(&self.file_name);
        fs::write(&path, &self.png)
            .with_context(|| format!("Failed to write snapshot to {}", path.display()))?;
        info!(path = %path.display(), bytes = self.png.len(), "Saved snapshot");
        Ok(path)
    }
}

/// Header title: `"<name> 的制沪等级 <score>"` or `"制沪等级 <score>"`
pub fn title(display_name: Option<&str>, score: u32) -> String {
    match display_name.map(str::trim).filter(|n| !n.is_empty()) {
        Some(name) => format!("{name}{TITLE_OWNER_SUFFIX}{TITLE_PREFIX} {score}"),
        None => format!("{TITLE_PREFIX} {score}"),
    }
}

pub fn file_name(score: u32) -> String {
    format!("{FILE_PREFIX}{score}.png")
}

pub struct SnapshotRenderer {
    rasterizer: Arc<dyn Rasterizer>,
    font: Option<FontRenderer>,
    layout: Layout,
}

impl SnapshotRenderer {
    pub fn new(rasterizer: Arc<dyn Rasterizer>, font: Option<FontRenderer>, layout: Layout) -> Self {
        Self {
            rasterizer,
            font,
            layout,
        }
    }

    pub async fn render(&self, request: SnapshotRequest<'_>) -> Result<Snapshot> {
        let Layout { map_width, map_height, .. } = self.layout;

        let source = svg::prepare(request.map, request.mapping, map_width, map_height)
            .context("Failed to prepare map for export")?;

        let rasterizer = Arc::clone(&self.rasterizer);
        let map = tokio::task::spawn_blocking(move || rasterizer.rasterize(&source, map_width, map_height))
            .await
            .context("Rasterization task did not complete")?
            .context("Failed to rasterize map")?;

        let title = title(request.display_name, request.score);
        let canvas = compose::compose(&map, &title, self.font.as_ref(), &self.layout)?;
        let png = compose::encode_png(&canvas)?;

        info!(score = request.score, title = %title, bytes = png.len(), "Rendered snapshot");
        Ok(Snapshot {
            file_name: file_name(request.score),
            score: request.score,
            width: canvas.width(),
            height: canvas.height(),
            png,
        })
    }
}
