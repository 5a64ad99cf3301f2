//! Raster stage: SVG text → pixmap of a fixed size

use anyhow::{Context, Result};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{fontdb, Options, Tree};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns a self-contained SVG document into pixels.
/// Runs on the blocking pool, so implementations must be thread-safe.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Pixmap>;
}

/// resvg-backed rasterizer
#[derive(Clone)]
pub struct ResvgRasterizer {
    fontdb: Arc<fontdb::Database>,
}

/// Families with Chinese coverage, tried in order for generic label fonts
const CJK_FAMILIES: [&str; 8] = [
    "Noto Sans CJK SC",
    "Source Han Sans SC",
    "WenQuanYi Micro Hei",
    "WenQuanYi Zen Hei",
    "PingFang SC",
    "Microsoft YaHei",
    "SimHei",
    "Noto Sans SC",
];

impl ResvgRasterizer {
    /// Rasterizer with system fonts plus an optional extra font file for labels.
    /// Generic `sans-serif`/`serif` resolve to the extra font's family, else to
    /// an installed CJK family, else to any installed family.
    pub fn new(extra_font: Option<&Path>) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        let extra = extra_font.and_then(|path| load_extra_font(&mut db, path));

        match generic_family(&db, extra) {
            Some(family) => {
                debug!(family = %family, "Using font family for generic map labels");
                db.set_sans_serif_family(family.clone());
                db.set_serif_family(family);
            }
            None => warn!("No fonts available for map rendering, district labels will be omitted"),
        }

        debug!(faces = db.len(), "Loaded font database for map rendering");
        Self { fontdb: Arc::new(db) }
    }
}

fn load_extra_font(db: &mut fontdb::Database, path: &Path) -> Option<fontdb::ID> {
    let ids = db.load_font_source(fontdb::Source::File(path.to_path_buf()));
    if ids.is_empty() {
        warn!(path = %path.display(), "Failed to load label font for map rendering");
    }
    ids.first().copied()
}

fn family_of(face: &fontdb::FaceInfo) -> Option<String> {
    face.families.first().map(|(name, _)| name.clone())
}

/// Family to use for generic font names
fn generic_family(db: &fontdb::Database, preferred: Option<fontdb::ID>) -> Option<String> {
    if let Some(family) = preferred.and_then(|id| db.face(id)).and_then(family_of) {
        return Some(family);
    }

    CJK_FAMILIES
        .iter()
        .find_map(|cjk| {
            db.faces()
                .find(|face| face.families.iter().any(|(name, _)| name == cjk))
                .and_then(family_of)
        })
        .or_else(|| db.faces().find_map(family_of))
}

impl Rasterizer for ResvgRasterizer {
    fn rasterize(&self, svg: &str, width: u32, height: u32) -> Result<Pixmap> {
        let options = Options {
            fontdb: Arc::clone(&self.fontdb),
            ..Options::default()
        };

        let tree = Tree::from_str(svg, &options).context("Failed to parse recolored map SVG")?;

        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow::anyhow!("Invalid raster size {}x{}", width, height))?;

        let size = tree.size();
        let transform = Transform::from_scale(
            width as f32 / size.width(),
            height as f32 / size.height(),
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        Ok(pixmap)
    }
}
