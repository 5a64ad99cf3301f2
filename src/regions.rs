//! Region enumeration order and the map SVG that defines region shapes

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::map::DISTRICT_CLASS;

/// Shanghai's districts in the fixed order used when no map is supplied
pub const SHANGHAI_DISTRICTS: [&str; 16] = [
    "黄浦区", "徐汇区", "长宁区", "静安区", "普陀区", "虹口区", "杨浦区", "闵行区",
    "宝山区", "嘉定区", "浦东新区", "金山区", "松江区", "青浦区", "奉贤区", "崇明区",
];

/// Fixed, stable enumeration order of regions.
/// Locator position `i` always refers to `ids[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionOrder {
    ids: Vec<String>,
}

impl RegionOrder {
    /// Build an order from ids; later duplicates are dropped
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for id in ids {
            let id = id.into();
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self { ids: unique }
    }

    pub fn shanghai() -> Self {
        Self::new(SHANGHAI_DISTRICTS)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, region: &str) -> bool {
        self.ids.iter().any(|id| id == region)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

/// Map document: SVG source text plus the region order found in it
#[derive(Debug, Clone)]
pub struct RegionMap {
    svg: String,
    order: RegionOrder,
}

impl RegionMap {
    pub fn load(path: &Path) -> Result<Self> {
        let svg = fs::read_to_string(path)
            .with_context(|| format!("Failed to read map SVG: {}", path.display()))?;
        let map = Self::from_svg(svg)
            .with_context(|| format!("Invalid map SVG: {}", path.display()))?;
        info!(path = %path.display(), regions = map.order.len(), "Loaded region map");
        Ok(map)
    }

    /// Parse the SVG and collect ids of `district` elements in document order
    pub fn from_svg(svg: impl Into<String>) -> Result<Self> {
        let svg = svg.into();
        let mut reader = Reader::from_str(&svg);
        let mut ids = Vec::new();

        loop {
            match reader.read_event().context("Failed to parse map SVG")? {
                Event::Start(e) | Event::Empty(e) => {
                    if is_district(&e)? {
                        match attribute(&e, b"id")? {
                            Some(id) if !id.is_empty() => ids.push(id),
                            _ => debug!("Skipping district element without id"),
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        let order = RegionOrder::new(ids);
        if order.is_empty() {
            return Err(anyhow::anyhow!(
                "Map SVG contains no elements with class '{}'",
                DISTRICT_CLASS
            ));
        }
        Ok(Self { svg, order })
    }

    pub fn svg(&self) -> &str {
        &self.svg
    }

    pub fn order(&self) -> &RegionOrder {
        &self.order
    }
}

/// Whether the element's `class` attribute contains the district token
pub(crate) fn is_district(e: &BytesStart<'_>) -> Result<bool> {
    Ok(attribute(e, b"class")?
        .map(|class| class.split_whitespace().any(|token| token == DISTRICT_CLASS))
        .unwrap_or(false))
}

/// Unescaped value of an attribute, if present
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.context("Malformed attribute in map SVG")?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .context("Malformed attribute value in map SVG")?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
