//! Vector stage: recolor the map SVG with the current levels
//!
//! Produces a self-contained SVG document: every district gets an inline
//! fill/stroke, label styling is embedded as a `<style>` element and the root
//! carries the target pixel size.

use anyhow::{Context, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::constants::map::{DISTRICT_STROKE, LABEL_STYLE};
use crate::level::LevelColor;
use crate::mapping::StateMapping;
use crate::regions::{attribute, is_district, RegionMap};

const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Inline style for a district: its level fill plus the fixed stroke
pub fn district_style(color: LevelColor) -> String {
    format!("fill: {}; {}", color.hex(), DISTRICT_STROKE)
}

pub fn prepare(map: &RegionMap, mapping: &StateMapping, width: u32, height: u32) -> Result<String> {
    let mut reader = Reader::from_str(map.svg());
    let mut writer = Writer::new(Vec::new());
    let mut root_seen = false;

    loop {
        let event = reader.read_event().context("Failed to parse map SVG")?;
        match event {
            Event::Start(e) => {
                if !root_seen {
                    root_seen = true;
                    writer.write_event(Event::Start(root_element(&e, width, height)?))?;
                    write_style(&mut writer)?;
                } else if is_district(&e)? {
                    writer.write_event(Event::Start(district_element(&e, mapping)?))?;
                } else {
                    writer.write_event(Event::Start(e))?;
                }
            }
            Event::Empty(e) => {
                if !root_seen {
                    // Self-closing root: expand it so the style element fits
                    root_seen = true;
                    let root = root_element(&e, width, height)?;
                    let end = root.to_end().into_owned();
                    writer.write_event(Event::Start(root))?;
                    write_style(&mut writer)?;
                    writer.write_event(Event::End(end))?;
                } else if is_district(&e)? {
                    writer.write_event(Event::Empty(district_element(&e, mapping)?))?;
                } else {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    String::from_utf8(writer.into_inner()).context("Recolored SVG is not valid UTF-8")
}

fn write_style(writer: &mut Writer<Vec<u8>>) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new("style")))?;
    writer.write_event(Event::Text(BytesText::new(LABEL_STYLE)))?;
    writer.write_event(Event::End(BytesEnd::new("style")))?;
    Ok(())
}

fn root_element(e: &BytesStart<'_>, width: u32, height: u32) -> Result<BytesStart<'static>> {
    let mut overrides = vec![("width", width.to_string()), ("height", height.to_string())];
    if attribute(e, b"xmlns")?.is_none() {
        overrides.push(("xmlns", SVG_NS.to_string()));
    }
    with_attributes(e, &overrides)
}

fn district_element(e: &BytesStart<'_>, mapping: &StateMapping) -> Result<BytesStart<'static>> {
    let color = attribute(e, b"id")?
        .map(|id| mapping.get(&id))
        .unwrap_or_default();
    with_attributes(e, &[("style", district_style(color))])
}

/// Copy of `e` with `overrides` replacing (or adding) attributes
fn with_attributes(e: &BytesStart<'_>, overrides: &[(&str, String)]) -> Result<BytesStart<'static>> {
    let name = std::str::from_utf8(e.name().as_ref())
        .context("Element name in map SVG is not UTF-8")?
        .to_string();
    let mut out = BytesStart::new(name);
    for attr in e.attributes() {
        let attr = attr.context("Malformed attribute in map SVG")?;
        if overrides.iter().any(|(key, _)| key.as_bytes() == attr.key.as_ref()) {
            continue;
        }
        out.push_attribute(attr);
    }
    for (key, value) in overrides {
        out.push_attribute((*key, value.as_str()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<svg viewBox="0 0 100 120" width="10" style="background: red">
  <path id="A" class="district" style="fill: #123456" d="M0 0 L10 0 L10 10 Z"/>
  <path id="B" class="district" d="M20 0 L30 0 L30 10 Z"></path>
  <path class="district" d="M40 0 L50 0 L50 10 Z"/>
  <path id="coast" class="coast" style="fill: none" d="M0 50 L100 50"/>
  <g id="label"><text data-place="A">黄浦区 &amp; more</text></g>
</svg>"#;

    fn prepared(mapping: &StateMapping) -> String {
        let map = RegionMap::from_svg(MAP).unwrap();
        prepare(&map, mapping, 800, 960).unwrap()
    }

    #[test]
    fn test_district_fills_follow_mapping() {
        let mapping: StateMapping = [("A", LevelColor::Resident), ("B", LevelColor::PassedThrough)]
            .into_iter()
            .collect();
        let svg = prepared(&mapping);

        assert!(svg.contains(r#"id="A" class="district" d="M0 0 L10 0 L10 10 Z" style="fill: #e84c3d; stroke: #000; stroke-width: 0.3;""#));
        assert!(svg.contains("fill: #3598db; stroke: #000; stroke-width: 0.3;"));
        assert!(!svg.contains("#123456"));
    }

    #[test]
    fn test_unresolved_districts_get_unvisited_fill() {
        let svg = prepared(&StateMapping::new());
        assert_eq!(svg.matches("fill: #ffffff; stroke: #000").count(), 3);
    }

    #[test]
    fn test_non_district_elements_untouched() {
        let svg = prepared(&StateMapping::new());
        assert!(svg.contains(r#"<path id="coast" class="coast" style="fill: none" d="M0 50 L100 50"/>"#));
        assert!(svg.contains("黄浦区 &amp; more"));
    }

    #[test]
    fn test_root_gets_size_namespace_and_style() {
        let svg = prepared(&StateMapping::new());
        assert!(svg.contains(r#"width="800""#));
        assert!(svg.contains(r#"height="960""#));
        assert!(!svg.contains(r#"width="10""#));
        assert!(svg.contains(r#"xmlns="http://www.w3.org/2000/svg""#));

        let root_end = svg.find("<svg").and_then(|i| svg[i..].find('>').map(|j| i + j)).unwrap();
        assert!(svg[root_end + 1..].starts_with("<style>"));
        assert!(svg.contains("font-size: 1.8px"));
    }

    #[test]
    fn test_existing_namespace_not_duplicated() {
        let map = RegionMap::from_svg(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><path id="A" class="district"/></svg>"#,
        )
        .unwrap();
        let svg = prepare(&map, &StateMapping::new(), 800, 960).unwrap();
        assert_eq!(svg.matches("xmlns=").count(), 1);
    }

    #[test]
    fn test_prepare_does_not_mutate_inputs() {
        let mapping: StateMapping = [("A", LevelColor::Visited)].into_iter().collect();
        let map = RegionMap::from_svg(MAP).unwrap();
        let before = mapping.clone();
        prepare(&map, &mapping, 800, 960).unwrap();
        assert_eq!(mapping, before);
        assert_eq!(map.svg(), MAP);
    }
}
