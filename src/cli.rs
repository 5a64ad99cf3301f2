//! CLI argument definitions and command execution.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::config::Config;
use crate::constants::text::{EXPORT_FAILED, RESET_CONFIRM};
use crate::level::LevelColor;
use crate::persistence::{DurableStorage, JsonFileStorage, MemoryStorage};
use crate::regions::{RegionMap, RegionOrder};
use crate::share::ShareLink;
use crate::snapshot::{self, FontRenderer, ResvgRasterizer, SnapshotRenderer, SnapshotRequest};
use crate::state::StateStore;

#[derive(Parser)]
#[command(
    name = "shanghaiex",
    version,
    about = "ShanghaiEx - 制沪等级: rate how well you know each district of Shanghai",
    long_about = "Rate every district of Shanghai from 0 (never been) to 5 (lived there).\n\n\
                  Levels are saved locally and encoded into a shareable link;\n\
                  `export` renders the colored map as a PNG."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file (default: platform config dir).
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Restore from a share link; its fragment wins over saved levels.
    #[arg(long, value_name = "URL", global = true)]
    pub link: Option<String>,

    /// Map SVG whose `district` elements define the regions.
    #[arg(long, value_name = "SVG", global = true)]
    pub map: Option<PathBuf>,

    /// Levels file (default: platform data dir).
    #[arg(long, value_name = "PATH", global = true)]
    pub storage: Option<PathBuf>,

    /// Keep changes in memory only.
    #[arg(long = "no-persist", global = true)]
    pub no_persist: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show every region with its level (default).
    Show,

    /// Print the level of one region.
    Get {
        #[arg(value_name = "REGION")]
        region: String,
    },

    /// Set the level of one region.
    ///
    /// LEVEL is a digit 0-5 (larger values clamp to 5), a color name
    /// (white, blue, green, yellow, orange, red) or a tier name such as
    /// `stayed-overnight`.
    Set {
        #[arg(value_name = "REGION")]
        region: String,
        #[arg(value_name = "LEVEL")]
        level: LevelColor,
    },

    /// Clear every level.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Print the total score.
    Score,

    /// Print the share link for the current levels.
    Link,

    /// Show or set the display name carried in the share link.
    ///
    /// An empty NAME removes it.
    Name {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },

    /// Render the colored map to `ShanghaiEx_Level_<score>.png`.
    Export {
        /// Output directory (default: `export_dir` from the config).
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// Font for the title and legend.
        #[arg(long, value_name = "PATH")]
        font: Option<PathBuf>,
    },

    /// List regions in locator order.
    Regions,

    /// Print the effective config and where it is read from.
    Config {
        /// Write the effective config to the config file if none exists yet.
        #[arg(long)]
        init: bool,
    },
}

/// One page session: the store plus the map it was built from
pub struct Session {
    store: StateStore,
    map: Option<RegionMap>,
    config_path: PathBuf,
}

impl Session {
    pub fn new(store: StateStore, map: Option<RegionMap>) -> Self {
        Self {
            store,
            map,
            config_path: Config::config_path(),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Wire map, storage and link from CLI flags over config values
    pub fn open(cli: &Cli, config: &Config) -> Result<Self> {
        let map_path = cli.map.as_ref().or(config.map_path.as_ref());
        let map = map_path
            .map(|path| RegionMap::load(path))
            .transpose()
            .context("Failed to load map")?;

        let regions = match &map {
            Some(map) => map.order().clone(),
            None => RegionOrder::shanghai(),
        };

        let storage: Box<dyn DurableStorage> = if cli.no_persist {
            Box::new(MemoryStorage::new())
        } else {
            let storage = match &cli.storage {
                Some(path) => JsonFileStorage::new(path),
                None => config.storage(),
            };
            info!(path = %storage.path().display(), "Using levels file");
            Box::new(storage)
        };

        let link = match &cli.link {
            Some(link) => ShareLink::parse(link),
            None => ShareLink::new(config.base_url.clone()),
        };

        info!(regions = regions.len(), persist = !cli.no_persist, "Opening session");
        let session = Self::new(StateStore::init(regions, storage, link), map);
        Ok(match &cli.config {
            Some(path) => session.with_config_path(path),
            None => session,
        })
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    fn known_region<'a>(&self, region: &'a str) -> Result<&'a str> {
        if !self.store.regions().contains(region) {
            bail!("Unknown region '{}'. Run `shanghaiex regions` to list them", region);
        }
        Ok(region)
    }
}

fn describe(color: LevelColor) -> String {
    format!("{} {} ({})", color.score(), color.label(), color.tier_name())
}

fn print_levels(session: &Session, out: &mut impl Write) -> Result<()> {
    let store = &session.store;
    writeln!(out, "{}", snapshot::title(store.display_name(), store.total_score()))?;
    for region in store.regions().iter() {
        writeln!(out, "  {region}\t{}", describe(store.get_level(region)))?;
    }
    writeln!(out, "{}", store.shareable_link())?;
    Ok(())
}

/// Execute one command. `confirm` asks the user a yes/no question.
pub async fn run(
    command: Command,
    session: &mut Session,
    config: &Config,
    out: &mut impl Write,
    confirm: impl FnOnce(&str) -> Result<bool>,
) -> Result<()> {
    match command {
        Command::Show => print_levels(session, out)?,
        Command::Get { region } => {
            let region = session.known_region(&region)?;
            writeln!(out, "{}", describe(session.store.get_level(region)))?;
        }
        Command::Set { region, level } => {
            let region = session.known_region(&region)?;
            session.store.set_level(region, level);
            writeln!(out, "{region}: {}", describe(level))?;
            writeln!(out, "{}", snapshot::title(session.store.display_name(), session.store.total_score()))?;
            writeln!(out, "{}", session.store.share_link())?;
        }
        Command::Reset { yes } => {
            if !yes && !confirm(RESET_CONFIRM)? {
                writeln!(out, "Cancelled")?;
                return Ok(());
            }
            session.store.reset_all();
            writeln!(out, "{}", session.store.share_link())?;
        }
        Command::Score => writeln!(out, "{}", session.store.total_score())?,
        Command::Link => writeln!(out, "{}", session.store.shareable_link())?,
        Command::Name { name: None } => match session.store.display_name() {
            Some(name) => writeln!(out, "{name}")?,
            None => writeln!(out, "(no display name)")?,
        },
        Command::Name { name: Some(name) } => {
            session.store.set_display_name(&name);
            writeln!(out, "{}", session.store.shareable_link())?;
        }
        Command::Export { out: dir, font } => {
            let font_path = font.or_else(|| config.font_path.clone());
            let font = match FontRenderer::load(font_path.as_deref()) {
                Ok(font) => Some(font),
                Err(e) => {
                    warn!(error = %e, "No usable font, exporting without text");
                    None
                }
            };
            let rasterizer = ResvgRasterizer::new(font_path.as_deref());
            let renderer = SnapshotRenderer::new(Arc::new(rasterizer), font, config.layout());
            let dir = dir.unwrap_or_else(|| config.export_dir.clone());

            let path = export(session, &renderer, &dir).await.context(EXPORT_FAILED)?;
            writeln!(out, "{}", path.display())?;
        }
        Command::Regions => {
            for (index, region) in session.store.regions().iter().enumerate() {
                writeln!(out, "{index:>3}  {region}")?;
            }
        }
        Command::Config { init } => {
            let path = &session.config_path;
            if init {
                if path.exists() {
                    bail!("Config file already exists: {}", path.display());
                }
                config.save_to(path)?;
                info!(path = %path.display(), "Wrote config file");
            }
            writeln!(out, "# {}", path.display())?;
            writeln!(out, "{}", serde_json::to_string_pretty(config).context("Failed to serialize config")?)?;
        }
    }
    Ok(())
}

/// Render the current levels and save the PNG into `dir`
pub async fn export(session: &Session, renderer: &SnapshotRenderer, dir: &Path) -> Result<PathBuf> {
    let map = session
        .map
        .as_ref()
        .ok_or_else(|| anyhow!("Export needs a map SVG: pass --map or set map_path in the config"))?;
    let store = &session.store;

    let snapshot = renderer
        .render(SnapshotRequest {
            mapping: store.mapping(),
            map,
            display_name: store.display_name(),
            score: store.total_score(),
        })
        .await?;
    snapshot.save_in(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Layout, Rasterizer};
    use resvg::tiny_skia::Pixmap;

    const MAP: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 20 10">
  <path id="A" class="district" d="M0 0 H10 V10 H0 Z"/>
  <path id="B" class="district" d="M10 0 H20 V10 H10 Z"/>
</svg>"#;

    struct BlankRasterizer;

    impl Rasterizer for BlankRasterizer {
        fn rasterize(&self, _svg: &str, width: u32, height: u32) -> Result<Pixmap> {
            Pixmap::new(width, height).ok_or_else(|| anyhow!("bad size"))
        }
    }

    fn session(link: &str) -> Session {
        let map = RegionMap::from_svg(MAP).unwrap();
        let store = StateStore::init(map.order().clone(), Box::new(MemoryStorage::new()), ShareLink::parse(link));
        Session::new(store, Some(map))
    }

    async fn run_to_string(command: Command, session: &mut Session, answer: bool) -> Result<String> {
        let mut out = Vec::new();
        run(command, session, &Config::default(), &mut out, |_| Ok(answer)).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_parse_set_with_digit_and_name() {
        let cli = Cli::try_parse_from(["shanghaiex", "set", "A", "4"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Set { region: "A".into(), level: LevelColor::StayedOvernight })
        );

        let cli = Cli::try_parse_from(["shanghaiex", "--no-persist", "set", "A", "red"]).unwrap();
        assert!(cli.no_persist);
        assert_eq!(
            cli.command,
            Some(Command::Set { region: "A".into(), level: LevelColor::Resident })
        );
    }

    #[test]
    fn test_parse_rejects_invalid_level() {
        assert!(Cli::try_parse_from(["shanghaiex", "set", "A", "purple"]).is_err());
    }

    #[test]
    fn test_parse_defaults_to_show() {
        let cli = Cli::try_parse_from(["shanghaiex", "--link", "/#12"]).unwrap();
        assert_eq!(cli.command, None);
        assert_eq!(cli.link.as_deref(), Some("/#12"));
    }

    #[tokio::test]
    async fn test_set_prints_updated_link() {
        let mut session = session("/?t=Ann");
        let output = run_to_string(
            Command::Set { region: "B".into(), level: LevelColor::Visited },
            &mut session,
            true,
        )
        .await
        .unwrap();

        assert!(output.contains("Ann 的制沪等级 3"));
        assert!(output.ends_with("/?t=Ann#03\n"));
        assert_eq!(session.store().get_level("B"), LevelColor::Visited);
    }

    #[tokio::test]
    async fn test_unknown_region_is_rejected() {
        let mut session = session("/");
        let result = run_to_string(
            Command::Set { region: "Nowhere".into(), level: LevelColor::Visited },
            &mut session,
            true,
        )
        .await;
        assert!(result.is_err());
        assert!(session.store().mapping().is_empty());
    }

    #[tokio::test]
    async fn test_reset_respects_confirmation() {
        let mut session = session("/#55");

        let output = run_to_string(Command::Reset { yes: false }, &mut session, false).await.unwrap();
        assert_eq!(output, "Cancelled\n");
        assert_eq!(session.store().total_score(), 10);

        run_to_string(Command::Reset { yes: false }, &mut session, true).await.unwrap();
        assert_eq!(session.store().total_score(), 0);
        assert_eq!(session.store().get_level("A"), LevelColor::Unvisited);
    }

    #[tokio::test]
    async fn test_name_round_trip() {
        let mut session = session("/#10");
        let output = run_to_string(Command::Name { name: Some("  小明 ".into()) }, &mut session, true)
            .await
            .unwrap();
        assert_eq!(output, "/?t=%E5%B0%8F%E6%98%8E#10\n");

        let output = run_to_string(Command::Name { name: None }, &mut session, true).await.unwrap();
        assert_eq!(output, "小明\n");

        let output = run_to_string(Command::Name { name: Some(" ".into()) }, &mut session, true)
            .await
            .unwrap();
        assert_eq!(output, "/#10\n");
    }

    #[tokio::test]
    async fn test_show_lists_regions_in_order() {
        let mut session = session("/#41");
        let output = run_to_string(Command::Show, &mut session, true).await.unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "制沪等级 5");
        assert!(lines[1].starts_with("  A\t4"));
        assert!(lines[2].starts_with("  B\t1"));
        assert_eq!(lines[3], "/#41");
    }

    #[tokio::test]
    async fn test_config_init_writes_effective_config_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.json");
        let mut session = session("/").with_config_path(&path);
        let config = Config {
            map_width: 640,
            ..Config::default()
        };

        let mut out = Vec::new();
        run(Command::Config { init: true }, &mut session, &config, &mut out, |_| Ok(true))
            .await
            .unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with(&format!("# {}\n", path.display())));

        let written: Config = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);

        let again = run(Command::Config { init: true }, &mut session, &config, &mut Vec::<u8>::new(), |_| Ok(true)).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_config_without_init_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut session = session("/").with_config_path(&path);

        let output = run_to_string(Command::Config { init: false }, &mut session, true).await.unwrap();
        assert!(output.contains("\"map_width\": 800"));
        assert!(!path.exists());
    }

    #[test]
    fn test_parse_config_init() {
        let cli = Cli::try_parse_from(["shanghaiex", "--config", "/tmp/sx.json", "config", "--init"]).unwrap();
        assert_eq!(cli.command, Some(Command::Config { init: true }));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/sx.json")));
    }

    #[tokio::test]
    async fn test_export_writes_png_named_by_score() {
        let dir = tempfile::tempdir().unwrap();
        let session = session("/#53");
        let renderer = SnapshotRenderer::new(Arc::new(BlankRasterizer), None, Layout::with_map_size(100, 50));

        let path = export(&session, &renderer, dir.path()).await.unwrap();
        assert!(path.ends_with("ShanghaiEx_Level_8.png"));
        assert_eq!(&std::fs::read(path).unwrap()[..4], b"\x89PNG");
    }

    #[tokio::test]
    async fn test_export_without_map_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::init(RegionOrder::shanghai(), Box::new(MemoryStorage::new()), ShareLink::default());
        let session = Session::new(store, None);
        let renderer = SnapshotRenderer::new(Arc::new(BlankRasterizer), None, Layout::default());

        assert!(export(&session, &renderer, dir.path()).await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
