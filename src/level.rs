//! Visit level tiers
//!
//! Six ordered tiers, each with a score, a storage name (the color name kept
//! in durable storage), a display color and a legend label.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum LevelColor {
    #[default]
    #[serde(rename = "white")]
    Unvisited,
    #[serde(rename = "blue")]
    PassedThrough,
    #[serde(rename = "green")]
    StoppedOver,
    #[serde(rename = "yellow")]
    Visited,
    #[serde(rename = "orange")]
    StayedOvernight,
    #[serde(rename = "red")]
    Resident,
}

impl LevelColor {
    /// All tiers, low → high
    pub const ALL: [LevelColor; 6] = [
        LevelColor::Unvisited,
        LevelColor::PassedThrough,
        LevelColor::StoppedOver,
        LevelColor::Visited,
        LevelColor::StayedOvernight,
        LevelColor::Resident,
    ];

    /// Legend order, high → low
    pub const LEGEND: [LevelColor; 6] = [
        LevelColor::Resident,
        LevelColor::StayedOvernight,
        LevelColor::Visited,
        LevelColor::StoppedOver,
        LevelColor::PassedThrough,
        LevelColor::Unvisited,
    ];

    pub fn score(self) -> u8 {
        match self {
            LevelColor::Unvisited => 0,
            LevelColor::PassedThrough => 1,
            LevelColor::StoppedOver => 2,
            LevelColor::Visited => 3,
            LevelColor::StayedOvernight => 4,
            LevelColor::Resident => 5,
        }
    }

    /// Tier for an exact score; `None` outside 0..=5
    pub fn from_score(score: u8) -> Option<Self> {
        Self::ALL.get(score as usize).copied()
    }

    /// Tier for any integer, clamped into 0..=5
    pub fn clamped(level: i64) -> Self {
        Self::ALL[level.clamp(0, 5) as usize]
    }

    /// Color name used in durable storage
    pub fn storage_name(self) -> &'static str {
        match self {
            LevelColor::Unvisited => "white",
            LevelColor::PassedThrough => "blue",
            LevelColor::StoppedOver => "green",
            LevelColor::Visited => "yellow",
            LevelColor::StayedOvernight => "orange",
            LevelColor::Resident => "red",
        }
    }

    pub fn from_storage_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.storage_name() == name)
    }

    /// Display color as 0xRRGGBB
    pub fn rgb(self) -> u32 {
        match self {
            LevelColor::Unvisited => 0xffffff,
            LevelColor::PassedThrough => 0x3598db,
            LevelColor::StoppedOver => 0x30cc70,
            LevelColor::Visited => 0xf3c218,
            LevelColor::StayedOvernight => 0xd58337,
            LevelColor::Resident => 0xe84c3d,
        }
    }

    /// Display color as `#rrggbb`
    pub fn hex(self) -> String {
        format!("#{:06x}", self.rgb())
    }

    pub fn label(self) -> &'static str {
        match self {
            LevelColor::Unvisited => "未履",
            LevelColor::PassedThrough => "行径(曾路过)",
            LevelColor::StoppedOver => "歇脚(曾换乘)",
            LevelColor::Visited => "访问(曾游玩)",
            LevelColor::StayedOvernight => "宿泊(曾过夜)",
            LevelColor::Resident => "常驻(曾居住)",
        }
    }

    /// Kebab-case tier name accepted on the command line
    pub fn tier_name(self) -> &'static str {
        match self {
            LevelColor::Unvisited => "unvisited",
            LevelColor::PassedThrough => "passed-through",
            LevelColor::StoppedOver => "stopped-over",
            LevelColor::Visited => "visited",
            LevelColor::StayedOvernight => "stayed-overnight",
            LevelColor::Resident => "resident",
        }
    }
}

impl fmt::Display for LevelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.score())
    }
}

impl FromStr for LevelColor {
    type Err = anyhow::Error;

    /// Accepts a single digit, a storage color name or a tier name.
    /// Digits above 5 clamp to `Resident`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Self::clamped(n));
        }
        let lower = s.to_ascii_lowercase();
        Self::from_storage_name(&lower)
            .or_else(|| Self::ALL.into_iter().find(|c| c.tier_name() == lower))
            .ok_or_else(|| anyhow::anyhow!("Unknown level '{}' (expected 0-5, a color name or a tier name)", s))
    }
}
