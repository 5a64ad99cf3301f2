//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Durable storage and config file locations
pub mod storage {
    /// Directory name under the platform data/config dirs
    pub const APP_DIR: &str = "shanghaiex";

    /// Single key used for the durable level mapping
    pub const STORAGE_KEY: &str = "shanghaiex-levels";

    /// Config file name
    pub const CONFIG_FILENAME: &str = "config.json";
}

/// Share link constants
pub mod share {
    /// Query parameter carrying the display name
    pub const NAME_PARAM: &str = "t";

    /// Default base path when no link is supplied
    pub const DEFAULT_BASE: &str = "/";
}

/// Map SVG conventions
pub mod map {
    /// Class token marking a region shape
    pub const DISTRICT_CLASS: &str = "district";

    /// Stroke applied to every region in an exported snapshot
    pub const DISTRICT_STROKE: &str = "stroke: #000; stroke-width: 0.3;";

    /// Inline label styling so the rasterizer needs no external style sheet
    pub const LABEL_STYLE: &str = "
            #label text, .labels text { font-size: 1.8px; fill: #333; font-family: sans-serif; font-weight: 700; text-anchor: middle; dominant-baseline: middle; }
            text { font-size: 1.8px; fill: #333; font-family: sans-serif; font-weight: 700; text-anchor: middle; dominant-baseline: middle; }
        ";
}

/// Snapshot layout (pixels)
pub mod layout {
    /// Default map pane width
    pub const MAP_WIDTH: u32 = 800;

    /// Default map pane height
    pub const MAP_HEIGHT: u32 = 960;

    pub const HEADER_HEIGHT: u32 = 70;
    pub const FOOTER_HEIGHT: u32 = 50;

    /// Title baseline measured from the top of the canvas
    pub const TITLE_BASELINE: f32 = 45.0;
    pub const TITLE_SIZE: f32 = 34.0;

    /// Legend row center measured from the bottom of the canvas
    pub const LEGEND_OFFSET_FROM_BOTTOM: f32 = 28.0;
    pub const LEGEND_START_X: f32 = 50.0;
    pub const LEGEND_SPACING: f32 = 120.0;
    pub const LEGEND_SWATCH_RADIUS: f32 = 8.0;
    pub const LEGEND_LABEL_GAP: f32 = 14.0;
    pub const LEGEND_LABEL_BASELINE_SHIFT: f32 = 4.0;
    pub const LEGEND_LABEL_SIZE: f32 = 13.0;

    pub const WATERMARK_MARGIN_RIGHT: f32 = 10.0;
    pub const WATERMARK_MARGIN_BOTTOM: f32 = 8.0;
    pub const WATERMARK_SIZE: f32 = 11.0;

    /// Accepted map pane dimensions (config validation)
    pub const MIN_MAP_DIMENSION: u32 = 64;
    pub const MAX_MAP_DIMENSION: u32 = 4096;
}

/// Snapshot colors (0xRRGGBB)
pub mod palette {
    pub const BACKGROUND: u32 = 0x9dc3fb;
    pub const TEXT: u32 = 0x333333;
    pub const MUTED: u32 = 0x666666;
}

/// Snapshot text
pub mod text {
    pub const TITLE_PREFIX: &str = "制沪等级";
    pub const TITLE_OWNER_SUFFIX: &str = " 的";
    pub const WATERMARK: &str = "ShanghaiEx · 制沪等级";
    pub const FILE_PREFIX: &str = "ShanghaiEx_Level_";
    pub const EXPORT_FAILED: &str = "生成图片失败，请稍后重试";
    pub const RESET_CONFIRM: &str = "确定要重置所有区的等级吗？此操作不可撤销。";
}
