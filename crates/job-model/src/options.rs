//! Option catalogs: aspect ratios, color presets, and zoom levels.
//!
//! The registry is immutable once built. Lookups never fail: an unknown or
//! absent label resolves to the catalog default (`16:9`, `None`, `None`).

use std::fmt;

use serde::{Deserialize, Serialize};

use reframe_common::error::{ReframeError, ReframeResult};

use crate::stage::ColorAdjust;

/// Ratio label that disables cropping.
pub const ORIGINAL_RATIO: &str = "Original";
pub const DEFAULT_RATIO: &str = "16:9";
pub const DEFAULT_FILTER: &str = "None";
pub const DEFAULT_ZOOM: &str = "None";

/// Which catalog a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    AspectRatio,
    Filter,
    Zoom,
}

impl OptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKind::AspectRatio => "ratio",
            OptionKind::Filter => "filter",
            OptionKind::Zoom => "zoom",
        }
    }
}

impl fmt::Display for OptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A selectable output aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatioOption {
    pub label: String,
    pub description: String,
}

impl AspectRatioOption {
    pub fn new(label: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            description: description.into(),
        }
    }

    /// Whether this option keeps the source frame untouched.
    pub fn keeps_original(&self) -> bool {
        self.label == ORIGINAL_RATIO
    }

    /// `(w, h)` for labels shaped like `W:H`.
    pub fn proportion(&self) -> Option<(u32, u32)> {
        let (w, h) = self.label.split_once(':')?;
        let w = w.trim().parse::<u32>().ok()?;
        let h = h.trim().parse::<u32>().ok()?;
        if w == 0 || h == 0 {
            return None;
        }
        Some((w, h))
    }
}

/// A color filter preset. `adjustment: None` is the identity filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterPreset {
    pub label: String,
    #[serde(default)]
    pub adjustment: Option<ColorAdjust>,
}

impl FilterPreset {
    pub fn identity(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            adjustment: None,
        }
    }

    pub fn new(label: impl Into<String>, adjustment: ColorAdjust) -> Self {
        Self {
            label: label.into(),
            adjustment: Some(adjustment),
        }
    }

    pub fn is_identity(&self) -> bool {
        self.adjustment.is_none()
    }

    /// ffmpeg text for this preset; empty for the identity filter.
    pub fn engine_expression(&self) -> String {
        self.adjustment
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// A zoom level. A factor of exactly 1.0 emits no stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoomOption {
    pub label: String,
    pub factor: f64,
}

impl ZoomOption {
    pub fn new(label: impl Into<String>, factor: f64) -> Self {
        Self {
            label: label.into(),
            factor,
        }
    }

    pub fn is_zoomed(&self) -> bool {
        self.factor > 1.0
    }
}

/// On-disk shape of a catalog file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OptionCatalogs {
    aspect_ratios: Vec<AspectRatioOption>,
    filters: Vec<FilterPreset>,
    zooms: Vec<ZoomOption>,
}

/// Read-only lookup tables shared by every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OptionCatalogs", into = "OptionCatalogs")]
pub struct OptionRegistry {
    aspect_ratios: Vec<AspectRatioOption>,
    filters: Vec<FilterPreset>,
    zooms: Vec<ZoomOption>,
    default_ratio: usize,
    default_filter: usize,
    default_zoom: usize,
}

impl OptionRegistry {
    /// The stock catalogs.
    pub fn builtin() -> Self {
        let catalogs = OptionCatalogs {
            aspect_ratios: vec![
                AspectRatioOption::new(ORIGINAL_RATIO, "Keep original dimensions"),
                AspectRatioOption::new("1:1", "Square — Ideal for social media posts"),
                AspectRatioOption::new("4:5", "Portrait — Vertical posts"),
                AspectRatioOption::new("3:2", "Standard DSLR"),
                AspectRatioOption::new("5:7", "Smaller prints"),
                AspectRatioOption::new("16:9", "Widescreen — Horizontal"),
                AspectRatioOption::new("9:16", "Vertical — Stories, TikTok"),
                AspectRatioOption::new("4:3", "Standard photography"),
            ],
            filters: vec![
                FilterPreset::identity(DEFAULT_FILTER),
                FilterPreset::new("Grayscale", ColorAdjust::Grayscale),
                FilterPreset::new("Sepia", ColorAdjust::Sepia),
                FilterPreset::new("Invert", ColorAdjust::Invert),
                FilterPreset::new("Brighten", ColorAdjust::Brightness { delta: 0.1 }),
                FilterPreset::new("Darken", ColorAdjust::Brightness { delta: -0.1 }),
                FilterPreset::new("Saturation Boost", ColorAdjust::Saturation { factor: 1.5 }),
            ],
            zooms: vec![
                ZoomOption::new(DEFAULT_ZOOM, 1.0),
                ZoomOption::new("Slight Zoom (1.1x)", 1.1),
                ZoomOption::new("Medium Zoom (1.25x)", 1.25),
                ZoomOption::new("Strong Zoom (1.5x)", 1.5),
            ],
        };

        match Self::try_from(catalogs) {
            Ok(registry) => registry,
            Err(e) => unreachable!("built-in catalogs are valid: {e}"),
        }
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> ReframeResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog document from disk.
    pub fn from_json_file(path: &std::path::Path) -> ReframeResult<Self> {
        if !path.exists() {
            return Err(ReframeError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
            .map_err(|e| ReframeError::config(format!("Invalid catalog {}: {e}", path.display())))
    }

    pub fn aspect_ratios(&self) -> &[AspectRatioOption] {
        &self.aspect_ratios
    }

    pub fn filters(&self) -> &[FilterPreset] {
        &self.filters
    }

    pub fn zooms(&self) -> &[ZoomOption] {
        &self.zooms
    }

    /// Resolve a ratio label, falling back to `16:9`.
    pub fn aspect_ratio(&self, label: Option<&str>) -> &AspectRatioOption {
        let index = find_index(&self.aspect_ratios, label, |o| &o.label)
            .unwrap_or_else(|| fallback(OptionKind::AspectRatio, label, self.default_ratio));
        &self.aspect_ratios[index]
    }

    /// Resolve a filter label, falling back to the identity filter.
    pub fn filter(&self, label: Option<&str>) -> &FilterPreset {
        let index = find_index(&self.filters, label, |o| &o.label)
            .unwrap_or_else(|| fallback(OptionKind::Filter, label, self.default_filter));
        &self.filters[index]
    }

    /// Resolve a zoom label, falling back to no zoom.
    pub fn zoom(&self, label: Option<&str>) -> &ZoomOption {
        let index = find_index(&self.zooms, label, |o| &o.label)
            .unwrap_or_else(|| fallback(OptionKind::Zoom, label, self.default_zoom));
        &self.zooms[index]
    }

    /// Labels of one catalog in display order.
    pub fn labels(&self, kind: OptionKind) -> Vec<&str> {
        match kind {
            OptionKind::AspectRatio => {
                self.aspect_ratios.iter().map(|o| o.label.as_str()).collect()
            }
            OptionKind::Filter => self.filters.iter().map(|o| o.label.as_str()).collect(),
            OptionKind::Zoom => self.zooms.iter().map(|o| o.label.as_str()).collect(),
        }
    }
}

impl Default for OptionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<OptionCatalogs> for OptionRegistry {
    type Error = ReframeError;

    fn try_from(catalogs: OptionCatalogs) -> Result<Self, Self::Error> {
        ensure_unique_labels(
            OptionKind::AspectRatio,
            catalogs.aspect_ratios.iter().map(|o| &o.label),
        )?;
        ensure_unique_labels(OptionKind::Filter, catalogs.filters.iter().map(|o| &o.label))?;
        ensure_unique_labels(OptionKind::Zoom, catalogs.zooms.iter().map(|o| &o.label))?;

        if let Some(bad) = catalogs
            .zooms
            .iter()
            .find(|z| !z.factor.is_finite() || z.factor < 1.0)
        {
            return Err(ReframeError::config(format!(
                "zoom `{}` has factor {}, expected a finite value >= 1.0",
                bad.label, bad.factor
            )));
        }

        let default_ratio = require_default(
            OptionKind::AspectRatio,
            &catalogs.aspect_ratios,
            DEFAULT_RATIO,
            |o| &o.label,
        )?;
        let default_filter =
            require_default(OptionKind::Filter, &catalogs.filters, DEFAULT_FILTER, |o| &o.label)?;
        let default_zoom =
            require_default(OptionKind::Zoom, &catalogs.zooms, DEFAULT_ZOOM, |o| &o.label)?;

        if !catalogs.filters[default_filter].is_identity() {
            return Err(ReframeError::config(format!(
                "filter `{DEFAULT_FILTER}` must be the identity filter"
            )));
        }
        if catalogs.zooms[default_zoom].is_zoomed() {
            return Err(ReframeError::config(format!(
                "zoom `{DEFAULT_ZOOM}` must have factor 1.0"
            )));
        }

        Ok(Self {
            aspect_ratios: catalogs.aspect_ratios,
            filters: catalogs.filters,
            zooms: catalogs.zooms,
            default_ratio,
            default_filter,
            default_zoom,
        })
    }
}

impl From<OptionRegistry> for OptionCatalogs {
    fn from(registry: OptionRegistry) -> Self {
        Self {
            aspect_ratios: registry.aspect_ratios,
            filters: registry.filters,
            zooms: registry.zooms,
        }
    }
}

fn find_index<T>(items: &[T], label: Option<&str>, key: impl Fn(&T) -> &String) -> Option<usize> {
    let label = label?;
    items.iter().position(|item| key(item) == label)
}

fn fallback(kind: OptionKind, label: Option<&str>, default_index: usize) -> usize {
    if let Some(label) = label {
        tracing::debug!(kind = %kind, label, "Unknown option label, using default");
    }
    default_index
}

fn ensure_unique_labels<'a>(
    kind: OptionKind,
    labels: impl Iterator<Item = &'a String>,
) -> ReframeResult<()> {
    let mut seen = std::collections::HashSet::new();
    for label in labels {
        if !seen.insert(label.as_str()) {
            return Err(ReframeError::config(format!(
                "duplicate {kind} label `{label}`"
            )));
        }
    }
    Ok(())
}

fn require_default<T>(
    kind: OptionKind,
    items: &[T],
    label: &str,
    key: impl Fn(&T) -> &String,
) -> ReframeResult<usize> {
    find_index(items, Some(label), key).ok_or_else(|| {
        ReframeError::config(format!("{kind} catalog is missing default `{label}`"))
    })
}
