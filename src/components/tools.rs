use crate::ops::expand::MAX_EXPAND;

/// Which image the bucket searches for matching colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ReferenceMode {
    /// Only the layer being filled.
    #[default]
    CurrentLayer,
    /// A flattened composite of every visible bitmap layer.
    AllVisibleLayers,
}

impl ReferenceMode {
    pub fn all() -> &'static [ReferenceMode] {
        &[ReferenceMode::CurrentLayer, ReferenceMode::AllVisibleLayers]
    }

    pub fn to_config_str(&self) -> &'static str {
        match self {
            ReferenceMode::CurrentLayer => "current",
            ReferenceMode::AllVisibleLayers => "all",
        }
    }

    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "current" | "layer" | "current-layer" => Some(ReferenceMode::CurrentLayer),
            "all" | "visible" | "all-visible" => Some(ReferenceMode::AllVisibleLayers),
            _ => None,
        }
    }
}

/// How the fill is written into the target image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FillMode {
    /// Blend on top of existing pixels.
    #[default]
    Over,
    /// Swap the filled area for the bucket color at its exact opacity.
    Replace,
    /// Paint only where the target is transparent.
    Behind,
}

impl FillMode {
    pub fn all() -> &'static [FillMode] {
        &[FillMode::Over, FillMode::Replace, FillMode::Behind]
    }

    pub fn to_config_str(&self) -> &'static str {
        match self {
            FillMode::Over => "over",
            FillMode::Replace => "replace",
            FillMode::Behind => "behind",
        }
    }

    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "over" | "overlay" => Some(FillMode::Over),
            "replace" => Some(FillMode::Replace),
            "behind" => Some(FillMode::Behind),
            _ => None,
        }
    }
}

/// Bucket tool settings for one fill gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FillProperties {
    /// Per-channel RGBA distance (before squaring) still counted as a match.
    pub tolerance: u32,
    pub tolerance_enabled: bool,
    /// Dilation radius in pixels, applied only when `expand_enabled`.
    pub expand: u32,
    pub expand_enabled: bool,
    pub reference_mode: ReferenceMode,
    pub fill_mode: FillMode,
}

impl Default for FillProperties {
    fn default() -> Self {
        Self {
            tolerance: 32,
            tolerance_enabled: true,
            expand: 2,
            expand_enabled: false,
            reference_mode: ReferenceMode::CurrentLayer,
            fill_mode: FillMode::Over,
        }
    }
}

impl FillProperties {
    /// Tolerance as compared against squared color distance. Squared once per fill.
    pub fn squared_tolerance(&self) -> u32 {
        if self.tolerance_enabled {
            self.tolerance.saturating_mul(self.tolerance)
        } else {
            0
        }
    }

    /// Dilation actually applied: 0 when expansion is switched off, never
    /// more than [`MAX_EXPAND`].
    pub fn effective_expand(&self) -> u32 {
        if self.expand_enabled { self.expand.min(MAX_EXPAND) } else { 0 }
    }
}
