//! Print Resolution
//!
//! Raster exports scale the logical canvas by `dpi / 72`. Where the DPI comes
//! from is recorded so callers don't have to branch on it later.

use serde::{Deserialize, Serialize};

/// On-screen reference resolution; one logical pixel at this DPI
pub const REFERENCE_DPI: u32 = 72;

/// Largest raster side the exporter will allocate
pub const MAX_RASTER_SIDE: u32 = 32_768;

/// Largest raster area the exporter will allocate: 512 MiB of RGBA
pub const MAX_RASTER_PIXELS: u64 = 128 * 1024 * 1024;

/// DpiAuthority determines where the export resolution comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DpiAuthority {
    /// Reference resolution (fallback)
    System,
    /// `canvas.dpi` of the configuration
    Canvas,
    /// Explicit export request
    User,
}

impl Default for DpiAuthority {
    fn default() -> Self {
        Self::System
    }
}

/// Resolution of a raster export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSpec {
    pub authority: DpiAuthority,
    pub dpi: u32,
}

impl Default for PrintSpec {
    fn default() -> Self {
        Self {
            authority: DpiAuthority::System,
            dpi: REFERENCE_DPI,
        }
    }
}

impl PrintSpec {
    /// Take the canvas DPI, falling back to the reference DPI when it is zero
    pub fn from_canvas(dpi: u32) -> Self {
        if dpi == 0 {
            return Self::default();
        }
        Self {
            authority: DpiAuthority::Canvas,
            dpi,
        }
    }

    /// Create from an explicit request with validation
    pub fn from_user(dpi: u32) -> Result<Self, &'static str> {
        if dpi == 0 {
            return Err("DPI must be a positive integer");
        }
        Ok(Self {
            authority: DpiAuthority::User,
            dpi,
        })
    }

    /// Multiplier from logical canvas units to output pixels
    pub fn scale(&self) -> f64 {
        self.dpi as f64 / REFERENCE_DPI as f64
    }

    /// Output pixel dimensions for a logical canvas, rounded to the nearest pixel
    pub fn pixel_size(&self, width: f64, height: f64) -> (u32, u32) {
        let px = |v: f64| {
            let scaled = (v * self.scale()).round();
            if scaled.is_finite() && scaled > 0.0 {
                scaled.min(u32::MAX as f64) as u32
            } else {
                0
            }
        };
        (px(width), px(height))
    }

    /// Whether a surface of this size may be allocated
    pub fn fits(width: u32, height: u32) -> bool {
        width <= MAX_RASTER_SIDE
            && height <= MAX_RASTER_SIDE
            && width as u64 * height as u64 <= MAX_RASTER_PIXELS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_resolution_rounds() {
        let spec = PrintSpec::from_user(300).unwrap();
        assert_eq!(spec.pixel_size(800.0, 800.0), (3333, 3333));

        let spec = PrintSpec::from_user(150).unwrap();
        assert_eq!(spec.pixel_size(800.0, 800.0), (1667, 1667));
    }

    #[test]
    fn test_reference_dpi_is_identity() {
        assert_eq!(PrintSpec::default().pixel_size(800.0, 600.0), (800, 600));
        assert_eq!(PrintSpec::default().scale(), 1.0);
    }

    #[test]
    fn test_zero_dpi() {
        assert!(PrintSpec::from_user(0).is_err());
        assert_eq!(PrintSpec::from_canvas(0).authority, DpiAuthority::System);
        assert_eq!(PrintSpec::from_canvas(300).authority, DpiAuthority::Canvas);
    }

    #[test]
    fn test_surface_bounds() {
        assert!(PrintSpec::fits(3333, 3333));
        assert!(PrintSpec::fits(MAX_RASTER_SIDE, 4096));
        // each side under the limit, total area far over it
        assert!(!PrintSpec::fits(32_500, 32_500));
        assert!(!PrintSpec::fits(MAX_RASTER_SIDE + 1, 1));
    }

    #[test]
    fn test_degenerate_extent() {
        assert_eq!(PrintSpec::default().pixel_size(0.0, f64::NAN), (0, 0));
    }
}
