//! crates/askpix_core/src/crop.rs
//!
//! Crop selection geometry.
//!
//! The user drags a rectangle over the frame as it is displayed on screen. The
//! rectangle is kept normalized (fractions of the displayed frame) so it survives
//! layout changes, and is converted to source pixels only when cropping.

/// A width and height in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A selection over the displayed frame, every field in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A rectangle in source-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// No selection yet.
    pub const EMPTY: CropRect = CropRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    /// Builds a normalized rectangle, clamping it inside the frame.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        let x = clamp_unit(x);
        let y = clamp_unit(y);
        Self {
            x,
            y,
            width: clamp_unit(width).min(1.0 - x),
            height: clamp_unit(height).min(1.0 - y),
        }
    }

    /// Normalizes a rectangle given in displayed pixels.
    pub fn from_displayed(x: f64, y: f64, width: f64, height: f64, displayed: ImageSize) -> Self {
        if displayed.width == 0 || displayed.height == 0 {
            return Self::EMPTY;
        }
        let dw = f64::from(displayed.width);
        let dh = f64::from(displayed.height);
        Self::new(x / dw, y / dh, width / dw, height / dh)
    }

    /// Whether the selection covers any area. Submitting is disabled until it does.
    pub fn has_area(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    /// Converts the selection to source pixels: the displayed rectangle scaled by
    /// the natural-to-displayed ratio on each axis. `None` when the result is empty.
    pub fn to_pixels(&self, natural: ImageSize, displayed: ImageSize) -> Option<PixelRect> {
        if !self.has_area() || displayed.width == 0 || displayed.height == 0 {
            return None;
        }

        let scale_x = f64::from(natural.width) / f64::from(displayed.width);
        let scale_y = f64::from(natural.height) / f64::from(displayed.height);

        let displayed_x = self.x * f64::from(displayed.width);
        let displayed_y = self.y * f64::from(displayed.height);
        let displayed_w = self.width * f64::from(displayed.width);
        let displayed_h = self.height * f64::from(displayed.height);

        let x = ((displayed_x * scale_x).round() as u32).min(natural.width);
        let y = ((displayed_y * scale_y).round() as u32).min(natural.height);
        let width = ((displayed_w * scale_x).round() as u32).min(natural.width - x);
        let height = ((displayed_h * scale_y).round() as u32).min(natural.height - y);

        if width == 0 || height == 0 {
            None
        } else {
            Some(PixelRect { x, y, width, height })
        }
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
