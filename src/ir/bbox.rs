//! Axis-aligned bounding boxes in XYXY order.

use std::marker::PhantomData;

use super::{Normalized, Pixel};

/// An axis-aligned bounding box stored as `[xmin, ymin, xmax, ymax]`.
///
/// `TSpace` is either [`Pixel`] or [`Normalized`]. The constructor does not
/// check that `min <= max`; annotation tooling occasionally records inverted
/// or out-of-bounds boxes and the encoder only clamps them.
#[derive(Clone, Copy, PartialEq)]
pub struct BBoxXYXY<TSpace> {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
    _space: PhantomData<TSpace>,
}

impl<TSpace> BBoxXYXY<TSpace> {
    /// Creates a box from explicit corner coordinates.
    #[inline]
    pub fn from_xyxy(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
            _space: PhantomData,
        }
    }

    /// Creates a box from a top-left corner plus width and height.
    #[inline]
    pub fn from_xywh(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_xyxy(x, y, x + width, y + height)
    }

    /// Returns `(x, y, width, height)`.
    #[inline]
    pub fn to_xywh(&self) -> (f64, f64, f64, f64) {
        (
            self.xmin,
            self.ymin,
            self.xmax - self.xmin,
            self.ymax - self.ymin,
        )
    }

    /// Returns true if all coordinates are finite (not NaN or infinite).
    #[inline]
    pub fn is_finite(&self) -> bool {
        [self.xmin, self.ymin, self.xmax, self.ymax]
            .iter()
            .all(|v| v.is_finite())
    }
}

impl<TSpace> std::fmt::Debug for BBoxXYXY<TSpace> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BBoxXYXY")
            .field("xmin", &self.xmin)
            .field("ymin", &self.ymin)
            .field("xmax", &self.xmax)
            .field("ymax", &self.ymax)
            .finish()
    }
}

impl BBoxXYXY<Pixel> {
    /// Converts to normalized coordinates, clamping every value into `[0, 1]`.
    ///
    /// x values are divided by `image_width`, y values by `image_height`.
    pub fn to_normalized_clamped(
        &self,
        image_width: u32,
        image_height: u32,
    ) -> BBoxXYXY<Normalized> {
        let w = f64::from(image_width);
        let h = f64::from(image_height);
        BBoxXYXY::from_xyxy(
            clamp_unit(self.xmin / w),
            clamp_unit(self.ymin / h),
            clamp_unit(self.xmax / w),
            clamp_unit(self.ymax / h),
        )
    }
}

// NaN (zero-sized image) collapses to 0 rather than leaking into records.
fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
