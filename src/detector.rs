//! Multi-scale sweep: drives the window classifier across every stepped
//! position and scale of an image.

use serde::{Deserialize, Serialize};

use crate::cascade::Cascade;
use crate::image::GrayImage;

/// Sweep configuration.
///
/// `min_size` and `max_size` bound the window side in pixels and must both
/// be positive with `min_size <= max_size`. `shift_factor` (in `(0, 1]`)
/// sets the positional step as a fraction of the window side;
/// `scale_factor` (greater than 1) is the geometric growth between scales.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CascadeParams {
    pub min_size: u32,
    pub max_size: u32,
    pub shift_factor: f32,
    pub scale_factor: f32,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            min_size: 20,
            max_size: 1000,
            shift_factor: 0.1,
            scale_factor: 1.1,
        }
    }
}

/// A candidate face: window center, side length, and accumulated score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub row: i32,
    pub col: i32,
    pub scale: u32,
    pub q: f32,
}

impl Cascade {
    /// Sweep the classification window across `image` at every stepped
    /// position and scale, collecting the windows the cascade accepts.
    ///
    /// Scales run from `min_size` upward by `scale_factor` while they fit
    /// under `max_size`; positions step by `max(1, s * shift_factor)` so
    /// window centers stay inside the image. `angle` follows the
    /// [`Cascade::classify`] convention. The output order is fixed: scales
    /// ascending, then rows, then columns.
    ///
    /// Degenerate parameters (window larger than the image, empty scale
    /// range) yield an empty vector, never an error.
    pub fn run(&self, image: &GrayImage, params: &CascadeParams, angle: f32) -> Vec<Detection> {
        let mut detections = Vec::new();
        let angle = angle.rem_euclid(1.0);
        let rows = image.rows() as i32;
        let cols = image.cols() as i32;

        let mut s = params.min_size as i32;
        while s <= params.max_size as i32 {
            let step = ((s as f32 * params.shift_factor) as i32).max(1);
            let half = s / 2;

            let mut r = half;
            while r <= rows - half {
                let mut c = half;
                while c <= cols - half {
                    if let Some(q) = self.classify(image, r, c, s as u32, angle) {
                        detections.push(Detection {
                            row: r,
                            col: c,
                            scale: s as u32,
                            q,
                        });
                    }
                    c += step;
                }
                r += step;
            }

            // geometric growth, with a +1 floor so the loop always advances
            let next = (s as f32 * params.scale_factor) as i32;
            s = if next > s { next } else { s + 1 };
        }

        detections
    }
}
