//! # pico-face
//!
//! Pure Rust face detection with a pixel-intensity-comparison decision
//! tree cascade (the PICO algorithm, Markuš et al. 2013).
//!
//! This crate provides:
//! - **Cascade loading**: deserialization of trained cascade binaries
//! - **Window classification**: cascade evaluation at any position, size,
//!   and in-plane rotation angle
//! - **Multi-scale sweep**: stepped position/scale scanning of a grayscale
//!   image
//! - **Clustering**: IoU-based merging of overlapping raw detections
//!
//! ## Algorithm Overview
//!
//! 1. Parse the cascade: a sequence of complete binary trees whose internal
//!    nodes compare two image pixels and whose leaves vote on a score
//! 2. Slide a square window over the image at stepped positions and
//!    geometrically growing scales
//! 3. For each window, walk every tree root-to-leaf (pixel comparison at
//!    each level), accumulate leaf votes, and reject early whenever the
//!    running score drops to a stage threshold
//! 4. Merge overlapping accepted windows into final face boxes, weighting
//!    by score
//!
//! No image pyramid is built and no preprocessing is applied: trees sample
//! the original pixels directly, with offsets scaled to the window.
//!
//! ## Quick Start
//!
//! ```rust
//! use pico_face::{cluster_detections, Cascade, CascadeParams, GrayImage};
//!
//! // Load a trained cascade
//! // let cascade = Cascade::load("facefinder")?;
//!
//! // Or build a toy one for development: a single depth-1 tree that
//! // accepts windows whose left side is brighter than their right side.
//! let mut model = Vec::new();
//! model.extend_from_slice(b"cascade\0"); // reserved header
//! model.extend_from_slice(&1i32.to_le_bytes()); // tree depth
//! model.extend_from_slice(&1i32.to_le_bytes()); // tree count
//! model.extend_from_slice(&[0, (-100i8) as u8, 0, 100]); // node offsets
//! model.extend_from_slice(&(-1.0f32).to_le_bytes()); // left leaf
//! model.extend_from_slice(&1.0f32.to_le_bytes()); // right leaf
//! model.extend_from_slice(&0.0f32.to_le_bytes()); // stage threshold
//! let cascade = Cascade::from_bytes(&model)?;
//!
//! // A grayscale image, brightest at the left edge
//! let pixels: Vec<u8> = (0..64u32 * 64)
//!     .map(|i| 255 - (i % 64) as u8 * 3)
//!     .collect();
//! let image = GrayImage::new(&pixels, 64, 64);
//!
//! // Sweep and cluster
//! let params = CascadeParams {
//!     min_size: 16,
//!     max_size: 32,
//!     ..Default::default()
//! };
//! let raw = cascade.run(&image, &params, 0.0);
//! let faces = cluster_detections(&raw, 0.2);
//! assert!(!faces.is_empty());
//! # Ok::<(), pico_face::Error>(())
//! ```
//!
//! ## Model Files
//!
//! [`Cascade::from_bytes`] reads the compact binary layout produced by the
//! reference PICO training tools (8 reserved bytes, tree depth, tree
//! count, then node offsets, leaf predictions, and a stage threshold per
//! tree, all little-endian). The published `facefinder` frontal-face
//! cascade loads as-is.
//!
//! ## Threading
//!
//! A [`Cascade`] is immutable after parsing and all detection entry points
//! take `&self`, so a single parsed model can serve detection runs from
//! any number of threads.

mod cascade;
mod cluster;
mod detector;
mod error;
mod image;

pub use cascade::Cascade;
pub use cluster::cluster_detections;
pub use detector::{CascadeParams, Detection};
pub use error::{Error, Result};
pub use image::GrayImage;
