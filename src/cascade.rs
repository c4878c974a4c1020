//! Cascade model: binary deserialization and per-window classification.
//!
//! A cascade is an ordered sequence of complete binary decision trees. Each
//! internal node holds two sample-point offsets normalized to a unit window
//! (1/256 scale); each leaf holds a score contribution; each tree carries a
//! stage threshold that cuts off the accumulated score early.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::image::GrayImage;

/// Highest accepted tree depth. Keeps `2^depth` leaf indexing comfortably
/// inside 32 bits and bounds the parse allocation.
const MAX_TREE_DEPTH: u32 = 16;

/// A parsed detection cascade. Immutable after loading; all evaluation
/// methods take `&self`, so one cascade can serve concurrent runs.
#[derive(Debug, Clone)]
pub struct Cascade {
    /// Reserved leading bytes, kept verbatim so a cascade re-serializes
    /// byte-identically.
    header: [u8; 8],
    tree_depth: u32,
    tree_count: u32,
    /// `(r1, c1, r2, c2)` per internal node, trees concatenated. Node `i`'s
    /// children are `2i+1` and `2i+2`.
    nodes: Vec<i8>,
    /// `2^tree_depth` leaf contributions per tree.
    preds: Vec<f32>,
    /// One stage threshold per tree.
    thresholds: Vec<f32>,
}

/// Bounded little-endian reads over an in-memory byte stream.
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize, reading: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.buf.len())
            .ok_or(Error::TruncatedStream {
                reading,
                offset: self.pos,
            })?;
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_i32(&mut self, reading: &'static str) -> Result<i32> {
        let b = self.take(4, reading)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f32(&mut self, reading: &'static str) -> Result<f32> {
        let b = self.take(4, reading)?;
        Ok(f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }
}

impl Cascade {
    /// Parse a cascade from its binary serialization.
    ///
    /// Layout (little-endian): 8 reserved bytes, `i32` tree depth, `i32`
    /// tree count, then per tree `(2^depth - 1) * 4` signed byte offsets,
    /// `2^depth` `f32` leaf predictions and one `f32` stage threshold.
    /// Bytes past the last tree are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Cascade> {
        let mut r = ByteReader::new(bytes);

        let mut header = [0u8; 8];
        header.copy_from_slice(r.take(8, "reserved header")?);

        let tree_depth = r.read_i32("tree depth")?;
        let tree_count = r.read_i32("tree count")?;

        if tree_depth <= 0 || tree_depth as u32 > MAX_TREE_DEPTH {
            return Err(Error::InvalidShape(format!(
                "tree depth {tree_depth} outside 1..={MAX_TREE_DEPTH}"
            )));
        }
        if tree_count <= 0 {
            return Err(Error::InvalidShape(format!(
                "tree count {tree_count} must be positive"
            )));
        }

        let depth = tree_depth as u32;
        let count = tree_count as usize;
        let splits = (1usize << depth) - 1;
        let leaves = 1usize << depth;

        let mut nodes = Vec::with_capacity(count * splits * 4);
        let mut preds = Vec::with_capacity(count * leaves);
        let mut thresholds = Vec::with_capacity(count);

        for _ in 0..count {
            let code = r.take(splits * 4, "node offsets")?;
            nodes.extend(code.iter().map(|&b| b as i8));
            for _ in 0..leaves {
                preds.push(r.read_f32("leaf prediction")?);
            }
            thresholds.push(r.read_f32("stage threshold")?);
        }

        Ok(Cascade {
            header,
            tree_depth: depth,
            tree_count: tree_count as u32,
            nodes,
            preds,
            thresholds,
        })
    }

    /// Read and parse a cascade file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Cascade> {
        let bytes = fs::read(path)?;
        Cascade::from_bytes(&bytes)
    }

    /// Serialize back to the binary layout accepted by [`Cascade::from_bytes`].
    pub fn to_bytes(&self) -> Vec<u8> {
        let splits = self.splits_per_tree();
        let leaves = self.leaves_per_tree();
        let per_tree = splits * 4 + (leaves + 1) * 4;
        let mut out = Vec::with_capacity(16 + self.tree_count as usize * per_tree);

        out.extend_from_slice(&self.header);
        out.extend_from_slice(&(self.tree_depth as i32).to_le_bytes());
        out.extend_from_slice(&(self.tree_count as i32).to_le_bytes());

        for t in 0..self.tree_count as usize {
            let code = &self.nodes[t * splits * 4..(t + 1) * splits * 4];
            out.extend(code.iter().map(|&v| v as u8));
            for &p in &self.preds[t * leaves..(t + 1) * leaves] {
                out.extend_from_slice(&p.to_le_bytes());
            }
            out.extend_from_slice(&self.thresholds[t].to_le_bytes());
        }

        out
    }

    pub fn tree_depth(&self) -> u32 {
        self.tree_depth
    }

    pub fn tree_count(&self) -> u32 {
        self.tree_count
    }

    fn splits_per_tree(&self) -> usize {
        (1usize << self.tree_depth) - 1
    }

    fn leaves_per_tree(&self) -> usize {
        1usize << self.tree_depth
    }

    /// Evaluate the full cascade over the window centered at `(row, col)`
    /// with side `size`, rotated in-plane by `angle` (a fraction of a full
    /// turn; values outside `[0, 1)` are reduced modulo 1).
    ///
    /// Returns the accumulated score if every stage accepts, `None` if any
    /// stage threshold rejects. Sample positions falling outside the image
    /// are clamped to the border, never an error.
    pub fn classify(
        &self,
        image: &GrayImage,
        row: i32,
        col: i32,
        size: u32,
        angle: f32,
    ) -> Option<f32> {
        let angle = angle.rem_euclid(1.0);
        if angle == 0.0 {
            self.classify_upright(image, row, col, size as i32)
        } else {
            self.classify_rotated(image, row, col, size as i32, angle)
        }
    }

    /// Unrotated path: pure integer offset arithmetic, `d = offset * s / 256`
    /// with truncating division.
    fn classify_upright(&self, image: &GrayImage, row: i32, col: i32, size: i32) -> Option<f32> {
        let splits = self.splits_per_tree();
        let leaves = self.leaves_per_tree();
        let mut score = 0.0f32;

        for t in 0..self.tree_count as usize {
            let code = &self.nodes[t * splits * 4..(t + 1) * splits * 4];

            // 1-based heap index: children of n are 2n and 2n+1, the node
            // array entry for n lives at (n - 1).
            let mut idx = 1usize;
            for _ in 0..self.tree_depth {
                let node = &code[(idx - 1) * 4..idx * 4];
                let p1 = image.pixel_clamped(
                    row + node[0] as i32 * size / 256,
                    col + node[1] as i32 * size / 256,
                );
                let p2 = image.pixel_clamped(
                    row + node[2] as i32 * size / 256,
                    col + node[3] as i32 * size / 256,
                );
                idx = 2 * idx + usize::from(p1 > p2);
            }

            score += self.preds[t * leaves + (idx - leaves)];
            if score <= self.thresholds[t] {
                return None;
            }
        }

        Some(score)
    }

    /// Rotated path: offsets are spun by `angle * 2π` before scaling. The
    /// sine/cosine pair is computed once per window, not per node.
    fn classify_rotated(
        &self,
        image: &GrayImage,
        row: i32,
        col: i32,
        size: i32,
        angle: f32,
    ) -> Option<f32> {
        let theta = angle * std::f32::consts::TAU;
        let (sin, cos) = theta.sin_cos();
        let scale = size as f32 / 256.0;

        let splits = self.splits_per_tree();
        let leaves = self.leaves_per_tree();
        let mut score = 0.0f32;

        for t in 0..self.tree_count as usize {
            let code = &self.nodes[t * splits * 4..(t + 1) * splits * 4];

            let mut idx = 1usize;
            for _ in 0..self.tree_depth {
                let node = &code[(idx - 1) * 4..idx * 4];
                let (r1, c1) = (node[0] as f32, node[1] as f32);
                let (r2, c2) = (node[2] as f32, node[3] as f32);

                let p1 = image.pixel_clamped(
                    row + ((cos * r1 - sin * c1) * scale) as i32,
                    col + ((sin * r1 + cos * c1) * scale) as i32,
                );
                let p2 = image.pixel_clamped(
                    row + ((cos * r2 - sin * c2) * scale) as i32,
                    col + ((sin * r2 + cos * c2) * scale) as i32,
                );
                idx = 2 * idx + usize::from(p1 > p2);
            }

            score += self.preds[t * leaves + (idx - leaves)];
            if score <= self.thresholds[t] {
                return None;
            }
        }

        Some(score)
    }
}
