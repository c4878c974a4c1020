//! CLI application for face detection.
//!
//! Usage:
//!   pico-face photo.jpg -c facefinder -o marked.png   # draw detection markers
//!   pico-face photo.jpg -c facefinder --json          # JSON output

use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use image::{Rgba, RgbaImage};
use pico_face::{cluster_detections, Cascade, CascadeParams, Detection, GrayImage};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "pico-face")]
#[command(author, version, about = "Decision-tree cascade face detection", long_about = None)]
struct Args {
    /// Input image file
    #[arg(required = true)]
    image: PathBuf,

    /// Cascade binary file
    #[arg(short, long, default_value = "facefinder")]
    cascade: PathBuf,

    /// Output image with detection markers
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Minimum size of face
    #[arg(long, default_value_t = 20)]
    min_size: u32,

    /// Maximum size of face
    #[arg(long, default_value_t = 1000)]
    max_size: u32,

    /// Shift detection window by percentage
    #[arg(long, default_value_t = 0.1)]
    shift: f32,

    /// Scale detection window by percentage
    #[arg(long, default_value_t = 1.1)]
    scale_factor: f32,

    /// Rotation angle; 0.0 is 0 radians and 1.0 is 2*pi radians
    #[arg(long, default_value_t = 0.0)]
    angle: f32,

    /// Intersection over union (IoU) threshold
    #[arg(long, default_value_t = 0.2)]
    iou: f32,

    /// Minimum cluster score for a face to be reported
    #[arg(long, default_value_t = 5.0)]
    min_score: f32,

    /// Use circle as detection marker
    #[arg(long)]
    circle: bool,

    /// Output face box coordinates as JSON
    #[arg(long)]
    json: bool,

    /// Show verbose output
    #[arg(short, long)]
    verbose: bool,
}

/// Output structure for JSON serialization
#[derive(Serialize)]
struct Report {
    image: String,
    width: u32,
    height: u32,
    faces_detected: usize,
    faces: Vec<FaceBox>,
}

#[derive(Serialize)]
struct FaceBox {
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    score: f32,
}

impl From<&Detection> for FaceBox {
    fn from(d: &Detection) -> Self {
        let half = d.scale as i32 / 2;
        Self {
            x: d.col - half,
            y: d.row - half,
            width: d.scale,
            height: d.scale,
            score: d.q,
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if args.scale_factor < 1.05 {
        return Err("scale factor must be at least 1.05".into());
    }

    if args.verbose {
        eprintln!("Loading cascade from {:?}...", args.cascade);
    }
    let cascade = Cascade::load(&args.cascade)?;
    if args.verbose {
        eprintln!(
            "Cascade: {} trees of depth {}",
            cascade.tree_count(),
            cascade.tree_depth()
        );
    }

    if args.verbose {
        eprintln!("Loading image {:?}...", args.image);
    }
    let rgba = image::open(&args.image)?.to_rgba8();
    let (width, height) = rgba.dimensions();

    let gray = rgba_to_grayscale(&rgba);
    let view = GrayImage::new(&gray, height as usize, width as usize);

    let params = CascadeParams {
        min_size: args.min_size,
        max_size: args.max_size,
        shift_factor: args.shift,
        scale_factor: args.scale_factor,
    };

    let start = Instant::now();
    let raw = cascade.run(&view, &params, args.angle);
    let clustered = cluster_detections(&raw, args.iou);
    let faces: Vec<Detection> = clustered
        .into_iter()
        .filter(|d| d.q > args.min_score)
        .collect();

    if args.verbose {
        eprintln!(
            "{} raw detections, {} face(s) above score {} in {:.2}s",
            raw.len(),
            faces.len(),
            args.min_score,
            start.elapsed().as_secs_f32()
        );
    }

    if let Some(path) = &args.output {
        let mut marked = rgba;
        for face in &faces {
            if args.circle {
                draw_circle(&mut marked, face);
            } else {
                draw_rect(&mut marked, face);
            }
        }
        marked.save(path)?;
        if args.verbose {
            eprintln!("Wrote {:?}", path);
        }
    }

    if args.json {
        let report = Report {
            image: args.image.display().to_string(),
            width,
            height,
            faces_detected: faces.len(),
            faces: faces.iter().map(FaceBox::from).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (i, face) in faces.iter().enumerate() {
            println!(
                "face {}: center ({}, {}) size {} score {:.2}",
                i + 1,
                face.col,
                face.row,
                face.scale,
                face.q
            );
        }
        if faces.is_empty() {
            println!("no faces found");
        }
    }

    Ok(())
}

/// ITU-R BT.601 luma, truncated to 8 bits.
fn rgba_to_grayscale(img: &RgbaImage) -> Vec<u8> {
    img.pixels()
        .map(|p| (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) as u8)
        .collect()
}

const MARKER: Rgba<u8> = Rgba([255, 0, 0, 255]);
const STROKE: i32 = 2;

fn put(img: &mut RgbaImage, r: i32, c: i32) {
    if r >= 0 && c >= 0 && (c as u32) < img.width() && (r as u32) < img.height() {
        img.put_pixel(c as u32, r as u32, MARKER);
    }
}

fn draw_rect(img: &mut RgbaImage, face: &Detection) {
    let half = face.scale as i32 / 2;
    let top = face.row - half;
    let left = face.col - half;
    let bot = top + face.scale as i32;
    let right = left + face.scale as i32;

    for c in left..=right {
        for t in 0..STROKE {
            put(img, top + t, c);
            put(img, bot - t, c);
        }
    }
    for r in top..=bot {
        for t in 0..STROKE {
            put(img, r, left + t);
            put(img, r, right - t);
        }
    }
}

fn draw_circle(img: &mut RgbaImage, face: &Detection) {
    let radius = face.scale as f32 / 2.0;
    let steps = (face.scale as usize * 8).max(64);

    for i in 0..steps {
        let theta = i as f32 / steps as f32 * std::f32::consts::TAU;
        for t in 0..STROKE {
            let r = radius - t as f32;
            put(
                img,
                (face.row as f32 + r * theta.sin()).round() as i32,
                (face.col as f32 + r * theta.cos()).round() as i32,
            );
        }
    }
}
