//! Image tiling for the parallel render loop.
//!
//! The image is cut into square buckets ordered from the center outward,
//! so the middle of the frame fills in first.

use lumen_math::Color;

pub const DEFAULT_BUCKET_SIZE: u32 = 32;

/// Tile of the image handed to one worker at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// Top-left pixel
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Position in render order; also seeds the bucket's random generator
    pub index: usize,
}

impl Bucket {
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    pub fn pixel_count(&self) -> u32 {
        self.width * self.height
    }

    /// Global pixel coordinates covered by the bucket, row-major.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }

    /// Squared distance from the bucket's center to `(cx, cy)`.
    fn distance_sq(&self, cx: f32, cy: f32) -> f32 {
        let dx = self.x as f32 + self.width as f32 * 0.5 - cx;
        let dy = self.y as f32 + self.height as f32 * 0.5 - cy;
        dx * dx + dy * dy
    }
}

/// Tile a `width` x `height` image, nearest-to-center first.
///
/// Edge buckets are clipped to the image. Equidistant buckets keep their
/// row-major order.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let size = bucket_size.max(1) as usize;

    let mut buckets: Vec<Bucket> = (0..height)
        .step_by(size)
        .flat_map(|y| {
            (0..width).step_by(size).map(move |x| {
                let size = size as u32;
                Bucket::new(x, y, size.min(width - x), size.min(height - y), 0)
            })
        })
        .collect();

    let (cx, cy) = (width as f32 * 0.5, height as f32 * 0.5);
    buckets.sort_by(|a, b| a.distance_sq(cx, cy).total_cmp(&b.distance_sq(cx, cy)));

    buckets
        .into_iter()
        .enumerate()
        .map(|(index, bucket)| Bucket { index, ..bucket })
        .collect()
}

/// Finished pixels of one bucket, row-major.
#[derive(Debug, Clone)]
pub struct BucketResult {
    pub bucket: Bucket,
    pub pixels: Vec<Color>,
}

impl BucketResult {
    pub fn new(bucket: Bucket, pixels: Vec<Color>) -> Self {
        Self { bucket, pixels }
    }
}
