//! Chart color theme

use super::Rgb;

pub const BLACK: Rgb = Rgb::rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb::rgb(255, 255, 255);
pub const LIGHT_GRAY: Rgb = Rgb::rgb(192, 192, 192);

// Process strip
pub const RUNNING: Rgb = Rgb::rgb(255, 0, 0);
pub const RUNNING_SHORT: Rgb = Rgb::rgb(128, 0, 0);
pub const WAITING: Rgb = Rgb::rgb(0, 255, 255);
pub const WAITING_SHORT: Rgb = Rgb::rgb(0, 128, 128);
pub const DISK_WAIT: Rgb = Rgb::rgb(255, 255, 0);

// Parallel-process band chart
pub const BAND_MIN: Rgb = Rgb::rgb(255, 0, 0);
pub const BAND_MAX: Rgb = Rgb::rgb(128, 0, 0);
pub const GUIDELINE: Rgb = Rgb::rgb(255, 255, 255).with_alpha(128);

/// Histogram bar color: green for few parallel processes, red for many
#[must_use]
pub fn bar_color(bucket: usize, buckets: usize) -> Rgb {
    let buckets = buckets.max(1);
    let bucket = bucket.min(buckets);
    // Both values are at most 255
    #[allow(clippy::cast_possible_truncation)]
    let channel = |n: usize| (n * 255 / buckets) as u8;
    Rgb::rgb(channel(bucket), channel(buckets - bucket), 0)
}
