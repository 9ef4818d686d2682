use crate::ffmpeg_stream::FrameBuffer;
use crate::geometry::Rect;
use crate::hsv;
use thiserror::Error;

/// Quantized hue buckets, one per half degree.
pub const HUE_BINS: usize = 180;

/// The largest bucket is rescaled to this value, everything else follows
/// proportionally.
pub const NORM_CEILING: f32 = 255.0;

/// Pixels outside these saturation/value bounds carry no reliable hue and
/// are excluded from the model.
pub const SAT_MIN: u8 = 30;
pub const VAL_MIN: u8 = 20;
pub const VAL_MAX: u8 = 235;

#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("reference region contains no pixels with reliable hue")]
    EmptyRegion,
    #[error("reference region {0:?} is degenerate or outside the frame")]
    InvalidRegion(Rect),
}

/// Normalized hue histogram of the reference region.
#[derive(Clone, Debug)]
pub struct HueHistogram {
    bins: [f32; HUE_BINS],
}

impl HueHistogram {
    /// Tally the masked pixels inside `region` and normalize the result.
    pub fn from_region(frame: &FrameBuffer, region: &Rect) -> Result<Self, ModelError> {
        if !region.fits_in(frame.width(), frame.height()) {
            return Err(ModelError::InvalidRegion(*region));
        }

        let mut counts = [0u32; HUE_BINS];
        let mut valid_pixels = 0u32;
        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let pixel = hsv::rgb_to_hsv(frame.get_pixel(x as u32, y as u32));
                if !hue_reliable(&pixel) {
                    continue;
                }
                counts[pixel.h as usize] += 1;
                valid_pixels += 1;
            }
        }

        if valid_pixels == 0 {
            return Err(ModelError::EmptyRegion);
        }

        let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f32;
        let mut bins = [0f32; HUE_BINS];
        for (bin, count) in bins.iter_mut().zip(counts) {
            *bin = count as f32 * NORM_CEILING / peak;
        }

        Ok(Self { bins })
    }

    /// Bucket value for one quantized hue.
    pub fn value(&self, hue: u8) -> f32 {
        self.bins[hue as usize % HUE_BINS]
    }

    /// Bucket with the most mass, handy for logging what got locked onto.
    pub fn peak_hue(&self) -> u8 {
        let mut peak = 0usize;
        for (bucket, value) in self.bins.iter().enumerate() {
            if *value > self.bins[peak] {
                peak = bucket;
            }
        }
        peak as u8
    }
}

fn hue_reliable(pixel: &hsv::Hsv) -> bool {
    pixel.s >= SAT_MIN && pixel.v >= VAL_MIN && pixel.v <= VAL_MAX
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid_frame(width: u32, height: u32, color: Rgb<u8>) -> FrameBuffer {
        FrameBuffer::from_pixel(width, height, color)
    }

    #[test]
    fn solid_region_concentrates_mass_in_one_bucket() {
        // saturated red, bucket 0
        let frame = solid_frame(32, 32, Rgb([200, 10, 10]));
        let model = HueHistogram::from_region(&frame, &Rect::new(4, 4, 8, 8)).unwrap();

        assert_eq!(model.value(0), NORM_CEILING);
        assert_eq!(model.peak_hue(), 0);
        for hue in 1..HUE_BINS as u8 {
            assert_eq!(model.value(hue), 0.0, "bucket {hue} should be empty");
        }
    }

    #[test]
    fn proportions_survive_normalization() {
        // two thirds green, one third blue inside the region
        let mut frame = solid_frame(6, 3, Rgb([0, 220, 0]));
        for y in 0..3 {
            for x in 0..2 {
                frame.put_pixel(x, y, Rgb([0, 0, 220]));
            }
        }
        let model = HueHistogram::from_region(&frame, &Rect::new(0, 0, 6, 3)).unwrap();

        assert_eq!(model.value(60), NORM_CEILING);
        assert!((model.value(120) - NORM_CEILING / 2.0).abs() < 0.01);
    }

    #[test]
    fn fully_masked_region_is_reported_empty() {
        // everything below the value floor
        let frame = solid_frame(16, 16, Rgb([5, 5, 5]));
        let result = HueHistogram::from_region(&frame, &Rect::new(0, 0, 16, 16));
        assert_eq!(result.unwrap_err(), ModelError::EmptyRegion);

        // gray is bright enough but has no saturation
        let frame = solid_frame(16, 16, Rgb([128, 128, 128]));
        let result = HueHistogram::from_region(&frame, &Rect::new(0, 0, 16, 16));
        assert_eq!(result.unwrap_err(), ModelError::EmptyRegion);
    }

    #[test]
    fn degenerate_or_out_of_frame_regions_are_rejected() {
        let frame = solid_frame(16, 16, Rgb([200, 10, 10]));
        for region in [
            Rect::new(0, 0, 0, 8),
            Rect::new(-1, 0, 8, 8),
            Rect::new(12, 12, 8, 8),
        ] {
            let result = HueHistogram::from_region(&frame, &region);
            assert_eq!(result.unwrap_err(), ModelError::InvalidRegion(region));
        }
    }
}
