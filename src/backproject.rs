use crate::ffmpeg_stream::FrameBuffer;
use crate::histogram::HueHistogram;
use crate::hsv;
use image::GrayImage;

/// Per pixel likelihood of the hue model, one byte per pixel in row major
/// order. Recomputed for every frame and consumed by the mean shift step.
pub struct BackProjection {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BackProjection {
    /// Look up every pixel's hue bucket in the model.
    pub fn compute(frame: &FrameBuffer, model: &HueHistogram) -> Self {
        let (width, height) = frame.dimensions();
        let mut data = Vec::with_capacity((width * height) as usize);
        for pixel in frame.pixels() {
            let value = model.value(hsv::rgb_to_hsv(pixel).h);
            data.push(value.round().clamp(0.0, 255.0) as u8);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn likelihood(&self, x: u32, y: u32) -> u8 {
        self.data[(y * self.width + x) as usize]
    }

    /// Grayscale view for snapshots.
    pub fn to_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .expect("likelihood buffer matches frame dimensions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use image::Rgb;

    fn frame_with_square(
        width: u32,
        height: u32,
        background: Rgb<u8>,
        square: Rect,
        color: Rgb<u8>,
    ) -> FrameBuffer {
        let mut frame = FrameBuffer::from_pixel(width, height, background);
        for y in square.y..square.y + square.height {
            for x in square.x..square.x + square.width {
                frame.put_pixel(x as u32, y as u32, color);
            }
        }
        frame
    }

    #[test]
    fn model_region_lights_up_and_background_stays_dark() {
        let region = Rect::new(10, 12, 8, 6);
        let frame = frame_with_square(
            40,
            30,
            Rgb([10, 10, 200]), // blue background
            region,
            Rgb([200, 10, 10]), // red target
        );
        let model = HueHistogram::from_region(&frame, &region).unwrap();
        let map = BackProjection::compute(&frame, &model);

        assert_eq!((map.width(), map.height()), (40, 30));
        for y in 0..30 {
            for x in 0..40 {
                let inside = x >= 10 && x < 18 && y >= 12 && y < 18;
                if inside {
                    assert_eq!(map.likelihood(x, y), 255);
                } else {
                    assert_eq!(map.likelihood(x, y), 0, "background at {x},{y}");
                }
            }
        }
    }

    #[test]
    fn snapshot_image_matches_map_contents() {
        let region = Rect::new(0, 0, 4, 4);
        let frame = frame_with_square(8, 8, Rgb([10, 200, 10]), region, Rgb([200, 10, 10]));
        let model = HueHistogram::from_region(&frame, &region).unwrap();
        let image = BackProjection::compute(&frame, &model).to_image();

        assert_eq!(image.dimensions(), (8, 8));
        assert_eq!(image.get_pixel(0, 0)[0], 255);
        assert_eq!(image.get_pixel(7, 7)[0], 0);
    }
}
