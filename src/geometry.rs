use serde::{Deserialize, Serialize};

/// Axis aligned tracking window in frame pixel coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    pub fn fits_in(&self, frame_width: u32, frame_height: u32) -> bool {
        self.is_valid()
            && self.x >= 0
            && self.y >= 0
            && self.x + self.width <= frame_width as i32
            && self.y + self.height <= frame_height as i32
    }

    pub fn center(&self) -> mint::Point2<i32> {
        mint::Point2 {
            x: self.x + self.width / 2,
            y: self.y + self.height / 2,
        }
    }

    /// Translate so the center lands on (cx, cy), keeping dimensions.
    pub fn centered_at(&self, cx: i32, cy: i32) -> Self {
        Self {
            x: cx - self.width / 2,
            y: cy - self.height / 2,
            width: self.width,
            height: self.height,
        }
    }

    /// Force the window inside a frame of the given size. Dimensions are
    /// coerced into 1..=frame so callers always get a usable window back.
    pub fn clamp_to(&self, frame_width: u32, frame_height: u32) -> Self {
        let width = self.width.clamp(1, frame_width as i32);
        let height = self.height.clamp(1, frame_height as i32);
        Self {
            x: self.x.clamp(0, frame_width as i32 - width),
            y: self.y.clamp(0, frame_height as i32 - height),
            width,
            height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_round_trips_through_centered_at() {
        let window = Rect::new(10, 20, 30, 41);
        let moved = window.centered_at(50, 60);
        assert_eq!(moved.center(), mint::Point2 { x: 50, y: 60 });
        assert_eq!((moved.width, moved.height), (30, 41));
    }

    #[test]
    fn clamp_keeps_window_inside_frame() {
        let window = Rect::new(-5, 95, 20, 20).clamp_to(100, 100);
        assert_eq!(window, Rect::new(0, 80, 20, 20));
        assert!(window.fits_in(100, 100));
    }

    #[test]
    fn clamp_coerces_degenerate_and_oversized_windows() {
        let degenerate = Rect::new(5, 5, 0, -3).clamp_to(100, 100);
        assert!(degenerate.is_valid());

        let oversized = Rect::new(0, 0, 500, 500).clamp_to(100, 100);
        assert_eq!((oversized.width, oversized.height), (100, 100));
        assert!(oversized.fits_in(100, 100));
    }

    #[test]
    fn fits_in_rejects_windows_crossing_the_border() {
        assert!(Rect::new(0, 0, 100, 100).fits_in(100, 100));
        assert!(!Rect::new(1, 0, 100, 100).fits_in(100, 100));
        assert!(!Rect::new(-1, 0, 10, 10).fits_in(100, 100));
        assert!(!Rect::new(0, 0, 0, 10).fits_in(100, 100));
    }
}
