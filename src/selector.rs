use crate::geometry::Rect;

/// Completed or in-flight drag gestures reported by a front end.
#[derive(Copy, Clone, Debug)]
pub enum MouseEvent {
    ButtonDown { x: i32, y: i32 },
    ButtonUp { x: i32, y: i32 },
}

/// Drag state for region selection. A press anchors one corner and
/// invalidates any previous selection, the matching release fixes the
/// opposite corner. The reported region is normalized to its top left
/// corner with absolute dimensions, whatever direction the drag went.
#[derive(Default)]
pub struct RegionSelector {
    anchor: Option<mint::Point2<i32>>,
    region: Option<Rect>,
}

impl RegionSelector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_event(&mut self, event: MouseEvent) {
        match event {
            MouseEvent::ButtonDown { x, y } => {
                self.anchor = Some(mint::Point2 { x, y });
                self.region = None;
            }
            MouseEvent::ButtonUp { x, y } => {
                let Some(anchor) = self.anchor else {
                    return;
                };
                self.region = Some(Rect::new(
                    anchor.x.min(x),
                    anchor.y.min(y),
                    (x - anchor.x).abs(),
                    (y - anchor.y).abs(),
                ));
            }
        }
    }

    pub fn is_defined(&self) -> bool {
        self.region.is_some()
    }

    pub fn region(&self) -> Option<Rect> {
        self.region
    }
}
