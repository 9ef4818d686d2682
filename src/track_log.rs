use crate::geometry::Rect;
use crate::meanshift::TrackStatus;
use log::info;
use serde::{Deserialize, Serialize};

/// One tracked frame: window, its center and how mean shift ended, stamped
/// with the source timestamp derived from fps and the effective frame step.
#[derive(Serialize, Deserialize, Debug)]
pub struct TrackEntry {
    pub frame: u32,
    pub at: u32,
    pub window: Rect,
    pub center_x: i32,
    pub center_y: i32,
    pub status: TrackStatus,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TrackLog {
    pub video_fps: f32,
    pub start_time_in_ms: f32,
    frame_step: u32,
    entries: Vec<TrackEntry>,
}

impl TrackLog {
    pub fn new(video_fps: f32, start_time_in_ms: f32, frame_step: u32) -> Self {
        Self {
            video_fps,
            start_time_in_ms,
            frame_step: frame_step.max(1),
            entries: vec![],
        }
    }

    pub fn push(&mut self, frame: u32, window: Rect, status: TrackStatus) {
        let frame_time_in_ms = 1000.0 / self.video_fps;
        let center = window.center();
        self.entries.push(TrackEntry {
            frame,
            at: (self.start_time_in_ms + frame_time_in_ms * (frame * self.frame_step) as f32)
                as u32,
            window,
            center_x: center.x,
            center_y: center.y,
            status,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let serialized = serde_json::to_string(&self)?;
        info!("save track log to {file_path}");
        std::fs::write(file_path, serialized)?;
        Ok(())
    }
}
