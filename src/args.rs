use clap::Parser;

use crate::ffmpeg_stream::Dimensions;
use crate::geometry::Rect;

#[derive(Clone, Parser)]
#[clap(
    name = "huetrack-rs",
    about = "Hue Histogram Mean Shift Tracker",
    version,
    author
)]
pub struct Args {
    /// Path to Video File
    #[clap(short = 'i', long = "input")]
    pub input: String,

    /// Output directory for previews, snapshots and the track log
    #[clap(short = 'o', long = "output", default_value = "out")]
    pub output: String,

    /// Start time in milliseconds
    #[clap(short = 's', long = "start", default_value = "0")]
    pub start_time: f32,

    /// End time in milliseconds
    #[clap(short = 'e', long = "end")]
    pub end_time: Option<f32>,

    /// Skip Frames
    #[clap(short = 'k', long = "skip", default_value = "0")]
    pub skip_frames: u32,

    /// Preview only given frames
    #[clap(long = "preview", default_value = "1")]
    pub preview_frames: u32,

    /// Initial tracking window as 'x,y,w,h' (interactive selection when omitted)
    #[clap(short = 'r', long = "roi")]
    pub roi: Option<String>,

    /// Scale decoded frames to 'W:H' before tracking
    #[clap(short = 'f', long = "scale")]
    pub scale: Option<String>,

    /// Rebuild the hue model from the tracked window on every frame
    #[clap(long = "refresh-model")]
    pub refresh_model: bool,

    /// Mean shift iteration cap per frame
    #[clap(long = "max-iterations", default_value = "10")]
    pub max_iterations: u32,

    /// Stop mean shift once the window moves less than this many pixels
    #[clap(long = "min-shift", default_value = "1.0")]
    pub min_shift: f64,

    /// Write the per-frame track log to this file
    #[clap(short = 't', long = "track-log")]
    pub track_log: Option<String>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

pub fn parse_roi(value: &str) -> Option<Rect> {
    let parts = value
        .split(',')
        .map(|part| part.trim().parse::<i32>().ok())
        .collect::<Option<Vec<i32>>>()?;
    match parts.as_slice() {
        [x, y, width, height] => Some(Rect::new(*x, *y, *width, *height)),
        _ => None,
    }
}

pub fn parse_scale(value: &str) -> Option<Dimensions> {
    let (width, height) = value.split_once(':')?;
    let width = width.trim().parse::<u32>().ok()?;
    let height = height.trim().parse::<u32>().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Dimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roi_strings_parse_into_windows() {
        assert_eq!(parse_roi("10,20,30,40"), Some(Rect::new(10, 20, 30, 40)));
        assert_eq!(parse_roi(" 1, 2, 3, 4 "), Some(Rect::new(1, 2, 3, 4)));
        assert_eq!(parse_roi("10,20,30"), None);
        assert_eq!(parse_roi("10,20,30,40,50"), None);
        assert_eq!(parse_roi("a,b,c,d"), None);
    }

    #[test]
    fn scale_strings_parse_into_dimensions() {
        let dimensions = parse_scale("640:480").unwrap();
        assert_eq!((dimensions.width, dimensions.height), (640, 480));
        assert!(parse_scale("640x480").is_none());
        assert!(parse_scale("0:480").is_none());
        assert!(parse_scale("640:").is_none());
    }
}
