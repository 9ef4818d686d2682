use crate::backproject::BackProjection;
use crate::ffmpeg_stream::{FFmpegFrame, FrameBuffer};
use crate::geometry::Rect;
use crate::selector::{MouseEvent, RegionSelector};
use image::Rgb;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect as DrawRect;
use log::error;
use log::info;
use std::io::BufRead;
use std::io::Write;
use std::path::Path;
use tokio::io::AsyncBufReadExt;

const SELECTION_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const TRACKING_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
const BOX_THICKNESS: i32 = 2;

/// Single key commands polled by the main loop.
#[derive(Copy, Clone, Debug)]
pub enum KeyCommand {
    Quit,
    Save,
}

/// Read key commands off stdin in the background: `q` stops the run,
/// `s` saves a snapshot of the current frame.
pub fn spawn_key_listener() -> tokio::sync::mpsc::Receiver<KeyCommand> {
    let (tx, rx) = tokio::sync::mpsc::channel(8);
    tokio::spawn(async move {
        let stdin = tokio::io::stdin();
        let mut lines = tokio::io::BufReader::new(stdin).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let command = match line.trim() {
                "q" => Some(KeyCommand::Quit),
                "s" => Some(KeyCommand::Save),
                _ => None,
            };
            if let Some(command) = command {
                if tx.send(command).await.is_err() {
                    break;
                }
            }
        }
    });
    rx
}

/// Interactive replacement for a mouse drag: the preview frame is written to
/// disk and the drag corners are read from stdin as `x,y` pairs, fed through
/// the selector until a usable region comes out.
pub fn select_region(frame: &FFmpegFrame, preview_path: &Path) -> Option<Rect> {
    if let Err(err) = frame.image.save(preview_path) {
        error!("could not write selection preview: {err}");
        return None;
    }
    info!("selection preview written to {}", preview_path.display());
    println!("Select the tracking region on {}", preview_path.display());

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    let mut selector = RegionSelector::new();
    loop {
        let press = read_point(&mut lines, "press corner x,y: ")?;
        selector.on_event(MouseEvent::ButtonDown {
            x: press.0,
            y: press.1,
        });
        let release = read_point(&mut lines, "release corner x,y: ")?;
        selector.on_event(MouseEvent::ButtonUp {
            x: release.0,
            y: release.1,
        });

        match selector.region() {
            Some(region) if region.is_valid() => {
                let mut canvas = (*frame.image).clone();
                draw_tracking_box(&mut canvas, &region, SELECTION_COLOR);
                if let Err(err) = canvas.save(preview_path) {
                    error!("could not update selection preview: {err}");
                }
                return Some(region);
            }
            _ => error!("Invalid Input"),
        }
    }
}

fn read_point(
    lines: &mut dyn Iterator<Item = std::io::Result<String>>,
    prompt: &str,
) -> Option<(i32, i32)> {
    loop {
        print!("{prompt}");
        let _ = std::io::stdout().flush();
        let line = match lines.next() {
            Some(Ok(line)) => line,
            _ => return None,
        };
        match parse_point(line.as_str()) {
            Some(point) => return Some(point),
            None => error!("Invalid Input"),
        }
    }
}

fn parse_point(line: &str) -> Option<(i32, i32)> {
    let (x, y) = line.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

pub fn draw_tracking_box(canvas: &mut FrameBuffer, window: &Rect, color: Rgb<u8>) {
    if !window.is_valid() {
        return;
    }
    for inset in 0..BOX_THICKNESS {
        let width = window.width - 2 * inset;
        let height = window.height - 2 * inset;
        if width <= 0 || height <= 0 {
            break;
        }
        draw_hollow_rect_mut(
            canvas,
            DrawRect::at(window.x + inset, window.y + inset)
                .of_size(width as u32, height as u32),
            color,
        );
    }
}

pub fn annotated_frame(frame: &FFmpegFrame, window: &Rect) -> FrameBuffer {
    let mut canvas = (*frame.image).clone();
    draw_tracking_box(&mut canvas, window, TRACKING_COLOR);
    canvas
}

/// Non blocking "display": rewrite the preview image in the output
/// directory so it can be watched while the run progresses.
pub fn write_preview(out_dir: &Path, canvas: &FrameBuffer) -> Result<(), image::ImageError> {
    canvas.save(out_dir.join("preview.png"))
}

/// Save the annotated frame and its back projection map, numbered like the
/// frames of the sequence.
pub fn save_snapshot(
    out_dir: &Path,
    frame_number: u32,
    canvas: &FrameBuffer,
    map: &BackProjection,
) -> Result<(), image::ImageError> {
    let frame_path = out_dir.join(format!("Frame_{frame_number:04}.png"));
    canvas.save(&frame_path)?;
    map.to_image()
        .save(out_dir.join(format!("Frame_dst_{frame_number:04}.png")))?;
    info!("saved snapshot {}", frame_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_lines_parse_or_reject() {
        assert_eq!(parse_point("10,20"), Some((10, 20)));
        assert_eq!(parse_point(" 10 , 20 "), Some((10, 20)));
        assert_eq!(parse_point("10 20"), None);
        assert_eq!(parse_point("10,"), None);
        assert_eq!(parse_point("x,y"), None);
    }

    #[test]
    fn tracking_box_is_drawn_two_pixels_thick() {
        let mut canvas = FrameBuffer::from_pixel(32, 32, Rgb([0, 0, 0]));
        let window = Rect::new(8, 8, 10, 10);
        draw_tracking_box(&mut canvas, &window, TRACKING_COLOR);

        assert_eq!(*canvas.get_pixel(8, 8), TRACKING_COLOR);
        assert_eq!(*canvas.get_pixel(9, 9), TRACKING_COLOR);
        // interior and exterior untouched
        assert_eq!(*canvas.get_pixel(10, 10), Rgb([0, 0, 0]));
        assert_eq!(*canvas.get_pixel(7, 7), Rgb([0, 0, 0]));
        // far edge of the window
        assert_eq!(*canvas.get_pixel(17, 17), TRACKING_COLOR);
        assert_eq!(*canvas.get_pixel(16, 16), TRACKING_COLOR);
    }

    #[test]
    fn degenerate_windows_are_not_drawn() {
        let mut canvas = FrameBuffer::from_pixel(8, 8, Rgb([0, 0, 0]));
        draw_tracking_box(&mut canvas, &Rect::new(2, 2, 0, 5), TRACKING_COLOR);
        assert!(canvas.pixels().all(|pixel| *pixel == Rgb([0, 0, 0])));
    }
}
