mod args;
mod backproject;
mod ffmpeg_stream;
mod geometry;
mod histogram;
mod hsv;
mod logging;
mod meanshift;
mod selector;
mod track_log;
mod tracker;
mod ui;

use log::error;
use log::info;
use std::path::Path;

const CHANNEL_CAPACITY: usize = 64;

#[tokio::main(worker_threads = 4)]
async fn main() {
    let args = args::parse_args();

    logging::setup_logging();

    let Ok(video_fps) = ffmpeg_stream::get_video_fps(args.input.as_str()) else {
        error!("Could not determine video fps");
        return;
    };

    let video_dimensions = match args.scale.as_deref() {
        Some(value) => match args::parse_scale(value) {
            Some(dimensions) => dimensions,
            None => {
                error!("Invalid scale '{value}', expected W:H");
                return;
            }
        },
        None => match ffmpeg_stream::get_video_dimensions(args.input.as_str()) {
            Ok(dimensions) => dimensions,
            Err(err) => {
                error!("Could not determine video dimensions: {err}");
                return;
            }
        },
    };

    let out_dir = Path::new(args.output.as_str());
    if let Err(err) = std::fs::create_dir_all(out_dir) {
        error!("Could not create output directory {}: {err}", args.output);
        return;
    }

    let video_filter = args.scale.as_deref().map(|s| format!("scale={s}"));
    let preview_frame = match ffmpeg_stream::get_single_frame(
        args.input.as_str(),
        args.start_time as u32,
        video_dimensions,
        video_filter.as_deref(),
    )
    .await
    {
        Ok(Some(frame)) => frame,
        _ => {
            error!("Extract preview frame failed");
            return;
        }
    };

    let init_box = match args.roi.as_deref() {
        Some(value) => match args::parse_roi(value) {
            Some(roi) => roi,
            None => {
                error!("Invalid ROI '{value}', expected x,y,w,h");
                return;
            }
        },
        None => {
            let Some(roi) =
                ui::select_region(&preview_frame, out_dir.join("selection.png").as_path())
            else {
                error!("No tracking region selected");
                return;
            };
            roi
        }
    };

    if !init_box.fits_in(video_dimensions.width, video_dimensions.height) {
        error!(
            "Tracking window {init_box:?} does not fit a {}x{} frame",
            video_dimensions.width, video_dimensions.height
        );
        return;
    }
    info!("tracking {init_box:?} in {}", args.input);

    let (tracker_frame_tx, tracker_frame_rx) =
        tokio::sync::mpsc::channel::<ffmpeg_stream::FFmpegFrame>(CHANNEL_CAPACITY);
    let (display_frame_tx, mut frame_rx) =
        tokio::sync::mpsc::channel::<ffmpeg_stream::FFmpegFrame>(CHANNEL_CAPACITY);
    let (tracking_tx, mut tracking_rx) =
        tokio::sync::mpsc::channel::<tracker::TrackUpdate>(CHANNEL_CAPACITY);

    let ffmpeg_args = args.clone();
    tokio::spawn(ffmpeg_stream::spawn_ffmpeg_frame_reader(
        ffmpeg_args,
        video_dimensions,
        vec![tracker_frame_tx, display_frame_tx],
    ));

    let config = tracker::TrackConfig {
        criteria: meanshift::TermCriteria {
            max_iterations: args.max_iterations.max(1),
            min_shift: args.min_shift,
        },
        refresh_model: args.refresh_model,
    };
    tokio::spawn(tracker::track_feature(
        init_box,
        config,
        tracker_frame_rx,
        tracking_tx,
    ));

    // the first frame only primes the tracker's hue model
    let Some(_init_frame) = frame_rx.recv().await else {
        error!("Extract first frame failed");
        return;
    };

    let mut key_rx = ui::spawn_key_listener();
    let mut log = track_log::TrackLog::new(video_fps, args.start_time, args.skip_frames + 1);
    let preview_frames = args.preview_frames.max(1);

    let start_time = std::time::Instant::now();
    let mut frame_counter: u32 = 0;
    while let Some(frame) = frame_rx.recv().await {
        frame_counter += 1;

        let Some(update) = tracking_rx.recv().await else {
            error!("Tracking update missing");
            break;
        };

        log.push(frame_counter, update.window, update.status);

        let mut stop = false;
        let mut save = false;
        while let Ok(command) = key_rx.try_recv() {
            match command {
                ui::KeyCommand::Quit => stop = true,
                ui::KeyCommand::Save => save = true,
            }
        }

        let preview_due = ((frame_counter - 1) % preview_frames) == 0;
        if save || preview_due {
            let canvas = ui::annotated_frame(&frame, &update.window);
            if save {
                if let Err(err) =
                    ui::save_snapshot(out_dir, frame_counter, &canvas, &update.backprojection)
                {
                    error!("Snapshot failed: {err}");
                }
            }
            if preview_due {
                let fps = frame_counter as u128 * 1000 / start_time.elapsed().as_millis().max(1);
                if let Err(err) = ui::write_preview(out_dir, &canvas) {
                    error!("Preview failed: {err}");
                }
                info!("frame {frame_counter}: {:?} at {fps} fps", update.window);
            }
        }

        if stop {
            info!("stop requested by user");
            break;
        }
    }

    if let Some(path) = args.track_log.as_deref() {
        if let Err(err) = log.save(path) {
            error!("Unable to write track log: {err}");
        }
    }

    info!("tracked {} frames", log.len());
}
