use bytes::BytesMut;
use fraction::ToPrimitive;
use futures_util::StreamExt;
use image::ImageBuffer;
use image::Rgb;
use log::error;
use log::info;
use log::warn;
use std::io;
use std::io::{BufRead, BufReader};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tokio_util::codec::Decoder;
use tokio_util::codec::FramedRead;

use crate::args;

pub type FrameBuffer = ImageBuffer<Rgb<u8>, Vec<u8>>;

#[derive(Copy, Clone)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Chunks the rawvideo byte stream on ffmpeg's stdout into whole frames.
pub struct VideoFrame {
    capacity: usize,
}

impl VideoFrame {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capacity: (width * height * 3) as usize,
        }
    }
}

impl Decoder for VideoFrame {
    type Error = io::Error;
    type Item = BytesMut;

    fn decode(&mut self, src: &mut bytes::BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.capacity() < self.capacity {
            src.reserve(self.capacity)
        }
        if src.len() >= self.capacity {
            Ok(Some(src.split_to(self.capacity)))
        } else {
            Ok(None)
        }
    }
}

/// One decoded rgb24 frame, reference counted so it can be fanned out to
/// several consumers without copying pixel data.
#[derive(Clone)]
pub struct FFmpegFrame {
    pub image: Arc<FrameBuffer>,
}

impl FFmpegFrame {
    pub fn new(frame_buffer: FrameBuffer) -> Self {
        Self {
            image: Arc::new(frame_buffer),
        }
    }
}

pub fn get_video_fps(video_path: &str) -> Result<f32, Box<dyn std::error::Error>> {
    let mut cmd = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=r_frame_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
            video_path,
        ])
        .stdout(Stdio::piped())
        .spawn()?;

    let stdout = cmd.stdout.as_mut().ok_or("ffprobe stdout missing")?;
    let stdout_reader = BufReader::new(stdout);
    let fps = stdout_reader
        .lines()
        .next()
        .ok_or("ffprobe produced no output")??
        .parse::<fraction::Fraction>()?;

    cmd.wait()?;

    match fps.to_f32() {
        Some(val) => Ok(val),
        None => {
            warn!("could not determine fps of video {video_path}");
            Ok(30.0)
        }
    }
}

pub fn get_video_dimensions(video_path: &str) -> Result<Dimensions, Box<dyn std::error::Error>> {
    let mut cmd = std::process::Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
            video_path,
        ])
        .stdout(Stdio::piped())
        .spawn()?;

    let stdout = cmd.stdout.as_mut().ok_or("ffprobe stdout missing")?;
    let stdout_reader = BufReader::new(stdout);
    let line = stdout_reader
        .lines()
        .next()
        .ok_or("ffprobe produced no output")??;

    cmd.wait()?;

    let (width, height) = line
        .trim()
        .split_once('x')
        .ok_or_else(|| format!("unexpected ffprobe dimensions: {line}"))?;

    Ok(Dimensions::new(width.parse()?, height.parse()?))
}

/// Grab a single frame at the given offset, for the selection preview.
pub async fn get_single_frame(
    video_path: &str,
    timestamp_in_ms: u32,
    frame_dimensions: Dimensions,
    video_filter: Option<&str>,
) -> Result<Option<FFmpegFrame>, Box<dyn std::error::Error>> {
    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-hide_banner",
        "-loglevel",
        "warning",
        "-ss",
        millisec_to_timestamp(timestamp_in_ms).as_str(),
        "-hwaccel",
        "auto",
        "-i",
        video_path,
        "-vframes",
        "1",
        "-f",
        "image2pipe",
        "-pix_fmt",
        "rgb24",
        "-fps_mode",
        "passthrough",
        "-vcodec",
        "rawvideo",
        "-an",
        "-sn",
    ]);
    if let Some(filter) = video_filter {
        cmd.args(["-vf", filter]);
    }
    cmd.arg("-");

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::null());

    let mut child = cmd.spawn()?;

    let stdout = child
        .stdout
        .take()
        .expect("ffmpeg process did not have a handle to stdout");

    tokio::spawn(async move {
        let _ = child.wait().await;
    });

    let mut reader = FramedRead::new(
        stdout,
        VideoFrame::new(frame_dimensions.width, frame_dimensions.height),
    );

    match reader.next().await {
        Some(Ok(bytes_mut_buffer)) => {
            let frame_buffer: FrameBuffer = FrameBuffer::from_raw(
                frame_dimensions.width,
                frame_dimensions.height,
                bytes_mut_buffer.to_vec(),
            )
            .expect("ffmpeg: parse frame error");
            Ok(Some(FFmpegFrame::new(frame_buffer)))
        }
        _ => Ok(None),
    }
}

pub fn millisec_to_timestamp(val: u32) -> String {
    let seconds = (val / 1000) % 60;
    let minutes = (val / (1000 * 60)) % 60;
    let hours = (val / (1000 * 60 * 60)) % 24;
    let millis = val % 1000;
    format!("{hours:0>2}:{minutes:0>2}:{seconds:0>2}.{millis:0>3}")
}

/// Stream decoded frames into every producer channel until end of stream,
/// the configured end time, or a closed consumer.
pub async fn spawn_ffmpeg_frame_reader(
    args: args::Args,
    video_dimensions: Dimensions,
    producers: Vec<tokio::sync::mpsc::Sender<FFmpegFrame>>,
) {
    let fps = get_video_fps(args.input.as_str()).unwrap_or(30.0);
    let stop_frame_count = match args.end_time {
        Some(val) => {
            let start_frame = (args.start_time * fps / 1000.0) as u32;
            let stop_frame = (val * fps / 1000.0) as u32;
            if stop_frame > start_frame {
                stop_frame - start_frame
            } else {
                0
            }
        }
        None => 0,
    };

    let mut cmd = Command::new("ffmpeg");
    cmd.args([
        "-hide_banner",
        "-loglevel",
        "warning",
        "-hwaccel",
        "auto",
        "-ss",
        millisec_to_timestamp(args.start_time as u32).as_str(),
        "-i",
        args.input.as_str(),
        "-f",
        "image2pipe",
        "-pix_fmt",
        "rgb24",
        "-vcodec",
        "rawvideo",
        "-an",
        "-sn",
    ]);
    if let Some(scale) = args.scale.as_deref() {
        cmd.args(["-vf", format!("scale={scale}").as_str()]);
    }
    cmd.arg("-");

    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::null());

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            error!("failed to spawn ffmpeg: {err}");
            return;
        }
    };

    let stdout = child
        .stdout
        .take()
        .expect("ffmpeg process did not have a handle to stdout");

    tokio::spawn(async move {
        let _ = child.wait().await;
    });

    let mut reader = FramedRead::new(
        stdout,
        VideoFrame::new(video_dimensions.width, video_dimensions.height),
    );

    info!("start ffmpeg");

    let mut frame_number = 0;
    loop {
        let bytes_mut_buffer = match reader.next().await {
            Some(Ok(buffer)) => buffer,
            Some(Err(err)) => {
                error!("ffmpeg: read error: {err}");
                break;
            }
            None => break,
        };

        let frame_buffer: FrameBuffer = FrameBuffer::from_raw(
            video_dimensions.width,
            video_dimensions.height,
            bytes_mut_buffer.to_vec(),
        )
        .expect("ffmpeg: parse frame error");
        frame_number += 1;

        if ((frame_number - 1) % (args.skip_frames + 1)) != 0 {
            continue;
        }

        if stop_frame_count > 0 && stop_frame_count < frame_number {
            info!("ffmpeg: reach specified end frame");
            break;
        }

        let mut should_exit = false;
        let ffmpeg_frame = FFmpegFrame::new(frame_buffer);
        for producer in &producers {
            if producer.send(ffmpeg_frame.clone()).await.is_err() {
                should_exit = true;
                break;
            }
        }

        if should_exit {
            break;
        }
    }

    info!("stop ffmpeg");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_are_zero_padded() {
        assert_eq!(millisec_to_timestamp(0), "00:00:00.000");
        assert_eq!(millisec_to_timestamp(1_500), "00:00:01.500");
        assert_eq!(millisec_to_timestamp(61_001), "00:01:01.001");
        assert_eq!(millisec_to_timestamp(3_600_000 + 82_042), "01:01:22.042");
    }

    #[test]
    fn decoder_emits_whole_frames_only() {
        let mut decoder = VideoFrame::new(2, 2);
        let mut src = BytesMut::new();

        src.extend_from_slice(&[1u8; 7]);
        assert!(decoder.decode(&mut src).unwrap().is_none());

        src.extend_from_slice(&[2u8; 10]);
        let frame = decoder.decode(&mut src).unwrap().unwrap();
        assert_eq!(frame.len(), 12);
        // remainder stays buffered for the next frame
        assert_eq!(src.len(), 5);
        assert!(decoder.decode(&mut src).unwrap().is_none());
    }
}
