use crate::backproject::BackProjection;
use crate::ffmpeg_stream::FFmpegFrame;
use crate::geometry::Rect;
use crate::histogram::{HueHistogram, ModelError};
use crate::meanshift::{self, TermCriteria, TrackStatus};
use log::error;
use log::info;
use log::warn;

/// One tracking result per consumed frame.
pub struct TrackUpdate {
    pub window: Rect,
    pub status: TrackStatus,
    pub backprojection: BackProjection,
}

#[derive(Copy, Clone)]
pub struct TrackConfig {
    pub criteria: TermCriteria,
    pub refresh_model: bool,
}

/// Track one target: the first received frame primes the hue model over
/// `init_box`, every later frame is back projected and mean shifted.
/// Emits exactly one update per post-init frame.
pub async fn track_feature(
    init_box: Rect,
    config: TrackConfig,
    mut consumer: tokio::sync::mpsc::Receiver<FFmpegFrame>,
    producer: tokio::sync::mpsc::Sender<TrackUpdate>,
) {
    let Some(init_frame) = consumer.recv().await else {
        error!("init frame missing");
        return;
    };

    let mut model = match HueHistogram::from_region(&init_frame.image, &init_box) {
        Ok(model) => model,
        Err(err) => {
            error!("tracker setup failed: {err}");
            return;
        }
    };
    info!("hue model ready, peak bucket {}", model.peak_hue());

    let mut window = init_box;
    while let Some(frame) = consumer.recv().await {
        let map = BackProjection::compute(&frame.image, &model);
        let (tracked, status) = meanshift::mean_shift(&map, &window, &config.criteria);
        if status == TrackStatus::Lost {
            warn!("no likelihood mass under window, keeping previous location");
        }
        window = tracked;

        if config.refresh_model {
            match HueHistogram::from_region(&frame.image, &window) {
                Ok(refreshed) => model = refreshed,
                Err(ModelError::EmptyRegion) => {
                    // window drifted onto unreliable pixels, keep the old model
                    warn!("empty reference region, model not refreshed");
                }
                Err(err) => warn!("model refresh failed: {err}"),
            }
        }

        let update = TrackUpdate {
            window,
            status,
            backprojection: map,
        };
        if producer.send(update).await.is_err() {
            error!("tracker: error adding update to process queue");
            break;
        }
    }
}
