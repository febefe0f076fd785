// Stream selection - pure decision over a provider catalog

use crate::errors::DownloadError;
use crate::models::{DownloadKind, DownloadPlan, StreamDescriptor, StreamKind};

/// Pick the best download plan for the desired kind.
///
/// Video: highest separate video stream paired with the highest-bitrate
/// audio stream when their ids differ (platforms reserve top resolutions for
/// split delivery), otherwise the highest-resolution progressive stream.
/// Audio: highest-bitrate audio-only stream.
///
/// Ties resolve to the first stream in catalog order, so selection is
/// deterministic for a fixed catalog.
pub fn select_plan(
    streams: &[StreamDescriptor],
    kind: DownloadKind,
) -> Result<DownloadPlan, DownloadError> {
    match kind {
        DownloadKind::Audio => best_audio(streams)
            .map(|s| DownloadPlan::Single(s.clone()))
            .ok_or(DownloadError::NoStreamFound("audio")),
        DownloadKind::Video => {
            let video = best_by_key(streams, StreamKind::VideoOnly, |s| s.resolution());
            let audio = best_audio(streams);

            if let (Some(v), Some(a)) = (video, audio) {
                if v.id != a.id {
                    return Ok(DownloadPlan::Split {
                        video: v.clone(),
                        audio: a.clone(),
                    });
                }
            }

            best_by_key(streams, StreamKind::Progressive, |s| s.resolution())
                .map(|s| DownloadPlan::Single(s.clone()))
                .ok_or(DownloadError::NoStreamFound("video"))
        }
    }
}

fn best_audio(streams: &[StreamDescriptor]) -> Option<&StreamDescriptor> {
    best_by_key(streams, StreamKind::AudioOnly, |s| s.bitrate_key())
}

/// Highest-keyed stream of `kind`; first one wins on ties
fn best_by_key<F>(streams: &[StreamDescriptor], kind: StreamKind, key: F) -> Option<&StreamDescriptor>
where
    F: Fn(&StreamDescriptor) -> u32,
{
    let mut best: Option<&StreamDescriptor> = None;
    for s in streams.iter().filter(|s| s.kind == kind) {
        match best {
            Some(b) if key(s) <= key(b) => {}
            _ => best = Some(s),
        }
    }
    best
}
