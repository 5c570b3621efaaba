use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Which tracks a participant's capture device supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaProfile {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaProfile {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug)]
struct Track {
    kind: TrackKind,
    enabled: AtomicBool,
}

/// A captured audio/video stream.
///
/// Contents are never inspected; only track presence and the per-track
/// enabled flag are visible. Shared between every connection that sends or
/// renders it, so flag changes are seen by all holders.
#[derive(Debug)]
pub struct MediaStream {
    id: String,
    tracks: Vec<Track>,
}

pub type StreamHandle = Arc<MediaStream>;

impl MediaStream {
    pub fn new(id: impl Into<String>, profile: MediaProfile) -> StreamHandle {
        let mut tracks = Vec::with_capacity(2);
        if profile.audio {
            tracks.push(Track {
                kind: TrackKind::Audio,
                enabled: AtomicBool::new(true),
            });
        }
        if profile.video {
            tracks.push(Track {
                kind: TrackKind::Video,
                enabled: AtomicBool::new(true),
            });
        }

        Arc::new(Self {
            id: id.into(),
            tracks,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn has_track(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }

    /// `None` when the stream carries no track of that kind.
    pub fn is_enabled(&self, kind: TrackKind) -> Option<bool> {
        self.tracks
            .iter()
            .find(|t| t.kind == kind)
            .map(|t| t.enabled.load(Ordering::Acquire))
    }

    /// Sets the enabled flag on every track of `kind`. Returns whether any
    /// track was touched.
    pub fn set_enabled(&self, kind: TrackKind, enabled: bool) -> bool {
        let mut touched = false;
        for track in self.tracks.iter().filter(|t| t.kind == kind) {
            track.enabled.store(enabled, Ordering::Release);
            touched = true;
        }
        touched
    }
}
