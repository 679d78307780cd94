// Copyright 2025 HEM Sp. z o.o.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use log::warn;
use tokio::sync::mpsc;

use crate::definitions::{Bundle, TrackInfo, VideoUnavailableReason};
use crate::errors::TransportError;
use crate::host::SessionHandle;

/// Reply channel of the client that requested a session.
///
/// All calls are one-way. A failure is logged by the caller and otherwise ignored.
pub trait SessionCallback: Send + Sync {
    /// Sent exactly once per creation request. `None` means the backend refused.
    fn on_session_created(&self, session: Option<SessionHandle>) -> Result<(), TransportError>;

    fn on_session_event(&self, event_type: &str, args: &Bundle) -> Result<(), TransportError>;

    fn on_channel_retuned(&self, channel_uri: &str) -> Result<(), TransportError>;

    fn on_track_info_changed(&self, tracks: &[TrackInfo]) -> Result<(), TransportError>;

    fn on_video_available(&self) -> Result<(), TransportError>;

    fn on_video_unavailable(&self, reason: VideoUnavailableReason) -> Result<(), TransportError>;

    fn on_content_allowed(&self) -> Result<(), TransportError>;

    fn on_content_blocked(&self, rating: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone)]
pub enum SessionCallbackEvent {
    SessionCreated(Option<SessionHandle>),
    SessionEvent { event_type: String, args: Bundle },
    ChannelRetuned(String),
    TrackInfoChanged(Vec<TrackInfo>),
    VideoAvailable,
    VideoUnavailable(VideoUnavailableReason),
    ContentAllowed,
    ContentBlocked(String),
}

/// Callback pushing every notification into a bounded queue read by the client.
pub struct ChannelSessionCallback {
    tx: mpsc::Sender<SessionCallbackEvent>,
}

impl ChannelSessionCallback {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<SessionCallbackEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn deliver(&self, event: SessionCallbackEvent) -> Result<(), TransportError> {
        self.tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => {
                warn!("Session callback queue full, dropping {:?}", event);
                TransportError::QueueFull
            }
            mpsc::error::TrySendError::Closed(_) => TransportError::PeerGone,
        })
    }
}

impl SessionCallback for ChannelSessionCallback {
    fn on_session_created(&self, session: Option<SessionHandle>) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::SessionCreated(session))
    }

    fn on_session_event(&self, event_type: &str, args: &Bundle) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::SessionEvent { event_type: event_type.to_string(), args: args.clone() })
    }

    fn on_channel_retuned(&self, channel_uri: &str) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::ChannelRetuned(channel_uri.to_string()))
    }

    fn on_track_info_changed(&self, tracks: &[TrackInfo]) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::TrackInfoChanged(tracks.to_vec()))
    }

    fn on_video_available(&self) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::VideoAvailable)
    }

    fn on_video_unavailable(&self, reason: VideoUnavailableReason) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::VideoUnavailable(reason))
    }

    fn on_content_allowed(&self) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::ContentAllowed)
    }

    fn on_content_blocked(&self, rating: &str) -> Result<(), TransportError> {
        self.deliver(SessionCallbackEvent::ContentBlocked(rating.to_string()))
    }
}
