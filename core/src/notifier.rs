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

use crate::definitions::{check_track_sanity, Bundle, ContentRating, SessionId, TrackInfo, VideoUnavailableReason};
use crate::errors::{EngineError, ValidationError};
use crate::event_queue::TaskSender;
use crate::task::{SessionNotification, SessionOp, Task};

/// Backend-side handle for reporting session state to the client.
///
/// Arguments are validated here, before anything is queued. Rejected calls return the
/// validation error and leave no trace in the queue.
#[derive(Clone)]
pub struct SessionNotifier {
    tasks: TaskSender<Task>,
    session_id: SessionId,
}

impl SessionNotifier {
    pub(crate) fn new(tasks: TaskSender<Task>, session_id: SessionId) -> Self {
        Self { tasks, session_id }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn notify_session_event(&self, event_type: &str, args: Bundle) -> Result<(), EngineError> {
        if event_type.is_empty() {
            return Err(self.rejected(ValidationError::EmptyEventType));
        }
        self.notify(SessionNotification::SessionEvent { event_type: event_type.to_string(), args })
    }

    pub fn notify_channel_retuned(&self, channel_uri: &str) -> Result<(), EngineError> {
        self.notify(SessionNotification::ChannelRetuned(channel_uri.to_string()))
    }

    pub fn notify_track_info_changed(&self, tracks: Vec<TrackInfo>) -> Result<(), EngineError> {
        check_track_sanity(&tracks).map_err(|e| self.rejected(e))?;
        self.notify(SessionNotification::TrackInfoChanged(tracks))
    }

    pub fn notify_video_available(&self) -> Result<(), EngineError> {
        self.notify(SessionNotification::VideoAvailable)
    }

    /// `reason` is the raw code; anything outside the known reasons is rejected.
    pub fn notify_video_unavailable(&self, reason: i32) -> Result<(), EngineError> {
        let reason = VideoUnavailableReason::try_from(reason).map_err(|e| self.rejected(e))?;
        self.notify(SessionNotification::VideoUnavailable(reason))
    }

    pub fn notify_content_allowed(&self) -> Result<(), EngineError> {
        self.notify(SessionNotification::ContentAllowed)
    }

    pub fn notify_content_blocked(&self, rating: ContentRating) -> Result<(), EngineError> {
        self.notify(SessionNotification::ContentBlocked(rating))
    }

    /// Lets the backend show or hide its overlay.
    pub fn set_overlay_view_enabled(&self, enabled: bool) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::Session { session_id: self.session_id, op: SessionOp::SetOverlayViewEnabled(enabled) })
    }

    fn notify(&self, notification: SessionNotification) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::Notify { session_id: self.session_id, notification })
    }

    fn rejected(&self, error: ValidationError) -> EngineError {
        warn!("Session {}: rejected notification: {}", self.session_id, error);
        EngineError::Validation(error)
    }
}
