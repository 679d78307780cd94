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

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::callback::SessionCallback;
use crate::definitions::{
    Bundle, CecDeviceInfo, ContentRating, HardwareInfo, Rect, SessionId, TrackInfo, VideoUnavailableReason,
    WindowToken,
};
use crate::input_event::{DispatchResult, InputChannel, InputEvent, InputEventFinisher};
use crate::observer::ServiceObserver;
use crate::window::Surface;

pub struct CreateSessionRequest {
    pub channel: Option<InputChannel>,
    pub callback: Arc<dyn SessionCallback>,
    pub input_id: String,
}

/// Unit of work executed by the host worker.
pub enum Task {
    RegisterObserver(Arc<dyn ServiceObserver>),
    UnregisterObserver(Arc<dyn ServiceObserver>),
    ObserverCount(oneshot::Sender<usize>),
    CreateSession(CreateSessionRequest),
    HardwareAdded(HardwareInfo),
    HardwareRemoved(HardwareInfo),
    CecDeviceAdded(CecDeviceInfo),
    CecDeviceRemoved(CecDeviceInfo),
    SetWrappedInputId { input_id: String, wrapped_input_id: String },
    Session { session_id: SessionId, op: SessionOp },
    Notify { session_id: SessionId, notification: SessionNotification },
}

/// Request addressed to one session by its client.
pub enum SessionOp {
    Release,
    SetMainSession(bool),
    SetSurface(Option<Arc<dyn Surface>>),
    SurfaceChanged { format: i32, width: u32, height: u32 },
    SetStreamVolume(f32),
    Tune(String),
    SetCaptionEnabled(bool),
    SelectTrack(TrackInfo),
    UnselectTrack(TrackInfo),
    UnblockContent(ContentRating),
    AppPrivateCommand { action: String, data: Bundle },
    SetOverlayViewEnabled(bool),
    CreateOverlayView { token: WindowToken, frame: Rect },
    RelayoutOverlayView(Rect),
    RemoveOverlayView,
    DispatchInputEvent {
        event: InputEvent,
        finisher: Option<InputEventFinisher>,
        reply: Option<oneshot::Sender<DispatchResult>>,
    },
}

/// Already validated message from a backend session to its client.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionNotification {
    SessionEvent { event_type: String, args: Bundle },
    ChannelRetuned(String),
    TrackInfoChanged(Vec<TrackInfo>),
    VideoAvailable,
    VideoUnavailable(VideoUnavailableReason),
    ContentAllowed,
    ContentBlocked(ContentRating),
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::RegisterObserver(_) => "RegisterObserver",
            Task::UnregisterObserver(_) => "UnregisterObserver",
            Task::ObserverCount(_) => "ObserverCount",
            Task::CreateSession(_) => "CreateSession",
            Task::HardwareAdded(_) => "HardwareAdded",
            Task::HardwareRemoved(_) => "HardwareRemoved",
            Task::CecDeviceAdded(_) => "CecDeviceAdded",
            Task::CecDeviceRemoved(_) => "CecDeviceRemoved",
            Task::SetWrappedInputId { .. } => "SetWrappedInputId",
            Task::Session { op, .. } => op.name(),
            Task::Notify { notification, .. } => notification.name(),
        }
    }
}

impl SessionOp {
    pub fn name(&self) -> &'static str {
        match self {
            SessionOp::Release => "Release",
            SessionOp::SetMainSession(_) => "SetMainSession",
            SessionOp::SetSurface(_) => "SetSurface",
            SessionOp::SurfaceChanged { .. } => "SurfaceChanged",
            SessionOp::SetStreamVolume(_) => "SetStreamVolume",
            SessionOp::Tune(_) => "Tune",
            SessionOp::SetCaptionEnabled(_) => "SetCaptionEnabled",
            SessionOp::SelectTrack(_) => "SelectTrack",
            SessionOp::UnselectTrack(_) => "UnselectTrack",
            SessionOp::UnblockContent(_) => "UnblockContent",
            SessionOp::AppPrivateCommand { .. } => "AppPrivateCommand",
            SessionOp::SetOverlayViewEnabled(_) => "SetOverlayViewEnabled",
            SessionOp::CreateOverlayView { .. } => "CreateOverlayView",
            SessionOp::RelayoutOverlayView(_) => "RelayoutOverlayView",
            SessionOp::RemoveOverlayView => "RemoveOverlayView",
            SessionOp::DispatchInputEvent { .. } => "DispatchInputEvent",
        }
    }
}

impl SessionNotification {
    pub fn name(&self) -> &'static str {
        match self {
            SessionNotification::SessionEvent { .. } => "SessionEvent",
            SessionNotification::ChannelRetuned(_) => "ChannelRetuned",
            SessionNotification::TrackInfoChanged(_) => "TrackInfoChanged",
            SessionNotification::VideoAvailable => "VideoAvailable",
            SessionNotification::VideoUnavailable(_) => "VideoUnavailable",
            SessionNotification::ContentAllowed => "ContentAllowed",
            SessionNotification::ContentBlocked(_) => "ContentBlocked",
        }
    }
}
