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

//! Hooks a concrete TV input implementation plugs into the host.

use std::sync::Arc;

use async_trait::async_trait;

use crate::definitions::{Bundle, CecDeviceInfo, ContentRating, HardwareInfo, InputInfo, TrackInfo};
use crate::input_event::{KeyCode, KeyEvent, MotionEvent};
use crate::notifier::SessionNotifier;
use crate::window::{OverlayView, Surface};

/// Service-level hooks: session creation and hotplug claims.
#[async_trait]
pub trait TvInputService: Send + Sync {
    /// Creates the backend half of a session for `input_id`, or `None` to refuse.
    ///
    /// The notifier stays valid for the whole session lifetime and is the only way for
    /// the backend to reach the client.
    async fn on_create_session(&self, input_id: &str, notifier: SessionNotifier) -> Option<Box<dyn TvInputSession>>;

    /// Claims a hardware device by returning the input it exposes.
    async fn on_hardware_added(&self, _hardware: &HardwareInfo) -> Option<InputInfo> {
        None
    }

    /// Returns the id of the input that went away with the device, if it was claimed.
    async fn on_hardware_removed(&self, _hardware: &HardwareInfo) -> Option<String> {
        None
    }

    async fn on_cec_device_added(&self, _device: &CecDeviceInfo) -> Option<InputInfo> {
        None
    }

    async fn on_cec_device_removed(&self, _device: &CecDeviceInfo) -> Option<String> {
        None
    }
}

/// Per-session hooks. Invoked only from the host's event queue worker, one at a time.
#[async_trait]
pub trait TvInputSession: Send {
    async fn on_release(&mut self);

    /// Returns whether the surface was accepted.
    async fn on_set_surface(&mut self, surface: Option<Arc<dyn Surface>>) -> bool;

    async fn on_set_stream_volume(&mut self, volume: f32);

    /// Starts tuning. The result is reported later through the notifier.
    async fn on_tune(&mut self, channel_uri: &str) -> bool;

    async fn on_set_caption_enabled(&mut self, enabled: bool);

    async fn on_set_main_session(&mut self, _is_main: bool) {}

    async fn on_surface_changed(&mut self, _format: i32, _width: u32, _height: u32) {}

    async fn on_unblock_content(&mut self, _rating: &ContentRating) {}

    async fn on_select_track(&mut self, _track: &TrackInfo) -> bool {
        false
    }

    async fn on_unselect_track(&mut self, _track: &TrackInfo) -> bool {
        false
    }

    async fn on_app_private_command(&mut self, _action: &str, _data: &Bundle) {}

    /// Produces the view placed above the video. Asked each time the overlay materializes.
    fn on_create_overlay_view(&mut self) -> Option<Arc<dyn OverlayView>> {
        None
    }

    fn on_key_down(&mut self, _key_code: KeyCode, _event: &KeyEvent) -> bool {
        false
    }

    fn on_key_long_press(&mut self, _key_code: KeyCode, _event: &KeyEvent) -> bool {
        false
    }

    fn on_key_multiple(&mut self, _key_code: KeyCode, _count: u32, _event: &KeyEvent) -> bool {
        false
    }

    fn on_key_up(&mut self, _key_code: KeyCode, _event: &KeyEvent) -> bool {
        false
    }

    fn on_touch_event(&mut self, _event: &MotionEvent) -> bool {
        false
    }

    fn on_trackball_event(&mut self, _event: &MotionEvent) -> bool {
        false
    }

    fn on_generic_motion_event(&mut self, _event: &MotionEvent) -> bool {
        false
    }
}
