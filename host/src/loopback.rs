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

//! In-process stand-ins for the platform pieces the host talks to.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{debug, info, warn};
use tv_input_core::definitions::{Bundle, HardwareInfo, InputInfo, TrackInfo, TrackType};
use tv_input_core::errors::WindowError;
use tv_input_core::input_event::{InputEvent, InputEventFinisher, KeyCode, KeyEvent};
use tv_input_core::window::{OverlayLayoutParams, OverlayView, Surface, WindowManager};
use tv_input_core::{SessionNotifier, TvInputService, TvInputSession};

pub const INPUT_PREFIX: &str = "loopback/";

/// Backend that accepts every `loopback/` input and claims every hardware device.
pub struct LoopbackService {
    window_manager: Arc<LoggingWindowManager>,
}

impl LoopbackService {
    pub fn new(window_manager: Arc<LoggingWindowManager>) -> Self {
        Self { window_manager }
    }
}

#[async_trait]
impl TvInputService for LoopbackService {
    async fn on_create_session(&self, input_id: &str, notifier: SessionNotifier) -> Option<Box<dyn TvInputSession>> {
        if !input_id.starts_with(INPUT_PREFIX) {
            return None;
        }
        Some(Box::new(LoopbackSession { notifier, window_manager: self.window_manager.clone(), overlay: None }))
    }

    async fn on_hardware_added(&self, hardware: &HardwareInfo) -> Option<InputInfo> {
        Some(InputInfo {
            id: format!("{}hw{}", INPUT_PREFIX, hardware.device_id),
            service_name: "tv_input_host".to_string(),
            input_type: hardware.input_type,
            label: Some(format!("Loopback {}", hardware.device_id)),
        })
    }

    async fn on_hardware_removed(&self, hardware: &HardwareInfo) -> Option<String> {
        Some(format!("{}hw{}", INPUT_PREFIX, hardware.device_id))
    }
}

struct LoopbackSession {
    notifier: SessionNotifier,
    window_manager: Arc<LoggingWindowManager>,
    overlay: Option<Arc<LoggingOverlayView>>,
}

#[async_trait]
impl TvInputSession for LoopbackSession {
    async fn on_release(&mut self) {
        info!("Loopback session {} released", self.notifier.session_id());
    }

    async fn on_set_surface(&mut self, surface: Option<Arc<dyn Surface>>) -> bool {
        debug!("Loopback session surface set: {}", surface.is_some());
        true
    }

    async fn on_set_stream_volume(&mut self, volume: f32) {
        debug!("Loopback session volume {}", volume);
    }

    async fn on_tune(&mut self, channel_uri: &str) -> bool {
        let tracks = vec![
            TrackInfo::new(TrackType::Video, "v0").selected(),
            TrackInfo::new(TrackType::Audio, "a0").selected(),
        ];
        let reported = self
            .notifier
            .notify_channel_retuned(channel_uri)
            .and_then(|_| self.notifier.notify_track_info_changed(tracks))
            .and_then(|_| self.notifier.notify_video_available());
        reported.is_ok()
    }

    async fn on_set_caption_enabled(&mut self, enabled: bool) {
        debug!("Loopback session captions {}", enabled);
    }

    async fn on_app_private_command(&mut self, action: &str, data: &Bundle) {
        if let Err(e) = self.notifier.notify_session_event(action, data.clone()) {
            warn!("Loopback session {} could not echo '{}': {}", self.notifier.session_id(), action, e);
        }
    }

    fn on_create_overlay_view(&mut self) -> Option<Arc<dyn OverlayView>> {
        let window_manager = self.window_manager.clone();
        let view = self.overlay.get_or_insert_with(|| Arc::new(LoggingOverlayView::new(window_manager))).clone();
        Some(view)
    }

    fn on_key_down(&mut self, key_code: KeyCode, _event: &KeyEvent) -> bool {
        key_code == KeyCode::CHANNEL_UP || key_code == KeyCode::CHANNEL_DOWN
    }
}

/// Overlay view that completes deferred events immediately as not handled.
pub struct LoggingOverlayView {
    window_manager: Arc<LoggingWindowManager>,
    focused: AtomicBool,
}

impl LoggingOverlayView {
    pub fn new(window_manager: Arc<LoggingWindowManager>) -> Self {
        Self { window_manager, focused: AtomicBool::new(false) }
    }
}

impl OverlayView for LoggingOverlayView {
    fn is_attached_to_window(&self) -> bool {
        self.window_manager.holds(self as *const Self as *const ())
    }

    fn has_window_focus(&self) -> bool {
        self.focused.load(Ordering::SeqCst)
    }

    fn request_window_focus(&self) {
        self.focused.store(true, Ordering::SeqCst);
    }

    fn has_focusable(&self) -> bool {
        true
    }

    fn dispatch_input_event(&self, event: &InputEvent) {
        debug!("Overlay consumed {:?}", event);
    }

    fn enqueue_input_event(&self, event: InputEvent, finisher: Option<InputEventFinisher>) {
        debug!("Overlay ignored {:?}", event);
        if let Some(finisher) = finisher {
            finisher.finish(false);
        }
    }
}

/// Window manager that only logs placements.
#[derive(Default)]
pub struct LoggingWindowManager {
    live: Mutex<Vec<Arc<dyn OverlayView>>>,
}

fn view_address(view: &Arc<dyn OverlayView>) -> *const () {
    Arc::as_ptr(view) as *const ()
}

impl LoggingWindowManager {
    fn holds(&self, view: *const ()) -> bool {
        self.live.lock().map(|live| live.iter().any(|v| view_address(v) == view)).unwrap_or(false)
    }
}

impl WindowManager for LoggingWindowManager {
    fn add_view(&self, view: &Arc<dyn OverlayView>, params: &OverlayLayoutParams) -> Result<(), WindowError> {
        let mut live = self.live.lock().map_err(|e| WindowError::Other(e.to_string()))?;
        if !live.iter().any(|v| view_address(v) == view_address(view)) {
            live.push(view.clone());
        }
        info!(
            "Overlay added at ({}, {}) {}x{} for {}",
            params.x, params.y, params.width, params.height, params.token
        );
        Ok(())
    }

    fn update_view_layout(&self, _view: &Arc<dyn OverlayView>, params: &OverlayLayoutParams) {
        info!("Overlay moved to ({}, {}) {}x{}", params.x, params.y, params.width, params.height);
    }

    fn remove_view(&self, view: &Arc<dyn OverlayView>) {
        if let Ok(mut live) = self.live.lock() {
            live.retain(|v| view_address(v) != view_address(view));
        }
        info!("Overlay removed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tv_input_core::{ChannelSessionCallback, HostConfig, SessionCallbackEvent, TvInputHost};

    #[tokio::test]
    async fn rejected_echo_leaves_session_usable() {
        let _ = env_logger::builder().is_test(true).try_init();
        let window_manager = Arc::new(LoggingWindowManager::default());
        let backend = Arc::new(LoopbackService::new(window_manager.clone()));
        let host = TvInputHost::spawn(backend, window_manager, HostConfig::default());

        let (callback, mut events) = ChannelSessionCallback::new(8);
        host.client().create_session(None, Some(Arc::new(callback)), "loopback/tuner").unwrap();
        let session = match events.recv().await {
            Some(SessionCallbackEvent::SessionCreated(Some(session))) => session,
            other => panic!("expected a session, got {:?}", other),
        };

        session.app_private_command("", Bundle::new()).unwrap();
        session.app_private_command("ping", Bundle::new()).unwrap();
        match events.recv().await {
            Some(SessionCallbackEvent::SessionEvent { event_type, .. }) => assert_eq!(event_type, "ping"),
            other => panic!("expected the echoed event, got {:?}", other),
        }

        host.shutdown().await.unwrap();
    }
}
