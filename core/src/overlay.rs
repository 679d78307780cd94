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

use log::{debug, warn};

use crate::definitions::{Rect, WindowToken};
use crate::window::{OverlayLayoutParams, OverlayView, WindowManager};

/// Window token and frame the overlay is positioned by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttachment {
    pub token: WindowToken,
    pub frame: Rect,
}

struct MaterializedOverlay {
    view: Arc<dyn OverlayView>,
    params: OverlayLayoutParams,
}

/// Overlay bookkeeping of one session: enabled flag, stored attachment and the live view.
///
/// Stored attachment survives disabling so a later re-enable restores the overlay
/// without the owner re-sending it.
pub struct OverlayController {
    window_manager: Arc<dyn WindowManager>,
    enabled: bool,
    attachment: Option<WindowAttachment>,
    live: Option<MaterializedOverlay>,
}

impl OverlayController {
    pub fn new(window_manager: Arc<dyn WindowManager>) -> Self {
        Self { window_manager, enabled: false, attachment: None, live: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns false when the flag already had the requested value.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled == enabled {
            return false;
        }
        self.enabled = enabled;
        true
    }

    pub fn attachment(&self) -> Option<WindowAttachment> {
        self.attachment
    }

    pub fn store_attachment(&mut self, token: WindowToken, frame: Rect) {
        self.attachment = Some(WindowAttachment { token, frame });
    }

    /// Overlay should exist for the current flag and attachment.
    pub fn wants_view(&self) -> bool {
        self.enabled && self.attachment.is_some()
    }

    pub fn is_materialized(&self) -> bool {
        self.live.is_some()
    }

    pub fn view(&self) -> Option<&Arc<dyn OverlayView>> {
        self.live.as_ref().map(|live| &live.view)
    }

    /// Live view that the window system reports as attached.
    pub fn attached_view(&self) -> Option<&Arc<dyn OverlayView>> {
        self.view().filter(|view| view.is_attached_to_window())
    }

    /// Adds `view` to the window system at the stored attachment.
    pub fn materialize(&mut self, view: Arc<dyn OverlayView>) {
        let Some(attachment) = self.attachment else {
            warn!("Overlay view created without a window token; dropping it");
            return;
        };
        self.teardown();
        let params = OverlayLayoutParams::for_overlay(attachment.token, &attachment.frame);
        match self.window_manager.add_view(&view, &params) {
            Ok(()) => {
                debug!("Overlay view added at {} ({})", attachment.frame, attachment.token);
                self.live = Some(MaterializedOverlay { view, params });
            }
            Err(e) => warn!("Failed to add overlay view: {}", e),
        }
    }

    /// Stores the new frame and moves the live view, if any.
    pub fn relayout(&mut self, frame: Rect) {
        let Some(attachment) = self.attachment.as_mut() else {
            debug!("Relayout without window attachment ignored");
            return;
        };
        attachment.frame = frame;
        if !self.enabled {
            return;
        }
        if let Some(live) = self.live.as_mut() {
            live.params.move_to(&frame);
            self.window_manager.update_view_layout(&live.view, &live.params);
        }
    }

    /// Removes the live view. With `clear_attachment` the stored token and frame go too.
    pub fn remove(&mut self, clear_attachment: bool) {
        if clear_attachment {
            self.attachment = None;
        }
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(live) = self.live.take() {
            self.window_manager.remove_view(&live.view);
            debug!("Overlay view removed");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    fn controller() -> (Arc<FakeWindowManager>, OverlayController) {
        let wm = Arc::new(FakeWindowManager::default());
        let controller = OverlayController::new(wm.clone());
        (wm, controller)
    }

    #[test]
    fn set_enabled_is_idempotent() {
        let (_wm, mut overlay) = controller();
        assert!(!overlay.set_enabled(false));
        assert!(overlay.set_enabled(true));
        assert!(!overlay.set_enabled(true));
        assert!(overlay.is_enabled());
    }

    #[test]
    fn materialize_uses_stored_frame_and_relayout_moves_view() {
        let (wm, mut overlay) = controller();
        overlay.set_enabled(true);
        overlay.store_attachment(WindowToken(1), Rect::new(0, 0, 640, 360));
        overlay.materialize(FakeOverlayView::new(&wm, true));
        assert!(overlay.is_materialized());
        assert!(overlay.attached_view().is_some());
        assert_eq!(wm.added.lock().unwrap()[0].width, 640);

        overlay.relayout(Rect::new(10, 10, 110, 60));
        let updated = wm.updated.lock().unwrap().clone();
        assert_eq!(updated.len(), 1);
        assert_eq!((updated[0].x, updated[0].y, updated[0].width, updated[0].height), (10, 10, 100, 50));
        assert_eq!(overlay.attachment().unwrap().frame, Rect::new(10, 10, 110, 60));
    }

    #[test]
    fn remove_keeps_or_clears_attachment() {
        let (wm, mut overlay) = controller();
        overlay.set_enabled(true);
        overlay.store_attachment(WindowToken(2), Rect::new(0, 0, 10, 10));
        overlay.materialize(FakeOverlayView::new(&wm, true));

        overlay.remove(false);
        assert!(!overlay.is_materialized());
        assert!(overlay.attachment().is_some());
        assert_eq!(wm.live_count(), 0);

        overlay.remove(true);
        assert!(overlay.attachment().is_none());
        assert_eq!(*wm.removed.lock().unwrap(), 1);
    }

    #[test]
    fn rejected_view_is_not_kept() {
        let (wm, mut overlay) = controller();
        wm.reject.store(true, std::sync::atomic::Ordering::SeqCst);
        overlay.set_enabled(true);
        overlay.store_attachment(WindowToken(3), Rect::new(0, 0, 10, 10));
        overlay.materialize(FakeOverlayView::new(&wm, true));
        assert!(!overlay.is_materialized());
    }

    #[test]
    fn frames_wider_than_i32_range_are_clamped() {
        let (wm, mut overlay) = controller();
        overlay.set_enabled(true);
        let wide = Rect::new(-2_000_000_000, 0, 2_000_000_000, 10);
        overlay.store_attachment(WindowToken(4), wide);
        overlay.materialize(FakeOverlayView::new(&wm, true));
        assert_eq!(wm.added.lock().unwrap()[0].width, i32::MAX);

        overlay.relayout(Rect::new(0, -2_000_000_000, 10, 2_000_000_000));
        let updated = wm.updated.lock().unwrap().clone();
        assert_eq!(updated.len(), 1);
        assert_eq!((updated[0].width, updated[0].height), (10, i32::MAX));
        assert_eq!(overlay.attachment().unwrap().frame, Rect::new(0, -2_000_000_000, 10, 2_000_000_000));
    }

    #[test]
    fn relayout_without_attachment_is_ignored() {
        let (wm, mut overlay) = controller();
        overlay.relayout(Rect::new(0, 0, 1, 1));
        assert!(overlay.attachment().is_none());
        assert!(wm.updated.lock().unwrap().is_empty());
    }
}
