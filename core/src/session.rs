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

//! Host-side state of one session and the rules binding it to its backend.
//!
//! A [`Session`] is only ever touched by the host worker, so none of its methods lock.
//! Everything the client or the backend asks for arrives here as a [`SessionOp`] or a
//! [`SessionNotification`] popped from the event queue.

use std::sync::Arc;

use log::{debug, info, warn};

use crate::backend::TvInputSession;
use crate::callback::SessionCallback;
use crate::definitions::{Rect, SessionId, WindowToken};
use crate::errors::TransportError;
use crate::input_event::{DispatchResult, InputEvent, InputEventFinisher, KeyAction, KeyEvent, MotionEvent};
use crate::overlay::OverlayController;
use crate::task::{SessionNotification, SessionOp};
use crate::window::{Surface, WindowManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Creating,
    Active,
    Released,
}

pub struct Session {
    id: SessionId,
    input_id: String,
    state: SessionState,
    backend: Box<dyn TvInputSession>,
    callback: Option<Arc<dyn SessionCallback>>,
    surface: Option<Arc<dyn Surface>>,
    overlay: OverlayController,
}

impl Session {
    pub fn new(
        id: SessionId,
        input_id: impl Into<String>,
        backend: Box<dyn TvInputSession>,
        window_manager: Arc<dyn WindowManager>,
    ) -> Self {
        Self {
            id,
            input_id: input_id.into(),
            state: SessionState::Creating,
            backend,
            callback: None,
            surface: None,
            overlay: OverlayController::new(window_manager),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn input_id(&self) -> &str {
        &self.input_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn overlay(&self) -> &OverlayController {
        &self.overlay
    }

    /// Binds the reply channel. Only the first activation of a creating session counts.
    pub fn activate(&mut self, callback: Arc<dyn SessionCallback>) {
        if self.state != SessionState::Creating {
            warn!("Session {} cannot be activated from {:?}", self.id, self.state);
            return;
        }
        self.callback = Some(callback);
        self.state = SessionState::Active;
        info!("Session {} for input '{}' is active", self.id, self.input_id);
    }

    /// Executes one client or backend request.
    pub async fn apply(&mut self, op: SessionOp) {
        if let SessionOp::Release = op {
            self.release().await;
            return;
        }
        if !self.is_active() {
            warn!("Session {} is {:?}; dropping {}", self.id, self.state, op.name());
            if let SessionOp::DispatchInputEvent { finisher, reply, .. } = op {
                complete_dispatch(DispatchResult::NotHandled, finisher, reply);
            }
            return;
        }
        match op {
            SessionOp::Release => {}
            SessionOp::SetMainSession(is_main) => self.backend.on_set_main_session(is_main).await,
            SessionOp::SetSurface(surface) => self.set_surface(surface).await,
            SessionOp::SurfaceChanged { format, width, height } => {
                self.backend.on_surface_changed(format, width, height).await
            }
            SessionOp::SetStreamVolume(volume) => self.backend.on_set_stream_volume(volume).await,
            SessionOp::Tune(channel_uri) => {
                if !self.backend.on_tune(&channel_uri).await {
                    debug!("Session {}: backend declined tuning to {}", self.id, channel_uri);
                }
            }
            SessionOp::SetCaptionEnabled(enabled) => self.backend.on_set_caption_enabled(enabled).await,
            SessionOp::SelectTrack(track) => {
                if !self.backend.on_select_track(&track).await {
                    debug!("Session {}: track {} not selected", self.id, track.id);
                }
            }
            SessionOp::UnselectTrack(track) => {
                if !self.backend.on_unselect_track(&track).await {
                    debug!("Session {}: track {} not unselected", self.id, track.id);
                }
            }
            SessionOp::UnblockContent(rating) => self.backend.on_unblock_content(&rating).await,
            SessionOp::AppPrivateCommand { action, data } => self.backend.on_app_private_command(&action, &data).await,
            SessionOp::SetOverlayViewEnabled(enabled) => self.set_overlay_view_enabled(enabled),
            SessionOp::CreateOverlayView { token, frame } => self.create_overlay_view(token, frame),
            SessionOp::RelayoutOverlayView(frame) => self.relayout_overlay_view(frame),
            SessionOp::RemoveOverlayView => self.remove_overlay_view(true),
            SessionOp::DispatchInputEvent { event, finisher, reply } => {
                let result = self.dispatch_input_event(event, finisher);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
        }
    }

    /// Hands the new surface to the backend, then releases the one it replaces.
    pub async fn set_surface(&mut self, surface: Option<Arc<dyn Surface>>) {
        if !self.backend.on_set_surface(surface.clone()).await {
            debug!("Session {}: backend did not accept the surface", self.id);
        }
        let previous = std::mem::replace(&mut self.surface, surface);
        if let Some(previous) = previous {
            let replaced_by_itself = self.surface.as_ref().is_some_and(|current| same_surface(current, &previous));
            if !replaced_by_itself {
                previous.release();
            }
        }
    }

    pub fn set_overlay_view_enabled(&mut self, enabled: bool) {
        if !self.overlay.set_enabled(enabled) {
            return;
        }
        if enabled {
            if self.overlay.attachment().is_some() {
                self.materialize_overlay();
            }
        } else {
            self.overlay.remove(false);
        }
    }

    /// Replaces the window attachment. A view is produced only while overlays are enabled.
    pub fn create_overlay_view(&mut self, token: WindowToken, frame: Rect) {
        self.overlay.remove(false);
        self.overlay.store_attachment(token, frame);
        if self.overlay.is_enabled() {
            self.materialize_overlay();
        }
    }

    pub fn relayout_overlay_view(&mut self, frame: Rect) {
        self.overlay.relayout(frame);
    }

    pub fn remove_overlay_view(&mut self, clear_token: bool) {
        self.overlay.remove(clear_token);
    }

    fn materialize_overlay(&mut self) {
        match self.backend.on_create_overlay_view() {
            Some(view) => self.overlay.materialize(view),
            None => debug!("Session {}: backend has no overlay view", self.id),
        }
    }

    /// Offers the event to the backend hooks first, then to the overlay.
    ///
    /// The finisher is completed here for [`DispatchResult::Handled`] and
    /// [`DispatchResult::NotHandled`]. For [`DispatchResult::InProgress`] it travels with the
    /// event into the overlay pipeline.
    pub fn dispatch_input_event(&mut self, event: InputEvent, finisher: Option<InputEventFinisher>) -> DispatchResult {
        let consumed = match &event {
            InputEvent::Key(key) => self.dispatch_key(key),
            InputEvent::Motion(motion) => self.dispatch_motion(motion),
        };
        if consumed {
            complete_dispatch(DispatchResult::Handled, finisher, None);
            return DispatchResult::Handled;
        }

        let Some(view) = self.overlay.attached_view().cloned() else {
            complete_dispatch(DispatchResult::NotHandled, finisher, None);
            return DispatchResult::NotHandled;
        };
        if !view.has_window_focus() {
            view.request_window_focus();
        }
        if event.is_navigation_key() && view.has_focusable() {
            view.dispatch_input_event(&event);
            complete_dispatch(DispatchResult::Handled, finisher, None);
            return DispatchResult::Handled;
        }
        view.enqueue_input_event(event, finisher);
        DispatchResult::InProgress
    }

    fn dispatch_key(&mut self, key: &KeyEvent) -> bool {
        match key.action {
            KeyAction::Down if key.long_press => self.backend.on_key_long_press(key.key_code, key),
            KeyAction::Down => self.backend.on_key_down(key.key_code, key),
            KeyAction::Up => self.backend.on_key_up(key.key_code, key),
            KeyAction::Multiple => self.backend.on_key_multiple(key.key_code, key.repeat_count, key),
        }
    }

    fn dispatch_motion(&mut self, motion: &MotionEvent) -> bool {
        if motion.is_touch_event() {
            self.backend.on_touch_event(motion)
        } else if motion.is_trackball_event() {
            self.backend.on_trackball_event(motion)
        } else {
            self.backend.on_generic_motion_event(motion)
        }
    }

    /// Forwards a backend notification to the client.
    pub fn deliver(&self, notification: SessionNotification) {
        if !self.is_active() {
            warn!("Session {} is {:?}; dropping {}", self.id, self.state, notification.name());
            return;
        }
        let Some(callback) = self.callback.as_ref() else {
            return;
        };
        let name = notification.name();
        let result = match notification {
            SessionNotification::SessionEvent { event_type, args } => callback.on_session_event(&event_type, &args),
            SessionNotification::ChannelRetuned(channel_uri) => callback.on_channel_retuned(&channel_uri),
            SessionNotification::TrackInfoChanged(tracks) => callback.on_track_info_changed(&tracks),
            SessionNotification::VideoAvailable => callback.on_video_available(),
            SessionNotification::VideoUnavailable(reason) => callback.on_video_unavailable(reason),
            SessionNotification::ContentAllowed => callback.on_content_allowed(),
            SessionNotification::ContentBlocked(rating) => callback.on_content_blocked(&rating.to_string()),
        };
        match result {
            Ok(()) => {}
            Err(TransportError::PeerGone) => warn!("Session {}: client is gone, {} not delivered", self.id, name),
            Err(e) => warn!("Session {}: failed to deliver {}: {}", self.id, name, e),
        }
    }

    /// Tears the session down. Safe to call more than once.
    pub async fn release(&mut self) {
        if self.state == SessionState::Released {
            debug!("Session {} already released", self.id);
            return;
        }
        self.overlay.remove(true);
        self.backend.on_release().await;
        if let Some(surface) = self.surface.take() {
            surface.release();
        }
        self.state = SessionState::Released;
        info!("Session {} for input '{}' released", self.id, self.input_id);
    }
}

fn same_surface(a: &Arc<dyn Surface>, b: &Arc<dyn Surface>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

pub(crate) fn complete_dispatch(
    result: DispatchResult,
    finisher: Option<InputEventFinisher>,
    reply: Option<tokio::sync::oneshot::Sender<DispatchResult>>,
) {
    if let Some(finisher) = finisher {
        finisher.finish(result == DispatchResult::Handled);
    }
    if let Some(reply) = reply {
        let _ = reply.send(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_support::*;
    use crate::callback::{ChannelSessionCallback, SessionCallbackEvent};
    use crate::definitions::{ContentRating, TrackInfo, TrackType};
    use crate::input_event::{InputSource, KeyCode, MotionAction};
    use crate::overlay::test_support::{FakeOverlayView, FakeWindowManager};
    use crate::window::OverlayView;
    use proptest::prelude::*;
    use std::num::NonZeroU32;
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    struct Fixture {
        log: CallLog,
        wm: Arc<FakeWindowManager>,
        views: Arc<Mutex<Vec<Arc<FakeOverlayView>>>>,
        events: mpsc::Receiver<SessionCallbackEvent>,
        session: Session,
    }

    fn fixture_with(configure: impl FnOnce(&mut RecordingSession)) -> Fixture {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let wm = Arc::new(FakeWindowManager::default());
        let mut backend = RecordingSession::new(&log).with_overlay(&wm, true);
        configure(&mut backend);
        let views = backend.views.clone();
        let mut session = Session::new(NonZeroU32::new(1).unwrap(), "tuner0", Box::new(backend), wm.clone());
        let (callback, events) = ChannelSessionCallback::new(16);
        session.activate(Arc::new(callback));
        Fixture { log, wm, views, events, session }
    }

    fn fixture() -> Fixture {
        fixture_with(|_| {})
    }

    fn key(code: KeyCode) -> InputEvent {
        InputEvent::Key(KeyEvent::down(code))
    }

    #[tokio::test]
    async fn new_surface_is_bound_before_old_one_is_released() {
        let mut f = fixture();
        let first = FakeSurface::new("first", &f.log);
        let second = FakeSurface::new("second", &f.log);

        f.session.set_surface(Some(first.clone())).await;
        f.session.set_surface(Some(second.clone())).await;
        assert_eq!(
            calls(&f.log),
            vec!["set_surface:true", "set_surface:true", "surface_release:first"]
        );
        assert_eq!(first.releases(), 1);
        assert_eq!(second.releases(), 0);
    }

    #[tokio::test]
    async fn rebinding_the_same_surface_does_not_release_it() {
        let mut f = fixture();
        let surface = FakeSurface::new("only", &f.log);
        f.session.set_surface(Some(surface.clone())).await;
        f.session.set_surface(Some(surface.clone())).await;
        assert_eq!(surface.releases(), 0);

        f.session.set_surface(None).await;
        assert_eq!(surface.releases(), 1);
    }

    #[tokio::test]
    async fn overlay_follows_enabled_flag_and_attachment() {
        let mut f = fixture();
        f.session.create_overlay_view(WindowToken(5), Rect::new(0, 0, 100, 100));
        assert!(!f.session.overlay().is_materialized());

        f.session.set_overlay_view_enabled(true);
        assert!(f.session.overlay().is_materialized());
        assert_eq!(f.wm.added.lock().unwrap()[0].token, WindowToken(5));

        f.session.set_overlay_view_enabled(false);
        assert!(!f.session.overlay().is_materialized());
        assert_eq!(f.session.overlay().attachment().unwrap().token, WindowToken(5));

        // Re-enable restores the overlay without a new attachment.
        f.session.set_overlay_view_enabled(true);
        assert!(f.session.overlay().is_materialized());
        assert_eq!(f.wm.live_count(), 1);
    }

    #[tokio::test]
    async fn create_overlay_view_replaces_live_view() {
        let mut f = fixture();
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 10, 10));
        f.session.create_overlay_view(WindowToken(2), Rect::new(0, 0, 20, 20));
        assert_eq!(f.wm.live_count(), 1);
        assert_eq!(*f.wm.removed.lock().unwrap(), 1);
        assert_eq!(f.views.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn consumed_key_is_handled_and_finished() {
        let mut f = fixture_with(|backend| backend.consume_keys = true);
        let (finisher, mut done) = InputEventFinisher::new();
        assert_eq!(f.session.dispatch_input_event(key(KeyCode::CHANNEL_UP), Some(finisher)), DispatchResult::Handled);
        assert_eq!(done.try_recv(), Ok(true));
        assert_eq!(calls(&f.log), vec!["key_down:166"]);
    }

    #[tokio::test]
    async fn unconsumed_event_without_overlay_is_not_handled() {
        let mut f = fixture();
        let (finisher, mut done) = InputEventFinisher::new();
        let touch = InputEvent::Motion(MotionEvent::new(InputSource::CLASS_POINTER, MotionAction::Down, 1.0, 1.0));
        assert_eq!(f.session.dispatch_input_event(touch, Some(finisher)), DispatchResult::NotHandled);
        assert_eq!(done.try_recv(), Ok(false));
        assert_eq!(calls(&f.log), vec!["touch"]);
    }

    #[tokio::test]
    async fn navigation_key_goes_to_focusable_overlay_synchronously() {
        let mut f = fixture();
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 10, 10));
        let view = f.views.lock().unwrap()[0].clone();

        let (finisher, mut done) = InputEventFinisher::new();
        assert_eq!(f.session.dispatch_input_event(key(KeyCode::DPAD_CENTER), Some(finisher)), DispatchResult::Handled);
        assert_eq!(done.try_recv(), Ok(true));
        assert_eq!(view.sync_events.lock().unwrap().len(), 1);
        assert!(view.has_window_focus());
    }

    #[tokio::test]
    async fn other_events_are_deferred_to_overlay_pipeline() {
        let mut f = fixture();
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 10, 10));
        let view = f.views.lock().unwrap()[0].clone();

        let (finisher, mut done) = InputEventFinisher::new();
        assert_eq!(f.session.dispatch_input_event(key(KeyCode::VOLUME_UP), Some(finisher)), DispatchResult::InProgress);
        assert!(done.try_recv().is_err());
        assert_eq!(view.async_events.lock().unwrap().len(), 1);

        let pending = view.pending_finishers.lock().unwrap().pop().unwrap();
        pending.finish(false);
        assert_eq!(done.try_recv(), Ok(false));
    }

    #[tokio::test]
    async fn unconsumed_pointer_event_is_deferred_to_live_overlay() {
        let mut f = fixture();
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 10, 10));
        let view = f.views.lock().unwrap()[0].clone();

        let (finisher, mut done) = InputEventFinisher::new();
        let touch = InputEvent::Motion(MotionEvent::new(InputSource::CLASS_POINTER, MotionAction::Down, 3.0, 4.0));
        assert_eq!(f.session.dispatch_input_event(touch, Some(finisher)), DispatchResult::InProgress);
        assert_eq!(calls(&f.log), vec!["touch"]);
        assert!(view.sync_events.lock().unwrap().is_empty());
        assert!(matches!(view.async_events.lock().unwrap().as_slice(), [InputEvent::Motion(_)]));
        assert!(done.try_recv().is_err());

        let pending = view.pending_finishers.lock().unwrap().pop().unwrap();
        pending.finish(true);
        assert_eq!(done.try_recv(), Ok(true));
    }

    #[tokio::test]
    async fn navigation_key_with_unfocusable_overlay_is_deferred() {
        let mut f = fixture();
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 10, 10));
        let view = f.views.lock().unwrap()[0].clone();
        view.focusable.store(false, std::sync::atomic::Ordering::SeqCst);

        assert_eq!(f.session.dispatch_input_event(key(KeyCode::DPAD_UP), None), DispatchResult::InProgress);
        assert!(view.sync_events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn key_actions_reach_matching_hooks() {
        let mut f = fixture();
        f.session.dispatch_input_event(InputEvent::Key(KeyEvent::up(KeyCode::ENTER)), None);
        f.session.dispatch_input_event(InputEvent::Key(KeyEvent::long_press(KeyCode::ENTER, 1)), None);
        f.session.dispatch_input_event(InputEvent::Key(KeyEvent::multiple(KeyCode::TAB, 3)), None);
        let trackball = MotionEvent::new(InputSource::CLASS_TRACKBALL, MotionAction::Move, 0.0, 0.0);
        f.session.dispatch_input_event(InputEvent::Motion(trackball), None);
        let joystick = MotionEvent::new(InputSource::CLASS_JOYSTICK, MotionAction::Move, 0.0, 0.0);
        f.session.dispatch_input_event(InputEvent::Motion(joystick), None);
        assert_eq!(
            calls(&f.log),
            vec!["key_up:66", "key_long_press:66", "key_multiple:61:3", "trackball", "generic_motion"]
        );
    }

    #[tokio::test]
    async fn release_is_idempotent_and_frees_everything() {
        let mut f = fixture();
        let surface = FakeSurface::new("s", &f.log);
        f.session.set_surface(Some(surface.clone())).await;
        f.session.set_overlay_view_enabled(true);
        f.session.create_overlay_view(WindowToken(9), Rect::new(0, 0, 10, 10));

        f.session.release().await;
        f.session.release().await;

        assert_eq!(f.session.state(), SessionState::Released);
        assert_eq!(surface.releases(), 1);
        assert_eq!(f.wm.live_count(), 0);
        assert!(f.session.overlay().attachment().is_none());
        assert_eq!(calls(&f.log).iter().filter(|c| *c == "release").count(), 1);
    }

    #[tokio::test]
    async fn operations_after_release_are_ignored() {
        let mut f = fixture();
        f.session.apply(SessionOp::Release).await;
        f.session.apply(SessionOp::Tune("ch://1".into())).await;
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        f.session
            .apply(SessionOp::DispatchInputEvent { event: key(KeyCode::ENTER), finisher: None, reply: Some(reply_tx) })
            .await;
        assert_eq!(reply_rx.await.unwrap(), DispatchResult::NotHandled);
        f.session.deliver(SessionNotification::VideoAvailable);
        assert_eq!(calls(&f.log), vec!["release"]);
        assert!(f.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn ops_reach_backend_and_notifications_reach_client() {
        let mut f = fixture();
        f.session.apply(SessionOp::Tune("ch://7".into())).await;
        f.session.apply(SessionOp::SelectTrack(TrackInfo::new(TrackType::Audio, "a1"))).await;
        f.session.apply(SessionOp::UnblockContent(ContentRating::new("d", "s", "r", &[]))).await;
        f.session.apply(SessionOp::SetMainSession(true)).await;
        assert_eq!(calls(&f.log), vec!["tune:ch://7", "select:a1", "unblock:d/s/r", "main:true"]);

        f.session.deliver(SessionNotification::ContentBlocked(ContentRating::new("d", "s", "r", &["x"])));
        assert!(matches!(f.events.try_recv().unwrap(), SessionCallbackEvent::ContentBlocked(r) if r == "d/s/r/x"));
    }

    #[derive(Debug, Clone)]
    enum OverlayStep {
        Enable(bool),
        Attach(u64),
        Relayout,
        Remove,
        Release,
    }

    fn overlay_step() -> impl Strategy<Value = OverlayStep> {
        prop_oneof![
            any::<bool>().prop_map(OverlayStep::Enable),
            (1u64..4).prop_map(OverlayStep::Attach),
            Just(OverlayStep::Relayout),
            Just(OverlayStep::Remove),
            Just(OverlayStep::Release),
        ]
    }

    proptest! {
        #[test]
        fn overlay_exists_iff_enabled_attached_and_active(steps in prop::collection::vec(overlay_step(), 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            runtime.block_on(async {
                let mut f = fixture();
                let mut enabled = false;
                let mut attached = false;
                let mut active = true;
                for step in steps {
                    match step {
                        OverlayStep::Enable(on) => {
                            f.session.apply(SessionOp::SetOverlayViewEnabled(on)).await;
                            enabled = on;
                        }
                        OverlayStep::Attach(token) => {
                            f.session
                                .apply(SessionOp::CreateOverlayView { token: WindowToken(token), frame: Rect::new(0, 0, 10, 10) })
                                .await;
                            if active {
                                attached = true;
                            }
                        }
                        OverlayStep::Relayout => {
                            f.session.apply(SessionOp::RelayoutOverlayView(Rect::new(1, 1, 5, 5))).await;
                        }
                        OverlayStep::Remove => {
                            f.session.apply(SessionOp::RemoveOverlayView).await;
                            if active {
                                attached = false;
                            }
                        }
                        OverlayStep::Release => {
                            f.session.apply(SessionOp::Release).await;
                            active = false;
                            attached = false;
                        }
                    }
                    let expected = enabled && attached && active;
                    prop_assert_eq!(f.session.overlay().is_materialized(), expected);
                    prop_assert_eq!(f.wm.live_count(), usize::from(expected));
                }
                Ok(())
            })?;
        }
    }
}
