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

//! Session factory and the worker owning every session and observer.
//!
//! [`TvInputHost::spawn`] starts the worker on an [`EventQueue`]. Clients talk to it
//! through [`HostClient`] and, once a session exists, through its [`SessionHandle`].
//! Both only enqueue [`Task`]s; the worker executes them one by one.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::FutureExt;
use log::{debug, error, info, warn};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::backend::TvInputService;
use crate::callback::SessionCallback;
use crate::config::HostConfig;
use crate::definitions::{Bundle, CecDeviceInfo, HardwareInfo, Rect, SessionId, TrackInfo, WindowToken};
use crate::errors::{EngineError, TransportError};
use crate::event_queue::{EventQueue, QueueHandle, TaskHandler, TaskSender};
use crate::hotplug::HotplugBroadcaster;
use crate::input_event::{DispatchResult, InputChannel, InputEvent, PendingInputEvent};
use crate::notifier::SessionNotifier;
use crate::observer::ServiceObserver;
use crate::session::{complete_dispatch, Session};
use crate::task::{CreateSessionRequest, SessionOp, Task};
use crate::window::{Surface, WindowManager};

/// Running host: the worker task plus a client to reach it.
pub struct TvInputHost {
    client: HostClient,
    queue: QueueHandle,
}

impl TvInputHost {
    pub fn spawn(
        backend: Arc<dyn TvInputService>,
        window_manager: Arc<dyn WindowManager>,
        config: HostConfig,
    ) -> Self {
        let (tasks, queue) = EventQueue::new();
        let worker = HostWorker::new(backend, window_manager, config, tasks.clone());
        let queue = queue.run(worker);
        info!("TV input host started");
        Self { client: HostClient::new(tasks), queue }
    }

    pub fn client(&self) -> HostClient {
        self.client.clone()
    }

    /// Stops the worker after the task in progress. Every live session is released.
    pub async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        self.queue.shutdown().await
    }

    pub fn abort(self) {
        self.queue.abort();
    }
}

struct SessionEntry {
    session: Session,
    input_pump: Option<JoinHandle<()>>,
}

impl SessionEntry {
    async fn release(mut self) {
        if let Some(pump) = self.input_pump.take() {
            pump.abort();
        }
        self.session.release().await;
    }
}

/// Owns sessions and observers. Driven exclusively by the event queue.
pub struct HostWorker {
    backend: Arc<dyn TvInputService>,
    window_manager: Arc<dyn WindowManager>,
    config: HostConfig,
    tasks: TaskSender<Task>,
    sessions: HashMap<SessionId, SessionEntry>,
    hotplug: HotplugBroadcaster,
    next_session_id: SessionId,
}

impl HostWorker {
    pub fn new(
        backend: Arc<dyn TvInputService>,
        window_manager: Arc<dyn WindowManager>,
        config: HostConfig,
        tasks: TaskSender<Task>,
    ) -> Self {
        Self {
            hotplug: HotplugBroadcaster::new(backend.clone()),
            backend,
            window_manager,
            config,
            tasks,
            sessions: HashMap::new(),
            next_session_id: NonZeroU32::MIN,
        }
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Next free id. The counter wraps to 1 and skips ids of live sessions.
    fn allocate_session_id(&mut self) -> SessionId {
        loop {
            let id = self.next_session_id;
            self.next_session_id = id.checked_add(1).unwrap_or(NonZeroU32::MIN);
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }

    async fn create_session(&mut self, request: CreateSessionRequest) {
        let CreateSessionRequest { channel, callback, input_id } = request;
        let session_id = self.allocate_session_id();
        let notifier = SessionNotifier::new(self.tasks.clone(), session_id);

        let created = AssertUnwindSafe(self.backend.on_create_session(&input_id, notifier)).catch_unwind().await;
        let created = created.unwrap_or_else(|_| {
            error!("Backend panicked while creating a session for input '{}'", input_id);
            None
        });
        let Some(backend) = created else {
            info!("Backend refused a session for input '{}'", input_id);
            if let Err(e) = callback.on_session_created(None) {
                warn!("Failed to report refused session for '{}': {}", input_id, e);
            }
            return;
        };

        let mut session = Session::new(session_id, input_id, backend, self.window_manager.clone());
        session.activate(callback.clone());
        match callback.on_session_created(Some(SessionHandle::new(session_id, self.tasks.clone()))) {
            Ok(()) => {}
            Err(TransportError::PeerGone) => {
                warn!("Client went away before session {} was delivered; releasing it", session_id);
                session.release().await;
                return;
            }
            Err(e) => warn!("Failed to deliver session {}: {}", session_id, e),
        }

        let input_pump = channel.map(|channel| spawn_input_pump(channel, self.tasks.clone(), session_id));
        self.sessions.insert(session_id, SessionEntry { session, input_pump });
    }

    async fn apply_to_session(&mut self, session_id: SessionId, op: SessionOp) {
        if let SessionOp::Release = op {
            match self.sessions.remove(&session_id) {
                Some(entry) => entry.release().await,
                None => debug!("Session {} already gone", session_id),
            }
            return;
        }
        match self.sessions.get_mut(&session_id) {
            Some(entry) => entry.session.apply(op).await,
            None => {
                warn!("Dropping {} for unknown or released session {}", op.name(), session_id);
                if let SessionOp::DispatchInputEvent { finisher, reply, .. } = op {
                    complete_dispatch(DispatchResult::NotHandled, finisher, reply);
                }
            }
        }
    }
}

#[async_trait]
impl TaskHandler<Task> for HostWorker {
    async fn handle(&mut self, task: Task) -> anyhow::Result<()> {
        if self.config.verbose_dispatch {
            debug!("Executing {}", task.name());
        }
        match task {
            Task::RegisterObserver(observer) => {
                self.hotplug.register(observer);
            }
            Task::UnregisterObserver(observer) => {
                self.hotplug.unregister(&observer);
            }
            Task::ObserverCount(reply) => {
                reply
                    .send(self.hotplug.observer_count())
                    .map_err(|_| anyhow!("Observer count requester went away"))?;
            }
            Task::CreateSession(request) => self.create_session(request).await,
            Task::HardwareAdded(hardware) => {
                self.hotplug.hardware_added(&hardware).await;
            }
            Task::HardwareRemoved(hardware) => {
                self.hotplug.hardware_removed(&hardware).await;
            }
            Task::CecDeviceAdded(device) => {
                self.hotplug.cec_device_added(&device).await;
            }
            Task::CecDeviceRemoved(device) => {
                self.hotplug.cec_device_removed(&device).await;
            }
            Task::SetWrappedInputId { input_id, wrapped_input_id } => {
                self.hotplug.set_wrapped_input_id(&input_id, &wrapped_input_id);
            }
            Task::Session { session_id, op } => self.apply_to_session(session_id, op).await,
            Task::Notify { session_id, notification } => match self.sessions.get(&session_id) {
                Some(entry) => entry.session.deliver(notification),
                None => warn!("Dropping {} from unknown or released session {}", notification.name(), session_id),
            },
        }
        Ok(())
    }

    async fn on_shutdown(&mut self) {
        let mut ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        ids.sort();
        info!("Releasing {} session(s) on shutdown", ids.len());
        for id in ids {
            if let Some(entry) = self.sessions.remove(&id) {
                entry.release().await;
            }
        }
    }
}

fn spawn_input_pump(mut channel: InputChannel, tasks: TaskSender<Task>, session_id: SessionId) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(PendingInputEvent { event, finisher }) = channel.recv().await {
            let op = SessionOp::DispatchInputEvent { event, finisher: Some(finisher), reply: None };
            if tasks.enqueue(Task::Session { session_id, op }).is_err() {
                break;
            }
        }
        debug!("Input channel of session {} closed", session_id);
    })
}

/// Inbound API of the host.
#[derive(Clone)]
pub struct HostClient {
    tasks: TaskSender<Task>,
}

impl HostClient {
    pub fn new(tasks: TaskSender<Task>) -> Self {
        Self { tasks }
    }

    pub fn register_observer(&self, observer: Arc<dyn ServiceObserver>) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::RegisterObserver(observer))
    }

    pub fn unregister_observer(&self, observer: Arc<dyn ServiceObserver>) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::UnregisterObserver(observer))
    }

    /// Requests a session for `input_id`. The answer arrives on `callback`.
    ///
    /// Without a callback the request is dropped since nobody could receive the answer.
    /// Without an input channel the session is created but receives no input events.
    pub fn create_session(
        &self,
        channel: Option<InputChannel>,
        callback: Option<Arc<dyn SessionCallback>>,
        input_id: &str,
    ) -> Result<(), EngineError> {
        let Some(callback) = callback else {
            warn!("Session request for '{}' has no callback; dropping it", input_id);
            return Ok(());
        };
        if channel.is_none() {
            warn!("Session request for '{}' has no input channel", input_id);
        }
        self.tasks.enqueue(Task::CreateSession(CreateSessionRequest {
            channel,
            callback,
            input_id: input_id.to_string(),
        }))
    }

    pub fn notify_hardware_added(&self, hardware: HardwareInfo) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::HardwareAdded(hardware))
    }

    pub fn notify_hardware_removed(&self, hardware: HardwareInfo) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::HardwareRemoved(hardware))
    }

    pub fn notify_cec_device_added(&self, device: CecDeviceInfo) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::CecDeviceAdded(device))
    }

    pub fn notify_cec_device_removed(&self, device: CecDeviceInfo) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::CecDeviceRemoved(device))
    }

    pub fn notify_wrapped_input_id(&self, input_id: &str, wrapped_input_id: &str) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::SetWrappedInputId {
            input_id: input_id.to_string(),
            wrapped_input_id: wrapped_input_id.to_string(),
        })
    }

    pub async fn registered_observer_count(&self) -> Result<usize, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.tasks.enqueue(Task::ObserverCount(reply))?;
        rx.await.map_err(|_| EngineError::NoReply)
    }
}

/// Client-side handle of one session. Every call is queued and returns immediately.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: SessionId,
    tasks: TaskSender<Task>,
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle").field("session_id", &self.session_id).finish()
    }
}

impl SessionHandle {
    pub(crate) fn new(session_id: SessionId, tasks: TaskSender<Task>) -> Self {
        Self { session_id, tasks }
    }

    pub fn id(&self) -> SessionId {
        self.session_id
    }

    fn send(&self, op: SessionOp) -> Result<(), EngineError> {
        self.tasks.enqueue(Task::Session { session_id: self.session_id, op })
    }

    pub fn release(&self) -> Result<(), EngineError> {
        self.send(SessionOp::Release)
    }

    pub fn set_main_session(&self, is_main: bool) -> Result<(), EngineError> {
        self.send(SessionOp::SetMainSession(is_main))
    }

    pub fn set_surface(&self, surface: Option<Arc<dyn Surface>>) -> Result<(), EngineError> {
        self.send(SessionOp::SetSurface(surface))
    }

    pub fn dispatch_surface_changed(&self, format: i32, width: u32, height: u32) -> Result<(), EngineError> {
        self.send(SessionOp::SurfaceChanged { format, width, height })
    }

    pub fn set_stream_volume(&self, volume: f32) -> Result<(), EngineError> {
        self.send(SessionOp::SetStreamVolume(volume))
    }

    pub fn tune(&self, channel_uri: &str) -> Result<(), EngineError> {
        self.send(SessionOp::Tune(channel_uri.to_string()))
    }

    pub fn set_caption_enabled(&self, enabled: bool) -> Result<(), EngineError> {
        self.send(SessionOp::SetCaptionEnabled(enabled))
    }

    pub fn select_track(&self, track: TrackInfo) -> Result<(), EngineError> {
        self.send(SessionOp::SelectTrack(track))
    }

    pub fn unselect_track(&self, track: TrackInfo) -> Result<(), EngineError> {
        self.send(SessionOp::UnselectTrack(track))
    }

    /// `rating` is the flattened form; a malformed string is rejected and nothing is queued.
    pub fn unblock_content(&self, rating: &str) -> Result<(), EngineError> {
        let rating = rating.parse().map_err(|e| {
            warn!("Session {}: refusing to unblock: {}", self.session_id, e);
            EngineError::Validation(e)
        })?;
        self.send(SessionOp::UnblockContent(rating))
    }

    pub fn app_private_command(&self, action: &str, data: Bundle) -> Result<(), EngineError> {
        self.send(SessionOp::AppPrivateCommand { action: action.to_string(), data })
    }

    pub fn create_overlay_view(&self, token: WindowToken, frame: Rect) -> Result<(), EngineError> {
        self.send(SessionOp::CreateOverlayView { token, frame })
    }

    pub fn relayout_overlay_view(&self, frame: Rect) -> Result<(), EngineError> {
        self.send(SessionOp::RelayoutOverlayView(frame))
    }

    /// Removes the overlay and forgets the window token.
    pub fn remove_overlay_view(&self) -> Result<(), EngineError> {
        self.send(SessionOp::RemoveOverlayView)
    }

    /// Offers one input event to the session and waits for the disposition.
    pub async fn dispatch_input_event(&self, event: InputEvent) -> Result<DispatchResult, EngineError> {
        let (reply, rx) = oneshot::channel();
        self.send(SessionOp::DispatchInputEvent { event, finisher: None, reply: Some(reply) })?;
        rx.await.map_err(|_| EngineError::NoReply)
    }
}

/// Moves the main-session role to `next`. The new main session hears about it before the
/// previous one loses it.
pub fn hand_off_main_session(previous: Option<&SessionHandle>, next: &SessionHandle) -> Result<(), EngineError> {
    next.set_main_session(true)?;
    if let Some(previous) = previous.filter(|previous| previous.id() != next.id()) {
        previous.set_main_session(false)?;
    }
    Ok(())
}
