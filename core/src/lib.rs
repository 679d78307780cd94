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

pub mod backend;
pub mod callback;
pub mod config;
pub mod definitions;
pub mod errors;
pub mod event_queue;
pub mod hotplug;
pub mod input_event;
pub mod listener_registry;
pub mod observer;
pub mod overlay;
pub mod session;
pub mod task;
pub mod window;

mod host;
mod notifier;

pub use backend::{TvInputService, TvInputSession};
pub use callback::{ChannelSessionCallback, SessionCallback, SessionCallbackEvent};
pub use config::HostConfig;
pub use errors::{EngineError, TransportError, ValidationError, WindowError};
pub use event_queue::{EventQueue, QueueHandle, TaskHandler, TaskSender};
pub use host::{hand_off_main_session, HostClient, HostWorker, SessionHandle, TvInputHost};
pub use notifier::SessionNotifier;
pub use observer::{ChannelObserver, ObserverEvent, ServiceObserver};
