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

use crate::definitions::InputInfo;
use crate::errors::TransportError;

/// Remote listener of input hotplug notifications.
///
/// Calls are one-way: implementations must not block the caller. Returning
/// [`TransportError::PeerGone`] drops the observer from the registry.
pub trait ServiceObserver: Send + Sync {
    fn add_hardware_input(&self, device_id: u32, input: &InputInfo) -> Result<(), TransportError>;

    fn add_cec_input(&self, logical_address: u8, input: &InputInfo) -> Result<(), TransportError>;

    fn remove_input(&self, input_id: &str) -> Result<(), TransportError>;

    fn set_wrapped_input_id(&self, input_id: &str, wrapped_input_id: &str) -> Result<(), TransportError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    HardwareInputAdded { device_id: u32, input: InputInfo },
    CecInputAdded { logical_address: u8, input: InputInfo },
    InputRemoved { input_id: String },
    WrappedInputIdSet { input_id: String, wrapped_input_id: String },
}

/// Observer that forwards notifications into a bounded queue consumed elsewhere.
///
/// A slow consumer never blocks the broadcaster: when the queue is full the notification
/// is dropped for this observer only.
pub struct ChannelObserver {
    name: String,
    tx: mpsc::Sender<ObserverEvent>,
}

impl ChannelObserver {
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<ObserverEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { name: name.into(), tx }, rx)
    }

    fn deliver(&self, event: ObserverEvent) -> Result<(), TransportError> {
        match self.tx.try_send(event) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!("Observer '{}' dropped {:?}: queue full", self.name, event);
                Err(TransportError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::PeerGone),
        }
    }
}

impl ServiceObserver for ChannelObserver {
    fn add_hardware_input(&self, device_id: u32, input: &InputInfo) -> Result<(), TransportError> {
        self.deliver(ObserverEvent::HardwareInputAdded { device_id, input: input.clone() })
    }

    fn add_cec_input(&self, logical_address: u8, input: &InputInfo) -> Result<(), TransportError> {
        self.deliver(ObserverEvent::CecInputAdded { logical_address, input: input.clone() })
    }

    fn remove_input(&self, input_id: &str) -> Result<(), TransportError> {
        self.deliver(ObserverEvent::InputRemoved { input_id: input_id.to_string() })
    }

    fn set_wrapped_input_id(&self, input_id: &str, wrapped_input_id: &str) -> Result<(), TransportError> {
        self.deliver(ObserverEvent::WrappedInputIdSet {
            input_id: input_id.to_string(),
            wrapped_input_id: wrapped_input_id.to_string(),
        })
    }
}
