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

use log::{debug, info};

use crate::backend::TvInputService;
use crate::definitions::{CecDeviceInfo, HardwareInfo};
use crate::listener_registry::ListenerRegistry;
use crate::observer::ServiceObserver;

/// Turns platform hotplug reports into observer notifications, for the devices the
/// backend claims.
pub struct HotplugBroadcaster {
    backend: Arc<dyn TvInputService>,
    observers: ListenerRegistry<dyn ServiceObserver>,
}

impl HotplugBroadcaster {
    pub fn new(backend: Arc<dyn TvInputService>) -> Self {
        Self { backend, observers: ListenerRegistry::new() }
    }

    pub fn register(&mut self, observer: Arc<dyn ServiceObserver>) -> bool {
        let added = self.observers.register(observer);
        if added {
            info!("Observer registered ({} total)", self.observers.len());
        } else {
            debug!("Observer already registered");
        }
        added
    }

    pub fn unregister(&mut self, observer: &Arc<dyn ServiceObserver>) -> bool {
        let removed = self.observers.unregister(observer);
        if removed {
            info!("Observer unregistered ({} left)", self.observers.len());
        }
        removed
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Returns the number of observers that received the notification.
    pub async fn hardware_added(&mut self, hardware: &HardwareInfo) -> usize {
        let Some(input) = self.backend.on_hardware_added(hardware).await else {
            debug!("Hardware device {} not claimed", hardware.device_id);
            return 0;
        };
        info!("Hardware device {} exposed as input '{}'", hardware.device_id, input.id);
        self.observers.broadcast(|observer| observer.add_hardware_input(hardware.device_id, &input))
    }

    pub async fn hardware_removed(&mut self, hardware: &HardwareInfo) -> usize {
        let Some(input_id) = self.backend.on_hardware_removed(hardware).await else {
            debug!("Removed hardware device {} was not claimed", hardware.device_id);
            return 0;
        };
        self.input_removed(&input_id)
    }

    pub async fn cec_device_added(&mut self, device: &CecDeviceInfo) -> usize {
        let Some(input) = self.backend.on_cec_device_added(device).await else {
            debug!("CEC device {} not claimed", device.logical_address);
            return 0;
        };
        info!("CEC device {} exposed as input '{}'", device.logical_address, input.id);
        self.observers.broadcast(|observer| observer.add_cec_input(device.logical_address, &input))
    }

    pub async fn cec_device_removed(&mut self, device: &CecDeviceInfo) -> usize {
        let Some(input_id) = self.backend.on_cec_device_removed(device).await else {
            debug!("Removed CEC device {} was not claimed", device.logical_address);
            return 0;
        };
        self.input_removed(&input_id)
    }

    pub fn set_wrapped_input_id(&mut self, input_id: &str, wrapped_input_id: &str) -> usize {
        self.observers.broadcast(|observer| observer.set_wrapped_input_id(input_id, wrapped_input_id))
    }

    fn input_removed(&mut self, input_id: &str) -> usize {
        info!("Input '{}' removed", input_id);
        self.observers.broadcast(|observer| observer.remove_input(input_id))
    }
}
