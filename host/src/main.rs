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

mod cli;
mod loopback;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{debug, info, warn};
use tokio::sync::mpsc;
use tv_input_core::definitions::{HardwareInfo, InputType, Rect, WindowToken};
use tv_input_core::{
    ChannelObserver, ChannelSessionCallback, HostClient, ObserverEvent, SessionCallbackEvent, ServiceObserver,
    TvInputHost,
};

use crate::cli::Cli;
use crate::loopback::{LoggingWindowManager, LoopbackService, INPUT_PREFIX};

fn init_logger(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level.to_level_filter())
        .parse_default_env()
        .init();
    debug!("Logger initialized");
}

fn spawn_observer_log(mut events: mpsc::Receiver<ObserverEvent>, client: HostClient, callback_capacity: usize) {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!("Observer: {:?}", event);
            if let ObserverEvent::HardwareInputAdded { input, .. } = event {
                open_demo_session(&client, &input.id, callback_capacity);
            }
        }
    });
}

fn open_demo_session(client: &HostClient, input_id: &str, callback_capacity: usize) {
    let (callback, mut events) = ChannelSessionCallback::new(callback_capacity);
    if let Err(e) = client.create_session(None, Some(Arc::new(callback)), input_id) {
        warn!("Could not request a session for {}: {}", input_id, e);
        return;
    }
    let input_id = input_id.to_string();
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionCallbackEvent::SessionCreated(Some(session)) => {
                    info!("Session {:?} opened for {}", session, input_id);
                    let requests = session
                        .create_overlay_view(WindowToken(1), Rect::new(0, 0, 1920, 1080))
                        .and_then(|_| session.tune(&format!("{}channel/1", INPUT_PREFIX)));
                    if let Err(e) = requests {
                        warn!("Demo session requests failed: {}", e);
                    }
                }
                SessionCallbackEvent::SessionCreated(None) => warn!("Session for {} refused", input_id),
                other => info!("Session event for {}: {:?}", input_id, other),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logger(&cli);
    let config = cli.host_config();
    info!(
        "Starting TV input host with {:?}, queue capacities {}/{}",
        config, cli.observer_queue, cli.callback_queue
    );

    let window_manager = Arc::new(LoggingWindowManager::default());
    let backend = Arc::new(LoopbackService::new(window_manager.clone()));
    let host = TvInputHost::spawn(backend, window_manager, config);
    let client = host.client();

    let (observer, observer_events) = ChannelObserver::new("console", cli.observer_queue);
    let observer: Arc<dyn ServiceObserver> = Arc::new(observer);
    client.register_observer(observer.clone())?;
    spawn_observer_log(observer_events, client.clone(), cli.callback_queue);

    if let Some(device_id) = cli.demo_device {
        client.notify_hardware_added(HardwareInfo { device_id, input_type: InputType::Hdmi, hdmi_port_id: Some(1) })?;
    }
    info!("{} observer(s) registered", client.registered_observer_count().await?);

    info!("TV input host running; press Ctrl+C to exit");
    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;

    client.unregister_observer(observer)?;
    host.shutdown().await?;
    info!("Exiting...");
    Ok(())
}
