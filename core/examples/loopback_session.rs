// Example showing a session lifecycle against an in-memory backend and window system
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use tv_input_core::definitions::{HardwareInfo, InputInfo, InputType, Rect, WindowToken};
use tv_input_core::errors::WindowError;
use tv_input_core::input_event::{InputEvent, KeyCode, KeyEvent};
use tv_input_core::window::{OverlayLayoutParams, OverlayView, Surface, WindowManager};
use tv_input_core::{
    ChannelObserver, ChannelSessionCallback, HostConfig, SessionCallbackEvent, SessionNotifier, TvInputHost,
    TvInputService, TvInputSession,
};

struct DemoService;

struct DemoSession {
    notifier: SessionNotifier,
}

#[async_trait]
impl TvInputService for DemoService {
    async fn on_create_session(&self, input_id: &str, notifier: SessionNotifier) -> Option<Box<dyn TvInputSession>> {
        info!("Creating session for {}", input_id);
        Some(Box::new(DemoSession { notifier }))
    }

    async fn on_hardware_added(&self, hardware: &HardwareInfo) -> Option<InputInfo> {
        Some(InputInfo {
            id: format!("demo/hw{}", hardware.device_id),
            service_name: "demo".to_string(),
            input_type: hardware.input_type,
            label: None,
        })
    }
}

#[async_trait]
impl TvInputSession for DemoSession {
    async fn on_release(&mut self) {
        info!("Session released");
    }

    async fn on_set_surface(&mut self, surface: Option<Arc<dyn Surface>>) -> bool {
        info!("Surface bound: {}", surface.is_some());
        true
    }

    async fn on_set_stream_volume(&mut self, _volume: f32) {}

    async fn on_tune(&mut self, channel_uri: &str) -> bool {
        let _ = self.notifier.notify_channel_retuned(channel_uri);
        let _ = self.notifier.notify_video_available();
        true
    }

    async fn on_set_caption_enabled(&mut self, _enabled: bool) {}
}

struct NoWindows;

impl WindowManager for NoWindows {
    fn add_view(&self, _view: &Arc<dyn OverlayView>, params: &OverlayLayoutParams) -> Result<(), WindowError> {
        Err(WindowError::BadToken(params.token.0))
    }

    fn update_view_layout(&self, _view: &Arc<dyn OverlayView>, _params: &OverlayLayoutParams) {}

    fn remove_view(&self, _view: &Arc<dyn OverlayView>) {}
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let host = TvInputHost::spawn(Arc::new(DemoService), Arc::new(NoWindows), HostConfig::default());
    let client = host.client();

    let (observer, mut observer_events) = ChannelObserver::new("example", 8);
    client.register_observer(Arc::new(observer))?;
    client.notify_hardware_added(HardwareInfo { device_id: 1, input_type: InputType::Hdmi, hdmi_port_id: Some(1) })?;
    info!("Observer got {:?}", observer_events.recv().await);

    let (callback, mut events) = ChannelSessionCallback::new(8);
    client.create_session(None, Some(Arc::new(callback)), "demo/hw1")?;
    if let Some(SessionCallbackEvent::SessionCreated(Some(session))) = events.recv().await {
        session.create_overlay_view(WindowToken(1), Rect::new(0, 0, 1920, 1080))?;
        session.tune("demo://channel/1")?;
        let result = session.dispatch_input_event(InputEvent::Key(KeyEvent::down(KeyCode::DPAD_CENTER))).await?;
        info!("Key dispatch result: {:?}", result);
        for _ in 0..2 {
            info!("Client got {:?}", events.recv().await);
        }
        session.release()?;
    }

    host.shutdown().await?;
    Ok(())
}
