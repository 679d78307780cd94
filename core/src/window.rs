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

//! Contracts of the window system and of the resources a session holds on to.

use std::sync::Arc;

use bitflags::bitflags;

use crate::definitions::{Rect, WindowToken};
use crate::errors::WindowError;
use crate::input_event::{InputEvent, InputEventFinisher};

/// Video surface handed to a session by the client.
pub trait Surface: Send + Sync {
    /// Frees the underlying buffer queue. Called at most once per binding.
    fn release(&self);
}

/// View produced by a backend to be layered above the video surface.
pub trait OverlayView: Send + Sync {
    fn is_attached_to_window(&self) -> bool;

    fn has_window_focus(&self) -> bool;

    fn request_window_focus(&self);

    /// Whether the view hierarchy holds anything that can take focus.
    fn has_focusable(&self) -> bool;

    /// Delivers the event synchronously into the view hierarchy.
    fn dispatch_input_event(&self, event: &InputEvent);

    /// Queues the event on the view's own dispatch pipeline. The finisher, when present,
    /// must be completed by the pipeline once the event has been consumed or rejected.
    fn enqueue_input_event(&self, event: InputEvent, finisher: Option<InputEventFinisher>);
}

/// Window system that positions overlay views.
pub trait WindowManager: Send + Sync {
    fn add_view(&self, view: &Arc<dyn OverlayView>, params: &OverlayLayoutParams) -> Result<(), WindowError>;

    fn update_view_layout(&self, view: &Arc<dyn OverlayView>, params: &OverlayLayoutParams);

    fn remove_view(&self, view: &Arc<dyn OverlayView>);
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct WindowFlags: u32 {
        const NOT_FOCUSABLE = 0x0000_0008;
        const NOT_TOUCHABLE = 0x0000_0010;
        const LAYOUT_IN_SCREEN = 0x0000_0100;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct PrivateWindowFlags: u32 {
        const NO_MOVE_ANIMATION = 0x0000_0040;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct Gravity: u32 {
        const TOP = 0x30;
        const START = 0x0080_0003;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowType {
    /// Above the media window, below the application window.
    MediaOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Transparent,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLayoutParams {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub window_type: WindowType,
    pub flags: WindowFlags,
    pub private_flags: PrivateWindowFlags,
    pub gravity: Gravity,
    pub format: PixelFormat,
    pub token: WindowToken,
}

impl OverlayLayoutParams {
    /// Parameters of an overlay attached to `token` covering `frame`.
    ///
    /// The overlay window is neither focusable nor touchable, so the application owning the
    /// token decides whether input is consumed or dispatched further.
    pub fn for_overlay(token: WindowToken, frame: &Rect) -> Self {
        Self {
            x: frame.left,
            y: frame.top,
            width: frame.width(),
            height: frame.height(),
            window_type: WindowType::MediaOverlay,
            flags: WindowFlags::NOT_FOCUSABLE | WindowFlags::LAYOUT_IN_SCREEN | WindowFlags::NOT_TOUCHABLE,
            private_flags: PrivateWindowFlags::NO_MOVE_ANIMATION,
            gravity: Gravity::START | Gravity::TOP,
            format: PixelFormat::Transparent,
            token,
        }
    }

    pub fn move_to(&mut self, frame: &Rect) {
        self.x = frame.left;
        self.y = frame.top;
        self.width = frame.width();
        self.height = frame.height();
    }
}
