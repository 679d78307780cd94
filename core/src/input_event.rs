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

//! Low-level input events delivered to sessions and the channel that carries them.

use bitflags::bitflags;
use tokio::sync::{mpsc, oneshot};

use crate::errors::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCode(pub u32);

impl KeyCode {
    pub const DPAD_UP: KeyCode = KeyCode(19);
    pub const DPAD_DOWN: KeyCode = KeyCode(20);
    pub const DPAD_LEFT: KeyCode = KeyCode(21);
    pub const DPAD_RIGHT: KeyCode = KeyCode(22);
    pub const DPAD_CENTER: KeyCode = KeyCode(23);
    pub const VOLUME_UP: KeyCode = KeyCode(24);
    pub const VOLUME_DOWN: KeyCode = KeyCode(25);
    pub const TAB: KeyCode = KeyCode(61);
    pub const SPACE: KeyCode = KeyCode(62);
    pub const ENTER: KeyCode = KeyCode(66);
    pub const PAGE_UP: KeyCode = KeyCode(92);
    pub const PAGE_DOWN: KeyCode = KeyCode(93);
    pub const MOVE_HOME: KeyCode = KeyCode(122);
    pub const MOVE_END: KeyCode = KeyCode(123);
    pub const CHANNEL_UP: KeyCode = KeyCode(166);
    pub const CHANNEL_DOWN: KeyCode = KeyCode(167);

    /// Keys used for UI navigation inside an overlay.
    pub fn is_navigation_key(&self) -> bool {
        matches!(
            *self,
            KeyCode::DPAD_LEFT
                | KeyCode::DPAD_RIGHT
                | KeyCode::DPAD_UP
                | KeyCode::DPAD_DOWN
                | KeyCode::DPAD_CENTER
                | KeyCode::PAGE_UP
                | KeyCode::PAGE_DOWN
                | KeyCode::MOVE_HOME
                | KeyCode::MOVE_END
                | KeyCode::TAB
                | KeyCode::SPACE
                | KeyCode::ENTER
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Down,
    Up,
    Multiple,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyEvent {
    pub action: KeyAction,
    pub key_code: KeyCode,
    pub repeat_count: u32,
    pub long_press: bool,
}

impl KeyEvent {
    pub fn down(key_code: KeyCode) -> Self {
        Self { action: KeyAction::Down, key_code, repeat_count: 0, long_press: false }
    }

    pub fn up(key_code: KeyCode) -> Self {
        Self { action: KeyAction::Up, key_code, repeat_count: 0, long_press: false }
    }

    pub fn long_press(key_code: KeyCode, repeat_count: u32) -> Self {
        Self { action: KeyAction::Down, key_code, repeat_count, long_press: true }
    }

    pub fn multiple(key_code: KeyCode, repeat_count: u32) -> Self {
        Self { action: KeyAction::Multiple, key_code, repeat_count, long_press: false }
    }
}

bitflags! {
    /// Source classes of a motion event.
    #[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
    pub struct InputSource: u32 {
        const CLASS_BUTTON = 0x01;
        const CLASS_POINTER = 0x02;
        const CLASS_TRACKBALL = 0x04;
        const CLASS_POSITION = 0x08;
        const CLASS_JOYSTICK = 0x10;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAction {
    Down,
    Up,
    Move,
    Cancel,
    HoverMove,
    Scroll,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MotionEvent {
    pub source: InputSource,
    pub action: MotionAction,
    pub x: f32,
    pub y: f32,
}

impl MotionEvent {
    pub fn new(source: InputSource, action: MotionAction, x: f32, y: f32) -> Self {
        Self { source, action, x, y }
    }

    /// Pointer-class event carrying a touch gesture action.
    pub fn is_touch_event(&self) -> bool {
        self.source.contains(InputSource::CLASS_POINTER)
            && matches!(
                self.action,
                MotionAction::Down | MotionAction::Up | MotionAction::Move | MotionAction::Cancel
            )
    }

    pub fn is_trackball_event(&self) -> bool {
        self.source.contains(InputSource::CLASS_TRACKBALL)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key(KeyEvent),
    Motion(MotionEvent),
}

impl InputEvent {
    pub fn is_navigation_key(&self) -> bool {
        match self {
            InputEvent::Key(key) => key.key_code.is_navigation_key(),
            InputEvent::Motion(_) => false,
        }
    }
}

/// Outcome of offering an input event to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    Handled,
    NotHandled,
    /// Handed to the overlay's own pipeline; completion happens out of band.
    InProgress,
}

/// Completes one event delivered over an [`InputChannel`].
#[derive(Debug)]
pub struct InputEventFinisher {
    reply: oneshot::Sender<bool>,
}

impl InputEventFinisher {
    pub fn new() -> (Self, oneshot::Receiver<bool>) {
        let (reply, rx) = oneshot::channel();
        (Self { reply }, rx)
    }

    pub fn finish(self, handled: bool) {
        // The sender may have stopped waiting; nothing to do then.
        let _ = self.reply.send(handled);
    }
}

#[derive(Debug)]
pub struct PendingInputEvent {
    pub event: InputEvent,
    pub finisher: InputEventFinisher,
}

/// Sending side of an input channel, held by the client that owns the input focus.
#[derive(Debug, Clone)]
pub struct InputChannelSender {
    tx: mpsc::UnboundedSender<PendingInputEvent>,
}

impl InputChannelSender {
    /// Sends an event and returns a receiver resolved with the "handled" flag once the
    /// session (or its overlay) finishes the event.
    pub fn send(&self, event: InputEvent) -> Result<oneshot::Receiver<bool>, TransportError> {
        let (finisher, rx) = InputEventFinisher::new();
        self.tx
            .send(PendingInputEvent { event, finisher })
            .map_err(|_| TransportError::PeerGone)?;
        Ok(rx)
    }
}

/// Receiving side of an input channel, bound to a session when it is created.
#[derive(Debug)]
pub struct InputChannel {
    rx: mpsc::UnboundedReceiver<PendingInputEvent>,
}

impl InputChannel {
    pub async fn recv(&mut self) -> Option<PendingInputEvent> {
        self.rx.recv().await
    }
}

pub fn input_channel() -> (InputChannelSender, InputChannel) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InputChannelSender { tx }, InputChannel { rx })
}
