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

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use crate::errors::ValidationError;

/// Engine-assigned identifier used to address queued tasks to a session.
pub type SessionId = NonZeroU32;

/// Free-form key/value payload of session events and private commands.
pub type Bundle = BTreeMap<String, String>;

/// Opaque token of the window the overlay is attached to. Owned by the window system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowToken(pub u64);

impl fmt::Display for WindowToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    /// Saturates at the `i32` bounds for frames wider than `i32::MAX`.
    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rect({}, {} - {}, {})", self.left, self.top, self.right, self.bottom)
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackType {
    Audio = 0,
    Video = 1,
    Subtitle = 2,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub track_type: TrackType,
    pub id: String,
    pub language: Option<String>,
    pub selected: bool,
}

impl TrackInfo {
    pub fn new(track_type: TrackType, id: impl Into<String>) -> Self {
        Self { track_type, id: id.into(), language: None, selected: false }
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }
}

/// Rejects track lists that mark more than one track selected for the same track type.
pub fn check_track_sanity(tracks: &[TrackInfo]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for track in tracks.iter().filter(|t| t.selected) {
        if !seen.insert(track.track_type) {
            return Err(ValidationError::DuplicateSelectedTrack(track.track_type));
        }
    }
    Ok(())
}

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoUnavailableReason {
    Unknown = 0,
    Tuning = 1,
    WeakSignal = 2,
    Buffering = 3,
}

impl TryFrom<i32> for VideoUnavailableReason {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unknown),
            1 => Ok(Self::Tuning),
            2 => Ok(Self::WeakSignal),
            3 => Ok(Self::Buffering),
            other => Err(ValidationError::UnknownVideoUnavailableReason(other)),
        }
    }
}

/// Content rating in its flattened form `domain/rating_system/rating[/sub_rating...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRating {
    pub domain: String,
    pub rating_system: String,
    pub rating: String,
    pub sub_ratings: Vec<String>,
}

impl ContentRating {
    pub fn new(domain: &str, rating_system: &str, rating: &str, sub_ratings: &[&str]) -> Self {
        Self {
            domain: domain.to_string(),
            rating_system: rating_system.to_string(),
            rating: rating.to_string(),
            sub_ratings: sub_ratings.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FromStr for ContentRating {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() < 3 || parts.iter().any(|p| p.trim().is_empty()) {
            return Err(ValidationError::MalformedRating(s.to_string()));
        }
        Ok(Self {
            domain: parts[0].to_string(),
            rating_system: parts[1].to_string(),
            rating: parts[2].to_string(),
            sub_ratings: parts[3..].iter().map(|p| p.to_string()).collect(),
        })
    }
}

impl fmt::Display for ContentRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.rating_system, self.rating)?;
        for sub_rating in &self.sub_ratings {
            write!(f, "/{}", sub_rating)?;
        }
        Ok(())
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputType {
    #[default]
    Other = 1000,
    Tuner = 0,
    Composite = 1001,
    SVideo = 1002,
    Scart = 1003,
    Component = 1004,
    Vga = 1005,
    Dvi = 1006,
    Hdmi = 1007,
    DisplayPort = 1008,
}

/// Description of an input source published to observers.
#[derive(Debug, Clone, PartialEq)]
pub struct InputInfo {
    pub id: String,
    pub service_name: String,
    pub input_type: InputType,
    pub label: Option<String>,
}

/// Hardware reported by the platform as plugged in or removed.
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareInfo {
    pub device_id: u32,
    pub input_type: InputType,
    pub hdmi_port_id: Option<u32>,
}

/// HDMI-CEC logical device reported by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct CecDeviceInfo {
    pub logical_address: u8,
    pub physical_address: u16,
    pub port_id: u32,
    pub vendor_id: u32,
    pub display_name: String,
}
