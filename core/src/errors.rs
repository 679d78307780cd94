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

use thiserror::Error;

use crate::definitions::TrackType;

/// Input rejected at the call boundary. The operation is aborted without side effects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Two or more selected tracks for track type {0:?}")]
    DuplicateSelectedTrack(TrackType),

    #[error("Unknown video unavailable reason: {0}")]
    UnknownVideoUnavailableReason(i32),

    #[error("Malformed content rating \"{0}\"")]
    MalformedRating(String),

    #[error("Session event type must not be empty")]
    EmptyEventType,
}

/// Delivery failure towards a remote peer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer disconnected; further deliveries are pointless.
    #[error("Remote peer is gone")]
    PeerGone,

    /// The peer is alive but did not accept this delivery.
    #[error("Remote peer queue is full")]
    QueueFull,
}

impl TransportError {
    pub fn is_peer_gone(&self) -> bool {
        matches!(self, TransportError::PeerGone)
    }
}

/// Error raised by the window system while attaching an overlay.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("Window token {0} is not valid")]
    BadToken(u64),

    #[error("Window system error: {0}")]
    Other(String),
}

/// Error type for operations exposed by the host and session handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The event queue worker has stopped; nothing more can be enqueued.
    #[error("Event queue is closed")]
    QueueClosed,

    /// The worker dropped the request without answering it.
    #[error("No reply from event queue worker")]
    NoReply,

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),
}
