//! Producer to consumer frame hand-off.
//!
//! Two in-process lanes connect the capture worker to the display
//! poller: one for annotated frames, one for the session-end notice.
//! Both hold at most one message. The frame lane is lossy: when the
//! consumer has not polled since the last publish, the stale frame is
//! evicted and the fresh one takes its place, so the consumer only ever
//! sees the most recent frame and the producer never blocks.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::vision::FrameInfo;

/// One published frame: the JPEG-encoded annotated image plus its
/// detection side-channel.
#[derive(Debug, Clone)]
pub struct FramePacket {
    pub jpeg: Vec<u8>,
    pub info: FrameInfo,
}

/// Why a capture session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopCause {
    /// Stop was requested through the monitor state.
    Requested,
    /// The camera failed to open or read.
    DeviceFailure,
    /// An unexpected error inside the capture loop.
    Fault,
}

impl std::fmt::Display for StopCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StopCause::Requested => "requested",
            StopCause::DeviceFailure => "device failure",
            StopCause::Fault => "fault",
        };
        f.write_str(name)
    }
}

/// Notice that the producer finished a session.
#[derive(Debug, Clone)]
pub struct SessionEnd {
    pub cause: StopCause,
    pub at: DateTime<Utc>,
}

/// Create a connected publisher/receiver pair.
pub fn channel() -> (FramePublisher, FrameReceiver) {
    let (frame_tx, frame_rx) = bounded(1);
    let (end_tx, end_rx) = bounded(1);
    let publisher = FramePublisher {
        frames: frame_tx,
        frames_rx: frame_rx.clone(),
        end: end_tx,
        end_rx: end_rx.clone(),
    };
    let receiver = FrameReceiver {
        frames: frame_rx,
        end: end_rx,
    };
    (publisher, receiver)
}

/// Producer side of the hand-off.
///
/// Holds receiver clones of both lanes, so the lanes stay connected for
/// the publisher's whole lifetime and publishing can never fail.
#[derive(Debug, Clone)]
pub struct FramePublisher {
    frames: Sender<FramePacket>,
    frames_rx: Receiver<FramePacket>,
    end: Sender<SessionEnd>,
    end_rx: Receiver<SessionEnd>,
}

impl FramePublisher {
    /// Publish one frame, evicting an undelivered older frame if the
    /// consumer has not polled since the last publish. Returns true when
    /// a frame was evicted.
    pub fn publish(&self, packet: FramePacket) -> bool {
        let mut packet = packet;
        let mut dropped = false;
        loop {
            match self.frames.try_send(packet) {
                Ok(()) => return dropped,
                Err(TrySendError::Full(returned)) => {
                    if self.frames_rx.try_recv().is_ok() {
                        dropped = true;
                    }
                    packet = returned;
                }
                Err(TrySendError::Disconnected(_)) => return dropped,
            }
        }
    }

    /// Post the session-end notice. An unconsumed notice from an earlier
    /// session is evicted first.
    pub fn notify_end(&self, cause: StopCause, at: DateTime<Utc>) {
        let mut notice = SessionEnd { cause, at };
        loop {
            match self.end.try_send(notice) {
                Ok(()) => return,
                Err(TrySendError::Full(returned)) => {
                    let _ = self.end_rx.try_recv();
                    notice = returned;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// Consumer side of the hand-off. Exactly one consumer should poll it.
#[derive(Debug)]
pub struct FrameReceiver {
    frames: Receiver<FramePacket>,
    end: Receiver<SessionEnd>,
}

impl FrameReceiver {
    /// Take the pending frame, if any. Empty is a normal result between
    /// publishes, not an error.
    pub fn try_receive(&self) -> Option<FramePacket> {
        self.frames.try_recv().ok()
    }

    /// Take the pending session-end notice, if any.
    pub fn try_session_end(&self) -> Option<SessionEnd> {
        self.end.try_recv().ok()
    }
}
