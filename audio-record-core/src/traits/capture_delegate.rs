use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::models::error::CaptureError;
use crate::models::metering::MeteringEvent;
use crate::models::state::CaptureState;

/// Event sink for recorder notifications.
///
/// `on_metering` is called from the capture thread once per staged buffer;
/// implementations must not block. Deliveries are fire-and-forget.
pub trait CaptureDelegate: Send + Sync {
    /// Called when the recorder state changes.
    fn on_state_changed(&self, _state: &CaptureState) {}

    /// Called with the loudness of each staged buffer (16-bit mono only).
    fn on_metering(&self, event: &MeteringEvent);

    /// Called when a session fails.
    fn on_error(&self, _error: &CaptureError) {}
}

/// Notification forwarded by [`ChannelDelegate`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    StateChanged(CaptureState),
    Metering(MeteringEvent),
    Error(CaptureError),
}

/// Delegate that forwards events into a bounded channel.
///
/// A full or disconnected channel drops the event: no buffering beyond the
/// channel, no backpressure on the capture thread.
pub struct ChannelDelegate {
    tx: Sender<RecorderEvent>,
    dropped: AtomicU64,
}

impl ChannelDelegate {
    pub fn bounded(capacity: usize) -> (Arc<Self>, Receiver<RecorderEvent>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        let delegate = Arc::new(Self {
            tx,
            dropped: AtomicU64::new(0),
        });
        (delegate, rx)
    }

    /// Events discarded because the receiver was slow or gone.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn forward(&self, event: RecorderEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

impl CaptureDelegate for ChannelDelegate {
    fn on_state_changed(&self, state: &CaptureState) {
        self.forward(RecorderEvent::StateChanged(state.clone()));
    }

    fn on_metering(&self, event: &MeteringEvent) {
        self.forward(RecorderEvent::Metering(*event));
    }

    fn on_error(&self, error: &CaptureError) {
        self.forward(RecorderEvent::Error(error.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metering::MeteringSample;

    fn event() -> MeteringEvent {
        MeteringEvent::new(
            MeteringSample {
                average_db: -20.0,
                peak_db: -10.0,
            },
            0.5,
        )
    }

    #[test]
    fn forwards_events_in_order() {
        let (delegate, rx) = ChannelDelegate::bounded(4);
        delegate.on_state_changed(&CaptureState::Capturing);
        delegate.on_metering(&event());

        assert_eq!(rx.try_recv().unwrap(), RecorderEvent::StateChanged(CaptureState::Capturing));
        assert_eq!(rx.try_recv().unwrap(), RecorderEvent::Metering(event()));
        assert_eq!(delegate.dropped(), 0);
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (delegate, rx) = ChannelDelegate::bounded(1);
        delegate.on_metering(&event());
        delegate.on_metering(&event());
        delegate.on_metering(&event());

        assert_eq!(rx.len(), 1);
        assert_eq!(delegate.dropped(), 2);
    }

    #[test]
    fn disconnected_receiver_is_tolerated() {
        let (delegate, rx) = ChannelDelegate::bounded(1);
        drop(rx);
        delegate.on_error(&CaptureError::NotRecording);
        assert_eq!(delegate.dropped(), 1);
    }
}
