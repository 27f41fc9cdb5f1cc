//! Bounded hand-off between the parser and the serializer.
//!
//! Items are `Delivery::Record` or the explicit `Delivery::EndOfStream`
//! marker. Every item the consumer takes must be acknowledged; the producer
//! can then [`RecordSender::drain`] until all of its items have been
//! acknowledged.

use super::error::{ConvertError, Result};
use super::types::GameRecord;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub enum Delivery {
    Record(GameRecord),
    EndOfStream,
}

#[derive(Debug, Default)]
struct AckState {
    enqueued: u64,
    acknowledged: u64,
    consumer_gone: bool,
}

#[derive(Debug, Default)]
struct Shared {
    acks: Mutex<AckState>,
    acked: Condvar,
    terminated: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, AckState> {
        // The counters stay consistent even if a holder panicked.
        self.acks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Create a delivery channel holding at most `capacity` undelivered items.
pub fn channel(capacity: usize) -> Result<(RecordSender, RecordReceiver)> {
    if capacity == 0 {
        return Err(ConvertError::Config(
            "Invalid channel capacity 0. The capacity must be at least 1.".to_string(),
        ));
    }

    let (tx, rx) = bounded(capacity);
    let shared = Arc::new(Shared::default());
    Ok((
        RecordSender {
            tx,
            shared: Arc::clone(&shared),
        },
        RecordReceiver {
            rx,
            shared,
            finished: false,
        },
    ))
}

#[derive(Debug, Clone)]
pub struct RecordSender {
    tx: Sender<Delivery>,
    shared: Arc<Shared>,
}

impl RecordSender {
    /// Enqueue a completed record, blocking while the channel is full.
    pub fn send(&self, record: GameRecord) -> Result<()> {
        if self.shared.terminated.load(Ordering::SeqCst) {
            return Err(ConvertError::ProtocolViolation(
                "record sent after the termination signal",
            ));
        }
        self.push(Delivery::Record(record))
    }

    /// Enqueue the termination signal. Only one may ever be sent per channel.
    pub fn finish(&self) -> Result<()> {
        if self.shared.terminated.swap(true, Ordering::SeqCst) {
            return Err(ConvertError::ProtocolViolation(
                "termination signal sent twice",
            ));
        }
        self.push(Delivery::EndOfStream)
    }

    fn push(&self, item: Delivery) -> Result<()> {
        // Count before sending so a fast acknowledgment never overtakes it.
        self.shared.lock().enqueued += 1;

        self.tx.send(item).map_err(|_| {
            self.shared.lock().enqueued -= 1;
            ConvertError::ChannelClosed("serializer stopped receiving")
        })
    }

    /// Block until every item enqueued so far has been acknowledged.
    pub fn drain(&self) -> Result<()> {
        let mut state = self.shared.lock();
        while state.acknowledged < state.enqueued {
            if state.consumer_gone {
                return Err(ConvertError::ChannelClosed(
                    "serializer exited before acknowledging every record",
                ));
            }
            state = self
                .shared
                .acked
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        Ok(())
    }

    /// Items currently waiting in the channel.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.tx.len()
    }

    /// Items enqueued but not yet acknowledged.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> u64 {
        let state = self.shared.lock();
        state.enqueued - state.acknowledged
    }
}

#[derive(Debug)]
pub struct RecordReceiver {
    rx: Receiver<Delivery>,
    shared: Arc<Shared>,
    finished: bool,
}

impl RecordReceiver {
    /// Take the next item. Fails if every sender is gone before the
    /// termination signal arrived, or if called after it.
    pub fn recv(&mut self) -> Result<Delivery> {
        if self.finished {
            return Err(ConvertError::ProtocolViolation(
                "receive after the termination signal",
            ));
        }

        match self.rx.recv() {
            Ok(item) => {
                if matches!(item, Delivery::EndOfStream) {
                    self.finished = true;
                }
                Ok(item)
            }
            Err(_) => Err(ConvertError::ChannelClosed(
                "parser stopped before sending the termination signal",
            )),
        }
    }

    /// Acknowledge one item taken with [`recv`](Self::recv).
    pub fn ack(&self) {
        let mut state = self.shared.lock();
        if state.acknowledged < state.enqueued {
            state.acknowledged += 1;
        }
        self.shared.acked.notify_all();
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Drop for RecordReceiver {
    fn drop(&mut self) {
        self.shared.lock().consumer_gone = true;
        self.shared.acked.notify_all();
    }
}
