//! Bounded cross-thread channel.
//!
//! Generalized from the teacher's `critical-section`/`RefCell` channel (built
//! for interrupt-safe, single-core embedded access) to a
//! `std::sync::Mutex`-guarded one: real contention between real threads
//! instead of interrupt masking, same fixed-size `heapless::Deque` backing
//! store and the same `try_send`/`try_receive` API shape.

use std::sync::{Mutex, PoisonError};

use heapless::Deque;

/// Error returned when trying to send to a full channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrySendError<T>(pub T);

/// Error returned when trying to receive from an empty channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TryReceiveError;

/// A bounded, thread-safe channel backed by a fixed-size `heapless::Deque`.
pub struct Channel<T, const SIZE: usize> {
    inner: Mutex<Deque<T, SIZE>>,
}

impl<T, const SIZE: usize> Channel<T, SIZE> {
    /// Create a new empty channel.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(Deque::new()) }
    }

    /// Get a sender handle for this channel.
    ///
    /// Multiple senders can coexist; they share access to the same queue.
    #[must_use]
    pub const fn sender(&self) -> Sender<'_, T, SIZE> {
        Sender { channel: self }
    }

    /// Get a receiver handle for this channel.
    ///
    /// Typically only one receiver should drain the queue, but multiple
    /// receivers are allowed (they will compete for messages).
    #[must_use]
    pub const fn receiver(&self) -> Receiver<'_, T, SIZE> {
        Receiver { channel: self }
    }

    /// Try to send a value into the channel.
    ///
    /// Returns `Err(TrySendError(value))` if the channel is full.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        queue.push_back(value).map_err(TrySendError)
    }

    /// Try to receive a value from the channel.
    ///
    /// Returns `Err(TryReceiveError)` if the channel is empty.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        let mut queue = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        queue.pop_front().ok_or(TryReceiveError)
    }
}

impl<T, const SIZE: usize> Default for Channel<T, SIZE> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sender handle for a [`Channel`].
///
/// This is a lightweight reference that can be cloned and passed around.
#[derive(Clone, Copy)]
pub struct Sender<'a, T, const SIZE: usize> {
    channel: &'a Channel<T, SIZE>,
}

impl<T, const SIZE: usize> Sender<'_, T, SIZE> {
    /// Try to send a value into the channel.
    ///
    /// Returns `Err(TrySendError(value))` if the channel is full.
    pub fn try_send(&self, value: T) -> Result<(), TrySendError<T>> {
        self.channel.try_send(value)
    }
}

/// A receiver handle for a [`Channel`].
///
/// This is a lightweight reference that can be cloned and passed around.
#[derive(Clone, Copy)]
pub struct Receiver<'a, T, const SIZE: usize> {
    channel: &'a Channel<T, SIZE>,
}

impl<T, const SIZE: usize> Receiver<'_, T, SIZE> {
    /// Try to receive a value from the channel.
    ///
    /// Returns `Err(TryReceiveError)` if the channel is empty.
    pub fn try_receive(&self) -> Result<T, TryReceiveError> {
        self.channel.try_receive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_then_receive_in_order() {
        let channel: Channel<u32, 4> = Channel::new();
        let sender = channel.sender();
        let receiver = channel.receiver();
        sender.try_send(1).unwrap();
        sender.try_send(2).unwrap();
        assert_eq!(receiver.try_receive(), Ok(1));
        assert_eq!(receiver.try_receive(), Ok(2));
        assert_eq!(receiver.try_receive(), Err(TryReceiveError));
    }

    #[test]
    fn try_send_reports_full() {
        let channel: Channel<u32, 2> = Channel::new();
        let sender = channel.sender();
        sender.try_send(1).unwrap();
        sender.try_send(2).unwrap();
        assert_eq!(sender.try_send(3), Err(TrySendError(3)));
    }

    #[test]
    fn shared_across_threads() {
        let channel: Channel<u32, 8> = Channel::new();
        std::thread::scope(|scope| {
            let sender = channel.sender();
            scope.spawn(move || {
                for i in 0..5 {
                    while sender.try_send(i).is_err() {}
                }
            });
            let receiver = channel.receiver();
            let mut received = Vec::new();
            while received.len() < 5 {
                if let Ok(v) = receiver.try_receive() {
                    received.push(v);
                }
            }
            assert_eq!(received, vec![0, 1, 2, 3, 4]);
        });
    }
}
