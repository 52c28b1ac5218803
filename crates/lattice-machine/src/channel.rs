//! Single-slot rendezvous channels.
//!
//! A channel connects exactly one writing endpoint to exactly one reading
//! endpoint. It holds at most one value; there is no queue behind it.
//!
//! # Freshness
//!
//! Values delivered by a forwarder during the pipes phase are marked fresh.
//! Forwarders never move a fresh value, so a value crosses at most one casing
//! boundary per tick no matter in which order casings are visited. Casings
//! settle their channels at the start of the modules phase.

use crate::error::ChannelBusy;
use crate::Value;

/// A capacity-1 buffer between two port endpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Channel {
    value: Option<Value>,
    fresh: bool,
    reader_waiting: bool,
}

impl Channel {
    /// Store a value written by a module.
    ///
    /// Wakes a waiting reader, which may then consume the value in the same
    /// tick if it has not stepped yet.
    pub fn write(&mut self, value: Value) -> Result<(), ChannelBusy> {
        self.put(value, false)
    }

    /// Store a value that just crossed a casing boundary.
    pub fn deliver(&mut self, value: Value) -> Result<(), ChannelBusy> {
        self.put(value, true)
    }

    fn put(&mut self, value: Value, fresh: bool) -> Result<(), ChannelBusy> {
        if self.value.is_some() {
            return Err(ChannelBusy);
        }
        self.value = Some(value);
        self.fresh = fresh;
        self.reader_waiting = false;
        Ok(())
    }

    /// Consume the pending value, or mark the reader as waiting.
    pub fn read(&mut self) -> Option<Value> {
        match self.value.take() {
            Some(value) => {
                self.fresh = false;
                self.reader_waiting = false;
                Some(value)
            }
            None => {
                self.reader_waiting = true;
                None
            }
        }
    }

    /// The pending value, without consuming it.
    pub fn peek(&self) -> Option<Value> {
        self.value
    }

    /// The pending value if it did not arrive during the current pipes phase.
    pub fn peek_settled(&self) -> Option<Value> {
        if self.fresh {
            None
        } else {
            self.value
        }
    }

    /// Consume the pending value without touching the waiting flag.
    pub(crate) fn take(&mut self) -> Option<Value> {
        self.fresh = false;
        self.value.take()
    }

    /// Clear the freshness mark so forwarders may move the value again.
    pub fn settle(&mut self) {
        self.fresh = false;
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_none()
    }

    pub fn is_reader_waiting(&self) -> bool {
        self.reader_waiting
    }

    /// Drop any pending value and waiting reader.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
