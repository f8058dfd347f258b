//! Serial command inbox
//!
//! Parsed commands and receive-side rejections arrive on one ordered queue,
//! so acknowledgments leave in the order their lines came in. A command that
//! finds the shared lock held stays pending and is retried before anything
//! newer; it is never dropped.

use embassy_sync::blocking_mutex::raw::RawMutex;
use twinwheel_protocol::{Request, Response, Syntax};

use super::shared::{Contended, SharedControl};

/// One received line, in arrival order
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Inbound {
    /// Parsed command waiting for the shared lock
    Command(Request),
    /// Line rejected by the receiver; only needs its acknowledgment
    Reject(Response, Syntax),
}

/// Result of one [`CommandInbox::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InboxStep {
    /// Send this acknowledgment, then step again
    Reply(Response, Syntax),
    /// Queue is empty
    Idle,
    /// Lock held; the command is kept for the next attempt
    Contended,
}

/// Pending-slot front end for [`SharedControl`]
#[derive(Debug, Default)]
pub struct CommandInbox {
    pending: Option<Request>,
}

impl CommandInbox {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Command that last found the lock held
    pub fn pending(&self) -> Option<&Request> {
        self.pending.as_ref()
    }

    /// Handle the next item
    ///
    /// The pending command goes first; otherwise `next` is polled once.
    /// Never waits for the lock and never holds it on return, so the caller
    /// can write the reply before stepping again.
    pub fn step<M: RawMutex>(
        &mut self,
        shared: &SharedControl<M>,
        next: impl FnOnce() -> Option<Inbound>,
    ) -> InboxStep {
        let request = match self.pending.take() {
            Some(request) => request,
            None => match next() {
                Some(Inbound::Command(request)) => request,
                Some(Inbound::Reject(response, syntax)) => return InboxStep::Reply(response, syntax),
                None => return InboxStep::Idle,
            },
        };
        match shared.try_apply(request.command) {
            Ok(response) => InboxStep::Reply(response, request.syntax),
            Err(Contended) => {
                self.pending = Some(request);
                InboxStep::Contended
            }
        }
    }
}
