//! The per-connection command slot.
//!
//! IMAP allows one command in flight. The slot records which one, and
//! whether the stream is still trustworthy, so that a command issued at the
//! wrong moment fails before anything is written.

use tracing::debug;

use crate::types::Tag;
use crate::{Error, Result};

/// State of the command slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) enum Operation {
    /// No command outstanding.
    #[default]
    Ready,
    /// A command was sent and its completion has not been read.
    Active {
        /// Tag of the outstanding command.
        tag: Tag,
    },
    /// IDLE is running; only DONE may be sent.
    Idle {
        /// Tag of the IDLE command.
        tag: Tag,
    },
    /// The stream can no longer be trusted.
    Poisoned(String),
    /// Logged out or closed by the server. Absorbing.
    Disposed,
}

impl Operation {
    /// Fails unless a new command may be sent.
    pub(crate) fn ensure_ready(&self) -> Result<()> {
        match self {
            Self::Ready => Ok(()),
            Self::Active { tag } => Err(Error::Precondition(format!(
                "command {tag} did not complete; the connection must be discarded"
            ))),
            Self::Idle { tag } => Err(Error::Precondition(format!(
                "IDLE {tag} is running; send DONE first"
            ))),
            Self::Poisoned(reason) => Err(Error::Precondition(format!(
                "connection is unusable after an earlier failure: {reason}"
            ))),
            Self::Disposed => Err(Error::Precondition("connection is closed".to_string())),
        }
    }

    /// Marks `tag` as outstanding.
    pub(crate) fn begin(&mut self, tag: &Tag) -> Result<()> {
        self.ensure_ready()?;
        *self = Self::Active { tag: tag.clone() };
        Ok(())
    }

    /// Returns the slot to `Ready` after a completion was read.
    pub(crate) fn finish(&mut self) {
        if matches!(self, Self::Active { .. } | Self::Idle { .. }) {
            *self = Self::Ready;
        }
    }

    /// Switches the outstanding command to IDLE after its continuation.
    pub(crate) fn enter_idle(&mut self) {
        if let Self::Active { tag } = self {
            debug!(%tag, "entered IDLE");
            *self = Self::Idle { tag: tag.clone() };
        }
    }

    /// Tag of the running IDLE, if any.
    pub(crate) const fn idle_tag(&self) -> Option<&Tag> {
        match self {
            Self::Idle { tag } => Some(tag),
            _ => None,
        }
    }

    pub(crate) fn poison(&mut self, reason: String) {
        if !matches!(self, Self::Disposed) {
            debug!(%reason, "connection poisoned");
            *self = Self::Poisoned(reason);
        }
    }

    pub(crate) fn dispose(&mut self) {
        *self = Self::Disposed;
    }

    pub(crate) const fn is_usable(&self) -> bool {
        !matches!(self, Self::Poisoned(_) | Self::Disposed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle() {
        let mut op = Operation::default();
        let tag = Tag::new("00001");
        op.begin(&tag).unwrap();
        assert!(matches!(
            op.begin(&Tag::new("00002")),
            Err(Error::Precondition(_))
        ));
        op.finish();
        assert_eq!(op, Operation::Ready);
    }

    #[test]
    fn idle_blocks_everything() {
        let mut op = Operation::default();
        op.begin(&Tag::new("00004")).unwrap();
        op.enter_idle();
        assert_eq!(op.idle_tag(), Some(&Tag::new("00004")));
        assert!(op.ensure_ready().is_err());
        op.finish();
        assert!(op.ensure_ready().is_ok());
    }

    #[test]
    fn poison_and_dispose_absorb() {
        let mut op = Operation::default();
        op.poison("tag mismatch".to_string());
        assert!(!op.is_usable());
        assert!(op.ensure_ready().is_err());
        op.finish();
        assert!(matches!(op, Operation::Poisoned(_)));

        op.dispose();
        op.poison("late".to_string());
        assert_eq!(op, Operation::Disposed);
    }
}
