//! Run status state machine shared by job runs and task runs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a job run or a task run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created but never performed.
    #[default]
    Unstarted,
    /// Actively being worked on.
    InProgress,
    /// Waiting for an external bridge to call back.
    PendingBridge,
    /// Waiting for block confirmations.
    PendingConfirmations,
    /// Waiting for the ethereum node connection to come back.
    PendingConnection,
    /// Failed; terminal.
    Errored,
    /// Finished successfully; terminal.
    Completed,
}

impl RunStatus {
    /// A task run may only begin from `Unstarted`.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Unstarted)
    }

    /// A job run may be picked up by a fresh execution pass.
    pub fn runnable(&self) -> bool {
        matches!(self, Self::Unstarted | Self::InProgress)
    }

    pub fn unstarted(&self) -> bool {
        matches!(self, Self::Unstarted)
    }

    pub fn in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    pub fn pending_bridge(&self) -> bool {
        matches!(self, Self::PendingBridge)
    }

    pub fn pending_confirmations(&self) -> bool {
        matches!(self, Self::PendingConfirmations)
    }

    pub fn pending_connection(&self) -> bool {
        matches!(self, Self::PendingConnection)
    }

    /// Suspended until some external event arrives.
    pub fn pending(&self) -> bool {
        self.pending_bridge() || self.pending_confirmations() || self.pending_connection()
    }

    pub fn errored(&self) -> bool {
        matches!(self, Self::Errored)
    }

    pub fn completed(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if the status is terminal.
    pub fn finished(&self) -> bool {
        self.errored() || self.completed()
    }

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::InProgress => "in_progress",
            Self::PendingBridge => "pending_bridge",
            Self::PendingConfirmations => "pending_confirmations",
            Self::PendingConnection => "pending_connection",
            Self::Errored => "errored",
            Self::Completed => "completed",
        }
    }

    /// Every status, in declaration order.
    pub const ALL: [RunStatus; 7] = [
        Self::Unstarted,
        Self::InProgress,
        Self::PendingBridge,
        Self::PendingConfirmations,
        Self::PendingConnection,
        Self::Errored,
        Self::Completed,
    ];
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
