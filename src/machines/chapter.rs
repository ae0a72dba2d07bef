//! Chapter approval sub-machine.
//!
//! Each chapter cycles through write, QA, and approval independently of
//! its siblings. Rejection re-queues the chapter for an external rewrite,
//! and the loop is deliberately uncapped; the orchestrator keeps a
//! revision counter for observability only. The `is_published` and
//! `is_free` monetization flags live outside this machine entirely.

use serde::{Deserialize, Serialize};
use std::fmt;

/// QA/write status of a single chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChapterStatus {
    Pending,
    ReadyToWrite,
    Writing,
    Written,
    PendingQa,
    Approved,
    Rejected,
    Published,
}

impl ChapterStatus {
    pub const ALL: [ChapterStatus; 8] = [
        ChapterStatus::Pending,
        ChapterStatus::ReadyToWrite,
        ChapterStatus::Writing,
        ChapterStatus::Written,
        ChapterStatus::PendingQa,
        ChapterStatus::Approved,
        ChapterStatus::Rejected,
        ChapterStatus::Published,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterStatus::Pending => "pending",
            ChapterStatus::ReadyToWrite => "ready_to_write",
            ChapterStatus::Writing => "writing",
            ChapterStatus::Written => "written",
            ChapterStatus::PendingQa => "pending_qa",
            ChapterStatus::Approved => "approved",
            ChapterStatus::Rejected => "rejected",
            ChapterStatus::Published => "published",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChapterStatus::Published)
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action on a chapter. `MarkReady`, `Approve`, `Reject`, and `Publish`
/// come from reviewers; `BeginWriting`, `CompleteWriting`, and `SubmitQa`
/// are reported by the writer worker as it picks up and finishes jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "action")]
pub enum ChapterAction {
    MarkReady,
    BeginWriting,
    CompleteWriting,
    SubmitQa,
    Approve,
    Reject { notes: String },
    Publish,
}

impl ChapterAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChapterAction::MarkReady => "mark_ready",
            ChapterAction::BeginWriting => "begin_writing",
            ChapterAction::CompleteWriting => "complete_writing",
            ChapterAction::SubmitQa => "submit_qa",
            ChapterAction::Approve => "approve",
            ChapterAction::Reject { .. } => "reject",
            ChapterAction::Publish => "publish",
        }
    }
}

impl fmt::Display for ChapterAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition table for the chapter sub-machine. Payload guards (non-empty
/// rejection notes) are checked at the façade boundary before this lookup.
///
/// `begin_writing` from `rejected` is the rewrite pickup: the worker
/// claims a bounced chapter the same way it claims a fresh one.
pub fn next_status(status: ChapterStatus, action: &ChapterAction) -> Option<ChapterStatus> {
    use ChapterAction as A;
    use ChapterStatus as S;

    match (status, action) {
        (S::Pending, A::MarkReady) => Some(S::ReadyToWrite),
        (S::ReadyToWrite, A::BeginWriting) => Some(S::Writing),
        (S::Rejected, A::BeginWriting) => Some(S::Writing),
        (S::Writing, A::CompleteWriting) => Some(S::Written),
        (S::Written, A::SubmitQa) => Some(S::PendingQa),
        (S::Written, A::Approve) => Some(S::Approved),
        (S::PendingQa, A::Approve) => Some(S::Approved),
        (S::Written, A::Reject { .. }) => Some(S::Rejected),
        (S::PendingQa, A::Reject { .. }) => Some(S::Rejected),
        (S::Approved, A::Reject { .. }) => Some(S::Rejected),
        (S::Approved, A::Publish) => Some(S::Published),
        _ => None,
    }
}
