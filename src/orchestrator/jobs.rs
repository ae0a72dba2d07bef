//! Side-effect job queue for the asynchronous content workers.
//!
//! Transitions hand expensive work (keyword research, description and
//! bible generation, chapter writing and rewriting) to an external worker
//! and return immediately. Enqueueing is fire-and-forget: a failed
//! enqueue never rolls back the committed transition, it is logged and
//! retried through the same action. Duplicate requests for the same
//! artifact are coalesced while one is still pending, so re-running a
//! generation action cannot fan out into two concurrent jobs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Mutex;
use uuid::Uuid;

use crate::entities::{BookId, ChapterId};
use crate::machines::book::Artifact;

/// Work order for the external content-generation worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum GenerationJob {
    /// Produce a book-level artifact (keywords, description, bible, or
    /// the next chapter batch).
    GenerateArtifact { book_id: BookId, artifact: Artifact },
    /// Write one chapter that was marked ready.
    WriteChapter { book_id: BookId, chapter_id: ChapterId },
    /// Rewrite a rejected chapter, addressing the reviewer's notes.
    RewriteChapter {
        book_id: BookId,
        chapter_id: ChapterId,
        notes: String,
    },
}

impl GenerationJob {
    /// Coalescing key: one pending job per (entity, artifact kind). A
    /// rewrite supersedes nothing and is keyed like a write so a reject
    /// issued while the write job is still queued does not double up.
    pub fn key(&self) -> (Uuid, &'static str) {
        match self {
            GenerationJob::GenerateArtifact { book_id, artifact } => (book_id.0, artifact.as_str()),
            GenerationJob::WriteChapter { chapter_id, .. }
            | GenerationJob::RewriteChapter { chapter_id, .. } => (chapter_id.0, "chapter_write"),
        }
    }
}

/// Whether an enqueue produced a new pending job or folded into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    Coalesced,
}

/// Seam between the orchestrator and whatever actually runs jobs. The
/// production deployment backs this with a task broker; tests use the
/// in-memory queue below.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: GenerationJob) -> anyhow::Result<EnqueueOutcome>;
}

#[derive(Debug, Default)]
struct QueueInner {
    pending: Vec<GenerationJob>,
    keys: HashSet<(Uuid, &'static str)>,
}

/// In-memory queue with per-key coalescing. Workers drain it with
/// [`InMemoryJobQueue::take_pending`], which frees the keys so the next
/// rerun request enqueues again.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    inner: Mutex<QueueInner>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything currently pending, releasing the coalescing keys.
    pub fn take_pending(&self) -> Vec<GenerationJob> {
        let mut inner = self.inner.lock().expect("job queue lock poisoned");
        inner.keys.clear();
        std::mem::take(&mut inner.pending)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().expect("job queue lock poisoned").pending.len()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: GenerationJob) -> anyhow::Result<EnqueueOutcome> {
        let mut inner = self.inner.lock().expect("job queue lock poisoned");
        if !inner.keys.insert(job.key()) {
            tracing::debug!(job = ?job, "duplicate generation job coalesced");
            return Ok(EnqueueOutcome::Coalesced);
        }
        inner.pending.push(job);
        Ok(EnqueueOutcome::Queued)
    }
}
