//! Book lifecycle state machine.
//!
//! Pure transition logic for a book's production pipeline, from concept
//! approval through keyword research, metadata generation, writing, QA,
//! and publication. The table here is authoritative: any (status, action)
//! pair it does not name is an invalid transition. Side effects (queueing
//! generation work) are decided here but executed by the orchestrator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Artifact produced out of band by the content-generation worker.
/// Transitions into generation stages enqueue one job per artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Keywords,
    Description,
    Bible,
    ChapterBatch,
}

impl Artifact {
    pub fn as_str(&self) -> &'static str {
        match self {
            Artifact::Keywords => "keywords",
            Artifact::Description => "description",
            Artifact::Bible => "bible",
            Artifact::ChapterBatch => "chapter_batch",
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of the book production pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookStatus {
    ConceptPending,
    KeywordResearch,
    KeywordApproved,
    DescriptionGeneration,
    DescriptionApproved,
    BibleGeneration,
    BibleApproved,
    WritingInProgress,
    QaReview,
    ExportReady,
    PublishedKdp,
    PublishedAll,
    Archived,
}

impl BookStatus {
    pub const ALL: [BookStatus; 13] = [
        BookStatus::ConceptPending,
        BookStatus::KeywordResearch,
        BookStatus::KeywordApproved,
        BookStatus::DescriptionGeneration,
        BookStatus::DescriptionApproved,
        BookStatus::BibleGeneration,
        BookStatus::BibleApproved,
        BookStatus::WritingInProgress,
        BookStatus::QaReview,
        BookStatus::ExportReady,
        BookStatus::PublishedKdp,
        BookStatus::PublishedAll,
        BookStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookStatus::ConceptPending => "concept_pending",
            BookStatus::KeywordResearch => "keyword_research",
            BookStatus::KeywordApproved => "keyword_approved",
            BookStatus::DescriptionGeneration => "description_generation",
            BookStatus::DescriptionApproved => "description_approved",
            BookStatus::BibleGeneration => "bible_generation",
            BookStatus::BibleApproved => "bible_approved",
            BookStatus::WritingInProgress => "writing_in_progress",
            BookStatus::QaReview => "qa_review",
            BookStatus::ExportReady => "export_ready",
            BookStatus::PublishedKdp => "published_kdp",
            BookStatus::PublishedAll => "published_all",
            BookStatus::Archived => "archived",
        }
    }

    /// Overall pipeline progress for display. Fixed lookup, never a guard.
    pub fn progress_percent(&self) -> u8 {
        match self {
            BookStatus::ConceptPending => 5,
            BookStatus::KeywordResearch => 10,
            BookStatus::KeywordApproved => 15,
            BookStatus::DescriptionGeneration => 20,
            BookStatus::DescriptionApproved => 25,
            BookStatus::BibleGeneration => 30,
            BookStatus::BibleApproved => 35,
            BookStatus::WritingInProgress => 50,
            BookStatus::QaReview => 80,
            BookStatus::ExportReady => 90,
            BookStatus::PublishedKdp => 95,
            BookStatus::PublishedAll => 100,
            BookStatus::Archived => 100,
        }
    }

    /// Export-file generation is only legal at or past this gate.
    pub fn is_exportable(&self) -> bool {
        matches!(
            self,
            BookStatus::ExportReady | BookStatus::PublishedKdp | BookStatus::PublishedAll
        )
    }

    /// Visibility on public storefronts.
    pub fn is_published(&self) -> bool {
        matches!(self, BookStatus::PublishedKdp | BookStatus::PublishedAll)
    }

    /// Terminal state; freezes every further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookStatus::Archived)
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action an operator (or scheduled sweep) can request on a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookAction {
    StartKeywordResearch,
    ApproveKeywords,
    StartDescriptionGeneration,
    ApproveDescription,
    StartBibleGeneration,
    ApproveBible,
    StartWriting,
    SubmitForQa,
    ReturnToWriting,
    ApproveForExport,
    PublishToKdp,
    PublishToAllPlatforms,
}

impl BookAction {
    pub const ALL: [BookAction; 12] = [
        BookAction::StartKeywordResearch,
        BookAction::ApproveKeywords,
        BookAction::StartDescriptionGeneration,
        BookAction::ApproveDescription,
        BookAction::StartBibleGeneration,
        BookAction::ApproveBible,
        BookAction::StartWriting,
        BookAction::SubmitForQa,
        BookAction::ReturnToWriting,
        BookAction::ApproveForExport,
        BookAction::PublishToKdp,
        BookAction::PublishToAllPlatforms,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookAction::StartKeywordResearch => "start_keyword_research",
            BookAction::ApproveKeywords => "approve_keywords",
            BookAction::StartDescriptionGeneration => "start_description_generation",
            BookAction::ApproveDescription => "approve_description",
            BookAction::StartBibleGeneration => "start_bible_generation",
            BookAction::ApproveBible => "approve_bible",
            BookAction::StartWriting => "start_writing",
            BookAction::SubmitForQa => "submit_for_qa",
            BookAction::ReturnToWriting => "return_to_writing",
            BookAction::ApproveForExport => "approve_for_export",
            BookAction::PublishToKdp => "publish_to_kdp",
            BookAction::PublishToAllPlatforms => "publish_to_all_platforms",
        }
    }
}

impl fmt::Display for BookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authoritative transition table. Returns the next status, or `None`
/// when the action is not legal from the given status.
///
/// `start_writing` is reachable from `keyword_approved` and
/// `bible_generation` as explicit skips of the optional metadata stages.
/// `archived` has no entry on purpose: archiving is administrative and
/// goes through [`crate::orchestrator::Orchestrator::archive_book`].
pub fn next_status(status: BookStatus, action: BookAction) -> Option<BookStatus> {
    use BookAction as A;
    use BookStatus as S;

    match (status, action) {
        (S::ConceptPending, A::StartKeywordResearch) => Some(S::KeywordResearch),
        (S::KeywordResearch, A::ApproveKeywords) => Some(S::KeywordApproved),
        (S::KeywordApproved, A::StartDescriptionGeneration) => Some(S::DescriptionGeneration),
        (S::KeywordApproved, A::StartWriting) => Some(S::WritingInProgress),
        (S::DescriptionGeneration, A::ApproveDescription) => Some(S::DescriptionApproved),
        (S::DescriptionApproved, A::StartBibleGeneration) => Some(S::BibleGeneration),
        (S::BibleGeneration, A::ApproveBible) => Some(S::BibleApproved),
        (S::BibleGeneration, A::StartWriting) => Some(S::WritingInProgress),
        (S::BibleApproved, A::StartWriting) => Some(S::WritingInProgress),
        (S::WritingInProgress, A::SubmitForQa) => Some(S::QaReview),
        (S::QaReview, A::ReturnToWriting) => Some(S::WritingInProgress),
        (S::QaReview, A::ApproveForExport) => Some(S::ExportReady),
        (S::ExportReady, A::PublishToKdp) => Some(S::PublishedKdp),
        (S::PublishedKdp, A::PublishToAllPlatforms) => Some(S::PublishedAll),
        _ => None,
    }
}

/// Generation work queued as a side effect of entering the new status.
/// Fire-and-forget: the transition commits regardless of enqueue outcome.
pub fn triggered_artifact(new_status: BookStatus) -> Option<Artifact> {
    match new_status {
        BookStatus::KeywordResearch => Some(Artifact::Keywords),
        BookStatus::DescriptionGeneration => Some(Artifact::Description),
        BookStatus::BibleGeneration => Some(Artifact::Bible),
        BookStatus::WritingInProgress => Some(Artifact::ChapterBatch),
        _ => None,
    }
}

/// Archiving guard: only published books can be archived.
pub fn can_archive(status: BookStatus) -> bool {
    status.is_published()
}
