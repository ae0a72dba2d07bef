//! Book lifecycle transition tests.
//!
//! These verify the authoritative transition table end to end through the
//! façade: every legal edge commits, every (status, action) pair outside
//! the table fails with InvalidTransition and leaves state untouched, and
//! the generation side effects fire for the right stages.

use std::sync::Arc;

use bookforge::machines::book;
use bookforge::{
    Artifact, BookAction, BookId, BookStatus, BookforgeConfig, GenerationJob, InMemoryJobQueue,
    Orchestrator, OrchestratorError,
};

fn setup() -> (Orchestrator, Arc<InMemoryJobQueue>) {
    let queue = Arc::new(InMemoryJobQueue::new());
    let orchestrator = Orchestrator::new(BookforgeConfig::default(), queue.clone());
    (orchestrator, queue)
}

async fn drive(orchestrator: &Orchestrator, book_id: BookId, actions: &[BookAction]) {
    for action in actions {
        orchestrator
            .transition_book(book_id, *action)
            .await
            .unwrap_or_else(|e| panic!("driving {action:?} failed: {e}"));
    }
}

/// Action sequence that lands a fresh book in the given status.
fn route_to(status: BookStatus) -> Vec<BookAction> {
    use BookAction as A;
    match status {
        BookStatus::ConceptPending => vec![],
        BookStatus::KeywordResearch => vec![A::StartKeywordResearch],
        BookStatus::KeywordApproved => vec![A::StartKeywordResearch, A::ApproveKeywords],
        BookStatus::DescriptionGeneration => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartDescriptionGeneration,
        ],
        BookStatus::DescriptionApproved => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartDescriptionGeneration,
            A::ApproveDescription,
        ],
        BookStatus::BibleGeneration => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartDescriptionGeneration,
            A::ApproveDescription,
            A::StartBibleGeneration,
        ],
        BookStatus::BibleApproved => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartDescriptionGeneration,
            A::ApproveDescription,
            A::StartBibleGeneration,
            A::ApproveBible,
        ],
        BookStatus::WritingInProgress => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartWriting,
        ],
        BookStatus::QaReview => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartWriting,
            A::SubmitForQa,
        ],
        BookStatus::ExportReady => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartWriting,
            A::SubmitForQa,
            A::ApproveForExport,
        ],
        BookStatus::PublishedKdp => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartWriting,
            A::SubmitForQa,
            A::ApproveForExport,
            A::PublishToKdp,
        ],
        BookStatus::PublishedAll => vec![
            A::StartKeywordResearch,
            A::ApproveKeywords,
            A::StartWriting,
            A::SubmitForQa,
            A::ApproveForExport,
            A::PublishToKdp,
            A::PublishToAllPlatforms,
        ],
        BookStatus::Archived => unreachable!("archiving is administrative, not table-driven"),
    }
}

#[tokio::test]
async fn every_pair_outside_the_table_fails_and_preserves_state() {
    for status in BookStatus::ALL {
        let (orchestrator, _queue) = setup();
        let book = orchestrator.create_book("The Hollow Lighthouse", Some(3), None).unwrap();

        if status == BookStatus::Archived {
            drive(&orchestrator, book.record.id, &route_to(BookStatus::PublishedKdp)).await;
            orchestrator.archive_book(book.record.id).unwrap();
        } else {
            drive(&orchestrator, book.record.id, &route_to(status)).await;
        }

        let before = orchestrator.get_book_state(book.record.id).unwrap();
        assert_eq!(before.book.lifecycle_status, status);

        for action in BookAction::ALL {
            if book::next_status(status, action).is_some() {
                continue;
            }
            let err = orchestrator
                .transition_book(book.record.id, action)
                .await
                .unwrap_err();
            assert!(
                matches!(err, OrchestratorError::InvalidTransition { .. }),
                "{action:?} from {status:?} returned {err:?}"
            );

            let after = orchestrator.get_book_state(book.record.id).unwrap();
            assert_eq!(after.book.lifecycle_status, status, "state leaked on failure");
            assert_eq!(after.version, before.version, "version bumped on failure");
        }
    }
}

#[tokio::test]
async fn approve_keywords_cannot_repeat_after_description_generation_starts() {
    let (orchestrator, _queue) = setup();
    let book = orchestrator.create_book("Nightfall Protocol", Some(3), None).unwrap();
    drive(&orchestrator, book.record.id, &route_to(BookStatus::KeywordApproved)).await;

    let result = orchestrator
        .transition_book(book.record.id, BookAction::StartDescriptionGeneration)
        .await
        .unwrap();
    assert_eq!(result.new_status, BookStatus::DescriptionGeneration);

    let err = orchestrator
        .transition_book(book.record.id, BookAction::ApproveKeywords)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
}

#[tokio::test]
async fn start_writing_skips_bible_approval_from_bible_generation() {
    let (orchestrator, _queue) = setup();
    let book = orchestrator.create_book("The Cartographer's Debt", Some(3), None).unwrap();
    drive(&orchestrator, book.record.id, &route_to(BookStatus::BibleGeneration)).await;

    let result = orchestrator
        .transition_book(book.record.id, BookAction::StartWriting)
        .await
        .unwrap();
    assert_eq!(result.new_status, BookStatus::WritingInProgress);
}

#[tokio::test]
async fn generation_stages_enqueue_artifact_jobs() {
    let (orchestrator, queue) = setup();
    let book = orchestrator.create_book("Glass Harbor", Some(3), None).unwrap();
    drive(
        &orchestrator,
        book.record.id,
        &route_to(BookStatus::DescriptionGeneration),
    )
    .await;

    let jobs = queue.take_pending();
    let artifacts: Vec<Artifact> = jobs
        .iter()
        .filter_map(|job| match job {
            GenerationJob::GenerateArtifact { artifact, .. } => Some(*artifact),
            _ => None,
        })
        .collect();
    assert_eq!(artifacts, vec![Artifact::Keywords, Artifact::Description]);
}

#[tokio::test]
async fn qa_bounce_returns_to_writing_without_duplicating_chapters() {
    let (orchestrator, _queue) = setup();
    let book = orchestrator.create_book("The Ninth Bell", Some(4), None).unwrap();
    drive(&orchestrator, book.record.id, &route_to(BookStatus::QaReview)).await;

    assert_eq!(orchestrator.chapters_for_book(book.record.id).unwrap().len(), 4);

    let result = orchestrator
        .transition_book(book.record.id, BookAction::ReturnToWriting)
        .await
        .unwrap();
    assert_eq!(result.new_status, BookStatus::WritingInProgress);

    // Re-entry must not create a second set of rows.
    assert_eq!(orchestrator.chapters_for_book(book.record.id).unwrap().len(), 4);
}

#[tokio::test]
async fn publishing_stamps_published_at_once_and_gates_export() {
    let (orchestrator, _queue) = setup();
    let book = orchestrator.create_book("Salt and Cinders", Some(3), None).unwrap();
    drive(&orchestrator, book.record.id, &route_to(BookStatus::ExportReady)).await;

    let state = orchestrator.get_book_state(book.record.id).unwrap();
    assert!(state.book.lifecycle_status.is_exportable());
    assert!(!state.book.lifecycle_status.is_published());
    assert!(state.book.published_at.is_none());

    orchestrator
        .transition_book(book.record.id, BookAction::PublishToKdp)
        .await
        .unwrap();
    let published = orchestrator.get_book_state(book.record.id).unwrap();
    assert!(published.book.lifecycle_status.is_published());
    let first_stamp = published.book.published_at.unwrap();

    orchestrator
        .transition_book(book.record.id, BookAction::PublishToAllPlatforms)
        .await
        .unwrap();
    let all = orchestrator.get_book_state(book.record.id).unwrap();
    assert_eq!(all.book.published_at, Some(first_stamp));
    assert_eq!(all.progress, 100);
}

#[tokio::test]
async fn archive_is_admin_only_and_requires_a_published_book() {
    let (orchestrator, _queue) = setup();
    let book = orchestrator.create_book("Driftwood Letters", Some(3), None).unwrap();

    let err = orchestrator.archive_book(book.record.id).unwrap_err();
    assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));

    drive(&orchestrator, book.record.id, &route_to(BookStatus::PublishedKdp)).await;
    let archived = orchestrator.archive_book(book.record.id).unwrap();
    assert_eq!(archived.new_status, BookStatus::Archived);

    // Archived freezes every table action.
    for action in BookAction::ALL {
        let err = orchestrator
            .transition_book(book.record.id, action)
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidTransition { .. }));
    }
}

#[tokio::test]
async fn unknown_book_id_is_not_found() {
    let (orchestrator, _queue) = setup();
    let err = orchestrator
        .transition_book(BookId::new(), BookAction::StartKeywordResearch)
        .await
        .unwrap_err();
    assert!(matches!(err, OrchestratorError::NotFound { entity: "book", .. }));
}
