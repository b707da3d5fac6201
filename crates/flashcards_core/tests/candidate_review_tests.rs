//! Integration tests for the candidate review pipeline.
//!
//! These tests drive `CandidateReviewService` end to end against the in-memory store.

use flashcards_core::{
    CandidateActionInput, CandidateActionsRequest, CandidateReviewService, ContentSource,
    CounterPolicy, DatabaseService, ErrorKind, EventType, Flashcard, FlashcardProposal,
    FlashcardState, GenerationSession, InMemoryStore, NewFlashcard, NewGeneration, ReviewError,
};
use std::sync::Arc;
use uuid::Uuid;

/// Helper to create a store, a service and one session with `n` candidates.
async fn setup(
    n: usize,
    policy: CounterPolicy,
) -> (InMemoryStore, CandidateReviewService, Uuid, GenerationSession, Vec<Flashcard>) {
    let store = InMemoryStore::new();
    let user_id = Uuid::new_v4();
    let (session, candidates) = seed_generation(&store, user_id, n).await;
    let service = CandidateReviewService::new(Arc::new(store.clone()), policy);
    (store, service, user_id, session, candidates)
}

async fn seed_generation(
    store: &InMemoryStore,
    user_id: Uuid,
    n: usize,
) -> (GenerationSession, Vec<Flashcard>) {
    let proposals = (0..n)
        .map(|i| FlashcardProposal {
            front: format!("Question {}", i),
            back: format!("Answer {}", i),
        })
        .collect();
    store
        .create_generation(NewGeneration {
            user_id,
            source_text: "source".repeat(200),
            model: "test-model".to_string(),
            generation_duration_ms: 1200,
            proposals,
        })
        .await
        .unwrap()
}

fn request(
    session: &GenerationSession,
    actions: Vec<CandidateActionInput>,
) -> CandidateActionsRequest {
    CandidateActionsRequest {
        session_id: session.id.to_string(),
        actions,
    }
}

#[tokio::test]
async fn test_mixed_batch_end_to_end() {
    let (store, service, user_id, session, cards) = setup(3, CounterPolicy::Overwrite).await;
    let (a, b, c) = (cards[0].id, cards[1].id, cards[2].id);

    let result = service
        .process_candidate_actions(
            user_id,
            &request(
                &session,
                vec![
                    CandidateActionInput::accept(a),
                    CandidateActionInput::edit(b, "F", "K"),
                    CandidateActionInput::reject(c),
                ],
            ),
        )
        .await
        .unwrap();

    assert_eq!(result.accepted, vec![a]);
    assert_eq!(result.edited, vec![b]);
    assert_eq!(result.rejected, vec![c]);

    let stored_a = store.flashcard(a).await.unwrap();
    assert_eq!(stored_a.state(), FlashcardState::Active);
    assert_eq!(stored_a.front, "Question 0");
    assert_eq!(stored_a.back, "Answer 0");

    let stored_b = store.flashcard(b).await.unwrap();
    assert_eq!(stored_b.generation_id, None);
    assert_eq!(stored_b.front, "F");
    assert_eq!(stored_b.back, "K");

    let stored_c = store.flashcard(c).await.unwrap();
    assert!(stored_c.deleted_at.is_some());
    assert_eq!(stored_c.generation_id, Some(session.id));

    let events = store.events().await;
    let tags: Vec<EventType> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(
        tags,
        vec![
            EventType::CandidatesAcceptedUnedited,
            EventType::CandidatesAcceptedEdited,
            EventType::CandidatesRejected,
        ]
    );
    assert!(events.iter().all(|e| e.generation_id == Some(session.id)));
    assert!(events.iter().all(|e| e.source == ContentSource::Ai));
    assert!(events.iter().all(|e| e.user_id == user_id));
    assert_eq!(events[1].flashcard_id, Some(b));

    let session = store.generation(session.id).await.unwrap();
    assert_eq!(session.accepted_unedited_count, Some(1));
    assert_eq!(session.accepted_edited_count, Some(1));
}

#[tokio::test]
async fn test_every_id_lands_in_exactly_one_group() {
    let (_store, service, user_id, session, cards) = setup(30, CounterPolicy::Overwrite).await;
    let actions = cards
        .iter()
        .enumerate()
        .map(|(i, card)| match i % 3 {
            0 => CandidateActionInput::accept(card.id),
            1 => CandidateActionInput::edit(card.id, "front", "back"),
            _ => CandidateActionInput::reject(card.id),
        })
        .collect();

    let result = service
        .process_candidate_actions(user_id, &request(&session, actions))
        .await
        .unwrap();

    assert_eq!(result.total(), cards.len());
    for card in &cards {
        let hits = [&result.accepted, &result.edited, &result.rejected]
            .iter()
            .filter(|group| group.contains(&card.id))
            .count();
        assert_eq!(hits, 1, "card {} should appear exactly once", card.id);
    }
    // Submission order is preserved within each group.
    assert_eq!(result.accepted[0], cards[0].id);
    assert_eq!(result.accepted[1], cards[3].id);
}

#[tokio::test]
async fn test_resubmitted_accept_batch_succeeds_again() {
    let (store, service, user_id, session, cards) = setup(2, CounterPolicy::Overwrite).await;
    let req = request(
        &session,
        cards.iter().map(|c| CandidateActionInput::accept(c.id)).collect(),
    );

    let first = service.process_candidate_actions(user_id, &req).await.unwrap();
    let second = service.process_candidate_actions(user_id, &req).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.events().await.len(), 4);
    let card = store.flashcard(cards[0].id).await.unwrap();
    assert_eq!(card.state(), FlashcardState::Active);
}

#[tokio::test]
async fn test_counters_are_overwritten_by_default() {
    let (store, service, user_id, session, cards) = setup(3, CounterPolicy::Overwrite).await;

    service
        .process_candidate_actions(
            user_id,
            &request(
                &session,
                vec![
                    CandidateActionInput::accept(cards[0].id),
                    CandidateActionInput::accept(cards[1].id),
                ],
            ),
        )
        .await
        .unwrap();
    service
        .process_candidate_actions(
            user_id,
            &request(&session, vec![CandidateActionInput::edit(cards[2].id, "F", "B")]),
        )
        .await
        .unwrap();

    let session = store.generation(session.id).await.unwrap();
    assert_eq!(session.accepted_unedited_count, Some(0));
    assert_eq!(session.accepted_edited_count, Some(1));
}

#[tokio::test]
async fn test_counters_accumulate_when_configured() {
    let (store, service, user_id, session, cards) = setup(3, CounterPolicy::Accumulate).await;

    for (i, card) in cards.iter().enumerate() {
        let action = if i == 2 {
            CandidateActionInput::edit(card.id, "F", "B")
        } else {
            CandidateActionInput::accept(card.id)
        };
        service
            .process_candidate_actions(user_id, &request(&session, vec![action]))
            .await
            .unwrap();
    }

    let session = store.generation(session.id).await.unwrap();
    assert_eq!(session.accepted_unedited_count, Some(2));
    assert_eq!(session.accepted_edited_count, Some(1));
}

#[tokio::test]
async fn test_duplicate_ids_last_action_wins() {
    let (store, service, user_id, session, cards) = setup(1, CounterPolicy::Overwrite).await;
    let id = cards[0].id;

    let result = service
        .process_candidate_actions(
            user_id,
            &request(
                &session,
                vec![
                    CandidateActionInput::reject(id),
                    CandidateActionInput::edit(id, "Final front", "Final back"),
                ],
            ),
        )
        .await
        .unwrap();

    assert!(result.rejected.is_empty());
    assert_eq!(result.edited, vec![id]);
    assert_eq!(result.total(), 1);

    let card = store.flashcard(id).await.unwrap();
    assert_eq!(card.state(), FlashcardState::Active);
    assert_eq!(card.front, "Final front");
    assert_eq!(store.events().await.len(), 2);

    let session = store.generation(session.id).await.unwrap();
    assert_eq!(session.accepted_edited_count, Some(1));
}

#[tokio::test]
async fn test_deleted_card_is_not_revived_by_resubmitted_batch() {
    let (store, service, user_id, session, cards) = setup(1, CounterPolicy::Overwrite).await;
    let id = cards[0].id;
    let batch = request(&session, vec![CandidateActionInput::accept(id)]);

    service.process_candidate_actions(user_id, &batch).await.unwrap();
    store.soft_delete_flashcard(user_id, id).await.unwrap();

    let err = service.process_candidate_actions(user_id, &batch).await.unwrap_err();
    match err {
        ReviewError::CandidatesNotFound(missing) => assert_eq!(missing, vec![id]),
        other => panic!("unexpected error {:?}", other),
    }

    let card = store.flashcard(id).await.unwrap();
    assert!(card.deleted_at.is_some());
    assert!(!matches!(card.state(), FlashcardState::Active));
}

#[tokio::test]
async fn test_reject_is_not_undone_by_later_batch() {
    let (store, service, user_id, session, cards) = setup(1, CounterPolicy::Overwrite).await;
    let id = cards[0].id;

    service
        .process_candidate_actions(
            user_id,
            &request(&session, vec![CandidateActionInput::reject(id)]),
        )
        .await
        .unwrap();
    let rejected_at = store.flashcard(id).await.unwrap().deleted_at;
    assert!(rejected_at.is_some());

    service
        .process_candidate_actions(
            user_id,
            &request(&session, vec![CandidateActionInput::accept(id)]),
        )
        .await
        .unwrap();

    let card = store.flashcard(id).await.unwrap();
    assert_eq!(card.deleted_at, rejected_at);
    assert!(!matches!(card.state(), FlashcardState::Active));
    let err = service
        .process_candidate_actions(
            user_id,
            &request(&session, vec![CandidateActionInput::accept(id)]),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_validation_errors_touch_no_storage() {
    let (store, service, user_id, session, _cards) = setup(1, CounterPolicy::Overwrite).await;

    let mut req = request(&session, vec![CandidateActionInput::accept(Uuid::new_v4())]);
    req.session_id = "not-a-session".to_string();
    let err = service.process_candidate_actions(user_id, &req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = service
        .process_candidate_actions(user_id, &request(&session, vec![]))
        .await
        .unwrap_err();
    match err {
        ReviewError::Validation(issues) => assert_eq!(issues[0].field, "actions"),
        other => panic!("unexpected error {:?}", other),
    }

    let too_many = (0..101)
        .map(|_| CandidateActionInput::accept(Uuid::new_v4()))
        .collect();
    let err = service
        .process_candidate_actions(user_id, &request(&session, too_many))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(store.review_reads(), 0);
}

#[tokio::test]
async fn test_foreign_session_is_not_found() {
    let (store, service, _owner, session, cards) = setup(1, CounterPolicy::Overwrite).await;
    let intruder = Uuid::new_v4();

    let err = service
        .process_candidate_actions(
            intruder,
            &request(&session, vec![CandidateActionInput::accept(cards[0].id)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::SessionNotFound));
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let missing = CandidateActionsRequest {
        session_id: Uuid::new_v4().to_string(),
        actions: vec![CandidateActionInput::accept(cards[0].id)],
    };
    let err = service
        .process_candidate_actions(intruder, &missing)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), ReviewError::SessionNotFound.to_string());

    let card = store.flashcard(cards[0].id).await.unwrap();
    assert_eq!(card.state(), FlashcardState::Candidate { session_id: session.id });
}

#[tokio::test]
async fn test_candidate_from_other_session_aborts_whole_batch() {
    let (store, service, user_id, session, cards) = setup(2, CounterPolicy::Overwrite).await;
    let (_other_session, other_cards) = seed_generation(&store, user_id, 1).await;
    let stranger = other_cards[0].id;

    let err = service
        .process_candidate_actions(
            user_id,
            &request(
                &session,
                vec![
                    CandidateActionInput::accept(cards[0].id),
                    CandidateActionInput::reject(stranger),
                    CandidateActionInput::accept(cards[1].id),
                ],
            ),
        )
        .await
        .unwrap_err();

    match err {
        ReviewError::CandidatesNotFound(ids) => assert_eq!(ids, vec![stranger]),
        other => panic!("unexpected error {:?}", other),
    }
    for card in &cards {
        let stored = store.flashcard(card.id).await.unwrap();
        assert_eq!(stored.state(), FlashcardState::Candidate { session_id: session.id });
    }
    assert!(store.events().await.is_empty());
    assert_eq!(store.generation(session.id).await.unwrap().accepted_unedited_count, None);
}

#[tokio::test]
async fn test_manual_card_is_not_a_candidate() {
    let (store, service, user_id, session, _cards) = setup(1, CounterPolicy::Overwrite).await;
    let manual = store
        .create_flashcard(
            user_id,
            NewFlashcard {
                front: "Manual".to_string(),
                back: "Card".to_string(),
            },
        )
        .await
        .unwrap();

    let err = service
        .process_candidate_actions(
            user_id,
            &request(&session, vec![CandidateActionInput::reject(manual.id)]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReviewError::CandidatesNotFound(_)));
}

#[tokio::test]
async fn test_storage_failure_rolls_back_batch() {
    let (store, service, user_id, session, cards) = setup(3, CounterPolicy::Overwrite).await;
    store.fail_updates_of(cards[2].id);

    let err = service
        .process_candidate_actions(
            user_id,
            &request(
                &session,
                cards.iter().map(|c| CandidateActionInput::accept(c.id)).collect(),
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    for card in &cards {
        let stored = store.flashcard(card.id).await.unwrap();
        assert_eq!(stored.generation_id, Some(session.id));
    }
    assert!(store.events().await.is_empty());
    assert_eq!(store.generation(session.id).await.unwrap().accepted_unedited_count, None);
}
