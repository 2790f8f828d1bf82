use std::sync::Arc;

use biblioteca::AppState;
use biblioteca::db;
use biblioteca::domain::{
    CreateBookInput, CreateCopyInput, CreateLibrarianInput, CreateLoanInput, DomainError,
    GenreInput, MemberInput, UpdateLoanInput,
};
use biblioteca::services::inventory_service;
use biblioteca::utils::FixedClock;
use chrono::NaiveDate;

const ISBN: &str = "9788437604572";

// Helper to create a test app state on a fixed day
async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let today = NaiveDate::from_ymd_opt(2024, 3, 28).unwrap();
    AppState::with_clock(
        db,
        std::env::temp_dir().join("biblioteca-test-media"),
        Arc::new(FixedClock(today)),
    )
}

// Helper to create a genre and a book without copies
async fn create_test_book(state: &AppState, isbn: &str) {
    let genre = match state
        .genres
        .create(GenreInput {
            description: "Novela".to_string(),
        })
        .await
    {
        Ok(g) => g.id,
        Err(DomainError::Duplicate(_)) => state.genres.find_all().await.unwrap()[0].id,
        Err(e) => panic!("Failed to create genre: {}", e),
    };

    state
        .books
        .create(CreateBookInput {
            isbn: isbn.to_string(),
            title: "Rayuela".to_string(),
            page_count: 736,
            genre_id: genre,
            author_ids: vec![],
            cover: None,
        })
        .await
        .expect("Failed to create book");
}

async fn add_copy(state: &AppState, isbn: &str) -> i32 {
    state
        .copies
        .create(CreateCopyInput {
            book_isbn: isbn.to_string(),
            copy_number: None,
        })
        .await
        .expect("Failed to create copy")
        .id
}

async fn counters(state: &AppState, isbn: &str) -> (i32, i32) {
    let book = state.books.find_by_isbn(isbn).await.unwrap().unwrap();
    (book.total_copies, book.available_copies)
}

// Helper to create a member that is also a librarian
async fn create_test_librarian(state: &AppState) -> i32 {
    let member = state
        .members
        .create(MemberInput {
            national_id: "20999888".to_string(),
            first_name: "Marta".to_string(),
            last_name: "Gómez".to_string(),
            email: "marta@example.org".to_string(),
            address: "Calle 1".to_string(),
            mobile: None,
            phone: None,
            birth_date: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap(),
        })
        .await
        .unwrap();
    let user = state.users.create("mgomez".to_string()).await.unwrap();
    state
        .librarians
        .create(CreateLibrarianInput {
            member_id: member.id,
            user_id: user.id,
        })
        .await
        .unwrap();
    member.id
}

#[tokio::test]
async fn test_new_book_starts_empty() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;

    assert_eq!(counters(&state, ISBN).await, (0, 0));
    assert_eq!(state.copies.max_copy_number(ISBN).await.unwrap(), 0);
}

#[tokio::test]
async fn test_copy_numbers_follow_max() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;

    for _ in 0..3 {
        add_copy(&state, ISBN).await;
    }
    let fourth = state
        .copies
        .create(CreateCopyInput {
            book_isbn: ISBN.to_string(),
            copy_number: None,
        })
        .await
        .unwrap();

    assert_eq!(fourth.copy_number, 4);
    assert_eq!(fourth.label.as_deref(), Some("4-Rayuela"));
    assert_eq!(counters(&state, ISBN).await, (4, 4));
}

#[tokio::test]
async fn test_numbering_uses_max_not_count() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;

    let first = add_copy(&state, ISBN).await;
    add_copy(&state, ISBN).await;
    add_copy(&state, ISBN).await;
    state.copies.delete(first).await.unwrap();

    let next = state
        .copies
        .create(CreateCopyInput {
            book_isbn: ISBN.to_string(),
            copy_number: None,
        })
        .await
        .unwrap();
    assert_eq!(next.copy_number, 4);
    assert_eq!(counters(&state, ISBN).await, (3, 3));
}

#[tokio::test]
async fn test_numbering_restarts_after_all_copies_deleted() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;

    let a = add_copy(&state, ISBN).await;
    let b = add_copy(&state, ISBN).await;
    state.copies.delete(a).await.unwrap();
    state.copies.delete(b).await.unwrap();
    assert_eq!(counters(&state, ISBN).await, (0, 0));

    let fresh = state
        .copies
        .create(CreateCopyInput {
            book_isbn: ISBN.to_string(),
            copy_number: None,
        })
        .await
        .unwrap();
    assert_eq!(fresh.copy_number, 1);
    assert_eq!(counters(&state, ISBN).await, (1, 1));
}

#[tokio::test]
async fn test_duplicate_copy_number_rejected() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;
    add_copy(&state, ISBN).await;

    let err = state
        .copies
        .create(CreateCopyInput {
            book_isbn: ISBN.to_string(),
            copy_number: Some(1),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::Duplicate(_)), "got {:?}", err);
    // The failed insert must not leave the counters bumped
    assert_eq!(counters(&state, ISBN).await, (1, 1));
}

#[tokio::test]
async fn test_copy_for_unknown_book() {
    let state = setup_test_state().await;

    let err = state
        .copies
        .create(CreateCopyInput {
            book_isbn: "9780000000000".to_string(),
            copy_number: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let err = state.copies.delete(4242).await.unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_concurrent_copy_creation_keeps_numbers_unique() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;

    let (a, b, c, d) = tokio::join!(
        add_copy(&state, ISBN),
        add_copy(&state, ISBN),
        add_copy(&state, ISBN),
        add_copy(&state, ISBN)
    );
    let mut ids = vec![a, b, c, d];
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);

    let mut numbers: Vec<i32> = state
        .copies
        .find_by_book(ISBN)
        .await
        .unwrap()
        .into_iter()
        .map(|c| c.copy_number)
        .collect();
    numbers.sort();
    assert_eq!(numbers, vec![1, 2, 3, 4]);
    assert_eq!(counters(&state, ISBN).await, (4, 4));
}

#[tokio::test]
async fn test_copy_on_loan_cannot_be_deleted() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;
    let copy_id = add_copy(&state, ISBN).await;
    let librarian = create_test_librarian(&state).await;

    state
        .loans
        .create(CreateLoanInput {
            copy_id,
            member_id: librarian,
            issued_by: librarian,
            received_by: None,
            due_date: None,
            return_date: None,
        })
        .await
        .unwrap();

    let err = state.copies.delete(copy_id).await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);
    assert_eq!(counters(&state, ISBN).await, (1, 0));
}

#[tokio::test]
async fn test_counters_stay_in_range_through_lifecycle() {
    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;
    let librarian = create_test_librarian(&state).await;

    let c1 = add_copy(&state, ISBN).await;
    let c2 = add_copy(&state, ISBN).await;
    let c3 = add_copy(&state, ISBN).await;

    let mut loans = Vec::new();
    for copy_id in [c1, c2] {
        let loan = state
            .loans
            .create(CreateLoanInput {
                copy_id,
                member_id: librarian,
                issued_by: librarian,
                received_by: None,
                due_date: None,
                return_date: None,
            })
            .await
            .unwrap();
        loans.push(loan.id);
    }
    assert_eq!(counters(&state, ISBN).await, (3, 1));

    state.copies.delete(c3).await.unwrap();
    assert_eq!(counters(&state, ISBN).await, (2, 0));

    state
        .loans
        .update(
            loans[0],
            UpdateLoanInput {
                received_by: Some(librarian),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(counters(&state, ISBN).await, (2, 1));

    state.loans.delete(loans[1]).await.unwrap();
    assert_eq!(counters(&state, ISBN).await, (2, 2));

    let book = state.books.find_by_isbn(ISBN).await.unwrap().unwrap();
    assert!(0 <= book.available_copies && book.available_copies <= book.total_copies);
    assert!(inventory_service::audit(state.db()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_and_repair_detect_drift() {
    use sea_orm::{ConnectionTrait, Statement};

    let state = setup_test_state().await;
    create_test_book(&state, ISBN).await;
    add_copy(&state, ISBN).await;
    add_copy(&state, ISBN).await;

    // Simulate a counter edited outside the repositories
    state
        .db()
        .execute(Statement::from_string(
            state.db().get_database_backend(),
            format!("UPDATE books SET available_copies = 1 WHERE isbn = '{}'", ISBN),
        ))
        .await
        .unwrap();

    let found = inventory_service::audit(state.db()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].stored_available, 1);
    assert_eq!(found[0].counted_available, 2);

    let fixed = inventory_service::repair(state.db()).await.unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(counters(&state, ISBN).await, (2, 2));
    assert!(inventory_service::audit(state.db()).await.unwrap().is_empty());
}
