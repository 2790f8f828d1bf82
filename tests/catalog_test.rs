use std::sync::Arc;

use biblioteca::AppState;
use biblioteca::db;
use biblioteca::domain::{
    AuthorInput, BookFilter, ConfigurationInput, CreateBookInput, CreateCopyInput,
    CreateLibrarianInput, CreateLoanInput, DomainError, GenreInput, MemberInput, UpdateBookInput,
};
use biblioteca::models::configuration;
use biblioteca::seed::seed_demo_data;
use biblioteca::services::cover_service;
use biblioteca::utils::FixedClock;
use chrono::NaiveDate;
use sea_orm::{EntityTrait, PaginatorTrait};

// Helper to create a test app state
async fn setup_test_state() -> AppState {
    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    AppState::with_clock(
        db,
        std::env::temp_dir().join("biblioteca-test-media"),
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap())),
    )
}

async fn create_test_genre(state: &AppState, description: &str) -> i32 {
    state
        .genres
        .create(GenreInput {
            description: description.to_string(),
        })
        .await
        .expect("Failed to create genre")
        .id
}

fn book_input(isbn: &str, title: &str, genre_id: i32) -> CreateBookInput {
    CreateBookInput {
        isbn: isbn.to_string(),
        title: title.to_string(),
        page_count: 100,
        genre_id,
        author_ids: vec![],
        cover: None,
    }
}

fn member_input(national_id: &str) -> MemberInput {
    MemberInput {
        national_id: national_id.to_string(),
        first_name: "Luis".to_string(),
        last_name: "Sosa".to_string(),
        email: "luis@example.org".to_string(),
        address: "Mitre 100".to_string(),
        mobile: None,
        phone: Some("4555-0101".to_string()),
        birth_date: NaiveDate::from_ymd_opt(1970, 2, 3).unwrap(),
    }
}

#[tokio::test]
async fn test_isbn_validation() {
    let state = setup_test_state().await;
    let genre = create_test_genre(&state, "Ensayo").await;

    for bad in ["978843760457", "97884376045X7", "978-84-376045", "97884376045721"] {
        let err = state
            .books
            .create(book_input(bad, "Otro", genre))
            .await
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains(bad), "message was {}", msg),
            other => panic!("expected validation error for {}, got {:?}", bad, other),
        }
    }

    let book = state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .expect("13 digits should be accepted");
    assert_eq!(book.formatted_isbn.as_deref(), Some("978-8-43-760457-2"));
    assert_eq!((book.total_copies, book.available_copies), (0, 0));
    assert!(state.books.find_all(BookFilter::default()).await.unwrap().len() == 1);
}

#[tokio::test]
async fn test_book_field_validation() {
    let state = setup_test_state().await;
    let genre = create_test_genre(&state, "Ensayo").await;

    let err = state
        .books
        .create(book_input("9788437604572", "", genre))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = state
        .books
        .create(book_input("9788437604572", "Rayuela", 999))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .unwrap();
    let err = state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Duplicate(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_book_update_and_authors() {
    let state = setup_test_state().await;
    let genre = create_test_genre(&state, "Novela").await;
    let other_genre = create_test_genre(&state, "Cuentos").await;
    let author = state
        .authors
        .create(AuthorInput {
            first_name: Some("Julio".to_string()),
            last_name: Some("Cortázar".to_string()),
            pseudonym: None,
        })
        .await
        .unwrap();

    state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .unwrap();

    let updated = state
        .books
        .update(
            "9788437604572",
            UpdateBookInput {
                title: Some("Rayuela (edición crítica)".to_string()),
                genre_id: Some(other_genre),
                author_ids: Some(vec![author.id, author.id]),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Rayuela (edición crítica)");
    assert_eq!(updated.genre.as_deref(), Some("Cuentos"));
    assert_eq!(updated.authors, vec!["Julio Cortázar".to_string()]);

    let err = state
        .books
        .update(
            "9788437604572",
            UpdateBookInput {
                author_ids: Some(vec![4242]),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));
}

#[tokio::test]
async fn test_book_filters() {
    let state = setup_test_state().await;
    let novel = create_test_genre(&state, "Novela").await;
    let stories = create_test_genre(&state, "Cuentos").await;
    let borges = state
        .authors
        .create(AuthorInput {
            first_name: Some("Jorge Luis".to_string()),
            last_name: Some("Borges".to_string()),
            pseudonym: None,
        })
        .await
        .unwrap();

    state
        .books
        .create(book_input("9788437604572", "Rayuela", novel))
        .await
        .unwrap();
    state
        .books
        .create(CreateBookInput {
            author_ids: vec![borges.id],
            ..book_input("9788420633114", "Ficciones", stories)
        })
        .await
        .unwrap();
    state
        .copies
        .create(CreateCopyInput {
            book_isbn: "9788420633114".to_string(),
            copy_number: None,
        })
        .await
        .unwrap();

    let by_genre = state
        .books
        .find_all(BookFilter {
            genre_id: Some(novel),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_genre.len(), 1);
    assert_eq!(by_genre[0].title, "Rayuela");

    let by_author = state
        .books
        .find_all(BookFilter {
            author_id: Some(borges.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].isbn, "9788420633114");

    let by_title = state
        .books
        .find_all(BookFilter {
            title: Some("yuel".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_title.len(), 1);

    let on_shelf = state
        .books
        .find_all(BookFilter {
            available_only: true,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(on_shelf.len(), 1);
    assert_eq!(on_shelf[0].title, "Ficciones");
}

#[tokio::test]
async fn test_genre_in_use_cannot_be_deleted() {
    let state = setup_test_state().await;
    let genre = create_test_genre(&state, "Poesía").await;
    state
        .books
        .create(book_input("9789871138135", "Veinte poemas", genre))
        .await
        .unwrap();

    let err = state.genres.delete(genre).await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);

    state.books.delete("9789871138135").await.unwrap();
    state.genres.delete(genre).await.expect("unused genre should go");
    assert!(state.genres.find_by_id(genre).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_genre_description() {
    let state = setup_test_state().await;
    create_test_genre(&state, "Teatro").await;

    let err = state
        .genres
        .create(GenreInput {
            description: "  Teatro ".to_string(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Duplicate(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_author_display_name() {
    let state = setup_test_state().await;

    let plain = state
        .authors
        .create(AuthorInput {
            first_name: Some("Silvina".to_string()),
            last_name: Some("Ocampo".to_string()),
            pseudonym: None,
        })
        .await
        .unwrap();
    assert_eq!(plain.display_name, "Silvina Ocampo");

    let pen_name = state
        .authors
        .update(
            plain.id,
            AuthorInput {
                first_name: Some("Silvina".to_string()),
                last_name: Some("Ocampo".to_string()),
                pseudonym: Some("S. O.".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(pen_name.display_name, "S. O.");

    let err = state
        .authors
        .create(AuthorInput {
            first_name: Some("x".repeat(31)),
            last_name: None,
            pseudonym: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_duplicate_national_id() {
    let state = setup_test_state().await;
    state.members.create(member_input("22333444")).await.unwrap();

    let err = state
        .members
        .create(member_input("22333444"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Duplicate(_)), "got {:?}", err);

    let found = state
        .members
        .find_by_national_id("22333444")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.display_name(), "Sosa, Luis");
}

#[tokio::test]
async fn test_member_validation() {
    let state = setup_test_state().await;

    let err = state
        .members
        .create(MemberInput {
            email: "not-an-email".to_string(),
            ..member_input("22333444")
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = state
        .members
        .create(member_input("12345678901"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_referenced_member_librarian_and_copy() {
    let state = setup_test_state().await;
    let genre = create_test_genre(&state, "Novela").await;
    state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .unwrap();
    let copy = state
        .copies
        .create(CreateCopyInput {
            book_isbn: "9788437604572".to_string(),
            copy_number: None,
        })
        .await
        .unwrap();

    let staff = state.members.create(member_input("11111111")).await.unwrap();
    let reader = state.members.create(member_input("22222222")).await.unwrap();
    let user = state.users.create("lsosa".to_string()).await.unwrap();
    let librarian = state
        .librarians
        .create(CreateLibrarianInput {
            member_id: staff.id,
            user_id: user.id,
        })
        .await
        .unwrap();
    assert_eq!(librarian.username.as_deref(), Some("lsosa"));
    assert_eq!(
        state.librarians.find_by_user(user.id).await.unwrap().unwrap().member_id,
        staff.id
    );

    state
        .loans
        .create(CreateLoanInput {
            copy_id: copy.id,
            member_id: reader.id,
            issued_by: staff.id,
            received_by: None,
            due_date: None,
            return_date: None,
        })
        .await
        .unwrap();

    let err = state.members.delete(reader.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);

    let err = state.librarians.delete(staff.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);

    let err = state.copies.delete(copy.id).await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);

    let err = state.books.delete("9788437604572").await.unwrap_err();
    assert!(matches!(err, DomainError::Referenced(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_librarian_account_is_one_to_one() {
    let state = setup_test_state().await;
    let first = state.members.create(member_input("11111111")).await.unwrap();
    let second = state.members.create(member_input("22222222")).await.unwrap();
    let user = state.users.create("desk".to_string()).await.unwrap();

    let librarian = state
        .librarians
        .create(CreateLibrarianInput {
            member_id: first.id,
            user_id: user.id,
        })
        .await
        .unwrap();
    assert_eq!(librarian.since.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 28).unwrap());

    let err = state
        .librarians
        .create(CreateLibrarianInput {
            member_id: second.id,
            user_id: user.id,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Duplicate(_)), "got {:?}", err);

    let err = state.users.create("desk".to_string()).await.unwrap_err();
    assert!(matches!(err, DomainError::Duplicate(_)));

    let by_name = state.users.find_by_username("desk").await.unwrap().unwrap();
    assert_eq!(by_name.id, user.id);
    let by_id = state.users.find_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(by_id.username, "desk");
    assert!(state.users.find_by_username("nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_configuration_is_singleton() {
    let state = setup_test_state().await;

    let defaults = state.configuration.load().await.unwrap();
    assert_eq!(defaults.grace_period_days, 3);
    assert_eq!(defaults.max_active_loans, 3);

    let first = state
        .configuration
        .create(ConfigurationInput {
            grace_period_days: 7,
            max_active_loans: 5,
        })
        .await
        .unwrap();
    let second = state
        .configuration
        .create(ConfigurationInput {
            grace_period_days: 10,
            max_active_loans: 2,
        })
        .await
        .unwrap();
    assert_eq!(first.grace_period_days, 7);
    assert_eq!(second.grace_period_days, 10);

    let rows = configuration::Entity::find().count(state.db()).await.unwrap();
    assert_eq!(rows, 1);

    let current = state.configuration.load().await.unwrap();
    assert_eq!(current.grace_period_days, 10);
    assert_eq!(current.max_active_loans, 2);

    let err = state
        .configuration
        .save(ConfigurationInput {
            grace_period_days: -1,
            max_active_loans: 2,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_seed_is_idempotent() {
    let state = setup_test_state().await;

    seed_demo_data(&state).await.expect("seed");
    seed_demo_data(&state).await.expect("second seed is a no-op");

    let books = state.books.find_all(BookFilter::default()).await.unwrap();
    assert_eq!(books.len(), 3);
    let rayuela = books.iter().find(|b| b.title == "Rayuela").unwrap();
    assert_eq!((rayuela.total_copies, rayuela.available_copies), (3, 3));
    assert_eq!(state.librarians.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_book_cover_goes_through_the_store() {
    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    let db = db::init_db("sqlite::memory:")
        .await
        .expect("Failed to init DB");
    let media = std::env::temp_dir().join(format!("biblioteca-covers-{}", uuid::Uuid::new_v4()));
    let state = AppState::with_clock(
        db,
        media.clone(),
        Arc::new(FixedClock(NaiveDate::from_ymd_opt(2024, 3, 28).unwrap())),
    );
    let genre = create_test_genre(&state, "Novela").await;
    state
        .books
        .create(book_input("9788437604572", "Rayuela", genre))
        .await
        .unwrap();

    let book = cover_service::set_cover(
        state.books.as_ref(),
        state.covers.as_ref(),
        "9788437604572",
        "rayuela.png",
        PNG,
    )
    .await
    .unwrap();
    let first = book.cover.clone().expect("cover reference");
    assert!(first.starts_with("books/") && first.ends_with(".png"));
    let first_path = state.covers.resolve(&first).unwrap();
    assert_eq!(std::fs::read(&first_path).unwrap(), PNG);

    // Replacing the cover deletes the previous file
    let book = cover_service::set_cover(
        state.books.as_ref(),
        state.covers.as_ref(),
        "9788437604572",
        "rayuela.jpg",
        JPEG,
    )
    .await
    .unwrap();
    let second = book.cover.clone().unwrap();
    assert!(second.ends_with(".jpg"));
    assert!(!first_path.exists());

    let err = cover_service::set_cover(
        state.books.as_ref(),
        state.covers.as_ref(),
        "9788437604572",
        "notes.txt",
        b"plain text",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = cover_service::set_cover(
        state.books.as_ref(),
        state.covers.as_ref(),
        "9780000000000",
        "rayuela.png",
        PNG,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DomainError::NotFound(_)));

    let book =
        cover_service::clear_cover(state.books.as_ref(), state.covers.as_ref(), "9788437604572")
            .await
            .unwrap();
    assert!(book.cover.is_none());
    assert!(!state.covers.resolve(&second).unwrap().exists());

    let _ = std::fs::remove_dir_all(&media);
}
