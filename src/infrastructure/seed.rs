use chrono::NaiveDate;

use crate::domain::{
    AuthorInput, BookFilter, CreateBookInput, CreateCopyInput, CreateLibrarianInput, DomainError,
    GenreInput, MemberInput,
};
use crate::infrastructure::AppState;

/// Demo catalog for a fresh database. Does nothing when books already exist.
pub async fn seed_demo_data(state: &AppState) -> Result<(), DomainError> {
    let existing = state.books.find_all(BookFilter::default()).await?;
    if !existing.is_empty() {
        tracing::info!("Catalog not empty, skipping demo data");
        return Ok(());
    }

    // 1. Genres
    let novel = state
        .genres
        .create(GenreInput {
            description: "Novela".to_owned(),
        })
        .await?;
    let short_stories = state
        .genres
        .create(GenreInput {
            description: "Cuentos".to_owned(),
        })
        .await?;

    // 2. Authors
    let cortazar = state
        .authors
        .create(AuthorInput {
            first_name: Some("Julio".to_owned()),
            last_name: Some("Cortázar".to_owned()),
            pseudonym: None,
        })
        .await?;
    let borges = state
        .authors
        .create(AuthorInput {
            first_name: Some("Jorge Luis".to_owned()),
            last_name: Some("Borges".to_owned()),
            pseudonym: None,
        })
        .await?;

    // 3. Books and copies
    let books = [
        (
            "9788437604572",
            "Rayuela",
            736,
            novel.id,
            cortazar.id,
            3,
        ),
        (
            "9788420633114",
            "Ficciones",
            224,
            short_stories.id,
            borges.id,
            2,
        ),
        (
            "9788466337861",
            "Bestiario",
            160,
            short_stories.id,
            cortazar.id,
            1,
        ),
    ];

    for (isbn, title, pages, genre_id, author_id, copies) in books {
        state
            .books
            .create(CreateBookInput {
                isbn: isbn.to_owned(),
                title: title.to_owned(),
                page_count: pages,
                genre_id,
                author_ids: vec![author_id],
                cover: None,
            })
            .await?;

        for _ in 0..copies {
            state
                .copies
                .create(CreateCopyInput {
                    book_isbn: isbn.to_owned(),
                    copy_number: None,
                })
                .await?;
        }
    }

    // 4. A member who also works the desk
    let member = state
        .members
        .create(MemberInput {
            national_id: "30111222".to_owned(),
            first_name: "Ana".to_owned(),
            last_name: "Pérez".to_owned(),
            email: "ana.perez@example.org".to_owned(),
            address: "Av. Siempre Viva 742".to_owned(),
            mobile: None,
            phone: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 4, 12).unwrap_or_default(),
        })
        .await?;
    let account = state.users.create("aperez".to_owned()).await?;
    state
        .librarians
        .create(CreateLibrarianInput {
            member_id: member.id,
            user_id: account.id,
        })
        .await?;

    tracing::info!("Demo data seeded");
    Ok(())
}
