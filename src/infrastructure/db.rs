use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};

pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect(database_url).await?;

    // Run migrations manually (simple SQL)
    run_migrations(&db).await?;

    tracing::debug!("Database ready at {}", database_url);
    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    let statement = Statement::from_string(db.get_database_backend(), sql.to_owned());
    db.execute(statement).await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // User accounts (credentials are handled elsewhere)
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS authors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT,
            last_name TEXT,
            pseudonym TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS genres (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .await?;

    // Counters are kept in range by the store itself
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS books (
            isbn TEXT PRIMARY KEY NOT NULL CHECK (length(isbn) = 13 AND isbn NOT GLOB '*[^0-9]*'),
            title TEXT NOT NULL,
            page_count INTEGER NOT NULL DEFAULT 0,
            total_copies INTEGER NOT NULL DEFAULT 0,
            available_copies INTEGER NOT NULL DEFAULT 0,
            genre_id INTEGER NOT NULL,
            cover TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (total_copies >= 0),
            CHECK (available_copies >= 0 AND available_copies <= total_copies),
            FOREIGN KEY (genre_id) REFERENCES genres(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    // Create book_authors junction table
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS book_authors (
            book_isbn TEXT NOT NULL,
            author_id INTEGER NOT NULL,
            PRIMARY KEY (book_isbn, author_id),
            FOREIGN KEY (book_isbn) REFERENCES books(isbn) ON DELETE CASCADE ON UPDATE CASCADE,
            FOREIGN KEY (author_id) REFERENCES authors(id) ON DELETE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS copies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_isbn TEXT NOT NULL,
            copy_number INTEGER NOT NULL CHECK (copy_number > 0),
            created_at TEXT NOT NULL,
            UNIQUE (book_isbn, copy_number),
            FOREIGN KEY (book_isbn) REFERENCES books(isbn) ON DELETE CASCADE ON UPDATE CASCADE
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS members (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            national_id TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL,
            address TEXT NOT NULL,
            mobile TEXT,
            phone TEXT,
            birth_date TEXT NOT NULL
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS librarians (
            member_id INTEGER PRIMARY KEY NOT NULL,
            since TEXT NOT NULL,
            user_id INTEGER NOT NULL UNIQUE,
            FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE RESTRICT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            copy_id INTEGER NOT NULL,
            member_id INTEGER NOT NULL,
            issued_by INTEGER NOT NULL,
            received_by INTEGER,
            loan_date TEXT NOT NULL,
            due_date TEXT NOT NULL,
            return_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY (copy_id) REFERENCES copies(id) ON DELETE RESTRICT,
            FOREIGN KEY (member_id) REFERENCES members(id) ON DELETE RESTRICT,
            FOREIGN KEY (issued_by) REFERENCES librarians(member_id) ON DELETE RESTRICT,
            FOREIGN KEY (received_by) REFERENCES librarians(member_id) ON DELETE RESTRICT
        )
        "#,
    )
    .await?;

    execute(
        db,
        "CREATE INDEX IF NOT EXISTS idx_loans_pending ON loans (copy_id) WHERE return_date IS NULL",
    )
    .await?;

    // Singleton: the only accepted id is 1
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS configuration (
            id INTEGER PRIMARY KEY NOT NULL CHECK (id = 1),
            grace_period_days INTEGER NOT NULL DEFAULT 3 CHECK (grace_period_days BETWEEN 0 AND 36500),
            max_active_loans INTEGER NOT NULL DEFAULT 3 CHECK (max_active_loans > 0),
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .await?;

    // Insert default configuration if not exists
    execute(
        db,
        r#"
        INSERT OR IGNORE INTO configuration (id, grace_period_days, max_active_loans, updated_at)
        VALUES (1, 3, 3, datetime('now'))
        "#,
    )
    .await?;

    Ok(())
}
