use sqlx::Row;

fn database_url() -> Option<String> {
    // Integration smoke tests only run against an explicitly configured DB.
    dotenvy::dotenv().ok();
    std::env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty())
}

#[tokio::test]
async fn migrations_apply_and_tables_exist() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping migrations smoke test");
        return Ok(());
    };

    let pool =
        sqlx::postgres::PgPoolOptions::new().max_connections(1).connect(&database_url).await?;

    let migrator = sqlx::migrate::Migrator::new(std::path::Path::new("migrations")).await?;
    migrator.run(&pool).await?;

    let tables = [
        "quizzes",
        "quiz_sections",
        "quiz_slots",
        "questions",
        "quiz_overrides",
        "group_members",
        "question_usages",
        "question_usage_slots",
        "attempts",
        "attempt_questions",
        "quiz_grades",
        "quiz_feedback",
    ];

    for table in tables {
        let row = sqlx::query("SELECT to_regclass($1)::text").bind(table).fetch_one(&pool).await?;
        let regclass: Option<String> = row.try_get(0)?;
        assert!(regclass.is_some(), "expected table {table} to exist after migrations");
    }

    Ok(())
}
