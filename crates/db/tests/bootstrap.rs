use sqlx::PgPool;

/// Full bootstrap test: connect, migrate, verify lookup tables.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_full_bootstrap(pool: PgPool) {
    annostore_db::health_check(&pool).await.unwrap();

    let tables = [
        ("permission_levels", 3),
        ("source_document_states", 5),
        ("annotation_document_states", 4),
    ];

    for (table, expected) in tables {
        let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&pool)
            .await
            .unwrap_or_else(|e| panic!("{table} query failed: {e}"));
        assert_eq!(count.0, expected, "{table} seed rows");
    }
}

/// Seed ids must line up with the enum discriminants in `annostore_core::state`.
#[sqlx::test(migrations = "../../db/migrations")]
async fn test_state_ids_match_enums(pool: PgPool) {
    use annostore_core::state::{AnnotationDocumentState, PermissionLevel, SourceDocumentState};

    for state in [
        AnnotationDocumentState::New,
        AnnotationDocumentState::InProgress,
        AnnotationDocumentState::Finished,
        AnnotationDocumentState::Ignore,
    ] {
        let name: (String,) =
            sqlx::query_as("SELECT name FROM annotation_document_states WHERE id = $1")
                .bind(state.id())
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(name.0, state.name());
    }

    let name: (String,) =
        sqlx::query_as("SELECT name FROM source_document_states WHERE id = $1")
            .bind(SourceDocumentState::CurationFinished.id())
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(name.0, "curation_finished");

    let name: (String,) = sqlx::query_as("SELECT name FROM permission_levels WHERE id = $1")
        .bind(PermissionLevel::User.id())
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(name.0, "user");
}
