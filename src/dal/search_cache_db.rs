use sqlx::{postgres::PgQueryResult, PgPool};
use uuid::Uuid;

pub async fn upsert_search_result(
    pool: &PgPool,
    namespace: &str,
    execution_id: Uuid,
    payload: serde_json::Value,
) -> Result<PgQueryResult, sqlx::Error> {
    sqlx::query(
        r"
        insert into search_cache
            (namespace, execution_id, payload)
        values
            ($1, $2, $3)
        on conflict(namespace, execution_id) do update set
            payload = $3
        ",
    )
    .bind(namespace)
    .bind(execution_id)
    .bind(payload)
    .execute(pool)
    .await
}

pub async fn get_search_result(
    pool: &PgPool,
    namespace: &str,
    execution_id: Uuid,
) -> Result<Option<serde_json::Value>, sqlx::Error> {
    sqlx::query_scalar(
        r"
        select
            payload
        from
            search_cache
        where
            namespace = $1 and execution_id = $2
        ",
    )
    .bind(namespace)
    .bind(execution_id)
    .fetch_optional(pool)
    .await
}
