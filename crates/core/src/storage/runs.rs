use crate::domain::contract::RunResult;
use crate::domain::run_config::RunConfig;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use uuid::Uuid;

/// A persisted run together with the configuration that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct StoredRun {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub config: RunConfig,
    pub result: RunResult,
}

type RunRow = (Uuid, DateTime<Utc>, Json<RunConfig>, Json<RunResult>);

pub async fn persist_run(
    pool: &sqlx::PgPool,
    config: &RunConfig,
    result: &RunResult,
) -> anyhow::Result<Uuid> {
    result
        .validate()
        .context("refusing to persist an invalid run result")?;

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO model_runs (id, created_at, data_mode, trade_header, current_date_utc, prediction_date, config, result) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(result.created_at)
    .bind(result.data_mode.as_str())
    .bind(result.trade_header.as_str())
    .bind(result.current_date)
    .bind(result.prediction_date)
    .bind(Json(config))
    .bind(Json(result))
    .fetch_one(pool)
    .await
    .context("insert model_runs failed")?;

    tracing::info!(run_id = %id, data_mode = %result.data_mode, "run persisted");
    Ok(id)
}

pub async fn fetch_latest_run(pool: &sqlx::PgPool) -> anyhow::Result<Option<StoredRun>> {
    let row = sqlx::query_as::<_, RunRow>(
        "SELECT id, created_at, config, result \
         FROM model_runs \
         ORDER BY created_at DESC \
         LIMIT 1",
    )
    .fetch_optional(pool)
    .await
    .context("select latest model_runs failed")?;

    row.map(into_stored).transpose()
}

pub async fn fetch_run(pool: &sqlx::PgPool, id: Uuid) -> anyhow::Result<Option<StoredRun>> {
    let row = sqlx::query_as::<_, RunRow>(
        "SELECT id, created_at, config, result \
         FROM model_runs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("select model_runs by id failed")?;

    row.map(into_stored).transpose()
}

fn into_stored((id, created_at, Json(config), Json(result)): RunRow) -> anyhow::Result<StoredRun> {
    result
        .validate()
        .with_context(|| format!("stored run {id} violates the output contract"))?;
    Ok(StoredRun {
        id,
        created_at,
        config,
        result,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::tests::valid_run;

    #[test]
    fn stored_rows_are_revalidated() {
        let ok = into_stored((
            Uuid::nil(),
            Utc::now(),
            Json(RunConfig::default()),
            Json(valid_run()),
        ))
        .unwrap();
        assert_eq!(ok.result.results.len(), 11);

        let mut broken = valid_run();
        broken.results.truncate(10);
        let err = into_stored((Uuid::nil(), Utc::now(), Json(RunConfig::default()), Json(broken)))
            .unwrap_err();
        assert!(err.to_string().contains("output contract"));
    }
}
