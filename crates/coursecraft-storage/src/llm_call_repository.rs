//! Audit log for provider invocations and the cost-report aggregation
//! that reads it back.

use coursecraft_core::models::{CostReport, CostSummary, GroupedCost, LlmCall};
use sqlx::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::error::Result;

/// Records and aggregates [`LlmCall`] rows. `tenant_id` is optional:
/// `Some` scopes every query to one tenant, `None` is the system/admin
/// bypass used for platform-wide cost reporting, matching the
/// original's `get_summary(tenant_id: Option<TenantId>)` rule.
pub struct LlmCallRepository<'a> {
    pool: &'a PgPool,
    tenant_id: Option<Uuid>,
}

impl<'a> LlmCallRepository<'a> {
    pub fn new(pool: &'a PgPool, tenant_id: Option<Uuid>) -> Self {
        Self { pool, tenant_id }
    }

    pub async fn record(&self, call: &LlmCall) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO llm_calls (
                id, tenant_id, action, strategy, provider, model_id,
                tokens_in, tokens_out, latency_ms, cost_usd, success,
                error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(call.id)
        .bind(call.tenant_id)
        .bind(&call.action)
        .bind(&call.strategy)
        .bind(&call.provider)
        .bind(&call.model_id)
        .bind(call.tokens_in.map(|v| v as i64))
        .bind(call.tokens_out.map(|v| v as i64))
        .bind(call.latency_ms as i64)
        .bind(call.cost_usd)
        .bind(call.success)
        .bind(&call.error_message)
        .bind(call.created_at)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_summary(&self) -> Result<CostSummary> {
        let row = if let Some(tenant_id) = self.tenant_id {
            sqlx::query(
                r#"
                SELECT
                    count(*) AS total_calls,
                    count(*) FILTER (WHERE success) AS successful_calls,
                    count(*) FILTER (WHERE NOT success) AS failed_calls,
                    coalesce(sum(cost_usd), 0.0) AS total_cost_usd,
                    coalesce(sum(tokens_in), 0) AS total_tokens_in,
                    coalesce(sum(tokens_out), 0) AS total_tokens_out,
                    coalesce(avg(latency_ms), 0.0) AS avg_latency_ms
                FROM llm_calls WHERE tenant_id = $1
                "#,
            )
            .bind(tenant_id)
            .fetch_one(self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                SELECT
                    count(*) AS total_calls,
                    count(*) FILTER (WHERE success) AS successful_calls,
                    count(*) FILTER (WHERE NOT success) AS failed_calls,
                    coalesce(sum(cost_usd), 0.0) AS total_cost_usd,
                    coalesce(sum(tokens_in), 0) AS total_tokens_in,
                    coalesce(sum(tokens_out), 0) AS total_tokens_out,
                    coalesce(avg(latency_ms), 0.0) AS avg_latency_ms
                FROM llm_calls
                "#,
            )
            .fetch_one(self.pool)
            .await?
        };
        Ok(summary_from_row(&row))
    }

    async fn grouped_by(&self, column: &str) -> Result<Vec<GroupedCost>> {
        let query = format!(
            r#"
            SELECT
                {column} AS group_key,
                count(*) AS total_calls,
                count(*) FILTER (WHERE success) AS successful_calls,
                count(*) FILTER (WHERE NOT success) AS failed_calls,
                coalesce(sum(cost_usd), 0.0) AS total_cost_usd,
                coalesce(sum(tokens_in), 0) AS total_tokens_in,
                coalesce(sum(tokens_out), 0) AS total_tokens_out,
                coalesce(avg(latency_ms), 0.0) AS avg_latency_ms
            FROM llm_calls
            {where_clause}
            GROUP BY {column}
            ORDER BY {column}
            "#,
            where_clause = if self.tenant_id.is_some() { "WHERE tenant_id = $1" } else { "" },
        );
        let mut builder = sqlx::query(&query);
        if let Some(tenant_id) = self.tenant_id {
            builder = builder.bind(tenant_id);
        }
        let rows = builder.fetch_all(self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| GroupedCost {
                key: row.get("group_key"),
                summary: summary_from_row(&row),
            })
            .collect())
    }

    pub async fn get_cost_report(&self) -> Result<CostReport> {
        Ok(CostReport {
            overall: self.get_summary().await?,
            by_action: self.grouped_by("action").await?,
            by_provider: self.grouped_by("provider").await?,
            by_model: self.grouped_by("model_id").await?,
        })
    }
}

fn summary_from_row(row: &sqlx::postgres::PgRow) -> CostSummary {
    CostSummary {
        total_calls: row.get::<i64, _>("total_calls") as u64,
        successful_calls: row.get::<i64, _>("successful_calls") as u64,
        failed_calls: row.get::<i64, _>("failed_calls") as u64,
        total_cost_usd: row.get("total_cost_usd"),
        total_tokens_in: row.get::<i64, _>("total_tokens_in") as u64,
        total_tokens_out: row.get::<i64, _>("total_tokens_out") as u64,
        avg_latency_ms: row.get("avg_latency_ms"),
    }
}
