//! Database operations for `company_dna` — the onboarding questionnaire.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `company_dna` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CompanyDnaRow {
    pub id: i64,
    pub user_id: Uuid,
    pub company_name: String,
    pub company_website: String,
    pub target_market: String,
    pub target_language: String,
    pub created_at: DateTime<Utc>,
}

/// Field set captured by the onboarding dialog.
#[derive(Debug, Clone)]
pub struct NewCompanyDna {
    pub company_name: String,
    pub company_website: String,
    pub target_market: String,
    pub target_language: String,
}

/// Inserts an onboarding record for the user.
///
/// Submissions append; there is no unique constraint, and readers take the
/// newest row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn insert_company_dna(
    pool: &PgPool,
    user_id: Uuid,
    dna: &NewCompanyDna,
) -> Result<CompanyDnaRow, DbError> {
    let row = sqlx::query_as::<_, CompanyDnaRow>(
        "INSERT INTO company_dna \
             (user_id, company_name, company_website, target_market, target_language) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, user_id, company_name, company_website, target_market, \
                   target_language, created_at",
    )
    .bind(user_id)
    .bind(&dna.company_name)
    .bind(&dna.company_website)
    .bind(&dna.target_market)
    .bind(&dna.target_language)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Returns the user's most recent onboarding record, if any.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn latest_company_dna_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<CompanyDnaRow>, DbError> {
    let row = sqlx::query_as::<_, CompanyDnaRow>(
        "SELECT id, user_id, company_name, company_website, target_market, \
                target_language, created_at \
         FROM company_dna \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
