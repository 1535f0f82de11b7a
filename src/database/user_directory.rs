use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::error::Result;
use crate::models::user::User;
use crate::services::recipient_resolver::{UserDirectory, UserFilter};

const USER_COLUMNS: &str = "id, name, email, batch, section, course, tags, created_at";

#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Compiles a filter to a SELECT. Unconstrained dimensions add no clause.
fn filtered_query(filter: &UserFilter) -> QueryBuilder<'_, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT {} FROM users WHERE TRUE", USER_COLUMNS));
    if let Some(batches) = &filter.batches {
        qb.push(" AND batch = ANY(").push_bind(batches).push(")");
    }
    if let Some(sections) = &filter.sections {
        qb.push(" AND section = ANY(").push_bind(sections).push(")");
    }
    if let Some(course) = &filter.course {
        qb.push(" AND course = ").push_bind(course);
    }
    if let Some(tags) = &filter.tags {
        qb.push(" AND tags && ").push_bind(tags);
    }
    qb.push(" ORDER BY created_at ASC");
    qb
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let users = filtered_query(filter)
            .build_query_as::<User>()
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}
