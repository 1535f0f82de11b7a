use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::calendar_event::TargetingCondition;
use crate::models::user::User;

/// Normalized audience filter. `None` leaves a dimension unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub batches: Option<Vec<String>>,
    pub sections: Option<Vec<String>>,
    pub course: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl UserFilter {
    pub fn from_condition(condition: &TargetingCondition) -> Self {
        Self {
            batches: non_blank(&condition.batches),
            sections: non_blank(&condition.sections),
            course: condition
                .course
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            tags: non_blank(&condition.tags),
        }
    }

    pub fn is_unconstrained(&self) -> bool {
        self.batches.is_none() && self.sections.is_none() && self.course.is_none() && self.tags.is_none()
    }

    /// AND across dimensions, IN within batch/section lists, intersection on tags.
    pub fn matches(&self, user: &User) -> bool {
        if let Some(batches) = &self.batches {
            match &user.batch {
                Some(b) if batches.contains(b) => {}
                _ => return false,
            }
        }
        if let Some(sections) = &self.sections {
            match &user.section {
                Some(s) if sections.contains(s) => {}
                _ => return false,
            }
        }
        if let Some(course) = &self.course {
            if user.course.as_deref() != Some(course.as_str()) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !user.tags.iter().any(|t| tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

fn non_blank(values: &[String]) -> Option<Vec<String>> {
    let kept: Vec<String> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if kept.is_empty() {
        None
    } else {
        Some(kept)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;

    async fn find_users(&self, filter: &UserFilter) -> Result<Vec<User>>;
}

#[derive(Clone)]
pub struct RecipientResolver {
    users: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        Self { users }
    }

    pub async fn resolve(&self, condition: &TargetingCondition) -> Result<Vec<User>> {
        let filter = UserFilter::from_condition(condition);
        if filter.is_unconstrained() {
            tracing::warn!("Resolving an unconstrained audience; every user matches");
        }
        self.users.find_users(&filter).await
    }
}
