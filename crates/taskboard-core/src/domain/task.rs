//! Task record, create payload and partial update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::errors::ValidationError;
use super::ids::TaskId;

pub const TITLE_MAX_LEN: usize = 255;
pub const CATEGORY_MAX_LEN: usize = 100;
pub const PRIORITY_MIN: u8 = 1;
pub const PRIORITY_MAX: u8 = 10;
pub const DEFAULT_PRIORITY: u8 = 1;

/// The unit of content.
///
/// `completed` is the only thing that decides which partition a record lives in.
/// `id` and `created_at` belong to the remote service; the client only invents
/// them for a placeholder (see [`NewTask::into_placeholder`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub completed: bool,
    pub priority: u8,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Create payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Check limits and normalize.
    ///
    /// Title is trimmed; blank description/category collapse to `None`.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let title = check_title(&self.title)?;
        let priority = self.priority.map(check_priority).transpose()?;
        let category = normalize_optional(self.category);
        if let Some(category) = &category {
            check_category(category)?;
        }
        Ok(Self {
            title,
            description: normalize_optional(self.description),
            completed: self.completed,
            priority,
            category,
            due_date: self.due_date,
        })
    }

    pub fn effective_priority(&self) -> u8 {
        self.priority.unwrap_or(DEFAULT_PRIORITY)
    }

    /// Build the record shown while the create is in flight.
    pub fn into_placeholder(self, id: TaskId, now: DateTime<Utc>) -> Task {
        let priority = self.effective_priority();
        Task {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            priority,
            category: self.category,
            due_date: self.due_date,
            created_at: now,
        }
    }
}

/// Partial update.
///
/// Nullable fields are tri-state: `None` leaves the field alone,
/// `Some(None)` clears it, `Some(Some(v))` sets it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub category: Option<Option<String>>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskPatch {
    pub fn completion(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.category.is_none()
            && self.due_date.is_none()
    }

    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        let title = self.title.as_deref().map(check_title).transpose()?;
        let priority = self.priority.map(check_priority).transpose()?;
        let category = self.category.map(normalize_optional);
        if let Some(Some(category)) = &category {
            check_category(category)?;
        }
        Ok(Self {
            title,
            description: self.description.map(normalize_optional),
            completed: self.completed,
            priority,
            category,
            due_date: self.due_date,
        })
    }

    /// Merge the set fields over `task`. `id` and `created_at` are never touched.
    pub fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(completed) = self.completed {
            next.completed = completed;
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(category) = &self.category {
            next.category = category.clone();
        }
        if let Some(due_date) = self.due_date {
            next.due_date = due_date;
        }
        next
    }
}

fn check_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle);
    }
    let len = title.chars().count();
    if len > TITLE_MAX_LEN {
        return Err(ValidationError::TitleTooLong {
            len,
            max: TITLE_MAX_LEN,
        });
    }
    Ok(title.to_string())
}

fn check_priority(priority: u8) -> Result<u8, ValidationError> {
    if (PRIORITY_MIN..=PRIORITY_MAX).contains(&priority) {
        Ok(priority)
    } else {
        Err(ValidationError::PriorityOutOfRange(priority))
    }
}

fn check_category(category: &str) -> Result<(), ValidationError> {
    let len = category.chars().count();
    if len > CATEGORY_MAX_LEN {
        return Err(ValidationError::CategoryTooLong {
            len,
            max: CATEGORY_MAX_LEN,
        });
    }
    Ok(())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// `null` を `Some(None)` として読むためのデシリアライザ
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn sample() -> Task {
        Task {
            id: TaskId::Remote(1),
            title: "write report".to_string(),
            description: Some("quarterly".to_string()),
            completed: false,
            priority: 3,
            category: Some("Work".to_string()),
            due_date: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        }
    }

    #[rstest]
    #[case("", ValidationError::EmptyTitle)]
    #[case("   ", ValidationError::EmptyTitle)]
    fn blank_titles_are_rejected(#[case] title: &str, #[case] expected: ValidationError) {
        assert_eq!(NewTask::new(title).validate().unwrap_err(), expected);
    }

    #[test]
    fn long_title_is_rejected() {
        let err = NewTask::new("x".repeat(256)).validate().unwrap_err();
        assert_eq!(err, ValidationError::TitleTooLong { len: 256, max: 255 });
    }

    #[rstest]
    #[case(0)]
    #[case(11)]
    fn out_of_range_priority_is_rejected(#[case] priority: u8) {
        let err = NewTask::new("x").with_priority(priority).validate().unwrap_err();
        assert_eq!(err, ValidationError::PriorityOutOfRange(priority));
    }

    #[test]
    fn validate_normalizes_payload() {
        let payload = NewTask::new("  buy milk ")
            .with_category("  ")
            .with_description("")
            .validate()
            .unwrap();
        assert_eq!(payload.title, "buy milk");
        assert_eq!(payload.category, None);
        assert_eq!(payload.description, None);
        assert_eq!(payload.effective_priority(), DEFAULT_PRIORITY);
    }

    #[test]
    fn placeholder_takes_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let id = TaskId::placeholder(ulid::Ulid::new());
        let task = NewTask::new("x").with_priority(5).into_placeholder(id, now);
        assert_eq!(task.id, id);
        assert_eq!(task.priority, 5);
        assert!(!task.completed);
        assert_eq!(task.created_at, now);
    }

    #[test]
    fn empty_patch_is_rejected() {
        assert_eq!(
            TaskPatch::default().validate().unwrap_err(),
            ValidationError::EmptyPatch
        );
    }

    #[test]
    fn patch_merges_only_set_fields() {
        let task = sample();
        let patch = TaskPatch {
            priority: Some(9),
            category: Some(None),
            ..Default::default()
        };
        let next = patch.apply_to(&task);
        assert_eq!(next.priority, 9);
        assert_eq!(next.category, None);
        assert_eq!(next.title, task.title);
        assert_eq!(next.description, task.description);
        assert_eq!(next.id, task.id);
        assert_eq!(next.created_at, task.created_at);
    }

    #[test]
    fn patch_json_distinguishes_clear_from_untouched() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"category": null, "priority": 2}"#).unwrap();
        assert_eq!(patch.category, Some(None));
        assert_eq!(patch.description, None);
        assert_eq!(patch.priority, Some(2));

        let json = serde_json::to_value(TaskPatch::completion(true)).unwrap();
        assert_eq!(json, serde_json::json!({ "completed": true }));
    }
}
