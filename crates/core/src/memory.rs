//! In-memory store, used when no database is configured and in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::{
    progress::{Enrollment, LessonProgress, ProgressStore},
    users::{UserProfile, UserStore},
};

type Key = (String, String);

#[derive(Default)]
struct Inner {
    enrollments: HashMap<Key, Enrollment>,
    progress: HashMap<Key, LessonProgress>,
    users: HashMap<String, UserProfile>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(user_id: &str, other: &str) -> Key {
    (user_id.to_string(), other.to_string())
}

fn new_progress(user_id: &str, lesson_id: &str) -> LessonProgress {
    let now = Utc::now();
    LessonProgress {
        user_id: user_id.to_string(),
        lesson_id: lesson_id.to_string(),
        completed: false,
        completion_percentage: 0,
        current_stage: None,
        started_at: now,
        last_accessed_at: now,
        completed_at: None,
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn enroll(&self, user_id: &str, course_id: &str) -> Result<Enrollment> {
        let mut inner = self.inner.lock().await;
        let enrollment = inner
            .enrollments
            .entry(key(user_id, course_id))
            .or_insert_with(|| Enrollment {
                user_id: user_id.to_string(),
                course_id: course_id.to_string(),
                enrolled_at: Utc::now(),
            });
        Ok(enrollment.clone())
    }

    async fn unenroll(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let mut inner = self.inner.lock().await;
        Ok(inner.enrollments.remove(&key(user_id, course_id)).is_some())
    }

    async fn is_enrolled(&self, user_id: &str, course_id: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        Ok(inner.enrollments.contains_key(&key(user_id, course_id)))
    }

    async fn list_enrollments(&self, user_id: &str) -> Result<Vec<Enrollment>> {
        let inner = self.inner.lock().await;
        let mut enrollments: Vec<Enrollment> = inner
            .enrollments
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        enrollments.sort_by(|a, b| a.enrolled_at.cmp(&b.enrolled_at));
        Ok(enrollments)
    }

    async fn mark_lesson_complete(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<LessonProgress> {
        let mut inner = self.inner.lock().await;
        let now = Utc::now();
        let progress = inner
            .progress
            .entry(key(user_id, lesson_id))
            .or_insert_with(|| new_progress(user_id, lesson_id));
        progress.completed = true;
        progress.completion_percentage = 100;
        progress.last_accessed_at = now;
        progress.completed_at.get_or_insert(now);
        Ok(progress.clone())
    }

    async fn record_lesson_access(
        &self,
        user_id: &str,
        lesson_id: &str,
        stage: Option<&str>,
    ) -> Result<LessonProgress> {
        let mut inner = self.inner.lock().await;
        let progress = inner
            .progress
            .entry(key(user_id, lesson_id))
            .or_insert_with(|| new_progress(user_id, lesson_id));
        if let Some(stage) = stage {
            progress.current_stage = Some(stage.to_string());
        }
        progress.last_accessed_at = Utc::now();
        Ok(progress.clone())
    }

    async fn lesson_progress(
        &self,
        user_id: &str,
        lesson_id: &str,
    ) -> Result<Option<LessonProgress>> {
        let inner = self.inner.lock().await;
        Ok(inner.progress.get(&key(user_id, lesson_id)).cloned())
    }

    async fn lessons_progress(
        &self,
        user_id: &str,
        lesson_ids: &[String],
    ) -> Result<Vec<LessonProgress>> {
        let inner = self.inner.lock().await;
        Ok(lesson_ids
            .iter()
            .filter_map(|lesson_id| inner.progress.get(&key(user_id, lesson_id)).cloned())
            .collect())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let inner = self.inner.lock().await;
        Ok(inner.users.get(user_id).cloned())
    }

    async fn complete_onboarding(&self, user_id: &str) -> Result<UserProfile> {
        let mut inner = self.inner.lock().await;
        let profile = inner
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id));
        profile.onboarded = true;
        Ok(profile.clone())
    }

    async fn record_conversation(&self, user_id: &str, limit: u32) -> Result<Option<u32>> {
        let mut inner = self.inner.lock().await;
        let profile = inner
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id));
        if limit > 0 && profile.free_conversations_used >= limit {
            return Ok(None);
        }
        profile.free_conversations_used += 1;
        Ok(Some(profile.free_conversations_used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::progress::course_progress;

    #[tokio::test]
    async fn enrolling_twice_leaves_one_enrollment() {
        let store = MemoryStore::new();
        let first = store.enroll("u1", "c1").await.unwrap();
        let second = store.enroll("u1", "c1").await.unwrap();

        assert_eq!(first, second);
        assert!(store.is_enrolled("u1", "c1").await.unwrap());
        assert_eq!(store.list_enrollments("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unenrolling_when_never_enrolled_is_a_no_op() {
        let store = MemoryStore::new();
        assert!(!store.unenroll("u1", "c1").await.unwrap());
        assert!(!store.is_enrolled("u1", "c1").await.unwrap());
    }

    #[tokio::test]
    async fn unenroll_keeps_lesson_progress() {
        let store = MemoryStore::new();
        store.enroll("u1", "c1").await.unwrap();
        store.mark_lesson_complete("u1", "l1").await.unwrap();

        assert!(store.unenroll("u1", "c1").await.unwrap());
        assert!(!store.is_enrolled("u1", "c1").await.unwrap());
        assert!(store.lesson_progress("u1", "l1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn marking_complete_upserts_a_single_record() {
        let store = MemoryStore::new();
        let first = store.mark_lesson_complete("u1", "l1").await.unwrap();
        let second = store.mark_lesson_complete("u1", "l1").await.unwrap();

        assert!(second.completed);
        assert_eq!(second.completion_percentage, 100);
        assert_eq!(first.started_at, second.started_at);
        assert_eq!(first.completed_at, second.completed_at);
        assert!(second.last_accessed_at >= first.last_accessed_at);
        let all = store
            .lessons_progress("u1", &["l1".to_string()])
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn access_updates_stage_without_touching_completion() {
        let store = MemoryStore::new();
        store.mark_lesson_complete("u1", "l1").await.unwrap();
        let progress = store
            .record_lesson_access("u1", "l1", Some("coffee-line"))
            .await
            .unwrap();
        assert!(progress.completed);
        assert_eq!(progress.current_stage.as_deref(), Some("coffee-line"));

        let fresh = store.record_lesson_access("u1", "l2", None).await.unwrap();
        assert!(!fresh.completed);
        assert_eq!(fresh.current_stage, None);
    }

    #[tokio::test]
    async fn course_progress_aggregates_over_lessons() {
        let catalog = Catalog::builtin().unwrap();
        let course = catalog.course("workplace-communication").unwrap();
        let store = MemoryStore::new();
        store.mark_lesson_complete("u1", "giving-updates").await.unwrap();
        store
            .record_lesson_access("u1", "negotiation", Some("salary-raise"))
            .await
            .unwrap();
        store.mark_lesson_complete("u2", "negotiation").await.unwrap();

        let progress = course_progress(&store, "u1", course).await.unwrap();
        assert_eq!(progress.total_lessons, 2);
        assert_eq!(progress.completed_lessons, 1);
        assert_eq!(progress.percentage, 50);
        assert_eq!(progress.lessons.len(), 2);
    }

    #[tokio::test]
    async fn user_profile_tracks_onboarding_and_conversations() {
        let store = MemoryStore::new();
        assert!(store.profile("u1").await.unwrap().is_none());

        assert_eq!(store.record_conversation("u1", 0).await.unwrap(), Some(1));
        assert_eq!(store.record_conversation("u1", 0).await.unwrap(), Some(2));
        let profile = store.complete_onboarding("u1").await.unwrap();
        assert!(profile.onboarded);
        assert_eq!(profile.free_conversations_used, 2);
    }

    #[tokio::test]
    async fn concurrent_conversations_never_pass_the_limit() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let attempts: Vec<_> = (0..10)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.record_conversation("u1", 3).await.unwrap() })
            })
            .collect();

        let mut counted = 0;
        for attempt in attempts {
            if attempt.await.unwrap().is_some() {
                counted += 1;
            }
        }
        assert_eq!(counted, 3);
        let profile = store.profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.free_conversations_used, 3);
        assert_eq!(store.record_conversation("u1", 3).await.unwrap(), None);
    }
}
