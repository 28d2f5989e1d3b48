use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use memoir_domain::DomainResult;
use memoir_domain::error::DomainError;
use memoir_domain::notifications::NotificationSettings;
use memoir_domain::ports::BoxFuture;
use memoir_domain::ports::notifications::NotificationSettingsRepository;
use memoir_domain::ports::questions::{GlobalQuestionRepository, QuestionRepository};
use memoir_domain::questions::{GlobalQuestion, Question};

#[derive(Default)]
pub struct InMemoryGlobalQuestionRepository {
    store: Arc<RwLock<HashMap<String, GlobalQuestion>>>,
}

#[derive(Default)]
pub struct InMemoryQuestionRepository {
    store: Arc<RwLock<HashMap<String, Question>>>,
}

#[derive(Default)]
pub struct InMemoryNotificationSettingsRepository {
    store: Arc<RwLock<HashMap<String, NotificationSettings>>>,
}

// Store order for the in-memory backend: creation time, then id. The "first
// non-excluded" pick is defined against this order, not randomness.
fn ordered_globals(store: &HashMap<String, GlobalQuestion>) -> Vec<GlobalQuestion> {
    let mut globals: Vec<_> = store.values().cloned().collect();
    globals.sort_by(|left, right| {
        left.created_at_ms
            .cmp(&right.created_at_ms)
            .then_with(|| left.global_question_id.cmp(&right.global_question_id))
    });
    globals
}

impl GlobalQuestionRepository for InMemoryGlobalQuestionRepository {
    fn create(&self, question: &GlobalQuestion) -> BoxFuture<'_, DomainResult<GlobalQuestion>> {
        let question = question.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&question.global_question_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(question.global_question_id.clone(), question.clone());
            Ok(question)
        })
    }

    fn get(
        &self,
        global_question_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
        let global_question_id = global_question_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&global_question_id).cloned()) })
    }

    fn first_with_except(
        &self,
        except_ids: &HashSet<String>,
    ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
        let except_ids = except_ids.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            Ok(ordered_globals(&store)
                .into_iter()
                .find(|global| !except_ids.contains(&global.global_question_id)))
        })
    }

    fn list_with_except(
        &self,
        except_ids: &HashSet<String>,
        categories: &HashSet<String>,
    ) -> BoxFuture<'_, DomainResult<Vec<GlobalQuestion>>> {
        let except_ids = except_ids.clone();
        let categories = categories.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            Ok(ordered_globals(&store)
                .into_iter()
                .filter(|global| !except_ids.contains(&global.global_question_id))
                .filter(|global| categories.is_empty() || categories.contains(&global.category_id))
                .collect())
        })
    }
}

impl QuestionRepository for InMemoryQuestionRepository {
    fn create(&self, question: &Question) -> BoxFuture<'_, DomainResult<Question>> {
        let question = question.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            if store.contains_key(&question.question_id) {
                return Err(DomainError::Conflict);
            }
            store.insert(question.question_id.clone(), question.clone());
            Ok(question)
        })
    }

    fn get(&self, question_id: &str) -> BoxFuture<'_, DomainResult<Option<Question>>> {
        let question_id = question_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&question_id).cloned()) })
    }

    fn update(
        &self,
        question_id: &str,
        question: &Question,
    ) -> BoxFuture<'_, DomainResult<Question>> {
        let question_id = question_id.to_string();
        let question = question.clone();
        let store = self.store.clone();
        Box::pin(async move {
            let mut store = store.write().await;
            let slot = store.get_mut(&question_id).ok_or(DomainError::NotFound)?;
            *slot = question.clone();
            Ok(question)
        })
    }

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Question>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move {
            let store = store.read().await;
            let mut questions: Vec<_> = store
                .values()
                .filter(|question| question.user_id == user_id)
                .cloned()
                .collect();
            questions.sort_by(|left, right| {
                left.created_at_ms
                    .cmp(&right.created_at_ms)
                    .then_with(|| left.question_id.cmp(&right.question_id))
            });
            Ok(questions)
        })
    }
}

impl NotificationSettingsRepository for InMemoryNotificationSettingsRepository {
    fn upsert(
        &self,
        settings: &NotificationSettings,
    ) -> BoxFuture<'_, DomainResult<NotificationSettings>> {
        let settings = settings.clone();
        let store = self.store.clone();
        Box::pin(async move {
            store
                .write()
                .await
                .insert(settings.user_id.clone(), settings.clone());
            Ok(settings)
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<NotificationSettings>>> {
        let user_id = user_id.to_string();
        let store = self.store.clone();
        Box::pin(async move { Ok(store.read().await.get(&user_id).cloned()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn global(id: &str, category_id: &str, created_at_ms: i64) -> GlobalQuestion {
        GlobalQuestion {
            global_question_id: id.to_string(),
            title: format!("prompt {id}"),
            category_id: category_id.to_string(),
            created_at_ms,
        }
    }

    async fn seeded_globals() -> InMemoryGlobalQuestionRepository {
        let repo = InMemoryGlobalQuestionRepository::default();
        for (id, category, at) in [("a", "cat-1", 1), ("b", "cat-2", 2), ("c", "cat-1", 3)] {
            repo.create(&global(id, category, at)).await.expect("create");
        }
        repo
    }

    #[tokio::test]
    async fn list_with_except_never_returns_excluded_ids() {
        let repo = seeded_globals().await;
        let except: HashSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();
        let listed = repo
            .list_with_except(&except, &HashSet::new())
            .await
            .expect("list");
        assert!(listed.iter().all(|global| !except.contains(&global.global_question_id)));
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn list_with_except_filters_by_category_when_non_empty() {
        let repo = seeded_globals().await;
        let categories: HashSet<String> = ["cat-1".to_string()].into_iter().collect();
        let listed = repo
            .list_with_except(&HashSet::new(), &categories)
            .await
            .expect("list");
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|global| global.category_id == "cat-1"));
    }

    #[tokio::test]
    async fn empty_category_set_means_no_filter() {
        let repo = seeded_globals().await;
        let listed = repo
            .list_with_except(&HashSet::new(), &HashSet::new())
            .await
            .expect("list");
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn first_with_except_follows_store_order() {
        let repo = seeded_globals().await;
        let first = repo
            .first_with_except(&HashSet::new())
            .await
            .expect("pick")
            .expect("some");
        assert_eq!(first.global_question_id, "a");

        let except: HashSet<String> = ["a".to_string()].into_iter().collect();
        let next = repo
            .first_with_except(&except)
            .await
            .expect("pick")
            .expect("some");
        assert_eq!(next.global_question_id, "b");
    }

    #[tokio::test]
    async fn first_with_except_is_none_only_when_everything_is_excluded() {
        let repo = seeded_globals().await;
        let partial: HashSet<String> = ["a".to_string(), "b".to_string()].into_iter().collect();
        assert!(repo.first_with_except(&partial).await.expect("pick").is_some());

        let all: HashSet<String> = ["a", "b", "c"].iter().map(|id| id.to_string()).collect();
        assert!(repo.first_with_except(&all).await.expect("pick").is_none());
    }

    #[tokio::test]
    async fn create_twice_is_a_conflict() {
        let repo = InMemoryGlobalQuestionRepository::default();
        let question = global("a", "cat-1", 1);
        repo.create(&question).await.expect("create");
        let err = repo.create(&question).await.expect_err("conflict");
        assert!(matches!(err, DomainError::Conflict));
    }

    #[tokio::test]
    async fn question_update_requires_existing_row() {
        let repo = InMemoryQuestionRepository::default();
        let question = Question {
            question_id: "q-1".to_string(),
            global_question_id: None,
            title: "prompt".to_string(),
            category_id: "cat-1".to_string(),
            user_id: "user-1".to_string(),
            status: memoir_domain::questions::QuestionStatus::Unanswered,
            answer: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        let err = repo.update("q-1", &question).await.expect_err("missing");
        assert!(matches!(err, DomainError::NotFound));

        repo.create(&question).await.expect("create");
        let mut updated = question.clone();
        updated.answer = Some("x".to_string());
        let stored = repo.update("q-1", &updated).await.expect("update");
        assert_eq!(stored.answer.as_deref(), Some("x"));
    }

    #[tokio::test]
    async fn settings_upsert_replaces_previous_value() {
        let repo = InMemoryNotificationSettingsRepository::default();
        let mut settings = NotificationSettings {
            user_id: "user-1".to_string(),
            email: "first@example.com".to_string(),
            telegram_name: "reader".to_string(),
            period_in_days: 7,
            updated_at_ms: 1,
        };
        repo.upsert(&settings).await.expect("upsert");
        settings.email = "second@example.com".to_string();
        repo.upsert(&settings).await.expect("upsert");

        let stored = repo.get("user-1").await.expect("get").expect("some");
        assert_eq!(stored.email, "second@example.com");
        assert!(repo.get("user-2").await.expect("get").is_none());
    }
}
