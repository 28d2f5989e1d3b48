use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::identity::ActorIdentity;
use crate::ports::questions::{GlobalQuestionRepository, QuestionRepository};
use crate::util::{now_ms, uuid_v7_without_dashes};

/// Category applied when a creator supplies none. Carried over from the
/// seed data set.
pub const DEFAULT_CATEGORY_ID: &str = "ea815826-0c02-e446-a984-00f62a687381";

const MAX_TITLE_LENGTH: usize = 500;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum QuestionStatus {
    Unanswered,
    PartlyAnswered,
    Answered,
}

impl QuestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionStatus::Unanswered => "Unanswered",
            QuestionStatus::PartlyAnswered => "PartlyAnswered",
            QuestionStatus::Answered => "Answered",
        }
    }
}

/// Reusable prompt template shared by all users. Immutable once created.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalQuestion {
    pub global_question_id: String,
    pub title: String,
    pub category_id: String,
    pub created_at_ms: i64,
}

/// Per-user instantiation of a prompt, carrying answer and status.
/// `global_question_id` is None for custom questions authored by the user.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub question_id: String,
    pub global_question_id: Option<String>,
    pub title: String,
    pub category_id: String,
    pub user_id: String,
    pub status: QuestionStatus,
    pub answer: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct GlobalQuestionCreate {
    pub title: String,
    pub category_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AnswerInput {
    pub answer: String,
    pub new_status: Option<QuestionStatus>,
}

#[derive(Clone)]
pub struct QuestionService {
    global_questions: Arc<dyn GlobalQuestionRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionService {
    pub fn new(
        global_questions: Arc<dyn GlobalQuestionRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            global_questions,
            questions,
        }
    }

    /// Global pool listing. When a user id is supplied, globals that user has
    /// already materialized are excluded; a non-empty category set further
    /// narrows the result.
    pub async fn list_global(
        &self,
        user_id: Option<&str>,
        categories: &HashSet<String>,
    ) -> DomainResult<Vec<GlobalQuestion>> {
        let except_ids = match user_id {
            Some(user_id) => self.seen_global_ids(user_id).await?,
            None => HashSet::new(),
        };
        self.global_questions
            .list_with_except(&except_ids, categories)
            .await
    }

    /// Picks the first global question the actor has not seen and materializes
    /// a per-user row for it. Read-then-write with no isolation: two
    /// concurrent calls can both observe the same unseen question and create
    /// duplicate rows.
    pub async fn assign_next(&self, actor: &ActorIdentity) -> DomainResult<Question> {
        let seen = self.seen_global_ids(&actor.user_id).await?;
        let global = self
            .global_questions
            .first_with_except(&seen)
            .await?
            .ok_or(DomainError::NotFound)?;

        let now = now_ms();
        let question = Question {
            question_id: uuid_v7_without_dashes(),
            global_question_id: Some(global.global_question_id),
            title: global.title,
            category_id: global.category_id,
            user_id: actor.user_id.clone(),
            status: QuestionStatus::Unanswered,
            answer: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.questions.create(&question).await
    }

    pub async fn list_for_user(&self, user_id: &str) -> DomainResult<Vec<Question>> {
        self.questions.list_for_user(user_id).await
    }

    /// Overwrites the answer text and, when supplied, the status. The caller
    /// states the new status explicitly; nothing is inferred. Ownership is
    /// enforced here, in one place, against the stored row.
    pub async fn answer(
        &self,
        actor: &ActorIdentity,
        question_id: &str,
        input: AnswerInput,
    ) -> DomainResult<Question> {
        let mut question = self
            .questions
            .get(question_id)
            .await?
            .ok_or(DomainError::NotFound)?;

        if question.user_id != actor.user_id {
            return Err(DomainError::Forbidden);
        }

        question.answer = Some(input.answer);
        if let Some(status) = input.new_status {
            question.status = status;
        }
        question.updated_at_ms = now_ms();

        self.questions.update(question_id, &question).await
    }

    pub async fn create_global(&self, input: GlobalQuestionCreate) -> DomainResult<GlobalQuestion> {
        let title = validate_title(&input.title)?;
        let global = GlobalQuestion {
            global_question_id: uuid_v7_without_dashes(),
            title,
            category_id: input
                .category_id
                .unwrap_or_else(|| DEFAULT_CATEGORY_ID.to_string()),
            created_at_ms: now_ms(),
        };
        self.global_questions.create(&global).await
    }

    /// Custom question authored directly by the user, with no global link.
    pub async fn create_custom(
        &self,
        actor: &ActorIdentity,
        title: &str,
    ) -> DomainResult<Question> {
        let title = validate_title(title)?;
        let now = now_ms();
        let question = Question {
            question_id: uuid_v7_without_dashes(),
            global_question_id: None,
            title,
            category_id: DEFAULT_CATEGORY_ID.to_string(),
            user_id: actor.user_id.clone(),
            status: QuestionStatus::Unanswered,
            answer: None,
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.questions.create(&question).await
    }

    async fn seen_global_ids(&self, user_id: &str) -> DomainResult<HashSet<String>> {
        let questions = self.questions.list_for_user(user_id).await?;
        Ok(questions
            .into_iter()
            .filter_map(|question| question.global_question_id)
            .collect())
    }
}

fn validate_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::Validation("title is required".into()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(DomainError::Validation(format!(
            "title exceeds max length of {MAX_TITLE_LENGTH}"
        )));
    }
    Ok(title.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::ports::BoxFuture;

    #[derive(Default)]
    struct FakeStore {
        globals: Mutex<Vec<GlobalQuestion>>,
        questions: Mutex<Vec<Question>>,
    }

    impl GlobalQuestionRepository for FakeStore {
        fn create(&self, question: &GlobalQuestion) -> BoxFuture<'_, DomainResult<GlobalQuestion>> {
            let question = question.clone();
            Box::pin(async move {
                self.globals.lock().expect("lock").push(question.clone());
                Ok(question)
            })
        }

        fn get(
            &self,
            global_question_id: &str,
        ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
            let global_question_id = global_question_id.to_string();
            Box::pin(async move {
                Ok(self
                    .globals
                    .lock()
                    .expect("lock")
                    .iter()
                    .find(|global| global.global_question_id == global_question_id)
                    .cloned())
            })
        }

        fn first_with_except(
            &self,
            except_ids: &HashSet<String>,
        ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
            let except_ids = except_ids.clone();
            Box::pin(async move {
                Ok(self
                    .globals
                    .lock()
                    .expect("lock")
                    .iter()
                    .find(|global| !except_ids.contains(&global.global_question_id))
                    .cloned())
            })
        }

        fn list_with_except(
            &self,
            except_ids: &HashSet<String>,
            categories: &HashSet<String>,
        ) -> BoxFuture<'_, DomainResult<Vec<GlobalQuestion>>> {
            let except_ids = except_ids.clone();
            let categories = categories.clone();
            Box::pin(async move {
                Ok(self
                    .globals
                    .lock()
                    .expect("lock")
                    .iter()
                    .filter(|global| !except_ids.contains(&global.global_question_id))
                    .filter(|global| {
                        categories.is_empty() || categories.contains(&global.category_id)
                    })
                    .cloned()
                    .collect())
            })
        }
    }

    impl QuestionRepository for FakeStore {
        fn create(&self, question: &Question) -> BoxFuture<'_, DomainResult<Question>> {
            let question = question.clone();
            Box::pin(async move {
                self.questions.lock().expect("lock").push(question.clone());
                Ok(question)
            })
        }

        fn get(&self, question_id: &str) -> BoxFuture<'_, DomainResult<Option<Question>>> {
            let question_id = question_id.to_string();
            Box::pin(async move {
                Ok(self
                    .questions
                    .lock()
                    .expect("lock")
                    .iter()
                    .find(|question| question.question_id == question_id)
                    .cloned())
            })
        }

        fn update(
            &self,
            question_id: &str,
            question: &Question,
        ) -> BoxFuture<'_, DomainResult<Question>> {
            let question_id = question_id.to_string();
            let question = question.clone();
            Box::pin(async move {
                let mut questions = self.questions.lock().expect("lock");
                let slot = questions
                    .iter_mut()
                    .find(|stored| stored.question_id == question_id)
                    .ok_or(DomainError::NotFound)?;
                *slot = question.clone();
                Ok(question)
            })
        }

        fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Question>>> {
            let user_id = user_id.to_string();
            Box::pin(async move {
                Ok(self
                    .questions
                    .lock()
                    .expect("lock")
                    .iter()
                    .filter(|question| question.user_id == user_id)
                    .cloned()
                    .collect())
            })
        }
    }

    fn service_with_store() -> (Arc<FakeStore>, QuestionService) {
        let store = Arc::new(FakeStore::default());
        let service = QuestionService::new(store.clone(), store.clone());
        (store, service)
    }

    fn global(id: &str, category_id: &str) -> GlobalQuestion {
        GlobalQuestion {
            global_question_id: id.to_string(),
            title: format!("prompt {id}"),
            category_id: category_id.to_string(),
            created_at_ms: 0,
        }
    }

    fn actor(user_id: &str) -> ActorIdentity {
        ActorIdentity::with_user_id(user_id)
    }

    #[tokio::test]
    async fn assign_next_skips_already_seen_globals() {
        let (store, service) = service_with_store();
        for id in ["a", "b", "c"] {
            store
                .globals
                .lock()
                .expect("lock")
                .push(global(id, DEFAULT_CATEGORY_ID));
        }
        let owner = actor("user-1");
        let first = service.assign_next(&owner).await.expect("first");
        let second = service.assign_next(&owner).await.expect("second");
        let third = service.assign_next(&owner).await.expect("third");

        let mut picked: Vec<_> = [&first, &second, &third]
            .iter()
            .filter_map(|question| question.global_question_id.clone())
            .collect();
        picked.sort();
        assert_eq!(picked, vec!["a", "b", "c"]);
        assert_eq!(first.status, QuestionStatus::Unanswered);
        assert_eq!(first.user_id, "user-1");
    }

    #[tokio::test]
    async fn assign_next_is_not_found_when_pool_is_exhausted() {
        let (store, service) = service_with_store();
        store
            .globals
            .lock()
            .expect("lock")
            .push(global("a", DEFAULT_CATEGORY_ID));
        let owner = actor("user-1");
        service.assign_next(&owner).await.expect("first");

        let err = service.assign_next(&owner).await.expect_err("exhausted");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn answer_overwrites_text_and_status() {
        let (store, service) = service_with_store();
        store
            .globals
            .lock()
            .expect("lock")
            .push(global("a", DEFAULT_CATEGORY_ID));
        let owner = actor("user-1");
        let question = service.assign_next(&owner).await.expect("assign");

        let updated = service
            .answer(
                &owner,
                &question.question_id,
                AnswerInput {
                    answer: "x".to_string(),
                    new_status: Some(QuestionStatus::Answered),
                },
            )
            .await
            .expect("answer");
        assert_eq!(updated.answer.as_deref(), Some("x"));
        assert_eq!(updated.status, QuestionStatus::Answered);
    }

    #[tokio::test]
    async fn answer_keeps_status_when_none_supplied() {
        let (store, service) = service_with_store();
        store
            .globals
            .lock()
            .expect("lock")
            .push(global("a", DEFAULT_CATEGORY_ID));
        let owner = actor("user-1");
        let question = service.assign_next(&owner).await.expect("assign");

        let updated = service
            .answer(
                &owner,
                &question.question_id,
                AnswerInput {
                    answer: "draft".to_string(),
                    new_status: None,
                },
            )
            .await
            .expect("answer");
        assert_eq!(updated.status, QuestionStatus::Unanswered);
    }

    #[tokio::test]
    async fn answer_is_forbidden_for_non_owner() {
        let (store, service) = service_with_store();
        store
            .globals
            .lock()
            .expect("lock")
            .push(global("a", DEFAULT_CATEGORY_ID));
        let owner = actor("user-1");
        let question = service.assign_next(&owner).await.expect("assign");

        let err = service
            .answer(
                &actor("user-2"),
                &question.question_id,
                AnswerInput {
                    answer: "x".to_string(),
                    new_status: Some(QuestionStatus::Answered),
                },
            )
            .await
            .expect_err("forbidden");
        assert!(matches!(err, DomainError::Forbidden));
    }

    #[tokio::test]
    async fn answer_unknown_question_is_not_found() {
        let (_, service) = service_with_store();
        let err = service
            .answer(
                &actor("user-1"),
                "missing",
                AnswerInput {
                    answer: "x".to_string(),
                    new_status: None,
                },
            )
            .await
            .expect_err("not found");
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn list_global_excludes_seen_and_filters_categories() {
        let (store, service) = service_with_store();
        {
            let mut globals = store.globals.lock().expect("lock");
            globals.push(global("a", "cat-1"));
            globals.push(global("b", "cat-2"));
            globals.push(global("c", "cat-1"));
        }
        let owner = actor("user-1");
        let assigned = service.assign_next(&owner).await.expect("assign");
        assert_eq!(assigned.global_question_id.as_deref(), Some("a"));

        let all = service
            .list_global(Some("user-1"), &HashSet::new())
            .await
            .expect("list");
        assert!(
            all.iter()
                .all(|global| global.global_question_id != "a")
        );
        assert_eq!(all.len(), 2);

        let categories: HashSet<String> = ["cat-1".to_string()].into_iter().collect();
        let narrowed = service
            .list_global(Some("user-1"), &categories)
            .await
            .expect("list");
        assert_eq!(narrowed.len(), 1);
        assert_eq!(narrowed[0].global_question_id, "c");
    }

    #[tokio::test]
    async fn create_global_defaults_the_category() {
        let (_, service) = service_with_store();
        let created = service
            .create_global(GlobalQuestionCreate {
                title: "  What mattered today?  ".to_string(),
                category_id: None,
            })
            .await
            .expect("create");
        assert_eq!(created.category_id, DEFAULT_CATEGORY_ID);
        assert_eq!(created.title, "What mattered today?");
    }

    #[tokio::test]
    async fn create_custom_has_no_global_link() {
        let (_, service) = service_with_store();
        let question = service
            .create_custom(&actor("user-1"), "My own prompt")
            .await
            .expect("create");
        assert!(question.global_question_id.is_none());
        assert_eq!(question.status, QuestionStatus::Unanswered);
        assert_eq!(question.category_id, DEFAULT_CATEGORY_ID);
    }

    #[test]
    fn empty_title_is_rejected() {
        assert!(validate_title("   ").is_err());
    }
}
