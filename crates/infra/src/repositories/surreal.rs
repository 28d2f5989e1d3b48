use std::collections::HashSet;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::Client;

use memoir_domain::DomainResult;
use memoir_domain::error::DomainError;
use memoir_domain::notifications::NotificationSettings;
use memoir_domain::ports::BoxFuture;
use memoir_domain::ports::notifications::NotificationSettingsRepository;
use memoir_domain::ports::questions::{GlobalQuestionRepository, QuestionRepository};
use memoir_domain::questions::{GlobalQuestion, Question};

const GLOBAL_QUESTION_TABLE: &str = "global_question";
const QUESTION_TABLE: &str = "question";
const NOTIFICATION_SETTINGS_TABLE: &str = "notification_settings";

fn map_db_error(err: surrealdb::Error) -> DomainError {
    match err {
        surrealdb::Error::Db(surrealdb::error::Db::RecordExists { .. }) => DomainError::Conflict,
        other => DomainError::Storage(other.to_string()),
    }
}

#[derive(Clone)]
pub struct SurrealGlobalQuestionRepository {
    client: Surreal<Client>,
}

impl SurrealGlobalQuestionRepository {
    pub fn with_client(client: Surreal<Client>) -> Self {
        Self { client }
    }
}

impl GlobalQuestionRepository for SurrealGlobalQuestionRepository {
    fn create(&self, question: &GlobalQuestion) -> BoxFuture<'_, DomainResult<GlobalQuestion>> {
        let question = question.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let created: Option<GlobalQuestion> = client
                .create((GLOBAL_QUESTION_TABLE, question.global_question_id.clone()))
                .content(question.clone())
                .await
                .map_err(map_db_error)?;
            Ok(created.unwrap_or(question))
        })
    }

    fn get(
        &self,
        global_question_id: &str,
    ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
        let global_question_id = global_question_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            client
                .select((GLOBAL_QUESTION_TABLE, global_question_id))
                .await
                .map_err(map_db_error)
        })
    }

    fn first_with_except(
        &self,
        except_ids: &HashSet<String>,
    ) -> BoxFuture<'_, DomainResult<Option<GlobalQuestion>>> {
        let except_ids = except_ids.clone();
        let client = self.client.clone();
        Box::pin(async move {
            // "First non-excluded" under whatever order the store returns.
            let globals: Vec<GlobalQuestion> = client
                .select(GLOBAL_QUESTION_TABLE)
                .await
                .map_err(map_db_error)?;
            Ok(globals
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
        let client = self.client.clone();
        Box::pin(async move {
            let globals: Vec<GlobalQuestion> = client
                .select(GLOBAL_QUESTION_TABLE)
                .await
                .map_err(map_db_error)?;
            Ok(globals
                .into_iter()
                .filter(|global| !except_ids.contains(&global.global_question_id))
                .filter(|global| categories.is_empty() || categories.contains(&global.category_id))
                .collect())
        })
    }
}

#[derive(Clone)]
pub struct SurrealQuestionRepository {
    client: Surreal<Client>,
}

impl SurrealQuestionRepository {
    pub fn with_client(client: Surreal<Client>) -> Self {
        Self { client }
    }
}

impl QuestionRepository for SurrealQuestionRepository {
    fn create(&self, question: &Question) -> BoxFuture<'_, DomainResult<Question>> {
        let question = question.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let created: Option<Question> = client
                .create((QUESTION_TABLE, question.question_id.clone()))
                .content(question.clone())
                .await
                .map_err(map_db_error)?;
            Ok(created.unwrap_or(question))
        })
    }

    fn get(&self, question_id: &str) -> BoxFuture<'_, DomainResult<Option<Question>>> {
        let question_id = question_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            client
                .select((QUESTION_TABLE, question_id))
                .await
                .map_err(map_db_error)
        })
    }

    fn update(
        &self,
        question_id: &str,
        question: &Question,
    ) -> BoxFuture<'_, DomainResult<Question>> {
        let question_id = question_id.to_string();
        let question = question.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let updated: Option<Question> = client
                .update((QUESTION_TABLE, question_id))
                .content(question)
                .await
                .map_err(map_db_error)?;
            updated.ok_or(DomainError::NotFound)
        })
    }

    fn list_for_user(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Vec<Question>>> {
        let user_id = user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            let mut response = client
                .query("SELECT * FROM type::table($table) WHERE user_id = $user_id")
                .bind(("table", QUESTION_TABLE))
                .bind(("user_id", user_id))
                .await
                .map_err(map_db_error)?;
            response.take(0).map_err(map_db_error)
        })
    }
}

#[derive(Clone)]
pub struct SurrealNotificationSettingsRepository {
    client: Surreal<Client>,
}

impl SurrealNotificationSettingsRepository {
    pub fn with_client(client: Surreal<Client>) -> Self {
        Self { client }
    }
}

impl NotificationSettingsRepository for SurrealNotificationSettingsRepository {
    fn upsert(
        &self,
        settings: &NotificationSettings,
    ) -> BoxFuture<'_, DomainResult<NotificationSettings>> {
        let settings = settings.clone();
        let client = self.client.clone();
        Box::pin(async move {
            let stored: Option<NotificationSettings> = client
                .upsert((NOTIFICATION_SETTINGS_TABLE, settings.user_id.clone()))
                .content(settings.clone())
                .await
                .map_err(map_db_error)?;
            Ok(stored.unwrap_or(settings))
        })
    }

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<NotificationSettings>>> {
        let user_id = user_id.to_string();
        let client = self.client.clone();
        Box::pin(async move {
            client
                .select((NOTIFICATION_SETTINGS_TABLE, user_id))
                .await
                .map_err(map_db_error)
        })
    }
}
