use std::sync::Arc;

use memoir_domain::ports::email::EmailSender;
use memoir_domain::ports::notifications::NotificationSettingsRepository;
use memoir_domain::ports::questions::{GlobalQuestionRepository, QuestionRepository};
use memoir_infra::config::AppConfig;
use memoir_infra::db::DbConfig;
use memoir_infra::email::{NoopEmailSender, SmtpEmailSender};
use memoir_infra::repositories::{
    InMemoryGlobalQuestionRepository, InMemoryNotificationSettingsRepository,
    InMemoryQuestionRepository, SurrealGlobalQuestionRepository,
    SurrealNotificationSettingsRepository, SurrealQuestionRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub global_question_repo: Arc<dyn GlobalQuestionRepository>,
    pub question_repo: Arc<dyn QuestionRepository>,
    pub notification_settings_repo: Arc<dyn NotificationSettingsRepository>,
    pub email_sender: Arc<dyn EmailSender>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let email_sender: Arc<dyn EmailSender> = if config.email_enabled {
            Arc::new(SmtpEmailSender::from_config(&config)?)
        } else {
            Arc::new(NoopEmailSender)
        };

        if config.uses_surreal_backend() {
            let db_config = DbConfig::from_app_config(&config);
            db_config.health_check().await?;
            let client = db_config.connect().await?;
            return Ok(Self {
                config,
                global_question_repo: Arc::new(SurrealGlobalQuestionRepository::with_client(
                    client.clone(),
                )),
                question_repo: Arc::new(SurrealQuestionRepository::with_client(client.clone())),
                notification_settings_repo: Arc::new(
                    SurrealNotificationSettingsRepository::with_client(client),
                ),
                email_sender,
            });
        }

        Ok(Self::with_repositories(
            config,
            Arc::new(InMemoryGlobalQuestionRepository::default()),
            Arc::new(InMemoryQuestionRepository::default()),
            Arc::new(InMemoryNotificationSettingsRepository::default()),
            email_sender,
        ))
    }

    pub fn with_repositories(
        config: AppConfig,
        global_question_repo: Arc<dyn GlobalQuestionRepository>,
        question_repo: Arc<dyn QuestionRepository>,
        notification_settings_repo: Arc<dyn NotificationSettingsRepository>,
        email_sender: Arc<dyn EmailSender>,
    ) -> Self {
        Self {
            config,
            global_question_repo,
            question_repo,
            notification_settings_repo,
            email_sender,
        }
    }
}
