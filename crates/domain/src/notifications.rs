use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::DomainResult;
use crate::error::DomainError;
use crate::ports::email::EmailSender;
use crate::ports::notifications::NotificationSettingsRepository;
use crate::util::now_ms;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_TELEGRAM_NAME_LENGTH: usize = 64;
const MAX_PERIOD_IN_DAYS: i64 = 365;

/// Reminder delivery preferences, keyed by the owning user. The scheduler that
/// consumes these lives outside this codebase; here they are only stored.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NotificationSettings {
    pub user_id: String,
    pub email: String,
    pub telegram_name: String,
    pub period_in_days: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug)]
pub struct NotificationSettingsInput {
    pub email: String,
    pub telegram_name: String,
    pub period_in_days: i64,
}

#[derive(Clone, Debug)]
pub struct SavedNotificationSettings {
    pub settings: NotificationSettings,
    /// Outcome of the confirmation email, reported but never retried.
    pub email_sent: bool,
}

#[derive(Clone)]
pub struct NotificationService {
    repository: Arc<dyn NotificationSettingsRepository>,
    email: Arc<dyn EmailSender>,
    public_app_url: String,
}

impl NotificationService {
    pub fn new(
        repository: Arc<dyn NotificationSettingsRepository>,
        email: Arc<dyn EmailSender>,
        public_app_url: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            email,
            public_app_url: public_app_url.into(),
        }
    }

    /// Upserts the settings, then sends a confirmation email describing the
    /// chosen cadence. The email is fire-and-forget: its boolean outcome is
    /// surfaced for logging and nothing else.
    pub async fn save(
        &self,
        user_id: &str,
        input: NotificationSettingsInput,
    ) -> DomainResult<SavedNotificationSettings> {
        let input = validate_settings_input(&input)?;
        let settings = NotificationSettings {
            user_id: user_id.to_string(),
            email: input.email,
            telegram_name: input.telegram_name,
            period_in_days: input.period_in_days,
            updated_at_ms: now_ms(),
        };
        let settings = self.repository.upsert(&settings).await?;

        let message = confirmation_message(&settings, &self.public_app_url);
        let email_sent = self.email.send_message(&settings.email, &message).await;

        Ok(SavedNotificationSettings {
            settings,
            email_sent,
        })
    }

    pub async fn get(&self, user_id: &str) -> DomainResult<Option<NotificationSettings>> {
        self.repository.get(user_id).await
    }
}

fn confirmation_message(settings: &NotificationSettings, public_app_url: &str) -> String {
    format!(
        "<div>Hello, {email}! You will now receive reminders at this address every {period} days.</div>\
         <div>If you want to stop receiving them, go to <a>{url}</a> and turn them off.</div>",
        email = settings.email,
        period = settings.period_in_days,
        url = public_app_url,
    )
}

fn validate_settings_input(
    input: &NotificationSettingsInput,
) -> Result<NotificationSettingsInput, DomainError> {
    let email = input.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(DomainError::Validation("a valid email is required".into()));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(DomainError::Validation(format!(
            "email exceeds max length of {MAX_EMAIL_LENGTH}"
        )));
    }

    let telegram_name = input.telegram_name.trim().trim_start_matches('@');
    if telegram_name.chars().count() > MAX_TELEGRAM_NAME_LENGTH {
        return Err(DomainError::Validation(format!(
            "telegram name exceeds max length of {MAX_TELEGRAM_NAME_LENGTH}"
        )));
    }

    if input.period_in_days < 1 || input.period_in_days > MAX_PERIOD_IN_DAYS {
        return Err(DomainError::Validation(format!(
            "period_in_days must be between 1 and {MAX_PERIOD_IN_DAYS}"
        )));
    }

    Ok(NotificationSettingsInput {
        email: email.to_string(),
        telegram_name: telegram_name.to_string(),
        period_in_days: input.period_in_days,
    })
}
