use crate::DomainResult;
use crate::notifications::NotificationSettings;
use crate::ports::BoxFuture;

pub trait NotificationSettingsRepository: Send + Sync {
    fn upsert(
        &self,
        settings: &NotificationSettings,
    ) -> BoxFuture<'_, DomainResult<NotificationSettings>>;

    fn get(&self, user_id: &str) -> BoxFuture<'_, DomainResult<Option<NotificationSettings>>>;
}
