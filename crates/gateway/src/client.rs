use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::dto::{
    AddQuestionRequest, AnswerRequest, CreateGlobalQuestionRequest, GlobalQuestion,
    GlobalQuestions, NotificationSettings, Question, Questions, RefreshRequest, RefreshResponse,
};
use crate::outcome::GatewayOutcome;
use crate::tokens::{TokenPair, TokenStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Invoked when a call cannot be recovered by a token refresh. Hosts
/// usually route the user back to the sign-in screen.
pub trait ReauthHandler: Send + Sync {
    fn reauth_required(&self);
}

pub struct GatewayClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenStore>,
    reauth: Arc<dyn ReauthHandler>,
}

impl GatewayClient {
    pub fn new(
        base_url: impl Into<String>,
        reauth: Arc<dyn ReauthHandler>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Arc::new(TokenStore::default()),
            reauth,
        })
    }

    pub fn tokens(&self) -> Arc<TokenStore> {
        self.tokens.clone()
    }

    /// Store the pair obtained at sign-in; subsequent calls attach its
    /// access token and refresh through its refresh token.
    pub async fn set_tokens(&self, pair: TokenPair) {
        self.tokens.set_pair(pair).await;
    }

    pub async fn get_new_question(&self, user_id: &str) -> GatewayOutcome<Question> {
        self.get_json("/questions/new", &[("userId", user_id.to_string())])
            .await
    }

    pub async fn get_all_questions(&self, user_id: &str) -> GatewayOutcome<Questions> {
        self.get_json("/questions", &[("userId", user_id.to_string())])
            .await
    }

    pub async fn get_global_questions(
        &self,
        user_id: Option<&str>,
        categories: &[&str],
    ) -> GatewayOutcome<GlobalQuestions> {
        let mut query = Vec::new();
        if let Some(user_id) = user_id {
            query.push(("userId", user_id.to_string()));
        }
        if !categories.is_empty() {
            query.push(("categories", categories.join(",")));
        }
        self.get_json("/questions/global", &query).await
    }

    pub async fn add_question(&self, user_id: &str, title: &str) -> GatewayOutcome<Question> {
        let request = AddQuestionRequest {
            user_id: user_id.to_string(),
            title: title.to_string(),
        };
        self.send_json(Method::POST, "/questions/new", &request)
            .await
    }

    pub async fn give_answer(
        &self,
        question_id: &str,
        request: &AnswerRequest,
    ) -> GatewayOutcome<Question> {
        self.send_json(
            Method::PATCH,
            &format!("/questions/{question_id}"),
            request,
        )
        .await
    }

    pub async fn create_global_question(
        &self,
        request: &CreateGlobalQuestionRequest,
    ) -> GatewayOutcome<GlobalQuestion> {
        self.send_json(Method::POST, "/questions/newGlobalQuestion", request)
            .await
    }

    pub async fn save_notification_settings(
        &self,
        user_id: &str,
        settings: &NotificationSettings,
    ) -> GatewayOutcome<NotificationSettings> {
        self.send_json(
            Method::POST,
            &format!("/notifications/settings/{user_id}"),
            settings,
        )
        .await
    }

    pub async fn get_notification_settings(
        &self,
        user_id: &str,
    ) -> GatewayOutcome<Option<NotificationSettings>> {
        self.get_json(&format!("/notifications/settings/{user_id}"), &[])
            .await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> GatewayOutcome<T> {
        self.execute(Method::GET, path, query, None::<&()>).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> GatewayOutcome<T> {
        self.execute(method, path, &[], Some(body)).await
    }

    /// One attempt, plus at most one replay after a successful refresh.
    async fn execute<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> GatewayOutcome<T> {
        let token = self.tokens.access_token().await;
        let response = match self.send(method.clone(), path, query, body, token).await {
            Ok(response) => response,
            Err(reason) => return GatewayOutcome::NetworkError(reason),
        };

        if response.status() != StatusCode::UNAUTHORIZED {
            return conclude(response).await;
        }

        if !self.refresh().await {
            self.reauth.reauth_required();
            return GatewayOutcome::Unauthorized;
        }

        let token = self.tokens.access_token().await;
        match self.send(method, path, query, body, token).await {
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                self.tokens.clear().await;
                self.reauth.reauth_required();
                GatewayOutcome::Unauthorized
            }
            Ok(response) => conclude(response).await,
            Err(reason) => GatewayOutcome::NetworkError(reason),
        }
    }

    async fn send<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        token: Option<String>,
    ) -> Result<Response, String> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.http.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|err| err.to_string())
    }

    /// Exchange the stored pair for a fresh one. Any failure clears the
    /// store so the next call does not retry a dead refresh token.
    async fn refresh(&self) -> bool {
        let Some(pair) = self.tokens.pair().await else {
            return false;
        };

        let url = format!("{}/auth/refresh", self.base_url);
        let request = RefreshRequest {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        };

        let response = match self.http.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, "token refresh request failed");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "token refresh rejected");
            self.tokens.clear().await;
            return false;
        }

        match response.json::<RefreshResponse>().await {
            Ok(refreshed) => {
                self.tokens
                    .set_pair(TokenPair {
                        access_token: refreshed.access_token,
                        refresh_token: refreshed.refresh_token,
                    })
                    .await;
                true
            }
            Err(err) => {
                tracing::debug!(error = %err, "token refresh returned an unreadable body");
                self.tokens.clear().await;
                false
            }
        }
    }
}

async fn conclude<T: DeserializeOwned>(response: Response) -> GatewayOutcome<T> {
    let status = response.status();
    if !status.is_success() {
        return GatewayOutcome::ServerError(status.as_u16());
    }
    match response.json::<T>().await {
        Ok(value) => GatewayOutcome::Success(value),
        Err(err) => GatewayOutcome::NetworkError(format!("unreadable response body: {err}")),
    }
}
