use std::time::Duration;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub endpoint: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl DbConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            endpoint: config.surreal_endpoint.clone(),
            namespace: config.surreal_ns.clone(),
            database: config.surreal_db.clone(),
            username: config.surreal_user.clone(),
            password: config.surreal_pass.clone(),
        }
    }

    /// Cheap reachability probe: a bounded TCP connect to the endpoint,
    /// without standing up a full client session.
    pub async fn health_check(&self) -> Result<(), DbError> {
        let address = parse_socket_address(&self.endpoint)?;
        let connect = timeout(Duration::from_secs(2), TcpStream::connect(&address))
            .await
            .map_err(|_| DbError::Unavailable("surreal endpoint connect timed out".to_string()))?;
        connect
            .map_err(|err| DbError::Unavailable(format!("surreal endpoint connect failed: {err}")))?;

        tracing::debug!(
            endpoint = %self.endpoint,
            namespace = %self.namespace,
            database = %self.database,
            "surreal health check succeeded"
        );
        Ok(())
    }

    pub async fn connect(&self) -> anyhow::Result<Surreal<Client>> {
        let endpoint = self
            .endpoint
            .trim_start_matches("ws://")
            .trim_start_matches("wss://")
            .to_string();
        let client = Surreal::new::<Ws>(endpoint).await?;
        client
            .signin(Root {
                username: &self.username,
                password: &self.password,
            })
            .await?;
        client
            .use_ns(self.namespace.clone())
            .use_db(self.database.clone())
            .await?;
        Ok(client)
    }
}

fn parse_socket_address(endpoint: &str) -> Result<String, DbError> {
    let normalized = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("ws://{endpoint}")
    };
    let parsed = Url::parse(&normalized)
        .map_err(|err| DbError::Unavailable(format!("invalid surreal endpoint '{endpoint}': {err}")))?;

    let scheme = parsed.scheme();
    let host = parsed.host_str().ok_or_else(|| {
        DbError::Unavailable(format!("missing surreal host in endpoint '{endpoint}'"))
    })?;
    let port = parsed.port_or_known_default().unwrap_or(match scheme {
        "wss" | "https" => 443,
        _ => 8000,
    });
    Ok(format!("{host}:{port}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_address_defaults_ws_port() {
        assert_eq!(
            parse_socket_address("ws://127.0.0.1:8000").expect("parse"),
            "127.0.0.1:8000"
        );
        assert_eq!(
            parse_socket_address("db.internal").expect("parse"),
            "db.internal:8000"
        );
    }

    #[test]
    fn socket_address_rejects_garbage() {
        assert!(parse_socket_address("ws://").is_err());
    }
}
