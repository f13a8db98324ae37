use crate::{ArmCommand, BaseCommand, CommandReply, JointTelemetry, StatusTelemetry};
use async_trait::async_trait;
use eyre::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Request/response surface of the remote robot.
#[async_trait]
pub trait RobotEndpoint: Send + Sync {
    /// `GET /api/status`
    async fn fetch_status(&self) -> Result<StatusTelemetry>;

    /// `GET /api/joint_state`
    async fn fetch_joints(&self) -> Result<JointTelemetry>;

    /// `POST /api/base`
    async fn push_base(&self, command: &BaseCommand) -> Result<()>;

    /// `POST /api/arm`
    async fn push_arm(&self, command: &ArmCommand) -> Result<()>;
}

/// JSON-over-HTTP client for the robot's web API.
pub struct HttpRobotEndpoint {
    url: String,
    client: reqwest::Client,
}

impl HttpRobotEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let endpoint = format!("{}{}", self.url, path);

        let response = self
            .client
            .get(&endpoint)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            eyre::bail!("HTTP error from {}: {}", path, response.status());
        }

        Ok(response.json().await?)
    }

    async fn post_command<T: Serialize + Sync>(&self, path: &str, body: &T) -> Result<()> {
        let endpoint = format!("{}{}", self.url, path);

        let response = self
            .client
            .post(&endpoint)
            .header("Accept", "application/json")
            .json(body)
            .send()
            .await?;

        if response.status().is_success() {
            let reply: CommandReply = response.json().await?;
            if !reply.ok {
                eyre::bail!(
                    "Robot rejected {}: {}",
                    path,
                    reply.reason.unwrap_or_else(|| "no reason given".to_string())
                );
            }
        } else {
            eyre::bail!("HTTP error from {}: {}", path, response.status());
        }

        Ok(())
    }
}

#[async_trait]
impl RobotEndpoint for HttpRobotEndpoint {
    async fn fetch_status(&self) -> Result<StatusTelemetry> {
        self.get_json("/api/status").await
    }

    async fn fetch_joints(&self) -> Result<JointTelemetry> {
        self.get_json("/api/joint_state").await
    }

    async fn push_base(&self, command: &BaseCommand) -> Result<()> {
        self.post_command("/api/base", command).await
    }

    async fn push_arm(&self, command: &ArmCommand) -> Result<()> {
        self.post_command("/api/arm", command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let endpoint = HttpRobotEndpoint::new("http://10.0.0.7:8080/");
        assert_eq!(endpoint.url(), "http://10.0.0.7:8080");
    }

    #[tokio::test]
    async fn test_unreachable_robot_is_an_error() {
        // Port 9 (discard) is closed on test machines
        let endpoint = HttpRobotEndpoint::new("http://127.0.0.1:9");
        assert!(endpoint.fetch_status().await.is_err());
        assert!(endpoint.push_base(&BaseCommand::emergency()).await.is_err());
    }
}
