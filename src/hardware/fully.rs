//! Fully Kiosk Browser REST bridge

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::HardwareBridge;
use crate::{Error, Result};

/// Reply to a Fully Kiosk command
#[derive(Debug, Deserialize)]
struct CommandResponse {
    status: Option<String>,
    statustext: Option<String>,
}

/// Subset of the `deviceInfo` reply we read
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceInfo {
    battery_level: f64,
}

/// Talks to the Fully Kiosk remote admin interface
pub struct FullyKioskBridge {
    client: reqwest::Client,
    base_url: String,
    password: Option<SecretString>,
}

impl FullyKioskBridge {
    /// Create a bridge for a kiosk at `base_url` (e.g. `http://tablet:2323`)
    #[must_use]
    pub fn new(base_url: impl Into<String>, password: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            password,
        }
    }

    /// Issue a remote-admin command
    async fn send(&self, cmd: &str, extra: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut query: Vec<(&str, &str)> = vec![("cmd", cmd), ("type", "json")];
        if let Some(password) = &self.password {
            query.push(("password", password.expose_secret()));
        }
        query.extend_from_slice(extra);

        let response = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(kiosk_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Hardware(format!("kiosk returned {status} for {cmd}")));
        }

        Ok(response)
    }

    /// Issue a command and check the kiosk accepted it
    async fn command(&self, cmd: &str, extra: &[(&str, &str)]) -> Result<()> {
        let response = self.send(cmd, extra).await?;
        let body: CommandResponse = response.json().await.map_err(kiosk_error)?;

        if body
            .status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        {
            return Err(Error::Hardware(
                body.statustext.unwrap_or_else(|| format!("{cmd} rejected")),
            ));
        }

        tracing::debug!(cmd, "kiosk command accepted");
        Ok(())
    }
}

/// The request URL carries the password, so it never reaches the error
fn kiosk_error(e: reqwest::Error) -> Error {
    Error::Hardware(format!("kiosk request failed: {}", e.without_url()))
}

#[async_trait]
impl HardwareBridge for FullyKioskBridge {
    async fn turn_screen_off(&self) -> Result<()> {
        self.command("screenOff", &[]).await
    }

    async fn set_screen_brightness(&self, level: u8) -> Result<()> {
        let value = level.to_string();
        self.command(
            "setStringSetting",
            &[("key", "screenBrightness"), ("value", &value)],
        )
        .await
    }

    async fn reload(&self) -> Result<()> {
        self.command("loadStartURL", &[]).await
    }

    async fn battery_level(&self) -> Result<u8> {
        let info: DeviceInfo = self
            .send("deviceInfo", &[])
            .await?
            .json()
            .await
            .map_err(kiosk_error)?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let level = info.battery_level.round().clamp(0.0, 100.0) as u8;
        Ok(level)
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::hardware::HardwareCommand;

    #[tokio::test]
    async fn test_brightness_request_shape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "setStringSetting"))
            .and(query_param("key", "screenBrightness"))
            .and(query_param("value", "255"))
            .and(query_param("password", "hunter2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "OK"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let bridge = FullyKioskBridge::new(server.uri(), Some(SecretString::from("hunter2")));
        bridge
            .apply(HardwareCommand::SetBrightness(255))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rejected_command_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "screenOff"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "Error",
                "statustext": "Please enter password"
            })))
            .mount(&server)
            .await;

        let bridge = FullyKioskBridge::new(server.uri(), None);
        let err = bridge.turn_screen_off().await.unwrap_err();
        assert!(err.to_string().contains("Please enter password"));
    }

    #[tokio::test]
    async fn test_battery_level() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "deviceInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "batteryLevel": 87,
                "isPlugged": true
            })))
            .mount(&server)
            .await;

        let bridge = FullyKioskBridge::new(format!("{}/", server.uri()), None);
        assert_eq!(bridge.battery_level().await.unwrap(), 87);
    }

    #[tokio::test]
    async fn test_connection_refused_hides_password() {
        let bridge =
            FullyKioskBridge::new("http://127.0.0.1:9", Some(SecretString::from("hunter2")));

        let err = bridge.turn_screen_off().await.unwrap_err();
        assert!(matches!(err, Error::Hardware(_)));
        assert!(!err.to_string().contains("hunter2"));

        let err = bridge.battery_level().await.unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_malformed_reply_hides_password() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("cmd", "deviceInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let bridge = FullyKioskBridge::new(server.uri(), Some(SecretString::from("hunter2")));
        let err = bridge.battery_level().await.unwrap_err();
        assert!(!err.to_string().contains("hunter2"));
    }
}
