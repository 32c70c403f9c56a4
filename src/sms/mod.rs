//! OTP delivery through the Twilio Verify API.
//!
//! The server never sees or stores the code: Verify generates it, sends
//! the SMS, and checks the user's answer. Without credentials in the
//! config the client is inert and the OTP endpoints report 503.

use serde::Deserialize;
use thiserror::Error;

use crate::config::SmsConfig;

const TWILIO_VERIFY_URL: &str = "https://verify.twilio.com/v2/Services";

#[derive(Debug, Error)]
pub enum SmsError {
    #[error("SMS client is not configured")]
    NotConfigured,
    #[error("verification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("verification provider returned {0}")]
    Provider(reqwest::StatusCode),
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
}

#[derive(Clone)]
pub struct SmsClient {
    credentials: Option<Credentials>,
    http: reqwest::Client,
}

#[derive(Clone)]
struct Credentials {
    account_sid: String,
    auth_token: String,
    service_sid: String,
}

impl SmsClient {
    pub fn new(config: &SmsConfig) -> Self {
        let credentials = match (&config.account_sid, &config.auth_token, &config.verify_service_sid)
        {
            (Some(account_sid), Some(auth_token), Some(service_sid)) => Some(Credentials {
                account_sid: account_sid.clone(),
                auth_token: auth_token.clone(),
                service_sid: service_sid.clone(),
            }),
            _ => {
                tracing::warn!("SMS credentials not configured, OTP endpoints disabled");
                None
            }
        };

        Self {
            credentials,
            http: reqwest::Client::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Ask Verify to send a code to the given number
    pub async fn start_verification(&self, phone_number: &str) -> Result<(), SmsError> {
        let creds = self.credentials.as_ref().ok_or(SmsError::NotConfigured)?;

        let url = format!("{}/{}/Verifications", TWILIO_VERIFY_URL, creds.service_sid);
        let response = self
            .http
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&[("To", phone_number), ("Channel", "sms")])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "Verification start failed");
            return Err(SmsError::Provider(status));
        }

        Ok(())
    }

    /// Check a code the user typed in. Returns true on a match.
    pub async fn check_verification(&self, phone_number: &str, code: &str) -> Result<bool, SmsError> {
        let creds = self.credentials.as_ref().ok_or(SmsError::NotConfigured)?;

        let url = format!("{}/{}/VerificationCheck", TWILIO_VERIFY_URL, creds.service_sid);
        let response = self
            .http
            .post(&url)
            .basic_auth(&creds.account_sid, Some(&creds.auth_token))
            .form(&[("To", phone_number), ("Code", code)])
            .send()
            .await?;

        if !response.status().is_success() {
            // Twilio answers 404 for expired or never-started verifications
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(false);
            }
            return Err(SmsError::Provider(response.status()));
        }

        let body: VerificationResponse = response.json().await?;
        Ok(body.status == "approved")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_client() {
        let client = SmsClient::new(&SmsConfig::default());
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_start_fails() {
        let client = SmsClient::new(&SmsConfig::default());
        assert!(matches!(
            client.start_verification("+919876543210").await,
            Err(SmsError::NotConfigured)
        ));
    }

    #[test]
    fn test_configured_client() {
        let client = SmsClient::new(&SmsConfig {
            account_sid: Some("AC123".to_string()),
            auth_token: Some("secret".to_string()),
            verify_service_sid: Some("VA123".to_string()),
        });
        assert!(client.is_configured());
    }
}
