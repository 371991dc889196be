//! Outbound transactional mail for verification and reset codes.

use serde::Serialize;

use crate::config::AppConfig;
use crate::errors::AppError;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";

/// Mail transport selected from configuration.
#[derive(Debug, Clone)]
pub enum Mailer {
    /// Brevo HTTP API.
    Brevo {
        client: reqwest::Client,
        api_key: String,
        sender: String,
    },
    /// Development transport: the message is written to the log.
    Log,
}

#[derive(Debug, Serialize)]
struct BrevoAddress<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoMessage<'a> {
    sender: BrevoAddress<'a>,
    to: Vec<BrevoAddress<'a>>,
    subject: &'a str,
    text_content: &'a str,
}

impl Mailer {
    pub fn from_config(config: &AppConfig) -> Self {
        match &config.brevo_api_key {
            Some(key) => Mailer::Brevo {
                client: reqwest::Client::new(),
                api_key: key.clone(),
                sender: config.email_from.clone(),
            },
            None => {
                tracing::warn!("BREVO_API_KEY not set, OTP mails will only be logged");
                Mailer::Log
            }
        }
    }

    /// Send a plain-text message to a single recipient.
    pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), AppError> {
        match self {
            Mailer::Brevo {
                client,
                api_key,
                sender,
            } => {
                let message = BrevoMessage {
                    sender: BrevoAddress { email: sender },
                    to: vec![BrevoAddress { email: to }],
                    subject,
                    text_content: text,
                };

                let response = client
                    .post(BREVO_SEND_URL)
                    .header("api-key", api_key)
                    .json(&message)
                    .send()
                    .await
                    .map_err(|e| AppError::Internal(format!("Mail delivery failed: {e}")))?;

                if !response.status().is_success() {
                    return Err(AppError::Internal(format!(
                        "Mail API returned {}",
                        response.status()
                    )));
                }

                tracing::info!(recipient = %to, subject, "Mail sent");
                Ok(())
            }
            Mailer::Log => {
                tracing::info!(recipient = %to, subject, body = %text, "Mail not sent (log transport)");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brevo_payload_uses_camel_case() {
        let message = BrevoMessage {
            sender: BrevoAddress {
                email: "no-reply@fintrack.local",
            },
            to: vec![BrevoAddress {
                email: "alice@example.com",
            }],
            subject: "Your Verification OTP",
            text_content: "Your OTP code is 123456",
        };
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["textContent"], "Your OTP code is 123456");
        assert_eq!(json["to"][0]["email"], "alice@example.com");
        assert_eq!(json["sender"]["email"], "no-reply@fintrack.local");
    }

    #[tokio::test]
    async fn log_transport_always_succeeds() {
        assert!(Mailer::Log
            .send("alice@example.com", "subject", "body")
            .await
            .is_ok());
    }
}
