use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::application::usecases::auth::MailSender;

/// Stand-in mail sender: emits the reset link to the log instead of
/// delivering it. Swap for a real provider client behind the same trait.
pub struct LogMailSender {
    frontend_url: String,
}

impl LogMailSender {
    pub fn new(frontend_url: String) -> Self {
        Self { frontend_url }
    }
}

#[async_trait]
impl MailSender for LogMailSender {
    async fn send_password_reset(&self, to: &str, token: &str) -> Result<()> {
        info!(
            recipient = %to,
            reset_link = %format!("{}/redefinir-senha?token={}", self.frontend_url, token),
            "mail: password reset link issued"
        );
        Ok(())
    }
}
