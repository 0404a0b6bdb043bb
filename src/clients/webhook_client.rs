/// 通知 Webhook 客户端
///
/// 把每条通知以 JSON POST 到配置的地址，由外部系统负责真正投递
use crate::config::Config;
use crate::services::notification::{DeliveryError, FlagNotification, Notifier};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Webhook 通知发送器
pub struct WebhookNotifier {
    client: Client,
    endpoint: String,
}

impl WebhookNotifier {
    /// 创建新的 Webhook 客户端
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    /// 按配置创建，未配置地址时返回 None
    pub fn from_config(config: &Config) -> Option<Self> {
        config.notify_webhook_url.as_deref().map(Self::new)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &FlagNotification) -> Result<(), DeliveryError> {
        let recipient_id = notification.recipient_id;
        debug!(
            "POST {} -> 用户 {} ({:?})",
            self.endpoint, recipient_id, notification.kind
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(notification)
            .send()
            .await
            .map_err(|e| DeliveryError::Transport {
                recipient_id,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Rejected {
                recipient_id,
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}
