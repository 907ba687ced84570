//! Telegram 模式下的输入源
//!
//! 机器人前端没有交互式提问的机会，凭据都随 /run 命令一次性给全。
//! 这里维护一张提示语到回答的映射，作为运行中途要输入时的兜底

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::warn;

use crate::error::Result;
use crate::ports::CredentialSource;

/// 预置回答的输入源
#[derive(Default)]
pub struct TelegramInput {
    responses: Mutex<HashMap<String, String>>,
}

impl TelegramInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为某条提示语预置回答
    pub fn set_response(&self, prompt: impl Into<String>, value: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .insert(prompt.into(), value.into());
    }
}

#[async_trait]
impl CredentialSource for TelegramInput {
    async fn get_value(&self, prompt: &str) -> Result<String> {
        if let Some(value) = self.responses.lock().unwrap().get(prompt) {
            return Ok(value.clone());
        }

        warn!("没有为提示语预置回答: {}", prompt);
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_preset_response() {
        let input = TelegramInput::new();
        input.set_response("请输入要学习的科目:", "Algebra");

        let value = input.get_value("请输入要学习的科目:").await.unwrap();
        assert_eq!(value, "Algebra");
    }

    #[tokio::test]
    async fn test_missing_response_is_empty() {
        let input = TelegramInput::new();
        let value = input.get_value("没有预置的提示").await.unwrap();
        assert!(value.is_empty());
    }
}
