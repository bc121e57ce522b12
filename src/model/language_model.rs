use std::{sync::Arc, time::Duration};

use ragdesk_macros::{async_behavior, thread_safe};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Provider, Result},
    model::{
        api::{OllamaClient, OllamaLangModel},
        custom::{CustomLangModel, CustomLangModelInferFunc},
    },
    value::{Message, ToolDesc},
};

/// Sampling parameters passed with every completion request.
///
/// `None` leaves the backend default in place.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[thread_safe]
#[async_behavior]
pub trait LangModelInference {
    /// Runs the model over `msgs` with `tools` declared, returning one Assistant message.
    async fn infer(
        &self,
        msgs: Vec<Message>,
        tools: Vec<ToolDesc>,
        config: InferenceConfig,
    ) -> Result<Message>;
}

#[derive(Clone)]
enum LangModelInner {
    Ollama(OllamaLangModel),
    Custom(CustomLangModel),
}

#[derive(Clone)]
pub struct LangModel {
    inner: LangModelInner,
    timeout: Option<Duration>,
}

impl LangModel {
    pub fn new_ollama(client: OllamaClient, model: impl Into<String>) -> Self {
        Self {
            inner: LangModelInner::Ollama(OllamaLangModel::new(client, model)),
            timeout: None,
        }
    }

    pub fn new_custom(f: Arc<CustomLangModelInferFunc>) -> Self {
        Self {
            inner: LangModelInner::Custom(CustomLangModel { infer_func: f }),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_behavior]
impl LangModelInference for LangModel {
    async fn infer(
        &self,
        msgs: Vec<Message>,
        tools: Vec<ToolDesc>,
        config: InferenceConfig,
    ) -> Result<Message> {
        let fut = match &self.inner {
            LangModelInner::Ollama(model) => model.infer(msgs, tools, config),
            LangModelInner::Custom(model) => model.infer(msgs, tools, config),
        };
        match self.timeout {
            Some(after) => tokio::time::timeout(after, fut)
                .await
                .map_err(|_| Error::ProviderTimeout {
                    provider: Provider::Completion,
                    after,
                })?,
            None => fut.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use ragdesk_macros::logged_test;

    use super::*;
    use crate::utils::BoxFuture;

    #[test]
    fn config_omits_unset_fields() {
        let config = InferenceConfig {
            temperature: Some(0.0),
            max_tokens: None,
        };
        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({"temperature": 0.0})
        );
    }

    #[logged_test]
    async fn custom_model_receives_history_and_tools() -> anyhow::Result<()> {
        let model = LangModel::new_custom(Arc::new(
            |msgs: Vec<Message>,
             tools: Vec<ToolDesc>,
             _config: InferenceConfig|
             -> BoxFuture<'static, Result<Message>> {
                Box::pin(async move {
                    Ok(Message::assistant(format!(
                        "{} messages, {} tools",
                        msgs.len(),
                        tools.len()
                    )))
                })
            },
        ));
        let out = model
            .infer(
                vec![Message::system("s"), Message::user("u")],
                vec![],
                InferenceConfig::default(),
            )
            .await?;
        assert_eq!(out.text(), "2 messages, 0 tools");
        Ok(())
    }

    #[logged_test]
    async fn hung_backend_surfaces_provider_timeout() -> anyhow::Result<()> {
        let model = LangModel::new_custom(Arc::new(
            |_: Vec<Message>, _: Vec<ToolDesc>, _: InferenceConfig| -> BoxFuture<'static, Result<Message>> {
                Box::pin(async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(Message::assistant("late"))
                })
            },
        ))
        .with_timeout(Duration::from_millis(20));

        let err = model
            .infer(vec![Message::user("hi")], vec![], InferenceConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ProviderTimeout {
                provider: Provider::Completion,
                ..
            }
        ));
        assert!(err.is_provider_failure());
        Ok(())
    }
}
