//! Rig agents as extraction models.

use async_trait::async_trait;
use rig::completion::{Prompt, PromptError};

use super::model::LanguageModel;

/// Adapts any Rig [`Prompt`] implementor (an agent built from a Rig
/// provider client) into a [`LanguageModel`].
///
/// ```no_run
/// # use promptfit_core::extraction::{RigModel, StructuredExtractor};
/// # use promptfit_core::SchemaNode;
/// # async fn example<P: rig::completion::Prompt + Send + Sync>(agent: P) -> Result<(), Box<dyn std::error::Error>> {
/// let model = RigModel::new(agent);
/// let extractor = StructuredExtractor::new(SchemaNode::object([("title", SchemaNode::String)]));
/// let value = extractor.extract(&model, "Name this report").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RigModel<P> {
    inner: P,
}

impl<P> RigModel<P> {
    /// Wraps a Rig agent.
    #[must_use]
    pub const fn new(inner: P) -> Self {
        Self { inner }
    }

    /// Returns the wrapped agent.
    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<P> LanguageModel for RigModel<P>
where
    P: Prompt + Send + Sync,
{
    type Error = PromptError;

    async fn invoke(&self, prompt: &str) -> Result<String, PromptError> {
        self.inner.prompt(prompt.to_owned()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractionError, StructuredExtractor};
    use crate::SchemaNode;
    use rig::agent::AgentBuilder;
    use rig::completion::{
        message::AssistantContent, CompletionError, CompletionModel, CompletionRequest,
        CompletionResponse, Usage,
    };
    use rig::streaming::StreamingCompletionResponse;
    use rig::OneOrMany;

    /// Completion model that answers every request with a fixed reply.
    #[derive(Clone)]
    struct CannedModel {
        reply: Result<String, String>,
    }

    impl CompletionModel for CannedModel {
        type Response = String;
        type StreamingResponse = ();
        type Client = ();

        fn make(_client: &Self::Client, _model: impl Into<String>) -> Self {
            Self {
                reply: Ok(String::new()),
            }
        }

        async fn completion(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse<Self::Response>, CompletionError> {
            let text = self.reply.clone().map_err(CompletionError::ProviderError)?;
            Ok(CompletionResponse {
                choice: OneOrMany::one(AssistantContent::text(text.clone())),
                usage: Usage::default(),
                raw_response: text,
            })
        }

        async fn stream(
            &self,
            _request: CompletionRequest,
        ) -> Result<StreamingCompletionResponse<Self::StreamingResponse>, CompletionError> {
            Err(CompletionError::ProviderError("streaming unsupported".to_string()))
        }
    }

    fn agent_model(reply: Result<&str, &str>) -> RigModel<rig::agent::Agent<CannedModel>> {
        let model = CannedModel {
            reply: reply.map(str::to_string).map_err(str::to_string),
        };
        RigModel::new(AgentBuilder::new(model).build())
    }

    fn schema() -> SchemaNode {
        SchemaNode::object([("title", SchemaNode::String), ("score", SchemaNode::Number)])
    }

    #[tokio::test]
    async fn test_agent_reply_passed_through() {
        let model = agent_model(Ok("plain reply"));
        assert_eq!(model.invoke("hello").await.unwrap(), "plain reply");
    }

    #[tokio::test]
    async fn test_extracts_through_agent() {
        let model = agent_model(Ok("Here you go:\n```json\n{\"title\": \"t\", \"score\": 4}\n```"));
        let value = StructuredExtractor::new(schema())
            .extract(&model, "Rate this")
            .await
            .unwrap();
        assert_eq!(value["title"], "t");
        assert_eq!(value["score"], 4);
    }

    #[tokio::test]
    async fn test_provider_error_surfaces_as_model_error() {
        let model = agent_model(Err("quota exceeded"));
        let error = StructuredExtractor::new(schema())
            .extract(&model, "Rate this")
            .await
            .unwrap_err();
        assert!(error.is_model_error());
        match error {
            ExtractionError::Model(PromptError::CompletionError(CompletionError::ProviderError(
                message,
            ))) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
