//! `code` (tool): generates or reviews code for `settings.language` without
//! executing it. Running untrusted, model-authored code needs a sandbox this
//! system doesn't provide (§1 Non-goals), so this handler treats "code" as a
//! text-generation task like any other tool and leaves execution to whatever
//! consumes `tool_outputs.calculations["code"]` downstream.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use weave_engine::{AgentError, AgentHandler, AgentRequest, AgentResult};
use weave_gateway::{Message, ModelGateway};

use crate::support::{chat_text, settings_str_or};

pub struct CodeHandler {
    gateway: Arc<dyn ModelGateway>,
}

impl CodeHandler {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AgentHandler for CodeHandler {
    async fn execute(&self, request: AgentRequest) -> Result<AgentResult, AgentError> {
        let language = settings_str_or(&request.settings, "language", "python");
        let prompt = format!(
            "Write {language} code for the following request. Reply with the code only:\n\n{}",
            request.user_message
        );

        let code = chat_text(self.gateway.as_ref(), request.model_class, &[Message::user(prompt)]).await?;

        let mut result = AgentResult::text(code.clone());
        result.tool_outputs.calculations = Some(json!({ "language": language, "code": code }));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weave_gateway::MockGateway;

    #[tokio::test]
    async fn records_generated_code_in_tool_outputs() {
        let gateway: Arc<dyn ModelGateway> = Arc::new(MockGateway::with_reply("print('hi')"));
        let handler = CodeHandler::new(gateway);

        let request = AgentRequest {
            node_id: "code".into(),
            user_message: "print hi".into(),
            context: HashMap::new(),
            settings: serde_json::json!({ "language": "python" }),
            model_class: weave_gateway::ModelClass::Large,
        };

        let result = handler.execute(request).await.unwrap();
        assert_eq!(result.content, "print('hi')");
        let calc = result.tool_outputs.calculations.unwrap();
        assert_eq!(calc["language"], "python");
    }
}
