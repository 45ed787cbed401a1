//! Instructed completion units: one instruction profile and an optional tool
//! set wrapped around the hosted model.
//!
//! Tool calling is an explicit loop: send → (tool_use → execute → tool_result
//! → resend)* → final text, bounded by `max_tool_iterations`.

pub mod profiles;
pub mod tools;

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::llm_client::prompts::{EMBEDDED_JSON, MARKDOWN_OUTPUT, TOOL_USE};
use crate::llm_client::{
    CompletionModel, CompletionRequest, ContentBlock, LlmError, Message, Role,
};
pub use profiles::InstructionProfile;
pub use tools::{Tool, ToolRegistry, ToolSet};

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 6;

/// One tool call made while producing a unit's answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInvocation {
    pub tool: String,
    pub input: Value,
    pub output: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitOutput {
    pub unit: &'static str,
    pub text: String,
    pub tool_calls: Vec<ToolInvocation>,
}

/// A failed unit run, with the tool calls that completed before the failure.
#[derive(Debug, Error)]
#[error("{source}")]
pub struct UnitFailure {
    #[source]
    pub source: LlmError,
    pub tool_calls: Vec<ToolInvocation>,
}

pub struct CompletionUnit {
    profile: InstructionProfile,
    model: Arc<dyn CompletionModel>,
    tools: ToolSet,
    max_tool_iterations: usize,
}

impl CompletionUnit {
    pub fn new(
        profile: InstructionProfile,
        model: Arc<dyn CompletionModel>,
        registry: &ToolRegistry,
        max_tool_iterations: usize,
    ) -> Self {
        let tools = registry.select(profile.tools);
        if tools.names().len() != profile.tools.len() {
            warn!(
                "{}: only {:?} of {:?} tools are registered",
                profile.name,
                tools.names(),
                profile.tools
            );
        }
        Self {
            profile,
            model,
            tools,
            max_tool_iterations,
        }
    }

    pub fn name(&self) -> &'static str {
        self.profile.name
    }

    pub fn system_prompt(&self) -> String {
        let mut system = format!(
            "You are {}. Role: {}.\n\n{}\n\n{MARKDOWN_OUTPUT}",
            self.profile.name, self.profile.role, self.profile.instructions
        );
        if self.profile.emits_json {
            system.push(' ');
            system.push_str(EMBEDDED_JSON);
        }
        if !self.tools.is_empty() {
            system.push(' ');
            system.push_str(TOOL_USE);
        }
        system
    }

    /// Runs the unit on a composed prompt and returns its final answer.
    pub async fn run(&self, prompt: &str) -> Result<UnitOutput, UnitFailure> {
        let mut request = CompletionRequest {
            system: self.system_prompt(),
            messages: vec![Message::user_text(prompt)],
            tools: self.tools.specs(),
        };
        let mut tool_calls = Vec::new();

        // Iteration 0 is the initial call; each further one follows a tool round.
        for iteration in 0..=self.max_tool_iterations {
            debug!("{}: model call {}", self.profile.name, iteration + 1);
            let response = match self.model.complete(&request).await {
                Ok(response) => response,
                Err(source) => return Err(UnitFailure { source, tool_calls }),
            };

            let uses: Vec<(String, String, Value)> = response
                .tool_uses()
                .into_iter()
                .map(|(id, name, input)| (id.to_string(), name.to_string(), input.clone()))
                .collect();

            if uses.is_empty() {
                let Some(text) = response.text().filter(|t| !t.trim().is_empty()) else {
                    return Err(UnitFailure {
                        source: LlmError::EmptyContent,
                        tool_calls,
                    });
                };
                info!(
                    "{} finished after {} tool call(s)",
                    self.profile.name,
                    tool_calls.len()
                );
                return Ok(UnitOutput {
                    unit: self.profile.name,
                    text,
                    tool_calls,
                });
            }

            if iteration == self.max_tool_iterations {
                break;
            }

            request.messages.push(Message {
                role: Role::Assistant,
                content: response
                    .content
                    .into_iter()
                    .filter(|b| !matches!(b, ContentBlock::Unsupported))
                    .collect(),
            });

            let mut results = Vec::with_capacity(uses.len());
            for (id, name, input) in uses {
                let (output, is_error) = self.invoke(&name, input.clone()).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    content: output.to_string(),
                    is_error,
                });
                tool_calls.push(ToolInvocation {
                    tool: name,
                    input,
                    output,
                });
            }
            request.messages.push(Message {
                role: Role::User,
                content: results,
            });
        }

        warn!(
            "{}: still requesting tools after {} rounds",
            self.profile.name, self.max_tool_iterations
        );
        Err(UnitFailure {
            source: LlmError::ToolLoopExceeded {
                max: self.max_tool_iterations,
            },
            tool_calls,
        })
    }

    async fn invoke(&self, name: &str, input: Value) -> (Value, bool) {
        match self.tools.get(name) {
            Some(tool) => {
                debug!("{} -> {name}({input})", self.profile.name);
                (tool.call(input).await, false)
            }
            None => {
                warn!("{} requested unknown tool '{name}'", self.profile.name);
                (
                    serde_json::json!({ "error": format!("unknown tool '{name}'") }),
                    true,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::agents::profiles::{JOB_ROLE_ANALYZER, RESUME_AGENT, SALARY_ESTIMATOR_AGENT};
    use crate::agents::tools::ESTIMATE_SALARY;
    use crate::llm_client::{CompletionResponse, Usage};
    use crate::test_support::{FixedModel, ScriptedModel};

    /// Answers with a canned salary record and counts calls.
    struct CannedSalary;

    #[async_trait]
    impl Tool for CannedSalary {
        fn name(&self) -> &'static str {
            ESTIMATE_SALARY
        }
        fn description(&self) -> &'static str {
            "canned"
        }
        fn input_schema(&self) -> Value {
            json!({"type": "object"})
        }
        async fn call(&self, input: Value) -> Value {
            json!({"job_title": input["job_title"], "min": 1000, "max": 2000, "currency": "USD"})
        }
    }

    fn tool_use(id: &str, name: &str, input: Value) -> CompletionResponse {
        CompletionResponse {
            content: vec![
                ContentBlock::Text {
                    text: "Let me check.".to_string(),
                },
                ContentBlock::ToolUse {
                    id: id.to_string(),
                    name: name.to_string(),
                    input,
                },
            ],
            stop_reason: Some("tool_use".to_string()),
            usage: Usage::default(),
        }
    }

    #[tokio::test]
    async fn test_unit_without_tools_forwards_model_text() {
        let model = Arc::new(FixedModel::new("1. Data Analyst"));
        let unit = CompletionUnit::new(JOB_ROLE_ANALYZER, model.clone(), &ToolRegistry::new(), 3);

        let out = unit.run("Skills: Python, SQL").await.unwrap();
        assert_eq!(out.text, "1. Data Analyst");
        assert_eq!(out.unit, "JobRoleAnalyzer");
        assert!(out.tool_calls.is_empty());

        let requests = model.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].tools.is_empty());
        assert!(requests[0].system.contains("career advisor"));
        assert_eq!(
            requests[0].messages[0],
            Message::user_text("Skills: Python, SQL")
        );
    }

    #[tokio::test]
    async fn test_tool_call_result_is_fed_back_before_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_use("toolu_1", ESTIMATE_SALARY, json!({"job_title": "Data Analyst"}))),
            Ok(CompletionResponse::text_only("| Data Analyst | 1000-2000 USD |")),
        ]));
        let registry = ToolRegistry::new().with(CannedSalary);
        let unit = CompletionUnit::new(SALARY_ESTIMATOR_AGENT, model.clone(), &registry, 3);

        let out = unit.run("Job titles: Data Analyst").await.unwrap();
        assert_eq!(out.text, "| Data Analyst | 1000-2000 USD |");
        assert_eq!(out.tool_calls.len(), 1);
        assert_eq!(out.tool_calls[0].tool, ESTIMATE_SALARY);
        assert_eq!(out.tool_calls[0].output["min"], 1000);

        let requests = model.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].tools[0].name, ESTIMATE_SALARY);

        let second = &requests[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[1].role, Role::Assistant);
        match &second[2].content[0] {
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                assert_eq!(tool_use_id, "toolu_1");
                assert!(!is_error);
                let fed: Value = serde_json::from_str(content).unwrap();
                assert_eq!(fed["job_title"], "Data Analyst");
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool_is_reported_to_model() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(tool_use("toolu_9", "send_email", json!({}))),
            Ok(CompletionResponse::text_only("Sorry, I cannot email.")),
        ]));
        let unit = CompletionUnit::new(RESUME_AGENT, model.clone(), &ToolRegistry::new(), 2);

        let out = unit.run("resume").await.unwrap();
        assert_eq!(out.tool_calls.len(), 1);
        assert!(out.tool_calls[0].output["error"]
            .as_str()
            .unwrap()
            .contains("unknown tool"));

        let requests = model.requests();
        assert!(matches!(
            &requests[1].messages[2].content[0],
            ContentBlock::ToolResult { is_error: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_tool_loop_is_bounded() {
        let script = (0..10)
            .map(|i| {
                Ok(tool_use(
                    &format!("toolu_{i}"),
                    ESTIMATE_SALARY,
                    json!({"job_title": "Data Analyst"}),
                ))
            })
            .collect();
        let model = Arc::new(ScriptedModel::new(script));
        let registry = ToolRegistry::new().with(CannedSalary);
        let unit = CompletionUnit::new(SALARY_ESTIMATOR_AGENT, model.clone(), &registry, 2);

        let err = unit.run("Job titles: Data Analyst").await.unwrap_err();
        assert!(matches!(err.source, LlmError::ToolLoopExceeded { max: 2 }));
        // initial call + two tool rounds
        assert_eq!(model.requests().len(), 3);
        assert_eq!(err.tool_calls.len(), 2);
        assert_eq!(err.tool_calls[1].output["max"], 2000);
    }

    #[tokio::test]
    async fn test_empty_answer_is_an_error() {
        let model = Arc::new(FixedModel::new("   "));
        let unit = CompletionUnit::new(RESUME_AGENT, model, &ToolRegistry::new(), 1);
        let err = unit.run("resume").await.unwrap_err();
        assert!(matches!(err.source, LlmError::EmptyContent));
        assert!(err.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_model_error_propagates() {
        let model = Arc::new(ScriptedModel::new(vec![Err(LlmError::Api {
            status: 401,
            message: "invalid x-api-key".to_string(),
        })]));
        let unit = CompletionUnit::new(RESUME_AGENT, model, &ToolRegistry::new(), 1);
        let err = unit.run("resume").await.unwrap_err();
        assert!(err.to_string().contains("invalid x-api-key"));
    }

    #[test]
    fn test_system_prompt_mentions_json_and_tools_when_relevant() {
        let model: Arc<dyn CompletionModel> = Arc::new(FixedModel::new("x"));
        let registry = ToolRegistry::new().with(CannedSalary);

        let resume = CompletionUnit::new(RESUME_AGENT, model.clone(), &registry, 1);
        assert!(resume.system_prompt().contains("```json"));
        assert!(!resume.system_prompt().contains(TOOL_USE));

        let salary = CompletionUnit::new(SALARY_ESTIMATOR_AGENT, model, &registry, 1);
        assert!(salary.system_prompt().starts_with("You are SalaryEstimatorAgent."));
        assert!(salary.system_prompt().contains(TOOL_USE));
    }
}
