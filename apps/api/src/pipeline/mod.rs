//! Analysis pipeline: a fixed, ordered list of completion-unit stages.
//!
//! Flow: extract text → skills → roles → listings → salary → web_search →
//!       aggregate markdown + JSON.
//!
//! Each stage's output is transformed (see `handoff`) before it reaches the
//! next prompt. Per-stage policy decides whether a failure halts the run or
//! degrades to an inline error, and whether a stage is skipped when the role
//! stage named no job titles. Stages never run concurrently.

pub mod handlers;
pub mod handoff;
pub mod prompts;
pub mod state;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::agents::profiles::{self, InstructionProfile};
use crate::agents::{CompletionUnit, ToolInvocation, ToolRegistry};
use crate::document::{self, ExtractionError, ResumeDocument};
use crate::llm_client::{extract_json, CompletionModel, LlmError};
use handoff::{extract_job_titles, SkillsHandoff};
use prompts::{
    title_list, LISTINGS_PROMPT_TEMPLATE, ROLES_PROMPT_TEMPLATE, SALARY_PROMPT_TEMPLATE,
    SKILLS_PROMPT_TEMPLATE, WEB_SEARCH_PROMPT_TEMPLATE,
};
use state::{IllegalTransition, RunState, RunTracker};

// ────────────────────────────────────────────────────────────────────────────
// Stages and policies
// ────────────────────────────────────────────────────────────────────────────

/// Pipeline stages in canonical execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Skills,
    Roles,
    Listings,
    Salary,
    WebSearch,
}

/// What a stage failure does to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Move to `Failed` and return the error to the caller.
    Halt,
    /// Record the error in place of the stage output and continue.
    Degrade,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Skills,
        Stage::Roles,
        Stage::Listings,
        Stage::Salary,
        Stage::WebSearch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Skills => "skills",
            Stage::Roles => "roles",
            Stage::Listings => "listings",
            Stage::Salary => "salary",
            Stage::WebSearch => "web_search",
        }
    }

    pub fn profile(self) -> InstructionProfile {
        match self {
            Stage::Skills => profiles::RESUME_AGENT,
            Stage::Roles => profiles::JOB_ROLE_ANALYZER,
            Stage::Listings => profiles::JOB_SEARCH_AGENT,
            Stage::Salary => profiles::SALARY_ESTIMATOR_AGENT,
            Stage::WebSearch => profiles::JOB_SEARCHING_AGENT,
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            Stage::Skills => "Skills, Education & Experience",
            Stage::Roles => "Suggested Job Roles",
            Stage::Listings => "Live Job Listings",
            Stage::Salary => "Salary Estimates",
            Stage::WebSearch => "Openings on Job Sites",
        }
    }

    /// Everything downstream depends on extracted skills; the rest degrade.
    pub fn on_error(self) -> OnError {
        match self {
            Stage::Skills => OnError::Halt,
            _ => OnError::Degrade,
        }
    }

    /// Stages that only make sense once job titles are known.
    pub fn needs_titles(self) -> bool {
        matches!(self, Stage::Listings | Stage::Salary | Stage::WebSearch)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "skills" => Ok(Stage::Skills),
            "roles" => Ok(Stage::Roles),
            "listings" => Ok(Stage::Listings),
            "salary" => Ok(Stage::Salary),
            "web_search" => Ok(Stage::WebSearch),
            other => Err(format!("unknown pipeline stage '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub stages: Vec<Stage>,
    pub max_tool_iterations: usize,
    /// Fail with `Format` when the skills stage yields no JSON instead of
    /// falling back to raw text.
    pub strict_json: bool,
    /// Location used for listing and salary prompts.
    pub location: String,
}

impl PipelineSettings {
    /// Canonical order, no duplicates, skills always included.
    pub fn normalized_stages(&self) -> Vec<Stage> {
        let mut stages = self.stages.clone();
        stages.push(Stage::Skills);
        stages.sort();
        stages.dedup();
        stages
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Errors and report
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("{stage} stage failed: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: LlmError,
    },

    #[error("{stage} stage did not return parseable JSON")]
    Format { stage: Stage },

    #[error(transparent)]
    Transition(#[from] IllegalTransition),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    Degraded { error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub unit: &'static str,
    #[serde(flatten)]
    pub status: StageStatus,
    pub output: Option<String>,
    pub tool_calls: Vec<ToolInvocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub resume_preview: String,
    pub resume_chars: usize,
    pub job_titles: Vec<String>,
    pub stages: Vec<StageReport>,
    pub markdown: String,
    /// Embedded JSON per stage, when any stage produced parseable JSON.
    pub structured: Option<Value>,
    pub states: Vec<RunState>,
}

// ────────────────────────────────────────────────────────────────────────────
// Coordinator
// ────────────────────────────────────────────────────────────────────────────

/// Data carried between stages within one run.
struct RunContext<'a> {
    resume_text: &'a str,
    user_prompt: &'a str,
    skills: Option<SkillsHandoff>,
    titles: Vec<String>,
}

pub struct Coordinator {
    units: Vec<(Stage, CompletionUnit)>,
    settings: PipelineSettings,
}

impl Coordinator {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        registry: &ToolRegistry,
        settings: PipelineSettings,
    ) -> Self {
        let units = settings
            .normalized_stages()
            .into_iter()
            .map(|stage| {
                let unit = CompletionUnit::new(
                    stage.profile(),
                    model.clone(),
                    registry,
                    settings.max_tool_iterations,
                );
                (stage, unit)
            })
            .collect();
        Self { units, settings }
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.units.iter().map(|(s, _)| *s).collect()
    }

    /// Extracts the résumé and runs every configured stage. Extraction
    /// failure ends the run before any model call.
    pub async fn analyze_document(
        &self,
        document: &ResumeDocument,
        user_prompt: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let span = info_span!("analysis", run_id = %Uuid::new_v4());
        async move {
            let mut run = RunTracker::new();
            run.advance(RunState::Extracting)?;

            let text = match document::extract_text(document).await {
                Ok(text) if !text.trim().is_empty() => text,
                Ok(_) => return fail(&mut run, ExtractionError::NoText.into()),
                Err(e) => {
                    warn!("Extraction failed: {e}");
                    return fail(&mut run, e.into());
                }
            };
            info!("Extracted {} chars of resume text", text.len());

            self.run_stages(run, &text, user_prompt).await
        }
        .instrument(span)
        .await
    }

    /// Runs the stages over text that has already been extracted.
    #[cfg(test)]
    pub async fn analyze_text(
        &self,
        resume_text: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let span = info_span!("analysis", run_id = %Uuid::new_v4());
        async move {
            let mut run = RunTracker::new();
            run.advance(RunState::Extracting)?;
            if resume_text.trim().is_empty() {
                return fail(&mut run, ExtractionError::NoText.into());
            }
            self.run_stages(run, resume_text, user_prompt).await
        }
        .instrument(span)
        .await
    }

    async fn run_stages(
        &self,
        mut run: RunTracker,
        resume_text: &str,
        user_prompt: &str,
    ) -> Result<AnalysisReport, PipelineError> {
        let mut ctx = RunContext {
            resume_text,
            user_prompt,
            skills: None,
            titles: Vec::new(),
        };
        let mut reports = Vec::with_capacity(self.units.len());

        for (stage, unit) in &self.units {
            let stage = *stage;
            if stage.needs_titles() && ctx.titles.is_empty() {
                info!("Skipping {stage}: no job titles");
                reports.push(StageReport {
                    stage,
                    unit: unit.name(),
                    status: StageStatus::Skipped {
                        reason: "no job titles were identified".to_string(),
                    },
                    output: None,
                    tool_calls: Vec::new(),
                });
                continue;
            }

            run.advance(RunState::Delegating(stage))?;
            let prompt = self.compose(stage, &ctx);
            info!("Delegating {stage} to {} ({} chars)", unit.name(), prompt.len());

            run.advance(RunState::AwaitingMemberResults(stage))?;
            let output = match unit.run(&prompt).await {
                Ok(output) => output,
                Err(failure) => match stage.on_error() {
                    OnError::Halt => {
                        warn!("{stage} failed, halting: {failure}");
                        return fail(
                            &mut run,
                            PipelineError::Upstream {
                                stage,
                                source: failure.source,
                            },
                        );
                    }
                    OnError::Degrade => {
                        warn!(
                            "{stage} failed after {} tool call(s), continuing without it: {failure}",
                            failure.tool_calls.len()
                        );
                        reports.push(StageReport {
                            stage,
                            unit: unit.name(),
                            status: StageStatus::Degraded {
                                error: failure.source.to_string(),
                            },
                            output: None,
                            tool_calls: failure.tool_calls,
                        });
                        continue;
                    }
                },
            };

            match stage {
                Stage::Skills => {
                    let handoff = SkillsHandoff::from_output(&output.text);
                    if handoff.json.is_none() {
                        if self.settings.strict_json {
                            return fail(&mut run, PipelineError::Format { stage });
                        }
                        warn!("Skills output is not JSON; handing on raw text");
                    }
                    ctx.skills = Some(handoff);
                }
                Stage::Roles => {
                    ctx.titles = extract_job_titles(&output.text);
                    info!("Identified job titles: {:?}", ctx.titles);
                }
                _ => {}
            }

            reports.push(StageReport {
                stage,
                unit: output.unit,
                status: StageStatus::Completed,
                output: Some(output.text),
                tool_calls: output.tool_calls,
            });
        }

        run.advance(RunState::Aggregating)?;
        let markdown = render_markdown(&reports);
        let structured = collect_structured(&reports, &ctx.titles);
        run.advance(RunState::Done)?;

        Ok(AnalysisReport {
            resume_preview: document::preview(resume_text),
            resume_chars: resume_text.chars().count(),
            job_titles: ctx.titles,
            stages: reports,
            markdown,
            structured,
            states: run.history().to_vec(),
        })
    }

    fn compose(&self, stage: Stage, ctx: &RunContext<'_>) -> String {
        let titles = title_list(&ctx.titles);
        match stage {
            Stage::Skills => SKILLS_PROMPT_TEMPLATE
                .replace("{user_prompt}", ctx.user_prompt.trim())
                .replace("{resume_text}", ctx.resume_text.trim()),
            Stage::Roles => {
                let skills = ctx
                    .skills
                    .as_ref()
                    .map(SkillsHandoff::for_prompt)
                    .unwrap_or_else(|| ctx.resume_text.trim().to_string());
                ROLES_PROMPT_TEMPLATE
                    .replace("{user_prompt}", ctx.user_prompt.trim())
                    .replace("{skills}", &skills)
            }
            Stage::Listings => LISTINGS_PROMPT_TEMPLATE
                .replace("{location}", &self.settings.location)
                .replace("{titles}", &titles),
            Stage::Salary => SALARY_PROMPT_TEMPLATE
                .replace("{location}", &self.settings.location)
                .replace("{titles}", &titles),
            Stage::WebSearch => WEB_SEARCH_PROMPT_TEMPLATE.replace("{titles}", &titles),
        }
    }
}

/// Moves the run to `Failed` and returns `err`.
fn fail(run: &mut RunTracker, err: PipelineError) -> Result<AnalysisReport, PipelineError> {
    run.advance(RunState::Failed)?;
    Err(err)
}

fn render_markdown(reports: &[StageReport]) -> String {
    reports
        .iter()
        .map(|r| {
            let body = match (&r.status, &r.output) {
                (StageStatus::Completed, Some(text)) => text.clone(),
                (StageStatus::Degraded { error }, _) => {
                    format!("_This section is unavailable: {error}_")
                }
                (StageStatus::Skipped { reason }, _) => format!("_Skipped: {reason}._"),
                (StageStatus::Completed, None) => String::new(),
            };
            format!("## {}\n\n{body}", r.stage.heading())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn collect_structured(reports: &[StageReport], titles: &[String]) -> Option<Value> {
    let mut map = Map::new();
    for report in reports {
        if let (StageStatus::Completed, Some(text)) = (&report.status, &report.output) {
            if let Some(value) = extract_json(text) {
                map.insert(report.stage.as_str().to_string(), value);
            }
        }
    }
    if map.is_empty() {
        return None;
    }
    if !titles.is_empty() {
        map.insert("job_titles".to_string(), Value::from(titles.to_vec()));
    }
    Some(Value::Object(map))
}
