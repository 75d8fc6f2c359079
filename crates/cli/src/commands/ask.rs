//! Ask command handler.
//!
//! Runs the agent on one query, under a wall-clock timeout, and optionally
//! records the exchange in a chat session and publishes the answer.

use crate::runtime::build_agent;
use clap::Args;
use rights_agent::{
    render_history, AgentOutput, AgentRun, ChatHistory, NotionPublisher, Report,
    ReportPublisher, Role,
};
use rights_core::{config::AppConfig, AppResult};
use std::time::Duration;

/// Ask the agent a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Maximum number of loop steps
    #[arg(long)]
    pub max_steps: Option<usize>,

    /// Decision strategy (rules, react)
    #[arg(long)]
    pub planner: Option<String>,

    /// Number of documents to retrieve
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Score threshold (0 disables filtering)
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Wall-clock timeout in seconds (0 disables it)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Publish the answer to Notion
    #[arg(long)]
    pub publish: bool,

    /// Report title when publishing (default: the query)
    #[arg(long, requires = "publish")]
    pub title: Option<String>,

    /// Report source label when publishing
    #[arg(long, requires = "publish")]
    pub source: Option<String>,

    /// Chat session to load history from and append to
    #[arg(long)]
    pub session: Option<String>,

    /// Print the tool trace
    #[arg(long)]
    pub show_trace: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let config = self.apply(config)?;

        let history = match &self.session {
            Some(session) => Some((ChatHistory::open(&config.history_path())?, session.as_str())),
            None => None,
        };
        let context = match &history {
            Some((store, session)) => render_history(&store.load_messages(session)?),
            None => None,
        };

        let agent = build_agent(&config)?;
        let timeout_secs = config.agent.timeout_secs;

        let run = if timeout_secs == 0 {
            Some(agent.run_traced(&self.query, context).await)
        } else {
            tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                agent.run_traced(&self.query, context),
            )
            .await
            .ok()
        };

        let output = match &run {
            Some(run) => run.output.clone(),
            None => {
                tracing::warn!("Agent run timed out after {}s", timeout_secs);
                format!("Error: request timed out after {}s", timeout_secs)
            }
        };

        if let Some((store, session)) = &history {
            store.save_message(Role::User, &self.query, session)?;
            store.save_message(Role::Ai, &output, session)?;
        }

        self.print(&output, run.as_ref())?;

        if self.publish {
            self.publish_report(&config, &output).await;
        }

        Ok(())
    }

    fn apply(&self, config: &AppConfig) -> AppResult<AppConfig> {
        let mut config = config.clone();
        if let Some(max_steps) = self.max_steps {
            config.agent.max_steps = max_steps;
        }
        if let Some(planner) = &self.planner {
            config.agent.planner = planner.clone();
        }
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(threshold) = self.threshold {
            config.retrieval.score_threshold = threshold;
        }
        if let Some(timeout) = self.timeout {
            config.agent.timeout_secs = timeout;
        }
        config.validate()?;
        Ok(config)
    }

    fn print(&self, output: &str, run: Option<&AgentRun>) -> AppResult<()> {
        if self.json {
            let mut value = serde_json::to_value(AgentOutput {
                output: output.to_string(),
            })?;
            if let (true, Some(run), Some(obj)) = (self.show_trace, run, value.as_object_mut()) {
                obj.insert("runId".to_string(), serde_json::to_value(run.run_id)?);
                obj.insert("trace".to_string(), serde_json::to_value(&run.state.trace)?);
                obj.insert("exhausted".to_string(), run.state.exhausted.into());
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
            return Ok(());
        }

        if let (true, Some(run)) = (self.show_trace, run) {
            eprintln!("Trace ({} steps):", run.state.step);
            for (i, step) in run.state.trace.iter().enumerate() {
                let status = match &step.error {
                    Some(failure) => format!("error: {}", failure.message),
                    None => "ok".to_string(),
                };
                eprintln!("  {}. {} [{}]", i + 1, step.action, status);
            }
            if run.state.exhausted {
                eprintln!("  (step budget exhausted)");
            }
            eprintln!();
        }

        println!("{}", output);
        Ok(())
    }

    async fn publish_report(&self, config: &AppConfig, output: &str) {
        if output.starts_with("Error:") {
            eprintln!("Not publishing: the agent returned an error");
            return;
        }

        let title = self.title.clone().unwrap_or_else(|| self.query.clone());
        let source = self
            .source
            .clone()
            .or_else(|| Some(config.publish.source.clone()));

        let result: AppResult<()> = async {
            let report = Report::new(title, output, None, source)?;
            NotionPublisher::from_config(config)?.publish(&report).await
        }
        .await;

        match result {
            Ok(()) => eprintln!("Published report to Notion"),
            Err(e) => {
                tracing::warn!("Publishing failed: {}", e);
                eprintln!("Publishing failed: {}", e);
            }
        }
    }
}
