//! Scripted replay of a cell session
//!
//! A script names an app specification and a sequence of steps (parameter
//! edits, launch events, job status pushes, button presses). The simulator
//! drives a [`CellFixture`] through the steps and reports the visited
//! states together with every expectation that did not hold.

use crate::fixture::{CellFixture, FixtureBuilder};
use anyhow::Context;
use appcell_bus::MessageKind;
use appcell_core::{AppCellConfig, AppSpec};
use appcell_fsm::{StateKey, StateTag};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;

/// Built-in session used by `appcell-sim demo`
pub const DEMO_SCRIPT: &str = include_str!("../scripts/happy_path.json");

/// A recorded session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    /// App loaded into the cell
    pub spec: AppSpec,
    /// Saved cell metadata to resume from
    #[serde(default)]
    pub metadata: Option<Value>,
    /// Controller settings
    #[serde(default)]
    pub config: AppCellConfig,
    /// Steps in order
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse a JSON script
    ///
    /// # Errors
    ///
    /// The text is not a valid script.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON script file
    ///
    /// # Errors
    ///
    /// The file cannot be read or is not a valid script.
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// One step of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum Step {
    /// Edit a parameter
    SetParameter {
        /// Parameter id
        parameter: String,
        /// New value
        value: Value,
    },
    /// Launch event on the cell channel
    Launch {
        /// Phase name
        event: String,
        /// Job id once known
        #[serde(default)]
        job_id: Option<String>,
    },
    /// Job status push
    JobStatus {
        /// Job id
        job_id: String,
        /// Status name
        status: String,
        /// Job result, for completed jobs
        #[serde(default)]
        result: Option<Value>,
    },
    /// The job backend deleted the job
    JobDeleted {
        /// Job id
        job_id: String,
    },
    /// Press a button (`run-app`, `re-run-app`, `cancel`, `remove`)
    Click {
        /// Button message name
        button: String,
    },
    /// Answer the next confirmation dialog
    Answer {
        /// Whether the user accepts
        accept: bool,
    },
    /// The user deleted the output cell of a job
    RemoveOutputCell {
        /// Job id
        job_id: String,
    },
    /// Check the current state
    Expect {
        /// Expected state tag
        state: StateTag,
    },
}

/// Outcome of a replay
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    /// Steps executed
    pub steps_run: usize,
    /// State after loading and after each step
    pub states: Vec<String>,
    /// Final state
    pub final_state: Option<String>,
    /// Whether the cell halted on a fatal error
    pub halted: bool,
    /// Notifications raised
    pub notifications: Vec<String>,
    /// Output cells created
    pub output_cells: usize,
    /// Times the cell was executed
    pub executions: usize,
    /// Failed expectations
    pub violations: Vec<String>,
}

impl SimulationReport {
    /// Whether every expectation held
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human readable summary
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "App Cell Replay Report");
        let _ = writeln!(out, "======================");
        let _ = writeln!(out, "Steps run:     {}", self.steps_run);
        let _ = writeln!(
            out,
            "Final state:   {}",
            self.final_state.as_deref().unwrap_or("none")
        );
        let _ = writeln!(out, "Halted:        {}", self.halted);
        let _ = writeln!(out, "Executions:    {}", self.executions);
        let _ = writeln!(out, "Output cells:  {}", self.output_cells);
        let _ = writeln!(out);
        let _ = writeln!(out, "States:");
        for state in &self.states {
            let _ = writeln!(out, "  {state}");
        }
        if !self.notifications.is_empty() {
            let _ = writeln!(out, "Notifications:");
            for note in &self.notifications {
                let _ = writeln!(out, "  {note}");
            }
        }
        let _ = writeln!(out);
        if self.passed() {
            let _ = writeln!(out, "Result: PASS");
        } else {
            let _ = writeln!(out, "Result: FAIL ({} violations)", self.violations.len());
            for violation in &self.violations {
                let _ = writeln!(out, "  - {violation}");
            }
        }
        out
    }
}

/// Replay `script` against a fresh cell
///
/// # Errors
///
/// The fixture could not be built or the cell failed to initialise.
/// Failures after loading are recorded in the report instead.
pub async fn run_script(script: Script) -> anyhow::Result<SimulationReport> {
    let mut builder = FixtureBuilder::new(script.spec)?.config(script.config);
    if let Some(metadata) = script.metadata {
        builder = builder.metadata(metadata);
    }
    let cell = builder.build()?;

    let mut report = SimulationReport::default();
    if let Err(err) = cell.load().await {
        report.violations.push(format!("load failed: {err:#}"));
    }
    record_state(&cell, &mut report);

    for (index, step) in script.steps.into_iter().enumerate() {
        tracing::debug!(index, ?step, "replay step");
        apply(&cell, &step, index, &mut report);
        cell.settle().await;
        report.steps_run += 1;
        record_state(&cell, &mut report);
    }

    report.final_state = report.states.last().cloned();
    report.halted = cell.controller.is_halted();
    report.notifications = cell.controller.notifications();
    report.output_cells = cell.host.output_cells().len();
    report.executions = cell.host.executions();
    Ok(report)
}

fn apply(cell: &CellFixture, step: &Step, index: usize, report: &mut SimulationReport) {
    match step {
        Step::SetParameter { parameter, value } => cell.set_parameter(parameter, value.clone()),
        Step::Launch { event, job_id } => cell.launch(event, job_id.as_deref()),
        Step::JobStatus {
            job_id,
            status,
            result,
        } => {
            let extra = result
                .as_ref()
                .map_or(Value::Null, |r| serde_json::json!({ "result": r }));
            cell.job_status(job_id, status, extra);
        }
        Step::JobDeleted { job_id } => cell.job_deleted(job_id),
        Step::Click { button } => cell.click(MessageKind::from(button.as_str())),
        Step::Answer { accept } => cell.ui.answer_next(*accept),
        Step::RemoveOutputCell { job_id } => {
            cell.controller.cell_bus().emit(
                MessageKind::OutputCellRemoved,
                serde_json::json!({ "jobId": job_id }),
            );
        }
        Step::Expect { state } => match cell.controller.current_state() {
            Ok(current) if current.tag() == *state => {}
            Ok(current) => report.violations.push(format!(
                "step {index}: expected {state}, found {}",
                current.tag()
            )),
            Err(err) => report
                .violations
                .push(format!("step {index}: expected {state}, found error {err}")),
        },
    }
}

fn record_state(cell: &CellFixture, report: &mut SimulationReport) {
    if let Ok(state) = cell.controller.current_state() {
        report.states.push(state.tag().to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steps_parse_from_kebab_case() {
        let step: Step =
            serde_json::from_str(r#"{"step": "job-status", "job_id": "j1", "status": "queued"}"#)
                .unwrap();
        assert_eq!(
            step,
            Step::JobStatus {
                job_id: "j1".into(),
                status: "queued".into(),
                result: None,
            }
        );
    }

    #[test]
    fn demo_script_parses() {
        let script = Script::from_json(DEMO_SCRIPT).unwrap();
        assert!(!script.steps.is_empty());
        assert!(!script.spec.parameters.is_empty());
    }

    #[tokio::test]
    async fn demo_script_passes() {
        let script = Script::from_json(DEMO_SCRIPT).unwrap();
        let report = run_script(script).await.unwrap();
        assert!(report.passed(), "{}", report.generate_text());
        assert_eq!(report.final_state.as_deref(), Some("{mode: success}"));
        assert_eq!(report.output_cells, 1);
        assert_eq!(report.executions, 1);
    }
}
