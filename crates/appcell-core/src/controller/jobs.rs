//! Launch and job status handling

use super::{report, AppCellController};
use crate::app_state::{AppState, ParamsStatus};
use crate::collaborators::WidgetKind;
use crate::error::{AppCellError, Result};
use crate::events::{JobStatusMessage, LaunchEvent, LaunchPhase};
use appcell_bus::{Channel, Key, Listen, ListenerId, MessageKind};
use chrono::Utc;
use serde_json::{json, Value};

impl AppCellController {
    /// Apply a `run-status` launch event
    ///
    /// The event is recorded as the exec widget's launch state and appended
    /// to the exec log. `launched_job` starts listening on the job's channel.
    ///
    /// # Errors
    ///
    /// [`AppCellError::Halted`] once the cell has halted. An unknown phase
    /// or an illegal transition halts the cell.
    #[tracing::instrument(skip_all, fields(cell = %self.inner.cell_id))]
    pub fn handle_launch_event(&self, message: &Value) -> Result<AppState> {
        if self.is_halted() {
            return Err(AppCellError::Halted);
        }
        let _batch = self.inner.bus.batch();
        let event: LaunchEvent = serde_json::from_value(message.clone())
            .map_err(|e| self.halt(AppCellError::invalid_external("launch", e.to_string())))?;
        let phase = event.phase().map_err(|e| self.halt(e))?;
        tracing::debug!(?phase, job_id = ?event.job_id, "launch event");

        let state = self.transition(phase.target())?;
        if phase == LaunchPhase::LaunchedJob {
            match &event.job_id {
                Some(job_id) => self.start_listening_for_job(job_id),
                None => tracing::warn!("launched_job without a job id"),
            }
        }
        {
            let mut model = self.inner.model.lock();
            model.set("exec.launchState", message.clone());
            model.push(
                "exec.log",
                json!({
                    "timestamp": Utc::now().to_rfc3339(),
                    "event": "launch-status",
                    "data": {
                        "jobId": event.job_id,
                        "runId": event.run_id,
                        "status": event.event,
                    },
                }),
            );
        }
        self.inner
            .cell_bus
            .emit(MessageKind::LaunchStatus, json!({ "launchState": message }));
        self.render_ui()?;
        Ok(state)
    }

    /// Apply a `job-status` push
    ///
    /// A changed snapshot is stored and re-broadcast as `job-state`; an
    /// identical one only refreshes the update time and emits
    /// `job-state-updated`. Terminal statuses stop job listening.
    ///
    /// # Errors
    ///
    /// [`AppCellError::Halted`] once the cell has halted. An unknown status
    /// or an illegal transition halts the cell.
    #[tracing::instrument(skip_all, fields(cell = %self.inner.cell_id))]
    pub fn handle_job_status(&self, message: &Value) -> Result<AppState> {
        if self.is_halted() {
            return Err(AppCellError::Halted);
        }
        let _batch = self.inner.bus.batch();
        let update: JobStatusMessage = serde_json::from_value(message.clone())
            .map_err(|e| self.halt(AppCellError::invalid_external("job", e.to_string())))?;

        let changed = {
            let mut model = self.inner.model.lock();
            let changed = model.get("exec.jobState") != Some(&update.job_state);
            if changed {
                model.set("exec.jobState", update.job_state.clone());
                if let Some(info) = &update.output_widget_info {
                    model.set("exec.outputWidgetInfo", info.clone());
                }
                model.push(
                    "exec.log",
                    json!({
                        "timestamp": Utc::now().to_rfc3339(),
                        "event": "jobs-status",
                        "data": { "jobState": update.job_state },
                    }),
                );
            }
            model.set("exec.jobStateUpdated", json!(Utc::now().timestamp_millis()));
            changed
        };

        if changed {
            self.inner
                .cell_bus
                .emit(MessageKind::JobState, json!({ "jobState": update.job_state }));
        } else {
            self.inner
                .cell_bus
                .emit(MessageKind::JobStateUpdated, json!({ "jobId": update.job_id() }));
        }

        let status = update.status().map_err(|e| self.halt(e))?;
        if status.is_terminal() {
            self.stop_listening_for_jobs();
        }
        let current = self.current_state()?;
        let state = self.transition(status.target(&current))?;
        self.render_ui()?;
        Ok(state)
    }

    /// The job backend deleted the cell's job
    ///
    /// Outside editing the cell goes back to edit mode.
    ///
    /// # Errors
    ///
    /// [`AppCellError::Halted`] once the cell has halted; otherwise
    /// propagates transition failures.
    pub fn handle_job_deleted(&self) -> Result<AppState> {
        if self.is_halted() {
            return Err(AppCellError::Halted);
        }
        let current = self.current_state()?;
        if current.is_editing() {
            tracing::warn!(%current, "job deleted while editing; nothing to reset");
            return Ok(current);
        }
        self.reset_to_edit_mode()
    }

    /// Subscribe to status pushes on the job's channel
    ///
    /// Any previous job subscription is dropped first.
    pub fn start_listening_for_job(&self, job_id: &str) {
        self.stop_listening_for_jobs();
        let channel = Channel::job(job_id);
        let bus = &self.inner.ctx.bus;
        let ids = [
            bus.listen(
                Listen::key(
                    Key::kind(MessageKind::JobStatus),
                    self.handler(|cell, message| {
                        report("job-status", cell.handle_job_status(message));
                    }),
                )
                .on_channel(channel.clone()),
            ),
            bus.listen(
                Listen::key(
                    Key::kind(MessageKind::JobDeleted),
                    self.handler(|cell, _| report("job-deleted", cell.handle_job_deleted())),
                )
                .on_channel(channel),
            ),
        ];
        tracing::debug!(job_id, "listening for job status");
        self.inner.job_listeners.lock().extend(ids);
    }

    /// Drop the job channel subscriptions
    pub fn stop_listening_for_jobs(&self) {
        let ids: Vec<ListenerId> = self.inner.job_listeners.lock().drain(..).collect();
        for id in ids {
            self.inner.ctx.bus.remove_listener(id);
        }
    }

    /// Forget the run and return to `editing/complete`
    pub(super) fn reset_to_edit_mode(&self) -> Result<AppState> {
        let _batch = self.inner.bus.batch();
        self.stop_listening_for_jobs();
        self.inner.model.lock().delete("exec");
        self.reload_exec_widget()?;
        let state = self.transition(AppState::Editing(ParamsStatus::Complete))?;
        self.render_ui()?;
        Ok(state)
    }

    fn reload_exec_widget(&self) -> Result<()> {
        let previous = self.inner.widgets.lock().shift_remove(WidgetKind::Exec.name());
        if let Some(mounted) = previous {
            mounted.widget.stop();
        }
        self.mount(WidgetKind::Exec, self.inner.cell_bus.clone())
    }

    /// Ask the job backend to cancel `job_id`
    pub(super) fn request_job_cancellation(&self, job_id: &str) {
        tracing::info!(job_id, "requesting job cancellation");
        self.inner
            .ctx
            .bus
            .emit(MessageKind::RequestJobCancellation, json!({ "jobId": job_id }));
    }
}
