//! Job output handling

use super::AppCellController;
use crate::collaborators::{OutputCellRequest, WidgetKind};
use crate::error::{AppCellError, Result};
use appcell_bus::MessageKind;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

impl AppCellController {
    /// React to the cell entering `success`
    ///
    /// Records the job result, creates the job's output cell unless one
    /// exists or the output widget is `no-display`, refreshes the output
    /// widget and resolves the output objects in the background.
    #[tracing::instrument(skip(self), fields(cell = %self.inner.cell_id))]
    pub fn do_on_success(&self) {
        let _batch = self.inner.bus.batch();
        let (job_id, existing_cell, widget, no_display) = {
            let mut model = self.inner.model.lock();
            let result = model.get_or("exec.jobState.result", Value::Null);
            model.set("output.result", result);
            let job_id = model.get_str("exec.jobState.job_id").map(str::to_string);
            let existing_cell = job_id.as_deref().and_then(|job| {
                model
                    .get_str(["output", "byJob", job, "cell", "id"])
                    .map(str::to_string)
            });
            let widget = model.copy("exec.outputWidgetInfo");
            let no_display = model.get_str("exec.outputWidgetInfo.name") == Some("no-display");
            (job_id, existing_cell, widget, no_display)
        };

        self.spawn_output_resolution();

        let Some(job_id) = job_id else {
            tracing::warn!("success without a job id; no output cell");
            return;
        };

        if let Some(cell_id) = existing_cell {
            if !self.inner.ctx.host.cell_exists(&cell_id) {
                self.add_notification(format!(
                    "Output cell not found: {cell_id}. The output of job {job_id} is no longer shown."
                ));
            }
            return;
        }

        if !no_display {
            let request = OutputCellRequest {
                cell_id: Uuid::new_v4().to_string(),
                parent_cell_id: self.inner.cell_id.clone(),
                job_id: job_id.clone(),
                widget,
            };
            let cell_id = self.inner.ctx.host.insert_output_cell(&request);
            tracing::info!(%job_id, output_cell = %cell_id, "output cell created");
            let params = self.model_value("params").unwrap_or_else(|| json!({}));
            self.inner.model.lock().set(
                ["output", "byJob", job_id.as_str()],
                json!({
                    "cell": {
                        "id": cell_id,
                        "created": true,
                        "createdAt": Utc::now().to_rfc3339(),
                    },
                    "params": params,
                }),
            );
        }

        self.update_output_widget();
    }

    /// Forget the output cell of a job that was removed from the notebook
    pub fn handle_output_cell_removed(&self, message: &Value) {
        let _batch = self.inner.bus.batch();
        let Some(job_id) = message.get("jobId").and_then(Value::as_str) else {
            tracing::warn!(?message, "output-cell-removed without a job id");
            return;
        };
        let removed = self
            .inner
            .model
            .lock()
            .delete(["output", "byJob", job_id]);
        if removed.is_some() {
            tracing::debug!(job_id, "output cell forgotten");
            self.update_output_widget();
        }
    }

    /// Look up the objects named by output parameters
    ///
    /// Found objects are stored under `output.objects`; each missing one
    /// raises a notification.
    ///
    /// # Errors
    ///
    /// The workspace failure, after it was raised as a notification.
    pub async fn resolve_output_objects(&self) -> Result<Vec<Value>> {
        let env = self.env()?;
        let outputs = env.spec.output_params(&self.params());
        if outputs.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<String> = outputs.iter().map(|o| o.object_name.clone()).collect();
        let infos = match self.inner.ctx.workspace.get_object_info(&names).await {
            Ok(infos) => infos,
            Err(err) => {
                self.add_notification(format!("Error resolving output objects: {err}"));
                return Err(AppCellError::RemoteService(err));
            }
        };

        let mut resolved = Vec::with_capacity(outputs.len());
        for (output, info) in outputs.iter().zip(infos) {
            match info {
                Some(info) => resolved.push(json!({
                    "param": output.param,
                    "name": output.object_name,
                    "ref": info.reference(),
                })),
                None => self.add_notification(format!(
                    "Output object {} specified in param {} was not found in this workspace",
                    output.object_name, output.param
                )),
            }
        }
        self.inner
            .model
            .lock()
            .set("output.objects", Value::Array(resolved.clone()));
        Ok(resolved)
    }

    fn spawn_output_resolution(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::debug!("no async runtime; output objects not resolved");
            return;
        };
        let cell = self.clone();
        let cancel = self.inner.cancel.clone();
        runtime.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                outcome = cell.resolve_output_objects() => {
                    if let Err(err) = outcome {
                        tracing::warn!(error = %err, "output objects not resolved");
                    }
                }
            }
        });
    }

    fn update_output_widget(&self) {
        let Some(bus) = self.widget_bus(WidgetKind::Output.name()) else {
            return;
        };
        let (job_state, output) = {
            let model = self.inner.model.lock();
            (
                model.get_or("exec.jobState", Value::Null),
                model.get_or("output", Value::Null),
            )
        };
        bus.emit(
            MessageKind::Update,
            json!({ "jobState": job_state, "output": output }),
        );
    }
}
