//! User actions, notifications, settings and checkpoint saves

use super::AppCellController;
use crate::app_state::{AppState, ParamsStatus};
use crate::collaborators::Confirmation;
use crate::error::Result;
use appcell_bus::MessageKind;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// A user-toggled display setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    /// Key under `user-settings`
    pub name: &'static str,
    /// Label shown in the settings panel
    pub label: &'static str,
    /// Panel shown while the setting is on
    pub element: &'static str,
    /// Value when never set
    pub default: bool,
}

const SETTINGS: [Setting; 2] = [
    Setting {
        name: "showNotifications",
        label: "Show the Notifications panel",
        element: "notifications",
        default: false,
    },
    Setting {
        name: "showAboutApp",
        label: "Show the About This App panel",
        element: "about-app",
        default: false,
    },
];

const DEVELOPER_SETTING: Setting = Setting {
    name: "showDeveloper",
    label: "Show Developer features",
    element: "developer-options",
    default: false,
};

impl AppCellController {
    /// Execute the cell
    pub fn do_run(&self) {
        tracing::info!(cell = %self.inner.cell_id, "running app");
        self.inner.ctx.host.execute();
    }

    /// Confirm, then return a finished cell to edit mode
    ///
    /// Output already produced is left in place.
    ///
    /// # Errors
    ///
    /// Propagates transition failures.
    pub async fn do_rerun(&self) -> Result<bool> {
        let confirmed = self
            .inner
            .ctx
            .ui
            .confirm(Confirmation::new(
                "Edit and Re-Run?",
                "This action will clear the App Execution area and restore the Input Area to edit mode. \
                 You may then change inputs and run the app again. \
                 (Any output you have already produced will be left intact.)",
            ))
            .await;
        if !confirmed {
            return Ok(false);
        }
        self.reset_to_edit_mode()?;
        Ok(true)
    }

    /// Confirm, then cancel the running job
    ///
    /// Without a job the execution state is dropped and the cell goes back
    /// to `editing/complete` directly; with one, the cell waits for the job
    /// backend to report the cancellation.
    ///
    /// # Errors
    ///
    /// Propagates transition failures.
    pub async fn do_cancel(&self) -> Result<bool> {
        let confirmed = self
            .inner
            .ctx
            .ui
            .confirm(Confirmation::new(
                "Cancel Job?",
                "Cancelling the job will halt the job processing. \
                 Any output objects already created will remain in your narrative. \
                 Continue to Cancel the running job?",
            ))
            .await;
        if !confirmed {
            return Ok(false);
        }

        let _batch = self.inner.bus.batch();
        match self.job_id() {
            Some(job_id) => self.request_job_cancellation(&job_id),
            None => {
                self.inner.model.lock().delete("exec");
                self.transition(AppState::Editing(ParamsStatus::Complete))?;
                self.render_ui()?;
            }
        }
        Ok(true)
    }

    /// Confirm, then remove the cell
    ///
    /// Cancels a pending job, stops every widget, deletes the cell from the
    /// notebook and tears the controller down.
    ///
    /// # Errors
    ///
    /// Never fails; the signature matches the other user actions.
    pub async fn do_remove(&self) -> Result<bool> {
        let confirmed = self
            .inner
            .ctx
            .ui
            .confirm(Confirmation::new(
                "Remove Cell?",
                "Removing this cell will also remove any pending jobs, \
                 but will leave generated output intact. Continue to remove this app cell?",
            ))
            .await;
        if !confirmed {
            return Ok(false);
        }

        {
            let _batch = self.inner.bus.batch();
            if let Some(job_id) = self.job_id() {
                self.request_job_cancellation(&job_id);
            }
            let buses: Vec<_> = self
                .inner
                .widgets
                .lock()
                .values()
                .map(|w| w.bus.clone())
                .collect();
            for bus in buses {
                bus.emit(MessageKind::Stop, json!({}));
            }
        }
        self.inner.ctx.host.delete_cell();
        self.stop();
        Ok(true)
    }

    /// Run a confirmed user action on the runtime
    ///
    /// Dropped with a warning when no runtime is available; aborted when
    /// the cell goes away.
    pub(super) fn spawn_action<F, Fut>(&self, action: &'static str, run: F)
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(action, "no async runtime; user action dropped");
            return;
        };
        let cancel = self.inner.cancel.clone();
        let task = run(self.clone());
        runtime.spawn(async move {
            tokio::select! {
                () = cancel.cancelled() => {}
                outcome = task => match outcome {
                    Ok(true) => tracing::debug!(action, "user action done"),
                    Ok(false) => tracing::debug!(action, "user action declined"),
                    Err(err) => tracing::warn!(action, error = %err, "user action failed"),
                },
            }
        });
    }

    /// Append a notification and re-render the panel
    pub fn add_notification(&self, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(cell = %self.inner.cell_id, notification = %text, "notification");
        self.inner.model.lock().push("notifications", Value::String(text));
        self.render_notifications();
    }

    /// Remove the notification at `index`
    pub fn remove_notification(&self, index: usize) -> Option<String> {
        let mut notifications = self.notifications();
        if index >= notifications.len() {
            return None;
        }
        let removed = notifications.remove(index);
        self.inner
            .model
            .lock()
            .set("notifications", json!(notifications));
        self.render_notifications();
        Some(removed)
    }

    /// Remove every notification
    pub fn clear_notifications(&self) {
        self.inner.model.lock().set("notifications", json!([]));
        self.render_notifications();
    }

    /// Current notifications, oldest first
    #[must_use]
    pub fn notifications(&self) -> Vec<String> {
        self.inner
            .model
            .lock()
            .get_as("notifications")
            .unwrap_or_default()
    }

    pub(super) fn render_notifications(&self) {
        let notifications = self.notifications();
        let ui = &self.inner.ctx.ui;
        if notifications.is_empty() {
            ui.set_content("notifications.content", "There are currently no notifications");
        } else {
            ui.set_content("notifications.content", &notifications.join("\n"));
        }
        ui.set_content("notifications.count", &notifications.len().to_string());
    }

    /// Settings available in this cell
    #[must_use]
    pub fn settings(&self) -> Vec<Setting> {
        let mut settings = SETTINGS.to_vec();
        if self.inner.ctx.config.developer_mode {
            settings.push(DEVELOPER_SETTING);
        }
        settings
    }

    /// Value of a setting; `None` for unknown names
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<bool> {
        let setting = self.settings().into_iter().find(|s| s.name == name)?;
        let stored = self.inner.model.lock().copy(["user-settings", name]);
        Some(stored.and_then(|v| v.as_bool()).unwrap_or(setting.default))
    }

    /// Store a setting and show or hide its panel
    ///
    /// Returns `false` for unknown names.
    pub fn set_setting(&self, name: &str, value: bool) -> bool {
        if !self.settings().iter().any(|s| s.name == name) {
            tracing::warn!(setting = name, "unknown setting");
            return false;
        }
        self.inner
            .model
            .lock()
            .set(["user-settings", name], Value::Bool(value));
        self.render_settings();
        true
    }

    /// Flip a setting; returns the new value
    pub fn toggle_setting(&self, name: &str) -> Option<bool> {
        let value = !self.setting(name)?;
        self.set_setting(name, value);
        Some(value)
    }

    pub(super) fn render_settings(&self) {
        let ui = &self.inner.ctx.ui;
        for setting in self.settings() {
            if self.setting(setting.name).unwrap_or(setting.default) {
                ui.show_element(setting.element);
            } else {
                ui.hide_element(setting.element);
            }
        }
    }

    /// Schedule a checkpoint save
    ///
    /// At most one save is pending at a time; the save runs once the
    /// configured window has elapsed. Returns whether a new save was
    /// scheduled.
    pub fn save_narrative(&self) -> bool {
        if self.inner.save_pending.swap(true, Ordering::SeqCst) {
            return false;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.inner.save_pending.store(false, Ordering::SeqCst);
            tracing::debug!("no async runtime; checkpoint save skipped");
            return false;
        };

        let host = Arc::clone(&self.inner.ctx.host);
        let pending = Arc::clone(&self.inner.save_pending);
        let cancel = self.inner.cancel.clone();
        let window = self.inner.ctx.config.save_max_frequency();
        runtime.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(window) => {
                    pending.store(false, Ordering::SeqCst);
                    host.save_checkpoint();
                    tracing::debug!("checkpoint saved");
                }
                () = cancel.cancelled() => {
                    pending.store(false, Ordering::SeqCst);
                }
            }
        });
        true
    }
}
