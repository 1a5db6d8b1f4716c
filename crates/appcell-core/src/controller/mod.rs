//! App cell controller
//!
//! Owns the cell model and the state machine of one notebook cell. External
//! events (parameter edits, launch and job status pushes, user actions) are
//! turned into exactly one checked transition, after which the UI surface is
//! re-rendered from the new state's definition and the sub-widgets are told
//! what changed over their channel buses.
//!
//! Every entry point opens a bus batch before touching its locks, so
//! messages emitted while state is locked are only delivered once the locks
//! have been released.

mod actions;
mod jobs;
mod output;

pub use actions::Setting;

use crate::app::AppRef;
use crate::app_state::{app_states, elements, AppState, ParamsStatus, Stage};
use crate::collaborators::{CellContext, Widget, WidgetKind};
use crate::error::{AppCellError, Result};
use crate::model::{CellModel, PropPath};
use crate::params::AppSpec;
use appcell_bus::{Channel, ChannelBus, Key, ListenerId, MessageKind, Reply};
use appcell_fsm::{StartMode, StateDefinition, StateKey, StateMachine, StateTag};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Loaded app and its specification
#[derive(Debug)]
struct AppEnv {
    app: AppRef,
    spec: AppSpec,
}

struct MountedWidget {
    bus: ChannelBus,
    widget: Arc<dyn Widget>,
}

struct Inner {
    ctx: CellContext,
    cell_id: String,
    bus: ChannelBus,
    cell_bus: ChannelBus,
    fsm: Mutex<StateMachine<AppState>>,
    model: Arc<Mutex<CellModel>>,
    env: Mutex<Option<Arc<AppEnv>>>,
    widgets: Mutex<IndexMap<&'static str, MountedWidget>>,
    listeners: Mutex<Vec<ListenerId>>,
    job_listeners: Mutex<Vec<ListenerId>>,
    halted: AtomicBool,
    save_pending: Arc<AtomicBool>,
    cancel: CancellationToken,
}

/// Controller of one app cell
///
/// Cheap to clone; clones drive the same cell.
#[derive(Clone)]
pub struct AppCellController {
    inner: Arc<Inner>,
}

impl fmt::Debug for AppCellController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppCellController")
            .field("cell_id", &self.inner.cell_id)
            .field("state", &self.current_state().ok())
            .field("halted", &self.is_halted())
            .finish_non_exhaustive()
    }
}

impl AppCellController {
    /// Build the controller of the cell the host describes
    ///
    /// The model is loaded from the host's cell metadata and written back on
    /// every mutation.
    ///
    /// # Errors
    ///
    /// Fails only when the built-in state table is inconsistent.
    pub fn new(ctx: CellContext) -> Result<Self> {
        let cell_id = ctx.host.cell_id();
        let host = Arc::clone(&ctx.host);
        let model = CellModel::new(ctx.host.load_metadata())
            .with_update_hook(move |data| host.store_metadata(data));
        let model = Arc::new(Mutex::new(model));

        let bus = ctx.bus.make_channel_bus(None, "A app cell widget");
        let cell_bus = ctx
            .bus
            .make_channel_bus(Some(Channel::cell(cell_id.clone())), "A cell channel");

        let persisted = Arc::clone(&model);
        let fsm = StateMachine::new(app_states(), AppState::New, bus.clone())?.with_persistence(
            move |state: &AppState| {
                let tag = serde_json::to_value(state.tag()).unwrap_or_default();
                persisted.lock().set("fsm.currentState", tag);
            },
        );

        Ok(Self {
            inner: Arc::new(Inner {
                ctx,
                cell_id,
                bus,
                cell_bus,
                fsm: Mutex::new(fsm),
                model,
                env: Mutex::new(None),
                widgets: Mutex::new(IndexMap::new()),
                listeners: Mutex::new(Vec::new()),
                job_listeners: Mutex::new(Vec::new()),
                halted: AtomicBool::new(false),
                save_pending: Arc::new(AtomicBool::new(false)),
                cancel: CancellationToken::new(),
            }),
        })
    }

    /// Wire the bus listeners and start the state machine
    ///
    /// A cell with a persisted state resumes it and emits its resume
    /// messages; a new cell starts in `new`. A queued or running cell
    /// resumes listening on its job's channel.
    ///
    /// # Errors
    ///
    /// A persisted state missing from the table halts the cell in
    /// `fatal-error` and is returned.
    #[tracing::instrument(skip(self), fields(cell = %self.inner.cell_id))]
    pub fn init(&self) -> Result<AppState> {
        let _batch = self.inner.bus.batch();
        self.wire_listeners();
        let state = self.start_machine()?;

        if let AppState::Processing(stage) = state {
            if stage != Stage::Launching {
                match self.job_id() {
                    Some(job_id) => self.start_listening_for_job(&job_id),
                    None => tracing::warn!(stage = stage.as_str(), "running cell without a job id"),
                }
            }
        }
        tracing::info!(%state, "cell initialised");
        Ok(state)
    }

    fn start_machine(&self) -> Result<AppState> {
        let persisted: Option<StateTag> = self.inner.model.lock().get_as("fsm.currentState");
        let mut fsm = self.inner.fsm.lock();

        match persisted {
            None => {
                fsm.start(AppState::New, StartMode::Fresh)?;
            }
            Some(tag) => {
                let resumed = fsm.start_from_tag(&tag, StartMode::Resume).map(|_| ());
                if let Err(err) = resumed {
                    tracing::error!(%tag, error = %err, "persisted state is not in the state table");
                    self.record_fatal("Unknown cell state", &err.to_string());
                    fsm.start(AppState::FatalError, StartMode::Fresh)?;
                    self.inner.halted.store(true, Ordering::SeqCst);
                    self.render_locked(&fsm);
                    return Err(err.into());
                }
            }
        }

        Ok(*fsm.current_state()?)
    }

    fn wire_listeners(&self) {
        let bus = &self.inner.bus;
        let ids = vec![
            bus.on(MessageKind::RunApp, self.handler(|cell, _| cell.do_run())),
            bus.on(
                MessageKind::ReRunApp,
                self.handler(|cell, _| {
                    cell.spawn_action("re-run", |c| async move { c.do_rerun().await });
                }),
            ),
            bus.on(
                MessageKind::Cancel,
                self.handler(|cell, _| {
                    cell.spawn_action("cancel", |c| async move { c.do_cancel().await });
                }),
            ),
            bus.on(
                MessageKind::Remove,
                self.handler(|cell, _| {
                    cell.spawn_action("remove", |c| async move { c.do_remove().await });
                }),
            ),
            bus.on(
                MessageKind::OnSuccess,
                self.handler(|cell, _| cell.do_on_success()),
            ),
            bus.on(
                MessageKind::SyncAllDisplayParameters,
                self.handler(|cell, _| {
                    if let Some(display) = cell.widget_bus(WidgetKind::ParamsDisplay.name()) {
                        display.emit(MessageKind::SyncAllParameters, json!({}));
                    }
                }),
            ),
            self.inner.ctx.bus.on(
                MessageKind::ResetToDefaults,
                self.handler(|cell, _| {
                    cell.inner.bus.emit(MessageKind::ResetToDefaults, json!({}));
                }),
            ),
            self.inner.cell_bus.on(
                MessageKind::RunStatus,
                self.handler(|cell, message| {
                    report("run-status", cell.handle_launch_event(message));
                }),
            ),
            self.inner.cell_bus.on(
                MessageKind::OutputCellRemoved,
                self.handler(|cell, message| cell.handle_output_cell_removed(message)),
            ),
        ];
        self.inner.listeners.lock().extend(ids);
    }

    /// Load the app and compose the cell
    ///
    /// Fetches the app specification, labels the cell, mounts the four
    /// sub-widgets and moves a new cell into editing.
    ///
    /// # Errors
    ///
    /// Any failure is recorded as the cell's fatal error, moves the cell to
    /// `fatal-error` and is returned as [`AppCellError::FatalLoad`].
    #[tracing::instrument(skip(self, app), fields(cell = %self.inner.cell_id, app = %app))]
    pub async fn run(&self, app: AppRef) -> Result<AppState> {
        match self.compose(app).await {
            Ok(state) => Ok(state),
            Err(err) => {
                self.fail_load(&err);
                Err(match err {
                    AppCellError::FatalLoad(reason) => AppCellError::FatalLoad(reason),
                    other => AppCellError::FatalLoad(other.to_string()),
                })
            }
        }
    }

    async fn compose(&self, app: AppRef) -> Result<AppState> {
        let spec = self.inner.ctx.catalog.get_app_spec(&app).await?;

        let _batch = self.inner.bus.batch();
        let host = &self.inner.ctx.host;
        host.set_attribute("title", Value::String(spec.info.name.clone()));
        host.set_attribute("subtitle", Value::String(spec.info.subtitle.clone()));
        host.set_attribute("info.url", Value::String(app.info_url()));
        host.set_attribute("info.label", json!("more..."));
        self.inner
            .model
            .lock()
            .set("app", serde_json::to_value(&app).unwrap_or_default());
        *self.inner.env.lock() = Some(Arc::new(AppEnv { app, spec }));

        self.mount_widgets()?;
        self.show_about_app();
        self.render_ui()?;

        if self.current_state()? == AppState::New {
            self.evaluate()
        } else {
            self.render_ui()?;
            self.current_state()
        }
    }

    fn fail_load(&self, err: &AppCellError) {
        let _batch = self.inner.bus.batch();
        let reason = match err {
            AppCellError::FatalLoad(reason) => reason.clone(),
            other => other.to_string(),
        };
        tracing::error!(cell = %self.inner.cell_id, error = %reason, "error loading main widgets");
        self.add_notification(format!("Error loading main widgets: {reason}"));
        self.record_fatal("Error loading main widgets", &reason);
        self.stop_listening_for_jobs();

        let mut fsm = self.inner.fsm.lock();
        if fsm.can_transition(&AppState::FatalError) {
            if let Err(e) = fsm.new_state(AppState::FatalError) {
                tracing::warn!(error = %e, "could not enter fatal-error");
            }
        }
        self.inner.halted.store(true, Ordering::SeqCst);
        self.render_locked(&fsm);
    }

    /// Re-validate the parameters and move to the matching editing state
    ///
    /// Valid parameters rebuild the cell's code and enable running; anything
    /// missing clears the code. A cell still in `new` passes through
    /// `editing/incomplete` first.
    ///
    /// # Errors
    ///
    /// Fails when the app is not loaded or the transition is illegal, in
    /// which case the cell has been halted.
    pub fn evaluate_app_state(&self) -> Result<AppState> {
        let _batch = self.inner.bus.batch();
        self.evaluate()
    }

    /// Check the current parameters against the app specification
    ///
    /// Returns the parameters as exported to the generated code.
    ///
    /// # Errors
    ///
    /// [`AppCellError::Validation`] listing every blank required parameter,
    /// [`AppCellError::FatalLoad`] before the app is loaded.
    pub fn validate_parameters(&self) -> Result<Map<String, Value>> {
        let env = self.env()?;
        let params = self.params();
        env.spec
            .validate(&params)
            .map_err(AppCellError::Validation)?;
        Ok(env.spec.export_params(&params))
    }

    fn evaluate(&self) -> Result<AppState> {
        let env = self.env()?;

        if self.current_state()? == AppState::New {
            self.transition(AppState::Editing(ParamsStatus::Incomplete))?;
        }

        let state = match self.validate_parameters() {
            Ok(exported) => {
                let code =
                    self.inner
                        .ctx
                        .code
                        .build(&self.inner.cell_id, Uuid::new_v4(), &env.app, &exported);
                self.inner.ctx.host.set_code(&code);
                self.transition(AppState::Editing(ParamsStatus::Complete))?
            }
            Err(AppCellError::Validation(issues)) => {
                tracing::debug!(
                    missing = ?issues.iter().map(|i| i.parameter.as_str()).collect::<Vec<_>>(),
                    "parameters incomplete"
                );
                self.inner.ctx.host.set_code("");
                self.transition(AppState::Editing(ParamsStatus::Incomplete))?
            }
            Err(err) => return Err(err),
        };
        self.render_ui()?;
        Ok(state)
    }

    /// Move to `target` through the state table
    ///
    /// A changed state has its enter messages emitted and schedules a
    /// checkpoint save. A rejected transition halts the cell.
    fn transition(&self, target: AppState) -> Result<AppState> {
        if self.is_halted() {
            return Err(AppCellError::Halted);
        }
        let _batch = self.inner.bus.batch();
        let mut fsm = self.inner.fsm.lock();
        let previous = *fsm.current_state()?;

        let moved = fsm.new_state(target).map(|_| ());
        if let Err(err) = moved {
            self.halt_locked(&mut fsm, &err);
            return Err(err.into());
        }
        tracing::info!(cell = %self.inner.cell_id, from = %previous, to = %target, "state changed");
        if previous != target {
            fsm.announce(StartMode::Fresh)?;
        }
        drop(fsm);

        self.save_narrative();
        Ok(target)
    }

    /// Stop the cell after a defect
    fn halt(&self, err: AppCellError) -> AppCellError {
        let _batch = self.inner.bus.batch();
        let mut fsm = self.inner.fsm.lock();
        self.halt_locked(&mut fsm, &err);
        err
    }

    fn halt_locked(&self, fsm: &mut StateMachine<AppState>, err: &dyn fmt::Display) {
        tracing::error!(cell = %self.inner.cell_id, error = %err, "halting cell");
        self.record_fatal("Internal error", &err.to_string());
        self.stop_listening_for_jobs();
        if fsm.can_transition(&AppState::FatalError) {
            if let Err(e) = fsm.new_state(AppState::FatalError) {
                tracing::warn!(error = %e, "could not enter fatal-error");
            }
        }
        self.inner.halted.store(true, Ordering::SeqCst);
        self.render_locked(fsm);
    }

    fn record_fatal(&self, title: &str, message: &str) {
        self.inner
            .model
            .lock()
            .set("fatalError", json!({ "title": title, "message": message }));
    }

    /// Apply the current state's UI configuration
    ///
    /// Depends only on the current definition, the notifications and the
    /// settings; rendering twice changes nothing.
    ///
    /// # Errors
    ///
    /// [`AppCellError::StateMachine`] before `init`.
    pub fn render_ui(&self) -> Result<()> {
        let fsm = self.inner.fsm.lock();
        fsm.current_state()?;
        self.render_locked(&fsm);
        Ok(())
    }

    fn render_locked(&self, fsm: &StateMachine<AppState>) {
        let definition = if self.is_halted() {
            fsm.definition(&AppState::FatalError)
        } else {
            fsm.current_definition().ok()
        };
        let Some(definition) = definition else {
            return;
        };

        let ui = &self.inner.ctx.ui;
        ui.set_content("fsm-display", &definition.state.tag().to_string());
        let buttons = &definition.ui.buttons;
        buttons.enabled.iter().for_each(|b| ui.enable_button(b));
        buttons.disabled.iter().for_each(|b| ui.disable_button(b));
        buttons.hidden.iter().for_each(|b| ui.hide_button(b));
        let panels = &definition.ui.elements;
        panels.show.iter().for_each(|e| ui.show_element(e));
        panels.hide.iter().for_each(|e| ui.hide_element(e));

        self.render_notifications();
        self.render_settings();
        if definition.ui.shows(elements::FATAL_ERROR) {
            self.sync_fatal_error();
        }
    }

    fn sync_fatal_error(&self) {
        let (title, message) = {
            let model = self.inner.model.lock();
            (
                model.get_str("fatalError.title").unwrap_or_default().to_string(),
                model.get_str("fatalError.message").unwrap_or_default().to_string(),
            )
        };
        self.inner.ctx.ui.set_content("fatal-error.title", &title);
        self.inner.ctx.ui.set_content("fatal-error.message", &message);
    }

    fn show_about_app(&self) {
        let Ok(env) = self.env() else {
            return;
        };
        let info = &env.spec.info;
        let ui = &self.inner.ctx.ui;
        let na = "n/a";
        ui.set_content("about-app.name", &info.name);
        ui.set_content("about-app.module", info.namespace.as_deref().unwrap_or(na));
        ui.set_content("about-app.id", &info.id);
        ui.set_content("about-app.summary", &info.subtitle);
        ui.set_content("about-app.version", info.ver.as_deref().unwrap_or(na));
        ui.set_content(
            "about-app.git-commit-hash",
            info.git_commit_hash.as_deref().unwrap_or(na),
        );
        let authors = if info.authors.is_empty() {
            na.to_string()
        } else {
            info.authors.join("\n")
        };
        ui.set_content("about-app.authors", &authors);
    }

    fn mount_widgets(&self) -> Result<()> {
        let env = self.env()?;
        let input_module = env
            .spec
            .widgets
            .input
            .clone()
            .filter(|module| !module.is_empty() && module != "null")
            .unwrap_or_else(|| self.inner.ctx.config.default_input_widget.clone());
        let root = &self.inner.ctx.bus;

        self.mount(
            WidgetKind::ParamsInput(input_module),
            root.make_channel_bus(None, "Parent comm bus for input widget"),
        )?;
        self.mount(
            WidgetKind::ParamsDisplay,
            root.make_channel_bus(None, "Parent comm bus for load input view widget"),
        )?;
        self.mount(WidgetKind::Exec, self.inner.cell_bus.clone())?;
        self.mount(
            WidgetKind::Output,
            root.make_channel_bus(None, "Parent comm bus for output widget"),
        )
    }

    fn mount(&self, kind: WidgetKind, bus: ChannelBus) -> Result<()> {
        let widget = self
            .inner
            .ctx
            .widgets
            .make(&kind, bus.clone())
            .map_err(|e| AppCellError::FatalLoad(format!("cannot load {}: {e}", kind.name())))?;

        let ids = self.wire_widget(&kind, &bus);
        self.inner.listeners.lock().extend(ids);
        widget.start();
        bus.emit(MessageKind::Run, self.run_payload(&kind));
        tracing::debug!(widget = kind.name(), channel = %bus.channel(), "widget mounted");

        self.inner
            .widgets
            .lock()
            .insert(kind.name(), MountedWidget { bus, widget });
        Ok(())
    }

    fn run_payload(&self, kind: &WidgetKind) -> Value {
        let node = kind.mount_point();
        let model = self.inner.model.lock();
        match kind {
            WidgetKind::ParamsInput(_) | WidgetKind::ParamsDisplay => {
                let parameters = self
                    .env()
                    .ok()
                    .and_then(|env| serde_json::to_value(&env.spec.parameters).ok())
                    .unwrap_or_default();
                json!({ "node": node, "parameters": parameters })
            }
            WidgetKind::Exec => json!({
                "node": node,
                "launchState": model.get_or("exec.launchState", Value::Null),
                "jobState": model.get_or("exec.jobState", Value::Null),
            }),
            WidgetKind::Output => json!({
                "node": node,
                "jobState": model.get_or("exec.jobState", Value::Null),
                "output": model.get_or("output", Value::Null),
            }),
        }
    }

    fn wire_widget(&self, kind: &WidgetKind, bus: &ChannelBus) -> Vec<ListenerId> {
        let sync_one = {
            let bus = bus.clone();
            move |cell: &Self, message: &Value| {
                let Some(parameter) = message.get("parameter").and_then(Value::as_str) else {
                    return;
                };
                let value = cell.model_value(["params", parameter]).unwrap_or_default();
                bus.send(
                    json!({ "parameter": parameter, "value": value }),
                    Key::typed(MessageKind::Update, parameter),
                );
            }
        };

        match kind {
            WidgetKind::ParamsInput(_) => {
                let weak = Arc::downgrade(&self.inner);
                vec![
                    bus.on(MessageKind::ParameterSync, self.handler(sync_one)),
                    bus.respond(Key::kind(MessageKind::GetParameter), move |message| {
                        let value = weak
                            .upgrade()
                            .zip(message.get("parameterName").and_then(Value::as_str))
                            .and_then(|(inner, name)| {
                                inner.model.lock().copy(["params", name])
                            })
                            .unwrap_or_default();
                        Reply::ready(json!({ "value": value }))
                    }),
                    bus.on(
                        MessageKind::ParameterChanged,
                        self.handler(|cell, message| {
                            let Some(parameter) = message.get("parameter").and_then(Value::as_str)
                            else {
                                tracing::warn!(?message, "parameter-changed without parameter");
                                return;
                            };
                            let value = message.get("newValue").cloned().unwrap_or_default();
                            cell.inner.model.lock().set(["params", parameter], value);
                            report("parameter-changed", cell.evaluate_app_state());
                        }),
                    ),
                ]
            }
            WidgetKind::ParamsDisplay => {
                let sync_all = {
                    let bus = bus.clone();
                    move |cell: &Self, _: &Value| {
                        for (parameter, value) in cell.params() {
                            bus.send(
                                json!({ "parameter": parameter, "value": value }),
                                Key::typed(MessageKind::Update, parameter),
                            );
                        }
                    }
                };
                vec![
                    bus.on(MessageKind::SyncAllParameters, self.handler(sync_all)),
                    bus.on(MessageKind::ParameterSync, self.handler(sync_one)),
                ]
            }
            WidgetKind::Exec | WidgetKind::Output => Vec::new(),
        }
    }

    /// Bus listener running `action` while the controller is alive
    fn handler<F>(&self, action: F) -> impl Fn(&Value) + Send + Sync + 'static
    where
        F: Fn(&Self, &Value) + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(&self.inner);
        move |message: &Value| {
            if let Some(inner) = weak.upgrade() {
                action(&Self { inner }, message);
            }
        }
    }

    fn env(&self) -> Result<Arc<AppEnv>> {
        self.inner
            .env
            .lock()
            .clone()
            .ok_or_else(|| AppCellError::FatalLoad("app specification not loaded".to_string()))
    }

    fn params(&self) -> Map<String, Value> {
        match self.model_value("params") {
            Some(Value::Object(params)) => params,
            _ => Map::new(),
        }
    }

    fn job_id(&self) -> Option<String> {
        self.inner
            .model
            .lock()
            .get_str("exec.jobState.job_id")
            .map(str::to_string)
    }

    /// Current state
    ///
    /// # Errors
    ///
    /// [`AppCellError::StateMachine`] before `init`.
    pub fn current_state(&self) -> Result<AppState> {
        Ok(*self.inner.fsm.lock().current_state()?)
    }

    /// Definition of the current state
    ///
    /// # Errors
    ///
    /// [`AppCellError::StateMachine`] before `init`.
    pub fn current_definition(&self) -> Result<StateDefinition<AppState>> {
        Ok(self.inner.fsm.lock().current_definition()?.clone())
    }

    /// Copy of a model value
    pub fn model_value(&self, path: impl Into<PropPath>) -> Option<Value> {
        self.inner.model.lock().copy(path)
    }

    /// Copy of the whole model
    #[must_use]
    pub fn model_snapshot(&self) -> Value {
        self.inner.model.lock().raw().clone()
    }

    /// Whether a fatal error stopped the cell
    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.inner.halted.load(Ordering::SeqCst)
    }

    /// Id of the cell
    #[must_use]
    pub fn cell_id(&self) -> &str {
        &self.inner.cell_id
    }

    /// The controller's own channel bus
    #[must_use]
    pub fn bus(&self) -> &ChannelBus {
        &self.inner.bus
    }

    /// The channel shared by everything in this cell
    #[must_use]
    pub fn cell_bus(&self) -> &ChannelBus {
        &self.inner.cell_bus
    }

    /// Bus of a mounted widget, by [`WidgetKind::name`]
    #[must_use]
    pub fn widget_bus(&self, name: &str) -> Option<ChannelBus> {
        self.inner.widgets.lock().get(name).map(|w| w.bus.clone())
    }

    /// Token cancelled when the cell goes away
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    /// Tear the controller down
    ///
    /// Cancels background work and removes every listener it registered.
    pub fn stop(&self) {
        self.inner.cancel.cancel();
        self.stop_listening_for_jobs();
        let ids: Vec<ListenerId> = self.inner.listeners.lock().drain(..).collect();
        for id in ids {
            self.inner.ctx.bus.remove_listener(id);
        }
        tracing::debug!(cell = %self.inner.cell_id, "controller stopped");
    }
}

/// Log the outcome of a bus-driven operation
fn report<T>(what: &'static str, outcome: Result<T>) {
    if let Err(err) = outcome {
        if err.is_fatal() {
            tracing::error!(operation = what, error = %err, "operation failed");
        } else {
            tracing::warn!(operation = what, error = %err, "operation failed");
        }
    }
}
