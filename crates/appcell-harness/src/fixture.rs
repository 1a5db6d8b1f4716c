//! A controller wired to in-memory collaborators

use crate::fakes::{FakeCatalog, FakeHost, FakeWorkspace, RecordingUi, RecordingWidgetFactory};
use anyhow::Context;
use appcell_bus::{Channel, Key, MessageBus, MessageKind, SendOptions};
use appcell_core::{
    AppCellConfig, AppCellController, AppRef, AppSpec, AppState, CellContext, DefaultCodeBuilder,
    WidgetKind,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Builder of a [`CellFixture`]
#[derive(Debug)]
pub struct FixtureBuilder {
    spec: AppSpec,
    app: AppRef,
    metadata: Option<Value>,
    config: AppCellConfig,
    failing_widget: Option<&'static str>,
}

impl FixtureBuilder {
    /// Cell running the app described by `spec`
    ///
    /// # Errors
    ///
    /// The spec's id cannot form a dev app reference.
    pub fn new(spec: AppSpec) -> anyhow::Result<Self> {
        let app = AppRef::canonical(spec.info.id.clone(), "dev", None)?;
        Ok(Self {
            spec,
            app,
            metadata: None,
            config: AppCellConfig::default(),
            failing_widget: None,
        })
    }

    /// Load the cell from saved metadata
    #[must_use]
    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Controller settings
    #[must_use]
    pub fn config(mut self, config: AppCellConfig) -> Self {
        self.config = config;
        self
    }

    /// Make one widget fail to load
    #[must_use]
    pub fn failing_widget(mut self, widget: &'static str) -> Self {
        self.failing_widget = Some(widget);
        self
    }

    /// Wire the controller; it is neither initialised nor run yet
    ///
    /// # Errors
    ///
    /// The controller could not be built.
    pub fn build(self) -> anyhow::Result<CellFixture> {
        let bus = MessageBus::new();
        let mut host = FakeHost::new("cell-1");
        if let Some(metadata) = self.metadata {
            host = host.with_metadata(metadata);
        }
        let host = Arc::new(host);
        let catalog = Arc::new(FakeCatalog::new().with_spec(self.spec));
        let workspace = Arc::new(FakeWorkspace::new());
        let widgets = Arc::new(RecordingWidgetFactory::new());
        if let Some(widget) = self.failing_widget {
            widgets.fail_on(widget);
        }
        let ui = Arc::new(RecordingUi::new());

        let controller = AppCellController::new(CellContext {
            bus: bus.clone(),
            host: Arc::clone(&host) as _,
            catalog: Arc::clone(&catalog) as _,
            workspace: Arc::clone(&workspace) as _,
            widgets: Arc::clone(&widgets) as _,
            code: Arc::new(DefaultCodeBuilder),
            ui: Arc::clone(&ui) as _,
            config: self.config,
        })
        .context("building the controller")?;

        Ok(CellFixture {
            bus,
            app: self.app,
            host,
            catalog,
            workspace,
            widgets,
            ui,
            controller,
        })
    }
}

/// Controller plus the fakes it talks to
#[derive(Debug)]
pub struct CellFixture {
    /// Root bus
    pub bus: MessageBus,
    /// App the cell runs
    pub app: AppRef,
    /// Notebook host
    pub host: Arc<FakeHost>,
    /// Method catalog
    pub catalog: Arc<FakeCatalog>,
    /// Workspace
    pub workspace: Arc<FakeWorkspace>,
    /// Widget factory
    pub widgets: Arc<RecordingWidgetFactory>,
    /// Rendered surface
    pub ui: Arc<RecordingUi>,
    /// The cell under test
    pub controller: AppCellController,
}

impl CellFixture {
    /// Initialise the controller and load the app
    ///
    /// # Errors
    ///
    /// Initialisation or loading failed.
    pub async fn load(&self) -> anyhow::Result<AppState> {
        self.controller.init()?;
        let state = self.controller.run(self.app.clone()).await?;
        Ok(state)
    }

    /// Current state
    ///
    /// # Panics
    ///
    /// Before `load`.
    #[must_use]
    pub fn state(&self) -> AppState {
        match self.controller.current_state() {
            Ok(state) => state,
            Err(err) => panic!("controller not started: {err}"),
        }
    }

    /// Edit a parameter through the input widget
    pub fn set_parameter(&self, parameter: &str, value: Value) {
        if let Some(bus) = self.controller.widget_bus(WidgetKind::ParamsInput(String::new()).name()) {
            bus.emit(
                MessageKind::ParameterChanged,
                json!({ "parameter": parameter, "newValue": value }),
            );
        }
    }

    /// Push a launch event on the cell channel
    pub fn launch(&self, event: &str, job_id: Option<&str>) {
        self.controller.cell_bus().emit(
            MessageKind::RunStatus,
            json!({ "event": event, "jobId": job_id, "runId": "run-1" }),
        );
    }

    /// Push a job status on the job channel
    pub fn job_status(&self, job_id: &str, status: &str, extra: Value) {
        let mut job_state = json!({ "job_id": job_id, "job_state": status });
        if let (Some(state), Value::Object(extra)) = (job_state.as_object_mut(), extra) {
            state.extend(extra);
        }
        self.send_job(job_id, MessageKind::JobStatus, json!({ "jobState": job_state }));
    }

    /// Push a job status carrying output widget info
    pub fn job_status_with_widget(&self, job_id: &str, status: &str, widget: &str) {
        self.send_job(
            job_id,
            MessageKind::JobStatus,
            json!({
                "jobState": { "job_id": job_id, "job_state": status },
                "outputWidgetInfo": { "name": widget },
            }),
        );
    }

    /// Report the job as deleted
    pub fn job_deleted(&self, job_id: &str) {
        self.send_job(job_id, MessageKind::JobDeleted, json!({ "jobId": job_id }));
    }

    fn send_job(&self, job_id: &str, kind: MessageKind, payload: Value) {
        self.bus.send(
            payload,
            SendOptions::keyed(Key::kind(kind)).on_channel(Channel::job(job_id)),
        );
    }

    /// Press a cell button
    pub fn click(&self, kind: MessageKind) {
        self.controller.bus().emit(kind, json!({}));
    }

    /// Let spawned work run
    pub async fn settle(&self) {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
    }
}
