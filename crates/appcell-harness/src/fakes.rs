//! In-memory collaborators
//!
//! Each fake records what the controller asked of it so tests and the
//! simulator can inspect the outcome.

use appcell_bus::{ChannelBus, ListenerId, MessageKind};
use appcell_core::{
    AppRef, AppSpec, Confirmation, MethodCatalog, NotebookHost, ObjectInfo, OutputCellRequest,
    RemoteServiceError, UiSurface, Widget, WidgetFactory, WidgetKind, WorkspaceClient,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Notebook host keeping the document in memory
#[derive(Debug)]
pub struct FakeHost {
    cell_id: String,
    metadata: Mutex<Value>,
    attributes: Mutex<HashMap<String, Value>>,
    code: Mutex<String>,
    executions: AtomicUsize,
    output_cells: Mutex<Vec<OutputCellRequest>>,
    live_cells: Mutex<HashSet<String>>,
    deleted: AtomicBool,
    checkpoints: AtomicUsize,
}

impl FakeHost {
    /// Host of an empty cell
    pub fn new(cell_id: impl Into<String>) -> Self {
        Self {
            cell_id: cell_id.into(),
            metadata: Mutex::new(json!({})),
            attributes: Mutex::new(HashMap::new()),
            code: Mutex::new(String::new()),
            executions: AtomicUsize::new(0),
            output_cells: Mutex::new(Vec::new()),
            live_cells: Mutex::new(HashSet::new()),
            deleted: AtomicBool::new(false),
            checkpoints: AtomicUsize::new(0),
        }
    }

    /// Host of a cell saved with `metadata`
    #[must_use]
    pub fn with_metadata(self, metadata: Value) -> Self {
        *self.metadata.lock() = metadata;
        self
    }

    /// Stored metadata
    #[must_use]
    pub fn metadata(&self) -> Value {
        self.metadata.lock().clone()
    }

    /// Cell attribute
    #[must_use]
    pub fn attribute(&self, path: &str) -> Option<Value> {
        self.attributes.lock().get(path).cloned()
    }

    /// Current cell code
    #[must_use]
    pub fn code(&self) -> String {
        self.code.lock().clone()
    }

    /// Times the cell was executed
    #[must_use]
    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    /// Output cells inserted so far
    #[must_use]
    pub fn output_cells(&self) -> Vec<OutputCellRequest> {
        self.output_cells.lock().clone()
    }

    /// Simulate the user deleting a cell
    pub fn remove_cell(&self, cell_id: &str) -> bool {
        self.live_cells.lock().remove(cell_id)
    }

    /// Whether the app cell was deleted
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    /// Checkpoint saves so far
    #[must_use]
    pub fn checkpoints(&self) -> usize {
        self.checkpoints.load(Ordering::SeqCst)
    }
}

impl NotebookHost for FakeHost {
    fn cell_id(&self) -> String {
        self.cell_id.clone()
    }

    fn load_metadata(&self) -> Value {
        self.metadata.lock().clone()
    }

    fn store_metadata(&self, data: &Value) {
        *self.metadata.lock() = data.clone();
    }

    fn set_attribute(&self, path: &str, value: Value) {
        self.attributes.lock().insert(path.to_string(), value);
    }

    fn set_code(&self, code: &str) {
        *self.code.lock() = code.to_string();
    }

    fn execute(&self) {
        self.executions.fetch_add(1, Ordering::SeqCst);
    }

    fn insert_output_cell(&self, request: &OutputCellRequest) -> String {
        self.live_cells.lock().insert(request.cell_id.clone());
        self.output_cells.lock().push(request.clone());
        request.cell_id.clone()
    }

    fn cell_exists(&self, cell_id: &str) -> bool {
        self.live_cells.lock().contains(cell_id)
    }

    fn delete_cell(&self) {
        self.deleted.store(true, Ordering::SeqCst);
    }

    fn save_checkpoint(&self) {
        self.checkpoints.fetch_add(1, Ordering::SeqCst);
    }
}

/// Catalog serving fixed specifications
#[derive(Debug, Default)]
pub struct FakeCatalog {
    specs: Mutex<HashMap<String, AppSpec>>,
    requests: AtomicUsize,
}

impl FakeCatalog {
    /// Catalog without apps
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `spec` under its own id
    #[must_use]
    pub fn with_spec(self, spec: AppSpec) -> Self {
        self.specs.lock().insert(spec.info.id.clone(), spec);
        self
    }

    /// Lookups so far
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MethodCatalog for FakeCatalog {
    async fn get_app_spec(&self, app: &AppRef) -> Result<AppSpec, RemoteServiceError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.specs
            .lock()
            .get(&app.id)
            .cloned()
            .ok_or_else(|| RemoteServiceError::NotFound(format!("app {app}")))
    }
}

/// Workspace holding named objects
#[derive(Debug, Default)]
pub struct FakeWorkspace {
    objects: Mutex<HashMap<String, ObjectInfo>>,
    unavailable: AtomicBool,
}

impl FakeWorkspace {
    /// Empty workspace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object
    pub fn insert(&self, info: ObjectInfo) {
        self.objects.lock().insert(info.name.clone(), info);
    }

    /// Make every call fail with a transport error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl WorkspaceClient for FakeWorkspace {
    async fn get_object_info(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<ObjectInfo>>, RemoteServiceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RemoteServiceError::Transport(
                "workspace unavailable".to_string(),
            ));
        }
        let objects = self.objects.lock();
        Ok(names.iter().map(|name| objects.get(name).cloned()).collect())
    }
}

/// A message seen by a recording widget
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetMessage {
    /// Receiving widget
    pub widget: &'static str,
    /// Message kind
    pub kind: MessageKind,
    /// Payload
    pub payload: Value,
}

type Inbox = Arc<Mutex<Vec<WidgetMessage>>>;

const RECORDED: [MessageKind; 9] = [
    MessageKind::Run,
    MessageKind::Stop,
    MessageKind::Reset,
    MessageKind::Update,
    MessageKind::SyncAllParameters,
    MessageKind::ResetToDefaults,
    MessageKind::LaunchStatus,
    MessageKind::JobState,
    MessageKind::JobStateUpdated,
];

struct RecordingWidget {
    name: &'static str,
    bus: ChannelBus,
    inbox: Inbox,
    listeners: Mutex<Vec<ListenerId>>,
}

impl Widget for RecordingWidget {
    fn start(&self) {
        let mut listeners = self.listeners.lock();
        for kind in RECORDED {
            let inbox = Arc::clone(&self.inbox);
            let widget = self.name;
            let recorded = kind.clone();
            listeners.push(self.bus.on(kind, move |payload| {
                inbox.lock().push(WidgetMessage {
                    widget,
                    kind: recorded.clone(),
                    payload: payload.clone(),
                });
            }));
        }
    }

    fn stop(&self) {
        self.inbox.lock().push(WidgetMessage {
            widget: self.name,
            kind: MessageKind::Stop,
            payload: json!({}),
        });
        for id in self.listeners.lock().drain(..) {
            self.bus.remove_listener(id);
        }
    }
}

/// Factory of widgets that record every message they receive
#[derive(Default)]
pub struct RecordingWidgetFactory {
    inbox: Inbox,
    made: Mutex<Vec<WidgetKind>>,
    failing: Mutex<Option<&'static str>>,
}

impl RecordingWidgetFactory {
    /// Factory building working widgets
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to build the widget with this name
    pub fn fail_on(&self, widget: &'static str) {
        *self.failing.lock() = Some(widget);
    }

    /// Widgets built so far
    #[must_use]
    pub fn made(&self) -> Vec<WidgetKind> {
        self.made.lock().clone()
    }

    /// Messages received by `widget`
    #[must_use]
    pub fn received(&self, widget: &str) -> Vec<WidgetMessage> {
        self.inbox
            .lock()
            .iter()
            .filter(|m| m.widget == widget)
            .cloned()
            .collect()
    }

    /// Messages of one kind received by `widget`
    #[must_use]
    pub fn received_kind(&self, widget: &str, kind: &MessageKind) -> Vec<Value> {
        self.received(widget)
            .into_iter()
            .filter(|m| &m.kind == kind)
            .map(|m| m.payload)
            .collect()
    }
}

impl std::fmt::Debug for RecordingWidgetFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingWidgetFactory")
            .field("made", &self.made.lock().len())
            .field("received", &self.inbox.lock().len())
            .finish()
    }
}

impl WidgetFactory for RecordingWidgetFactory {
    fn make(&self, kind: &WidgetKind, bus: ChannelBus) -> Result<Arc<dyn Widget>, String> {
        if *self.failing.lock() == Some(kind.name()) {
            return Err(format!("module for {} failed to load", kind.name()));
        }
        self.made.lock().push(kind.clone());
        Ok(Arc::new(RecordingWidget {
            name: kind.name(),
            bus,
            inbox: Arc::clone(&self.inbox),
            listeners: Mutex::new(Vec::new()),
        }))
    }
}

/// How a button is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonView {
    /// Pressable
    Enabled,
    /// Shown but inert
    Disabled,
    /// Not shown
    Hidden,
}

/// UI surface keeping the last rendered view
#[derive(Debug, Default)]
pub struct RecordingUi {
    buttons: Mutex<HashMap<String, ButtonView>>,
    elements: Mutex<HashMap<String, bool>>,
    content: Mutex<HashMap<String, String>>,
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<Confirmation>>,
}

impl RecordingUi {
    /// Surface answering yes to every dialog
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer to the next unanswered dialog
    pub fn answer_next(&self, accept: bool) {
        self.answers.lock().push_back(accept);
    }

    /// Rendered state of a button
    #[must_use]
    pub fn button(&self, name: &str) -> Option<ButtonView> {
        self.buttons.lock().get(name).copied()
    }

    /// Whether a panel is shown; `None` when never rendered
    #[must_use]
    pub fn is_shown(&self, element: &str) -> Option<bool> {
        self.elements.lock().get(element).copied()
    }

    /// Content of a panel slot
    #[must_use]
    pub fn content(&self, path: &str) -> Option<String> {
        self.content.lock().get(path).cloned()
    }

    /// Dialogs shown so far
    #[must_use]
    pub fn asked(&self) -> Vec<Confirmation> {
        self.asked.lock().clone()
    }
}

#[async_trait::async_trait]
impl UiSurface for RecordingUi {
    fn enable_button(&self, name: &str) {
        self.buttons.lock().insert(name.to_string(), ButtonView::Enabled);
    }

    fn disable_button(&self, name: &str) {
        self.buttons.lock().insert(name.to_string(), ButtonView::Disabled);
    }

    fn hide_button(&self, name: &str) {
        self.buttons.lock().insert(name.to_string(), ButtonView::Hidden);
    }

    fn show_element(&self, name: &str) {
        self.elements.lock().insert(name.to_string(), true);
    }

    fn hide_element(&self, name: &str) {
        self.elements.lock().insert(name.to_string(), false);
    }

    fn set_content(&self, path: &str, content: &str) {
        self.content
            .lock()
            .insert(path.to_string(), content.to_string());
    }

    async fn confirm(&self, confirmation: Confirmation) -> bool {
        self.asked.lock().push(confirmation);
        self.answers.lock().pop_front().unwrap_or(true)
    }
}
