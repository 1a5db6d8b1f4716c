//! External collaborators
//!
//! Everything a cell needs from its surroundings is reached through these
//! traits and handed to the controller in a [`CellContext`].

use crate::app::AppRef;
use crate::config::AppCellConfig;
use crate::error::RemoteServiceError;
use crate::params::AppSpec;
use appcell_bus::{ChannelBus, MessageBus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Notebook host owning the cell
///
/// Calls are synchronous side effects on the document.
pub trait NotebookHost: Send + Sync {
    /// Id stored in the cell attributes
    fn cell_id(&self) -> String;

    /// The cell's `appCell` metadata blob
    fn load_metadata(&self) -> Value;

    /// Replace the cell's `appCell` metadata blob
    fn store_metadata(&self, data: &Value);

    /// Set a cell attribute such as `title` or `info.url`
    fn set_attribute(&self, path: &str, value: Value);

    /// Replace the cell's code
    fn set_code(&self, code: &str);

    /// Execute the cell
    fn execute(&self);

    /// Insert an output cell below this one; returns its id
    fn insert_output_cell(&self, request: &OutputCellRequest) -> String;

    /// Whether a cell with this id still exists
    fn cell_exists(&self, cell_id: &str) -> bool;

    /// Remove this cell from the document
    fn delete_cell(&self);

    /// Save a checkpoint of the document
    fn save_checkpoint(&self);
}

/// Description of an output cell to insert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputCellRequest {
    /// Id of the new cell
    pub cell_id: String,
    /// Id of the app cell
    pub parent_cell_id: String,
    /// Job whose output is shown
    pub job_id: String,
    /// Output widget info reported by the job
    pub widget: Option<Value>,
}

/// Method catalog
#[async_trait::async_trait]
pub trait MethodCatalog: Send + Sync {
    /// Specification of an app
    async fn get_app_spec(&self, app: &AppRef) -> Result<AppSpec, RemoteServiceError>;
}

/// Object metadata from the workspace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    /// Workspace id
    pub ws_id: u64,
    /// Object id
    pub obj_id: u64,
    /// Object version
    pub version: u64,
    /// Object name
    pub name: String,
}

impl ObjectInfo {
    /// Absolute `ws/obj/ver` reference
    #[must_use]
    pub fn reference(&self) -> String {
        format!("{}/{}/{}", self.ws_id, self.obj_id, self.version)
    }
}

/// Workspace service
#[async_trait::async_trait]
pub trait WorkspaceClient: Send + Sync {
    /// Info for each named object; `None` where the object does not exist
    async fn get_object_info(
        &self,
        names: &[String],
    ) -> Result<Vec<Option<ObjectInfo>>, RemoteServiceError>;
}

/// Sub-widgets mounted by a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WidgetKind {
    /// Parameter inputs, rendered by the named module
    ParamsInput(String),
    /// Read-only parameter view
    ParamsDisplay,
    /// Execution status
    Exec,
    /// Job output
    Output,
}

impl WidgetKind {
    /// Name used in logs and state messages
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ParamsInput(_) => "paramsInputWidget",
            Self::ParamsDisplay => "paramsDisplayWidget",
            Self::Exec => "execWidget",
            Self::Output => "outputWidget",
        }
    }

    /// Panel the widget is mounted in
    #[must_use]
    pub fn mount_point(&self) -> &'static str {
        match self {
            Self::ParamsInput(_) => "parameters-group.widget",
            Self::ParamsDisplay => "parameters-display-group.widget",
            Self::Exec => "exec-group.widget",
            Self::Output => "output-group.widget",
        }
    }
}

/// A mounted sub-widget
///
/// It talks to the cell only through the channel bus it was built with and
/// must handle at least `run`, `stop` and `reset`.
pub trait Widget: Send + Sync {
    /// Register the widget's bus listeners
    fn start(&self);

    /// Remove the widget's bus listeners
    ///
    /// Used when the widget is replaced on a channel it shares with its
    /// successor.
    fn stop(&self) {}
}

/// Builds sub-widgets
pub trait WidgetFactory: Send + Sync {
    /// Build a widget bound to `bus`
    ///
    /// # Errors
    ///
    /// A message describing why the widget could not be loaded.
    fn make(&self, kind: &WidgetKind, bus: ChannelBus) -> Result<Arc<dyn Widget>, String>;
}

/// Generates the program executed by the cell
pub trait CodeBuilder: Send + Sync {
    /// Source text running `app` with `params`
    fn build(&self, cell_id: &str, run_id: Uuid, app: &AppRef, params: &Map<String, Value>)
        -> String;
}

/// Builds a single app-runner call
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCodeBuilder;

impl CodeBuilder for DefaultCodeBuilder {
    fn build(
        &self,
        cell_id: &str,
        run_id: Uuid,
        app: &AppRef,
        params: &Map<String, Value>,
    ) -> String {
        let params = serde_json::to_string_pretty(params).unwrap_or_else(|_| "{}".to_string());
        let version = app
            .version
            .as_deref()
            .map_or_else(|| "None".to_string(), |v| format!("{v:?}"));
        format!(
            "from appcell.runner import run_app\nrun_app(\n    {id:?},\n    {params},\n    tag={tag:?},\n    version={version},\n    cell_id={cell_id:?},\n    run_id={run_id:?}\n)",
            id = app.id,
            tag = app.tag.as_str(),
            run_id = run_id.to_string(),
        )
    }
}

/// Text of a confirmation dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    /// Dialog title
    pub title: String,
    /// Body text
    pub message: String,
    /// Accept label
    pub yes: String,
    /// Decline label
    pub no: String,
}

impl Confirmation {
    /// Yes/No dialog
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            yes: "Yes".to_string(),
            no: "No".to_string(),
        }
    }
}

/// The cell's rendered surface
#[async_trait::async_trait]
pub trait UiSurface: Send + Sync {
    /// Make a control pressable
    fn enable_button(&self, name: &str);
    /// Show a control inert
    fn disable_button(&self, name: &str);
    /// Remove a control from view
    fn hide_button(&self, name: &str);
    /// Show a panel
    fn show_element(&self, name: &str);
    /// Hide a panel
    fn hide_element(&self, name: &str);
    /// Replace the content of a panel slot
    fn set_content(&self, path: &str, content: &str);
    /// Ask the user; resolves to whether they accepted
    async fn confirm(&self, confirmation: Confirmation) -> bool;
}

/// Everything a cell controller depends on
#[derive(Clone)]
pub struct CellContext {
    /// Root bus shared by every cell of the document
    pub bus: MessageBus,
    /// Notebook host
    pub host: Arc<dyn NotebookHost>,
    /// Method catalog
    pub catalog: Arc<dyn MethodCatalog>,
    /// Workspace service
    pub workspace: Arc<dyn WorkspaceClient>,
    /// Sub-widget factory
    pub widgets: Arc<dyn WidgetFactory>,
    /// Program generator
    pub code: Arc<dyn CodeBuilder>,
    /// Rendered surface
    pub ui: Arc<dyn UiSurface>,
    /// Settings
    pub config: AppCellConfig,
}

impl fmt::Debug for CellContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellContext")
            .field("bus", &self.bus)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_reference() {
        let info = ObjectInfo {
            ws_id: 12,
            obj_id: 3,
            version: 1,
            name: "asm".into(),
        };
        assert_eq!(info.reference(), "12/3/1");
    }

    #[test]
    fn default_code_names_the_app_and_run() {
        let app = AppRef::canonical("Mod/assemble", "release", Some("1.2.0".into())).unwrap();
        let run_id = Uuid::new_v4();
        let mut params = Map::new();
        params.insert("k".into(), json!(21));

        let code = DefaultCodeBuilder.build("cell-1", run_id, &app, &params);

        assert!(code.contains("\"Mod/assemble\""));
        assert!(code.contains("version=\"1.2.0\""));
        assert!(code.contains(&run_id.to_string()));
        assert!(code.contains("\"k\": 21"));
    }
}
