//! # App Cell Core
//!
//! Orchestration of a notebook app cell:
//! - the app cell state table ([`app_states`]) over [`AppState`]
//! - the persisted [`CellModel`]
//! - app specifications, parameter validation and export
//! - mapping of launch and job status events onto states
//! - the [`AppCellController`] driving all of the above
//!
//! ```
//! use appcell_core::{AppState, ParamsStatus};
//! use appcell_fsm::StateKey;
//!
//! let tag = AppState::Editing(ParamsStatus::Complete).tag();
//! assert_eq!(tag.get("code"), Some("built"));
//! ```

pub mod app;
pub mod app_state;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod model;
pub mod params;
pub mod telemetry;

pub use app::{AppRef, AppTag};
pub use app_state::{app_states, AppState, ParamsStatus, Stage, ALL_STATES};
pub use collaborators::{
    CellContext, CodeBuilder, Confirmation, DefaultCodeBuilder, MethodCatalog, NotebookHost,
    ObjectInfo, OutputCellRequest, UiSurface, Widget, WidgetFactory, WidgetKind, WorkspaceClient,
};
pub use config::AppCellConfig;
pub use controller::{AppCellController, Setting};
pub use error::{AppCellError, Diagnosis, RemoteServiceError, Result, ValidationIssue};
pub use events::{JobStatus, JobStatusMessage, LaunchEvent, LaunchPhase};
pub use model::{CellModel, PropPath};
pub use params::{AppInfo, AppSpec, AppWidgets, DataType, OutputParam, ParameterSpec};
pub use telemetry::{init_tracing, LogFormat};
