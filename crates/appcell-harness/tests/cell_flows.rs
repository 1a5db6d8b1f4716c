//! End-to-end flows of one app cell against in-memory collaborators

use appcell_bus::{Channel, Key, MessageKind};
use appcell_core::app_state::{buttons, elements};
use appcell_core::{
    AppCellConfig, AppCellError, AppInfo, AppSpec, AppState, AppWidgets, DataType, ObjectInfo,
    ParameterSpec, ParamsStatus, Stage,
};
use appcell_harness::{ButtonView, CellFixture, FixtureBuilder};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const INPUT: &str = "paramsInputWidget";
const DISPLAY: &str = "paramsDisplayWidget";
const EXEC: &str = "execWidget";
const OUTPUT: &str = "outputWidget";

fn spec() -> AppSpec {
    AppSpec {
        info: AppInfo {
            id: "Assembly/run_megahit".into(),
            name: "Assemble reads".into(),
            subtitle: "Assemble metagenomic reads".into(),
            ..AppInfo::default()
        },
        parameters: vec![
            ParameterSpec::required("read_library").with_data_type(DataType::Workspaceobjectref),
            ParameterSpec::required("output_name").output_name(),
            ParameterSpec::optional("min_contig_length").with_data_type(DataType::Int),
        ],
        widgets: AppWidgets::default(),
    }
}

async fn loaded() -> CellFixture {
    let cell = FixtureBuilder::new(spec()).unwrap().build().unwrap();
    cell.load().await.unwrap();
    cell
}

async fn ready() -> CellFixture {
    let cell = loaded().await;
    cell.set_parameter("read_library", json!("reads_1"));
    cell.set_parameter("output_name", json!("assembly_1"));
    cell
}

async fn running(job_id: &str) -> CellFixture {
    let cell = ready().await;
    cell.click(MessageKind::RunApp);
    cell.launch("validating_app", None);
    cell.launch("launched_job", Some(job_id));
    cell.job_status(job_id, "queued", Value::Null);
    cell.job_status(job_id, "in-progress", Value::Null);
    cell
}

/// Collect payloads of one kind sent on the root bus
fn capture(cell: &CellFixture, kind: MessageKind) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    cell.bus.on(kind, move |payload| sink.lock().push(payload.clone()));
    seen
}

#[tokio::test]
async fn new_cell_loads_into_incomplete_editing() {
    let cell = loaded().await;

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Incomplete));
    assert_eq!(cell.ui.button(buttons::RUN_APP), Some(ButtonView::Disabled));
    assert_eq!(cell.ui.is_shown(elements::PARAMETERS_GROUP), Some(true));
    assert_eq!(cell.widgets.made().len(), 4);
    assert_eq!(cell.host.attribute("title"), Some(json!("Assemble reads")));
    assert_eq!(
        cell.host.attribute("info.url"),
        Some(json!("/#appcatalog/app/Assembly/run_megahit/dev"))
    );
    assert_eq!(cell.host.code(), "");
    assert_eq!(
        cell.widgets.received_kind(INPUT, &MessageKind::Run)[0]["parameters"][0]["id"],
        json!("read_library")
    );
    assert_eq!(
        cell.host.metadata()["fsm"]["currentState"],
        json!({"mode": "editing", "params": "incomplete"})
    );
}

#[tokio::test]
async fn validation_names_each_missing_parameter() {
    let cell = loaded().await;
    cell.set_parameter("read_library", json!("reads_1"));

    let Err(AppCellError::Validation(issues)) = cell.controller.validate_parameters() else {
        panic!("parameters should be incomplete");
    };
    let missing: Vec<&str> = issues.iter().map(|i| i.parameter.as_str()).collect();
    assert_eq!(missing, vec!["output_name"]);

    cell.set_parameter("output_name", json!("assembly_1"));
    let exported = cell.controller.validate_parameters().unwrap();
    assert_eq!(exported["read_library"], json!("reads_1"));
}

#[tokio::test]
async fn completing_parameters_enables_run() {
    let cell = ready().await;

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
    assert_eq!(cell.ui.button(buttons::RUN_APP), Some(ButtonView::Enabled));
    assert!(cell.host.code().contains("Assembly/run_megahit"));
    assert_eq!(
        cell.controller.model_value("params.output_name"),
        Some(json!("assembly_1"))
    );
}

#[tokio::test]
async fn clearing_a_required_parameter_disables_run() {
    let cell = ready().await;

    cell.set_parameter("read_library", json!(""));

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Incomplete));
    assert_eq!(cell.ui.button(buttons::RUN_APP), Some(ButtonView::Disabled));
    assert_eq!(cell.host.code(), "");
}

#[tokio::test]
async fn optional_parameter_does_not_block_run() {
    let cell = ready().await;
    cell.set_parameter("min_contig_length", Value::Null);
    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
}

#[tokio::test]
async fn run_button_executes_the_cell() {
    let cell = ready().await;
    cell.click(MessageKind::RunApp);
    assert_eq!(cell.host.executions(), 1);
}

#[tokio::test]
async fn job_flow_reaches_success_with_an_output_cell() {
    let cell = running("job-1").await;
    assert_eq!(cell.state(), AppState::Processing(Stage::Running));

    cell.job_status("job-1", "completed", json!({"result": {"report": "12/7/1"}}));
    cell.settle().await;

    assert_eq!(cell.state(), AppState::Success);
    assert_eq!(cell.ui.button(buttons::RE_RUN_APP), Some(ButtonView::Enabled));
    let outputs = cell.host.output_cells();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].job_id, "job-1");
    assert_eq!(
        cell.controller.model_value("output.byJob.job-1.cell.id"),
        Some(json!(outputs[0].cell_id))
    );
    assert_eq!(
        cell.controller.model_value("output.result"),
        Some(json!({"report": "12/7/1"}))
    );
    let updates = cell.widgets.received_kind(OUTPUT, &MessageKind::Update);
    assert_eq!(updates.last().unwrap()["jobState"]["job_state"], json!("completed"));
}

#[tokio::test]
async fn repeated_success_does_not_create_a_second_output_cell() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "completed", Value::Null);
    cell.controller.start_listening_for_job("job-1");
    cell.job_status("job-1", "completed", Value::Null);

    assert_eq!(cell.state(), AppState::Success);
    assert_eq!(cell.host.output_cells().len(), 1);
}

#[tokio::test]
async fn exec_widget_follows_launch_and_job_state() {
    let cell = running("job-1").await;

    let launches = cell.widgets.received_kind(EXEC, &MessageKind::LaunchStatus);
    assert_eq!(launches.len(), 2);
    assert_eq!(launches[1]["launchState"]["jobId"], json!("job-1"));
    let states = cell.widgets.received_kind(EXEC, &MessageKind::JobState);
    assert_eq!(states.len(), 2);

    let log = cell.controller.model_value("exec.log").unwrap();
    assert_eq!(log.as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn unchanged_job_state_is_only_acknowledged() {
    let cell = running("job-1").await;

    cell.job_status("job-1", "in-progress", Value::Null);

    let acks = cell
        .widgets
        .received_kind(EXEC, &MessageKind::JobStateUpdated);
    assert_eq!(acks, vec![json!({"jobId": "job-1"})]);
    assert!(cell.controller.model_value("exec.jobStateUpdated").is_some());
}

#[tokio::test]
async fn job_error_keeps_the_stage() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "error", Value::Null);
    assert_eq!(cell.state(), AppState::Error(Some(Stage::Running)));
}

#[tokio::test]
async fn launch_error_enters_launch_error_state() {
    let cell = ready().await;
    cell.launch("validating_app", None);
    cell.launch("error", None);
    assert_eq!(cell.state(), AppState::Error(Some(Stage::Launching)));
}

#[tokio::test]
async fn entering_launch_refreshes_the_display_widget() {
    let cell = ready().await;
    cell.launch("validating_app", None);
    assert_eq!(
        cell.widgets
            .received_kind(DISPLAY, &MessageKind::SyncAllParameters)
            .len(),
        1
    );
}

#[tokio::test]
async fn illegal_transition_halts_the_cell() {
    let cell = loaded().await;

    cell.launch("validating_app", None);

    assert!(cell.controller.is_halted());
    assert_eq!(cell.ui.is_shown(elements::FATAL_ERROR), Some(true));
    assert_eq!(cell.ui.is_shown(elements::PARAMETERS_GROUP), Some(false));
    assert!(cell.controller.model_value("fatalError.message").is_some());
    assert!(cell.controller.model_value("exec.launchState").is_none());
    assert!(matches!(
        cell.controller.evaluate_app_state(),
        Err(AppCellError::Halted)
    ));
}

#[tokio::test]
async fn unknown_job_status_halts_the_cell() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "exploded", Value::Null);

    assert!(cell.controller.is_halted());
    assert_eq!(
        cell.ui.content("fatal-error.title").as_deref(),
        Some("Internal error")
    );
}

#[tokio::test]
async fn halting_launch_leaves_no_job_subscription() {
    let cell = loaded().await;
    let job_states = Arc::new(Mutex::new(Vec::new()));
    {
        let sink = Arc::clone(&job_states);
        cell.controller
            .cell_bus()
            .on(MessageKind::JobState, move |m| sink.lock().push(m.clone()));
    }
    let listeners = cell.bus.listener_count();

    cell.launch("launched_job", Some("job-9"));
    assert!(cell.controller.is_halted());
    assert_eq!(cell.bus.listener_count(), listeners);

    cell.job_status("job-9", "queued", Value::Null);

    assert!(cell.controller.model_value("exec.jobState").is_none());
    assert!(cell.controller.model_value("exec.log").is_none());
    assert!(job_states.lock().is_empty());
}

#[tokio::test]
async fn halted_cell_ignores_further_job_events() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "exploded", Value::Null);
    assert!(cell.controller.is_halted());
    let before = cell.controller.model_value("exec");

    cell.job_status("job-1", "completed", Value::Null);
    cell.job_deleted("job-1");

    assert_eq!(cell.controller.model_value("exec"), before);
    assert!(matches!(
        cell.controller
            .handle_job_status(&json!({ "jobState": { "job_id": "job-1", "job_state": "queued" } })),
        Err(AppCellError::Halted)
    ));
    assert!(matches!(
        cell.controller.handle_launch_event(&json!({ "event": "launched_job", "jobId": "job-1" })),
        Err(AppCellError::Halted)
    ));
}

#[tokio::test]
async fn widget_load_failure_is_fatal() {
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .failing_widget(OUTPUT)
        .build()
        .unwrap();

    let err = cell.load().await.unwrap_err();
    let err = err.downcast::<AppCellError>().unwrap();

    assert!(matches!(err, AppCellError::FatalLoad(_)));
    assert_eq!(cell.state(), AppState::FatalError);
    assert!(cell.controller.notifications()[0].starts_with("Error loading main widgets"));
    assert_eq!(
        cell.ui.content("fatal-error.title").as_deref(),
        Some("Error loading main widgets")
    );
}

#[tokio::test]
async fn resume_emits_resume_messages() {
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .metadata(json!({"fsm": {"currentState": {"mode": "processing", "stage": "launching"}}}))
        .build()
        .unwrap();
    let synced = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&synced);
    cell.controller
        .bus()
        .on(MessageKind::SyncAllDisplayParameters, move |_| *counter.lock() += 1);

    let state = cell.controller.init().unwrap();

    assert_eq!(state, AppState::Processing(Stage::Launching));
    assert_eq!(*synced.lock(), 1);
}

#[tokio::test]
async fn resumed_running_cell_listens_for_its_job() {
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .metadata(json!({
            "fsm": {"currentState": {"mode": "processing", "stage": "running"}},
            "exec": {"jobState": {"job_id": "job-7", "job_state": "in-progress"}},
        }))
        .build()
        .unwrap();
    cell.load().await.unwrap();

    cell.job_status("job-7", "completed", Value::Null);

    assert_eq!(cell.state(), AppState::Success);
}

#[tokio::test]
async fn unknown_persisted_state_is_fatal() {
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .metadata(json!({"fsm": {"currentState": {"mode": "bogus"}}}))
        .build()
        .unwrap();

    assert!(cell.controller.init().is_err());
    assert_eq!(cell.state(), AppState::FatalError);
    assert!(cell.controller.is_halted());
}

#[tokio::test(start_paused = true)]
async fn checkpoint_saves_are_throttled() {
    let cell = ready().await;
    cell.click(MessageKind::RunApp);
    cell.launch("validating_app", None);
    cell.settle().await;
    assert_eq!(cell.host.checkpoints(), 0);

    tokio::time::advance(Duration::from_millis(5001)).await;
    cell.settle().await;
    assert_eq!(cell.host.checkpoints(), 1);

    cell.launch("launched_job", Some("job-1"));
    tokio::time::advance(Duration::from_millis(5001)).await;
    cell.settle().await;
    assert_eq!(cell.host.checkpoints(), 2);
}

#[tokio::test]
async fn save_window_comes_from_config() {
    let config = AppCellConfig::default().with_save_max_frequency(Duration::from_millis(10));
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .config(config)
        .build()
        .unwrap();
    cell.load().await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(cell.host.checkpoints(), 1);
}

#[tokio::test]
async fn cancel_without_job_returns_to_editing() {
    let cell = ready().await;
    cell.launch("validating_app", None);

    cell.click(MessageKind::Cancel);
    cell.settle().await;

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
    assert!(cell.controller.model_value("exec").is_none());
    assert_eq!(cell.ui.asked()[0].title, "Cancel Job?");
}

#[tokio::test]
async fn cancel_with_job_asks_the_backend() {
    let cell = running("job-1").await;
    let requests = capture(&cell, MessageKind::RequestJobCancellation);

    cell.click(MessageKind::Cancel);
    cell.settle().await;

    assert_eq!(*requests.lock(), vec![json!({"jobId": "job-1"})]);
    assert_eq!(cell.state(), AppState::Processing(Stage::Running));
}

#[tokio::test]
async fn declined_cancel_changes_nothing() {
    let cell = running("job-1").await;
    let requests = capture(&cell, MessageKind::RequestJobCancellation);
    cell.ui.answer_next(false);

    cell.click(MessageKind::Cancel);
    cell.settle().await;

    assert!(requests.lock().is_empty());
    assert_eq!(cell.state(), AppState::Processing(Stage::Running));
}

#[tokio::test]
async fn rerun_resets_to_edit_mode_and_reloads_exec() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "completed", Value::Null);

    cell.click(MessageKind::ReRunApp);
    cell.settle().await;

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
    assert!(cell.controller.model_value("exec").is_none());
    assert!(cell.controller.model_value("output.byJob.job-1").is_some());
    assert_eq!(cell.widgets.received_kind(EXEC, &MessageKind::Stop).len(), 1);
    assert_eq!(cell.widgets.received_kind(EXEC, &MessageKind::Run).len(), 2);
}

#[tokio::test]
async fn job_deleted_while_running_resets_the_cell() {
    let cell = running("job-1").await;

    cell.job_deleted("job-1");

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
    assert!(cell.controller.model_value("exec").is_none());
}

#[tokio::test]
async fn job_deleted_while_editing_is_ignored() {
    let cell = ready().await;
    cell.controller.start_listening_for_job("job-1");

    cell.job_deleted("job-1");

    assert_eq!(cell.state(), AppState::Editing(ParamsStatus::Complete));
    assert!(!cell.controller.is_halted());
}

#[tokio::test]
async fn remove_deletes_the_cell_and_stops_widgets() {
    let cell = running("job-1").await;
    let requests = capture(&cell, MessageKind::RequestJobCancellation);

    cell.click(MessageKind::Remove);
    cell.settle().await;

    assert!(cell.host.is_deleted());
    assert_eq!(requests.lock().len(), 1);
    for widget in [INPUT, DISPLAY, EXEC, OUTPUT] {
        assert_eq!(
            cell.widgets.received_kind(widget, &MessageKind::Stop).len(),
            1,
            "{widget}"
        );
    }
    assert!(cell.controller.cancellation_token().is_cancelled());

    cell.job_status("job-1", "completed", Value::Null);
    assert_eq!(cell.state(), AppState::Processing(Stage::Running));
}

#[tokio::test]
async fn removed_output_cell_is_forgotten() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "completed", Value::Null);
    let updates_before = cell.widgets.received_kind(OUTPUT, &MessageKind::Update).len();

    cell.controller
        .cell_bus()
        .emit(MessageKind::OutputCellRemoved, json!({"jobId": "job-1"}));

    assert!(cell.controller.model_value("output.byJob.job-1").is_none());
    assert_eq!(
        cell.widgets.received_kind(OUTPUT, &MessageKind::Update).len(),
        updates_before + 1
    );
}

#[tokio::test]
async fn missing_output_cell_raises_a_notification() {
    let cell = running("job-1").await;
    cell.job_status("job-1", "completed", Value::Null);
    let output_cell = cell.host.output_cells()[0].cell_id.clone();
    cell.host.remove_cell(&output_cell);

    cell.controller.do_on_success();

    assert_eq!(cell.host.output_cells().len(), 1);
    assert!(cell
        .controller
        .notifications()
        .iter()
        .any(|n| n.contains(&output_cell)));
}

#[tokio::test]
async fn no_display_output_skips_the_output_cell() {
    let cell = running("job-1").await;
    cell.job_status_with_widget("job-1", "completed", "no-display");
    assert_eq!(cell.state(), AppState::Success);
    assert!(cell.host.output_cells().is_empty());
}

#[tokio::test]
async fn output_objects_resolve_against_the_workspace() {
    let cell = running("job-1").await;
    cell.workspace.insert(ObjectInfo {
        ws_id: 12,
        obj_id: 3,
        version: 1,
        name: "assembly_1".into(),
    });

    let resolved = cell.controller.resolve_output_objects().await.unwrap();

    assert_eq!(
        resolved,
        vec![json!({"param": "output_name", "name": "assembly_1", "ref": "12/3/1"})]
    );
    assert_eq!(
        cell.controller.model_value("output.objects"),
        Some(json!(resolved))
    );
}

#[tokio::test]
async fn missing_output_object_raises_a_notification() {
    let cell = running("job-1").await;

    let resolved = cell.controller.resolve_output_objects().await.unwrap();

    assert!(resolved.is_empty());
    assert!(cell
        .controller
        .notifications()
        .iter()
        .any(|n| n.contains("assembly_1")));
}

#[tokio::test]
async fn workspace_failure_is_reported() {
    let cell = running("job-1").await;
    cell.workspace.set_unavailable(true);

    let err = cell.controller.resolve_output_objects().await.unwrap_err();

    assert!(matches!(err, AppCellError::RemoteService(_)));
    assert!(cell.controller.notifications()[0].contains("workspace unavailable"));
}

#[tokio::test]
async fn input_widget_can_request_a_parameter() {
    let cell = ready().await;
    let input = cell.controller.widget_bus(INPUT).unwrap();

    let reply = input
        .request(
            json!({"parameterName": "output_name"}),
            Key::kind(MessageKind::GetParameter),
        )
        .await
        .unwrap();

    assert_eq!(reply, json!({"value": "assembly_1"}));
}

#[tokio::test]
async fn display_widget_parameter_sync_sends_a_typed_update() {
    let cell = ready().await;
    let display = cell.controller.widget_bus(DISPLAY).unwrap();

    display.emit(MessageKind::ParameterSync, json!({"parameter": "read_library"}));

    let updates = cell.widgets.received_kind(DISPLAY, &MessageKind::Update);
    assert_eq!(
        updates,
        vec![json!({"parameter": "read_library", "value": "reads_1"})]
    );
}

#[tokio::test]
async fn reset_to_defaults_reaches_the_cell_bus() {
    let cell = ready().await;
    let seen = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&seen);
    cell.controller
        .bus()
        .on(MessageKind::ResetToDefaults, move |_| *counter.lock() += 1);

    cell.bus.emit(MessageKind::ResetToDefaults, json!({}));

    assert_eq!(*seen.lock(), 1);
}

#[tokio::test]
async fn settings_toggle_their_panels() {
    let cell = loaded().await;
    assert_eq!(cell.ui.is_shown("notifications"), Some(false));

    assert_eq!(cell.controller.toggle_setting("showNotifications"), Some(true));

    assert_eq!(cell.ui.is_shown("notifications"), Some(true));
    assert_eq!(
        cell.controller.model_value("user-settings.showNotifications"),
        Some(json!(true))
    );
    assert_eq!(cell.controller.setting("showDeveloper"), None);
}

#[tokio::test]
async fn developer_setting_needs_developer_mode() {
    let cell = FixtureBuilder::new(spec())
        .unwrap()
        .config(AppCellConfig::default().with_developer_mode(true))
        .build()
        .unwrap();
    cell.load().await.unwrap();

    assert_eq!(cell.controller.setting("showDeveloper"), Some(false));
    assert!(cell.controller.set_setting("showDeveloper", true));
    assert_eq!(cell.ui.is_shown("developer-options"), Some(true));
}

#[tokio::test]
async fn notifications_can_be_removed() {
    let cell = loaded().await;
    cell.controller.add_notification("first");
    cell.controller.add_notification("second");

    assert_eq!(cell.controller.remove_notification(0).as_deref(), Some("first"));
    assert_eq!(cell.controller.notifications(), vec!["second".to_string()]);
    assert_eq!(cell.controller.remove_notification(5), None);

    cell.controller.clear_notifications();
    assert_eq!(
        cell.ui.content("notifications.content").as_deref(),
        Some("There are currently no notifications")
    );
}

#[tokio::test]
async fn stop_removes_every_listener() {
    let cell = running("job-1").await;
    let before = cell.bus.listener_count();

    cell.controller.stop();

    assert!(cell.bus.listener_count() < before);
    cell.bus.send(
        json!({"jobState": {"job_id": "job-1", "job_state": "completed"}}),
        appcell_bus::SendOptions::keyed(Key::kind(MessageKind::JobStatus))
            .on_channel(Channel::job("job-1")),
    );
    assert_eq!(cell.state(), AppState::Processing(Stage::Running));
}
