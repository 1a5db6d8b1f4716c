//! # App Cell Harness
//!
//! In-memory stand-ins for everything an app cell talks to, a fixture wiring
//! them to an [`AppCellController`](appcell_core::AppCellController), and a
//! replay simulator driving the fixture from a JSON script.

pub mod fakes;
pub mod fixture;
pub mod simulator;

pub use fakes::{
    ButtonView, FakeCatalog, FakeHost, FakeWorkspace, RecordingUi, RecordingWidgetFactory,
    WidgetMessage,
};
pub use fixture::{CellFixture, FixtureBuilder};
pub use simulator::{run_script, Script, SimulationReport, Step, DEMO_SCRIPT};
