//! Ingestion and orchestration services.

pub mod catch_scanner;
pub mod coordinator;
pub mod decoration_index;
pub mod event_broadcaster;
pub mod measurement;
pub mod process;
pub mod results_xml;

pub use coordinator::{CoordinatorState, RunCoordinator};
pub use decoration_index::{Annotation, DecorationIndex};
pub use event_broadcaster::EventBroadcaster;
pub use process::{
    CancelFlag, ExecOptions, LoggingOutputConsumer, OutputConsumer, ProcessOutput, ProcessRunner,
    TokioProcessRunner,
};
