pub mod service;

pub use service::{
    forget_run_session, get_run_session, load_result, poll_run_events,
    run_reorganization_blocking, start_reorganization, ReorganizeRequest, RunSessionSnapshot,
    RunSessionStatus,
};
