pub mod execution;

pub use execution::{
    ActionInfo, CommandRequest, CommandResponse, ExecuteAccepted, ExecuteRequest,
    ExecutionResult, JobStatus, JobStatusResponse, UploadResponse,
};
