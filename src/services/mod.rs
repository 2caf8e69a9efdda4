pub mod download_service;
pub mod execution_service;
pub mod upload_service;

pub use download_service::ResultDownloader;
pub use execution_service::{
    CallbackHandler, ExecutionClient, ExecutionHandler, ExecutionSnapshot, ExecutionState,
    JobBackend,
};
pub use upload_service::{UploadFile, Uploader};
