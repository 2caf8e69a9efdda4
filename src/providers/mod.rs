pub mod eval_api;

pub use eval_api::EvalApiClient;
