pub mod exec_api;

pub use exec_api::{ExecApi, ExecCommand, ExecReply};
