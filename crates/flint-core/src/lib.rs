#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "flint-core: 延迟装配服务器生命周期协调框架的核心契约层。"]
#![doc = ""]
#![doc = "本 crate 只定义边界：错误域、处理器与服务器契约、生命周期事件、"]
#![doc = "结构化日志与装配配置；协调器与具体服务器实现分别位于"]
#![doc = "`flint-bootstrap` 与 `flint-server-tcp`。"]

#[cfg(not(feature = "alloc"))]
compile_error!(
    "flint-core 依赖堆分配能力：请启用默认特性或通过 `--features alloc` 显式打开该功能。",
);

#[cfg(feature = "alloc")]
extern crate alloc;

pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod observe;
pub mod server;

pub use config::BootstrapOptions;
pub use error::{CoreError, ErrorCategory, ErrorCause, Result, codes};
pub use event::{ContextId, LifecycleEventSink, NoopEventSink, ServerInitializedEvent};
pub use handler::{FnHandler, HandlerProvider, HandlerRequest, HandlerResponse, RequestHandler};
pub use observe::{
    FieldValue, LogField, LogRecord, LogSeverity, Logger, NoopLogger, keys as log_keys,
};
pub use server::{ServerFactory, ServerHandle};
