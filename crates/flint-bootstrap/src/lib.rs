#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "flint-bootstrap: 服务器生命周期协调与延迟处理器装配。"]
#![doc = ""]
#![doc = "职责划分："]
#![doc = "- [`CapabilityRegistry`]：按“恰好一个候选”的策略解析服务器工厂与请求处理器；"]
#![doc = "- [`ServerManager`]：持有服务器句柄与可替换的处理器外观，先发布处理器再启动服务器；"]
#![doc = "- [`LazyHandler`]：把处理器解析延迟到首个请求，并发首触只产生一次解析；"]
#![doc = "- [`LifecycleCoordinator`]：驱动 刷新 → 创建 → 启动 → 停机 的阶段机，"]
#![doc = "  任何失败路径都保证兜底停机与管理器引用释放。"]

pub mod coordinator;
mod lazy;
mod manager;
pub mod registry;

pub use coordinator::{LifecycleCoordinator, LifecyclePhase};
pub use lazy::LazyHandler;
pub use manager::{DeferredHandler, HandlerActivation, ServerManager};
pub use registry::{CapabilityKind, CapabilityRegistrationError, CapabilityRegistry};
