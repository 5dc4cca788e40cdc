//! 生命周期通知契约：服务器成功启动后对外发布一次结构化事件。
//!
//! # 模块定位（Why）
//! - 宿主应用常需要在服务器就绪后执行注册、探活上报等动作，轮询句柄状态
//!   既笨拙又易错；
//! - 事件载荷固定为“运行中的服务器句柄 + 上下文身份”，订阅方不需要反查
//!   协调器内部状态。
//!
//! # 行为约定（How）
//! - 每次成功启动恰好发布一次；刷新失败、未配置服务器或停机路径均不发布；
//! - 汇点实现不得阻塞启动线程，耗时动作应自行转移到其他执行单元。

use alloc::{borrow::Cow, sync::Arc};
use core::fmt;

use crate::server::ServerHandle;

/// 协调器实例的身份标签。
///
/// # 契约说明（What）
/// - 仅用于事件载荷与日志的归属标识，不承担同步或一致性职责；
/// - 克隆廉价，静态名称零分配。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(Cow<'static, str>);

impl ContextId {
    /// 以任意字符串构造身份标签。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// 借用名称。
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 服务器成功启动的一次性通知载荷。
///
/// # 契约说明（What）
/// - `server`：运行中的服务器句柄，订阅方可即时查询监听地址；
/// - `context`：发布方协调器的身份标签；
/// - 事件在处理器发布且服务器开始接收连接之后才会出现。
#[derive(Clone)]
pub struct ServerInitializedEvent {
    server: Arc<dyn ServerHandle>,
    context: ContextId,
}

impl ServerInitializedEvent {
    /// 构造通知载荷。
    pub fn new(server: Arc<dyn ServerHandle>, context: ContextId) -> Self {
        Self { server, context }
    }

    /// 运行中的服务器句柄。
    pub fn server(&self) -> &Arc<dyn ServerHandle> {
        &self.server
    }

    /// 发布方身份。
    pub fn context(&self) -> &ContextId {
        &self.context
    }
}

// 句柄本身不要求 `Debug`，以监听地址代替句柄内容展示。
impl fmt::Debug for ServerInitializedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerInitializedEvent")
            .field("local_addr", &self.server.local_addr())
            .field("context", &self.context)
            .finish()
    }
}

/// 生命周期事件汇点。
///
/// # 设计背景（Why）
/// - 协调器只负责“发布一次”，分发、过滤与持久化由宿主的汇点实现决定；
/// - 契约保持对象安全，以 `Arc<dyn LifecycleEventSink>` 注入。
pub trait LifecycleEventSink: Send + Sync + 'static {
    /// 接收一次服务器就绪通知。
    fn publish(&self, event: &ServerInitializedEvent);
}

/// 丢弃所有通知的默认汇点。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventSink;

impl LifecycleEventSink for NoopEventSink {
    fn publish(&self, _event: &ServerInitializedEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use alloc::{boxed::Box, format, string::ToString};
    use core::net::SocketAddr;

    /// 固定返回一个监听地址的句柄桩。
    struct AddrOnlyServer;

    impl crate::server::ServerHandle for AddrOnlyServer {
        fn start(&self) -> Result<()> {
            Ok(())
        }

        fn stop(&self) -> Result<()> {
            Ok(())
        }

        fn local_addr(&self) -> Option<SocketAddr> {
            "127.0.0.1:4100".parse().ok()
        }
    }

    #[test]
    fn context_id_displays_its_name() {
        let id = ContextId::new("edge-context");
        assert_eq!(id.to_string(), "edge-context");
        assert_eq!(id.as_str(), "edge-context");
    }

    #[test]
    fn event_debug_renders_address_instead_of_handle() {
        let server: Arc<dyn ServerHandle> = Arc::new(AddrOnlyServer);
        let event = ServerInitializedEvent::new(server, ContextId::new("ctx"));
        let rendered = format!("{event:?}");
        assert!(
            rendered.contains("127.0.0.1:4100"),
            "Debug 输出应以监听地址代替句柄内容，实际：{rendered}"
        );
        assert!(rendered.contains("ctx"));
    }

    #[test]
    fn event_exposes_payload_accessors() {
        let server: Arc<dyn ServerHandle> = Arc::new(AddrOnlyServer);
        let event = ServerInitializedEvent::new(Arc::clone(&server), ContextId::new("ctx"));
        assert_eq!(event.server().port(), Some(4100));
        assert_eq!(event.context().as_str(), "ctx");
        let _: Box<dyn LifecycleEventSink> = Box::new(NoopEventSink);
    }
}
