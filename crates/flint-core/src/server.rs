//! 服务器句柄与工厂契约：生命周期协调只关心“何时启停、绑定哪个处理器”，
//! 监听模型、线程调度与加密握手均属实现层。
//!
//! # 模块定位（Why）
//! - 协调器与具体服务器实现（TCP、内存伪实现、测试探针）之间需要稳定边界；
//! - 工厂在处理器尚不存在时即可完成服务器构造，这是打破循环依赖的关键：
//!   传入的是可延迟发布的处理器外观，而非最终处理器。

use alloc::{boxed::Box, sync::Arc};
use core::fmt;
use core::net::SocketAddr;

use crate::{error::Result, handler::RequestHandler};

/// 网络服务器的不透明句柄。
///
/// # 契约说明（What）
/// - **生命周期**：由工厂创建后处于未启动态；`start` 至多成功一次；`stop`
///   至多产生一次实际停机；不支持重启；
/// - `local_addr` 仅在运行期间返回 `Some`，用于测试与事件载荷展示；
/// - **并发**：`start`/`stop` 由单一初始化线程调用，实现无需对二者的并发
///   重入做防护，但 `local_addr` 可能被任意线程查询。
///
/// # 错误语义（How）
/// - `start` 失败返回 `server.start_failed` 域的错误，协调器据此执行兜底
///   停机；
/// - `stop` 失败原样返回实现层错误，由管理器翻译为不可恢复停机错误。
pub trait ServerHandle: Send + Sync + 'static {
    /// 启动服务器并开始接收连接。
    fn start(&self) -> Result<()>;

    /// 停止服务器并释放监听资源。
    fn stop(&self) -> Result<()>;

    /// 返回当前监听地址；未启动或已停止时为 `None`。
    fn local_addr(&self) -> Option<SocketAddr>;

    /// 返回当前监听端口，便于日志与断言。
    fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }
}

/// 服务器工厂契约。
///
/// # 设计背景（Why）
/// - 服务器构造发生在处理器解析之前，工厂收到的 `handler` 是外观对象，
///   其内部委托目标会在启动阶段被替换；
/// - 工厂自身由能力注册表按“恰好一个候选”的策略选出，零个或多个候选均为
///   致命配置错误。
///
/// # 契约说明（What）
/// - **输入**：请求处理器外观，服务器必须把每个入站请求委托给它；
/// - **输出**：未启动的服务器句柄；
/// - **后置条件**：构造失败时不得遗留任何已绑定的监听资源。
pub trait ServerFactory: Send + Sync + 'static {
    /// 以给定的处理器外观构造一台未启动的服务器。
    fn produce(&self, handler: Arc<dyn RequestHandler>) -> Result<Box<dyn ServerHandle>>;
}

impl fmt::Debug for dyn ServerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn ServerFactory")
    }
}
