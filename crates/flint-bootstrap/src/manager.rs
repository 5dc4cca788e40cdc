//! 服务器管理器：在处理器尚不存在时先构造服务器，启动期再完成绑定。
//!
//! # 模块定位（Why）
//! - 服务器工厂需要一个处理器才能完成构造，而真正的处理器要等宿主装配
//!   收尾后才能解析——两者构成循环依赖；
//! - 解法是引入稳定的处理器外观 [`DeferredHandler`]：服务器始终持有外观，
//!   外观内部的委托目标在启动阶段被原子替换。
//!
//! # 顺序不变式（What）
//! - [`ServerManager::start`] 先发布处理器、后启动服务器，任何急切分发的
//!   请求都不可能观察到未初始化哨兵；
//! - 懒模式下发布的是懒初始化包装器，首个请求仍可能承担解析延迟。

use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use flint_core::{
    BootstrapOptions, CoreError, HandlerProvider, HandlerRequest, HandlerResponse, RequestHandler,
    Result, ServerFactory, ServerHandle, codes,
};

use crate::lazy::LazyHandler;

/// 外观内部的委托目标。
///
/// 之所以引入该中间层：`ArcSwap` 要求存放定长类型，胖指针
/// `Arc<dyn RequestHandler>` 无法直接充当槽位，于是把“未初始化/就绪”
/// 两态封装为枚举再整体换入。
enum HandlerBinding {
    /// 未初始化哨兵：收到请求立即以稳定错误码快速失败。
    Uninitialized,
    /// 已就绪：所有请求委托给最终处理器。
    Ready(Arc<dyn RequestHandler>),
}

/// 可延迟发布委托目标的处理器外观。
///
/// # 设计背景（Why）
/// - 服务器构造期拿到的就是本外观，外观地址自始至终稳定，循环依赖由此
///   打破；
/// - 委托槽位由 `ArcSwap` 承载：启动线程一次写入（release），分发任务
///   随时读取（acquire），读者绝不会观察到半构造的处理器。
///
/// # 契约说明（What）
/// - **初态**：未初始化哨兵；此时任何请求以 `handler.uninitialized` 失败，
///   这是协议约定的快速失败，不是缺陷；
/// - **发布**：[`publish`](Self::publish) 至多被启动流程调用一次；
/// - **并发**：单写多读；读路径无锁。
pub struct DeferredHandler {
    binding: ArcSwap<HandlerBinding>,
}

impl DeferredHandler {
    /// 创建外观，初始委托目标为未初始化哨兵。
    pub fn new() -> Self {
        Self {
            binding: ArcSwap::from_pointee(HandlerBinding::Uninitialized),
        }
    }

    /// 发布最终处理器，替换哨兵。
    pub fn publish(&self, handler: Arc<dyn RequestHandler>) {
        self.binding.store(Arc::new(HandlerBinding::Ready(handler)));
    }

    /// 返回当前委托目标；哨兵在位时为 `None`。供内省与测试使用。
    pub fn current(&self) -> Option<Arc<dyn RequestHandler>> {
        match &*self.binding.load_full() {
            HandlerBinding::Uninitialized => None,
            HandlerBinding::Ready(handler) => Some(Arc::clone(handler)),
        }
    }
}

impl Default for DeferredHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for DeferredHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DeferredHandler")
            .field("bound", &self.current().is_some())
            .finish()
    }
}

#[async_trait]
impl RequestHandler for DeferredHandler {
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        let binding = self.binding.load_full();
        match &*binding {
            HandlerBinding::Uninitialized => Err(CoreError::new(
                codes::HANDLER_UNINITIALIZED,
                "处理器尚未完成装配，请求被快速失败",
            )),
            HandlerBinding::Ready(handler) => handler.handle(request).await,
        }
    }
}

/// 处理器激活策略。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerActivation {
    /// 启动阶段同步解析处理器，失败中止启动。
    Eager,
    /// 解析延迟到首个请求，由 [`LazyHandler`] 记忆化。
    Lazy,
}

impl HandlerActivation {
    /// 从装配选项推导激活策略。
    pub fn from_options(options: &BootstrapOptions) -> Self {
        if options.lazy_handler_init {
            HandlerActivation::Lazy
        } else {
            HandlerActivation::Eager
        }
    }
}

/// 服务器管理器：独占服务器句柄与处理器外观，串联“构造 → 启动 → 停机”。
///
/// # 契约说明（What）
/// - **构造**：[`new`](Self::new) 先装好哨兵外观，再请工厂以外观为处理器
///   生产服务器；工厂失败原样传出，此时没有任何监听资源需要回收；
/// - **启动**：[`start`](Self::start) 按激活策略发布处理器，随后启动服务器；
///   发布严格先于启动；
/// - **停机**：[`stop`](Self::stop) 消耗管理器本体，底层停机失败被翻译为
///   `server.shutdown_unrecoverable` 并挂载原因；
/// - **并发**：构造/启动/停机均由单一初始化线程调用，外观的读路径才是
///   多线程热点。
pub struct ServerManager {
    server: Arc<dyn ServerHandle>,
    facade: Arc<DeferredHandler>,
    activation: HandlerActivation,
}

impl ServerManager {
    /// 以工厂与激活策略构造管理器。
    pub fn new(factory: &dyn ServerFactory, activation: HandlerActivation) -> Result<Self> {
        let facade = Arc::new(DeferredHandler::new());
        let server = factory.produce(Arc::clone(&facade) as Arc<dyn RequestHandler>)?;
        Ok(Self {
            server: Arc::from(server),
            facade,
            activation,
        })
    }

    /// 发布处理器并启动服务器。
    ///
    /// # 错误语义（What）
    /// - 急切模式下解析闭包的失败原样传出，服务器不会被启动；
    /// - 服务器启动失败同样原样传出，协调器负责兜底停机。
    pub fn start(&self, provider: HandlerProvider) -> Result<()> {
        match self.activation {
            HandlerActivation::Eager => {
                let handler = provider()?;
                self.facade.publish(handler);
            }
            HandlerActivation::Lazy => {
                self.facade.publish(Arc::new(LazyHandler::new(provider)));
            }
        }
        self.server.start()
    }

    /// 停止服务器。消耗管理器：停机后句柄不可复用。
    pub fn stop(self) -> Result<()> {
        self.server.stop().map_err(|err| {
            CoreError::new(
                codes::SERVER_SHUTDOWN_UNRECOVERABLE,
                "底层服务器停机失败，进程已处于不可恢复状态",
            )
            .with_cause(err)
        })
    }

    /// 当前服务器句柄。
    pub fn server(&self) -> Arc<dyn ServerHandle> {
        Arc::clone(&self.server)
    }

    /// 处理器外观，亦即服务器实际持有的请求入口。
    pub fn handler(&self) -> Arc<dyn RequestHandler> {
        Arc::clone(&self.facade) as Arc<dyn RequestHandler>
    }

    /// 外观本体，供测试检查绑定状态。
    pub fn facade(&self) -> &Arc<DeferredHandler> {
        &self.facade
    }

    /// 当前激活策略。
    pub fn activation(&self) -> HandlerActivation {
        self.activation
    }
}

impl core::fmt::Debug for ServerManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ServerManager")
            .field("activation", &self.activation)
            .field("local_addr", &self.server.local_addr())
            .field("facade", &self.facade)
            .finish()
    }
}
