//! 生命周期协调器：围绕宿主初始化流程编排服务器的创建、启动与兜底停机。
//!
//! # 模块定位（Why）
//! - 服务器的启停必须嵌入更大的装配序列：先创建管理器、装配收尾时再绑定
//!   处理器并启动；序列中任何一步失败都不得遗留运行中的服务器；
//! - 协调器把“失败即兜底停机并释放引用”的清理规则集中在一处，避免各步骤
//!   自带易漏的清理分支。
//!
//! # 阶段机（What）
//! `Unstarted → ManagerCreated → Started → Stopped`，其中 `Stopped` 为终态；
//! `ManagerCreated → Started` 之间的任何异常都强制迁移到 `Stopped`。

use std::sync::Arc;

use flint_core::{
    BootstrapOptions, ContextId, CoreError, LifecycleEventSink, LogField, Logger, NoopEventSink,
    NoopLogger, Result, ServerHandle, ServerInitializedEvent, codes, log_keys,
};

use crate::manager::{HandlerActivation, ServerManager};
use crate::registry::CapabilityRegistry;

/// 协调器的生命周期阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// 尚未执行刷新。
    Unstarted,
    /// 管理器已创建，服务器已构造但未启动。
    ManagerCreated,
    /// 处理器已发布，服务器运行中。
    Started,
    /// 终态：服务器已停止（或刷新失败后被兜底停机），管理器引用已释放。
    Stopped,
}

impl LifecyclePhase {
    /// 返回用于日志字段的稳定名称。
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecyclePhase::Unstarted => "unstarted",
            LifecyclePhase::ManagerCreated => "manager_created",
            LifecyclePhase::Started => "started",
            LifecyclePhase::Stopped => "stopped",
        }
    }
}

/// 生命周期协调器。
///
/// # 设计背景（Why）
/// - 对应“应用上下文”的角色：驱动 构造管理器 → 装配收尾 → 启动 → 停机 的
///   固定序列，并把序列中的任何失败翻译为“保证停机并释放”；
/// - 能力解析委托给注册表，事件与日志经注入的汇点/后端输出，协调器自身
///   不绑定任何运行时。
///
/// # 契约说明（What）
/// - **唯一性**：任意时刻至多持有一个活跃管理器；
/// - **刷新**：[`refresh`](Self::refresh) 只允许在 `Unstarted` 阶段调用，
///   失败时先兜底停机再原样重抛原始错误——失败的刷新绝不遗留运行中的
///   服务器；
/// - **停机**：[`on_close`](Self::on_close) 幂等；无论底层停机成败，
///   管理器引用都先被释放；
/// - **查询**：[`server`](Self::server) 永不阻塞、永不失败。
pub struct LifecycleCoordinator {
    identity: ContextId,
    registry: Arc<CapabilityRegistry>,
    options: BootstrapOptions,
    phase: LifecyclePhase,
    manager: Option<ServerManager>,
    namespace: Option<String>,
    logger: Arc<dyn Logger>,
    events: Arc<dyn LifecycleEventSink>,
}

impl LifecycleCoordinator {
    /// 以身份标签、能力注册表与装配选项构造协调器。
    ///
    /// 日志后端与事件汇点默认丢弃输出，可在刷新前经 `with_*` 替换。
    pub fn new(
        identity: ContextId,
        registry: Arc<CapabilityRegistry>,
        options: BootstrapOptions,
    ) -> Self {
        let namespace = options.server_namespace.clone();
        Self {
            identity,
            registry,
            options,
            phase: LifecyclePhase::Unstarted,
            manager: None,
            namespace,
            logger: Arc::new(NoopLogger),
            events: Arc::new(NoopEventSink),
        }
    }

    /// 替换日志后端。仅在刷新前调用有意义。
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// 替换事件汇点。仅在刷新前调用有意义。
    pub fn with_event_sink(mut self, events: Arc<dyn LifecycleEventSink>) -> Self {
        self.events = events;
        self
    }

    /// 执行完整刷新序列：创建管理器、绑定处理器、启动服务器。
    ///
    /// # 错误语义（What）
    /// - 非 `Unstarted` 阶段调用：返回 `bootstrap.phase` 配置错误，不触碰
    ///   现有状态；
    /// - 序列中任何失败：先兜底停机并释放管理器（次生停机失败只记日志、
    ///   不得掩盖原始错误），阶段强制迁入 `Stopped`，随后原样重抛原始
    ///   错误。
    pub fn refresh(&mut self) -> Result<()> {
        if self.phase != LifecyclePhase::Unstarted {
            return Err(CoreError::new(
                codes::LIFECYCLE_PHASE,
                format!(
                    "刷新只允许在 unstarted 阶段执行，当前阶段：{}",
                    self.phase.as_str()
                ),
            ));
        }

        let outcome = self.on_refresh().and_then(|()| self.finish_refresh());
        if let Err(original) = outcome {
            // 兜底停机：次生失败不得顶替原始错误。
            if let Err(stop_err) = self.stop_and_release() {
                self.logger.warn(
                    "刷新失败后的兜底停机亦告失败，底层资源可能泄漏",
                    &[
                        LogField::str(log_keys::CONTEXT, self.identity.as_str()),
                        LogField::str(log_keys::ERROR_CODE, stop_err.code()),
                    ],
                );
            }
            self.transition(LifecyclePhase::Stopped);
            return Err(original);
        }
        Ok(())
    }

    /// 序列中段钩子：解析唯一的服务器工厂并创建管理器。
    ///
    /// # 契约说明（What）
    /// - 幂等：管理器已存在时直接返回；
    /// - 零或多个工厂候选均为致命配置错误，错误消息点名全部候选；
    /// - 成功后阶段迁入 `ManagerCreated`，服务器已构造但尚未启动。
    pub fn on_refresh(&mut self) -> Result<()> {
        if self.manager.is_some() {
            return Ok(());
        }

        let (factory_name, factory) = self.registry.resolve_server_factory()?;
        let activation = HandlerActivation::from_options(&self.options);
        let manager = ServerManager::new(factory.as_ref(), activation)?;
        self.manager = Some(manager);
        self.transition(LifecyclePhase::ManagerCreated);
        self.logger.debug(
            "服务器管理器已创建",
            &[
                LogField::str(log_keys::CONTEXT, self.identity.as_str()),
                LogField::str(log_keys::CANDIDATES, &factory_name),
            ],
        );
        Ok(())
    }

    /// 序列收尾钩子：绑定处理器、启动服务器并发布就绪通知。
    ///
    /// # 契约说明（What）
    /// - 无管理器时是无操作：不发布任何通知，直接返回成功；
    /// - 处理器解析沿用“恰好一个候选”的策略，急切模式的解析失败原样
    ///   传出（兜底停机由 [`refresh`](Self::refresh) 负责）；
    /// - 成功路径恰好发布一次 [`ServerInitializedEvent`]。
    pub fn finish_refresh(&mut self) -> Result<()> {
        let Some(manager) = self.manager.as_ref() else {
            return Ok(());
        };

        manager.start(self.registry.handler_provider())?;
        let server = manager.server();
        self.transition(LifecyclePhase::Started);

        let addr = server
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        self.logger.info(
            "服务器已启动",
            &[
                LogField::str(log_keys::CONTEXT, self.identity.as_str()),
                LogField::str(log_keys::SERVER_ADDR, &addr),
            ],
        );
        self.events
            .publish(&ServerInitializedEvent::new(server, self.identity.clone()));
        Ok(())
    }

    /// 停机入口：停止服务器并释放管理器引用。
    ///
    /// # 契约说明（What）
    /// - 幂等：管理器已释放时直接成功，不产生第二次底层停机；
    /// - 管理器引用在调用底层停机之前即被取出，停机失败也不会遗留引用；
    /// - 底层停机失败以 `server.shutdown_unrecoverable` 形态返回给调用方。
    pub fn on_close(&mut self) -> Result<()> {
        let result = self.stop_and_release();
        self.transition(LifecyclePhase::Stopped);
        result
    }

    /// 当前运行中的服务器句柄；无管理器时为 `None`。
    pub fn server(&self) -> Option<Arc<dyn ServerHandle>> {
        self.manager.as_ref().map(ServerManager::server)
    }

    /// 当前阶段。
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// 协调器身份标签。
    pub fn identity(&self) -> &ContextId {
        &self.identity
    }

    /// 不透明命名空间标签；框架不解释其含义。
    pub fn server_namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// 设置命名空间标签。
    pub fn set_server_namespace(&mut self, namespace: Option<String>) {
        self.namespace = namespace;
    }

    /// 取出管理器并停机。引用先释放、停机后返回，保证任何路径都不残留
    /// 管理器引用。
    fn stop_and_release(&mut self) -> Result<()> {
        match self.manager.take() {
            Some(manager) => manager.stop(),
            None => Ok(()),
        }
    }

    fn transition(&mut self, next: LifecyclePhase) {
        if self.phase == next {
            return;
        }
        self.logger.debug(
            "生命周期阶段迁移",
            &[
                LogField::str(log_keys::CONTEXT, self.identity.as_str()),
                LogField::str(log_keys::PHASE, next.as_str()),
            ],
        );
        self.phase = next;
    }
}

impl core::fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("identity", &self.identity)
            .field("phase", &self.phase)
            .field("has_manager", &self.manager.is_some())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl Drop for LifecycleCoordinator {
    fn drop(&mut self) {
        // 析构兜底：宿主忘记 on_close 时仍尝试停机，失败只记日志。
        if let Err(err) = self.stop_and_release() {
            self.logger.warn(
                "析构期兜底停机失败",
                &[
                    LogField::str(log_keys::CONTEXT, self.identity.as_str()),
                    LogField::str(log_keys::ERROR_CODE, err.code()),
                ],
            );
        }
    }
}
