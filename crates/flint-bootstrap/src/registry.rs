//! 能力注册表：装配期登记服务器工厂与请求处理器，解析时要求“恰好一个候选”。
//!
//! # 模块定位（Why）
//! - 协调器按能力种类查询候选，零个候选说明宿主漏装配，多个候选说明装配
//!   冲突；两种情况都必须以致命配置错误终止启动，绝不隐式裁决；
//! - 候选集合使用 `BTreeMap` 存储，保证歧义错误中的名单顺序稳定，便于
//!   日志聚合与测试断言。
//!
//! # 使用方式（How）
//! - 注册阶段独占 `&mut self`，重复名称立即拒绝；
//! - 解析阶段只读，处理器支持“实例”与“延迟构造”两种登记形态，后者在解析
//!   时才被调用，失败原样传出；
//! - [`CapabilityRegistry::handler_provider`] 把解析动作打包为闭包，交给
//!   启动流程按急切或懒惰策略执行。

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use flint_core::{
    CoreError, HandlerProvider, RequestHandler, Result, ServerFactory, codes,
};

/// 能力种类，用于注册冲突的错误描述。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CapabilityKind {
    ServerFactory,
    RequestHandler,
}

impl CapabilityKind {
    /// 返回能力种类的稳定名称。
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::ServerFactory => "server_factory",
            CapabilityKind::RequestHandler => "request_handler",
        }
    }
}

/// 注册阶段的失败形态。
///
/// # 契约说明（What）
/// - `Duplicate`：同一能力种类下名称重复；不同种类之间允许同名。
#[derive(Debug)]
pub enum CapabilityRegistrationError {
    Duplicate {
        kind: CapabilityKind,
        name: String,
    },
}

impl fmt::Display for CapabilityRegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityRegistrationError::Duplicate { kind, name } => {
                write!(f, "能力注册冲突：{} 候选 `{name}` 已存在", kind.as_str())
            }
        }
    }
}

impl Error for CapabilityRegistrationError {}

/// 请求处理器的登记形态。
enum HandlerEntry {
    /// 现成实例，解析时直接克隆引用。
    Instance(Arc<dyn RequestHandler>),
    /// 延迟构造闭包，解析时调用，失败原样传出。
    Provider(HandlerProvider),
}

impl fmt::Debug for HandlerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerEntry::Instance(_) => f.write_str("HandlerEntry::Instance(..)"),
            HandlerEntry::Provider(_) => f.write_str("HandlerEntry::Provider(..)"),
        }
    }
}

/// 装配期能力注册表。
///
/// # 设计背景（Why）
/// - 生命周期协调不内置依赖注入容器，宿主通过显式注册声明“谁提供服务器、
///   谁处理请求”；
/// - 解析策略是协议的一部分：恰好一个候选才可启动，歧义时错误信息必须
///   点名全部候选，帮助宿主定位多余的装配。
///
/// # 契约说明（What）
/// - **注册**：同一能力种类下名称唯一；
/// - **解析**：零候选返回 `*_missing`，多候选返回 `*_ambiguous` 且消息按
///   字典序列出全部名称；
/// - **并发**：注册完成后注册表只读，可经 `Arc` 在线程间共享。
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    factories: BTreeMap<String, Arc<dyn ServerFactory>>,
    handlers: BTreeMap<String, HandlerEntry>,
}

impl CapabilityRegistry {
    /// 创建空注册表。
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记服务器工厂候选。
    pub fn register_server_factory(
        &mut self,
        name: impl Into<String>,
        factory: Arc<dyn ServerFactory>,
    ) -> core::result::Result<(), CapabilityRegistrationError> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(CapabilityRegistrationError::Duplicate {
                kind: CapabilityKind::ServerFactory,
                name,
            });
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// 登记现成的请求处理器候选。
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: Arc<dyn RequestHandler>,
    ) -> core::result::Result<(), CapabilityRegistrationError> {
        self.insert_handler(name.into(), HandlerEntry::Instance(handler))
    }

    /// 登记延迟构造的请求处理器候选。
    pub fn register_handler_provider(
        &mut self,
        name: impl Into<String>,
        provider: HandlerProvider,
    ) -> core::result::Result<(), CapabilityRegistrationError> {
        self.insert_handler(name.into(), HandlerEntry::Provider(provider))
    }

    fn insert_handler(
        &mut self,
        name: String,
        entry: HandlerEntry,
    ) -> core::result::Result<(), CapabilityRegistrationError> {
        if self.handlers.contains_key(&name) {
            return Err(CapabilityRegistrationError::Duplicate {
                kind: CapabilityKind::RequestHandler,
                name,
            });
        }
        self.handlers.insert(name, entry);
        Ok(())
    }

    /// 已登记的服务器工厂名单（字典序）。
    pub fn factory_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// 已登记的请求处理器名单（字典序）。
    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// 解析唯一的服务器工厂候选。
    ///
    /// # 错误语义（What）
    /// - 零候选：`bootstrap.factory_missing`；
    /// - 多候选：`bootstrap.factory_ambiguous`，消息点名全部候选。
    pub fn resolve_server_factory(&self) -> Result<(String, Arc<dyn ServerFactory>)> {
        match self.factories.len() {
            0 => Err(CoreError::new(
                codes::FACTORY_MISSING,
                "无法启动服务器：注册表中缺少服务器工厂候选",
            )),
            1 => {
                let (name, factory) = self
                    .factories
                    .iter()
                    .next()
                    .map(|(name, factory)| (name.clone(), Arc::clone(factory)))
                    .unwrap_or_else(|| unreachable!("len() == 1 时必有首元素"));
                Ok((name, factory))
            }
            _ => Err(CoreError::new(
                codes::FACTORY_AMBIGUOUS,
                format!(
                    "无法启动服务器：存在多个服务器工厂候选：{}",
                    join_names(self.factories.keys())
                ),
            )),
        }
    }

    /// 解析唯一的请求处理器候选。
    ///
    /// # 错误语义（What）
    /// - 零候选：`bootstrap.handler_missing`；
    /// - 多候选：`bootstrap.handler_ambiguous`，消息点名全部候选；
    /// - 延迟构造候选在此处被调用，其失败不做包装、原样传出。
    pub fn resolve_handler(&self) -> Result<Arc<dyn RequestHandler>> {
        match self.handlers.len() {
            0 => Err(CoreError::new(
                codes::HANDLER_MISSING,
                "无法启动服务器：注册表中缺少请求处理器候选",
            )),
            1 => {
                let entry = self
                    .handlers
                    .values()
                    .next()
                    .unwrap_or_else(|| unreachable!("len() == 1 时必有首元素"));
                match entry {
                    HandlerEntry::Instance(handler) => Ok(Arc::clone(handler)),
                    HandlerEntry::Provider(provider) => provider(),
                }
            }
            _ => Err(CoreError::new(
                codes::HANDLER_AMBIGUOUS,
                format!(
                    "无法启动服务器：存在多个请求处理器候选：{}",
                    join_names(self.handlers.keys())
                ),
            )),
        }
    }

    /// 把处理器解析打包为可延迟调用的闭包。
    ///
    /// # 契约说明（What）
    /// - 闭包持有注册表的共享引用，每次调用都执行一次完整解析；
    /// - 解析结果不在此层缓存，懒初始化的记忆化由上层包装器负责。
    pub fn handler_provider(self: &Arc<Self>) -> HandlerProvider {
        let registry = Arc::clone(self);
        Arc::new(move || registry.resolve_handler())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    names
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
