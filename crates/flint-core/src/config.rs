//! 装配期配置：协调器行为中允许宿主调节的少量开关。

use alloc::string::String;

use serde::{Deserialize, Serialize};

/// 生命周期协调器的装配选项。
///
/// # 契约说明（What）
/// - `lazy_handler_init`：为 `true` 时处理器解析延迟到首个请求，默认在启动
///   阶段立即解析；
/// - `server_namespace`：不透明命名空间标签的初始值，框架自身不解释其含义；
/// - 所有字段带默认值，序列化来源可只提供增量片段。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapOptions {
    pub lazy_handler_init: bool,
    pub server_namespace: Option<String>,
}

impl BootstrapOptions {
    /// 创建全默认选项。
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置处理器解析时机。
    pub fn with_lazy_handler_init(mut self, lazy: bool) -> Self {
        self.lazy_handler_init = lazy;
        self
    }

    /// 设置命名空间初始值。
    pub fn with_server_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.server_namespace = Some(namespace.into());
        self
    }
}
