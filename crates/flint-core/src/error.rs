//! 生命周期协调框架的统一错误域。
//!
//! # 模块定位（Why）
//! - 装配、启动、停机与请求分发各阶段的故障需要合流为稳定错误码，便于日志、
//!   告警与测试断言执行精确分类；
//! - 契约层需兼容 `no_std + alloc`，因此基于 `core::error::Error` 构建，
//!   不绑定任何具体运行时。
//!
//! # 使用约定（How）
//! - 构造错误时优先引用 [`codes`] 中登记的稳定码值，自定义码需遵循
//!   `<域>.<语义>` 命名；
//! - 底层原因通过 [`CoreError::with_cause`] 挂载，`source()` 暴露完整链路；
//! - 阶段分类通过 [`CoreError::category`] 查询，未显式设置时按码值回退。

use alloc::{borrow::Cow, boxed::Box};
use core::error::Error;
use core::fmt;

/// `CoreError` 是框架内所有可观察错误的最终形态。
///
/// # 设计背景（Why）
/// - 协调器、管理器与服务器实现位于不同 crate，其故障必须以统一结构跨层传递，
///   否则调用方只能解析消息字符串推断语义；
/// - 错误码为 `'static` 字符串，承载稳定语义；`message` 面向排障人员，
///   可携带候选名单等动态上下文。
///
/// # 契约说明（What）
/// - **前置条件**：`code` 使用 [`codes`] 模块或遵循 `<域>.<语义>` 约定；
/// - **返回值**：构造函数返回拥有所有权的错误对象，可安全跨线程移动
///   （`Send + Sync + 'static`）；
/// - **后置条件**：除非显式调用 `with_*` 方法，错误不包含额外上下文。
///
/// # 取舍（Trade-offs）
/// - `message` 采用 `Cow` 保存：静态文案零分配，动态文案（如歧义候选列表）
///   按需落堆。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
    category: Option<ErrorCategory>,
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 框架统一的返回值别名，默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 契约说明（What）
    /// - **输入**：稳定错误码与人类可读描述；
    /// - **后置条件**：尚未附带底层原因与显式分类，需要时经 `with_*` 叠加。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            category: None,
        }
    }

    /// 以 Builder 风格挂载底层原因。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 就地设置底层原因。
    pub fn set_cause(&mut self, cause: impl Error + Send + Sync + 'static) {
        self.cause = Some(Box::new(cause));
    }

    /// 为错误显式标记生命周期阶段分类，覆盖按码值推导的默认值。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 就地更新阶段分类。
    pub fn set_category(&mut self, category: ErrorCategory) {
        self.category = Some(category);
    }

    /// 获取结构化阶段分类。
    ///
    /// # 返回契约（What）
    /// - 显式标记优先；未标记时按 [`codes::default_category`] 查表；
    /// - 未登记的自定义码回退为 [`ErrorCategory::Startup`]，表示默认按
    ///   启动失败处置。
    pub fn category(&self) -> ErrorCategory {
        self.category
            .or_else(|| codes::default_category(self.code))
            .unwrap_or(ErrorCategory::Startup)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 错误的生命周期阶段分类。
///
/// # 设计背景（Why）
/// - 启动序列对故障的处置策略按阶段划分：装配期错误中止刷新、启动期错误触发
///   兜底停机、停机期错误需升级为不可恢复信号、过早调用错误按请求粒度失败；
/// - 将阶段显式化后，测试与日志无需解析错误码前缀即可断言处置路径。
///
/// # 契约说明（What）
/// - `Configuration`：候选解析失败、阶段误用等装配期错误；
/// - `Startup`：工厂生产或服务器启动失败；
/// - `Shutdown`：底层停机失败被翻译后的最终形态；
/// - `PrematureUse`：处理器尚未发布时收到请求的快速失败；
/// - `Transport`：服务器实现内部的 IO 故障。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    Configuration,
    Startup,
    Shutdown,
    PrematureUse,
    Transport,
}

impl ErrorCategory {
    /// 返回用于结构化日志字段的稳定名称。
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Configuration => "configuration",
            ErrorCategory::Startup => "startup",
            ErrorCategory::Shutdown => "shutdown",
            ErrorCategory::PrematureUse => "premature_use",
            ErrorCategory::Transport => "transport",
        }
    }
}

/// 稳定错误码登记表。
///
/// # 维护约定（How）
/// - 命名遵循 `<域>.<语义>`：`bootstrap.*` 对应装配期，`server.*` 对应
///   服务器启停，`handler.*` 对应请求处理，`transport.*` 供实现层复用；
/// - 新增码值必须同步登记 [`default_category`]，否则分类回退将失真。
pub mod codes {
    use super::ErrorCategory;

    /// 注册表中不存在服务器工厂候选。
    pub const FACTORY_MISSING: &str = "bootstrap.factory_missing";
    /// 服务器工厂候选多于一个，拒绝隐式裁决。
    pub const FACTORY_AMBIGUOUS: &str = "bootstrap.factory_ambiguous";
    /// 注册表中不存在请求处理器候选。
    pub const HANDLER_MISSING: &str = "bootstrap.handler_missing";
    /// 请求处理器候选多于一个，拒绝隐式裁决。
    pub const HANDLER_AMBIGUOUS: &str = "bootstrap.handler_ambiguous";
    /// 生命周期阶段不允许当前操作（如对已启动的协调器重复 refresh）。
    pub const LIFECYCLE_PHASE: &str = "bootstrap.phase";
    /// 底层服务器创建或启动失败。
    pub const SERVER_START: &str = "server.start_failed";
    /// 底层服务器停机失败，已进入不可恢复状态。
    pub const SERVER_SHUTDOWN_UNRECOVERABLE: &str = "server.shutdown_unrecoverable";
    /// 处理器尚未完成装配即收到请求。
    pub const HANDLER_UNINITIALIZED: &str = "handler.uninitialized";
    /// 服务器实现层的通用 IO 故障。
    pub const TRANSPORT_IO: &str = "transport.io";

    /// 按稳定错误码推导默认阶段分类；未登记的码返回 `None`。
    pub fn default_category(code: &str) -> Option<ErrorCategory> {
        match code {
            FACTORY_MISSING | FACTORY_AMBIGUOUS | HANDLER_MISSING | HANDLER_AMBIGUOUS
            | LIFECYCLE_PHASE => Some(ErrorCategory::Configuration),
            SERVER_START => Some(ErrorCategory::Startup),
            SERVER_SHUTDOWN_UNRECOVERABLE => Some(ErrorCategory::Shutdown),
            HANDLER_UNINITIALIZED => Some(ErrorCategory::PrematureUse),
            TRANSPORT_IO => Some(ErrorCategory::Transport),
            _ => None,
        }
    }
}

// 契约锚点：核心错误必须可跨线程传递，违反时在编译期失败。
const _: fn() = || {
    fn assert_error_traits<T: Error + Send + Sync + 'static>() {}
    assert_error_traits::<CoreError>();
};

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    /// 测试场景：底层原因为自定义错误时，`source()` 应暴露完整链路。
    #[derive(Debug)]
    struct RootCause;

    impl fmt::Display for RootCause {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "listener closed")
        }
    }

    impl Error for RootCause {}

    #[test]
    fn display_renders_code_and_message() {
        let err = CoreError::new(codes::SERVER_START, "服务器启动失败");
        assert_eq!(
            err.to_string(),
            "[server.start_failed] 服务器启动失败",
            "Display 必须保持 `[code] message` 的稳定格式"
        );
    }

    #[test]
    fn source_exposes_cause_chain() {
        let err = CoreError::new(codes::TRANSPORT_IO, "读取连接失败").with_cause(RootCause);
        let source = err.source().expect("挂载过 cause 后 source 不应为空");
        assert_eq!(source.to_string(), "listener closed");
    }

    #[test]
    fn category_prefers_explicit_mark_over_lookup() {
        let err =
            CoreError::new(codes::SERVER_START, "x").with_category(ErrorCategory::Configuration);
        assert_eq!(
            err.category(),
            ErrorCategory::Configuration,
            "显式分类应覆盖按码值推导的默认值"
        );
    }

    #[test]
    fn category_falls_back_by_code() {
        let cases = [
            (codes::FACTORY_MISSING, ErrorCategory::Configuration),
            (codes::FACTORY_AMBIGUOUS, ErrorCategory::Configuration),
            (codes::HANDLER_MISSING, ErrorCategory::Configuration),
            (codes::HANDLER_AMBIGUOUS, ErrorCategory::Configuration),
            (codes::LIFECYCLE_PHASE, ErrorCategory::Configuration),
            (codes::SERVER_START, ErrorCategory::Startup),
            (
                codes::SERVER_SHUTDOWN_UNRECOVERABLE,
                ErrorCategory::Shutdown,
            ),
            (codes::HANDLER_UNINITIALIZED, ErrorCategory::PrematureUse),
            (codes::TRANSPORT_IO, ErrorCategory::Transport),
        ];
        for (code, expected) in cases {
            let err = CoreError::new(code, "probe");
            assert_eq!(err.category(), expected, "码 {code} 的默认分类登记错误");
        }
    }

    #[test]
    fn unknown_code_falls_back_to_startup() {
        let err = CoreError::new("custom.unregistered", "probe");
        assert_eq!(err.category(), ErrorCategory::Startup);
    }
}
