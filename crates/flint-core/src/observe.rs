//! 结构化日志契约：协调器记录阶段迁移与故障，输出后端由宿主注入。
//!
//! # 模块定位（Why）
//! - 契约层不绑定任何日志后端，宿主可桥接到自有观测体系或直接丢弃；
//! - 字段键集中登记在 [`keys`]，避免各调用点拼写漂移导致日志不可聚合。
//!
//! # 使用约定（How）
//! - 常规路径使用 `debug`/`info`/`warn` 便捷方法；携带错误对象时走
//!   `error`；
//! - 字段值只支持少量标量形态，复杂结构应先行格式化为字符串。

use core::fmt;

use crate::error::CoreError;

/// 日志级别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogSeverity {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogSeverity {
    /// 返回级别的稳定名称。
    pub fn as_str(&self) -> &'static str {
        match self {
            LogSeverity::Debug => "debug",
            LogSeverity::Info => "info",
            LogSeverity::Warn => "warn",
            LogSeverity::Error => "error",
        }
    }
}

/// 结构化字段的标量取值。
#[derive(Clone, Copy, Debug)]
pub enum FieldValue<'a> {
    Str(&'a str),
    U64(u64),
    Bool(bool),
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Str(value) => f.write_str(value),
            FieldValue::U64(value) => write!(f, "{value}"),
            FieldValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

/// 键值对字段。键必须来自 [`keys`] 或满足同样的稳定性要求。
#[derive(Clone, Copy, Debug)]
pub struct LogField<'a> {
    pub key: &'static str,
    pub value: FieldValue<'a>,
}

impl<'a> LogField<'a> {
    /// 构造字符串字段。
    pub fn str(key: &'static str, value: &'a str) -> Self {
        Self {
            key,
            value: FieldValue::Str(value),
        }
    }

    /// 构造无符号整数字段。
    pub fn u64(key: &'static str, value: u64) -> Self {
        Self {
            key,
            value: FieldValue::U64(value),
        }
    }

    /// 构造布尔字段。
    pub fn bool(key: &'static str, value: bool) -> Self {
        Self {
            key,
            value: FieldValue::Bool(value),
        }
    }
}

/// 一条完整的结构化日志记录。
///
/// # 契约说明（What）
/// - 记录以借用形态传递，后端如需持久化必须自行复制；
/// - `error` 存在时，后端应一并输出错误码与根因链路。
#[derive(Clone, Copy, Debug)]
pub struct LogRecord<'a> {
    pub severity: LogSeverity,
    pub message: &'a str,
    pub error: Option<&'a CoreError>,
    pub fields: &'a [LogField<'a>],
}

/// 结构化日志契约。
///
/// # 设计背景（Why）
/// - 以 `Arc<dyn Logger>` 注入协调器，宿主可在不改动框架代码的情况下替换
///   输出后端；
/// - 便捷方法集中组装 [`LogRecord`]，实现方只需关注 `log` 一个入口。
pub trait Logger: Send + Sync + 'static {
    /// 提交一条结构化日志。
    fn log(&self, record: &LogRecord<'_>);

    /// 输出 DEBUG 级别日志。
    fn debug(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(&LogRecord {
            severity: LogSeverity::Debug,
            message,
            error: None,
            fields,
        });
    }

    /// 输出 INFO 级别日志。
    fn info(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(&LogRecord {
            severity: LogSeverity::Info,
            message,
            error: None,
            fields,
        });
    }

    /// 输出 WARN 级别日志。
    fn warn(&self, message: &str, fields: &[LogField<'_>]) {
        self.log(&LogRecord {
            severity: LogSeverity::Warn,
            message,
            error: None,
            fields,
        });
    }

    /// 输出 ERROR 级别日志并附带错误对象。
    fn error(&self, message: &str, error: Option<&CoreError>, fields: &[LogField<'_>]) {
        self.log(&LogRecord {
            severity: LogSeverity::Error,
            message,
            error,
            fields,
        });
    }
}

/// 丢弃所有记录的默认实现。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _record: &LogRecord<'_>) {}
}

/// 稳定字段键登记表。
pub mod keys {
    /// 协调器身份标签。
    pub const CONTEXT: &str = "context";
    /// 生命周期阶段名称。
    pub const PHASE: &str = "phase";
    /// 服务器监听地址。
    pub const SERVER_ADDR: &str = "server_addr";
    /// 候选解析涉及的名称列表。
    pub const CANDIDATES: &str = "candidates";
    /// 稳定错误码。
    pub const ERROR_CODE: &str = "error_code";
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::vec::Vec;

    /// 捕获型后端：记录级别与消息，验证便捷方法正确组装记录。
    #[derive(Default)]
    struct CapturingLogger {
        entries: Mutex<Vec<(LogSeverity, std::string::String)>>,
    }

    impl Logger for CapturingLogger {
        fn log(&self, record: &LogRecord<'_>) {
            self.entries
                .lock()
                .expect("测试后端锁不应中毒")
                .push((record.severity, record.message.into()));
        }
    }

    #[test]
    fn convenience_methods_forward_to_log() {
        let logger = CapturingLogger::default();
        logger.debug("d", &[]);
        logger.info("i", &[LogField::u64(keys::SERVER_ADDR, 1)]);
        logger.warn("w", &[LogField::bool(keys::PHASE, true)]);
        logger.error("e", None, &[]);

        let entries = logger.entries.lock().expect("测试后端锁不应中毒");
        let severities: Vec<LogSeverity> = entries.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            severities,
            [
                LogSeverity::Debug,
                LogSeverity::Info,
                LogSeverity::Warn,
                LogSeverity::Error
            ],
            "便捷方法必须按调用级别组装记录"
        );
    }

    #[test]
    fn severity_names_are_stable() {
        assert_eq!(LogSeverity::Debug.as_str(), "debug");
        assert_eq!(LogSeverity::Error.as_str(), "error");
    }
}
