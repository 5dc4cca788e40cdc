//! 实现层错误：先以 `thiserror` 描述具体故障，再映射为核心错误域。

use flint_core::{CoreError, codes};
use thiserror::Error;

/// TCP 参考服务器内部的故障形态。
#[derive(Debug, Error)]
pub(crate) enum TcpServerError {
    #[error("绑定监听地址 {addr} 失败")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("启动要求处于 Tokio 运行时内")]
    MissingRuntime(#[source] tokio::runtime::TryCurrentError),
    #[error("服务器已启动，不支持重复启动")]
    AlreadyStarted,
    #[error("服务器已停止，不支持重启")]
    Restarted,
}

impl From<TcpServerError> for CoreError {
    fn from(err: TcpServerError) -> Self {
        let code = match &err {
            TcpServerError::Bind { .. }
            | TcpServerError::MissingRuntime(_)
            | TcpServerError::AlreadyStarted
            | TcpServerError::Restarted => codes::SERVER_START,
        };
        CoreError::new(code, err.to_string()).with_cause(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_failure_maps_to_start_code_with_cause() {
        let err: CoreError = TcpServerError::Bind {
            addr: "127.0.0.1:1".parse().expect("测试地址必须合法"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert_eq!(err.code(), codes::SERVER_START);
        assert!(err.cause().is_some(), "映射后必须保留底层原因");
        assert!(
            err.message().contains("127.0.0.1:1"),
            "消息应点名绑定地址，实际：{}",
            err.message()
        );
    }
}
