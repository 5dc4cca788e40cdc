//! 参考服务器的装配配置。

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// 行分帧 TCP 服务器的配置。
///
/// # 契约说明（What）
/// - `bind_addr`：监听地址；默认 `127.0.0.1:0`，由内核分配空闲端口，
///   测试场景因此无需预留端口；
/// - 字段带默认值，序列化来源可只提供增量片段。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for LineServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        }
    }
}

impl LineServerConfig {
    /// 创建全默认配置。
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定监听地址。
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_binds_loopback_ephemeral_port() {
        let config = LineServerConfig::new();
        assert!(config.bind_addr.ip().is_loopback(), "默认必须只监听回环");
        assert_eq!(config.bind_addr.port(), 0, "默认端口交由内核分配");
    }

    #[test]
    fn partial_json_fills_missing_fields() {
        let config: LineServerConfig = serde_json::from_str("{}").expect("空配置应可反序列化");
        assert_eq!(config, LineServerConfig::default());

        let config: LineServerConfig =
            serde_json::from_str(r#"{"bind_addr": "127.0.0.1:4200"}"#)
                .expect("显式地址应可反序列化");
        assert_eq!(config.bind_addr.port(), 4200);
    }
}
