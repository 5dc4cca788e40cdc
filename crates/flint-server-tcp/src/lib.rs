#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = r#"
# flint-server-tcp

## 设计动机（Why）
- **定位**：提供 `flint` 在 Tokio 运行时上的最小服务器实现：行分帧 TCP
  回路，把每一行字节交给生命周期框架装配的请求处理器；
- **架构角色**：`flint-core` 把具体服务器视作外部协作者，本 crate 即工作区
  自带的参考协作者，端到端验证“先构造、后绑定、再启动”的协调语义；
- **非目标**：不做路由、不解析 HTTP、不终结 TLS——这些语义由上层自行
  叠加。

## 核心契约（What）
- [`LineServerFactory`] 实现 `ServerFactory`：以处理器外观构造未启动的
  [`LineServer`]；
- [`LineServer`] 实现 `ServerHandle`：`start` 绑定监听器并派生接收循环，
  `stop` 发出停机信号并中止循环；至多启动一次、不支持重启；
- 处理器返回的错误以 `ERR <错误码>` 行回写给对端，IO 故障关闭连接。

## 实现策略（How）
- 监听器先以标准库同步绑定（启动调用是同步契约），循环内转换为 Tokio
  监听器；因此 `start` 必须在 Tokio 运行时内调用；
- 停机通过 `watch` 通道通知循环退出，并中止接收任务兜底。
"#]

mod config;
mod error;
mod server;

pub use config::LineServerConfig;
pub use server::{LineServer, LineServerFactory};
