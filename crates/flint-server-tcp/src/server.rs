//! 行分帧 TCP 服务器：监听、接收循环与按行委托。

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener as TokioTcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use flint_core::{HandlerRequest, RequestHandler, Result, ServerFactory, ServerHandle};

use crate::config::LineServerConfig;
use crate::error::TcpServerError;

const LOG_TARGET: &str = "flint::server::tcp";

/// 以外观处理器构造 [`LineServer`] 的工厂。
///
/// # 契约说明（What）
/// - `produce` 收到的处理器是可延迟发布的外观，构造阶段不会调用它；
/// - 构造只记录配置与外观，监听资源直到 `start` 才被占用，因此构造
///   失败不可能遗留已绑定的端口。
#[derive(Clone, Copy, Debug, Default)]
pub struct LineServerFactory {
    config: LineServerConfig,
}

impl LineServerFactory {
    /// 以配置构造工厂。
    pub fn new(config: LineServerConfig) -> Self {
        Self { config }
    }
}

impl ServerFactory for LineServerFactory {
    fn produce(&self, handler: Arc<dyn RequestHandler>) -> Result<Box<dyn ServerHandle>> {
        Ok(Box::new(LineServer::new(self.config, handler)))
    }
}

/// 服务器的生命周期状态。启停由单一初始化线程驱动，锁只用来支撑
/// 任意线程查询监听地址。
enum ServerState {
    Created,
    Running {
        local_addr: SocketAddr,
        shutdown: watch::Sender<bool>,
        accept_task: JoinHandle<()>,
    },
    Stopped,
}

struct Inner {
    config: LineServerConfig,
    handler: Arc<dyn RequestHandler>,
    state: Mutex<ServerState>,
}

/// 行分帧 TCP 服务器。
///
/// # 契约说明（What）
/// - **生命周期**：`start` 至多成功一次，停止后不可重启；`stop` 幂等，
///   未启动时停止是无操作；
/// - **委托**：每个连接按 `\n` 分帧，逐行调用处理器；处理器错误以
///   `ERR <错误码>` 行回写，不关闭连接；IO 故障结束该连接；
/// - **前置条件**：`start` 必须在 Tokio 运行时内调用，接收循环派生到该
///   运行时上。
pub struct LineServer {
    inner: Arc<Inner>,
}

impl LineServer {
    fn new(config: LineServerConfig, handler: Arc<dyn RequestHandler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                handler,
                state: Mutex::new(ServerState::Created),
            }),
        }
    }
}

impl ServerHandle for LineServer {
    fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        match &*state {
            ServerState::Created => {}
            ServerState::Running { .. } => return Err(TcpServerError::AlreadyStarted.into()),
            ServerState::Stopped => return Err(TcpServerError::Restarted.into()),
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(TcpServerError::MissingRuntime)?;
        // 同步绑定保证返回时端口已被占用；循环内再转换为 Tokio 监听器。
        let listener = StdTcpListener::bind(self.inner.config.bind_addr).map_err(|source| {
            TcpServerError::Bind {
                addr: self.inner.config.bind_addr,
                source,
            }
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|source| TcpServerError::Bind {
                addr: self.inner.config.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr().map_err(|source| TcpServerError::Bind {
            addr: self.inner.config.bind_addr,
            source,
        })?;

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handler = Arc::clone(&self.inner.handler);
        let accept_task = runtime.spawn(accept_loop(listener, handler, shutdown_rx));

        tracing::info!(target: LOG_TARGET, %local_addr, "行分帧服务器已启动");
        *state = ServerState::Running {
            local_addr,
            shutdown,
            accept_task,
        };
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        match std::mem::replace(&mut *state, ServerState::Stopped) {
            ServerState::Running {
                local_addr,
                shutdown,
                accept_task,
            } => {
                let _ = shutdown.send(true);
                // 信号兜底：循环阻塞在 accept 时直接中止任务以释放监听器。
                accept_task.abort();
                tracing::info!(target: LOG_TARGET, %local_addr, "行分帧服务器已停止");
                Ok(())
            }
            ServerState::Created | ServerState::Stopped => Ok(()),
        }
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.inner.state.lock() {
            ServerState::Running { local_addr, .. } => Some(*local_addr),
            ServerState::Created | ServerState::Stopped => None,
        }
    }
}

impl core::fmt::Debug for LineServer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LineServer")
            .field("bind_addr", &self.inner.config.bind_addr)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

async fn accept_loop(
    listener: StdTcpListener,
    handler: Arc<dyn RequestHandler>,
    mut shutdown: watch::Receiver<bool>,
) {
    let listener = match TokioTcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(target: LOG_TARGET, error = %err, "监听器转换失败，接收循环退出");
            return;
        }
    };

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    tracing::debug!(target: LOG_TARGET, %peer, "接受连接");
                    let handler = Arc::clone(&handler);
                    tokio::spawn(serve_connection(stream, peer, handler));
                }
                Err(err) => {
                    tracing::warn!(target: LOG_TARGET, error = %err, "接受连接失败");
                }
            },
        }
    }
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, handler: Arc<dyn RequestHandler>) {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(target: LOG_TARGET, %peer, error = %err, "读取连接失败");
                break;
            }
        };

        let reply = match handler.handle(HandlerRequest::new(line.into_bytes())).await {
            Ok(response) => {
                let mut payload = response.into_payload();
                payload.push(b'\n');
                payload
            }
            Err(err) => {
                tracing::debug!(
                    target: LOG_TARGET,
                    %peer,
                    error_code = err.code(),
                    "处理器拒绝请求"
                );
                format!("ERR {}\n", err.code()).into_bytes()
            }
        };
        if let Err(err) = write_half.write_all(&reply).await {
            tracing::debug!(target: LOG_TARGET, %peer, error = %err, "写回响应失败");
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use flint_core::HandlerResponse;

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
            Ok(HandlerResponse::new(request.into_payload()))
        }
    }

    fn echo_server() -> LineServer {
        LineServer::new(LineServerConfig::default(), Arc::new(EchoHandler))
    }

    #[test]
    fn start_outside_runtime_is_rejected() {
        let server = echo_server();
        let err = server.start().expect_err("运行时外启动必须失败");
        assert_eq!(err.code(), flint_core::codes::SERVER_START);
        assert!(server.local_addr().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn lifecycle_is_start_once_stop_once() {
        let server = echo_server();
        assert!(server.local_addr().is_none(), "启动前不应暴露地址");

        server.start().expect("首次启动应成功");
        let addr = server.local_addr().expect("运行期必须暴露地址");
        assert!(addr.port() > 0, "内核必须已分配端口");

        let err = server.start().expect_err("重复启动必须失败");
        assert_eq!(err.code(), flint_core::codes::SERVER_START);

        server.stop().expect("停止应成功");
        assert!(server.local_addr().is_none(), "停止后不应暴露地址");
        server.stop().expect("重复停止必须是无操作");

        let err = server.start().expect_err("停止后重启必须失败");
        assert_eq!(err.code(), flint_core::codes::SERVER_START);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn stop_before_start_is_noop() {
        let server = echo_server();
        server.stop().expect("未启动时停止必须是无操作");
        // 契约：未启动即停止的服务器视为已停止，不可再启动。
        let err = server.start().expect_err("停止后的启动必须失败");
        assert_eq!(err.code(), flint_core::codes::SERVER_START);
    }
}
