//! 懒初始化处理器：把处理器解析推迟到首个请求，并发首触只解析一次。
//!
//! # 模块定位（Why）
//! - 某些处理器的构造代价高，或依赖启动末期才就绪的资源；急切解析会把
//!   这些代价压进启动关键路径；
//! - 记忆化必须在并发首触下安全：解析至多执行一次，竞争的调用方共同等待
//!   同一次在途解析，而不是各自重复构造。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;

use flint_core::{HandlerProvider, HandlerRequest, HandlerResponse, RequestHandler, Result};

/// 首次使用时才解析真实处理器的包装器。
///
/// # 契约说明（What）
/// - **触发**：首个 `handle` 调用触发解析闭包；
/// - **记忆化**：解析成功后结果缓存至包装器生命周期结束，后续请求零锁
///   直达；
/// - **并发**：解析进行中到达的请求共同等待同一次解析完成；
/// - **失败**：解析失败传给触发请求，且不缓存为成功——下一个请求重新
///   尝试解析。
///
/// # 实现（How）
/// - `tokio::sync::OnceCell::get_or_try_init` 恰好承载上述语义：单次初始化、
///   并发等待、失败留空。
pub struct LazyHandler {
    provider: HandlerProvider,
    resolved: OnceCell<Arc<dyn RequestHandler>>,
}

impl LazyHandler {
    /// 以解析闭包构造包装器，此时不发生任何解析。
    pub fn new(provider: HandlerProvider) -> Self {
        Self {
            provider,
            resolved: OnceCell::new(),
        }
    }

    /// 是否已完成解析。供测试断言记忆化行为。
    pub fn is_resolved(&self) -> bool {
        self.resolved.initialized()
    }
}

impl core::fmt::Debug for LazyHandler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LazyHandler")
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

#[async_trait]
impl RequestHandler for LazyHandler {
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        let handler = self
            .resolved
            .get_or_try_init(|| async { (self.provider)() })
            .await?;
        handler.handle(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flint_core::{CoreError, codes};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct EchoHandler;

    #[async_trait]
    impl RequestHandler for EchoHandler {
        async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
            Ok(HandlerResponse::new(request.into_payload()))
        }
    }

    #[tokio::test]
    async fn resolution_is_deferred_until_first_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = LazyHandler::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(EchoHandler) as Arc<dyn RequestHandler>)
        }));

        assert!(!lazy.is_resolved(), "构造阶段不得触发解析");
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let response = lazy
            .handle(HandlerRequest::new(b"ping"))
            .await
            .expect("首个请求应完成解析并得到响应");
        assert_eq!(response.payload(), b"ping");
        assert!(lazy.is_resolved());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "解析只应发生一次");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_touch_resolves_exactly_once() {
        const REQUESTS: usize = 16;

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let lazy = Arc::new(LazyHandler::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            // 模拟昂贵构造，放大竞争窗口。
            std::thread::sleep(std::time::Duration::from_millis(10));
            Ok(Arc::new(EchoHandler) as Arc<dyn RequestHandler>)
        })));

        let mut tasks = Vec::with_capacity(REQUESTS);
        for index in 0..REQUESTS {
            let lazy = Arc::clone(&lazy);
            tasks.push(tokio::spawn(async move {
                lazy.handle(HandlerRequest::new(index.to_string())).await
            }));
        }
        for task in tasks {
            let response = task
                .await
                .expect("分发任务不应 panic")
                .expect("全部请求都应由同一解析结果服务");
            assert!(!response.payload().is_empty());
        }

        assert_eq!(
            calls.load(Ordering::SeqCst),
            1,
            "并发首触必须共享同一次解析"
        );
    }

    #[tokio::test]
    async fn resolution_failure_is_not_cached() {
        let fail_once = Arc::new(AtomicBool::new(true));
        let calls = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&fail_once);
        let counter = Arc::clone(&calls);
        let lazy = LazyHandler::new(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            if flag.swap(false, Ordering::SeqCst) {
                Err(CoreError::new(codes::TRANSPORT_IO, "首次解析失败"))
            } else {
                Ok(Arc::new(EchoHandler) as Arc<dyn RequestHandler>)
            }
        }));

        let err = lazy
            .handle(HandlerRequest::new(b"first"))
            .await
            .expect_err("触发请求必须收到解析失败");
        assert_eq!(err.code(), codes::TRANSPORT_IO);
        assert!(!lazy.is_resolved(), "失败不得被缓存为成功");

        let response = lazy
            .handle(HandlerRequest::new(b"second"))
            .await
            .expect("后续请求应重新解析并成功");
        assert_eq!(response.payload(), b"second");
        assert_eq!(calls.load(Ordering::SeqCst), 2, "失败后应重新尝试解析");
    }
}
