//! 请求处理器契约：服务器把入站请求委托给它，自身不关心业务语义。
//!
//! # 模块定位（Why）
//! - 生命周期协调的核心诉求是“服务器先于处理器存在”，因此处理器必须是
//!   可延迟绑定的对象安全能力；
//! - 载荷保持为不透明字节序列，路由、HTTP 解析等语义由上层自行叠加，
//!   不属于本契约。
//!
//! # 组成（How）
//! - [`RequestHandler`]：对象安全的异步处理契约；
//! - [`FnHandler`]：闭包到契约的桥接，服务于测试与轻量场景；
//! - [`HandlerProvider`]：同步可调用的处理器解析闭包，启动期既可立即执行
//!   （急切模式），也可交由懒初始化包装器延迟到首个请求。

use alloc::{boxed::Box, sync::Arc, vec::Vec};
use core::fmt;
use core::future::Future;

use async_trait::async_trait;

use crate::error::Result;

/// 入站请求的最小载体，载荷为不透明字节。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerRequest {
    payload: Vec<u8>,
}

impl HandlerRequest {
    /// 以任意可转为字节向量的载荷构造请求。
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// 借用载荷字节。
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 取出载荷所有权。
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// 出站响应的最小载体，与请求对称。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerResponse {
    payload: Vec<u8>,
}

impl HandlerResponse {
    /// 以任意可转为字节向量的载荷构造响应。
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// 借用载荷字节。
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// 取出载荷所有权。
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

/// 异步请求处理契约。
///
/// # 设计背景（Why）
/// - 服务器在构造期拿到的是处理器外观而非最终实现，契约必须对象安全，
///   以 `Arc<dyn RequestHandler>` 形态在启动线程与分发任务之间共享；
/// - 处理过程天然异步：懒初始化包装器需要在请求路径上等待解析完成。
///
/// # 契约说明（What）
/// - **输入**：一次完整的入站请求载荷；
/// - **输出**：响应载荷，或携带稳定错误码的 [`CoreError`](crate::CoreError)；
/// - **并发**：实现必须允许任意数量的分发任务并发调用 `handle`；
/// - **前置条件**：无；处理器尚未就绪时的快速失败由外观层负责表达。
#[async_trait]
pub trait RequestHandler: Send + Sync + 'static {
    /// 处理一次入站请求。
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse>;
}

impl fmt::Debug for dyn RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("dyn RequestHandler")
    }
}

/// 同步可调用的处理器解析闭包。
///
/// # 契约说明（What）
/// - 急切模式下由启动流程直接调用，失败会中止启动序列；
/// - 懒模式下被包装进懒初始化处理器，首个请求触发调用；
/// - 解析失败不得被缓存为成功结果，后续调用应重新尝试。
pub type HandlerProvider = Arc<dyn Fn() -> Result<Arc<dyn RequestHandler>> + Send + Sync>;

/// 将闭包适配为 [`RequestHandler`]，测试与快速原型一视同仁。
///
/// # 行为描述（How）
/// - `new` 按值存储闭包，不做额外装箱；
/// - `handle` 直接调用闭包并等待其返回的 Future。
///
/// # 契约说明（What）
/// - 闭包与其返回的 Future 必须满足 `Send + Sync + 'static`，确保适配后的
///   处理器可跨线程共享。
pub struct FnHandler<F> {
    logic: F,
}

impl<F> FnHandler<F> {
    /// 创建闭包处理器。
    pub fn new(logic: F) -> Self {
        Self { logic }
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RequestHandler for FnHandler<F>
where
    F: Fn(HandlerRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HandlerResponse>> + Send + 'static,
{
    async fn handle(&self, request: HandlerRequest) -> Result<HandlerResponse> {
        (self.logic)(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, codes};

    #[test]
    fn fn_handler_delegates_to_closure() {
        let handler = FnHandler::new(|request: HandlerRequest| async move {
            let mut payload = request.into_payload();
            payload.reverse();
            Ok(HandlerResponse::new(payload))
        });

        let response = futures::executor::block_on(handler.handle(HandlerRequest::new(b"abc")))
            .expect("闭包处理器不应失败");
        assert_eq!(response.payload(), b"cba", "闭包应收到原始载荷并产出响应");
    }

    #[test]
    fn fn_handler_propagates_errors() {
        let handler = FnHandler::new(|_request: HandlerRequest| async move {
            Err(CoreError::new(codes::TRANSPORT_IO, "连接已断开"))
        });

        let err = futures::executor::block_on(handler.handle(HandlerRequest::new(b"x")))
            .expect_err("闭包返回的错误必须原样传出");
        assert_eq!(err.code(), codes::TRANSPORT_IO);
    }
}
