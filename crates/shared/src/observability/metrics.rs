//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::OnceLock;
use tokio::net::TcpListener;
use tracing::{error, info};

/// 全局 Prometheus handle，用于渲染指标
static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics 资源守卫
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl MetricsHandle {
    /// 停止指标 HTTP 服务器
    pub fn shutdown(self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(service_name: &str, port: u16) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    // 保存到全局，供其他地方获取指标快照
    let _ = PROMETHEUS_HANDLE.set(handle.clone());

    register_common_metrics(service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle { server_handle })
}

/// 注册生成器指标的描述信息
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("clickstream_events_total", "Total number of published events");
    metrics::describe_counter!(
        "clickstream_sessions_started_total",
        "Total number of simulated sessions started"
    );
    metrics::describe_counter!(
        "clickstream_sessions_completed_total",
        "Total number of simulated sessions completed or expired"
    );
    metrics::describe_counter!(
        "clickstream_state_transitions_total",
        "Behavior model state transitions"
    );
    metrics::describe_counter!("clickstream_errors_total", "Errors by kind");
    metrics::describe_counter!("clickstream_steps_total", "Simulation steps executed");
    metrics::describe_gauge!("clickstream_queue_depth", "Events waiting in the output queue");
    metrics::describe_gauge!("clickstream_active_sessions", "Sessions held by the registry");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

/// 获取全局 Prometheus handle（用于自定义渲染）
pub fn get_handle() -> Option<&'static PrometheusHandle> {
    PROMETHEUS_HANDLE.get()
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录已发布事件
#[inline]
pub fn record_event(event_type: &str) {
    metrics::counter!(
        "clickstream_events_total",
        "event_type" => event_type.to_string()
    )
    .increment(1);
}

/// 记录会话开始
#[inline]
pub fn record_session_started() {
    metrics::counter!("clickstream_sessions_started_total").increment(1);
}

/// 记录会话结束
#[inline]
pub fn record_session_completed() {
    metrics::counter!("clickstream_sessions_completed_total").increment(1);
}

/// 记录状态迁移
#[inline]
pub fn record_state_transition(prev: &str, next: &str) {
    metrics::counter!(
        "clickstream_state_transitions_total",
        "from" => prev.to_string(),
        "to" => next.to_string()
    )
    .increment(1);
}

/// 记录错误
#[inline]
pub fn record_error(kind: &str) {
    metrics::counter!("clickstream_errors_total", "kind" => kind.to_string()).increment(1);
}

/// 记录执行的 step 数
#[inline]
pub fn record_steps(count: u64) {
    metrics::counter!("clickstream_steps_total").increment(count);
}

/// 更新输出队列深度
#[inline]
pub fn set_queue_depth(depth: usize) {
    metrics::gauge!("clickstream_queue_depth").set(depth as f64);
}

/// 更新活跃会话数
#[inline]
pub fn set_active_sessions(count: usize) {
    metrics::gauge!("clickstream_active_sessions").set(count as f64);
}
