//! sink worker

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::Sink;
use crate::event::Event;
use crate::metrics::Metrics;

/// 多个 sink worker 共享的输出队列接收端
pub type SharedReceiver = Arc<Mutex<mpsc::Receiver<Event>>>;

pub struct SinkWorker {
    id: usize,
    sink: Arc<dyn Sink>,
    queue: SharedReceiver,
    metrics: Arc<dyn Metrics>,
}

impl SinkWorker {
    pub fn new(
        id: usize,
        sink: Arc<dyn Sink>,
        queue: SharedReceiver,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            id,
            sink,
            queue,
            metrics,
        }
    }

    /// 持续消费直到取消或队列关闭，返回成功发布的数量
    pub async fn run(self, cancel: CancellationToken) -> u64 {
        let mut published = 0;
        loop {
            let event = {
                let mut rx = self.queue.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    event = rx.recv() => event,
                }
            };
            let Some(event) = event else {
                break;
            };

            match self.sink.publish(&event).await {
                Ok(()) => {
                    published += 1;
                    self.metrics.inc_event(event.event_type);
                }
                Err(e) => {
                    self.metrics.inc_error(e.kind());
                    warn!(
                        worker = self.id,
                        event_id = %event.event_id,
                        error = %e,
                        "事件发布失败"
                    );
                }
            }
        }
        debug!(worker = self.id, published, "sink worker 已退出");
        published
    }
}
