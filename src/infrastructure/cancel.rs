//! 取消信号
//!
//! 克隆后分发给所有可能等待的组件；任一处触发，所有等待立即返回

use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct CancelSignal {
    sender: Arc<watch::Sender<bool>>,
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    pub fn new() -> Self {
        let (sender, receiver) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
            receiver,
        }
    }

    /// 触发取消
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// 等待直到被取消
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        // sender 与 receiver 同生命周期，wait_for 不会因通道关闭而返回错误
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_clones_observe_cancel() {
        let signal = CancelSignal::new();
        let clone = signal.clone();
        assert!(!clone.is_cancelled());

        signal.cancel();

        assert!(clone.is_cancelled());
        tokio::time::timeout(Duration::from_secs(1), clone.cancelled())
            .await
            .expect("已取消的信号应立即返回");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_wakes_waiter() {
        let signal = CancelSignal::new();
        let waiter = {
            let signal = signal.clone();
            tokio::spawn(async move { signal.cancelled().await })
        };

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!waiter.is_finished());

        signal.cancel();
        waiter.await.unwrap();
    }
}
