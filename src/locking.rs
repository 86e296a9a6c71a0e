//! 按文件名的内存锁：串行化同名上传。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time;

/// Manages asynchronous mutexes keyed by stored file name.
#[derive(Debug)]
pub struct LockManager {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    wait: Duration,
}

/// 等待锁超时。
#[derive(Debug)]
pub struct LockTimeout;

impl LockManager {
    pub fn new(wait: Duration) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            wait,
        }
    }

    /// 在配置的等待时间内获取文件名锁。
    pub async fn lock_name(&self, name: &str) -> Result<OwnedMutexGuard<()>, LockTimeout> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // 没有持有者的锁可以回收，避免表无限增长。
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(name.to_lowercase())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        time::timeout(self.wait, lock.lock_owned())
            .await
            .map_err(|_| LockTimeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn second_lock_on_same_name_times_out() {
        let manager = LockManager::new(Duration::from_millis(20));
        let _guard = manager.lock_name("a.wav").await.expect("first lock");
        assert!(manager.lock_name("a.wav").await.is_err());
        assert!(manager.lock_name("A.WAV").await.is_err());
        assert!(manager.lock_name("b.wav").await.is_ok());
    }

    #[tokio::test]
    async fn lock_is_released_on_drop() {
        let manager = LockManager::new(Duration::from_millis(20));
        {
            let _guard = manager.lock_name("a.wav").await.expect("first lock");
        }
        assert!(manager.lock_name("a.wav").await.is_ok());
    }
}
