//! 模拟用户池
//!
//! 只增不减。抽取远多于扩容，所以用读写锁：扩容拿写锁，抽取只拿读锁。

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::rng::SharedRng;

/// 模拟用户，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct User {
    pub id: String,
}

pub struct UserPool {
    users: RwLock<Vec<Arc<User>>>,
    rng: SharedRng,
}

impl UserPool {
    pub fn new(rng: SharedRng) -> Self {
        Self {
            users: RwLock::new(Vec::new()),
            rng,
        }
    }

    /// 扩容到至少 `min_count` 个用户，id 依次为 `user_1`、`user_2`…
    ///
    /// 返回本次新增的数量。
    pub fn ensure(&self, min_count: usize) -> usize {
        if self.users.read().len() >= min_count {
            return 0;
        }

        let mut users = self.users.write();
        let current = users.len();
        if current >= min_count {
            return 0;
        }
        users.reserve(min_count - current);
        users.extend((current + 1..=min_count).map(|n| Arc::new(User { id: format!("user_{n}") })));
        drop(users);

        debug!(from = current, to = min_count, "用户池已扩容");
        min_count - current
    }

    /// 随机抽取一个用户，池为空时返回 None
    pub fn random(&self) -> Option<Arc<User>> {
        let users = self.users.read();
        self.rng.choose(&users).cloned()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool() {
        let pool = UserPool::new(SharedRng::seeded(1));
        assert!(pool.is_empty());
        assert!(pool.random().is_none());
    }

    #[test]
    fn test_ensure_grows_never_shrinks() {
        let pool = UserPool::new(SharedRng::seeded(1));
        assert_eq!(pool.ensure(3), 3);
        assert_eq!(pool.ensure(2), 0);
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.ensure(5), 2);
        assert_eq!(pool.len(), 5);
    }

    #[test]
    fn test_sequential_ids() {
        let pool = UserPool::new(SharedRng::seeded(1));
        pool.ensure(3);
        let ids: std::collections::HashSet<String> =
            (0..200).filter_map(|_| pool.random()).map(|u| u.id.clone()).collect();
        let expected: std::collections::HashSet<String> =
            ["user_1", "user_2", "user_3"].iter().map(|s| s.to_string()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_concurrent_ensure() {
        let pool = Arc::new(UserPool::new(SharedRng::seeded(1)));
        let handles: Vec<_> = (1..=8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    pool.ensure(i * 100);
                    pool.random().is_some()
                })
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(pool.len(), 800);
    }
}
