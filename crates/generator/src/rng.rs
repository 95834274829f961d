//! 可注入的随机源
//!
//! 行为引擎、负载生成器和用户池都从同一个显式传入的随机源取数，
//! 测试中用固定种子即可复现整条会话轨迹。

use std::sync::Arc;

use parking_lot::Mutex;
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// 线程安全、可设定种子的共享随机源
///
/// 克隆只增加引用计数，所有克隆共享同一条随机序列。
/// 每次取数只持锁一次，锁内不做任何 I/O。
#[derive(Clone, Debug)]
pub struct SharedRng {
    inner: Arc<Mutex<ChaCha8Rng>>,
}

impl SharedRng {
    /// 使用固定种子创建
    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// 使用系统熵创建
    pub fn from_entropy() -> Self {
        Self::seeded(rand::random())
    }

    /// 有种子用种子，否则用系统熵
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// 派生一个独立的随机源
    ///
    /// 子随机源的种子取自父随机源，种子固定时派生结果也固定。
    pub fn fork(&self) -> Self {
        let seed = self.inner.lock().r#gen::<u64>();
        Self::seeded(seed)
    }

    /// 在持锁状态下直接使用底层生成器
    pub fn with<T>(&self, f: impl FnOnce(&mut ChaCha8Rng) -> T) -> T {
        let mut rng = self.inner.lock();
        f(&mut rng)
    }

    pub fn gen_range<T, R>(&self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.inner.lock().gen_range(range)
    }

    /// `[0, 1)` 上的均匀浮点数
    pub fn gen_f64(&self) -> f64 {
        self.inner.lock().r#gen::<f64>()
    }

    /// `[0, len)` 上的随机下标，`len == 0` 时返回 None
    pub fn gen_index(&self, len: usize) -> Option<usize> {
        (len > 0).then(|| self.gen_range(0..len))
    }

    /// `[0, bound)` 上的随机整数，`bound == 0` 时返回 0
    pub fn gen_u32_below(&self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }

    /// 从切片中等概率选一个元素，空切片返回 None
    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        self.gen_index(items.len()).and_then(|idx| items.get(idx))
    }
}
