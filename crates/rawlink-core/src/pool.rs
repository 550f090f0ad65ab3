/// A type whose instances can be recycled through an [`ObjectPool`].
///
/// `reset` must restore every observable field to its empty value so a reused
/// instance carries nothing over from its previous use.
pub trait Poolable: Default {
    /// Clears the instance for reuse.
    fn reset(&mut self);
}

/// A simple object pool that reuses instances to keep the hot path allocation free.
///
/// `release` takes the object by value, so a released instance can no longer be
/// reached through the caller.
pub struct ObjectPool<T: Poolable> {
    /// Pool of reusable instances
    pool: Vec<T>,
    /// Maximum pool size
    max_pool_size: usize,
    /// Instances constructed because the pool was empty
    created: usize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Creates an empty pool that retains at most `max_pool_size` instances.
    pub fn new(max_pool_size: usize) -> Self {
        Self { pool: Vec::with_capacity(max_pool_size), max_pool_size, created: 0 }
    }

    /// Creates a pool pre-filled with `count` instances.
    pub fn with_warm_up(count: usize, max_pool_size: usize) -> Self {
        let mut pool = Self::new(max_pool_size.max(count));
        pool.pool.extend((0..count).map(|_| T::default()));
        pool.created = count;
        pool
    }

    /// Takes a reset instance from the pool or constructs a new one.
    pub fn acquire(&mut self) -> T {
        match self.pool.pop() {
            Some(mut item) => {
                item.reset();
                item
            }
            None => {
                self.created += 1;
                T::default()
            }
        }
    }

    /// Returns an instance to the pool for reuse. Dropped if the pool is full.
    pub fn release(&mut self, item: T) {
        if self.pool.len() < self.max_pool_size {
            self.pool.push(item);
        }
    }

    /// Returns the number of instances currently in the pool.
    pub fn available(&self) -> usize {
        self.pool.len()
    }

    /// Returns how many instances this pool has constructed.
    pub fn created(&self) -> usize {
        self.created
    }

    /// Clears all pooled instances.
    pub fn clear(&mut self) {
        self.pool.clear();
    }
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new(256)
    }
}

impl<T: Poolable> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.pool.len())
            .field("max_pool_size", &self.max_pool_size)
            .field("created", &self.created)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default, Debug, PartialEq)]
    struct Scratch {
        tag: u8,
        bytes: Vec<u8>,
    }

    impl Poolable for Scratch {
        fn reset(&mut self) {
            self.tag = 0;
            self.bytes.clear();
        }
    }

    #[test]
    fn test_acquire_after_release_is_reset() {
        let mut pool = ObjectPool::<Scratch>::new(4);
        let mut item = pool.acquire();
        item.tag = 9;
        item.bytes.extend_from_slice(&[1, 2, 3]);
        pool.release(item);
        assert_eq!(pool.available(), 1);

        let reused = pool.acquire();
        assert_eq!(reused, Scratch::default());
        assert!(reused.bytes.capacity() >= 3, "capacity should survive reuse");
        assert_eq!(pool.created(), 1);
    }

    #[test]
    fn test_max_pool_size() {
        let mut pool = ObjectPool::<Scratch>::new(2);
        for _ in 0..5 {
            pool.release(Scratch::default());
        }
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_warm_up_avoids_construction() {
        let mut pool = ObjectPool::<Scratch>::with_warm_up(3, 3);
        assert_eq!(pool.created(), 3);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_eq!(pool.created(), 3);
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn test_clear() {
        let mut pool = ObjectPool::<Scratch>::default();
        for _ in 0..5 {
            pool.release(Scratch::default());
        }
        pool.clear();
        assert_eq!(pool.available(), 0);
    }
}
