//! 资源所有权与弱句柄
//!
//! [`Resource<T>`] 是资源的唯一所有者，[`ResourceHandle<T>`] 是可以任意克隆、
//! 跨线程传递的非拥有句柄。句柄从不延长资源的生命周期：所有者被销毁
//! （drop 或 [`Resource::take`]）后，所有句柄立即失效，访问会返回
//! [`ResourceError::Destroyed`]。
//!
//! GUI 面板通过句柄观察引擎对象（性能分析器、清单等），引擎保留所有权。
//!
//! ```
//! use asaogea::core::resource::Resource;
//!
//! let owner = Resource::new(41);
//! let handle = owner.handle();
//! *handle.write().unwrap() += 1;
//! assert_eq!(*owner.read().unwrap(), 42);
//!
//! drop(owner);
//! assert!(!handle.is_valid());
//! ```

use std::any::type_name;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Weak};

use parking_lot::{
    ArcRwLockReadGuard, ArcRwLockWriteGuard, MappedRwLockReadGuard, MappedRwLockWriteGuard, RawRwLock, RwLock,
    RwLockReadGuard, RwLockWriteGuard,
};

use super::error::ResourceError;

type Slot<T> = RwLock<Option<T>>;

fn destroyed<T>() -> ResourceError {
    ResourceError::Destroyed { type_name: type_name::<T>() }
}

/// 资源所有者
pub struct Resource<T> {
    slot: Option<Arc<Slot<T>>>,
}

impl<T> Default for Resource<T> {
    /// 空资源，不持有任何值
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> Resource<T> {
    pub fn new(value: T) -> Self {
        Self {
            slot: Some(Arc::new(RwLock::new(Some(value)))),
        }
    }

    /// 资源是否持有值
    pub fn is_valid(&self) -> bool {
        self.slot.as_ref().map_or(false, |slot| slot.read().is_some())
    }

    /// 创建一个指向该资源的句柄
    ///
    /// 空资源返回的句柄从一开始就是失效的。
    pub fn handle(&self) -> ResourceHandle<T> {
        ResourceHandle {
            slot: self.slot.as_ref().map(Arc::downgrade).unwrap_or_default(),
        }
    }

    pub fn read(&self) -> Result<MappedRwLockReadGuard<'_, T>, ResourceError> {
        let slot = self.slot.as_ref().ok_or_else(destroyed::<T>)?;
        RwLockReadGuard::try_map(slot.read(), Option::as_ref).map_err(|_| destroyed::<T>())
    }

    pub fn write(&self) -> Result<MappedRwLockWriteGuard<'_, T>, ResourceError> {
        let slot = self.slot.as_ref().ok_or_else(destroyed::<T>)?;
        RwLockWriteGuard::try_map(slot.write(), Option::as_mut).map_err(|_| destroyed::<T>())
    }

    /// 取出资源的值，之后所有句柄失效
    pub fn take(&mut self) -> Option<T> {
        let slot = self.slot.take()?;
        let value = slot.write().take();
        value
    }

    /// 替换资源的值，已有句柄继续指向新值
    pub fn replace(&self, value: T) -> Option<T> {
        self.slot.as_ref().and_then(|slot| slot.write().replace(value))
    }
}

impl<T> Drop for Resource<T> {
    fn drop(&mut self) {
        // 句柄可能已经升级并持有守卫，先清空值保证之后的访问都失败
        if let Some(slot) = self.slot.take() {
            slot.write().take();
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.read() {
            Ok(value) => f.debug_tuple("Resource").field(&*value).finish(),
            Err(_) => write!(f, "Resource<{}>(null)", type_name::<T>()),
        }
    }
}

/// 非拥有的资源句柄
pub struct ResourceHandle<T> {
    slot: Weak<Slot<T>>,
}

impl<T> Clone for ResourceHandle<T> {
    fn clone(&self) -> Self {
        Self { slot: self.slot.clone() }
    }
}

impl<T> Default for ResourceHandle<T> {
    fn default() -> Self {
        Self { slot: Weak::new() }
    }
}

impl<T> fmt::Debug for ResourceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceHandle<{}>(valid: {})", type_name::<T>(), self.is_valid())
    }
}

impl<T> ResourceHandle<T> {
    pub fn is_valid(&self) -> bool {
        self.slot.upgrade().map_or(false, |slot| slot.read().is_some())
    }

    /// 只读访问
    ///
    /// 同一线程可以重复获取读守卫（递归读锁），不会因为排队的写者而死锁。
    pub fn read(&self) -> Result<HandleReadGuard<T>, ResourceError> {
        let slot = self.slot.upgrade().ok_or_else(destroyed::<T>)?;
        let guard = slot.read_arc_recursive();
        if guard.is_none() {
            return Err(destroyed::<T>());
        }
        Ok(HandleReadGuard { guard })
    }

    /// 可写访问
    pub fn write(&self) -> Result<HandleWriteGuard<T>, ResourceError> {
        let slot = self.slot.upgrade().ok_or_else(destroyed::<T>)?;
        let guard = slot.write_arc();
        if guard.is_none() {
            return Err(destroyed::<T>());
        }
        Ok(HandleWriteGuard { guard })
    }

    /// 在读守卫内执行 `f`
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, ResourceError> {
        self.read().map(|guard| f(&guard))
    }

    /// 在写守卫内执行 `f`
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<R, ResourceError> {
        self.write().map(|mut guard| f(&mut guard))
    }

    /// 两个句柄是否指向同一个资源
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.slot.ptr_eq(&other.slot)
    }
}

/// [`ResourceHandle::read`] 返回的守卫，持有期间资源不会被销毁
pub struct HandleReadGuard<T> {
    guard: ArcRwLockReadGuard<RawRwLock, Option<T>>,
}

impl<T> Deref for HandleReadGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &*self.guard {
            Some(value) => value,
            None => unreachable!("resource destroyed while a read guard was held"),
        }
    }
}

/// [`ResourceHandle::write`] 返回的守卫
pub struct HandleWriteGuard<T> {
    guard: ArcRwLockWriteGuard<RawRwLock, Option<T>>,
}

impl<T> Deref for HandleWriteGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        match &*self.guard {
            Some(value) => value,
            None => unreachable!("resource destroyed while a write guard was held"),
        }
    }
}

impl<T> DerefMut for HandleWriteGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        match &mut *self.guard {
            Some(value) => value,
            None => unreachable!("resource destroyed while a write guard was held"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_handle_reads_owner_value() {
        let owner = Resource::new(String::from("mesh"));
        let handle = owner.handle();

        assert!(owner.is_valid());
        assert!(handle.is_valid());
        assert_eq!(handle.with(|s| s.len()).unwrap(), 4);
    }

    #[test]
    fn test_handle_invalidated_on_drop() {
        let owner = Resource::new(vec![1, 2, 3]);
        let handle = owner.handle();
        let copy = handle.clone();
        drop(owner);

        assert!(!handle.is_valid());
        assert!(!copy.is_valid());
        assert_eq!(
            handle.with(|v| v.len()),
            Err(ResourceError::Destroyed { type_name: type_name::<Vec<i32>>() })
        );
    }

    #[test]
    fn test_take_invalidates_handles() {
        let mut owner = Resource::new(7u32);
        let handle = owner.handle();

        assert_eq!(owner.take(), Some(7));
        assert!(!owner.is_valid());
        assert!(!handle.is_valid());
        assert!(owner.read().is_err());
        assert_eq!(owner.take(), None);
    }

    #[test]
    fn test_default_is_null() {
        let owner: Resource<u8> = Resource::default();
        assert!(!owner.is_valid());
        assert!(!owner.handle().is_valid());
        assert!(!ResourceHandle::<u8>::default().is_valid());
    }

    #[test]
    fn test_replace_keeps_handles() {
        let owner = Resource::new(1);
        let handle = owner.handle();
        assert_eq!(owner.replace(2), Some(1));
        assert_eq!(handle.with(|v| *v).unwrap(), 2);
    }

    #[test]
    fn test_handle_guards() {
        let owner = Resource::new(vec![1, 2]);
        let handle = owner.handle();

        handle.write().unwrap().push(3);
        {
            let outer = handle.read().unwrap();
            // 同一线程的嵌套读取
            let inner = handle.read().unwrap();
            assert_eq!(outer.len(), 3);
            assert_eq!(*inner, vec![1, 2, 3]);
        }

        drop(owner);
        assert!(matches!(handle.read(), Err(ResourceError::Destroyed { .. })));
        assert!(handle.write().is_err());
    }

    #[test]
    fn test_ptr_eq() {
        let a = Resource::new(0);
        let b = Resource::new(0);
        assert!(a.handle().ptr_eq(&a.handle()));
        assert!(!a.handle().ptr_eq(&b.handle()));
    }

    #[test]
    fn test_handles_across_threads() {
        let owner = Resource::new(0usize);
        let workers: Vec<_> = (0..4)
            .map(|_| {
                let handle = owner.handle();
                thread::spawn(move || {
                    for _ in 0..100 {
                        *handle.write().unwrap() += 1;
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        assert_eq!(*owner.read().unwrap(), 400);
    }
}
