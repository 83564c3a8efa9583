//! `ParallelVector<T>`: a growable typed array backed by an anonymous mapping.
//!
//! Algorithms allocate and discard per-vertex/per-edge scratch arrays on every
//! iteration, often with billions of elements. Mapping the storage directly keeps
//! allocation O(1) and leaves untouched pages unbacked.
//!
//! Memory layout:
//! - `[0, len)`: constructed elements
//! - `[len, capacity)`: reserved, uninitialized storage
//!
//! The vector never grows on its own. Appending beyond `capacity` is an error, so
//! pointers handed to in-flight traversals stay valid until an explicit `realloc`.

use core::{
    fmt,
    marker::PhantomData,
    mem,
    ops::{Index, IndexMut},
    ptr::{self, NonNull},
    slice,
    sync::atomic::{AtomicUsize, Ordering},
};
use std::alloc::Layout;

use rayon::prelude::*;
use tracing::warn;

use crate::{
    alloc::region::{allocate_region, free_region, PAGE_SIZE},
    concurrency::worker::Worker,
    error::{OlapError, Result},
};

/// A move-only, mmap-backed typed array with explicit capacity management.
///
/// ### Performance Characteristics
/// | Operation | Complexity | Notes |
/// |-----------|------------|-------|
/// | `with_capacity` | \(O(1)\) | one anonymous mapping, no zero-fill |
/// | `realloc` | \(O(len)\) | copies only the live elements |
/// | `append` / `Appender::append` | \(O(1)\) | atomic range reservation for the shared form |
/// | `fill` | \(O(len / p)\) | data-parallel on the worker's pool |
/// | `swap` | \(O(1)\) | exchanges handles, no copy |
pub struct ParallelVector<T> {
    ptr: NonNull<T>,
    capacity: usize,
    len: AtomicUsize,
    destroyed: bool,
    _marker: PhantomData<T>,
}

// SAFETY: the vector owns its elements exactly like `Vec<T>`.
unsafe impl<T: Send> Send for ParallelVector<T> {}
// SAFETY: shared access only hands out `&T`.
unsafe impl<T: Sync> Sync for ParallelVector<T> {}

impl<T> ParallelVector<T> {
    /// Creates an empty vector with no storage (capacity 0).
    pub const fn new() -> Self {
        Self {
            ptr: NonNull::dangling(),
            capacity: 0,
            len: AtomicUsize::new(0),
            destroyed: true,
            _marker: PhantomData,
        }
    }

    /// Reserves storage for `capacity` elements without constructing any.
    ///
    /// # Errors
    /// [`OlapError::InvalidCapacity`] if `capacity == 0`, or
    /// [`OlapError::AllocationFailed`] if the mapping fails.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        let ptr = Self::map(capacity)?;
        Ok(Self {
            ptr,
            capacity,
            len: AtomicUsize::new(0),
            destroyed: false,
            _marker: PhantomData,
        })
    }

    /// Reserves `capacity` elements and default-constructs the first `len`.
    ///
    /// # Errors
    /// As [`ParallelVector::with_capacity`], plus [`OlapError::CapacityExceeded`]
    /// if `len > capacity`.
    pub fn with_len(capacity: usize, len: usize) -> Result<Self>
    where
        T: Default,
    {
        let mut vector = Self::with_capacity(capacity)?;
        vector.resize_default(len)?;
        Ok(vector)
    }

    fn map(capacity: usize) -> Result<NonNull<T>> {
        if capacity == 0 {
            return Err(OlapError::InvalidCapacity);
        }
        debug_assert!(mem::align_of::<T>() <= PAGE_SIZE);
        let bytes = Layout::array::<T>(capacity)
            .map_err(|_| OlapError::AllocationFailed {
                bytes: capacity.saturating_mul(mem::size_of::<T>()),
            })?
            .size();
        if bytes == 0 {
            return Ok(NonNull::dangling());
        }
        allocate_region(bytes)
            .map(NonNull::cast)
            .ok_or(OlapError::AllocationFailed { bytes })
    }

    /// # Safety
    /// `ptr`/`capacity` must come from a successful [`ParallelVector::map`].
    unsafe fn unmap(ptr: NonNull<T>, capacity: usize) {
        let bytes = capacity * mem::size_of::<T>();
        if bytes == 0 {
            return;
        }
        if !free_region(ptr.cast(), bytes) {
            warn!(bytes, "unmapping a vector failed: potential memory leak");
        }
    }

    /// Number of constructed elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Returns `true` if no element is constructed.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements the storage can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` if the vector has no storage (never allocated or destroyed).
    #[inline]
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// The constructed elements.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is constructed; appenders hold `&mut self`, so `len` is stable here.
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    /// The constructed elements, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let len = *self.len.get_mut();
        // SAFETY: `[0, len)` is constructed and we hold the only reference.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), len) }
    }

    /// Raw pointer to the start of the storage.
    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    /// Iterates over the constructed elements.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Iterates mutably over the constructed elements.
    pub fn iter_mut(&mut self) -> slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    /// The last constructed element.
    pub fn last(&self) -> Option<&T> {
        self.as_slice().last()
    }

    /// Grows the storage to `capacity`, moving the live elements over.
    ///
    /// Exactly `len * size_of::<T>()` bytes are copied; the uninitialized tail is not.
    /// Reallocating to the current capacity is a no-op.
    ///
    /// # Errors
    /// [`OlapError::CapacityShrink`] if `capacity` is below the current capacity,
    /// [`OlapError::InvalidCapacity`] if it is 0, or [`OlapError::AllocationFailed`].
    pub fn realloc(&mut self, capacity: usize) -> Result<()> {
        if capacity < self.capacity {
            return Err(OlapError::CapacityShrink {
                current: self.capacity,
                requested: capacity,
            });
        }
        if capacity == 0 {
            return Err(OlapError::InvalidCapacity);
        }
        if capacity == self.capacity {
            return Ok(());
        }
        let new_ptr = Self::map(capacity)?;
        if self.capacity != 0 {
            let len = *self.len.get_mut();
            // SAFETY: both regions hold at least `len` elements and are distinct mappings.
            unsafe {
                ptr::copy_nonoverlapping(self.ptr.as_ptr(), new_ptr.as_ptr(), len);
                Self::unmap(self.ptr, self.capacity);
            }
        }
        self.ptr = new_ptr;
        self.capacity = capacity;
        self.destroyed = false;
        Ok(())
    }

    fn check_grow(&self, len: usize, new_len: usize) -> Result<()> {
        if new_len < len {
            return Err(OlapError::SizeShrink {
                current: len,
                requested: new_len,
            });
        }
        if new_len > self.capacity {
            return Err(OlapError::CapacityExceeded {
                capacity: self.capacity,
                requested: new_len,
            });
        }
        Ok(())
    }

    /// Default-constructs elements in `[len, new_len)`.
    ///
    /// # Errors
    /// [`OlapError::SizeShrink`] if `new_len < len`, [`OlapError::CapacityExceeded`]
    /// if `new_len > capacity`.
    pub fn resize_default(&mut self, new_len: usize) -> Result<()>
    where
        T: Default,
    {
        let len = *self.len.get_mut();
        self.check_grow(len, new_len)?;
        for i in len..new_len {
            // SAFETY: `i < new_len <= capacity`, slot is unconstructed.
            unsafe { self.ptr.as_ptr().add(i).write(T::default()) };
            *self.len.get_mut() = i + 1;
        }
        Ok(())
    }

    /// Clones `value` into every slot of `[len, new_len)`.
    ///
    /// # Errors
    /// As [`ParallelVector::resize_default`].
    pub fn resize(&mut self, new_len: usize, value: T) -> Result<()>
    where
        T: Clone,
    {
        let len = *self.len.get_mut();
        self.check_grow(len, new_len)?;
        for i in len..new_len {
            // SAFETY: `i < new_len <= capacity`, slot is unconstructed.
            unsafe { self.ptr.as_ptr().add(i).write(value.clone()) };
            *self.len.get_mut() = i + 1;
        }
        Ok(())
    }

    /// Overwrites every live element with `value`, in parallel on the shared worker.
    ///
    /// Must not be called from inside a delegated region.
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] when called from a delegated region, or any
    /// error raised while starting the shared worker.
    pub fn fill(&mut self, value: T) -> Result<()>
    where
        T: Clone + Send + Sync,
    {
        let worker = Worker::shared()?;
        self.fill_on(&worker, value)
    }

    /// Like [`ParallelVector::fill`], on an explicit worker.
    ///
    /// # Errors
    /// [`OlapError::NestedDelegate`] when called from a delegated region.
    pub fn fill_on(&mut self, worker: &Worker, value: T) -> Result<()>
    where
        T: Clone + Send + Sync,
    {
        let elements = self.as_mut_slice();
        let value = &value;
        worker.delegate(move |pool| {
            pool.install(|| elements.par_iter_mut().for_each(|slot| *slot = value.clone()));
        })
    }

    /// Appends one element.
    ///
    /// Exclusive access makes this the non-atomic form; use [`ParallelVector::appender`]
    /// to append from many threads.
    ///
    /// # Errors
    /// [`OlapError::CapacityExceeded`] if the vector is full; the vector is unchanged.
    pub fn append(&mut self, value: T) -> Result<()> {
        let len = *self.len.get_mut();
        if len >= self.capacity {
            return Err(OlapError::CapacityExceeded {
                capacity: self.capacity,
                requested: len + 1,
            });
        }
        // SAFETY: `len < capacity`, slot is unconstructed.
        unsafe { self.ptr.as_ptr().add(len).write(value) };
        *self.len.get_mut() = len + 1;
        Ok(())
    }

    /// Appends clones of all `values`.
    ///
    /// # Errors
    /// [`OlapError::CapacityExceeded`] if they do not all fit; nothing is appended then.
    pub fn append_slice(&mut self, values: &[T]) -> Result<()>
    where
        T: Clone,
    {
        let len = *self.len.get_mut();
        let end = len.saturating_add(values.len());
        if end > self.capacity {
            return Err(OlapError::CapacityExceeded {
                capacity: self.capacity,
                requested: end,
            });
        }
        for (i, value) in values.iter().enumerate() {
            // SAFETY: `len + i < end <= capacity`, slot is unconstructed.
            unsafe { self.ptr.as_ptr().add(len + i).write(value.clone()) };
            *self.len.get_mut() = len + i + 1;
        }
        Ok(())
    }

    /// Appends clones of every live element of `other`.
    ///
    /// # Errors
    /// As [`ParallelVector::append_slice`].
    pub fn append_vector(&mut self, other: &ParallelVector<T>) -> Result<()>
    where
        T: Clone,
    {
        self.append_slice(other.as_slice())
    }

    /// Returns a shared handle for lock-free appends from many threads.
    ///
    /// Each append claims a disjoint index range with one atomic read-modify-write.
    /// The vector cannot be read while the handle is alive.
    pub fn appender(&mut self) -> Appender<'_, T> {
        Appender { vector: self }
    }

    /// Returns a shared handle for unsynchronized writes to disjoint slots of `[0, capacity)`.
    ///
    /// This is what parallel passes use when every slot has exactly one writer
    /// (e.g. vertex `v` visited once by a traversal, or a CSR slot claimed by `fetch_add`).
    pub fn as_sync_slots(&mut self) -> SyncSlots<'_, T> {
        SyncSlots {
            ptr: self.ptr,
            capacity: self.capacity,
            _marker: PhantomData,
        }
    }

    /// Sets the number of live elements.
    ///
    /// # Safety
    /// `new_len <= capacity`, and every slot in `[0, new_len)` must be initialized.
    pub unsafe fn set_len(&mut self, new_len: usize) {
        debug_assert!(new_len <= self.capacity);
        *self.len.get_mut() = new_len;
    }

    /// Drops the live elements and sets the length to 0. Storage is kept.
    pub fn clear(&mut self) {
        let len = mem::replace(self.len.get_mut(), 0);
        if mem::needs_drop::<T>() && len > 0 {
            // SAFETY: `[0, len)` was constructed and is no longer reachable (len is 0).
            unsafe { ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), len)) };
        }
    }

    /// Exchanges storage, length and capacity with `other` in O(1).
    pub fn swap(&mut self, other: &mut ParallelVector<T>) {
        mem::swap(self, other);
    }

    /// Deep copy with the same capacity; only live elements are copied.
    ///
    /// # Errors
    /// [`OlapError::AllocationFailed`] if the new mapping fails.
    pub fn try_clone(&self) -> Result<Self>
    where
        T: Clone,
    {
        if self.capacity == 0 {
            return Ok(Self::new());
        }
        let mut copy = Self::with_capacity(self.capacity)?;
        copy.append_slice(self.as_slice())?;
        Ok(copy)
    }

    /// Drops the live elements and unmaps the storage. Calling it twice is a no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.clear();
        // SAFETY: storage came from `map` with this capacity and no borrows remain.
        unsafe { Self::unmap(self.ptr, self.capacity) };
        self.ptr = NonNull::dangling();
        self.capacity = 0;
        self.destroyed = true;
    }
}

impl<T> Drop for ParallelVector<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl<T> Default for ParallelVector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for ParallelVector<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T> IndexMut<usize> for ParallelVector<T> {
    #[inline]
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<'a, T> IntoIterator for &'a ParallelVector<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T> IntoIterator for &'a mut ParallelVector<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T> fmt::Debug for ParallelVector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelVector")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

/// Shared, lock-free append access to a [`ParallelVector`].
///
/// Concurrent appends each receive a disjoint index range. A failed append
/// (capacity exceeded) reserves nothing, so `len <= capacity` always holds.
pub struct Appender<'a, T> {
    vector: &'a mut ParallelVector<T>,
}

// SAFETY: appenders only move `T` values into distinct, freshly reserved slots.
unsafe impl<T: Send> Sync for Appender<'_, T> {}
// SAFETY: as above.
unsafe impl<T: Send> Send for Appender<'_, T> {}

impl<T> Appender<'_, T> {
    fn reserve(&self, count: usize) -> Result<usize> {
        let capacity = self.vector.capacity;
        self.vector
            .len
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |len| {
                len.checked_add(count).filter(|&end| end <= capacity)
            })
            .map_err(|len| OlapError::CapacityExceeded {
                capacity,
                requested: len.saturating_add(count),
            })
    }

    /// Appends `value`, returning the index it was written to.
    ///
    /// # Errors
    /// [`OlapError::CapacityExceeded`] if the vector is full.
    pub fn append(&self, value: T) -> Result<usize> {
        let at = self.reserve(1)?;
        // SAFETY: slot `at` was reserved by this call alone and is below capacity.
        unsafe { self.vector.ptr.as_ptr().add(at).write(value) };
        Ok(at)
    }

    /// Appends all `values` contiguously, returning the index of the first.
    ///
    /// # Errors
    /// [`OlapError::CapacityExceeded`] if they do not all fit; nothing is appended then.
    pub fn append_slice(&self, values: &[T]) -> Result<usize>
    where
        T: Copy,
    {
        let at = self.reserve(values.len())?;
        // SAFETY: `[at, at + len)` was reserved by this call alone and is below capacity.
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), self.vector.ptr.as_ptr().add(at), values.len());
        }
        Ok(at)
    }

    /// Appends every live element of `other`, returning the index of the first.
    ///
    /// # Errors
    /// As [`Appender::append_slice`].
    pub fn append_vector(&self, other: &ParallelVector<T>) -> Result<usize>
    where
        T: Copy,
    {
        self.append_slice(other.as_slice())
    }

    /// Number of slots reserved so far.
    pub fn len(&self) -> usize {
        self.vector.len.load(Ordering::Acquire)
    }

    /// Returns `true` if nothing has been reserved.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Capacity of the underlying vector.
    pub fn capacity(&self) -> usize {
        self.vector.capacity
    }
}

/// Shared handle for unsynchronized writes to distinct slots of a [`ParallelVector`].
pub struct SyncSlots<'a, T> {
    ptr: NonNull<T>,
    capacity: usize,
    _marker: PhantomData<&'a mut [T]>,
}

// SAFETY: writers promise disjoint slots; values cross threads by move.
unsafe impl<T: Send> Sync for SyncSlots<'_, T> {}
// SAFETY: as above.
unsafe impl<T: Send> Send for SyncSlots<'_, T> {}

impl<T> SyncSlots<'_, T> {
    /// Number of addressable slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Writes `value` into slot `index` without dropping the previous content.
    ///
    /// # Safety
    /// `index < capacity`, and no other thread reads or writes slot `index` concurrently.
    #[inline(always)]
    pub unsafe fn write(&self, index: usize, value: T) {
        debug_assert!(index < self.capacity);
        self.ptr.as_ptr().add(index).write(value);
    }

    /// Reads slot `index`.
    ///
    /// # Safety
    /// `index < capacity`, the slot is initialized, and no thread writes it concurrently.
    #[inline(always)]
    pub unsafe fn read(&self, index: usize) -> T
    where
        T: Copy,
    {
        debug_assert!(index < self.capacity);
        self.ptr.as_ptr().add(index).read()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ParallelVector::<u64>::with_capacity(0),
            Err(OlapError::InvalidCapacity)
        ));
        let mut v = ParallelVector::<u64>::new();
        assert!(matches!(v.realloc(0), Err(OlapError::InvalidCapacity)));
    }

    #[test]
    fn with_len_default_constructs() {
        let v = ParallelVector::<u32>::with_len(16, 10).unwrap();
        assert_eq!(v.len(), 10);
        assert_eq!(v.capacity(), 16);
        assert!(v.iter().all(|&x| x == 0));
        assert!(matches!(
            ParallelVector::<u32>::with_len(4, 5),
            Err(OlapError::CapacityExceeded { capacity: 4, requested: 5 })
        ));
    }

    #[test]
    fn resize_never_shrinks_or_overflows() {
        let mut v = ParallelVector::<u16>::with_len(8, 4).unwrap();
        assert!(matches!(v.resize_default(3), Err(OlapError::SizeShrink { .. })));
        assert!(matches!(v.resize(9, 1), Err(OlapError::CapacityExceeded { .. })));
        v.resize(6, 7).unwrap();
        assert_eq!(v.as_slice(), &[0, 0, 0, 0, 7, 7]);
    }

    #[test]
    fn realloc_moves_every_live_element() {
        let mut v = ParallelVector::<u64>::with_capacity(4).unwrap();
        for x in [11, 22, 33] {
            v.append(x).unwrap();
        }
        v.realloc(1 << 12).unwrap();
        assert_eq!(v.capacity(), 1 << 12);
        assert_eq!(v.as_slice(), &[11, 22, 33]);
        assert!(matches!(
            v.realloc(16),
            Err(OlapError::CapacityShrink { current: 4096, requested: 16 })
        ));
    }

    #[test]
    fn realloc_revives_a_destroyed_vector() {
        let mut v = ParallelVector::<u8>::new();
        assert!(v.is_destroyed());
        v.realloc(3).unwrap();
        assert!(!v.is_destroyed());
        v.append(1).unwrap();
        assert_eq!(v[0], 1);
    }

    #[test]
    fn append_past_capacity_leaves_vector_unchanged() {
        let mut v = ParallelVector::<i32>::with_capacity(2).unwrap();
        v.append_slice(&[1, 2]).unwrap();
        assert!(matches!(v.append(3), Err(OlapError::CapacityExceeded { .. })));
        assert!(v.append_slice(&[4]).is_err());
        assert_eq!(v.as_slice(), &[1, 2]);
    }

    #[test]
    fn append_vector_copies_other() {
        let mut a = ParallelVector::<i32>::with_capacity(5).unwrap();
        let mut b = ParallelVector::<i32>::with_capacity(3).unwrap();
        a.append(1).unwrap();
        b.append_slice(&[2, 3]).unwrap();
        a.append_vector(&b).unwrap();
        assert_eq!(a.as_slice(), &[1, 2, 3]);
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn concurrent_appends_claim_disjoint_slots() {
        const THREADS: usize = 64;
        let mut v = ParallelVector::<usize>::with_capacity(THREADS).unwrap();
        {
            let appender = v.appender();
            std::thread::scope(|s| {
                for t in 0..THREADS {
                    let appender = &appender;
                    s.spawn(move || appender.append(t).unwrap());
                }
            });
            assert_eq!(appender.len(), THREADS);
        }
        let mut seen: Vec<usize> = v.iter().copied().collect();
        seen.sort_unstable();
        assert_eq!(seen, (0..THREADS).collect::<Vec<_>>());
    }

    #[test]
    fn concurrent_appends_stop_at_capacity() {
        let mut v = ParallelVector::<u32>::with_capacity(10).unwrap();
        let ok = AtomicUsize::new(0);
        {
            let appender = v.appender();
            std::thread::scope(|s| {
                for t in 0..16u32 {
                    let (appender, ok) = (&appender, &ok);
                    s.spawn(move || {
                        if appender.append_slice(&[t]).is_ok() {
                            ok.fetch_add(1, Ordering::Relaxed);
                        }
                    });
                }
            });
        }
        assert_eq!(ok.load(Ordering::Relaxed), 10);
        assert_eq!(v.len(), 10);
    }

    #[test]
    fn clear_drops_but_keeps_storage() {
        let tracker = Arc::new(());
        let mut v = ParallelVector::<Arc<()>>::with_capacity(8).unwrap();
        v.resize(5, Arc::clone(&tracker)).unwrap();
        assert_eq!(Arc::strong_count(&tracker), 6);
        v.clear();
        assert_eq!(Arc::strong_count(&tracker), 1);
        assert_eq!(v.len(), 0);
        assert_eq!(v.capacity(), 8);
    }

    #[test]
    fn destroy_is_idempotent() {
        let tracker = Arc::new(());
        let mut v = ParallelVector::<Arc<()>>::with_capacity(2).unwrap();
        v.append(Arc::clone(&tracker)).unwrap();
        v.destroy();
        v.destroy();
        assert!(v.is_destroyed());
        assert_eq!(v.capacity(), 0);
        assert_eq!(Arc::strong_count(&tracker), 1);
    }

    #[test]
    fn swap_exchanges_handles() {
        let mut a = ParallelVector::<u8>::with_len(4, 1).unwrap();
        let mut b = ParallelVector::<u8>::with_capacity(9).unwrap();
        b.append_slice(&[5, 6]).unwrap();
        a.swap(&mut b);
        assert_eq!((a.len(), a.capacity()), (2, 9));
        assert_eq!((b.len(), b.capacity()), (1, 4));
        assert_eq!(a.as_slice(), &[5, 6]);
    }

    #[test]
    fn try_clone_is_deep() {
        let mut a = ParallelVector::<u64>::with_capacity(6).unwrap();
        a.append_slice(&[1, 2, 3]).unwrap();
        let mut b = a.try_clone().unwrap();
        b[0] = 100;
        assert_eq!(a[0], 1);
        assert_eq!(b.capacity(), 6);
        assert_eq!(b.as_slice(), &[100, 2, 3]);
    }

    #[test]
    fn fill_overwrites_live_elements_only() {
        let mut v = ParallelVector::<f64>::with_len(1000, 777).unwrap();
        v.fill(0.5).unwrap();
        assert_eq!(v.len(), 777);
        assert!(v.iter().all(|&x| (x - 0.5).abs() < f64::EPSILON));
    }

    #[test]
    fn sync_slots_write_disjoint_indices() {
        let mut v = ParallelVector::<usize>::with_capacity(256).unwrap();
        {
            let slots = v.as_sync_slots();
            std::thread::scope(|s| {
                for t in 0..4 {
                    let slots = &slots;
                    s.spawn(move || {
                        for i in (t..256).step_by(4) {
                            unsafe { slots.write(i, i * 2) };
                        }
                    });
                }
            });
        }
        unsafe { v.set_len(256) };
        assert!(v.iter().enumerate().all(|(i, &x)| x == i * 2));
    }

    #[test]
    fn zero_sized_elements_need_no_mapping() {
        let mut v = ParallelVector::<()>::with_capacity(1 << 40).unwrap();
        v.resize_default(3).unwrap();
        assert_eq!(v.len(), 3);
    }
}
