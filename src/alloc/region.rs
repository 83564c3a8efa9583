//! Anonymous memory regions.
//!
//! Regions are mapped directly from the OS so that huge vertex/edge arrays skip
//! allocator bookkeeping and eager zero-initialization. Pages are zero on first
//! touch; nothing in this crate relies on that beyond it being cheap.

use core::ptr::{self, NonNull};

/// Granularity used to round mapping lengths.
pub const PAGE_SIZE: usize = 4096;

/// Rounds `value` up to a multiple of `align` (a power of two).
pub const fn align_up(value: usize, align: usize) -> usize {
    if align == 0 {
        value
    } else {
        (value + (align - 1)) & !(align - 1)
    }
}

#[cfg(any(target_os = "linux", target_os = "android"))]
const MAP_EXTRA: libc::c_int = libc::MAP_NORESERVE;
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android"))))]
const MAP_EXTRA: libc::c_int = 0;

/// Maps `size` bytes of private, read-write, anonymous memory.
///
/// Returns `None` for a zero size or when the OS refuses the mapping.
#[cfg(unix)]
pub(crate) fn allocate_region(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }
    let size = align_up(size, PAGE_SIZE);
    // SAFETY: an anonymous private mapping with a null hint has no preconditions.
    let ptr = unsafe {
        libc::mmap(
            ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON | MAP_EXTRA,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        None
    } else {
        NonNull::new(ptr.cast::<u8>())
    }
}

/// Unmaps a region returned by [`allocate_region`]. Returns `false` if the OS reported an error.
///
/// # Safety
/// `ptr` and `size` must describe a live region from [`allocate_region`], and no
/// references into it may outlive this call.
#[cfg(unix)]
pub(crate) unsafe fn free_region(ptr: NonNull<u8>, size: usize) -> bool {
    if size == 0 {
        return true;
    }
    let size = align_up(size, PAGE_SIZE);
    libc::munmap(ptr.as_ptr().cast::<libc::c_void>(), size) == 0
}

#[cfg(windows)]
pub(crate) fn allocate_region(size: usize) -> Option<NonNull<u8>> {
    use windows_sys::Win32::System::Memory::{
        VirtualAlloc, MEM_COMMIT, MEM_RESERVE, PAGE_READWRITE,
    };
    if size == 0 {
        return None;
    }
    let size = align_up(size, PAGE_SIZE);
    // SAFETY: reserving and committing fresh pages has no preconditions.
    let ptr = unsafe { VirtualAlloc(ptr::null(), size, MEM_COMMIT | MEM_RESERVE, PAGE_READWRITE) };
    NonNull::new(ptr.cast::<u8>())
}

#[cfg(windows)]
pub(crate) unsafe fn free_region(ptr: NonNull<u8>, _size: usize) -> bool {
    use windows_sys::Win32::System::Memory::{VirtualFree, MEM_RELEASE};
    // MEM_RELEASE frees the whole reservation; the size must be 0.
    VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE) != 0
}
