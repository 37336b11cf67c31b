//! DRAM buffer implementation.
//!
//! A safe wrapper around raw memory allocation for the console's DRAM. On
//! Unix the buffer is an anonymous `mmap`, so pages are only materialised
//! by the OS when the guest touches them; elsewhere it falls back to a
//! zeroed `Vec`.

use std::ops::{Deref, DerefMut};

/// The main DRAM buffer.
pub struct DramBuffer {
    ptr: *mut u8,
    size: usize,
    is_mmap: bool,
}

// SAFETY: the buffer is uniquely owned by the Machine; the raw pointer is
// only a storage detail of the mmap allocation.
unsafe impl Send for DramBuffer {}
unsafe impl Sync for DramBuffer {}

impl DramBuffer {
    /// Creates a new DRAM buffer of the specified size, zero-filled.
    ///
    /// # Panics
    ///
    /// Panics if the anonymous mapping fails; there is no reasonable way to
    /// run without DRAM.
    pub fn new(size: usize) -> Self {
        #[cfg(unix)]
        {
            // SAFETY: anonymous private mapping with no fixed address; the
            // returned region is exclusively ours and `size` bytes long.
            let ptr = unsafe {
                libc::mmap(
                    std::ptr::null_mut(),
                    size,
                    libc::PROT_READ | libc::PROT_WRITE,
                    libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                    -1,
                    0,
                )
            };
            assert!(ptr != libc::MAP_FAILED, "DRAM mmap failed");
            Self {
                ptr: ptr.cast::<u8>(),
                size,
                is_mmap: true,
            }
        }
        #[cfg(not(unix))]
        {
            let mut buf = vec![0u8; size];
            let ptr = buf.as_mut_ptr();
            std::mem::forget(buf);
            Self {
                ptr,
                size,
                is_mmap: false,
            }
        }
    }

    /// Size of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the buffer is zero-sized.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Zero-fills the buffer (machine reset).
    pub fn clear(&mut self) {
        // SAFETY: ptr is valid for `size` writable bytes for our lifetime.
        unsafe { std::ptr::write_bytes(self.ptr, 0, self.size) };
    }
}

impl Deref for DramBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // SAFETY: ptr is valid for `size` bytes and exclusively owned.
        unsafe { std::slice::from_raw_parts(self.ptr, self.size) }
    }
}

impl DerefMut for DramBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        // SAFETY: ptr is valid for `size` writable bytes and exclusively owned.
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.size) }
    }
}

impl Drop for DramBuffer {
    fn drop(&mut self) {
        if self.is_mmap {
            #[cfg(unix)]
            // SAFETY: ptr/size describe the mapping created in `new`.
            unsafe {
                libc::munmap(self.ptr.cast::<libc::c_void>(), self.size);
            }
        } else {
            // SAFETY: reconstruct the Vec forgotten in `new` so it frees.
            unsafe {
                drop(Vec::from_raw_parts(self.ptr, self.size, self.size));
            }
        }
    }
}
