//! # C Interface
//!
//! Handle-based functions for callers that load the library dynamically.
//! See `include/pihash.h` for the matching declarations.
//!
//! A handle owns one [`Context`] plus the error code of the last call
//! made through it. Hash functions return [`PIHASH_FAILURE`] (0) on
//! failure; since a dHash can legitimately be 0, callers check
//! `ext_last_error` to tell the two apart.
//!
//! Panics are caught here and never unwind into C.
//!
//! Handles use the default metadata key strategy: a same-size file whose
//! mtime is preserved from more than 2 seconds before it was hashed
//! (`cp -p`, `rsync -a`) is served from the cache without a content check.

use crate::core::context::Context;
use crate::core::hasher::HashAlgorithmKind;
use crate::error::{ErrorKind, PihashError};
use std::ffi::{c_char, c_void, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::ptr;
use tracing::{debug, warn};

/// Value returned by the hash functions when no hash could be produced
pub const PIHASH_FAILURE: u64 = 0;

struct Handle {
    context: Context,
    last_error: ErrorKind,
}

/// Open a context on the cache file at `cache_path`.
///
/// Returns NULL if the path is NULL or the cache location is unusable.
///
/// # Safety
///
/// `cache_path` must be NULL or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ext_init(cache_path: *const c_char) -> *mut c_void {
    let Some(path) = path_from_c(cache_path) else {
        warn!("ext_init called without a usable cache path");
        return ptr::null_mut();
    };

    let opened = panic::catch_unwind(|| Context::open(&path));
    match opened {
        Ok(Ok(context)) => Box::into_raw(Box::new(Handle {
            context,
            last_error: ErrorKind::None,
        }))
        .cast(),
        Ok(Err(e)) => {
            warn!(cache = %path.display(), error = %e, "Failed to open hashing context");
            ptr::null_mut()
        }
        Err(_) => {
            warn!(cache = %path.display(), "Panic while opening hashing context");
            ptr::null_mut()
        }
    }
}

/// Flush pending cache entries and release the context.
///
/// NULL is ignored.
///
/// # Safety
///
/// `context` must be NULL or a pointer returned by [`ext_init`] that has
/// not been freed yet. It must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn ext_free(context: *mut c_void) {
    if context.is_null() {
        return;
    }

    let handle = Box::from_raw(context.cast::<Handle>());
    let closed = panic::catch_unwind(AssertUnwindSafe(move || handle.context.close()));
    match closed {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Failed to flush hash cache on free"),
        Err(_) => warn!("Panic while closing hashing context"),
    }
}

/// Average hash of the image at `image_path`, or 0 on failure.
///
/// # Safety
///
/// `context` must be NULL or a live pointer from [`ext_init`];
/// `image_path` must be NULL or point to a NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn ext_get_ahash(context: *mut c_void, image_path: *const c_char) -> u64 {
    get_hash(context, image_path, HashAlgorithmKind::Average)
}

/// Difference hash of the image at `image_path`, or 0 on failure.
///
/// # Safety
///
/// Same requirements as [`ext_get_ahash`].
#[no_mangle]
pub unsafe extern "C" fn ext_get_dhash(context: *mut c_void, image_path: *const c_char) -> u64 {
    get_hash(context, image_path, HashAlgorithmKind::Difference)
}

/// DCT perceptual hash of the image at `image_path`, or 0 on failure.
///
/// # Safety
///
/// Same requirements as [`ext_get_ahash`].
#[no_mangle]
pub unsafe extern "C" fn ext_get_phash(context: *mut c_void, image_path: *const c_char) -> u64 {
    get_hash(context, image_path, HashAlgorithmKind::Perceptual)
}

/// Error code of the last hash call on `context`; 0 if it succeeded.
///
/// A NULL handle reports `InvalidHandle` (4).
///
/// # Safety
///
/// `context` must be NULL or a live pointer from [`ext_init`].
#[no_mangle]
pub unsafe extern "C" fn ext_last_error(context: *const c_void) -> i32 {
    match context.cast::<Handle>().as_ref() {
        Some(handle) => handle.last_error.code(),
        None => ErrorKind::InvalidHandle.code(),
    }
}

unsafe fn get_hash(context: *mut c_void, image_path: *const c_char, kind: HashAlgorithmKind) -> u64 {
    let Some(handle) = context.cast::<Handle>().as_mut() else {
        return PIHASH_FAILURE;
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let path = path_from_c(image_path)
            .ok_or_else(|| PihashError::InvalidPath("NULL or unrepresentable path".to_string()))?;
        handle.context.get_hash(&path, kind)
    }));

    match outcome {
        Ok(Ok(value)) => {
            handle.last_error = ErrorKind::None;
            value
        }
        Ok(Err(e)) => {
            debug!(algorithm = %kind, error = %e, "Hash request failed");
            handle.last_error = e.kind();
            PIHASH_FAILURE
        }
        Err(_) => {
            warn!(algorithm = %kind, "Panic while computing hash");
            handle.last_error = ErrorKind::Internal;
            PIHASH_FAILURE
        }
    }
}

/// Interpret a C string as a filesystem path.
///
/// Unix paths are raw bytes; elsewhere the string must be UTF-8.
unsafe fn path_from_c(ptr: *const c_char) -> Option<PathBuf> {
    if ptr.is_null() {
        return None;
    }
    let bytes = CStr::from_ptr(ptr).to_bytes();
    if bytes.is_empty() {
        return None;
    }

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        Some(PathBuf::from(std::ffi::OsStr::from_bytes(bytes)))
    }

    #[cfg(not(unix))]
    {
        std::str::from_utf8(bytes).ok().map(PathBuf::from)
    }
}
