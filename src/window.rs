// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Bounded-access windows over borrowed frame memory.
//!
//! A host runtime (a JVM, a camera HAL) may pin a buffer for us only for a
//! short critical region. While a window is open the holder must not
//! allocate, block, log or call back into the host; the only work done is a
//! plain memory copy. Windows are guards: dropping one releases the buffer,
//! so every exit path (including unwinding) closes it.

use crate::error::PipelineError;
use libc::{c_void, size_t};
use std::{
    marker::PhantomData,
    ops::{Deref, DerefMut},
    slice::{from_raw_parts, from_raw_parts_mut},
};

/// Callback that pins host memory and returns its address, or null.
pub type LockFn = unsafe extern "C" fn(context: *mut c_void) -> *mut u8;

/// Callback that unpins memory previously returned by a [`LockFn`].
pub type UnlockFn = unsafe extern "C" fn(context: *mut c_void, data: *mut u8);

struct Release {
    unlock: UnlockFn,
    context: *mut c_void,
    data: *mut u8,
}

impl Release {
    fn run(self) {
        unsafe { (self.unlock)(self.context, self.data) }
    }
}

/// Read-only access to a source buffer for the lifetime of the guard.
pub struct AccessWindow<'a> {
    bytes: &'a [u8],
    release: Option<Release>,
}

impl<'a> AccessWindow<'a> {
    /// A window over memory that needs no release step.
    pub fn borrowed(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            release: None,
        }
    }

    /// Copies the first `dst.len()` bytes out and closes the window.
    ///
    /// The destination must be allocated before the window is opened. The
    /// caller has already validated the length, a short window is reported
    /// rather than read past.
    pub fn copy_into(self, dst: &mut [u8]) -> Result<(), PipelineError> {
        let len = dst.len();
        let bytes = self.bytes;
        if bytes.len() < len {
            let available = bytes.len();
            drop(self);
            return Err(PipelineError::BufferAcquisitionFailed(format!(
                "window holds {available} bytes, {len} requested"
            )));
        }
        dst.copy_from_slice(&bytes[..len]);
        Ok(())
    }
}

impl Deref for AccessWindow<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl Drop for AccessWindow<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release.run();
        }
    }
}

/// Write access to a target buffer for the lifetime of the guard.
pub struct AccessWindowMut<'a> {
    bytes: &'a mut [u8],
    release: Option<Release>,
}

impl<'a> AccessWindowMut<'a> {
    pub fn borrowed(bytes: &'a mut [u8]) -> Self {
        Self {
            bytes,
            release: None,
        }
    }
}

impl Deref for AccessWindowMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.bytes
    }
}

impl DerefMut for AccessWindowMut<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.bytes
    }
}

impl Drop for AccessWindowMut<'_> {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release.run();
        }
    }
}

/// A raw frame that can be read through a bounded-access window.
pub trait SourceBuffer {
    /// Length in bytes, known without opening a window.
    fn byte_len(&self) -> usize;

    /// Opens a read window over the whole buffer.
    fn acquire(&self) -> Result<AccessWindow<'_>, PipelineError>;
}

impl SourceBuffer for [u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }

    fn acquire(&self) -> Result<AccessWindow<'_>, PipelineError> {
        Ok(AccessWindow::borrowed(self))
    }
}

impl SourceBuffer for Vec<u8> {
    fn byte_len(&self) -> usize {
        self.len()
    }

    fn acquire(&self) -> Result<AccessWindow<'_>, PipelineError> {
        Ok(AccessWindow::borrowed(self))
    }
}

/// A destination the pipeline can write a finished frame into directly.
pub trait TargetBuffer {
    fn byte_len(&self) -> usize;

    /// Opens a write window over the first `len` bytes.
    fn acquire_mut(&mut self, len: usize) -> Result<AccessWindowMut<'_>, PipelineError>;
}

impl TargetBuffer for [u8] {
    fn byte_len(&self) -> usize {
        self.len()
    }

    fn acquire_mut(&mut self, len: usize) -> Result<AccessWindowMut<'_>, PipelineError> {
        match self.get_mut(..len) {
            Some(bytes) => Ok(AccessWindowMut::borrowed(bytes)),
            None => Err(PipelineError::OutputAllocationFailed(len)),
        }
    }
}

/// Memory owned by a host runtime, pinned on demand.
///
/// `lock` is called when a window opens and `unlock` exactly once when it
/// closes. Without a `lock` callback `data` is used directly, which suits
/// buffers the host keeps alive for the whole call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ForeignBuffer {
    pub data: *mut u8,
    pub len: size_t,
    pub context: *mut c_void,
    pub lock: Option<LockFn>,
    pub unlock: Option<UnlockFn>,
}

impl ForeignBuffer {
    /// Opens a window over `len` bytes of host memory.
    ///
    /// # Safety
    ///
    /// The caller must ensure that:
    /// - `data` (or the pointer returned by `lock`) is valid for `len` bytes
    ///   until `unlock` is called
    /// - nothing else mutates the memory while the window is open
    unsafe fn open(&self) -> Result<(*mut u8, Option<Release>), PipelineError> {
        let data = match self.lock {
            Some(lock) => lock(self.context),
            None => self.data,
        };
        if data.is_null() {
            return Err(PipelineError::BufferAcquisitionFailed(
                "host returned a null buffer".to_string(),
            ));
        }
        let release = self.unlock.map(|unlock| Release {
            unlock,
            context: self.context,
            data,
        });
        Ok((data, release))
    }
}

/// Host memory read as a pipeline source.
pub struct ForeignSource<'a> {
    buffer: ForeignBuffer,
    _marker: PhantomData<&'a [u8]>,
}

impl ForeignSource<'_> {
    /// # Safety
    ///
    /// The caller must ensure that the buffer is readable for `len` bytes
    /// while a window is open and is not written to elsewhere meanwhile.
    pub unsafe fn new(buffer: ForeignBuffer) -> Self {
        Self {
            buffer,
            _marker: PhantomData,
        }
    }
}

impl SourceBuffer for ForeignSource<'_> {
    fn byte_len(&self) -> usize {
        self.buffer.len
    }

    fn acquire(&self) -> Result<AccessWindow<'_>, PipelineError> {
        let (data, release) = unsafe { self.buffer.open()? };
        let bytes = unsafe { from_raw_parts(data as *const u8, self.buffer.len) };
        Ok(AccessWindow { bytes, release })
    }
}

/// Host memory that receives a finished frame.
pub struct ForeignTarget<'a> {
    buffer: ForeignBuffer,
    _marker: PhantomData<&'a mut [u8]>,
}

impl ForeignTarget<'_> {
    /// # Safety
    ///
    /// The caller must ensure that the buffer is writable for `len` bytes
    /// while a window is open and is not aliased elsewhere.
    pub unsafe fn new(buffer: ForeignBuffer) -> Self {
        Self {
            buffer,
            _marker: PhantomData,
        }
    }
}

impl TargetBuffer for ForeignTarget<'_> {
    fn byte_len(&self) -> usize {
        self.buffer.len
    }

    fn acquire_mut(&mut self, len: usize) -> Result<AccessWindowMut<'_>, PipelineError> {
        if len > self.buffer.len {
            return Err(PipelineError::OutputAllocationFailed(len));
        }
        let (data, release) = unsafe { self.buffer.open()? };
        let bytes = unsafe { from_raw_parts_mut(data, len) };
        Ok(AccessWindowMut { bytes, release })
    }
}
