//! POSIX-style descriptor calls over an `IpcEmulation`.
//!
//! Return conventions follow the C calls they stand in for: a non-negative
//! value on success, a negated errno on failure, and `0` from `read` at end
//! of file.

use crate::emulation::IpcEmulation;
use crate::error::IpcError;

/// Bad file descriptor.
pub const EBADF: i32 = 9;
/// Resource temporarily unavailable.
pub const EAGAIN: i32 = 11;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Broken pipe.
pub const EPIPE: i32 = 32;

/// errno equivalent of an `IpcError`.
pub fn errno_of(error: &IpcError) -> i32 {
    match error {
        IpcError::NoSuchFile(_) => EBADF,
        IpcError::NoData | IpcError::TimedOut => EAGAIN,
        IpcError::Closed => EPIPE,
        IpcError::ShutDown | IpcError::InvalidConfig(_) => EINVAL,
    }
}

/// Create a connected pair, storing the descriptors in `descriptors`.
pub fn pipe(ipc: &IpcEmulation, descriptors: &mut [i32; 2]) -> i32 {
    match ipc.create_default_pair() {
        Ok((first, second)) => {
            *descriptors = [first, second];
            0
        }
        Err(e) => -errno_of(&e),
    }
}

/// Read into `buffer`. A closed file reads as end of file.
pub fn read(ipc: &IpcEmulation, descriptor: i32, buffer: &mut [u8]) -> isize {
    match ipc.read_into(descriptor, buffer) {
        Ok(count) => count as isize,
        Err(IpcError::Closed) => 0,
        Err(e) => -(errno_of(&e) as isize),
    }
}

/// Write all of `bytes`, returning their count.
pub fn write(ipc: &IpcEmulation, descriptor: i32, bytes: &[u8]) -> isize {
    match ipc.write(descriptor, bytes) {
        Ok(()) => bytes.len() as isize,
        Err(e) => -(errno_of(&e) as isize),
    }
}

pub fn close(ipc: &IpcEmulation, descriptor: i32) -> i32 {
    if ipc.close(descriptor) {
        0
    } else {
        -EBADF
    }
}
