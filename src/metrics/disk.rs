//! Disk space readings via statvfs.

use crate::error::{Result, VitalsError};
use std::path::Path;

/// Space figures for the filesystem holding a path
#[derive(Debug, Clone, PartialEq)]
pub struct FsSpace {
    pub path: String,
    /// Space available to unprivileged users (excludes reserved blocks)
    pub available_bytes: u64,
}

/// Query the filesystem holding `path`.
pub fn fs_space(path: &Path) -> Result<FsSpace> {
    let what = path.display().to_string();
    if !path.exists() {
        return Err(VitalsError::unavailable(what, "path does not exist"));
    }
    statvfs(path)
}

#[cfg(unix)]
fn statvfs(path: &Path) -> Result<FsSpace> {
    use std::ffi::CString;
    use std::mem::MaybeUninit;
    use std::os::unix::ffi::OsStrExt;

    let what = path.display().to_string();
    let c_path = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| VitalsError::unavailable(what.clone(), "path contains a NUL byte"))?;
    let mut stat = MaybeUninit::<libc::statvfs>::uninit();

    let result = unsafe { libc::statvfs(c_path.as_ptr(), stat.as_mut_ptr()) };
    if result != 0 {
        let err = std::io::Error::last_os_error();
        return Err(VitalsError::from_io(what, &err));
    }

    let stat = unsafe { stat.assume_init() };

    Ok(FsSpace {
        path: what,
        available_bytes: stat.f_bavail as u64 * stat.f_frsize as u64,
    })
}

#[cfg(not(unix))]
fn statvfs(path: &Path) -> Result<FsSpace> {
    Err(VitalsError::unavailable(
        path.display().to_string(),
        "statvfs not supported on this platform",
    ))
}
