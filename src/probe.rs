//! File-open probes for non-ASCII paths
//!
//! Each probe names a file with characters outside ASCII, encodes the path
//! for one open primitive (UTF-8 bytes for the narrow ones, UTF-16 for the
//! wide ones), opens the existing file read-only and records whether that
//! worked. Opened handles are closed when the [`Handle`] drops.

use std::ffi::CString;
use std::fs;
use std::io;
use std::path::{MAIN_SEPARATOR, Path};

use serde::Serialize;
use tracing::debug;

use crate::{CodePage, Converter, Facility};

/// File name used by the narrow-path probes
pub const NARROW_FILE_NAME: &str = "通用电气威曼超声.txt";

/// File name used by the wide-path probes
pub const WIDE_FILE_NAME: &str = "🏃‍♂️.txt";

/// An open primitive under test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Primitive {
    /// C runtime `fopen` with a byte path
    CrtNarrow,
    /// C runtime `_wfopen` with a UTF-16 path
    CrtWide,
    /// `CreateFileA` on Windows, `open(2)` elsewhere
    OsNarrow,
    /// `CreateFileW`
    OsWide,
}

impl Primitive {
    /// Every primitive, in probing order
    pub const ALL: [Primitive; 4] = [
        Primitive::CrtNarrow,
        Primitive::CrtWide,
        Primitive::OsNarrow,
        Primitive::OsWide,
    ];

    /// Name of the function this primitive calls on the current platform
    pub fn name(self) -> &'static str {
        match self {
            Primitive::CrtNarrow => "fopen",
            Primitive::CrtWide => "_wfopen",
            Primitive::OsNarrow if cfg!(windows) => "CreateFileA",
            Primitive::OsNarrow => "open",
            Primitive::OsWide => "CreateFileW",
        }
    }

    /// Takes a UTF-16 path rather than bytes
    pub fn is_wide(self) -> bool {
        matches!(self, Primitive::CrtWide | Primitive::OsWide)
    }

    /// The platform has this primitive at all
    pub fn is_available(self) -> bool {
        !self.is_wide() || cfg!(windows)
    }

    /// Encoding the path is handed over in
    pub fn path_encoding(self) -> &'static str {
        if self.is_wide() { "UTF-16" } else { "UTF-8" }
    }

    /// File this primitive is asked to open
    pub fn file_name(self) -> &'static str {
        if self.is_wide() {
            WIDE_FILE_NAME
        } else {
            NARROW_FILE_NAME
        }
    }
}

/// What a probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// The file opened
    Supported,
    /// The open failed
    Unsupported,
    /// No such primitive on this platform
    Unavailable,
}

/// Result of probing one primitive
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Primitive probed
    pub primitive: Primitive,
    /// Function name on this platform
    pub function: &'static str,
    /// Encoding of the path handed to the function
    pub path_encoding: &'static str,
    /// Path that was opened
    pub path: String,
    /// Observation
    pub outcome: Outcome,
}

impl ProbeReport {
    /// One-line human-readable summary
    pub fn summary(&self) -> String {
        let encoding = self.path_encoding.to_lowercase();
        match self.outcome {
            Outcome::Supported => format!("{} supports {} path", self.function, encoding),
            Outcome::Unsupported => {
                format!("{} does not support {} path", self.function, encoding)
            }
            Outcome::Unavailable => format!("{} is not available here", self.function),
        }
    }
}

#[derive(Debug)]
enum Resource {
    Stream(*mut libc::FILE),
    #[cfg(unix)]
    Descriptor(libc::c_int),
    #[cfg(windows)]
    Win32(windows::Win32::Foundation::HANDLE),
}

/// A file opened by one of the primitives, closed on drop
#[derive(Debug)]
pub struct Handle(Resource);

impl Drop for Handle {
    fn drop(&mut self) {
        // Close failures are not observable to the probes
        match self.0 {
            Resource::Stream(stream) => unsafe {
                libc::fclose(stream);
            },
            #[cfg(unix)]
            Resource::Descriptor(fd) => unsafe {
                libc::close(fd);
            },
            #[cfg(windows)]
            Resource::Win32(handle) => unsafe {
                let _ = windows::Win32::Foundation::CloseHandle(handle);
            },
        }
    }
}

/// Open an existing file read-only through a narrow-path primitive
///
/// Returns `None` when the open fails, when `path` has an interior NUL, or
/// when `primitive` takes wide paths.
pub fn open_for_read_narrow(path: &[u8], primitive: Primitive) -> Option<Handle> {
    let path = CString::new(path).ok()?;
    match primitive {
        Primitive::CrtNarrow => {
            let stream = unsafe { libc::fopen(path.as_ptr(), c"r".as_ptr()) };
            (!stream.is_null()).then(|| Handle(Resource::Stream(stream)))
        }
        Primitive::OsNarrow => os_open_narrow(&path),
        Primitive::CrtWide | Primitive::OsWide => None,
    }
}

/// Open an existing file read-only through a wide-path primitive
///
/// Returns `None` when the open fails, when `path` has an interior NUL, or
/// when the primitive is narrow or unavailable on this platform.
pub fn open_for_read_wide(path: &[u16], primitive: Primitive) -> Option<Handle> {
    if path.contains(&0) || !primitive.is_wide() {
        return None;
    }
    let mut terminated = path.to_vec();
    terminated.push(0);
    os_open_wide(&terminated, primitive)
}

#[cfg(unix)]
fn os_open_narrow(path: &CString) -> Option<Handle> {
    let fd = unsafe { libc::open(path.as_ptr(), libc::O_RDONLY) };
    (fd >= 0).then(|| Handle(Resource::Descriptor(fd)))
}

#[cfg(windows)]
fn os_open_narrow(path: &CString) -> Option<Handle> {
    use windows::Win32::Foundation::{GENERIC_READ, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        CreateFileA, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_NONE, OPEN_EXISTING,
    };
    use windows::core::PCSTR;

    let handle = unsafe {
        CreateFileA(
            PCSTR(path.as_ptr().cast()),
            GENERIC_READ.0,
            FILE_SHARE_NONE,
            None,
            OPEN_EXISTING,
            FILE_ATTRIBUTE_NORMAL,
            HANDLE::default(),
        )
    };
    handle.ok().map(|handle| Handle(Resource::Win32(handle)))
}

#[cfg(unix)]
fn os_open_wide(_path: &[u16], _primitive: Primitive) -> Option<Handle> {
    None
}

#[cfg(windows)]
fn os_open_wide(path: &[u16], primitive: Primitive) -> Option<Handle> {
    use windows::Win32::Foundation::{GENERIC_READ, HANDLE};
    use windows::Win32::Storage::FileSystem::{
        CreateFileW, FILE_ATTRIBUTE_NORMAL, FILE_SHARE_NONE, OPEN_EXISTING,
    };
    use windows::core::PCWSTR;

    match primitive {
        Primitive::CrtWide => {
            let mode = [u16::from(b'r'), 0];
            let stream = unsafe { libc::wfopen(path.as_ptr(), mode.as_ptr()) };
            (!stream.is_null()).then(|| Handle(Resource::Stream(stream)))
        }
        Primitive::OsWide => {
            let handle = unsafe {
                CreateFileW(
                    PCWSTR(path.as_ptr()),
                    GENERIC_READ.0,
                    FILE_SHARE_NONE,
                    None,
                    OPEN_EXISTING,
                    FILE_ATTRIBUTE_NORMAL,
                    HANDLE::default(),
                )
            };
            handle.ok().map(|handle| Handle(Resource::Win32(handle)))
        }
        Primitive::CrtNarrow | Primitive::OsNarrow => None,
    }
}

/// Create the empty files the probes try to open
///
/// # Errors
///
/// Returns the I/O error from creating either file.
pub fn create_targets(dir: &Path) -> io::Result<()> {
    for name in [NARROW_FILE_NAME, WIDE_FILE_NAME] {
        let path = dir.join(name);
        fs::write(&path, b"")?;
        debug!(path = %path.display(), "created probe target");
    }
    Ok(())
}

/// Probe one primitive against its file in `dir`
///
/// Only the file name goes through the converter; the directory is handed
/// over in the platform's own form.
///
/// # Errors
///
/// Returns [`EncodingError`](crate::EncodingError) if the path cannot be
/// encoded for a narrow primitive.
pub fn run<F: Facility>(
    facility: F,
    primitive: Primitive,
    dir: &Path,
) -> crate::Result<ProbeReport> {
    let joined = dir.join(primitive.file_name());

    let outcome = if !primitive.is_available() {
        Outcome::Unavailable
    } else {
        let handle = if primitive.is_wide() {
            open_for_read_wide(&wide_path(&joined), primitive)
        } else {
            let converter = Converter::with_facility(facility, CodePage::Utf8);
            let name: Vec<u16> = primitive.file_name().encode_utf16().collect();
            let mut narrow = narrow_dir(&converter, dir)?;
            if !narrow.is_empty() && !narrow.ends_with(&[MAIN_SEPARATOR as u8]) {
                narrow.push(MAIN_SEPARATOR as u8);
            }
            narrow.extend(converter.to_narrow(&name)?);
            open_for_read_narrow(&narrow, primitive)
        };
        if handle.is_some() {
            Outcome::Supported
        } else {
            Outcome::Unsupported
        }
    };
    debug!(function = primitive.name(), ?outcome, "probed");

    Ok(ProbeReport {
        primitive,
        function: primitive.name(),
        path_encoding: primitive.path_encoding(),
        path: joined.display().to_string(),
        outcome,
    })
}

#[cfg(unix)]
fn narrow_dir<F: Facility>(_converter: &Converter<F>, dir: &Path) -> crate::Result<Vec<u8>> {
    use std::os::unix::ffi::OsStrExt;

    Ok(dir.as_os_str().as_bytes().to_vec())
}

#[cfg(windows)]
fn narrow_dir<F: Facility>(converter: &Converter<F>, dir: &Path) -> crate::Result<Vec<u8>> {
    use std::os::windows::ffi::OsStrExt;

    let wide: Vec<u16> = dir.as_os_str().encode_wide().collect();
    converter.to_narrow(&wide)
}

#[cfg(unix)]
fn wide_path(path: &Path) -> Vec<u16> {
    path.to_string_lossy().encode_utf16().collect()
}

#[cfg(windows)]
fn wide_path(path: &Path) -> Vec<u16> {
    use std::os::windows::ffi::OsStrExt;

    path.as_os_str().encode_wide().collect()
}

/// Probe every primitive in [`Primitive::ALL`]
///
/// # Errors
///
/// Propagates the first path-encoding failure.
pub fn run_all<F: Facility + Clone>(
    facility: &F,
    dir: &Path,
) -> crate::Result<Vec<ProbeReport>> {
    Primitive::ALL
        .iter()
        .map(|&primitive| run(facility.clone(), primitive, dir))
        .collect()
}
