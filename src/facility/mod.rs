//! Platform conversion primitives driven by [`Converter`](crate::Converter)
//!
//! A facility behaves like `MultiByteToWideChar` / `WideCharToMultiByte`:
//! called without an output buffer it reports the number of units the
//! conversion needs, called with one it writes them. Failures carry a Win32
//! error code so every facility reports problems the same way.

mod portable;
#[cfg(windows)]
mod win32;

pub use portable::Portable;
#[cfg(windows)]
pub use win32::Win32;

use crate::{CodePage, Policy};

/// Facility used when none is chosen explicitly
#[cfg(windows)]
pub type Native = Win32;

/// Facility used when none is chosen explicitly
#[cfg(not(windows))]
pub type Native = Portable;

/// Unknown code page, bad flags or empty input
pub const ERROR_INVALID_PARAMETER: u32 = 87;
/// Output buffer smaller than the converted text
pub const ERROR_INSUFFICIENT_BUFFER: u32 = 122;
/// Flag combination the code page does not accept
pub const ERROR_INVALID_FLAGS: u32 = 1004;
/// Input has no mapping under the code page
pub const ERROR_NO_UNICODE_TRANSLATION: u32 = 1113;

/// Units produced by one facility call, or the platform error code
pub type Produced = std::result::Result<usize, u32>;

/// Short description of a Win32 error code
pub fn describe_code(code: u32) -> &'static str {
    match code {
        ERROR_INVALID_PARAMETER => "the parameter is incorrect",
        ERROR_INSUFFICIENT_BUFFER => "the data area passed is too small",
        ERROR_INVALID_FLAGS => "invalid flags",
        ERROR_NO_UNICODE_TRANSLATION => "no mapping for the Unicode character exists",
        _ => "unrecognized platform error",
    }
}

/// A narrow/wide conversion primitive
pub trait Facility {
    /// Name shown in reports
    fn name(&self) -> &'static str;

    /// Convert narrow bytes to wide units.
    ///
    /// With `output` set to `None` this only sizes the conversion.
    fn multi_byte_to_wide(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u8],
        output: Option<&mut [u16]>,
    ) -> Produced;

    /// Convert wide units to narrow bytes.
    ///
    /// With `output` set to `None` this only sizes the conversion.
    fn wide_to_multi_byte(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u16],
        output: Option<&mut [u8]>,
    ) -> Produced;
}
