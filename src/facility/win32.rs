//! The real `MultiByteToWideChar` / `WideCharToMultiByte` pair

use windows::Win32::Foundation::{BOOL, GetLastError};
use windows::Win32::Globalization::{
    GetACP, MB_ERR_INVALID_CHARS, MULTI_BYTE_TO_WIDE_CHAR_FLAGS, MultiByteToWideChar,
    WC_ERR_INVALID_CHARS, WC_NO_BEST_FIT_CHARS, WideCharToMultiByte,
};
use windows::core::PCSTR;

use super::{ERROR_NO_UNICODE_TRANSLATION, Facility, Produced};
use crate::{CodePage, Policy};

/// Facility that calls straight into the Win32 National Language Support API
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32;

/// Which flags a code page accepts for strict conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strictness {
    /// `WC_ERR_INVALID_CHARS` / `MB_ERR_INVALID_CHARS`, no default character
    InvalidChars,
    /// `WC_NO_BEST_FIT_CHARS` and an `lpUsedDefaultChar` check
    UsedDefault,
    /// Flags and default-character arguments must be zero
    Unflagged,
}

impl Strictness {
    fn of(id: u32) -> Self {
        match id {
            65001 | 54936 => Strictness::InvalidChars,
            42 | 50220..=50229 | 57002..=57011 | 65000 => Strictness::Unflagged,
            _ => Strictness::UsedDefault,
        }
    }
}

/// Identifier with `CP_ACP` replaced by the code page it stands for
fn resolve(code_page: CodePage) -> u32 {
    match code_page {
        CodePage::SystemDefault => unsafe { GetACP() },
        other => other.id(),
    }
}

impl Facility for Win32 {
    fn name(&self) -> &'static str {
        "Win32"
    }

    fn multi_byte_to_wide(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u8],
        output: Option<&mut [u16]>,
    ) -> Produced {
        let id = resolve(code_page);
        let flags = match (policy, Strictness::of(id)) {
            (Policy::Strict, Strictness::InvalidChars | Strictness::UsedDefault) => {
                MB_ERR_INVALID_CHARS
            }
            _ => MULTI_BYTE_TO_WIDE_CHAR_FLAGS(0),
        };
        let produced = unsafe { MultiByteToWideChar(id, flags, input, output) };
        checked(produced)
    }

    fn wide_to_multi_byte(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u16],
        output: Option<&mut [u8]>,
    ) -> Produced {
        let id = resolve(code_page);
        match (policy, Strictness::of(id)) {
            (Policy::Substitute, _) | (Policy::Strict, Strictness::Unflagged) => {
                let produced =
                    unsafe { WideCharToMultiByte(id, 0, input, output, PCSTR::null(), None) };
                checked(produced)
            }
            (Policy::Strict, Strictness::InvalidChars) => {
                let produced = unsafe {
                    WideCharToMultiByte(
                        id,
                        WC_ERR_INVALID_CHARS,
                        input,
                        output,
                        PCSTR::null(),
                        None,
                    )
                };
                checked(produced)
            }
            (Policy::Strict, Strictness::UsedDefault) => {
                let mut used_default = BOOL(0);
                let produced = unsafe {
                    WideCharToMultiByte(
                        id,
                        WC_NO_BEST_FIT_CHARS,
                        input,
                        output,
                        PCSTR::null(),
                        Some(&mut used_default as *mut BOOL),
                    )
                };
                if used_default.as_bool() {
                    return Err(ERROR_NO_UNICODE_TRANSLATION);
                }
                checked(produced)
            }
        }
    }
}

/// Zero means failure; the reason is in the thread's last-error slot
fn checked(produced: i32) -> Produced {
    match usize::try_from(produced) {
        Ok(count) if count > 0 => Ok(count),
        _ => Err(unsafe { GetLastError() }.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::ERROR_INVALID_PARAMETER;
    use pretty_assertions::assert_eq;

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_unknown_code_page_sets_last_error() {
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::Other(12345), Policy::Substitute, &wide("a"), None),
            Err(ERROR_INVALID_PARAMETER)
        );
    }

    #[test]
    fn test_utf8_query_size() {
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::Utf8, Policy::Substitute, &wide("Strauß"), None),
            Ok("Strauß".len())
        );
    }

    #[test]
    fn test_strictness_by_code_page() {
        assert_eq!(Strictness::of(65001), Strictness::InvalidChars);
        assert_eq!(Strictness::of(54936), Strictness::InvalidChars);
        assert_eq!(Strictness::of(50220), Strictness::Unflagged);
        assert_eq!(Strictness::of(65000), Strictness::Unflagged);
        assert_eq!(Strictness::of(1253), Strictness::UsedDefault);
    }

    #[test]
    fn test_system_default_resolves_to_active_code_page() {
        assert_eq!(resolve(CodePage::SystemDefault), unsafe { GetACP() });
        assert_eq!(resolve(CodePage::Greek), 1253);
    }

    #[test]
    fn test_strict_system_default_accepts_ascii() {
        // Holds whether the active code page is a legacy one or UTF-8
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::SystemDefault, Policy::Strict, &wide("abc"), None),
            Ok(3)
        );
    }

    #[test]
    fn test_strict_greek_rejects_unmappable() {
        let input = wide("Hélène");
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::Greek, Policy::Strict, &input, None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::Greek, Policy::Substitute, &input, None),
            Ok(6)
        );
    }

    #[test]
    fn test_strict_utf8_rejects_lone_surrogate() {
        let input = [u16::from(b'a'), 0xD800, u16::from(b'b')];
        assert_eq!(
            Win32.wide_to_multi_byte(CodePage::Utf8, Policy::Strict, &input, None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
    }

    #[test]
    fn test_strict_utf8_rejects_malformed_bytes() {
        assert_eq!(
            Win32.multi_byte_to_wide(CodePage::Utf8, Policy::Strict, b"caf\xE9", None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
        assert_eq!(
            Win32.multi_byte_to_wide(CodePage::Utf8, Policy::Substitute, b"caf\xE9", None),
            Ok(4)
        );
    }
}
