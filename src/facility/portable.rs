//! Table-driven facility backed by `encoding_rs`
//!
//! Mirrors the Win32 contract on every platform. Unmappable characters
//! become `?` and malformed bytes become U+FFFD unless the policy is strict.

use encoding_rs::{DecoderResult, Encoding, EncoderResult};
use tracing::trace;

use super::{
    ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_PARAMETER, ERROR_NO_UNICODE_TRANSLATION, Facility,
    Produced,
};
use crate::{CodePage, Policy};

/// Substituted for characters a code page cannot represent
const DEFAULT_CHAR: u8 = b'?';
const REPLACEMENT_CHARACTER: u16 = 0xFFFD;
const CHUNK: usize = 512;

/// Facility that converts with `encoding_rs` tables
#[derive(Debug, Clone, Copy, Default)]
pub struct Portable;

impl Portable {
    /// Table for a code page, if this facility knows it
    pub fn table(code_page: CodePage) -> Option<&'static Encoding> {
        let encoding = match code_page.id() {
            // No system ANSI code page off Windows; behave like a western install
            0 | 1252 => encoding_rs::WINDOWS_1252,
            874 => encoding_rs::WINDOWS_874,
            866 => encoding_rs::IBM866,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GBK,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            10000 => encoding_rs::MACINTOSH,
            10007 => encoding_rs::X_MAC_CYRILLIC,
            20866 => encoding_rs::KOI8_R,
            20932 => encoding_rs::EUC_JP,
            21866 => encoding_rs::KOI8_U,
            28592 => encoding_rs::ISO_8859_2,
            28593 => encoding_rs::ISO_8859_3,
            28594 => encoding_rs::ISO_8859_4,
            28595 => encoding_rs::ISO_8859_5,
            28596 => encoding_rs::ISO_8859_6,
            28597 => encoding_rs::ISO_8859_7,
            28598 => encoding_rs::ISO_8859_8,
            28603 => encoding_rs::ISO_8859_13,
            28605 => encoding_rs::ISO_8859_15,
            50220 => encoding_rs::ISO_2022_JP,
            54936 => encoding_rs::GB18030,
            65001 => encoding_rs::UTF_8,
            _ => return None,
        };
        Some(encoding)
    }
}

impl Facility for Portable {
    fn name(&self) -> &'static str {
        "encoding_rs"
    }

    fn multi_byte_to_wide(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u8],
        output: Option<&mut [u16]>,
    ) -> Produced {
        let encoding = Self::table(code_page).ok_or(ERROR_INVALID_PARAMETER)?;
        if input.is_empty() {
            return Err(ERROR_INVALID_PARAMETER);
        }
        let wide = decode(encoding, policy, input)?;
        trace!(encoding = encoding.name(), units = wide.len(), "decoded");
        deliver(&wide, output)
    }

    fn wide_to_multi_byte(
        &self,
        code_page: CodePage,
        policy: Policy,
        input: &[u16],
        output: Option<&mut [u8]>,
    ) -> Produced {
        let encoding = Self::table(code_page).ok_or(ERROR_INVALID_PARAMETER)?;
        if input.is_empty() {
            return Err(ERROR_INVALID_PARAMETER);
        }
        let narrow = encode(encoding, policy, input)?;
        trace!(encoding = encoding.name(), bytes = narrow.len(), "encoded");
        deliver(&narrow, output)
    }
}

fn decode(
    encoding: &'static Encoding,
    policy: Policy,
    input: &[u8],
) -> std::result::Result<Vec<u16>, u32> {
    // A UTF-8 BOM is content, not a signature
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let mut wide = Vec::with_capacity(input.len());
    let mut chunk = [0u16; CHUNK];
    let mut read = 0;

    loop {
        let (result, consumed, written) =
            decoder.decode_to_utf16_without_replacement(&input[read..], &mut chunk, true);
        read += consumed;
        wide.extend_from_slice(&chunk[..written]);

        match result {
            DecoderResult::InputEmpty => return Ok(wide),
            DecoderResult::OutputFull => {}
            DecoderResult::Malformed(_, _) => match policy {
                Policy::Strict => return Err(ERROR_NO_UNICODE_TRANSLATION),
                Policy::Substitute => wide.push(REPLACEMENT_CHARACTER),
            },
        }
    }
}

fn encode(
    encoding: &'static Encoding,
    policy: Policy,
    input: &[u16],
) -> std::result::Result<Vec<u8>, u32> {
    // encoding_rs quietly replaces unpaired surrogates
    if policy == Policy::Strict && char::decode_utf16(input.iter().copied()).any(|c| c.is_err()) {
        return Err(ERROR_NO_UNICODE_TRANSLATION);
    }

    let mut encoder = encoding.new_encoder();
    let mut narrow = Vec::with_capacity(input.len());
    let mut chunk = [0u8; CHUNK];
    let mut read = 0;

    loop {
        let (result, consumed, written) =
            encoder.encode_from_utf16_without_replacement(&input[read..], &mut chunk, true);
        read += consumed;
        narrow.extend_from_slice(&chunk[..written]);

        match result {
            EncoderResult::InputEmpty => return Ok(narrow),
            EncoderResult::OutputFull => {}
            EncoderResult::Unmappable(_) => match policy {
                Policy::Strict => return Err(ERROR_NO_UNICODE_TRANSLATION),
                Policy::Substitute => narrow.push(DEFAULT_CHAR),
            },
        }
    }
}

/// Report the size, or copy into the caller's buffer when one is given
fn deliver<T: Copy>(converted: &[T], output: Option<&mut [T]>) -> Produced {
    if let Some(buffer) = output {
        let target = buffer
            .get_mut(..converted.len())
            .ok_or(ERROR_INSUFFICIENT_BUFFER)?;
        target.copy_from_slice(converted);
    }
    Ok(converted.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn wide(text: &str) -> Vec<u16> {
        text.encode_utf16().collect()
    }

    #[test]
    fn test_query_reports_exact_size() {
        let input = wide("Strauß");
        let size = Portable
            .wide_to_multi_byte(CodePage::Utf8, Policy::Substitute, &input, None)
            .unwrap();
        assert_eq!(size, "Strauß".len());
    }

    #[test]
    fn test_fill_rejects_small_buffer() {
        let input = wide("Jäger");
        let mut buffer = [0u8; 3];
        let result = Portable.wide_to_multi_byte(
            CodePage::Utf8,
            Policy::Substitute,
            &input,
            Some(&mut buffer),
        );
        assert_eq!(result, Err(ERROR_INSUFFICIENT_BUFFER));
    }

    #[test]
    fn test_fill_into_larger_buffer() {
        let mut buffer = [0xAAu8; 8];
        let written = Portable
            .wide_to_multi_byte(
                CodePage::Western,
                Policy::Substitute,
                &wide("é"),
                Some(&mut buffer),
            )
            .unwrap();
        assert_eq!(written, 1);
        assert_eq!(buffer[0], 0xE9);
        assert_eq!(buffer[1], 0xAA);
    }

    #[test]
    fn test_empty_input_is_invalid_parameter() {
        assert_eq!(
            Portable.wide_to_multi_byte(CodePage::Utf8, Policy::Substitute, &[], None),
            Err(ERROR_INVALID_PARAMETER)
        );
        assert_eq!(
            Portable.multi_byte_to_wide(CodePage::Utf8, Policy::Substitute, &[], None),
            Err(ERROR_INVALID_PARAMETER)
        );
    }

    #[test]
    fn test_unknown_code_page() {
        assert_eq!(
            Portable.wide_to_multi_byte(CodePage::Other(12345), Policy::Substitute, &wide("a"), None),
            Err(ERROR_INVALID_PARAMETER)
        );
        assert_eq!(
            Portable.multi_byte_to_wide(CodePage::Other(12345), Policy::Substitute, b"a", None),
            Err(ERROR_INVALID_PARAMETER)
        );
    }

    #[test]
    fn test_greek_substitutes_latin_letters() {
        let input = wide("Hélène");
        let mut buffer = [0u8; 6];
        let written = Portable
            .wide_to_multi_byte(CodePage::Greek, Policy::Substitute, &input, Some(&mut buffer))
            .unwrap();
        assert_eq!(&buffer[..written], b"H?l?ne");

        assert_eq!(
            Portable.wide_to_multi_byte(CodePage::Greek, Policy::Strict, &input, None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
    }

    #[test]
    fn test_malformed_utf8() {
        let input = [b'a', 0xFF, b'b'];
        let mut buffer = [0u16; 3];
        let written = Portable
            .multi_byte_to_wide(CodePage::Utf8, Policy::Substitute, &input, Some(&mut buffer))
            .unwrap();
        assert_eq!(&buffer[..written], &[0x61, 0xFFFD, 0x62]);

        assert_eq!(
            Portable.multi_byte_to_wide(CodePage::Utf8, Policy::Strict, &input, None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
    }

    #[test]
    fn test_utf8_bom_is_kept() {
        let input = [0xEF, 0xBB, 0xBF, b'x'];
        let size = Portable
            .multi_byte_to_wide(CodePage::Utf8, Policy::Substitute, &input, None)
            .unwrap();
        assert_eq!(size, 2);
    }

    #[test]
    fn test_lone_surrogate() {
        let input = [0x61, 0xD800, 0x62];
        assert_eq!(
            Portable.wide_to_multi_byte(CodePage::Utf8, Policy::Strict, &input, None),
            Err(ERROR_NO_UNICODE_TRANSLATION)
        );
        // U+FFFD takes three bytes
        assert_eq!(
            Portable.wide_to_multi_byte(CodePage::Utf8, Policy::Substitute, &input, None),
            Ok(5)
        );
    }

    #[test]
    fn test_long_input_spans_chunks() {
        let text = "ß".repeat(CHUNK * 3);
        let size = Portable
            .wide_to_multi_byte(CodePage::Utf8, Policy::Substitute, &wide(&text), None)
            .unwrap();
        assert_eq!(size, text.len());
    }

    #[test]
    fn test_system_default_is_western() {
        assert_eq!(
            Portable::table(CodePage::SystemDefault),
            Some(encoding_rs::WINDOWS_1252)
        );
        assert_eq!(Portable::table(CodePage::Other(1200)), None);
    }
}
