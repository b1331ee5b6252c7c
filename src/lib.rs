//! # Unicode Probe - Code Page Conversion Experiments
//!
//! A small library for observing how platform text APIs behave across
//! legacy single-byte code pages, UTF-8 and UTF-16, plus the file-open
//! experiments built on top of it.
//!
//! ## Features
//!
//! - **Two-phase conversion** between wide (UTF-16) and narrow text, sized by
//!   a query call and filled by a second call, exactly like the Win32 API
//! - **Pluggable facilities**: the real Win32 primitives on Windows, and an
//!   `encoding_rs`-backed portable facility everywhere
//! - **Probes** that open non-ASCII file names through narrow and wide
//!   path primitives
//!
//! ## Quick Start
//!
//! ```rust
//! use unicode_probe::{CodePage, narrow_to_wide, wide_to_narrow};
//!
//! let wide: Vec<u16> = "Hélène Strauß Jäger".encode_utf16().collect();
//!
//! let utf8 = wide_to_narrow(&wide, CodePage::Utf8).unwrap();
//! assert_eq!(utf8, "Hélène Strauß Jäger".as_bytes());
//!
//! let back = narrow_to_wide(&utf8, CodePage::Utf8).unwrap();
//! assert_eq!(back, wide);
//! ```

#![deny(missing_docs)]

use std::fmt;
use std::str::FromStr;

pub mod convert;
pub mod demo;
pub mod facility;
pub mod probe;

pub use convert::{Converter, narrow_to_wide, wide_to_narrow};
#[cfg(windows)]
pub use facility::Win32;
pub use facility::{Facility, Native, Portable};

/// Result type for conversion operations
pub type Result<T> = std::result::Result<T, EncodingError>;

/// Which way a conversion was going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Wide code units to narrow bytes
    WideToNarrow,
    /// Narrow bytes to wide code units
    NarrowToWide,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::WideToNarrow => f.write_str("wide-to-narrow"),
            Direction::NarrowToWide => f.write_str("narrow-to-wide"),
        }
    }
}

/// The facility call that reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Sizing call made without an output buffer
    Query,
    /// Second call that writes into the allocated buffer
    Fill,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Query => f.write_str("query"),
            Phase::Fill => f.write_str("fill"),
        }
    }
}

/// A conversion primitive produced nothing for non-empty input
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{direction} conversion under {code_page} failed in the {phase} phase (platform error {code})")]
pub struct EncodingError {
    /// Platform error code, as `GetLastError` would report it
    pub code: u32,
    /// Code page the conversion was asked to use
    pub code_page: CodePage,
    /// Conversion direction
    pub direction: Direction,
    /// Phase that failed
    pub phase: Phase,
}

impl EncodingError {
    /// Short description of the platform error code
    pub fn reason(&self) -> &'static str {
        facility::describe_code(self.code)
    }
}

/// How a facility treats characters it cannot represent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Platform default: replace unmappable or malformed input
    #[default]
    Substitute,
    /// Fail with `ERROR_NO_UNICODE_TRANSLATION` instead of replacing
    Strict,
}

/// Code page identifiers understood by the conversion facilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodePage {
    /// The system's ANSI code page (`CP_ACP`)
    SystemDefault,
    /// Windows-1250
    CentralEuropean,
    /// Windows-1251
    Cyrillic,
    /// Windows-1252
    Western,
    /// Windows-1253
    Greek,
    /// Windows-1255
    Hebrew,
    /// Windows-1256
    Arabic,
    /// UTF-8 (`CP_UTF8`)
    Utf8,
    /// Any other identifier, passed through to the facility untouched
    Other(u32),
}

impl CodePage {
    /// Every variant with a name
    pub const NAMED: [CodePage; 8] = [
        CodePage::SystemDefault,
        CodePage::CentralEuropean,
        CodePage::Cyrillic,
        CodePage::Western,
        CodePage::Greek,
        CodePage::Hebrew,
        CodePage::Arabic,
        CodePage::Utf8,
    ];

    /// Integral identifier handed to the platform
    pub const fn id(self) -> u32 {
        match self {
            CodePage::SystemDefault => 0,
            CodePage::CentralEuropean => 1250,
            CodePage::Cyrillic => 1251,
            CodePage::Western => 1252,
            CodePage::Greek => 1253,
            CodePage::Hebrew => 1255,
            CodePage::Arabic => 1256,
            CodePage::Utf8 => 65001,
            CodePage::Other(id) => id,
        }
    }

    /// Map an identifier to its named variant, or `Other`
    pub const fn from_id(id: u32) -> Self {
        match id {
            0 => CodePage::SystemDefault,
            1250 => CodePage::CentralEuropean,
            1251 => CodePage::Cyrillic,
            1252 => CodePage::Western,
            1253 => CodePage::Greek,
            1255 => CodePage::Hebrew,
            1256 => CodePage::Arabic,
            65001 => CodePage::Utf8,
            other => CodePage::Other(other),
        }
    }

    /// Region or purpose of the code page
    pub fn description(self) -> &'static str {
        match self {
            CodePage::SystemDefault => "System default ANSI code page",
            CodePage::CentralEuropean => "Central and Eastern European",
            CodePage::Cyrillic => "Cyrillic",
            CodePage::Western => "Western European",
            CodePage::Greek => "Greek",
            CodePage::Hebrew => "Hebrew",
            CodePage::Arabic => "Arabic",
            CodePage::Utf8 => "Unicode UTF-8",
            CodePage::Other(_) => "Unlisted code page",
        }
    }
}

impl fmt::Display for CodePage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodePage::SystemDefault => f.write_str("ANSI"),
            CodePage::Utf8 => f.write_str("UTF-8"),
            other => write!(f, "CP{}", other.id()),
        }
    }
}

/// Text that names no code page
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown code page: {0}")]
pub struct ParseCodePageError(String);

impl FromStr for CodePage {
    type Err = ParseCodePageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_uppercase();

        let code_page = match key.as_str() {
            "ANSI" | "ACP" | "SYSTEM" | "DEFAULT" => CodePage::SystemDefault,
            "CENTRALEUROPEAN" => CodePage::CentralEuropean,
            "CYRILLIC" => CodePage::Cyrillic,
            "WESTERN" => CodePage::Western,
            "GREEK" => CodePage::Greek,
            "HEBREW" => CodePage::Hebrew,
            "ARABIC" => CodePage::Arabic,
            "UTF8" => CodePage::Utf8,
            _ => {
                let digits = ["WINDOWS", "WIN", "CP"]
                    .iter()
                    .find_map(|prefix| key.strip_prefix(prefix))
                    .unwrap_or(key.as_str());
                let id = digits
                    .parse::<u32>()
                    .map_err(|_| ParseCodePageError(s.to_string()))?;
                CodePage::from_id(id)
            }
        };

        Ok(code_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_code_page_ids_round_trip() {
        for code_page in CodePage::NAMED {
            assert_eq!(CodePage::from_id(code_page.id()), code_page);
        }
        assert_eq!(CodePage::from_id(437), CodePage::Other(437));
        assert_eq!(CodePage::Other(437).id(), 437);
    }

    #[test]
    fn test_code_page_parsing() {
        assert_eq!("utf-8".parse::<CodePage>().unwrap(), CodePage::Utf8);
        assert_eq!("greek".parse::<CodePage>().unwrap(), CodePage::Greek);
        assert_eq!("cp1253".parse::<CodePage>().unwrap(), CodePage::Greek);
        assert_eq!(
            "windows-1250".parse::<CodePage>().unwrap(),
            CodePage::CentralEuropean
        );
        assert_eq!("ansi".parse::<CodePage>().unwrap(), CodePage::SystemDefault);
        assert_eq!("866".parse::<CodePage>().unwrap(), CodePage::Other(866));
        assert_eq!("65001".parse::<CodePage>().unwrap(), CodePage::Utf8);
        assert!("klingon".parse::<CodePage>().is_err());
        assert!("cp".parse::<CodePage>().is_err());
    }

    #[test]
    fn test_code_page_display() {
        assert_eq!(CodePage::Utf8.to_string(), "UTF-8");
        assert_eq!(CodePage::SystemDefault.to_string(), "ANSI");
        assert_eq!(CodePage::Hebrew.to_string(), "CP1255");
        assert_eq!(CodePage::Other(12345).to_string(), "CP12345");
    }

    #[test]
    fn test_encoding_error_message() {
        let error = EncodingError {
            code: facility::ERROR_INVALID_PARAMETER,
            code_page: CodePage::Other(12345),
            direction: Direction::WideToNarrow,
            phase: Phase::Query,
        };
        assert_eq!(
            error.to_string(),
            "wide-to-narrow conversion under CP12345 failed in the query phase (platform error 87)"
        );
        assert_eq!(error.reason(), "the parameter is incorrect");
    }
}
