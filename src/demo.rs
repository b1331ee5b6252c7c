//! Converts one sample name under several regional code pages
//!
//! Shows what a program that assumes the ANSI code page would write on
//! machines configured for different regions, and checks that UTF-8
//! survives the trip back to UTF-16.

use serde::Serialize;

use crate::{CodePage, Converter, EncodingError, Facility, Policy};

/// Sample text with Latin diacritics and a sharp s
pub const SAMPLE: &str = "Hélène Strauß Jäger";

/// Code pages the demonstration converts to, in order
pub const CODE_PAGES: [CodePage; 7] = [
    CodePage::SystemDefault,
    CodePage::CentralEuropean,
    CodePage::Greek,
    CodePage::Hebrew,
    CodePage::Arabic,
    CodePage::Cyrillic,
    CodePage::Utf8,
];

/// One code page's result
#[derive(Debug, Clone, Serialize)]
pub struct DemoRow {
    /// Code page label
    pub code_page: String,
    /// Numeric identifier
    pub id: u32,
    /// Narrow bytes as hex, when the conversion worked
    pub bytes: Option<String>,
    /// The narrow bytes decoded again under the same code page
    pub read_back: Option<String>,
    /// Failure description, when it did not
    pub error: Option<String>,
    /// Failure description for the read-back, when that alone failed
    pub read_back_error: Option<String>,
}

/// Everything the demonstration observed
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    /// Facility that did the conversions
    pub facility: &'static str,
    /// Input text
    pub input: String,
    /// Input length in UTF-16 code units
    pub wide_units: usize,
    /// Per code page results
    pub rows: Vec<DemoRow>,
    /// UTF-8 bytes converted back to UTF-16 equal the input
    pub utf8_round_trip: bool,
}

/// Run the demonstration over [`CODE_PAGES`]
pub fn run<F: Facility + Clone>(facility: &F, policy: Policy) -> DemoReport {
    let wide: Vec<u16> = SAMPLE.encode_utf16().collect();

    let rows = CODE_PAGES
        .iter()
        .map(|&code_page| {
            let converter =
                Converter::with_facility(facility.clone(), code_page).with_policy(policy);
            match converter.to_narrow(&wide) {
                Ok(narrow) => {
                    let (read_back, read_back_error) = match converter.to_wide(&narrow) {
                        Ok(units) => (Some(String::from_utf16_lossy(&units)), None),
                        Err(error) => (None, Some(describe(&error))),
                    };
                    DemoRow {
                        code_page: code_page.to_string(),
                        id: code_page.id(),
                        bytes: Some(hex_narrow(&narrow)),
                        read_back,
                        error: None,
                        read_back_error,
                    }
                }
                Err(error) => DemoRow {
                    code_page: code_page.to_string(),
                    id: code_page.id(),
                    bytes: None,
                    read_back: None,
                    error: Some(describe(&error)),
                    read_back_error: None,
                },
            }
        })
        .collect();

    let utf8 = Converter::with_facility(facility.clone(), CodePage::Utf8);
    let utf8_round_trip = utf8
        .to_narrow(&wide)
        .and_then(|narrow| utf8.to_wide(&narrow))
        .is_ok_and(|back| back == wide);

    DemoReport {
        facility: facility.name(),
        input: SAMPLE.to_string(),
        wide_units: wide.len(),
        rows,
        utf8_round_trip,
    }
}

fn describe(error: &EncodingError) -> String {
    format!("{} ({})", error, error.reason())
}

/// Bytes as space-separated hex pairs
pub fn hex_narrow(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Code units as space-separated four-digit hex
pub fn hex_wide(units: &[u16]) -> String {
    units
        .iter()
        .map(|unit| format!("{unit:04X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
