//! Two-phase conversion between wide and narrow text
//!
//! Output length depends on both the input and the code page, so each
//! conversion first asks the facility for the exact size, allocates that
//! much, then asks it again to fill the buffer. A zero count from either
//! call is a failure. Empty input never reaches the facility.

use tracing::{debug, warn};

use crate::facility::{ERROR_NO_UNICODE_TRANSLATION, Facility, Native, Produced};
use crate::{CodePage, Direction, EncodingError, Phase, Policy, Result};

/// Converts text under one code page with a chosen facility
#[derive(Debug, Clone, Copy)]
pub struct Converter<F = Native> {
    facility: F,
    code_page: CodePage,
    policy: Policy,
}

impl Converter<Native> {
    /// Create a converter backed by the platform's native facility
    pub fn new(code_page: CodePage) -> Self {
        Self::with_facility(Native::default(), code_page)
    }
}

impl<F: Facility> Converter<F> {
    /// Create a converter backed by a specific facility
    pub fn with_facility(facility: F, code_page: CodePage) -> Self {
        Self {
            facility,
            code_page,
            policy: Policy::default(),
        }
    }

    /// Replace the unmappable-character policy
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Code page used for the narrow side
    pub fn code_page(&self) -> CodePage {
        self.code_page
    }

    /// Unmappable-character policy
    pub fn policy(&self) -> Policy {
        self.policy
    }

    /// Facility doing the conversions
    pub fn facility(&self) -> &F {
        &self.facility
    }

    /// Convert wide code units to narrow bytes
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] when the facility produces nothing for
    /// non-empty input, e.g. for an unknown code page or, under
    /// [`Policy::Strict`], an unmappable character.
    pub fn to_narrow(&self, wide: &[u16]) -> Result<Vec<u8>> {
        two_phase(
            wide.is_empty(),
            self.code_page,
            Direction::WideToNarrow,
            |output| {
                self.facility
                    .wide_to_multi_byte(self.code_page, self.policy, wide, output)
            },
        )
    }

    /// Convert narrow bytes to wide code units
    ///
    /// # Errors
    ///
    /// Returns [`EncodingError`] when the facility produces nothing for
    /// non-empty input, e.g. for an unknown code page or, under
    /// [`Policy::Strict`], a malformed byte sequence.
    pub fn to_wide(&self, narrow: &[u8]) -> Result<Vec<u16>> {
        two_phase(
            narrow.is_empty(),
            self.code_page,
            Direction::NarrowToWide,
            |output| {
                self.facility
                    .multi_byte_to_wide(self.code_page, self.policy, narrow, output)
            },
        )
    }
}

/// Convert wide code units to narrow bytes with the native facility
///
/// # Errors
///
/// Returns [`EncodingError`] when the conversion fails.
pub fn wide_to_narrow(wide: &[u16], code_page: CodePage) -> Result<Vec<u8>> {
    Converter::new(code_page).to_narrow(wide)
}

/// Convert narrow bytes to wide code units with the native facility
///
/// # Errors
///
/// Returns [`EncodingError`] when the conversion fails.
pub fn narrow_to_wide(narrow: &[u8], code_page: CodePage) -> Result<Vec<u16>> {
    Converter::new(code_page).to_wide(narrow)
}

fn two_phase<T, C>(
    empty: bool,
    code_page: CodePage,
    direction: Direction,
    call: C,
) -> Result<Vec<T>>
where
    T: Copy + Default,
    C: Fn(Option<&mut [T]>) -> Produced,
{
    if empty {
        return Ok(Vec::new());
    }

    let fail = |phase: Phase, code: u32| {
        warn!(%code_page, %direction, %phase, code, "conversion failed");
        EncodingError {
            code,
            code_page,
            direction,
            phase,
        }
    };

    let required = call(None)
        .and_then(nonzero)
        .map_err(|code| fail(Phase::Query, code))?;
    debug!(%code_page, %direction, required, "sized conversion");

    let mut output = vec![T::default(); required];
    let written = call(Some(output.as_mut_slice()))
        .and_then(nonzero)
        .map_err(|code| fail(Phase::Fill, code))?;
    debug!(%code_page, %direction, written, "filled conversion");

    output.truncate(written);
    Ok(output)
}

/// A facility that returns zero without an error code still failed
fn nonzero(count: usize) -> Produced {
    if count == 0 {
        Err(ERROR_NO_UNICODE_TRANSLATION)
    } else {
        Ok(count)
    }
}
