//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                              |
//! |---------|-----------|------------------------------------------|
//! | 0       | Universal | Success                                  |
//! | 1       | Universal | General error (unspecified)              |
//! | 2       | Universal | CLI usage error (bad args, missing file) |
//! | 3-9     | input     | Reading and parsing input documents      |
//! | 10-19   | validate  | Structure validation                     |
//! | 20-29   | export    | PDF/Excel export and media saves         |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
#[allow(dead_code)]
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Input (3-9)
// =============================================================================

/// Input file or stdin could not be read, or output could not be written.
pub const EXIT_IO: u8 = 3;

/// Input is not JSON/JSONL, or not a turn, transcript or section list.
pub const EXIT_PARSE: u8 = 4;

// =============================================================================
// Validate (10-19)
// =============================================================================

/// At least one section failed validation or has an unsupported type.
pub const EXIT_INVALID: u8 = 10;

// =============================================================================
// Export (20-29)
// =============================================================================

/// The PDF or XLSX writer failed.
pub const EXIT_EXPORT: u8 = 20;

/// `save-media` found no image or video sections.
pub const EXIT_NO_MEDIA: u8 = 21;

/// An image payload could not be decoded.
pub const EXIT_MEDIA_DECODE: u8 = 22;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            EXIT_SUCCESS,
            EXIT_ERROR,
            EXIT_USAGE,
            EXIT_IO,
            EXIT_PARSE,
            EXIT_INVALID,
            EXIT_EXPORT,
            EXIT_NO_MEDIA,
            EXIT_MEDIA_DECODE,
        ];
        let mut sorted = codes.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }
}
