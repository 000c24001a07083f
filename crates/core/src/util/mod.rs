// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

/// Trims leading and trailing whitespace and rejects empty results.
#[must_use]
pub fn trimmed_non_empty(input: &str) -> Option<&str> {
    let trimmed = input.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Like [`trimmed_non_empty()`], but reuses the allocation if possible.
#[must_use]
pub fn trimmed_non_empty_owned(mut input: String) -> Option<String> {
    input.truncate(input.trim_end().len());
    let leading_len = input.len() - input.trim_start().len();
    drop(input.drain(..leading_len));
    (!input.is_empty()).then_some(input)
}

/// Parses a boolean flag.
///
/// Accepts `1`/`0` and `true`/`false` (case-insensitive).
#[must_use]
pub fn parse_boolean(input: &str) -> Option<bool> {
    let input = input.trim();
    if input == "1" || input.eq_ignore_ascii_case("true") {
        Some(true)
    } else if input == "0" || input.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[must_use]
pub const fn format_boolean(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}

///////////////////////////////////////////////////////////////////////
// Tests
///////////////////////////////////////////////////////////////////////
