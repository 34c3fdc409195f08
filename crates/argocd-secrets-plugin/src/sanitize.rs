//! Secret key name rewriting
//!
//! Secret keys may contain characters that are awkward in ApplicationSet
//! templates (dots, spaces, leading digits). When a caller asks for converted
//! keys every key goes through [`sanitize_key`]; otherwise the configured
//! [`KeyPolicy`] for unconverted keys applies.

use clap::ValueEnum;

/// How secret keys are rewritten before being returned as parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyPolicy {
    /// Return keys exactly as stored
    #[default]
    Passthrough,
    /// Rewrite keys with [`sanitize_key`]
    Sanitize,
    /// Replace literal `.` with `_`, leave everything else
    DotsToUnderscores,
}

impl KeyPolicy {
    /// Apply this policy to one key
    pub fn apply(self, key: &str) -> String {
        match self {
            KeyPolicy::Passthrough => key.to_string(),
            KeyPolicy::Sanitize => sanitize_key(key),
            KeyPolicy::DotsToUnderscores => dots_to_underscores(key),
        }
    }
}

/// Convert a key into a name made of ASCII letters, digits and `-` only.
///
/// The steps run in a fixed order:
/// 1. every char that is not an ASCII letter, digit or `_` becomes `-`
/// 2. a leading digit gets a `_` prepended
/// 3. every `_` becomes `-`
///
/// Step 3 also flattens the guard from step 2, so `"1.bad key"` becomes
/// `"-1-bad-key"`. The output never starts with a digit.
pub fn sanitize_key(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();

    let guarded = if replaced.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{replaced}")
    } else {
        replaced
    };

    guarded.replace('_', "-")
}

/// Replace each literal `.` with `_`
pub fn dots_to_underscores(input: &str) -> String {
    input.replace('.', "_")
}
