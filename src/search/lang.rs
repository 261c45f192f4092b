use std::fmt;

/// Inputs shorter than this (in chars, after trimming) are never classified.
const MIN_DETECT_CHARS: usize = 10;

/// ISO 639-3 style language code, or the `und` sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub const UNDETERMINED: &'static str = "und";

    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn undetermined() -> Self {
        Self(Self::UNDETERMINED.to_string())
    }

    pub fn is_undetermined(&self) -> bool {
        self.0 == Self::UNDETERMINED
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match against a target code. The sentinel matches nothing,
    /// itself included.
    pub fn matches(&self, target: &LanguageCode) -> bool {
        !self.is_undetermined() && self == target
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Best-guess language of `text`. Returns [`LanguageCode::undetermined`]
/// instead of failing.
pub fn detect(text: &str) -> LanguageCode {
    let text = text.trim();
    if text.chars().count() < MIN_DETECT_CHARS {
        return LanguageCode::undetermined();
    }
    whatlang::detect(text)
        .map(|info| LanguageCode::new(info.lang().code()))
        .unwrap_or_else(LanguageCode::undetermined)
}
