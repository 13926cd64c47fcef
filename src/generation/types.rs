//! Core types for the generation domain

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::generation::InvalidLanguage;

/// Language flag passed to the generator, e.g. `--go`.
///
/// The well-known generators are exposed as associated constants, but the type is
/// an open token: new generators appear over time and anything that takes a
/// dependency on this type must not assume the list is exhaustive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneratorLanguage(Cow<'static, str>);

impl GeneratorLanguage {
    pub const DOTNET: Self = Self(Cow::Borrowed("--net"));
    pub const GO: Self = Self(Cow::Borrowed("--go"));
    pub const JAVA: Self = Self(Cow::Borrowed("--java"));
    pub const RUBY: Self = Self(Cow::Borrowed("--ruby"));
    pub const PHP: Self = Self(Cow::Borrowed("--php"));
    pub const PYTHON: Self = Self(Cow::Borrowed("--python"));
    pub const SWIFT: Self = Self(Cow::Borrowed("--swift"));

    /// Wrap a flag token verbatim, without normalization.
    pub fn from_flag(flag: impl Into<String>) -> Self {
        Self(Cow::Owned(flag.into()))
    }

    /// The token exactly as it is passed on the command line
    pub fn as_flag(&self) -> &str {
        &self.0
    }

    /// Generator name without the leading dashes
    pub fn name(&self) -> &str {
        self.0.trim_start_matches('-')
    }

    /// Get the well-known languages
    pub fn well_known() -> Vec<GeneratorLanguage> {
        vec![
            Self::DOTNET,
            Self::GO,
            Self::JAVA,
            Self::RUBY,
            Self::PHP,
            Self::PYTHON,
            Self::SWIFT,
        ]
    }
}

impl fmt::Display for GeneratorLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_flag())
    }
}

impl FromStr for GeneratorLanguage {
    type Err = InvalidLanguage;

    /// Parse a user supplied name (`go`, `Python`, `--swift`, `csharp`, ...).
    ///
    /// Unknown names are accepted and turned into `--<name>`. Only values that
    /// could not form a single flag token are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidLanguage(s.to_string());

        let lowered = s.trim().to_lowercase();
        let bare = lowered.strip_prefix("--").unwrap_or(&lowered);
        if bare.is_empty()
            || bare.starts_with('-')
            || bare
                .chars()
                .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | '"' | '\''))
        {
            return Err(invalid());
        }

        Ok(match bare {
            "net" | "dotnet" | "csharp" | "c#" | "cs" => Self::DOTNET,
            "go" | "golang" => Self::GO,
            "java" => Self::JAVA,
            "ruby" | "rb" => Self::RUBY,
            "php" => Self::PHP,
            "python" | "py" => Self::PYTHON,
            "swift" => Self::SWIFT,
            other => Self(Cow::Owned(format!("--{other}"))),
        })
    }
}
