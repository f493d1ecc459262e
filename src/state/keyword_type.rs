/// Keyword edge type definitions
///
/// A word can attach to the same repository several times, once per type.
use std::fmt;

/// The source that produced a keyword edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeywordType {
    // ===== Crawler-owned types =====
    /// Basename of a source file in the repository tree (weight 1)
    Classname,

    /// RAKE phrases of at most one word from the README
    ReadmeRake1,

    /// RAKE phrases of at most two words from the README
    ReadmeRake2,

    /// RAKE phrases of at most three words from the README
    ReadmeRake3,

    /// RAKE phrases of at most four words from the README
    ReadmeRake4,

    /// TextRank keywords from the README
    ReadmeTextRank,

    /// Entropy-difference keywords against the random-gap reference
    ReadmeEntropyNormal,

    /// Entropy-difference keywords against the uniform-gap reference
    ReadmeEntropyMax,

    // ===== Externally maintained types =====
    /// Package version tag written by other tooling; never touched by the crawler
    PackageVersion,
}

impl KeywordType {
    /// Returns true if the crawler produces (and therefore replaces) edges of this type
    pub fn is_crawler_owned(&self) -> bool {
        !matches!(self, Self::PackageVersion)
    }

    /// Returns every type the crawler replaces when a repository changes
    pub fn crawler_owned() -> Vec<Self> {
        Self::all_types()
            .into_iter()
            .filter(KeywordType::is_crawler_owned)
            .collect()
    }

    /// Converts the type to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Classname => "classname",
            Self::ReadmeRake1 => "readme_rake_1",
            Self::ReadmeRake2 => "readme_rake_2",
            Self::ReadmeRake3 => "readme_rake_3",
            Self::ReadmeRake4 => "readme_rake_4",
            Self::ReadmeTextRank => "readme_textrank",
            Self::ReadmeEntropyNormal => "readme_ed_normal",
            Self::ReadmeEntropyMax => "readme_ed_max",
            Self::PackageVersion => "package_version",
        }
    }

    /// Parses a type from its database string representation
    ///
    /// Returns None if the string doesn't match any known type.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "classname" => Some(Self::Classname),
            "readme_rake_1" => Some(Self::ReadmeRake1),
            "readme_rake_2" => Some(Self::ReadmeRake2),
            "readme_rake_3" => Some(Self::ReadmeRake3),
            "readme_rake_4" => Some(Self::ReadmeRake4),
            "readme_textrank" => Some(Self::ReadmeTextRank),
            "readme_ed_normal" => Some(Self::ReadmeEntropyNormal),
            "readme_ed_max" => Some(Self::ReadmeEntropyMax),
            "package_version" => Some(Self::PackageVersion),
            _ => None,
        }
    }

    /// Returns all keyword types
    pub fn all_types() -> Vec<Self> {
        vec![
            Self::Classname,
            Self::ReadmeRake1,
            Self::ReadmeRake2,
            Self::ReadmeRake3,
            Self::ReadmeRake4,
            Self::ReadmeTextRank,
            Self::ReadmeEntropyNormal,
            Self::ReadmeEntropyMax,
            Self::PackageVersion,
        ]
    }
}

impl fmt::Display for KeywordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
