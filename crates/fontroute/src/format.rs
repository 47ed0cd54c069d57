//! Font container formats and handles to font files on disk.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::ConvertError;

/// The six web font container formats handled by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Ttf,
    Otf,
    Svg,
    Eot,
    Woff,
    Woff2,
}

impl Format {
    /// Every format, in declaration order.
    pub const ALL: [Format; 6] = [
        Format::Ttf,
        Format::Otf,
        Format::Svg,
        Format::Eot,
        Format::Woff,
        Format::Woff2,
    ];

    /// The lowercase tag doubling as the file extension.
    pub fn tag(self) -> &'static str {
        match self {
            Format::Ttf => "ttf",
            Format::Otf => "otf",
            Format::Svg => "svg",
            Format::Eot => "eot",
            Format::Woff => "woff",
            Format::Woff2 => "woff2",
        }
    }
}

// Sorted collections of formats iterate in tag order; the planner relies
// on this for deterministic edge insertion.
impl Ord for Format {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag().cmp(other.tag())
    }
}

impl PartialOrd for Format {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|f| f.tag() == s)
            .ok_or_else(|| ConvertError::UnrecognizedFormat(s.to_string()))
    }
}

/// A font file on disk in a particular format.
///
/// The full path is always the stem (path without extension) with `.` and
/// the format tag appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontFile {
    full_path: PathBuf,
    stem: PathBuf,
    format: Format,
}

impl FontFile {
    /// Build a file handle from a stem, appending the format's extension.
    pub fn new(stem: PathBuf, format: Format) -> FontFile {
        let mut full_path = stem.clone().into_os_string();
        full_path.push(".");
        full_path.push(format.tag());
        FontFile {
            full_path: PathBuf::from(full_path),
            stem,
            format,
        }
    }

    /// Deduce the format from the path's extension.
    pub fn from_path(path: &Path) -> Result<FontFile, ConvertError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConvertError::MissingExtension(path.display().to_string()))?;
        Ok(FontFile {
            full_path: path.to_path_buf(),
            stem: path.with_extension(""),
            format: extension.parse()?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.full_path
    }

    pub fn format(&self) -> Format {
        self.format
    }

    /// The prospective file produced by converting this one into `format`
    /// inside `dir`, keeping the base name.
    pub fn moved_and_converted_to(&self, dir: &Path, format: Format) -> FontFile {
        let base = self.stem.file_name().unwrap_or_default();
        FontFile::new(dir.join(base), format)
    }

    /// File name component of the full path.
    pub fn basename(&self) -> String {
        self.full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The identifier an SVG font is addressed by, the base name of the
    /// stem.
    pub fn svg_id(&self) -> String {
        self.stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
