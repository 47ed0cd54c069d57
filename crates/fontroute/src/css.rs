//! `@font-face` stylesheet generation.
//!
//! The emitted block follows the classic bulletproof pattern: when a
//! non-inline EOT entry is requested it becomes a bare `src:` line for
//! old IE followed by a second `src:` list opening with the `?#iefix`
//! variant; everything else is a `url(...) format('...')` entry in the
//! order the user asked for.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::ConvertError;
use crate::format::{FontFile, Format};

// Characters left literal by form URL quoting.
const FORM_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

// Path quoting additionally keeps `/` literal.
const PATH_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

/// Form-style URL quoting: spaces become `+`, everything outside the
/// unreserved set is percent-encoded.
fn quote_plus(s: &str) -> String {
    utf8_percent_encode(s, FORM_QUOTE)
        .to_string()
        .replace("%20", "+")
}

/// Escape a CSS string value: only apostrophes and newlines need it.
fn escape_css_str(s: &str) -> String {
    s.replace('\'', "\\'").replace('\n', "\\A")
}

/// Escape the characters that would terminate an unquoted `url(...)`.
fn escape_css_url(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '(' | ')' | '\'' | '"') || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// The token used inside `format('...')`.
fn css_format(format: Format) -> &'static str {
    match format {
        Format::Eot => "embedded-opentype",
        Format::Ttf => "truetype",
        other => other.tag(),
    }
}

fn media_type(format: Format) -> &'static str {
    match format {
        Format::Eot => "application/vnd.ms-fontobject",
        Format::Otf | Format::Ttf => "application/font-sfnt",
        Format::Svg => "image/svg+xml",
        Format::Woff => "application/font-woff",
        Format::Woff2 => "application/font-woff2",
    }
}

fn file_url(prefix: &str, file: &FontFile) -> String {
    escape_css_url(&format!("{prefix}{}", quote_plus(&file.basename())))
}

fn write_data_url(
    out: &mut impl Write,
    format: Format,
    file: &FontFile,
) -> Result<(), ConvertError> {
    let bytes = fs::read(file.path())?;
    write!(out, "data:{};base64,{}", media_type(format), BASE64.encode(bytes))?;
    Ok(())
}

/// Write one `@font-face` block for `formats` to `out`.
///
/// `formats` is the user's ordered list of `(format, inline)` pairs and
/// `files` maps every listed format to the file backing it (produced
/// outputs overlaid on the original inputs). Inline entries embed the
/// file bytes as a base64 data URL and read the file from disk here.
pub fn generate_css(
    out: &mut impl Write,
    formats: &[(Format, bool)],
    files: &BTreeMap<Format, FontFile>,
    prefix: &str,
    font_family: &str,
) -> Result<(), ConvertError> {
    let mut formats: Vec<(Format, bool)> = formats.to_vec();
    write!(
        out,
        "@font-face {{\n  font-family: '{}';\n  src: ",
        escape_css_str(font_family)
    )?;
    let mut first = true;
    if let Some(pos) = formats
        .iter()
        .position(|&(f, inline)| f == Format::Eot && !inline)
    {
        // The plain EOT url has to come first, on its own src line, for
        // IE versions that choke on the multi-entry list.
        formats.remove(pos);
        let eot_url = file_url(prefix, &files[&Format::Eot]);
        write!(
            out,
            "url({eot_url});\n  src: url({eot_url}?#iefix) format('embedded-opentype')"
        )?;
        first = false;
    }
    for (format, inline) in formats {
        if first {
            first = false;
        } else {
            write!(out, ",\n       ")?;
        }
        write!(out, "url(")?;
        let file = &files[&format];
        if inline {
            write_data_url(out, format, file)?;
        } else {
            write!(out, "{}", file_url(prefix, file))?;
            if format == Format::Svg {
                let id = utf8_percent_encode(&file.svg_id(), PATH_QUOTE).to_string();
                write!(out, "#{}", escape_css_url(&id))?;
            }
        }
        write!(out, ") format('{}')", css_format(format))?;
    }
    write!(out, ";\n}}\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn files_for(formats: &[Format]) -> BTreeMap<Format, FontFile> {
        formats
            .iter()
            .map(|&f| (f, FontFile::new(Path::new("out").join("a"), f)))
            .collect()
    }

    fn css(formats: &[(Format, bool)], files: &BTreeMap<Format, FontFile>) -> String {
        let mut out = Vec::new();
        generate_css(&mut out, formats, files, "fonts/", "Roboto").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn full_block_puts_eot_first() {
        let formats = [
            (Format::Eot, false),
            (Format::Woff2, false),
            (Format::Woff, false),
            (Format::Ttf, false),
            (Format::Svg, false),
        ];
        let files = files_for(&[
            Format::Eot,
            Format::Woff2,
            Format::Woff,
            Format::Ttf,
            Format::Svg,
        ]);
        assert_eq!(
            css(&formats, &files),
            "@font-face {\n\
             \x20 font-family: 'Roboto';\n\
             \x20 src: url(fonts/a.eot);\n\
             \x20 src: url(fonts/a.eot?#iefix) format('embedded-opentype'),\n\
             \x20      url(fonts/a.woff2) format('woff2'),\n\
             \x20      url(fonts/a.woff) format('woff'),\n\
             \x20      url(fonts/a.ttf) format('truetype'),\n\
             \x20      url(fonts/a.svg#a) format('svg');\n\
             }\n"
        );
    }

    #[test]
    fn without_eot_the_single_src_line_survives() {
        let formats = [(Format::Woff, false), (Format::Ttf, false)];
        let files = files_for(&[Format::Woff, Format::Ttf]);
        assert_eq!(
            css(&formats, &files),
            "@font-face {\n\
             \x20 font-family: 'Roboto';\n\
             \x20 src: url(fonts/a.woff) format('woff'),\n\
             \x20      url(fonts/a.ttf) format('truetype');\n\
             }\n"
        );
    }

    #[test]
    fn inline_eot_is_not_special_cased() {
        let dir = tempfile::tempdir().unwrap();
        let file = FontFile::new(dir.path().join("a"), Format::Eot);
        std::fs::write(file.path(), b"eotdata").unwrap();
        let files = BTreeMap::from([(Format::Eot, file)]);
        let output = css(&[(Format::Eot, true)], &files);
        assert!(output.contains(
            "src: url(data:application/vnd.ms-fontobject;base64,ZW90ZGF0YQ==) \
             format('embedded-opentype');"
        ));
        assert!(!output.contains("iefix"));
    }

    #[test]
    fn inline_entries_embed_the_file_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let file = FontFile::new(dir.path().join("a"), Format::Woff);
        std::fs::write(file.path(), b"woffdata").unwrap();
        let files = BTreeMap::from([(Format::Woff, file)]);
        let output = css(&[(Format::Woff, true)], &files);
        assert!(output.contains("url(data:application/font-woff;base64,d29mZmRhdGE=) format('woff')"));
    }

    #[test]
    fn family_names_escape_quotes_and_newlines() {
        assert_eq!(escape_css_str("It's\nserif"), "It\\'s\\Aserif");
        // Escaping an already-escaped name only touches raw apostrophes
        // and newlines, never the backslashes from the first pass.
        assert_eq!(escape_css_str("It\\'s"), "It\\\\'s");
    }

    #[test]
    fn urls_escape_css_terminators() {
        assert_eq!(escape_css_url("a(b) c'd\"e"), "a\\(b\\)\\ c\\'d\\\"e");
    }

    #[test]
    fn quote_plus_encodes_like_a_form() {
        assert_eq!(quote_plus("My Font (1).woff"), "My+Font+%281%29.woff");
        assert_eq!(quote_plus("a+b"), "a%2Bb");
        assert_eq!(quote_plus("safe_-.~"), "safe_-.~");
    }

    #[test]
    fn spaced_file_names_survive_both_quoting_layers() {
        let formats = [(Format::Woff, false)];
        let files = BTreeMap::from([(
            Format::Woff,
            FontFile::new(Path::new("out").join("My Font"), Format::Woff),
        )]);
        let output = css(&formats, &files);
        assert!(output.contains("url(fonts/My+Font.woff) format('woff')"));
    }

    #[test]
    fn svg_urls_carry_the_font_id_fragment() {
        let formats = [(Format::Svg, false)];
        let files = files_for(&[Format::Svg]);
        assert!(css(&formats, &files).contains("url(fonts/a.svg#a) format('svg')"));
    }

    #[test]
    fn media_types_are_fixed() {
        assert_eq!(media_type(Format::Eot), "application/vnd.ms-fontobject");
        assert_eq!(media_type(Format::Otf), "application/font-sfnt");
        assert_eq!(media_type(Format::Ttf), "application/font-sfnt");
        assert_eq!(media_type(Format::Svg), "image/svg+xml");
        assert_eq!(media_type(Format::Woff), "application/font-woff");
        assert_eq!(media_type(Format::Woff2), "application/font-woff2");
    }
}
