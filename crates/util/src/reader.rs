//! Line-oriented reader for the legacy v2 text format. Ported from
//! `common.py`'s `readfloat`/`readfloatstr`, plus the plain line reads the
//! original inlines at every call site.

use std::io::{BufRead, BufReader, Read};

use model::{ConvertError, Result};

/// Reads the v2 file one line at a time. Every byte in Latin-1/ISO-8859-1
/// maps directly onto the same Unicode scalar value, so decoding is a
/// byte-for-byte widen with no external crate required.
pub struct LegacyReader<R> {
    inner: BufReader<R>,
    line_no: u64,
}

impl<R: Read> LegacyReader<R> {
    pub fn new(inner: R) -> Self {
        LegacyReader {
            inner: BufReader::new(inner),
            line_no: 0,
        }
    }

    /// Reads one line, stripping the trailing `\r\n`/`\n` and decoding as
    /// Latin-1. Returns `Ok(None)` at end of file.
    pub fn read_line(&mut self) -> Result<Option<String>> {
        let mut buf = Vec::new();
        let n = self.inner.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
            buf.pop();
        }
        Ok(Some(buf.iter().map(|&b| b as char).collect()))
    }

    /// Reads one required line; a missing line is an `UnexpectedEof`.
    pub fn read_line_required(&mut self, context: &'static str) -> Result<String> {
        self.read_line()?
            .ok_or(ConvertError::UnexpectedEof { context })
    }

    /// Reads one line as an `i64`.
    pub fn read_int(&mut self, context: &'static str) -> Result<i64> {
        let line = self.read_line_required(context)?;
        line.trim()
            .parse()
            .map_err(|_| ConvertError::InvalidFloat { line })
    }

    /// Reads one line as a `u32`.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(self.read_int(context)? as u32)
    }

    /// `readfloat`: `None` if the line is a `#` sentinel, else the locale
    /// comma-decimal value parsed as `f64`.
    pub fn read_float(&mut self) -> Result<Option<f64>> {
        match self.read_line()? {
            None => Ok(None),
            Some(line) if line.starts_with('#') => Ok(None),
            Some(line) => {
                let normalized = line.trim().replace(',', ".");
                normalized
                    .parse()
                    .map(Some)
                    .map_err(|_| ConvertError::InvalidFloat { line: normalized })
            }
        }
    }

    /// `readfloatstr`: `None` if the line is a `#` sentinel, else the
    /// locale-comma-normalized text, preserved verbatim (not re-parsed into a
    /// number) so downstream XML emission doesn't perturb the value.
    pub fn read_float_str(&mut self) -> Result<Option<String>> {
        match self.read_line()? {
            None => Ok(None),
            Some(line) if line.starts_with('#') => Ok(None),
            Some(line) => Ok(Some(line.trim().replace(',', "."))),
        }
    }

    /// `read_float` for a required (non-`#`) field.
    pub fn read_float_required(&mut self, context: &'static str) -> Result<f64> {
        self.read_float()?
            .ok_or(ConvertError::UnexpectedEof { context })
    }

    /// `read_float_str` for a required (non-`#`) field.
    pub fn read_float_str_required(&mut self, context: &'static str) -> Result<String> {
        self.read_float_str()?
            .ok_or(ConvertError::UnexpectedEof { context })
    }

    /// Reads lines until one starting with `#`, discarding them (several v2
    /// sections are skipped this way by the original converter).
    pub fn skip_until_hash(&mut self) -> Result<()> {
        loop {
            match self.read_line()? {
                None => return Ok(()),
                Some(line) if line.starts_with('#') => return Ok(()),
                Some(_) => continue,
            }
        }
    }

    pub fn line_no(&self) -> u64 {
        self.line_no
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> LegacyReader<&[u8]> {
        LegacyReader::new(data.as_bytes())
    }

    #[test]
    fn read_line_strips_crlf() {
        let mut r = reader("hello\r\nworld\n");
        assert_eq!(r.read_line().unwrap().as_deref(), Some("hello"));
        assert_eq!(r.read_line().unwrap().as_deref(), Some("world"));
        assert_eq!(r.read_line().unwrap(), None);
    }

    #[test]
    fn read_float_converts_locale_comma() {
        let mut r = reader("32945,2\r\n");
        assert_eq!(r.read_float().unwrap(), Some(32945.2));
    }

    #[test]
    fn read_float_returns_none_for_sentinel() {
        let mut r = reader("#\r\n");
        assert_eq!(r.read_float().unwrap(), None);
    }

    #[test]
    fn read_float_str_preserves_text_form() {
        let mut r = reader("-0,0231\r\n");
        assert_eq!(r.read_float_str().unwrap().as_deref(), Some("-0.0231"));
    }

    #[test]
    fn latin1_high_bytes_map_to_the_same_codepoint() {
        // 0xE4 is "ä" in Latin-1 but would be invalid as a lone UTF-8 byte.
        let raw: &[u8] = &[0xE4, b'\r', b'\n'];
        let mut r = LegacyReader::new(raw);
        assert_eq!(r.read_line().unwrap().as_deref(), Some("\u{e4}"));
    }
}
