use std::fmt::{self, Display, Formatter, Write};

const EOF_MARKER: &str = "EOF";

/// `KEY : VALUE` headers followed by data sections, one item per line.
pub(crate) struct TsplibWriter<'a, 'b> {
    f: &'a mut Formatter<'b>,
}

impl<'a, 'b> TsplibWriter<'a, 'b> {
    pub(crate) fn new(f: &'a mut Formatter<'b>) -> Self {
        Self { f }
    }

    pub(crate) fn header(&mut self, key: &str, value: impl Display) -> fmt::Result {
        writeln!(self.f, "{key} : {value}")
    }

    /// Skips the line when `value` is `None`.
    pub(crate) fn header_if<T: Display>(&mut self, key: &str, value: Option<T>) -> fmt::Result {
        match value {
            Some(value) => self.header(key, value),
            None => Ok(()),
        }
    }

    /// Nothing is written for an empty section.
    pub(crate) fn section<T: Display>(
        &mut self,
        name: &str,
        rows: &[T],
        terminator: Option<&str>,
    ) -> fmt::Result {
        if rows.is_empty() {
            return Ok(());
        }
        writeln!(self.f, "{name}")?;
        for row in rows {
            writeln!(self.f, "{row}")?;
        }
        match terminator {
            Some(end) => writeln!(self.f, "{end}"),
            None => Ok(()),
        }
    }

    pub(crate) fn finish(self, emit_eof: bool) -> fmt::Result {
        if emit_eof {
            self.f.write_str(EOF_MARKER)?;
            self.f.write_char('\n')?;
        }
        Ok(())
    }
}
