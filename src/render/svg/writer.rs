use std::{fs::File, io::{BufWriter, Write}, path::{Path, PathBuf}};

use crate::{common, error::{Error, Result}};

/// Buffered SVG file writer; `write!`/`writeln!` go straight to the file.
pub(crate) struct SvgWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl Write for SvgWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> { self.writer.write(buf) }

    fn flush(&mut self) -> std::io::Result<()> { self.writer.flush() }

    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> { self.writer.write_all(buf) }
}

impl SvgWriter {
    pub(crate) fn new(path: &Path) -> Result<Self> {
        Ok(Self { path: path.to_path_buf(), writer: BufWriter::new(common::create_file(path)?) })
    }

    /// Attach the output path to an I/O failure.
    pub(crate) fn fail(&self, source: std::io::Error) -> Error {
        Error::unwritable(&self.path, source)
    }

    /// XML declaration, opening `<svg>` tag and white background.
    pub(crate) fn write_header(&mut self, width: f64, height: f64) -> std::io::Result<()> {
        writeln!(self, r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##)?;
        writeln!(self, r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"##)?;
        writeln!(self, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
        Ok(())
    }

    pub(crate) fn write_styles(&mut self) -> std::io::Result<()> {
        writeln!(self, r##"<defs>
<style>
    .region {{ stroke: #111827; stroke-width: 0.5; fill-opacity: 0.85; fill-rule: evenodd; }}
    .nodata {{ fill: #d1d5db; }}
</style>
</defs>"##)
    }

    pub(crate) fn write_footer(&mut self) -> std::io::Result<()> {
        writeln!(self, "</svg>")
    }
}
