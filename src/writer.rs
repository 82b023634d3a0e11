/*!
 * XML context document writer
 */

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::error::Result;
use crate::logger::ScanLogger;

/// Everything gathered for one scanned root
#[derive(Debug, Clone)]
pub struct ContextRoot {
    /// Root directory as walked
    pub path: PathBuf,
    /// Rendered tree of the root
    pub tree: String,
    /// Files whose contents are embedded
    pub files: Vec<PathBuf>,
}

/// Writes the context document
pub struct XmlWriter {
    logger: ScanLogger,
}

impl XmlWriter {
    /// Create a new XML writer
    pub fn new(logger: ScanLogger) -> Self {
        Self { logger }
    }

    /// Write the document to a file. Returns the number of files embedded.
    pub fn write_file(&self, output: &Path, roots: &[ContextRoot]) -> Result<usize> {
        let file = File::create(output)?;
        let mut sink = BufWriter::new(file);
        let written = self.write(&mut sink, roots)?;
        sink.flush()?;
        Ok(written)
    }

    /// Write the document to any sink. Returns the number of files embedded.
    pub fn write<W: Write>(&self, sink: W, roots: &[ContextRoot]) -> Result<usize> {
        let mut xml_writer = Writer::new_with_indent(sink, b' ', 2);

        xml_writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut start_tag = BytesStart::new("context");
        let timestamp = Local::now().to_rfc3339();
        start_tag.push_attribute(("timestamp", timestamp.as_str()));
        xml_writer.write_event(Event::Start(start_tag))?;

        self.write_system_info(&mut xml_writer)?;

        let mut written = 0;
        for root in roots {
            written += self.write_root(root, &mut xml_writer)?;
        }

        xml_writer.write_event(Event::End(BytesEnd::new("context")))?;
        Ok(written)
    }

    fn write_system_info<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("system_info")))?;

        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        write_text_element(writer, "hostname", &hostname)?;
        write_text_element(writer, "os", std::env::consts::OS)?;

        writer.write_event(Event::End(BytesEnd::new("system_info")))?;
        Ok(())
    }

    fn write_root<W: Write>(&self, root: &ContextRoot, writer: &mut Writer<W>) -> Result<usize> {
        let mut start_tag = BytesStart::new("root");
        start_tag.push_attribute(("path", root.path.to_string_lossy().as_ref()));
        writer.write_event(Event::Start(start_tag))?;

        write_text_element(writer, "tree", &root.tree)?;

        let base = fs::canonicalize(&root.path).unwrap_or_else(|_| root.path.clone());
        let mut written = 0;
        for path in &root.files {
            let content = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    self.logger
                        .warn(format_args!("cannot read {}: {}", path.display(), e));
                    continue;
                }
            };
            let Some(text) = as_text(content) else {
                self.logger
                    .warn(format_args!("{} is not text; left out", path.display()));
                continue;
            };

            let rel = path.strip_prefix(&base).unwrap_or(path);
            let mut file_tag = BytesStart::new("file");
            file_tag.push_attribute(("path", rel.to_string_lossy().as_ref()));
            file_tag.push_attribute(("size", text.len().to_string().as_str()));
            writer.write_event(Event::Start(file_tag))?;
            writer.write_event(Event::Text(BytesText::new(&text)))?;
            writer.write_event(Event::End(BytesEnd::new("file")))?;
            written += 1;
        }

        writer.write_event(Event::End(BytesEnd::new("root")))?;
        Ok(written)
    }
}

fn write_text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// Valid UTF-8 without NUL bytes
fn as_text(bytes: Vec<u8>) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    String::from_utf8(bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::Reader;
    use tempfile::tempdir;

    #[test]
    fn test_document_is_well_formed_and_escaped() {
        let dir = tempdir().unwrap();
        let code = dir.path().join("main.rs");
        fs::write(&code, "fn main() { if 1 < 2 && true {} }\n").unwrap();
        let blob = dir.path().join("blob.dat");
        fs::write(&blob, [0u8, 159, 146, 150]).unwrap();

        let root = ContextRoot {
            path: dir.path().to_path_buf(),
            tree: "p/\n└── main.rs\n".to_string(),
            files: vec![code, blob, dir.path().join("gone.rs")],
        };

        let mut out = Vec::new();
        let written = XmlWriter::new(ScanLogger::quiet())
            .write(&mut out, &[root])
            .unwrap();
        assert_eq!(written, 1);

        let xml = String::from_utf8(out).unwrap();
        assert!(xml.contains("<file path=\"main.rs\""));
        assert!(xml.contains("1 &lt; 2 &amp;&amp; true"));
        assert!(!xml.contains("blob.dat"));

        let mut reader = Reader::from_str(&xml);
        let mut depth = 0;
        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => depth += 1,
                Ok(Event::End(_)) => depth -= 1,
                Ok(Event::Eof) => break,
                Err(e) => panic!("Error parsing XML: {}", e),
                _ => (),
            }
        }
        assert_eq!(depth, 0, "XML structure is not well-balanced");
    }
}
