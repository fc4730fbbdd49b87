//! `Formatted` decorator: renders the record through a [`Formatter`] and
//! hands the inner writer a record whose `message` is the rendered line, so
//! every `Writer` impl — file, memory, network — only ever needs to write
//! `record.message`.

use crate::error::WriteError;
use crate::formatter::Formatter;
use crate::record::LogRecord;
use crate::writer::Writer;

pub struct Formatted<W: Writer> {
    inner: W,
    formatter: Box<dyn Formatter>,
    name: String,
}

impl<W: Writer> Formatted<W> {
    pub fn new(inner: W, formatter: Box<dyn Formatter>) -> Self {
        let name = format!("formatted({})", inner.name());
        Formatted { inner, formatter, name }
    }
}

impl<W: Writer> Writer for Formatted<W> {
    fn write(&mut self, record: &LogRecord) -> Result<(), WriteError> {
        let mut rendered = record.clone();
        rendered.message = self.formatter.format(record);
        self.inner.write(&rendered)
    }

    fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush()
    }

    fn healthy(&self) -> bool {
        self.inner.healthy()
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::TemplateFormatter;
    use crate::level::Level;
    use crate::record::LogRecordBuilder;
    use crate::writer::memory::MemoryWriter;

    #[test]
    fn inner_writer_receives_rendered_message() {
        let (inner, sink) = MemoryWriter::new("mem");
        let mut formatted = Formatted::new(inner, Box::new(TemplateFormatter::new()));
        let record = LogRecordBuilder::new(Level::Info, "booted").build();
        formatted.write(&record).unwrap();

        let captured = sink.records();
        assert_eq!(captured.len(), 1);
        assert!(captured[0].message.contains("[INFO]"));
        assert!(captured[0].message.contains("booted"));
    }

    #[test]
    fn fields_and_location_survive_formatting() {
        use crate::record::{Fields, Location};

        let (inner, sink) = MemoryWriter::new("mem");
        let mut formatted = Formatted::new(inner, Box::new(TemplateFormatter::new()));
        let mut fields = Fields::new();
        fields.set("request_id", "abc123");
        let record = LogRecordBuilder::new(Level::Info, "booted")
            .fields(fields)
            .location(Location {
                file: "main.rs",
                line: 10,
                function: "start",
            })
            .build();
        formatted.write(&record).unwrap();

        let captured = sink.records();
        assert_eq!(
            captured[0].fields.get("request_id").unwrap().as_str(),
            Some("abc123")
        );
        assert_eq!(captured[0].location.as_ref().unwrap().file, "main.rs");
    }
}
