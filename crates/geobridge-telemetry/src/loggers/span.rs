use fastrace::local::LocalSpan;
use fastrace::Event;
use log::{Log, Metadata, Record};

/// A logger that attaches each record to the current local span as an event.
pub struct SpanEventLogger;

impl Log for SpanEventLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let event = Event::new(record.level().as_str()).with_properties(|| {
            [
                ("message", record.args().to_string()),
                ("target", record.target().to_string()),
            ]
        });
        LocalSpan::add_event(event);
    }

    fn flush(&self) {}
}
