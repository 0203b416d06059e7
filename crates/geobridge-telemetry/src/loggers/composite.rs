use log::{LevelFilter, Log, Metadata, Record};

/// Routes records through a primary logger and mirrors them to taps.
///
/// The primary logger decides whether a record is logged at all.
/// A tap only sees records at or above its own level that it also enables.
pub struct CompositeLogger {
    primary: Box<dyn Log>,
    taps: Vec<(LevelFilter, Box<dyn Log>)>,
}

impl CompositeLogger {
    pub fn new(primary: Box<dyn Log>) -> Self {
        Self {
            primary,
            taps: vec![],
        }
    }

    pub fn with_tap(mut self, level: LevelFilter, logger: Box<dyn Log>) -> Self {
        self.taps.push((level, logger));
        self
    }
}

impl Log for CompositeLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.primary.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.primary.enabled(record.metadata()) {
            return;
        }
        self.primary.log(record);
        for (level, tap) in &self.taps {
            if record.level() <= *level && tap.enabled(record.metadata()) {
                tap.log(record);
            }
        }
    }

    fn flush(&self) {
        self.primary.flush();
        self.taps.iter().for_each(|(_, logger)| logger.flush());
    }
}
