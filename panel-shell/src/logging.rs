use log::{LevelFilter, Metadata, Record};

/// Forwards `log` records to the browser console, or stderr off the web.
pub struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format!("[{}] {}: {}", record.level(), record.target(), record.args());
        emit(record.level(), &line);
    }

    fn flush(&self) {}
}

#[cfg(target_arch = "wasm32")]
fn emit(level: log::Level, line: &str) {
    use wasm_bindgen::JsValue;
    use web_sys::console;

    let msg = JsValue::from_str(line);
    match level {
        log::Level::Error => console::error_1(&msg),
        log::Level::Warn => console::warn_1(&msg),
        log::Level::Info => console::info_1(&msg),
        log::Level::Debug | log::Level::Trace => console::debug_1(&msg),
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(_level: log::Level, line: &str) {
    eprintln!("{line}");
}

/// Install the console logger. Returns false if some logger was already installed,
/// in which case only the max level is updated.
pub fn init_logging(level: LevelFilter) -> bool {
    let installed = log::set_logger(&LOGGER).is_ok();
    log::set_max_level(level);
    installed
}
