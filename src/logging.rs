//! Logger setup. The terminal belongs to the UI while a session runs, so log
//! records go to a file when one is given and are otherwise held back until
//! the terminal has been restored.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Log output captured in memory.
#[derive(Clone, Default)]
pub struct Deferred(Arc<Mutex<Vec<u8>>>);

impl Deferred {
    /// Write everything captured so far to `out`, leaving the buffer empty.
    pub fn flush_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let captured = std::mem::take(&mut *self.lock()?);
        out.write_all(&captured)
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, Vec<u8>>> {
        self.0
            .lock()
            .map_err(|_| io::Error::other("log buffer poisoned"))
    }
}

impl Write for Deferred {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock()?.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Install the `RUST_LOG`-filtered logger. Returns the buffer to flush after
/// the session when no log file is used.
pub fn init(log_file: Option<&Path>) -> io::Result<Option<Deferred>> {
    let mut builder = env_logger::Builder::from_default_env();
    let deferred = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
            None
        }
        None => {
            let deferred = Deferred::default();
            builder.target(env_logger::Target::Pipe(Box::new(deferred.clone())));
            Some(deferred)
        }
    };
    builder.init();
    Ok(deferred)
}
