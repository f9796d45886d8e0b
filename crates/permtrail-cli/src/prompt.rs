//! Operator prompt trigger.
//!
//! Prints a prompt and fires once a line arrives on the reader. End of input
//! before any line cancels the wait. The reader runs on its own thread so the
//! wait stays bounded by the trigger timeout; on timeout that thread is left
//! blocked on the reader until the process exits.

use permtrail_core::errors::ExError;
use permtrail_core::source::Trigger;
use permtrail_engine::ChannelTrigger;
use std::io::{BufRead, Write};
use std::sync::Mutex;
use std::time::Duration;

pub const PROMPT: &str = "Make the permission changes, then press Enter to continue...";

type LineReader = Box<dyn BufRead + Send>;

pub struct PromptTrigger {
    reader: Mutex<Option<LineReader>>,
}

impl PromptTrigger {
    pub fn stdin() -> Self {
        Self::with_reader(Box::new(std::io::BufReader::new(std::io::stdin())))
    }

    pub fn with_reader(reader: LineReader) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }
}

impl Trigger for PromptTrigger {
    fn wait(&self, timeout: Option<Duration>) -> Result<(), ExError> {
        let reader = self.reader.lock().ok().and_then(|mut slot| slot.take());
        let (channel, handle) = ChannelTrigger::new();

        if let Some(mut reader) = reader {
            eprint!("{} ", PROMPT);
            std::io::stderr().flush().ok();

            std::thread::spawn(move || {
                let mut line = String::new();
                // EOF or a read error drops the handle unfired, cancelling the wait
                if matches!(reader.read_line(&mut line), Ok(n) if n > 0) {
                    handle.fire();
                }
            });
        } else {
            // Already consumed by an earlier wait
            drop(handle);
        }

        channel.wait(timeout)
    }
}
