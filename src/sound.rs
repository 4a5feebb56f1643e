use beep::beep;
use std::error::Error;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// The one thing the interpreter asks of an audio device: play the alert
/// now. Must not block; nobody waits for the sound to finish.
pub trait Sound {
    fn alert(&mut self) -> Result<(), Box<dyn Error>>;
}

const SIMPLEBEEP_PITCH: u16 = 2093; // C
const SIMPLEBEEP_LENGTH: Duration = Duration::from_millis(120);

/// PC-speaker style beep via the `beep` crate, played on a throwaway thread.
///
/// Failures are logged at warn once, then at debug, since the terminal
/// display may share stderr with the log.
pub struct SimpleBeep {
    pitch: u16,
    length: Duration,
    failed: Arc<AtomicBool>,
}

impl SimpleBeep {
    pub fn new() -> Self {
        SimpleBeep {
            pitch: SIMPLEBEEP_PITCH,
            length: SIMPLEBEEP_LENGTH,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl Default for SimpleBeep {
    fn default() -> Self {
        Self::new()
    }
}

impl Sound for SimpleBeep {
    fn alert(&mut self) -> Result<(), Box<dyn Error>> {
        let (pitch, length) = (self.pitch, self.length);
        let failed = Arc::clone(&self.failed);
        debug!(pitch, "beep");
        thread::Builder::new()
            .name("beep".into())
            .spawn(move || {
                if let Err(e) = beep(pitch) {
                    report_failure(&failed, "start", &e);
                    return;
                }
                spin_sleep::sleep(length);
                if let Err(e) = beep(0) {
                    report_failure(&failed, "stop", &e);
                }
            })?;
        Ok(())
    }
}

/// returns true for the first failure only
fn first_failure(failed: &AtomicBool) -> bool {
    !failed.swap(true, Ordering::Relaxed)
}

fn report_failure(failed: &AtomicBool, what: &str, e: &dyn std::fmt::Display) {
    if first_failure(failed) {
        warn!("can't {} beep: {}; further beep errors are logged at debug", what, e);
    } else {
        debug!("can't {} beep: {}", what, e);
    }
}

/// no sound at all; counts the alerts it swallowed
#[derive(Default)]
pub struct Mute {
    pub alerts: usize,
}

impl Mute {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sound for Mute {
    fn alert(&mut self) -> Result<(), Box<dyn Error>> {
        self.alerts += 1;
        Ok(())
    }
}
