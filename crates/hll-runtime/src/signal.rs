use crate::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);
static SAVING: AtomicBool = AtomicBool::new(false);
static PENDING: AtomicBool = AtomicBool::new(false);

/// Install the SIGINT handler once per process. Outside a guarded save the
/// process prints a newline and exits cleanly; during a save the interrupt
/// is recorded and honoured when the guard drops, so on-disk state is
/// never torn.
pub fn install() -> Result<()> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    ctrlc::set_handler(|| {
        if SAVING.load(Ordering::SeqCst) {
            PENDING.store(true, Ordering::SeqCst);
        } else {
            println!();
            std::process::exit(0);
        }
    })
    .map_err(|e| Error::Signal(e.to_string()))
}

/// Marks a guarded save. Constructed before the first write of a save,
/// dropped after the last one.
pub struct SaveGuard;

impl SaveGuard {
    pub fn begin() -> Self {
        SAVING.store(true, Ordering::SeqCst);
        SaveGuard
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        SAVING.store(false, Ordering::SeqCst);
        if PENDING.swap(false, Ordering::SeqCst) {
            println!();
            std::process::exit(0);
        }
    }
}
