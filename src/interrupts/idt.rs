//! Interrupt state helpers

use x86_64::instructions::interrupts;

/// Executes a closure with interrupts disabled, restoring the previous
/// interrupt state after.
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    interrupts::without_interrupts(f)
}
