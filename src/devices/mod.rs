//! Device management.
//!
//! Only PS/2 devices live here; the mouse is the one driven today.

pub mod ps2_dev;
