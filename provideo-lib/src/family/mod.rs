//! Feature families.
//!
//! Each module defines the family's driver trait, the public operations on
//! its [`crate::dispatch::Protocol`] handle, and the provideo driver.

pub mod auto;
pub mod cam;
pub mod cproc;
pub mod dpcc;
pub mod lut;
pub mod mcc;
pub mod playback;
pub mod system;
