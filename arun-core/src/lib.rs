//! This crate implements the core of an interpreter for Alan v3 adventure games
//!
//! It loads `.a3c` images, keeps the world model and runs the acode virtual
//! machine. Reading player input and presenting output is left to a [`host::Host`].

#![allow(clippy::uninlined_format_args)]

pub mod acode;
pub mod error;
pub mod host;
pub mod image;
pub mod options;
pub mod testing;
pub mod version;
pub mod vm;
pub mod world;

pub use error::{Unwind, VmError};
pub use host::Host;
pub use image::Program;
pub use options::{Options, OptionsBuilder};
pub use vm::Vm;
