//! The translator and virtual machine as a library. See `src/bin` for the
//! two executables built on top of it.

#![allow(dead_code)]

pub mod back;
pub mod common;
pub mod front;
pub mod machine;
pub mod middle;
pub mod word;
