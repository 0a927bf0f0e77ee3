//! Assemble JVM method bodies
//!
//! The interesting part of this crate lives in [`jvm::code`]: a label-addressed instruction stream
//! with reachability tracking, a typed operand layer on top of it, and structured control flow
//! (blocks, conditionals, `try`/`catch`, switches) built by splicing child streams into their
//! parent. Turning the result into an actual class file is left to a class writer, which receives
//! the finished [`jvm::code::Code`].

pub mod jvm;
pub mod util;
