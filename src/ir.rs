pub mod assembler;
pub mod format;
pub mod input;
pub mod loopback;
pub mod output;
pub mod panasonic;
pub mod receiver;
pub mod types;
