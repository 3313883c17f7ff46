pub mod compiler;
pub mod toolchain;
