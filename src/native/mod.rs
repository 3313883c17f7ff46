/// Native module contains toolchain implementations that drive
/// a compiler binary installed on the host.
pub mod diagnostics;
pub mod javac;
