/// Pattern used to pick the class name out of submitted source.
/// The first match wins.
pub const CLASS_PATTERN: &str = r"class\s+([A-Za-z_$][A-Za-z0-9_$]*)\s*";

pub const URI_SCHEME: &str = "mem";

pub const JAVAC_PATH_ENV: &str = "JAVAC_PATH";
pub const DEFAULT_JAVAC_PATH: &str = "javac";

pub const SOURCE_EXTENSION: &str = ".java";
pub const CLASS_EXTENSION: &str = ".class";
