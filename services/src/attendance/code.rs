use rand::rngs::OsRng;
use rand::Rng;

pub const CODE_MIN: u32 = 100_000;
pub const CODE_MAX_EXCLUSIVE: u32 = 1_000_000;

/// Produces attendance codes.
pub trait CodeSource: Send + Sync {
    fn next_code(&self) -> String;
}

/// Six-digit codes drawn uniformly from the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsCodeSource;

impl CodeSource for OsCodeSource {
    fn next_code(&self) -> String {
        OsRng.gen_range(CODE_MIN..CODE_MAX_EXCLUSIVE).to_string()
    }
}
