//! Random credential generation.
//!
//! Characters are drawn uniformly (OS RNG) from the union of the enabled
//! classes. The classes match what the scorer rewards, so a generated
//! secret at default settings scores strong.

use rand::Rng;

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const DIGITS: &str = "0123456789";
const SYMBOLS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?";

#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    pub length: usize,
    pub uppercase: bool,
    pub lowercase: bool,
    pub digits: bool,
    pub symbols: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            length: 16,
            uppercase: true,
            lowercase: true,
            digits: true,
            symbols: true,
        }
    }
}

pub fn generate(options: &GeneratorOptions) -> String {
    let mut charset = String::new();
    if options.uppercase {
        charset.push_str(UPPERCASE);
    }
    if options.lowercase {
        charset.push_str(LOWERCASE);
    }
    if options.digits {
        charset.push_str(DIGITS);
    }
    if options.symbols {
        charset.push_str(SYMBOLS);
    }
    // All classes disabled still has to produce something usable.
    if charset.is_empty() {
        charset.push_str(LOWERCASE);
        charset.push_str(DIGITS);
    }

    let chars: Vec<char> = charset.chars().collect();
    let mut rng = rand::rngs::OsRng;
    (0..options.length)
        .map(|_| chars[rng.gen_range(0..chars.len())])
        .collect()
}
