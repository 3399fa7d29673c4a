//! Streaming tokenizer for package manifests
//!
//! A `+MANIFEST` is a JSON object, but only one nested object of it matters
//! here. The [`ManifestScanner`] therefore does not parse JSON: it tracks
//! brace depth and yields every quoted string together with the depth at
//! which it closed. Deciding which strings are significant is left to the
//! caller.

/// Longest string token kept, in bytes; longer ones are truncated
pub const MAX_TOKEN_LEN: usize = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Default,
    InQuotedString,
}

/// A quoted string and the brace depth it was found at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestToken {
    pub text: String,
    pub level: i32,
}

/// Resumable quoted-string and brace-depth scanner
#[derive(Debug, Clone)]
pub struct ManifestScanner {
    mode: Mode,
    level: i32,
    escaped: bool,
    buffer: Vec<u8>,
}

impl Default for ManifestScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ManifestScanner {
    pub fn new() -> Self {
        Self {
            mode: Mode::Default,
            level: 0,
            escaped: false,
            buffer: Vec::with_capacity(64),
        }
    }

    /// Current brace nesting depth
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Scans one chunk, lazily yielding each completed string token
    pub fn feed<'s, 'c>(&'s mut self, chunk: &'c [u8]) -> Tokens<'s, 'c> {
        Tokens {
            scanner: self,
            chunk,
            pos: 0,
        }
    }

    fn step(&mut self, byte: u8) -> Option<ManifestToken> {
        match self.mode {
            Mode::InQuotedString => {
                if self.escaped {
                    self.escaped = false;
                    self.push(byte);
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.mode = Mode::Default;
                    let text = String::from_utf8_lossy(&self.buffer).into_owned();
                    self.buffer.clear();
                    return Some(ManifestToken {
                        text,
                        level: self.level,
                    });
                } else {
                    self.push(byte);
                }
            }
            Mode::Default => match byte {
                b'"' => self.mode = Mode::InQuotedString,
                b'{' => self.level += 1,
                b'}' => self.level -= 1,
                _ => {}
            },
        }

        None
    }

    fn push(&mut self, byte: u8) {
        if self.buffer.len() < MAX_TOKEN_LEN {
            self.buffer.push(byte);
        }
    }
}

/// Iterator over the string tokens completed within one chunk
pub struct Tokens<'s, 'c> {
    scanner: &'s mut ManifestScanner,
    chunk: &'c [u8],
    pos: usize,
}

impl Iterator for Tokens<'_, '_> {
    type Item = ManifestToken;

    fn next(&mut self) -> Option<ManifestToken> {
        while self.pos < self.chunk.len() {
            let byte = self.chunk[self.pos];
            self.pos += 1;

            if let Some(token) = self.scanner.step(byte) {
                return Some(token);
            }
        }

        None
    }
}
