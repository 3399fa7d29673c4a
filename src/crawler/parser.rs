//! Streaming link extraction for directory listings
//!
//! Repository listings are large, flat HTML pages. Rather than building a DOM,
//! the [`LinkScanner`] walks the bytes once, chunk by chunk, and yields the
//! `href` value of every `<a>` tag. Its state survives between chunks, so a
//! tag split across a chunk boundary is handled like any other.
//!
//! The scanner also watches for the closing `</html>` tag. A listing that
//! ends without it was cut short in transit.

use crate::index::is_space;

/// Longest tag name, attribute token or href value kept, in bytes
pub const MAX_TOKEN_LEN: usize = 499;

/// Where the scanner is within the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Outside any tag
    Idle,
    /// Reading the tag name right after `<`
    TagName,
    /// Inside a tag that is not an anchor, waiting for `>`
    InTag,
    /// Inside an `<a ...>` tag, reading attribute tokens
    InAttrName,
    /// Inside the quoted value of an `href` attribute
    InHrefValue,
    /// Inside some other quoted value, discarded
    InOtherQuotedValue { in_anchor: bool },
    /// Reading the name of a closing tag
    InCloseTag,
    /// `</html>` has been seen
    Done,
}

/// Resumable `href` extractor
///
/// Feed successive chunks of one document with [`LinkScanner::feed`] and
/// drain the returned iterator before feeding the next chunk.
///
/// # Example
///
/// ```
/// use pkgmirror::crawler::LinkScanner;
///
/// let mut scanner = LinkScanner::new();
/// let mut links: Vec<String> = scanner.feed(b"<html><a hr").collect();
/// links.extend(scanner.feed(b"ef=\"All/\">All</a></html>"));
/// assert_eq!(links, vec!["All/"]);
/// assert!(scanner.is_done());
/// ```
#[derive(Debug, Clone)]
pub struct LinkScanner {
    state: LinkState,
    buffer: Vec<u8>,
    overflowed: bool,
}

impl Default for LinkScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkScanner {
    pub fn new() -> Self {
        Self {
            state: LinkState::Idle,
            buffer: Vec::with_capacity(64),
            overflowed: false,
        }
    }

    /// Current state, mostly useful for diagnostics
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// True once the end-of-document marker has been seen
    pub fn is_done(&self) -> bool {
        self.state == LinkState::Done
    }

    /// Scans one chunk, lazily yielding each completed href
    pub fn feed<'s, 'c>(&'s mut self, chunk: &'c [u8]) -> Links<'s, 'c> {
        Links {
            scanner: self,
            chunk,
            pos: 0,
        }
    }

    fn reset_buffer(&mut self) {
        self.buffer.clear();
        self.overflowed = false;
    }

    fn push(&mut self, byte: u8) {
        if self.buffer.len() < MAX_TOKEN_LEN {
            self.buffer.push(byte);
        } else {
            self.overflowed = true;
        }
    }

    fn buffer_is(&self, word: &str) -> bool {
        self.buffer.eq_ignore_ascii_case(word.as_bytes())
    }

    /// Advances over one byte, returning an href when one completes
    fn step(&mut self, byte: u8) -> Option<String> {
        match self.state {
            LinkState::Idle => {
                if byte == b'<' {
                    self.reset_buffer();
                    self.state = LinkState::TagName;
                }
            }

            LinkState::TagName => match byte {
                b'>' => self.state = LinkState::Idle,
                b'/' => {
                    self.reset_buffer();
                    self.buffer.push(b'/');
                    self.state = LinkState::InCloseTag;
                }
                b'"' => self.state = LinkState::InOtherQuotedValue { in_anchor: false },
                b if is_space(b) => {
                    if self.buffer_is("a") {
                        self.reset_buffer();
                        self.state = LinkState::InAttrName;
                    } else {
                        self.state = LinkState::InTag;
                    }
                }
                b => self.push(b),
            },

            LinkState::InCloseTag => {
                if byte == b'>' {
                    self.state = if self.buffer_is("/html") {
                        LinkState::Done
                    } else {
                        LinkState::Idle
                    };
                } else {
                    self.push(byte);
                }
            }

            LinkState::InTag => {
                if byte == b'>' {
                    self.state = LinkState::Idle;
                }
            }

            LinkState::InAttrName => match byte {
                b'>' => self.state = LinkState::Idle,
                b'"' => {
                    self.state = if self.buffer_is("href=") || self.buffer_is("href") {
                        LinkState::InHrefValue
                    } else {
                        LinkState::InOtherQuotedValue { in_anchor: true }
                    };
                    self.reset_buffer();
                }
                // Spaces around '=' are tolerated: keep a pending "href"
                b if is_space(b) => {
                    if !self.buffer_is("href") && !self.buffer_is("href=") {
                        self.reset_buffer();
                    }
                }
                b => self.push(b),
            },

            LinkState::InHrefValue => {
                if byte == b'"' {
                    self.state = LinkState::InTag;
                    if self.overflowed {
                        tracing::debug!("Dropping href longer than {} bytes", MAX_TOKEN_LEN);
                    } else {
                        return Some(String::from_utf8_lossy(&self.buffer).into_owned());
                    }
                } else {
                    self.push(byte);
                }
            }

            LinkState::InOtherQuotedValue { in_anchor } => {
                if byte == b'"' {
                    self.state = if in_anchor {
                        LinkState::InAttrName
                    } else {
                        LinkState::InTag
                    };
                }
            }

            LinkState::Done => {}
        }

        None
    }
}

/// Iterator over the hrefs completed within one chunk
pub struct Links<'s, 'c> {
    scanner: &'s mut LinkScanner,
    chunk: &'c [u8],
    pos: usize,
}

impl Iterator for Links<'_, '_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.pos < self.chunk.len() {
            if self.scanner.is_done() {
                // Anything after </html> belongs to no document we care about
                self.pos = self.chunk.len();
                break;
            }

            let byte = self.chunk[self.pos];
            self.pos += 1;

            if let Some(href) = self.scanner.step(byte) {
                return Some(href);
            }
        }

        None
    }
}

/// Extracts every href from a complete in-memory document
///
/// Returns the links and whether the end-of-document marker was reached.
pub fn extract_links(document: &[u8]) -> (Vec<String>, bool) {
    let mut scanner = LinkScanner::new();
    let links = scanner.feed(document).collect();
    (links, scanner.is_done())
}
