//! Triangle topology resource parsing.
//!
//! The resource is plain text:
//!
//! ```text
//! n_tri: <N>
//! {
//!   <N * 3 landmark indices>
//! }
//! ```
//!
//! The packaged table is parsed once per process and shared through an `Arc`.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::TopologyError;
use crate::NUM_LANDMARKS;

const PACKAGED_TOPOLOGY: &str = include_str!("../../assets/face_tri.txt");

const HEADER: &str = "n_tri:";

/// Triangle list over landmark indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTopology {
    triangle_count: usize,
    indices: Vec<u32>,
}

impl MeshTopology {
    /// Parse a topology resource from text.
    pub fn parse(source: &str) -> Result<Self, TopologyError> {
        let mut tokens = Tokenizer::new(source);

        let triangle_count = parse_header(&mut tokens)?;

        match tokens.next() {
            Some(Token::Open) => {}
            _ => return Err(TopologyError::MissingDelimiter('{')),
        }

        let declared = triangle_count
            .checked_mul(3)
            .ok_or_else(|| TopologyError::InvalidCount(triangle_count.to_string()))?;
        // Every index takes at least one character and a separator.
        let mut indices = Vec::with_capacity(declared.min(source.len() / 2 + 1));
        let mut closed = false;

        for token in tokens.by_ref() {
            match token {
                Token::Close => {
                    closed = true;
                    break;
                }
                Token::Open => return Err(TopologyError::MissingDelimiter('}')),
                Token::Word(word) => {
                    let index: u32 = word.parse().map_err(|_| TopologyError::InvalidIndex {
                        position: indices.len(),
                        token: word.to_string(),
                    })?;
                    if index as usize >= NUM_LANDMARKS {
                        return Err(TopologyError::IndexOutOfRange {
                            index,
                            limit: NUM_LANDMARKS,
                        });
                    }
                    indices.push(index);
                }
            }
        }

        if indices.len() != declared {
            return Err(TopologyError::CountMismatch {
                declared,
                found: indices.len(),
            });
        }
        if !closed {
            return Err(TopologyError::MissingDelimiter('}'));
        }
        if let Some(extra) = tokens.next() {
            return Err(TopologyError::TrailingData(extra.to_string()));
        }

        Ok(Self {
            triangle_count,
            indices,
        })
    }

    /// Read and parse a topology resource from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TopologyError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| TopologyError::Io(format!("{}: {}", path.display(), e)))?;
        Self::parse(&contents)
    }

    /// The topology packaged with the crate, parsed on first use.
    ///
    /// A parse failure is cached too; every caller sees the same result.
    pub fn packaged() -> Result<Arc<MeshTopology>, TopologyError> {
        static PACKAGED: OnceLock<Result<Arc<MeshTopology>, TopologyError>> = OnceLock::new();

        PACKAGED
            .get_or_init(|| {
                let result = Self::parse(PACKAGED_TOPOLOGY).map(Arc::new);
                match &result {
                    Ok(topology) => tracing::debug!(
                        "Packaged topology loaded: {} triangles",
                        topology.triangle_count()
                    ),
                    Err(e) => tracing::error!("Packaged topology is malformed: {}", e),
                }
                result
            })
            .clone()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// Landmark indices, three per triangle
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Iterate triangles as index triples
    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

fn parse_header(tokens: &mut Tokenizer<'_>) -> Result<usize, TopologyError> {
    let first = match tokens.next() {
        Some(Token::Word(word)) => word,
        _ => return Err(TopologyError::MissingHeader),
    };
    let rest = first
        .strip_prefix(HEADER)
        .ok_or(TopologyError::MissingHeader)?;

    // The count may be glued to the header ("n_tri:91") or stand alone.
    let count = if rest.is_empty() {
        match tokens.next() {
            Some(Token::Word(word)) => word,
            Some(other) => return Err(TopologyError::InvalidCount(other.to_string())),
            None => return Err(TopologyError::InvalidCount(String::new())),
        }
    } else {
        rest
    };

    count
        .parse()
        .map_err(|_| TopologyError::InvalidCount(count.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Open,
    Close,
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Word(word) => write!(f, "{}", word),
            Token::Open => write!(f, "{{"),
            Token::Close => write!(f, "}}"),
        }
    }
}

/// Splits on whitespace; braces are always tokens of their own.
struct Tokenizer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();

        let mut chars = trimmed.char_indices();
        let (_, c) = chars.next()?;
        match c {
            '{' => {
                self.pos += 1;
                Some(Token::Open)
            }
            '}' => {
                self.pos += 1;
                Some(Token::Close)
            }
            _ => {
                let end = trimmed
                    .find(|c: char| c.is_whitespace() || c == '{' || c == '}')
                    .unwrap_or(trimmed.len());
                self.pos += end;
                Some(Token::Word(&trimmed[..end]))
            }
        }
    }
}
