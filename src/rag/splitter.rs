//! Separator-based text splitting with bounded chunk size and overlap.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RecommenderError;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const SEPARATOR: &str = "\n\n";

/// A loaded source document prior to chunking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: Value,
}

/// A slice of a [`Document`], tagged with the document's metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub text: String,
    pub metadata: Value,
    /// Chunk index within the source document
    pub chunk_index: usize,
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for TextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RecommenderError> {
        if chunk_size == 0 {
            return Err(RecommenderError::Validation(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(RecommenderError::Validation(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    pub fn split_documents(&self, documents: &[Document]) -> Vec<TextChunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .enumerate()
                    .map(|(chunk_index, text)| {
                        let mut metadata = doc.metadata.clone();
                        if let Some(obj) = metadata.as_object_mut() {
                            obj.insert("chunk_index".to_string(), json!(chunk_index));
                        }
                        TextChunk {
                            text,
                            metadata,
                            chunk_index,
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Splits `text` into non-empty chunks of at most `chunk_size` characters.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces = text
            .split(SEPARATOR)
            .map(|piece| piece.trim())
            .filter(|piece| !piece.is_empty())
            .flat_map(|piece| self.window(piece))
            .collect::<Vec<_>>();

        self.merge(pieces)
    }

    /// Cuts an oversized piece into overlapping character windows.
    fn window(&self, piece: &str) -> Vec<String> {
        let chars: Vec<char> = piece.chars().collect();
        if chars.len() <= self.chunk_size {
            return vec![piece.to_string()];
        }

        let step = self.chunk_size.saturating_sub(self.chunk_overlap).max(1);
        let mut windows = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(chars.len());
            windows.push(chars[start..end].iter().collect::<String>());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        windows
    }

    /// Greedily joins pieces up to `chunk_size`, carrying trailing pieces of at
    /// most `chunk_overlap` characters into the next chunk.
    fn merge(&self, pieces: Vec<String>) -> Vec<String> {
        let sep_len = SEPARATOR.chars().count();
        let mut chunks = Vec::new();
        let mut current: VecDeque<(String, usize)> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = piece.chars().count();
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size && !current.is_empty() {
                self.push_joined(&current, &mut chunks);

                loop {
                    let joiner = if current.is_empty() { 0 } else { sep_len };
                    let too_long = total > 0 && total + len + joiner > self.chunk_size;
                    if total <= self.chunk_overlap && !too_long {
                        break;
                    }
                    let Some((_, first_len)) = current.pop_front() else {
                        break;
                    };
                    let trailing_sep = if current.is_empty() { 0 } else { sep_len };
                    total = total.saturating_sub(first_len + trailing_sep);
                }
            }

            let joiner = if current.is_empty() { 0 } else { sep_len };
            total += len + joiner;
            current.push_back((piece, len));
        }

        self.push_joined(&current, &mut chunks);
        chunks
    }

    fn push_joined(&self, current: &VecDeque<(String, usize)>, chunks: &mut Vec<String>) {
        let joined = current
            .iter()
            .map(|(piece, _)| piece.as_str())
            .collect::<Vec<_>>()
            .join(SEPARATOR);
        let joined = joined.trim();
        if !joined.is_empty() {
            chunks.push(joined.to_string());
        }
    }
}
