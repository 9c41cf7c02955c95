//! Splitting content that is too large for one transaction.
//!
//! Anything up to [`MAX_INLINE_CONTENT_BYTES`] goes inline with the write.
//! Longer content is staged in chunks of at most [`MAX_CHUNK_BYTES`] and only
//! its last part travels with the write itself. Cuts fall on character
//! boundaries so every piece is valid UTF-8.

use message_bottle::utils::{MAX_CHUNK_BYTES, MAX_INLINE_CONTENT_BYTES};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentPlan<'a> {
    /// Pieces for `stage_content`, in order.
    pub chunks: Vec<&'a str>,
    /// What the write carries inline.
    pub inline: &'a str,
}

impl ContentPlan<'_> {
    pub fn is_staged(&self) -> bool {
        !self.chunks.is_empty()
    }
}

fn floor_boundary(s: &str, mut at: usize) -> usize {
    while !s.is_char_boundary(at) {
        at -= 1;
    }
    at
}

fn ceil_boundary(s: &str, mut at: usize) -> usize {
    while !s.is_char_boundary(at) {
        at += 1;
    }
    at
}

pub fn plan_content(content: &str) -> ContentPlan<'_> {
    if content.len() <= MAX_INLINE_CONTENT_BYTES {
        return ContentPlan {
            chunks: Vec::new(),
            inline: content,
        };
    }

    let split = ceil_boundary(content, content.len() - MAX_INLINE_CONTENT_BYTES);
    let (mut rest, inline) = content.split_at(split);
    let mut chunks = Vec::new();
    while !rest.is_empty() {
        let cut = floor_boundary(rest, rest.len().min(MAX_CHUNK_BYTES));
        let (chunk, tail) = rest.split_at(cut);
        chunks.push(chunk);
        rest = tail;
    }
    ContentPlan { chunks, inline }
}
