//! Paragraph-boundary text chunker with overlap.
//!
//! Splits paper body text into chunks that respect a configurable
//! character limit. Splitting occurs on paragraph boundaries (`\n\n`)
//! to preserve semantic coherence within each chunk; consecutive chunks
//! share a tail-overlap so that sentences straddling a boundary stay
//! embeddable in at least one chunk.

/// Split text into chunks on paragraph boundaries, respecting `max_chars`.
/// Consecutive chunks overlap by up to `overlap` characters of the
/// previous chunk's tail. Returns an empty list for blank input.
pub fn chunk_text(text: &str, max_chars: usize, overlap: usize) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text.split("\n\n").collect();
    let mut chunks: Vec<String> = Vec::new();
    let mut current_buf = String::new();

    for para in paragraphs {
        let trimmed = para.trim();
        if trimmed.is_empty() {
            continue;
        }

        // If adding this paragraph would exceed max, flush current buffer
        let would_be = if current_buf.is_empty() {
            trimmed.len()
        } else {
            current_buf.len() + 2 + trimmed.len() // +2 for \n\n separator
        };

        if would_be > max_chars && !current_buf.is_empty() {
            flush(&mut chunks, &mut current_buf, overlap);
        }

        // If a single paragraph exceeds max, hard-split it
        if trimmed.len() > max_chars {
            if !current_buf.is_empty() {
                flush(&mut chunks, &mut current_buf, overlap);
            }
            let mut remaining = trimmed;
            while !remaining.is_empty() {
                let split_at = floor_char_boundary(remaining, remaining.len().min(max_chars));
                // Prefer a newline or space boundary when one exists
                let actual_split = if split_at < remaining.len() {
                    remaining[..split_at]
                        .rfind('\n')
                        .or_else(|| remaining[..split_at].rfind(' '))
                        .map(|pos| pos + 1)
                        .unwrap_or(split_at)
                } else {
                    split_at
                };
                let piece = remaining[..actual_split].trim();
                if !piece.is_empty() {
                    chunks.push(piece.to_string());
                }
                remaining = &remaining[actual_split..];
            }
            if let Some(last) = chunks.last() {
                current_buf = tail(last, overlap).to_string();
            }
        } else {
            if !current_buf.is_empty() {
                current_buf.push_str("\n\n");
            }
            current_buf.push_str(trimmed);
        }
    }

    if !current_buf.is_empty() && !only_overlap(&chunks, &current_buf) {
        chunks.push(current_buf);
    }

    chunks
}

fn flush(chunks: &mut Vec<String>, current_buf: &mut String, overlap: usize) {
    let carried = tail(current_buf, overlap).to_string();
    chunks.push(std::mem::take(current_buf));
    *current_buf = carried;
}

/// The final chunk must not consist solely of overlap carried from the
/// previous one, or trailing text would appear twice with no new content.
fn only_overlap(chunks: &[String], buf: &str) -> bool {
    chunks.last().map(|last| last.ends_with(buf)).unwrap_or(false)
}

fn tail(s: &str, overlap: usize) -> &str {
    if overlap == 0 || s.len() <= overlap {
        return if overlap == 0 { "" } else { s };
    }
    let start = ceil_char_boundary(s, s.len() - overlap);
    &s[start..]
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn ceil_char_boundary(s: &str, mut i: usize) -> usize {
    while i < s.len() && !s.is_char_boundary(i) {
        i += 1;
    }
    i
}
