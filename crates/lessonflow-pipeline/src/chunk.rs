// SPDX-FileCopyrightText: 2026 Lessonflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transcript chunking.

use std::collections::VecDeque;

/// Characters per snippet.
pub const CHUNK_SIZE: usize = 600;
/// Characters shared between neighbouring snippets.
pub const CHUNK_OVERLAP: usize = 200;

/// Break points, most preferred first: paragraph, line, word.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Split `text` into chunks of at most `size` characters.
///
/// Paragraphs are kept whole where they fit, then lines, then words; the
/// break that separated two pieces is kept inside a chunk. Runs of spaces
/// collapse to one and blank lines to a single paragraph break. Each chunk
/// after the first starts with trailing pieces of its predecessor, up to
/// `overlap` characters. A single word longer than `size` becomes its own
/// chunk.
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let text = normalise(text);
    if text.is_empty() {
        return Vec::new();
    }
    split_recursive(&text, &SEPARATORS, size, overlap)
}

fn normalise(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut paragraph_break = false;
    for line in text.lines() {
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            paragraph_break = !out.is_empty();
            continue;
        }
        if !out.is_empty() {
            out.push_str(if paragraph_break { "\n\n" } else { "\n" });
        }
        out.push_str(&words.join(" "));
        paragraph_break = false;
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn split_recursive(text: &str, separators: &[&str], size: usize, overlap: usize) -> Vec<String> {
    let Some(at) = separators.iter().position(|sep| text.contains(sep)) else {
        return vec![text.to_string()];
    };
    let separator = separators[at];
    let finer = &separators[at + 1..];

    let mut chunks = Vec::new();
    let mut fitting: Vec<&str> = Vec::new();
    for piece in text.split(separator).filter(|p| !p.is_empty()) {
        if char_len(piece) <= size {
            fitting.push(piece);
            continue;
        }
        if !fitting.is_empty() {
            chunks.extend(merge(&fitting, separator, size, overlap));
            fitting.clear();
        }
        if finer.is_empty() {
            chunks.push(piece.to_string());
        } else {
            chunks.extend(split_recursive(piece, finer, size, overlap));
        }
    }
    if !fitting.is_empty() {
        chunks.extend(merge(&fitting, separator, size, overlap));
    }
    chunks
}

/// Greedily join pieces that each fit in `size`, carrying up to `overlap`
/// characters of trailing pieces into the next chunk.
fn merge(pieces: &[&str], separator: &str, size: usize, overlap: usize) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut current: VecDeque<&str> = VecDeque::new();
    let mut total = 0;

    for &piece in pieces {
        let len = char_len(piece);
        let joined = |total: usize, current: &VecDeque<&str>| {
            total + len + if current.is_empty() { 0 } else { sep_len }
        };
        if joined(total, &current) > size && !current.is_empty() {
            chunks.push(join(&current, separator));
            while total > overlap || (total > 0 && joined(total, &current) > size) {
                let Some(first) = current.pop_front() else {
                    break;
                };
                total -= char_len(first) + if current.is_empty() { 0 } else { sep_len };
            }
        }
        total = joined(total, &current);
        current.push_back(piece);
    }
    if !current.is_empty() {
        chunks.push(join(&current, separator));
    }
    chunks
}

fn join(pieces: &VecDeque<&str>, separator: &str) -> String {
    pieces.iter().copied().collect::<Vec<_>>().join(separator)
}

/// Split a transcript into snippet texts.
pub fn split_transcript(text: &str) -> Vec<String> {
    split_text(text, CHUNK_SIZE, CHUNK_OVERLAP)
}
