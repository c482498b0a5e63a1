//! Tab completion against dynamic candidate sets.
//!
//! The engine isolates the last whitespace-delimited token ending at
//! the cursor, matches candidates case-insensitively by prefix, and
//! either substitutes the unique match (with its rule-defined suffix)
//! or extends to the longest common prefix and reports the candidates.

use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing matched; the input is untouched.
    NoMatch,
    /// Exactly one candidate matched and was substituted.
    Single { line: String, cursor: usize },
    /// Several candidates matched; the token may have been extended to
    /// their longest common prefix.
    Multiple {
        line: String,
        cursor: usize,
        candidates: Vec<String>,
    },
}

fn token_bounds(line: &str, cursor: usize) -> (usize, usize) {
    let chars: Vec<char> = line.chars().collect();
    let cursor = cursor.min(chars.len());
    let mut start = cursor;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    (start, cursor)
}

fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut prefix: Vec<char> = first.chars().collect();
    for cand in &candidates[1..] {
        let cand: Vec<char> = cand.chars().collect();
        let mut n = 0;
        while n < prefix.len()
            && n < cand.len()
            && prefix[n].to_lowercase().eq(cand[n].to_lowercase())
        {
            n += 1;
        }
        prefix.truncate(n);
    }
    prefix.into_iter().collect()
}

fn splice(line: &str, start: usize, end: usize, replacement: &str) -> (String, usize) {
    let chars: Vec<char> = line.chars().collect();
    let mut out: String = chars[..start].iter().collect();
    out.push_str(replacement);
    let cursor = start + replacement.chars().count();
    out.extend(chars[end..].iter());
    (out, cursor)
}

/// Completes the token at `cursor` against `candidates`.
pub fn complete(line: &str, cursor: usize, candidates: &[String]) -> Outcome {
    let (start, end) = token_bounds(line, cursor);
    let token: String = line.chars().skip(start).take(end - start).collect();
    if token.is_empty() {
        return Outcome::NoMatch;
    }

    let token_lower = token.to_lowercase();
    let matches: Vec<String> = candidates
        .iter()
        .filter(|c| c.to_lowercase().starts_with(&token_lower))
        .cloned()
        .collect();

    match matches.len() {
        0 => Outcome::NoMatch,
        1 => {
            // A name at the start of a line becomes an address
            // ("Alice: "); everything else gets a plain space.
            let is_command = matches[0].starts_with('/');
            let suffix = if start == 0 && !is_command { ": " } else { " " };
            let replacement = format!("{}{}", matches[0], suffix);
            let (line, cursor) = splice(line, start, end, &replacement);
            Outcome::Single { line, cursor }
        }
        _ => {
            let prefix = common_prefix(&matches);
            let (line, cursor) = if prefix.chars().count() > token.chars().count() {
                splice(line, start, end, &prefix)
            } else {
                (line.to_owned(), cursor)
            };
            Outcome::Multiple {
                line,
                cursor,
                candidates: matches,
            }
        }
    }
}

/// Treats the token as a filesystem prefix and completes against the
/// directory listing (used by `/sendfile`, `/avatar` and `/run`).
pub fn complete_path(line: &str, cursor: usize) -> Outcome {
    let (start, end) = token_bounds(line, cursor);
    let token: String = line.chars().skip(start).take(end - start).collect();
    if token.is_empty() {
        return Outcome::NoMatch;
    }

    let expanded = expand_home(&token);
    let (dir, stem) = match expanded.ends_with('/') {
        true => (PathBuf::from(&expanded), String::new()),
        false => {
            let p = Path::new(&expanded);
            let dir = p.parent().filter(|d| !d.as_os_str().is_empty());
            (
                dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(".")),
                p.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        }
    };

    let Ok(entries) = fs::read_dir(&dir) else {
        return Outcome::NoMatch;
    };

    let mut candidates = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.to_lowercase().starts_with(&stem.to_lowercase()) {
            continue;
        }
        let mut full = dir.join(&name).to_string_lossy().into_owned();
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            full.push('/');
        }
        candidates.push(full);
    }
    candidates.sort();

    match candidates.len() {
        0 => Outcome::NoMatch,
        1 => {
            let dir_candidate = candidates[0].ends_with('/');
            let replacement = if dir_candidate {
                candidates[0].clone()
            } else {
                format!("{} ", candidates[0])
            };
            let (line, cursor) = splice(line, start, end, &replacement);
            Outcome::Single { line, cursor }
        }
        _ => {
            let prefix = common_prefix(&candidates);
            let (line, cursor) = if prefix.chars().count() > token.chars().count() {
                splice(line, start, end, &prefix)
            } else {
                (line.to_owned(), cursor)
            };
            Outcome::Multiple {
                line,
                cursor,
                candidates,
            }
        }
    }
}

fn expand_home(token: &str) -> String {
    if let Some(rest) = token.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return format!("{}/{}", home.to_string_lossy(), rest);
    }
    token.to_owned()
}
