//! PDF text extraction and metadata heuristics.
//!
//! Extraction is plain text only (`pdf_extract`); no layout analysis.
//! On top of the raw text this module applies lightweight heuristics to
//! recover the title, author list, abstract, and publication year, and
//! renders a markdown view where recognized section headings become `##`
//! heads. Papers that defeat the heuristics still ingest with a fallback
//! title and empty metadata.

use std::path::Path;

use anyhow::{Context, Result};

/// Section heads promoted to `## ...` in the markdown view.
const SECTION_KEYWORDS: &[&str] = &[
    "abstract",
    "introduction",
    "method",
    "result",
    "discussion",
    "conclusion",
    "related work",
    "experiment",
    "reference",
];

/// How far into the document metadata heuristics look, in lines.
const METADATA_WINDOW: usize = 50;

/// Everything recovered from one PDF.
#[derive(Debug, Clone)]
pub struct ParsedPaper {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i64>,
    pub abstract_text: Option<String>,
    pub raw_text: String,
    pub markdown_text: String,
}

/// Read and parse one PDF file. Returns the parsed paper together with
/// the raw file bytes (callers hash them for dedup).
pub fn parse_pdf(path: &Path) -> Result<(ParsedPaper, Vec<u8>)> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let raw_text = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("PDF extraction failed for {}", path.display()))?;
    let parsed = parse_text(&raw_text, path);
    Ok((parsed, bytes))
}

/// Apply all heuristics to already-extracted text.
pub fn parse_text(raw_text: &str, path: &Path) -> ParsedPaper {
    ParsedPaper {
        title: extract_title(raw_text, path),
        authors: extract_authors(raw_text),
        year: extract_year(raw_text),
        abstract_text: extract_abstract(raw_text),
        raw_text: raw_text.to_string(),
        markdown_text: to_markdown(raw_text),
    }
}

/// First non-blank line, or the file stem when the text is empty.
fn extract_title(text: &str, path: &Path) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.to_string())
        .unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "Untitled".to_string())
        })
}

/// Scan the opening lines for an "author"/"by" marker and split the line
/// after it on commas and semicolons.
fn extract_authors(text: &str) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    for (i, line) in lines.iter().take(30).enumerate() {
        let lower = line.to_lowercase();
        if lower.contains("author") || lower.split_whitespace().any(|w| w == "by") {
            let candidate = lines.get(i + 1).copied().unwrap_or(line);
            let authors: Vec<String> = candidate
                .split(|c| c == ',' || c == ';')
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            if !authors.is_empty() {
                return authors;
            }
        }
    }
    Vec::new()
}

/// First plausible 19xx/20xx token in the metadata window.
fn extract_year(text: &str) -> Option<i64> {
    for line in text.lines().take(METADATA_WINDOW) {
        for token in line.split(|c: char| !c.is_ascii_digit()) {
            if token.len() == 4 {
                if let Ok(year) = token.parse::<i64>() {
                    if (1900..=2100).contains(&year) {
                        return Some(year);
                    }
                }
            }
        }
    }
    None
}

/// The text between an "Abstract" head and the next blank line or
/// heading-like line.
fn extract_abstract(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|l| {
        let t = l.trim();
        t.eq_ignore_ascii_case("abstract") || t.to_lowercase().starts_with("abstract")
    })?;

    let mut body: Vec<&str> = Vec::new();
    // An "Abstract: ..." head carries the opening sentence on the same line
    let head = lines[start].trim();
    let inline = head
        .strip_prefix("Abstract")
        .or_else(|| head.strip_prefix("ABSTRACT"))
        .map(|rest| rest.trim_start_matches([':', '.', '-', ' ']))
        .unwrap_or("");
    if !inline.is_empty() {
        body.push(inline);
    }

    for line in lines.iter().skip(start + 1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if body.is_empty() {
                continue;
            }
            break;
        }
        if is_section_head(trimmed) {
            break;
        }
        body.push(trimmed);
    }

    if body.is_empty() {
        None
    } else {
        Some(body.join(" "))
    }
}

/// Lines shorter than 100 chars that are all-caps or few-word and name a
/// known section keyword count as heads.
fn is_section_head(line: &str) -> bool {
    if line.len() >= 100 {
        return false;
    }
    let looks_like_head =
        line.chars().all(|c| !c.is_lowercase()) || line.split_whitespace().count() < 10;
    if !looks_like_head {
        return false;
    }
    let lower = line.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Render raw text as markdown, promoting recognized section heads.
fn to_markdown(text: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            out.push(String::new());
            continue;
        }
        if is_section_head(trimmed) {
            out.push(format!("\n## {}\n", trimmed));
        } else {
            out.push(trimmed.to_string());
        }
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const SAMPLE: &str = "Attention Is All You Need\n\
        Authors\n\
        Ashish Vaswani, Noam Shazeer, Niki Parmar\n\
        2017\n\
        \n\
        Abstract\n\
        The dominant sequence transduction models are based on complex\n\
        recurrent or convolutional neural networks.\n\
        \n\
        INTRODUCTION\n\
        Recurrent neural networks have long dominated sequence modeling.\n";

    fn parsed() -> ParsedPaper {
        parse_text(SAMPLE, &PathBuf::from("attention.pdf"))
    }

    #[test]
    fn title_is_first_nonblank_line() {
        assert_eq!(parsed().title, "Attention Is All You Need");
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        let p = parse_text("", &PathBuf::from("/tmp/some paper.pdf"));
        assert_eq!(p.title, "some paper");
    }

    #[test]
    fn authors_split_on_commas_after_marker() {
        assert_eq!(
            parsed().authors,
            vec!["Ashish Vaswani", "Noam Shazeer", "Niki Parmar"]
        );
    }

    #[test]
    fn year_found_within_window() {
        assert_eq!(parsed().year, Some(2017));
    }

    #[test]
    fn year_ignores_implausible_numbers() {
        let p = parse_text("Title\npage 1234 of 5678\ncode 0042\n", &PathBuf::from("x.pdf"));
        assert_eq!(p.year, None);
    }

    #[test]
    fn abstract_captured_until_blank_line() {
        let a = parsed().abstract_text.unwrap();
        assert!(a.starts_with("The dominant sequence transduction models"));
        assert!(a.ends_with("neural networks."));
        assert!(!a.contains("INTRODUCTION"));
    }

    #[test]
    fn abstract_inline_head_keeps_first_sentence() {
        let text = "Title\n\nAbstract: We study things.\nMore detail here.\n\nIntroduction\n";
        let p = parse_text(text, &PathBuf::from("x.pdf"));
        assert_eq!(
            p.abstract_text.unwrap(),
            "We study things. More detail here."
        );
    }

    #[test]
    fn markdown_promotes_section_heads() {
        let md = parsed().markdown_text;
        assert!(md.contains("## Abstract"));
        assert!(md.contains("## INTRODUCTION"));
        assert!(!md.contains("## Attention Is All You Need"));
    }

    #[test]
    fn missing_abstract_is_none() {
        let p = parse_text("Title\n\nIntroduction\nBody text.\n", &PathBuf::from("x.pdf"));
        assert!(p.abstract_text.is_none());
    }
}
