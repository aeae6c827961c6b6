//! Deterministic cleanup of VLM-generated Markdown.
//!
//! Models sometimes ignore parts of the prompt: they wrap the page in a
//! ```` ```markdown ```` fence, emit CRLF, pad lines, pile up blank lines,
//! drop the separator row of a table, or invent `![figure](figure.png)` links.
//! Each rule below fixes one such quirk without touching the text itself.
//!
//! Image links are kept when they point at a real URL or at one of the images
//! the engine extracted next to the Markdown file; every other link is reduced
//! to its alt text so readers are not sent to files that do not exist.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Clean one page of model output.
///
/// `known_images` are the file names that will be written next to the
/// Markdown; links to them survive.
pub fn clean_markdown(input: &str, known_images: &BTreeSet<String>) -> String {
    let s = strip_outer_fence(input);
    let s = s.replace("\r\n", "\n").replace('\r', "\n");
    let s = trim_line_ends(&s);
    let s = remove_invisible_chars(&s);
    let s = add_missing_table_separators(&s);
    let s = rewrite_image_links(&s, known_images);
    let s = RE_BLANK_RUN.replace_all(&s, "\n\n\n").into_owned();
    with_single_final_newline(&s)
}

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?[ \t]*\r?\n(.*?)\r?\n```\s*$").unwrap());

static RE_BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

static RE_IMAGE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]*)(?:\s+[^)]*)?\)").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

fn trim_line_ends(input: &str) -> String {
    input.lines().map(str::trim_end).collect::<Vec<_>>().join("\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}'],
        "",
    )
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.contains('-') && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Insert a `| --- |` row after a table header that lacks one.
fn add_missing_table_separators(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);

    for (i, line) in lines.iter().enumerate() {
        out.push((*line).to_string());

        let starts_table = is_table_row(line)
            && !is_separator_row(line)
            && (i == 0 || !is_table_row(lines[i - 1]));
        let next = lines.get(i + 1).copied().unwrap_or("");
        if starts_table && is_table_row(next) && !is_separator_row(next) {
            let cols = line.trim().matches('|').count().saturating_sub(1).max(1);
            out.push(format!("|{}", " --- |".repeat(cols)));
        }
    }

    out.join("\n")
}

fn rewrite_image_links(input: &str, known_images: &BTreeSet<String>) -> String {
    RE_IMAGE_LINK
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let alt = caps[1].trim();
            let target = caps[2].trim();
            let is_remote = target.starts_with("http://") || target.starts_with("https://");
            let local = target.trim_start_matches("./");
            if (is_remote && !is_placeholder_host(target)) || known_images.contains(local) {
                caps[0].to_string()
            } else if alt.is_empty() {
                String::new()
            } else {
                format!("*{alt}*")
            }
        })
        .into_owned()
}

fn is_placeholder_host(url: &str) -> bool {
    [
        "example.com",
        "example.org",
        "placeholder.com",
        "placehold.it",
        "dummyimage.com",
        "picsum.photos",
    ]
    .iter()
    .any(|host| url.contains(host))
}

fn with_single_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        "\n".to_string()
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn strips_markdown_fence() {
        assert_eq!(clean_markdown("```markdown\n# Hi\nthere\n```", &none()), "# Hi\nthere\n");
        assert_eq!(clean_markdown("```\n# Hi\n```", &none()), "# Hi\n");
    }

    #[test]
    fn keeps_inner_code_blocks() {
        let input = "Text\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(clean_markdown(input, &none()), input);
    }

    #[test]
    fn normalises_line_endings_and_trailing_space() {
        assert_eq!(clean_markdown("a  \r\nb\rc\t", &none()), "a\nb\nc\n");
    }

    #[test]
    fn collapses_blank_runs() {
        assert_eq!(clean_markdown("a\n\n\n\n\n\nb", &none()), "a\n\n\nb\n");
    }

    #[test]
    fn removes_invisible_characters() {
        assert_eq!(
            clean_markdown("zero\u{200B}width\u{FEFF} soft\u{00AD}hyphen", &none()),
            "zerowidth softhyphen\n"
        );
    }

    #[test]
    fn adds_missing_table_separator() {
        let out = clean_markdown("| A | B |\n| 1 | 2 |\n| 3 | 4 |", &none());
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "| --- | --- |");
    }

    #[test]
    fn leaves_well_formed_table_alone() {
        let input = "| A | B |\n| :-- | --: |\n| 1 | 2 |\n";
        assert_eq!(clean_markdown(input, &none()), input);
    }

    #[test]
    fn image_links_to_missing_files_become_captions() {
        let out = clean_markdown("See ![Revenue chart](chart.png) below", &none());
        assert_eq!(out, "See *Revenue chart* below\n");
    }

    #[test]
    fn image_links_to_extracted_images_survive() {
        let known: BTreeSet<String> = ["page_1_image_1.png".to_string()].into();
        let input = "![Figure 1](page_1_image_1.png)\n";
        assert_eq!(clean_markdown(input, &known), input);
    }

    #[test]
    fn remote_links_kept_unless_placeholder() {
        let real = "![Fig](https://arxiv.org/html/fig1.png)\n";
        assert_eq!(clean_markdown(real, &none()), real);
        assert_eq!(
            clean_markdown("![](https://via.placeholder.com/150)", &none()),
            "\n"
        );
    }

    #[test]
    fn empty_input_is_single_newline() {
        assert_eq!(clean_markdown("   \n\n", &none()), "\n");
    }
}
