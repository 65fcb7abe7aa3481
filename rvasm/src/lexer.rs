//! Strips comments and blank lines, and splits an optional leading
//! `label:` off the front of each remaining line.

/// One non-blank, comment-stripped source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub line_no: usize,
    pub label: Option<String>,
    /// The mnemonic/directive and its operands, if anything followed the
    /// label (or if there was no label at all).
    pub rest: Option<String>,
}

pub fn clean_and_split(source: &str) -> Vec<RawLine> {
    let mut out = Vec::new();
    for (index, raw_line) in source.lines().enumerate() {
        let line_no = index + 1;
        let cleaned = raw_line.split('#').next().unwrap_or("").trim();
        if cleaned.is_empty() {
            continue;
        }

        let mut tokens = cleaned.split_whitespace();
        let first = tokens.next().expect("cleaned line is non-empty");

        if let Some(label) = first.strip_suffix(':') {
            let rest: String = tokens.collect::<Vec<_>>().join(" ");
            out.push(RawLine {
                line_no,
                label: Some(label.to_string()),
                rest: if rest.is_empty() { None } else { Some(rest) },
            });
        } else {
            out.push(RawLine {
                line_no,
                label: None,
                rest: Some(cleaned.to_string()),
            });
        }
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn strips_comments_and_blank_lines() {
        let lines = clean_and_split("addi x1, x0, 1 # comment\n\n   \n# full comment line\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].rest.as_deref(), Some("addi x1, x0, 1"));
    }

    #[test]
    fn splits_label_from_trailing_instruction() {
        let lines = clean_and_split("loop: addi x1, x1, 1");
        assert_eq!(lines[0].label.as_deref(), Some("loop"));
        assert_eq!(lines[0].rest.as_deref(), Some("addi x1, x1, 1"));
    }

    #[test]
    fn label_alone_on_a_line_has_no_rest() {
        let lines = clean_and_split("loop:\naddi x1, x1, 1");
        assert_eq!(lines[0].label.as_deref(), Some("loop"));
        assert_eq!(lines[0].rest, None);
        assert_eq!(lines[1].label, None);
    }
}
