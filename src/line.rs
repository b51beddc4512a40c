//! Line-level textual diff.
//!
//! Produces a unified-style diff over raw byte buffers: lines common to
//! both inputs carry a `"  "` prefix, insertions `"+ "`, deletions
//! `"- "`. The alignment comes from a longest-common-subsequence table;
//! on ties the back-trace takes the insertion branch, which fixes the
//! output ordering for replaced blocks.
//!
//! `diff_amount` is the changed-line count over the total line count of
//! both inputs, clamped to `[0, 1]`.

use crate::{TextDiffError, TextDiffResult};

/// Line-level diff engine.
///
/// Stateless; safe to share across threads and reuse for any number of
/// comparisons.
#[derive(Debug, Clone, Default)]
pub struct LineDiff;

impl LineDiff {
    /// Creates the engine.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Compares `baseline` against `target` line by line.
    ///
    /// Inputs split on `0x0A`; an empty input yields no lines, and a
    /// trailing newline yields a trailing empty line. The line engine
    /// itself cannot fail — the `Result` is the shared text-diff
    /// contract with parser-backed engines.
    ///
    /// # Errors
    /// Never returns an error.
    pub fn calculate(
        &self,
        baseline: &[u8],
        target: &[u8],
    ) -> Result<TextDiffResult, TextDiffError> {
        let before = split_lines(baseline);
        let after = split_lines(target);

        let lcs = lcs_table(&before, &after);
        let (diff, added, removed) = trace_diff(&before, &after, &lcs);

        let total_lines = before.len() + after.len();
        let diff_amount = if total_lines > 0 {
            (((added + removed) as f64) / total_lines as f64).min(1.0)
        } else {
            0.0
        };

        Ok(TextDiffResult { diff, diff_amount })
    }
}

fn split_lines(data: &[u8]) -> Vec<&[u8]> {
    if data.is_empty() {
        return Vec::new();
    }
    data.split(|&b| b == b'\n').collect()
}

/// Builds the `(m+1) × (n+1)` longest-common-subsequence length table
/// over byte-equal lines.
fn lcs_table(before: &[&[u8]], after: &[&[u8]]) -> Vec<Vec<usize>> {
    let m = before.len();
    let n = after.len();
    let mut lcs = vec![vec![0_usize; n + 1]; m + 1];

    for i in 1..=m {
        for j in 1..=n {
            lcs[i][j] = if before[i - 1] == after[j - 1] {
                lcs[i - 1][j - 1] + 1
            } else {
                lcs[i - 1][j].max(lcs[i][j - 1])
            };
        }
    }

    lcs
}

/// Back-traces the table from `(m, n)`, emitting prefixed lines in
/// reverse, then reverses and joins them with single newlines.
///
/// The `>=` on the insertion branch decides ties toward additions.
fn trace_diff(before: &[&[u8]], after: &[&[u8]], lcs: &[Vec<usize>]) -> (Vec<u8>, usize, usize) {
    let mut i = before.len();
    let mut j = after.len();
    let mut lines: Vec<Vec<u8>> = Vec::new();
    let mut added = 0_usize;
    let mut removed = 0_usize;

    while i > 0 || j > 0 {
        if i > 0 && j > 0 && before[i - 1] == after[j - 1] {
            lines.push(prefixed(b"  ", before[i - 1]));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || lcs[i][j - 1] >= lcs[i - 1][j]) {
            lines.push(prefixed(b"+ ", after[j - 1]));
            j -= 1;
            added += 1;
        } else {
            lines.push(prefixed(b"- ", before[i - 1]));
            i -= 1;
            removed += 1;
        }
    }

    lines.reverse();

    let total: usize = lines.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total + lines.len().saturating_sub(1));
    for (k, line) in lines.iter().enumerate() {
        if k > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(line);
    }

    (out, added, removed)
}

fn prefixed(prefix: &[u8; 2], line: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(2 + line.len());
    out.extend_from_slice(prefix);
    out.extend_from_slice(line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff_str(baseline: &str, target: &str) -> (String, f64) {
        let result = LineDiff::new()
            .calculate(baseline.as_bytes(), target.as_bytes())
            .expect("line diff cannot fail");
        (
            String::from_utf8(result.diff).expect("utf-8 in, utf-8 out"),
            result.diff_amount,
        )
    }

    #[test]
    fn test_identical_inputs() {
        let (diff, amount) = diff_str("a\nb\nc", "a\nb\nc");
        assert_eq!(diff, "  a\n  b\n  c");
        assert_eq!(amount, 0.0);
    }

    #[test]
    fn test_single_insertion() {
        let (diff, amount) = diff_str("a\nb\nc", "a\nb\nx\nc");
        assert_eq!(diff, "  a\n  b\n+ x\n  c");
        assert!((amount - 1.0 / 7.0).abs() < 1e-12, "amount = {amount}");
    }

    #[test]
    fn test_single_deletion() {
        let (diff, amount) = diff_str("a\nb\nc", "a\nc");
        assert_eq!(diff, "  a\n- b\n  c");
        assert!((amount - 1.0 / 5.0).abs() < 1e-12, "amount = {amount}");
    }

    #[test]
    fn test_full_replacement() {
        let (diff, amount) = diff_str("a\nb", "c\nd");
        // No common line: everything is removed and re-added, with the
        // tie decided toward the addition branch during the back-trace.
        assert_eq!(diff, "- a\n- b\n+ c\n+ d");
        assert_eq!(amount, 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        let (diff, amount) = diff_str("", "");
        assert_eq!(diff, "");
        assert_eq!(amount, 0.0);
    }

    #[test]
    fn test_empty_baseline() {
        let (diff, amount) = diff_str("", "a\nb");
        assert_eq!(diff, "+ a\n+ b");
        assert_eq!(amount, 1.0);
    }

    #[test]
    fn test_empty_target() {
        let (diff, amount) = diff_str("a\nb", "");
        assert_eq!(diff, "- a\n- b");
        assert_eq!(amount, 1.0);
    }

    #[test]
    fn test_trailing_newline_is_a_line() {
        // "a\n" splits into ["a", ""], so the missing trailing newline
        // shows up as a removed empty line.
        let (diff, amount) = diff_str("a\n", "a");
        assert_eq!(diff, "  a\n- ");
        assert!((amount - 1.0 / 3.0).abs() < 1e-12, "amount = {amount}");
    }

    #[test]
    fn test_split_lines_semantics() {
        assert!(split_lines(b"").is_empty());
        assert_eq!(split_lines(b"a"), vec![b"a" as &[u8]]);
        assert_eq!(split_lines(b"a\n"), vec![b"a" as &[u8], b"" as &[u8]]);
        assert_eq!(split_lines(b"\n"), vec![b"" as &[u8], b"" as &[u8]]);
    }

    #[test]
    fn test_non_utf8_bytes_pass_through() {
        let baseline = [0xff, 0xfe, b'\n', b'a'];
        let target = [0xff, 0xfe, b'\n', b'b'];
        let result = LineDiff::new()
            .calculate(&baseline, &target)
            .expect("line diff cannot fail");
        assert_eq!(&result.diff[..4], &[b' ', b' ', 0xff, 0xfe]);
        assert!((result.diff_amount - 0.5).abs() < 1e-12);
    }
}
