//! Sequence diffing over arbitrary items
//!
//! A classic longest-common-subsequence edit script, parameterized by the
//! equality predicate. The same differ runs with approximate equality over
//! sentences and with exact equality over editor tokens.
//!
//! ## Algorithm
//!
//! 1. **Table**: `dp[i][j]` is the LCS length of `source[..i]` and `target[..j]`
//! 2. **Backtrack** from `dp[n][m]`: a match moves diagonally (Equal);
//!    otherwise Insert is taken whenever `dp[i][j-1] >= dp[i-1][j]`, else
//!    Delete. Preferring Insert on ties picks one specific optimal script;
//!    rendering depends on that choice.
//! 3. **Compact** adjacent same-tag ops with contiguous ranges into runs
//! 4. **Fuse** each Delete run directly followed by an Insert run into Replace
//!
//! ## Complexity
//!
//! O(n x m) time and space. Inputs are sentences of one paragraph or tokens of
//! one editing session, so this is a known scaling limit rather than a defect;
//! very large paragraphs would need a linear-space variant.

use crate::types::{DiffTag, EditOp};

/// Compute a compacted edit script with Replace runs
pub fn diff<S, T, F>(source: &[S], target: &[T], eq: F) -> Vec<EditOp>
where
    F: Fn(&S, &T) -> bool,
{
    fuse_replacements(compact(edit_steps(source, target, eq)))
}

/// Single-item edit steps in left-to-right order (no compaction)
pub fn edit_steps<S, T, F>(source: &[S], target: &[T], eq: F) -> Vec<EditOp>
where
    F: Fn(&S, &T) -> bool,
{
    let n = source.len();
    let m = target.len();
    let width = m + 1;

    // Flattened (n+1) x (m+1) tables; the predicate may be expensive, so each
    // pair is evaluated exactly once
    let mut matches = vec![false; n * m];
    let mut dp = vec![0usize; (n + 1) * width];

    for i in 1..=n {
        for j in 1..=m {
            let is_match = eq(&source[i - 1], &target[j - 1]);
            matches[(i - 1) * m + (j - 1)] = is_match;
            dp[i * width + j] = if is_match {
                dp[(i - 1) * width + (j - 1)] + 1
            } else {
                dp[(i - 1) * width + j].max(dp[i * width + (j - 1)])
            };
        }
    }

    let mut steps = Vec::with_capacity(n + m);
    let (mut i, mut j) = (n, m);
    while i > 0 || j > 0 {
        if i > 0 && j > 0 && matches[(i - 1) * m + (j - 1)] {
            steps.push(EditOp::new(DiffTag::Equal, i - 1..i, j - 1..j));
            i -= 1;
            j -= 1;
        } else if j > 0 && (i == 0 || dp[i * width + (j - 1)] >= dp[(i - 1) * width + j]) {
            steps.push(EditOp::new(DiffTag::Insert, i..i, j - 1..j));
            j -= 1;
        } else {
            steps.push(EditOp::new(DiffTag::Delete, i - 1..i, j..j));
            i -= 1;
        }
    }

    steps.reverse();
    steps
}

/// Merge adjacent ops that share a tag and have contiguous ranges
pub fn compact(ops: Vec<EditOp>) -> Vec<EditOp> {
    ops.into_iter().fold(Vec::new(), |mut runs: Vec<EditOp>, op| {
        match runs.last_mut() {
            Some(run)
                if run.tag == op.tag
                    && run.source.end == op.source.start
                    && run.target.end == op.target.start =>
            {
                run.source.end = op.source.end;
                run.target.end = op.target.end;
            }
            _ => runs.push(op),
        }
        runs
    })
}

/// Turn every Delete run immediately followed by an Insert run into Replace
pub fn fuse_replacements(ops: Vec<EditOp>) -> Vec<EditOp> {
    ops.into_iter().fold(Vec::new(), |mut fused: Vec<EditOp>, op| {
        match fused.last_mut() {
            Some(prev) if prev.tag == DiffTag::Delete && op.tag == DiffTag::Insert => {
                prev.tag = DiffTag::Replace;
                prev.target = op.target;
            }
            _ => fused.push(op),
        }
        fused
    })
}
