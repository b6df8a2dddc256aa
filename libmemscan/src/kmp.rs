//! Knuth-Morris-Pratt substring search, used by the Equal/NotEqual predicates
//! over `Text`/`Bytes` values and raw byte-pattern scans. O(N+M) regardless
//! of pattern repetition, unlike the naive O(N*M) scan.

/// Build the KMP failure function (longest proper prefix that is also a
/// suffix) for `pattern`.
fn build_failure_table(pattern: &[u8]) -> Vec<usize> {
    let mut table = vec![0usize; pattern.len()];
    let mut k = 0usize;
    for i in 1..pattern.len() {
        while k > 0 && pattern[k] != pattern[i] {
            k = table[k - 1];
        }
        if pattern[k] == pattern[i] {
            k += 1;
        }
        table[i] = k;
    }
    table
}

/// Find every non-overlapping-start occurrence of `pattern` in `haystack`
/// (standard KMP allows overlapping matches; offsets returned are every
/// start position where a full match occurs).
pub fn search_all(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return out;
    }
    let table = build_failure_table(pattern);
    let mut k = 0usize;
    for (i, &b) in haystack.iter().enumerate() {
        while k > 0 && pattern[k] != b {
            k = table[k - 1];
        }
        if pattern[k] == b {
            k += 1;
        }
        if k == pattern.len() {
            out.push(i + 1 - k);
            k = table[k - 1];
        }
    }
    out
}

/// Find the first occurrence of `pattern` in `haystack`, if any.
pub fn search_first(haystack: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return None;
    }
    let table = build_failure_table(pattern);
    let mut k = 0usize;
    for (i, &b) in haystack.iter().enumerate() {
        while k > 0 && pattern[k] != b {
            k = table[k - 1];
        }
        if pattern[k] == b {
            k += 1;
        }
        if k == pattern.len() {
            return Some(i + 1 - k);
        }
    }
    None
}

/// For `NotEqual`: every offset in `0..=haystack.len() - pattern.len()` that
/// is NOT the start of a match. Matches are found via `search_all`, then the
/// gaps between (and around) them are emitted.
pub fn search_all_gaps(haystack: &[u8], pattern: &[u8]) -> Vec<usize> {
    let mut out = Vec::new();
    if pattern.is_empty() || pattern.len() > haystack.len() {
        return out;
    }
    let last_start = haystack.len() - pattern.len();
    let matches = search_all(haystack, pattern);
    let mut last = 0usize;
    for m in matches {
        for off in last..m {
            out.push(off);
        }
        last = m + 1;
    }
    for off in last..=last_start {
        out.push(off);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_single_match() {
        assert_eq!(search_first(b"hello world", b"world"), Some(6));
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(search_first(b"hello world", b"rust"), None);
    }

    #[test]
    fn finds_all_overlapping_matches() {
        // "aaaa" contains "aa" at offsets 0,1,2
        assert_eq!(search_all(b"aaaa", b"aa"), vec![0, 1, 2]);
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        assert_eq!(search_all(b"hello", b""), Vec::<usize>::new());
        assert_eq!(search_first(b"hello", b""), None);
    }

    #[test]
    fn gap_emission_excludes_match_starts() {
        let haystack = b"aaaa";
        let pattern = b"aa";
        let gaps = search_all_gaps(haystack, pattern);
        let matches = search_all(haystack, pattern);
        for g in &gaps {
            assert!(!matches.contains(g));
        }
        // valid offsets are 0..=2 (haystack.len() - pattern.len())
        assert!(gaps.iter().all(|&g| g <= 2));
    }

    #[test]
    fn gap_emission_on_no_match_covers_every_offset() {
        let haystack = b"abcdef";
        let pattern = b"zz";
        let gaps = search_all_gaps(haystack, pattern);
        assert_eq!(gaps, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn binary_pattern_search() {
        let haystack = b"\x4D\x5A\x90\x00\x03\x00\x00\x00";
        let pattern = b"\x4D\x5A\x90\x00";
        assert_eq!(search_first(haystack, pattern), Some(0));
    }
}
