//! Fuzzy text similarity for OCR output.

/// Lower-case, turn punctuation into spaces and collapse runs of whitespace.
///
/// OCR drops apostrophes and splits or merges spans unpredictably, so only
/// letters, digits and single spaces survive.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ratcliff/Obershelp similarity in `0..=1`: twice the number of characters in
/// recursively found longest common blocks over the combined length.
///
/// Two empty strings are identical (1.0).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

/// `ratio` of the normalized forms.
pub fn similarity(expected: &str, detected: &str) -> f64 {
    ratio(&normalize(expected), &normalize(detected))
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut stack = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = stack.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        stack.push((alo, i, blo, j));
        stack.push((i + k, ahi, j + k, bhi));
    }
    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`; earliest in `a`
/// wins ties, then earliest in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // run[j] = length of the common suffix ending at a[i-1], b[j-1].
    let mut run = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut next = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = run[j - blo] + 1;
                next[j - blo + 1] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        run = next;
    }
    (best_i, best_j, best_k)
}

#[cfg(test)]
#[path = "../../tests/unit/validate/similarity.rs"]
mod tests;
