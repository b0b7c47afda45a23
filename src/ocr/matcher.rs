//! Fuzzy matching of OCR text against a known vocabulary.
//!
//! Similarity is the Ratcliff/Obershelp "gestalt" ratio computed over the
//! UTF-8 bytes of both strings, so multi-byte titles are compared byte by
//! byte rather than character by character.

use std::collections::HashMap;

/// Second sequences at least this long drop their "popular" bytes from
/// the match index.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Longest-common-block matcher over two byte sequences.
struct SequenceMatcher<'a> {
    a: &'a [u8],
    b: &'a [u8],
    /// Positions of every indexed byte of `b`, ascending.
    b2j: HashMap<u8, Vec<usize>>,
}

impl<'a> SequenceMatcher<'a> {
    fn new(a: &'a [u8], b: &'a [u8]) -> Self {
        let mut b2j: HashMap<u8, Vec<usize>> = HashMap::new();
        for (j, &byte) in b.iter().enumerate() {
            b2j.entry(byte).or_default().push(j);
        }

        let n = b.len();
        if n >= AUTOJUNK_MIN_LEN {
            let ntest = n / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= ntest);
        }

        Self { a, b, b2j }
    }

    /// Finds the longest block `a[i..i+k] == b[j..j+k]` inside the given
    /// ranges. Among equally long blocks the one starting earliest in `a`,
    /// then earliest in `b`, wins.
    fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> (usize, usize, usize) {
        let (mut besti, mut bestj, mut bestsize) = (alo, blo, 0);
        let mut j2len: HashMap<usize, usize> = HashMap::new();

        for i in alo..ahi {
            let mut new_j2len: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev).copied())
                        .unwrap_or(0)
                        + 1;
                    new_j2len.insert(j, k);
                    if k > bestsize {
                        besti = i + 1 - k;
                        bestj = j + 1 - k;
                        bestsize = k;
                    }
                }
            }
            j2len = new_j2len;
        }

        // Popular bytes were left out of the index; grow the block over them.
        while besti > alo && bestj > blo && self.a[besti - 1] == self.b[bestj - 1] {
            besti -= 1;
            bestj -= 1;
            bestsize += 1;
        }
        while besti + bestsize < ahi
            && bestj + bestsize < bhi
            && self.a[besti + bestsize] == self.b[bestj + bestsize]
        {
            bestsize += 1;
        }

        (besti, bestj, bestsize)
    }

    /// Total length of all matching blocks.
    fn matched_len(&self) -> usize {
        let mut total = 0;
        let mut queue = vec![(0, self.a.len(), 0, self.b.len())];

        while let Some((alo, ahi, blo, bhi)) = queue.pop() {
            let (i, j, k) = self.find_longest_match(alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            total += k;
            if alo < i && blo < j {
                queue.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                queue.push((i + k, ahi, j + k, bhi));
            }
        }

        total
    }

    fn ratio(&self) -> f64 {
        let len = self.a.len() + self.b.len();
        if len == 0 {
            return 1.0;
        }
        2.0 * self.matched_len() as f64 / len as f64
    }
}

/// Similarity of `candidate` (first sequence) and `target` (second
/// sequence) in `[0, 1]`; `1.0` means identical bytes.
pub fn ratio(candidate: &str, target: &str) -> f64 {
    SequenceMatcher::new(candidate.as_bytes(), target.as_bytes()).ratio()
}

/// Returns the vocabulary entry most similar to `target`.
///
/// Entries are scanned in order and a candidate is taken only on a strict
/// improvement over the best ratio so far. When `min_similarity` is given,
/// an improving candidate below it is skipped at that moment and the best
/// ratio is left unchanged.
pub fn best_match<'v, S: AsRef<str>>(
    target: &str,
    vocabulary: &'v [S],
    min_similarity: Option<f64>,
) -> Option<&'v str> {
    let mut best_ratio = -1.0;
    let mut best: Option<&'v str> = None;

    for entry in vocabulary {
        let entry = entry.as_ref();
        let similarity = ratio(entry, target);
        if best_ratio < similarity {
            if let Some(min) = min_similarity
                && min > similarity
            {
                continue;
            }
            best_ratio = similarity;
            best = Some(entry);
        }
    }

    best
}
