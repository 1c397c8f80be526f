//! Fuzzy title matching compatible with Python's `difflib`.
//!
//! `CloseMatcher::best_match(query, titles)` returns the same title as
//! `difflib.get_close_matches(query, titles, n=1, cutoff)`:
//! - similarity is the Ratcliff/Obershelp ratio `2 * M / (len(a) + len(b))`
//!   over Unicode scalar values, with the candidate title as `a`
//! - `M` sums the matching blocks found by repeated longest common
//!   substring, earliest position winning ties
//! - for queries of 200+ characters, characters occurring more than
//!   `1 + len / 100` times are not used to seed matches
//! - equal ratios are broken by the lexicographically greater title

use crate::error::{LookupError, Result};
use crate::traits::TitleMatcher;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_CUTOFF: f64 = 0.6;

/// Queries at least this long drop their most frequent characters from the
/// match index
const AUTOJUNK_MIN_LEN: usize = 200;

/// Similarity of `a` and `b` in `[0, 1]`; two empty strings score 1.0
pub fn ratio(a: &str, b: &str) -> f64 {
    let profile = QueryProfile::new(b);
    let a: Vec<char> = a.chars().collect();
    profile.ratio(&a)
}

/// The query side of a comparison, indexed once and reused for every
/// candidate title.
struct QueryProfile {
    chars: Vec<char>,
    /// char -> ascending positions in `chars`, minus popular chars
    positions: HashMap<char, Vec<usize>>,
    counts: HashMap<char, usize>,
}

impl QueryProfile {
    fn new(query: &str) -> Self {
        let chars: Vec<char> = query.chars().collect();

        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in chars.iter().enumerate() {
            positions.entry(c).or_default().push(j);
        }
        let counts = positions.iter().map(|(&c, js)| (c, js.len())).collect();

        if chars.len() >= AUTOJUNK_MIN_LEN {
            let limit = chars.len() / 100 + 1;
            positions.retain(|_, js| js.len() <= limit);
        }

        Self {
            chars,
            positions,
            counts,
        }
    }

    fn ratio_of(&self, matches: usize, a_len: usize) -> f64 {
        let total = a_len + self.chars.len();
        if total == 0 {
            1.0
        } else {
            2.0 * matches as f64 / total as f64
        }
    }

    /// Upper bound from lengths alone
    fn real_quick_ratio(&self, a: &[char]) -> f64 {
        self.ratio_of(a.len().min(self.chars.len()), a.len())
    }

    /// Upper bound from character multisets
    fn quick_ratio(&self, a: &[char]) -> f64 {
        let mut available: HashMap<char, isize> = HashMap::new();
        let mut matches = 0;
        for c in a {
            let left = available
                .entry(*c)
                .or_insert_with(|| self.counts.get(c).copied().unwrap_or(0) as isize);
            if *left > 0 {
                matches += 1;
            }
            *left -= 1;
        }
        self.ratio_of(matches, a.len())
    }

    fn ratio(&self, a: &[char]) -> f64 {
        self.ratio_of(self.matching_characters(a), a.len())
    }

    /// Longest common run of `a[alo..ahi]` and `query[blo..bhi]` as
    /// `(i, j, len)`. Ties go to the smallest `i`, then the smallest `j`.
    fn longest_match(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let b = &self.chars;
        let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);

        // run length of matches ending at (i - 1, j)
        let mut run_ends: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next_run_ends = HashMap::new();
            if let Some(js) = self.positions.get(&a[i]) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let run = j
                        .checked_sub(1)
                        .and_then(|prev| run_ends.get(&prev))
                        .copied()
                        .unwrap_or(0)
                        + 1;
                    next_run_ends.insert(j, run);
                    if run > best_len {
                        best_i = i + 1 - run;
                        best_j = j + 1 - run;
                        best_len = run;
                    }
                }
            }
            run_ends = next_run_ends;
        }

        // popular chars never seed a match but may still extend one
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_len += 1;
        }
        while best_i + best_len < ahi
            && best_j + best_len < bhi
            && a[best_i + best_len] == b[best_j + best_len]
        {
            best_len += 1;
        }

        (best_i, best_j, best_len)
    }

    /// Total size of all matching blocks
    fn matching_characters(&self, a: &[char]) -> usize {
        let mut total = 0;
        let mut pending = vec![(0, a.len(), 0, self.chars.len())];
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, len) = self.longest_match(a, alo, ahi, blo, bhi);
            if len == 0 {
                continue;
            }
            total += len;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + len < ahi && j + len < bhi {
                pending.push((i + len, ahi, j + len, bhi));
            }
        }
        total
    }

    /// Ratio of `title` against the query, if it reaches `cutoff`
    fn score(&self, title: &str, cutoff: f64) -> Option<f64> {
        let a: Vec<char> = title.chars().collect();
        if self.real_quick_ratio(&a) < cutoff || self.quick_ratio(&a) < cutoff {
            return None;
        }
        let r = self.ratio(&a);
        (r >= cutoff).then_some(r)
    }
}

/// Best single close match above a similarity cutoff
#[derive(Debug, Clone, Copy)]
pub struct CloseMatcher {
    cutoff: f64,
}

impl CloseMatcher {
    pub fn new(cutoff: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(LookupError::InvalidCutoff(cutoff));
        }
        Ok(Self { cutoff })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Every title reaching the cutoff with its ratio, best first
    pub fn close_matches<'a>(&self, query: &str, titles: &'a [String]) -> Vec<(f64, &'a str)> {
        let profile = QueryProfile::new(query);
        let mut scored: Vec<(f64, &str)> = titles
            .par_iter()
            .filter_map(|t| profile.score(t, self.cutoff).map(|s| (s, t.as_str())))
            .collect();
        scored.sort_by(|a, b| by_score_then_title(b, a));
        scored
    }
}

impl Default for CloseMatcher {
    fn default() -> Self {
        Self {
            cutoff: DEFAULT_CUTOFF,
        }
    }
}

fn by_score_then_title(a: &(f64, &str), b: &(f64, &str)) -> Ordering {
    a.0.total_cmp(&b.0).then_with(|| a.1.cmp(b.1))
}

impl TitleMatcher for CloseMatcher {
    fn name(&self) -> &str {
        "difflib-close-match"
    }

    fn best_match<'a>(&self, query: &str, titles: &'a [String]) -> Option<&'a str> {
        let profile = QueryProfile::new(query);
        let best = titles
            .par_iter()
            .filter_map(|t| profile.score(t, self.cutoff).map(|s| (s, t.as_str())))
            .max_by(by_score_then_title);

        match best {
            Some((score, title)) => {
                debug!("Matched {:?} to {:?} (ratio {:.3})", query, title, score);
                Some(title)
            }
            None => {
                debug!("No title within cutoff {} for {:?}", self.cutoff, query);
                None
            }
        }
    }
}
