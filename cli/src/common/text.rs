//! # DevDash Text Helpers (`common::text`)
//!
//! File: cli/src/common/text.rs
//!
//! ## Overview
//!
//! String comparisons used for sorting and filtering in listings:
//!
//! - `natural_cmp`: case-insensitive "natural" order, where runs of digits
//!   compare by numeric value (`file2` < `file10`).
//! - `icontains`: case-insensitive substring test; an empty needle matches.
//!
use std::cmp::Ordering;
use std::iter::Peekable;
use std::str::Chars;

/// Case-insensitive natural ordering.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();
    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ord = cmp_digit_runs(&mut left, &mut right);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                left.next();
                right.next();
            }
        }
    }
}

/// Consumes one digit run from each side and compares them numerically.
fn cmp_digit_runs(left: &mut Peekable<Chars<'_>>, right: &mut Peekable<Chars<'_>>) -> Ordering {
    let l = take_digits(left);
    let r = take_digits(right);
    let l_trim = l.trim_start_matches('0');
    let r_trim = r.trim_start_matches('0');
    l_trim
        .len()
        .cmp(&r_trim.len())
        .then_with(|| l_trim.cmp(r_trim))
        .then_with(|| l.len().cmp(&r.len()))
}

fn take_digits(it: &mut Peekable<Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(c) = it.peek().copied().filter(char::is_ascii_digit) {
        run.push(c);
        it.next();
    }
    run
}

/// Case-insensitive substring test.
pub fn icontains(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_natural_cmp_numbers() {
        let mut names = vec!["file10.txt", "file2.txt", "File1.txt", "file02.txt"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["File1.txt", "file2.txt", "file02.txt", "file10.txt"]);
    }

    #[test]
    fn test_natural_cmp_case_insensitive() {
        assert_eq!(natural_cmp("Beta", "alpha"), Ordering::Greater);
        assert!(natural_cmp("a/b.txt", "a/B.txt").is_ne());
        assert_eq!(natural_cmp("abc", "abcd"), Ordering::Less);
    }

    #[test]
    fn test_icontains() {
        assert!(icontains("Symfony/Laravel (public)", "laravel"));
        assert!(icontains("anything", ""));
        assert!(!icontains("Node", "php"));
    }
}
