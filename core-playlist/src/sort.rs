//! Multi-key stable sort over playlist items
//!
//! Rules are evaluated by ascending precedence; the first rule that tells two
//! items apart decides. Items that tie on every rule keep their input order.
//!
//! Absent values (unknown duration, missing or empty dates) always sort after
//! present ones, in both directions. Direction only flips the comparison of
//! two present values.

use crate::models::{Item, SortDirection, SortField, SortRule, SortSpec};
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Return `items` ordered by `rules`.
pub fn stable_multi_sort(items: &[Item], rules: &[SortRule]) -> Vec<Item> {
    let ordered_rules = SortSpec::new(rules.to_vec()).ordered();

    let mut indexed: Vec<(usize, &Item)> = items.iter().enumerate().collect();

    // Input position is the final key, so an unstable sort is safe here
    indexed.sort_unstable_by(|(ia, a), (ib, b)| {
        ordered_rules
            .iter()
            .map(|rule| compare_by_rule(a, b, rule))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| ia.cmp(ib))
    });

    indexed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Compare two items on a single rule
pub fn compare_by_rule(a: &Item, b: &Item, rule: &SortRule) -> Ordering {
    match rule.field {
        SortField::Channel => directed(compare_text(&a.channel, &b.channel), rule.direction),
        SortField::Title => directed(compare_text(&a.title, &b.title), rule.direction),
        SortField::Duration => compare_unknown_last(a.duration, b.duration, rule.direction),
        SortField::DateAdded => compare_unknown_last(
            present(&a.date_added),
            present(&b.date_added),
            rule.direction,
        ),
        SortField::DateUploaded => compare_unknown_last(
            a.date_uploaded.as_deref().and_then(present),
            b.date_uploaded.as_deref().and_then(present),
            rule.direction,
        ),
    }
}

fn directed(ord: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ord,
        SortDirection::Desc => ord.reverse(),
    }
}

fn present(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

fn compare_unknown_last<T: Ord>(a: Option<T>, b: Option<T>, direction: SortDirection) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => directed(a.cmp(&b), direction),
    }
}

/// Case- and accent-insensitive comparison with digit runs compared by value
/// ("item2" < "item10", "Élan" == "elan").
pub fn compare_text(a: &str, b: &str) -> Ordering {
    let a = fold(a);
    let b = fold(b);
    compare_natural(&a, &b)
}

fn fold(s: &str) -> Vec<char> {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

fn compare_natural(a: &[char], b: &[char]) -> Ordering {
    let (mut i, mut j) = (0, 0);

    while i < a.len() && j < b.len() {
        if a[i].is_ascii_digit() && b[j].is_ascii_digit() {
            let end_a = digit_run_end(a, i);
            let end_b = digit_run_end(b, j);

            let ord = compare_digit_runs(&a[i..end_a], &b[j..end_b]);
            if ord.is_ne() {
                return ord;
            }
            i = end_a;
            j = end_b;
            continue;
        }

        let ord = a[i].cmp(&b[j]);
        if ord.is_ne() {
            return ord;
        }
        i += 1;
        j += 1;
    }

    (a.len() - i).cmp(&(b.len() - j))
}

fn digit_run_end(s: &[char], start: usize) -> usize {
    s[start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map_or(s.len(), |offset| start + offset)
}

fn compare_digit_runs(a: &[char], b: &[char]) -> Ordering {
    let trim = |run: &[char]| -> Vec<char> {
        let first = run.iter().position(|c| *c != '0').unwrap_or(run.len());
        run[first..].to_vec()
    };
    let (a, b) = (trim(a), trim(b));

    a.len().cmp(&b.len()).then_with(|| a.cmp(&b))
}
