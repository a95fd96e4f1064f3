use std::fmt::Display;
use std::fmt::Formatter;

use itertools::Itertools;

/// A finite set of integers stored as sorted, disjoint and non-adjacent closed intervals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct IntervalDomain {
    intervals: Vec<(i64, i64)>,
}

impl IntervalDomain {
    /// The interval `[lower_bound, upper_bound]`; empty if `lower_bound > upper_bound`.
    pub fn new(lower_bound: i64, upper_bound: i64) -> IntervalDomain {
        if lower_bound > upper_bound {
            IntervalDomain::empty()
        } else {
            IntervalDomain {
                intervals: vec![(lower_bound, upper_bound)],
            }
        }
    }

    pub fn empty() -> IntervalDomain {
        IntervalDomain {
            intervals: Vec::new(),
        }
    }

    pub fn singleton(value: i64) -> IntervalDomain {
        IntervalDomain::new(value, value)
    }

    pub fn from_values(values: impl IntoIterator<Item = i64>) -> IntervalDomain {
        let mut intervals: Vec<(i64, i64)> = Vec::new();
        for value in values.into_iter().sorted_unstable().dedup() {
            match intervals.last_mut() {
                Some((_, upper)) if *upper + 1 == value => *upper = value,
                _ => intervals.push((value, value)),
            }
        }
        IntervalDomain { intervals }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// The smallest value; the domain must not be empty.
    pub fn lower_bound(&self) -> i64 {
        self.intervals[0].0
    }

    /// The largest value; the domain must not be empty.
    pub fn upper_bound(&self) -> i64 {
        self.intervals[self.intervals.len() - 1].1
    }

    pub fn is_fixed(&self) -> bool {
        self.intervals.len() == 1 && self.intervals[0].0 == self.intervals[0].1
    }

    /// The number of values, saturating at `u64::MAX`.
    pub fn size(&self) -> u64 {
        self.intervals.iter().fold(0u64, |size, &(lower, upper)| {
            size.saturating_add(upper.abs_diff(lower)).saturating_add(1)
        })
    }

    pub fn contains(&self, value: i64) -> bool {
        let index = self.intervals.partition_point(|&(_, upper)| upper < value);
        index < self.intervals.len() && self.intervals[index].0 <= value
    }

    pub fn intervals(&self) -> &[(i64, i64)] {
        &self.intervals
    }

    pub fn values(&self) -> impl Iterator<Item = i64> + '_ {
        self.intervals
            .iter()
            .flat_map(|&(lower, upper)| lower..=upper)
    }

    pub fn intersect(&self, other: &IntervalDomain) -> IntervalDomain {
        let mut intervals = Vec::new();
        let mut left = self.intervals.iter().peekable();
        let mut right = other.intervals.iter().peekable();

        while let (Some(&&(a_lower, a_upper)), Some(&&(b_lower, b_upper))) =
            (left.peek(), right.peek())
        {
            let lower = a_lower.max(b_lower);
            let upper = a_upper.min(b_upper);
            if lower <= upper {
                intervals.push((lower, upper));
            }

            if a_upper < b_upper {
                let _ = left.next();
            } else {
                let _ = right.next();
            }
        }

        IntervalDomain { intervals }
    }

    /// All values of `self` which are not in `other`.
    pub fn subtract(&self, other: &IntervalDomain) -> IntervalDomain {
        let mut intervals = Vec::new();
        let mut removed = other.intervals.iter().peekable();

        for &(lower, upper) in &self.intervals {
            let mut start = lower;
            while let Some(&&(removed_lower, removed_upper)) = removed.peek() {
                if removed_upper < start {
                    let _ = removed.next();
                    continue;
                }
                if removed_lower > upper {
                    break;
                }
                if removed_lower > start {
                    intervals.push((start, removed_lower - 1));
                }
                if removed_upper >= upper {
                    start = upper + 1;
                    break;
                }
                start = removed_upper + 1;
                let _ = removed.next();
            }
            if start <= upper {
                intervals.push((start, upper));
            }
        }

        IntervalDomain { intervals }
    }

    /// The set `{-v | v ∈ self}`.
    pub fn negated(&self) -> IntervalDomain {
        IntervalDomain {
            intervals: self
                .intervals
                .iter()
                .rev()
                .map(|&(lower, upper)| (-upper, -lower))
                .collect(),
        }
    }

    /// The set `{v + offset | v ∈ self}`.
    pub fn shifted(&self, offset: i64) -> IntervalDomain {
        IntervalDomain {
            intervals: self
                .intervals
                .iter()
                .map(|&(lower, upper)| (lower + offset, upper + offset))
                .collect(),
        }
    }
}

impl Display for IntervalDomain {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let intervals = self.intervals.iter().format_with(", ", |&(lower, upper), f| {
            if lower == upper {
                f(&lower)
            } else {
                f(&format_args!("{lower}..{upper}"))
            }
        });
        write!(f, "{{{intervals}}}")
    }
}
