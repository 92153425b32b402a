//! Click-to-sort ordering for stats tables.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(&self) -> SortDirection {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Active sort of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub direction: SortDirection,
}

impl SortKey {
    /// Next key after a header click: same column flips, another column starts ascending.
    pub fn after_click(current: Option<SortKey>, column: usize) -> SortKey {
        match current {
            Some(key) if key.column == column => SortKey {
                column,
                direction: key.direction.toggled(),
            },
            _ => SortKey {
                column,
                direction: SortDirection::Ascending,
            },
        }
    }
}

fn numeric(cell: &str) -> Option<f64> {
    let cleaned: String = cell
        .trim()
        .trim_end_matches('%')
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numbers compare numerically and sort before text; text compares case-insensitively.
pub fn compare_cells(a: &str, b: &str) -> Ordering {
    match (numeric(a), numeric(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.trim().to_lowercase().cmp(&b.trim().to_lowercase()),
    }
}

/// Stable permutation ordering `cells`. Sorting already-sorted input yields the identity.
pub fn sorted_order<S: AsRef<str>>(cells: &[S], direction: SortDirection) -> Vec<usize> {
    let mut order: Vec<usize> = (0..cells.len()).collect();
    order.sort_by(|&i, &j| {
        let ord = compare_cells(cells[i].as_ref(), cells[j].as_ref());
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    order
}
