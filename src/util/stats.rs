use std::fmt::Display;

/// Count, range and total of a set of integer samples.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub count: usize,
    pub min: usize,
    pub max: usize,
    pub total: usize,
}

impl Stats {
    pub fn mean(&self) -> f32 {
        if self.count == 0 {
            0.0
        } else {
            self.total as f32 / self.count as f32
        }
    }
}

impl FromIterator<usize> for Stats {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        iter.into_iter().fold(Stats::default(), |stats, value| Stats {
            count: stats.count + 1,
            min: if stats.count == 0 {
                value
            } else {
                stats.min.min(value)
            },
            max: stats.max.max(value),
            total: stats.total + value,
        })
    }
}

impl Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "empty");
        }
        write!(f, "{}..={} (mean {:.1})", self.min, self.max, self.mean())
    }
}
