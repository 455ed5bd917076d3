use ndarray::{ArrayView2, Axis};

pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f64]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }

    /// Smallest and largest finite values, or `None` when there are none.
    pub fn finite_range<'a, I>(values: I) -> Option<(f64, f64)>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        values
            .into_iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Global field power: spatial standard deviation across channels at each sample.
    pub fn global_field_power(data: ArrayView2<'_, f64>) -> Vec<f64> {
        if data.nrows() == 0 {
            return vec![0.0; data.ncols()];
        }
        data.axis_iter(Axis(1))
            .map(|column| column.std(0.0))
            .collect()
    }

    /// Sample index and value of the largest element.
    pub fn argmax(values: &[f64]) -> Option<(usize, f64)> {
        values
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .fold(None, |best, (idx, v)| match best {
                Some((_, top)) if top >= v => best,
                _ => Some((idx, v)),
            })
    }
}
