use std::{
    collections::BTreeMap,
    io,
    marker::PhantomData,
    ops::AddAssign,
    sync::{Arc, Mutex, PoisonError},
};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    para::{para_run, para_run_with, Worker},
    Year, YearSeries,
};

const CHUNK: usize = 0x400;

/// When to hand per-year work to the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParaSettings {
    pub threshold: usize,
    pub threads: Option<usize>,
}

impl Default for ParaSettings {
    fn default() -> Self {
        Self {
            threshold: 50_000,
            threads: None,
        }
    }
}

impl ParaSettings {
    pub fn sequential() -> Self {
        Self {
            threshold: usize::MAX,
            threads: None,
        }
    }

    fn run<W, T, I>(&self, in_v: I, worker: W) -> io::Result<W>
    where
        W: Worker<T>,
        I: Iterator<Item = T>,
        T: Send,
    {
        let worker = Arc::new(worker);
        match self.threads {
            Some(n) => para_run_with(in_v, worker.clone(), n)?,
            None => para_run(in_v, worker.clone())?,
        }
        //pool is joined, the clone handed to it is gone
        Arc::try_unwrap(worker)
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "worker still shared"))
    }
}

pub fn count_per_year<I>(years: I) -> YearSeries<u32>
where
    I: IntoIterator<Item = Year>,
{
    let mut counts: HashMap<Year, u32> = HashMap::new();
    for y in years {
        counts.entry(y).or_insert(0).add_assign(1);
    }
    counts.into_iter().collect()
}

struct YearTally {
    counts: Mutex<HashMap<Year, u32>>,
}

impl Worker<Vec<Year>> for YearTally {
    fn proc(&self, input: Vec<Year>) {
        let mut local: HashMap<Year, u32> = HashMap::new();
        for y in input {
            local.entry(y).or_insert(0).add_assign(1);
        }
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        for (y, c) in local {
            counts.entry(y).or_insert(0).add_assign(c);
        }
    }
}

/// Counts occurrences per year, on the worker pool above `settings.threshold` items.
///
/// Chunks are counted locally and summed in, any chunking gives the same series.
pub fn tally_years(years: Vec<Year>, settings: &ParaSettings) -> io::Result<YearSeries<u32>> {
    if years.len() < settings.threshold {
        return Ok(count_per_year(years));
    }
    debug!(n = years.len(), "tallying years on worker pool");
    let chunks = years.chunks(CHUNK).map(|c| c.to_vec());
    let tally = YearTally {
        counts: Mutex::new(HashMap::new()),
    };
    let done = settings.run(chunks, tally)?;
    let counts = done
        .counts
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    Ok(counts.into_iter().collect())
}

struct SeriesMapper<V, U, F> {
    f: F,
    out: Mutex<BTreeMap<Year, U>>,
    _v: PhantomData<fn(V)>,
}

impl<V, U, F> Worker<(Year, V)> for SeriesMapper<V, U, F>
where
    V: Send,
    U: Send,
    F: Fn(Year, V) -> U + Send + Sync,
{
    fn proc(&self, input: (Year, V)) {
        let (y, v) = input;
        let mapped = (self.f)(y, v);
        self.out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(y, mapped);
    }
}

/// Maps every year of a series independently.
pub fn map_series<V, U, F>(
    series: YearSeries<V>,
    settings: &ParaSettings,
    f: F,
) -> io::Result<YearSeries<U>>
where
    V: Send,
    U: Send,
    F: Fn(Year, V) -> U + Send + Sync,
{
    if series.len() < settings.threshold {
        return Ok(series.into_iter().map(|(y, v)| (y, f(y, v))).collect());
    }
    debug!(n = series.len(), "mapping years on worker pool");
    let mapper = SeriesMapper {
        f,
        out: Mutex::new(BTreeMap::new()),
        _v: PhantomData,
    };
    let done = settings.run(series.into_iter(), mapper)?;
    let out = done
        .out
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    Ok(out.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn forced(threads: usize) -> ParaSettings {
        ParaSettings {
            threshold: 0,
            threads: Some(threads),
        }
    }

    #[test]
    fn counts() {
        let s = count_per_year(vec![2020, 2021, 2020, 2020]);
        assert_eq!(s, YearSeries::from([(2020, 3), (2021, 1)]));
    }

    #[test]
    fn para_matches_sequential() {
        let mut rng = StdRng::seed_from_u64(42);
        for n in [0, 1, 10, 5_000, 40_000] {
            let years: Vec<Year> = (0..n).map(|_| rng.gen_range(1990..2030)).collect();
            let seq = tally_years(years.clone(), &ParaSettings::sequential()).unwrap();
            for threads in [1, 3, 8] {
                let par = tally_years(years.clone(), &forced(threads)).unwrap();
                assert_eq!(seq, par, "n: {n}, threads: {threads}");
            }
            assert_eq!(seq.values().map(|c| *c as usize).sum::<usize>(), n);
        }
    }

    #[test]
    fn mapped_series() {
        let s = YearSeries::from([(2001, 1_u32), (2002, 2), (2003, 3)]);
        let seq = map_series(s.clone(), &ParaSettings::sequential(), |y, v| y as u32 * v).unwrap();
        let par = map_series(s, &forced(2), |y, v| y as u32 * v).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq.get(2003), Some(&6009));
    }
}
