//! Typed, composable aggregation stages over in-memory record sequences.
//!
//! A [`Pipeline<I, O>`] turns an ordered `Vec<I>` into an ordered `Vec<O>`. Each builder method
//! appends one stage and may change the record type, so a pipeline reads top to bottom like the
//! query it replaces:
//!
//! ```ignore
//! pipeline::<Interaction>()
//!     .filter(|interaction| interaction.kind == InteractionKind::EventView)
//!     .group_count(|interaction| interaction.session_id.clone())
//!     .sort_by(|a, b| b.value.cmp(&a.value))
//!     .limit(5)
//!     .run(snapshot)
//! ```
//!
//! Ordering rules every stage keeps:
//! - filter/project/unwind preserve input order;
//! - grouping emits one row per key in the order the key is first seen;
//! - `sort_by` is stable, so rows comparing equal keep their prior relative order.
//!
//! Together these make tie-breaks deterministic: ties resolve to snapshot order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::Hash;

type StageFn<I, O> = Box<dyn Fn(Vec<I>) -> Vec<O> + Send + Sync>;

/// One aggregated row produced by `group_count`/`group_sum`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group<K> {
    pub key: K,
    pub value: u64,
}

/// A left record together with every right record sharing its join key.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup<L, R> {
    pub record: L,
    pub matches: Vec<R>,
}

pub struct Pipeline<I, O> {
    run: StageFn<I, O>,
}

/// Starts an empty pipeline over records of type `I`.
pub fn pipeline<I: 'static>() -> Pipeline<I, I> {
    Pipeline {
        run: Box::new(|records| records),
    }
}

impl<I: 'static, O: 'static> Pipeline<I, O> {
    fn then<P, S>(self, stage: S) -> Pipeline<I, P>
    where
        P: 'static,
        S: Fn(Vec<O>) -> Vec<P> + Send + Sync + 'static,
    {
        let previous = self.run;
        Pipeline {
            run: Box::new(move |records| stage(previous(records))),
        }
    }

    /// Executes every stage over `input`.
    pub fn run(&self, input: Vec<I>) -> Vec<O> {
        (self.run)(input)
    }

    /// Keeps records matching `predicate`.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&O) -> bool + Send + Sync + 'static,
    {
        self.then(move |records: Vec<O>| {
            records
                .into_iter()
                .filter(|record| predicate(record))
                .collect()
        })
    }

    /// Reshapes every record.
    pub fn project<P, F>(self, reshape: F) -> Pipeline<I, P>
    where
        P: 'static,
        F: Fn(O) -> P + Send + Sync + 'static,
    {
        self.then(move |records: Vec<O>| records.into_iter().map(&reshape).collect())
    }

    /// Reshapes records, dropping those for which `reshape` returns `None`.
    pub fn filter_map<P, F>(self, reshape: F) -> Pipeline<I, P>
    where
        P: 'static,
        F: Fn(O) -> Option<P> + Send + Sync + 'static,
    {
        self.then(move |records: Vec<O>| records.into_iter().filter_map(&reshape).collect())
    }

    /// Counts records per key.
    pub fn group_count<K, F>(self, key: F) -> Pipeline<I, Group<K>>
    where
        K: Eq + Hash + Clone + 'static,
        F: Fn(&O) -> K + Send + Sync + 'static,
    {
        self.then(move |records: Vec<O>| fold_groups(records, &key, |_| 1))
    }

    /// Sums `value` per key.
    pub fn group_sum<K, F, V>(self, key: F, value: V) -> Pipeline<I, Group<K>>
    where
        K: Eq + Hash + Clone + 'static,
        F: Fn(&O) -> K + Send + Sync + 'static,
        V: Fn(&O) -> u64 + Send + Sync + 'static,
    {
        self.then(move |records: Vec<O>| fold_groups(records, &key, &value))
    }

    /// Attaches all `right` records whose key equals the record's key.
    ///
    /// A `None` key on either side never matches; such left records get an empty match list.
    pub fn lookup<R, K, LK, RK>(
        self,
        right: Vec<R>,
        left_key: LK,
        right_key: RK,
    ) -> Pipeline<I, Lookup<O, R>>
    where
        R: Clone + Send + Sync + 'static,
        K: Eq + Hash + Send + Sync + 'static,
        LK: Fn(&O) -> Option<K> + Send + Sync + 'static,
        RK: Fn(&R) -> Option<K>,
    {
        let mut index: HashMap<K, Vec<R>> = HashMap::new();
        for record in right {
            if let Some(key) = right_key(&record) {
                index.entry(key).or_default().push(record);
            }
        }

        self.then(move |records: Vec<O>| {
            records
                .into_iter()
                .map(|record| {
                    let matches = left_key(&record)
                        .and_then(|key| index.get(&key))
                        .cloned()
                        .unwrap_or_default();
                    Lookup { record, matches }
                })
                .collect()
        })
    }

    /// Inner equality join: `lookup` followed by `unwind`.
    pub fn join_equality<R, K, LK, RK>(
        self,
        right: Vec<R>,
        left_key: LK,
        right_key: RK,
    ) -> Pipeline<I, (O, R)>
    where
        O: Clone,
        R: Clone + Send + Sync + 'static,
        K: Eq + Hash + Send + Sync + 'static,
        LK: Fn(&O) -> Option<K> + Send + Sync + 'static,
        RK: Fn(&R) -> Option<K>,
    {
        self.lookup(right, left_key, right_key).unwind()
    }

    /// Stable sort.
    pub fn sort_by<F>(self, compare: F) -> Self
    where
        F: Fn(&O, &O) -> Ordering + Send + Sync + 'static,
    {
        self.then(move |mut records: Vec<O>| {
            records.sort_by(|a, b| compare(a, b));
            records
        })
    }

    /// Keeps at most the first `n` records.
    pub fn limit(self, n: usize) -> Self {
        self.then(move |mut records: Vec<O>| {
            records.truncate(n);
            records
        })
    }
}

impl<I: 'static, L: Clone + 'static, R: 'static> Pipeline<I, Lookup<L, R>> {
    /// Emits one `(record, match)` pair per match; records without matches disappear.
    pub fn unwind(self) -> Pipeline<I, (L, R)> {
        self.then(|lookups: Vec<Lookup<L, R>>| {
            lookups
                .into_iter()
                .flat_map(|Lookup { record, matches }| {
                    matches
                        .into_iter()
                        .map(move |matched| (record.clone(), matched))
                })
                .collect()
        })
    }
}

impl<I: 'static, K: 'static> Pipeline<I, Group<K>> {
    /// Sorts groups by value, largest first; equal values keep first-seen order.
    pub fn sort_by_value_desc(self) -> Self {
        self.sort_by(|a, b| b.value.cmp(&a.value))
    }
}

fn fold_groups<O, K>(
    records: Vec<O>,
    key: impl Fn(&O) -> K,
    value: impl Fn(&O) -> u64,
) -> Vec<Group<K>>
where
    K: Eq + Hash + Clone,
{
    let mut positions: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<Group<K>> = Vec::new();

    for record in &records {
        let group_key = key(record);
        let amount = value(record);
        match positions.get(&group_key) {
            Some(&position) => {
                groups[position].value = groups[position].value.saturating_add(amount);
            }
            None => {
                positions.insert(group_key.clone(), groups.len());
                groups.push(Group {
                    key: group_key,
                    value: amount,
                });
            }
        }
    }

    groups
}
