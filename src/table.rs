//! Chained hash table with explicit bucket control.
//!
//! `ChainedTable` resolves collisions by separate chaining: a bucket array
//! sized by the caller, each slot lazily holding a [`Chain`] of entries.
//! The bucket count changes only through [`ChainedTable::resize`] — there
//! is no load-factor-triggered growth, though the load factor is queryable.
//!
//! Every entry caches the `u64` its hasher produced at insert time, so
//! resize redistributes entries without re-entering user code. Lookups
//! always go hash-then-chain-scan, with key equality decided by the
//! configured [`Comparator`].
//!
//! Cloning comes in two compile-time-distinct flavors: the deep variants
//! route every element through the configured [`Copier`](crate::Copier)
//! capabilities, while the shallow variants are only callable for
//! [`ShareClone`] payloads, whose `Clone` aliases storage instead of
//! copying it.

use core::cmp::Ordering;

use crate::caps::{Capability, Comparator, ShareClone, SlotOps};
use crate::chain::{Chain, NodeRef};
use crate::errors::Error;
use crate::policy::{HashPolicy, KeyHasher, KeyRepr};
use crate::reentrancy::DebugReentry;

struct Entry<K, V> {
    key: K,
    value: V,
    hash: u64,
}

/// Staged configuration for a [`ChainedTable`]. The bucket count must be
/// positive and a comparator must be supplied; everything else is optional.
pub struct TableBuilder<K, V> {
    bucket_count: usize,
    policy: HashPolicy,
    hasher: Option<KeyHasher<K>>,
    comparator: Comparator<K>,
    key_ops: SlotOps<K>,
    value_ops: SlotOps<V>,
}

impl<K, V> TableBuilder<K, V> {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            bucket_count,
            policy: HashPolicy::Simple,
            hasher: None,
            comparator: Comparator::unset(),
            key_ops: SlotOps::new(),
            value_ops: SlotOps::new(),
        }
    }

    pub fn policy(mut self, policy: HashPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Caller-supplied hash function; takes precedence over the policy.
    pub fn hasher(mut self, hasher: KeyHasher<K>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    pub fn comparator(mut self, comparator: Comparator<K>) -> Self {
        self.comparator = comparator;
        self
    }

    pub fn key_ops(mut self, ops: SlotOps<K>) -> Self {
        self.key_ops = ops;
        self
    }

    pub fn value_ops(mut self, ops: SlotOps<V>) -> Self {
        self.value_ops = ops;
        self
    }

    /// Build without policy resolution. The key type carries no width
    /// information here, so a custom hasher is mandatory.
    pub fn build_custom(self) -> Result<ChainedTable<K, V>, Error> {
        let TableBuilder {
            bucket_count,
            policy: _,
            hasher,
            comparator,
            key_ops,
            value_ops,
        } = self;
        let hasher = match hasher {
            Some(h) => h,
            None => return Err(Error::Missing(Capability::Hasher)),
        };
        assemble(bucket_count, hasher, comparator, key_ops, value_ops)
    }
}

impl<K: KeyRepr + 'static, V> TableBuilder<K, V> {
    /// Build, resolving the policy for `K`'s width unless a custom hasher
    /// was supplied.
    pub fn build(self) -> Result<ChainedTable<K, V>, Error> {
        let TableBuilder {
            bucket_count,
            policy,
            hasher,
            comparator,
            key_ops,
            value_ops,
        } = self;
        let hasher = match hasher {
            Some(h) => h,
            None => KeyHasher::resolve(policy)?,
        };
        assemble(bucket_count, hasher, comparator, key_ops, value_ops)
    }
}

fn assemble<K, V>(
    bucket_count: usize,
    hasher: KeyHasher<K>,
    comparator: Comparator<K>,
    key_ops: SlotOps<K>,
    value_ops: SlotOps<V>,
) -> Result<ChainedTable<K, V>, Error> {
    if bucket_count == 0 {
        return Err(Error::InvalidArgument);
    }
    if !comparator.is_set() {
        return Err(Error::Missing(Capability::Comparator));
    }
    let mut buckets = Vec::new();
    buckets.resize_with(bucket_count, || None);
    Ok(ChainedTable {
        buckets,
        len: 0,
        hasher,
        comparator,
        key_ops,
        value_ops,
        destroyed: false,
        reentry: DebugReentry::new(),
    })
}

pub struct ChainedTable<K, V> {
    buckets: Vec<Option<Chain<Entry<K, V>>>>,
    len: usize,
    hasher: KeyHasher<K>,
    comparator: Comparator<K>,
    key_ops: SlotOps<K>,
    value_ops: SlotOps<V>,
    destroyed: bool,
    reentry: DebugReentry,
}

impl<K: KeyRepr + Ord + 'static, V> ChainedTable<K, V> {
    /// Simple-policy table with the key type's natural ordering and no
    /// optional capabilities.
    pub fn new(bucket_count: usize) -> Result<Self, Error> {
        TableBuilder::new(bucket_count)
            .comparator(Comparator::from_ord())
            .build()
    }
}

impl<K, V> ChainedTable<K, V> {
    fn ensure_live(&self) -> Result<(), Error> {
        if self.destroyed {
            Err(Error::NotInitialized)
        } else {
            Ok(())
        }
    }

    fn bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Comparator scan of one chain. The comparator is enforced at build
    /// time, so the error path here is theoretical, but it is propagated
    /// rather than unwrapped.
    fn scan(&self, chain: &Chain<Entry<K, V>>, key: &K) -> Result<Option<NodeRef>, Error> {
        let mut failed = None;
        let found = chain.find(|e| match self.comparator.compare(&e.key, key) {
            Ok(ord) => ord == Ordering::Equal,
            Err(err) => {
                failed = Some(err);
                false
            }
        });
        match failed {
            Some(err) => Err(err),
            None => Ok(found),
        }
    }

    fn probe(&self, key: &K) -> Result<Option<(usize, NodeRef)>, Error> {
        let hash = self.hasher.hash(key);
        let index = self.bucket_index(hash);
        match &self.buckets[index] {
            Some(chain) => Ok(self.scan(chain, key)?.map(|node| (index, node))),
            None => Ok(None),
        }
    }

    fn bucket_sum(&self) -> usize {
        self.buckets
            .iter()
            .map(|slot| slot.as_ref().map_or(0, Chain::len))
            .sum()
    }

    /// Dispose every entry, leaving the bucket array sized as-is with all
    /// slots back in the lazily-absent state. Disposers run with the
    /// structure already consistent.
    fn clear_entries(&mut self) {
        for slot in self.buckets.iter_mut() {
            if let Some(chain) = slot.as_mut() {
                while let Some(entry) = chain.pop_front() {
                    self.key_ops.disposer.dispose(entry.key);
                    self.value_ops.disposer.dispose(entry.value);
                }
            }
            *slot = None;
        }
        self.len = 0;
    }

    /// Insert a new entry. An equal key under the comparator fails with
    /// `AlreadyExists` — replace is remove-then-insert by contract. On any
    /// failure no mutation is visible.
    pub fn insert(&mut self, key: K, value: V) -> Result<(), Error> {
        self.ensure_live()?;
        let _g = self.reentry.enter();
        let hash = self.hasher.hash(&key);
        let index = self.bucket_index(hash);
        let duplicate = match &self.buckets[index] {
            Some(chain) => self.scan(chain, &key)?,
            None => None,
        };
        if duplicate.is_some() {
            return Err(Error::AlreadyExists);
        }
        self.buckets[index]
            .get_or_insert_with(Chain::new)
            .push_back(Entry { key, value, hash });
        self.len += 1;
        Ok(())
    }

    /// Remove an entry, releasing its key and value through the disposers.
    pub fn remove(&mut self, key: &K) -> Result<(), Error> {
        self.ensure_live()?;
        let guard = self.reentry.enter();
        let found = self.probe(key)?;
        let (index, node) = match found {
            Some(hit) => hit,
            None => return Err(Error::NotFound),
        };
        let entry = match self.buckets[index].as_mut().and_then(|c| c.remove(node)) {
            Some(entry) => entry,
            None => return Err(Error::NotFound),
        };
        self.len -= 1;
        // Structure is consistent again; disposers may run user code.
        drop(guard);
        self.key_ops.disposer.dispose(entry.key);
        self.value_ops.disposer.dispose(entry.value);
        Ok(())
    }

    pub fn get(&self, key: &K) -> Result<&V, Error> {
        self.get_entry(key).map(|(_, value)| value)
    }

    /// Borrow the stored key and value for a key match.
    pub fn get_entry(&self, key: &K) -> Result<(&K, &V), Error> {
        self.ensure_live()?;
        let found = {
            let _g = self.reentry.enter();
            self.probe(key)?
        };
        let (index, node) = match found {
            Some(hit) => hit,
            None => return Err(Error::NotFound),
        };
        match self.buckets[index].as_ref().and_then(|c| c.get(node)) {
            Some(entry) => Ok((&entry.key, &entry.value)),
            None => Err(Error::NotFound),
        }
    }

    pub fn get_mut(&mut self, key: &K) -> Result<&mut V, Error> {
        self.ensure_live()?;
        let found = {
            let _g = self.reentry.enter();
            self.probe(key)?
        };
        let (index, node) = match found {
            Some(hit) => hit,
            None => return Err(Error::NotFound),
        };
        match self.buckets[index].as_mut().and_then(|c| c.get_mut(node)) {
            Some(entry) => Ok(&mut entry.value),
            None => Err(Error::NotFound),
        }
    }

    pub fn contains_key(&self, key: &K) -> Result<bool, Error> {
        self.ensure_live()?;
        let _g = self.reentry.enter();
        Ok(self.probe(key)?.is_some())
    }

    /// Redistribute every entry into a freshly sized bucket array using the
    /// cached hashes, then swap it in. The only way the bucket count
    /// changes. The entry count is recomputed from the new buckets as a
    /// cross-check.
    pub fn resize(&mut self, new_bucket_count: usize) -> Result<(), Error> {
        self.ensure_live()?;
        if new_bucket_count == 0 {
            return Err(Error::InvalidArgument);
        }
        let _g = self.reentry.enter();
        let mut fresh: Vec<Option<Chain<Entry<K, V>>>> = Vec::new();
        fresh.resize_with(new_bucket_count, || None);
        for slot in self.buckets.iter_mut() {
            if let Some(chain) = slot.as_mut() {
                while let Some(entry) = chain.pop_front() {
                    let index = (entry.hash % new_bucket_count as u64) as usize;
                    fresh[index].get_or_insert_with(Chain::new).push_back(entry);
                }
            }
        }
        self.buckets = fresh;
        let total = self.bucket_sum();
        debug_assert_eq!(total, self.len, "resize must preserve the entry count");
        self.len = total;
        Ok(())
    }

    /// Number of live entries. Zero after destroy.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn num_buckets(&self) -> Result<usize, Error> {
        self.ensure_live()?;
        Ok(self.buckets.len())
    }

    pub fn load_factor(&self) -> Result<f64, Error> {
        self.ensure_live()?;
        Ok(self.len as f64 / self.buckets.len() as f64)
    }

    /// Length of one bucket's chain; absent buckets count zero.
    pub fn bucket_len(&self, index: usize) -> Result<usize, Error> {
        self.ensure_live()?;
        match self.buckets.get(index) {
            Some(slot) => Ok(slot.as_ref().map_or(0, Chain::len)),
            None => Err(Error::OutOfBounds),
        }
    }

    /// Collect references to every key, in bucket-index order. The caller
    /// owns the vector, not the keys.
    pub fn keys(&self) -> Result<Vec<&K>, Error> {
        self.ensure_live()?;
        let mut out = Vec::with_capacity(self.len);
        for chain in self.buckets.iter().flatten() {
            for entry in chain.iter() {
                out.push(&entry.key);
            }
        }
        Ok(out)
    }

    /// Debug rendering: walks buckets in index order and delegates
    /// formatting to the printers. Not a stable serialization format.
    pub fn render(&self) -> Result<String, Error> {
        self.ensure_live()?;
        if !self.key_ops.printer.is_set() || !self.value_ops.printer.is_set() {
            return Err(Error::Missing(Capability::Printer));
        }
        let _g = self.reentry.enter();
        if self.len == 0 {
            return Ok("(empty)".to_string());
        }
        let mut out = String::new();
        for (index, slot) in self.buckets.iter().enumerate() {
            let chain = match slot {
                Some(c) if !c.is_empty() => c,
                _ => continue,
            };
            out.push_str(&format!("bucket {}:", index));
            let mut first = true;
            for entry in chain.iter() {
                out.push_str(if first { " " } else { ", " });
                first = false;
                out.push_str(&self.key_ops.printer.print(&entry.key)?);
                out.push_str(" => ");
                out.push_str(&self.value_ops.printer.print(&entry.value)?);
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Dispose every entry but keep the configuration and bucket count.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.ensure_live()?;
        self.clear_entries();
        Ok(())
    }

    /// Dispose every entry, drop the bucket array, and poison the table:
    /// every further operation — including a second destroy — fails with
    /// `NotInitialized`.
    pub fn destroy(&mut self) -> Result<(), Error> {
        self.ensure_live()?;
        self.clear_entries();
        self.buckets = Vec::new();
        self.destroyed = true;
        Ok(())
    }

    /// Independent deep clone: identical configuration (shared function
    /// objects), every element routed through the copiers. A copier failure
    /// discards the partial clone and leaves the source untouched.
    pub fn clone_deep(&self) -> Result<Self, Error> {
        self.ensure_live()?;
        if !self.key_ops.copier.is_set() || !self.value_ops.copier.is_set() {
            return Err(Error::Missing(Capability::Copier));
        }
        let _g = self.reentry.enter();
        let mut buckets = Vec::new();
        buckets.resize_with(self.buckets.len(), || None);
        for (index, slot) in self.buckets.iter().enumerate() {
            if let Some(chain) = slot {
                let copied = chain.try_map(|entry| {
                    let key = self.key_ops.copier.copy(&entry.key)?;
                    let value = self.value_ops.copier.copy(&entry.value)?;
                    Ok(Entry {
                        key,
                        value,
                        hash: entry.hash,
                    })
                })?;
                buckets[index] = Some(copied);
            }
        }
        Ok(self.with_buckets(buckets))
    }

    /// Shallow clone: the chrome (buckets, chains, entries) is duplicated
    /// but payload storage is shared, which is why it is only offered for
    /// `ShareClone` payloads.
    pub fn clone_shallow(&self) -> Result<Self, Error>
    where
        K: ShareClone,
        V: ShareClone,
    {
        self.ensure_live()?;
        let _g = self.reentry.enter();
        let mut buckets = Vec::new();
        buckets.resize_with(self.buckets.len(), || None);
        for (index, slot) in self.buckets.iter().enumerate() {
            if let Some(chain) = slot {
                let shared = chain.try_map(|entry| {
                    Ok::<_, Error>(Entry {
                        key: entry.key.clone(),
                        value: entry.value.clone(),
                        hash: entry.hash,
                    })
                })?;
                buckets[index] = Some(shared);
            }
        }
        Ok(self.with_buckets(buckets))
    }

    fn with_buckets(&self, buckets: Vec<Option<Chain<Entry<K, V>>>>) -> Self {
        let len: usize = buckets
            .iter()
            .map(|slot| slot.as_ref().map_or(0, Chain::len))
            .sum();
        Self {
            buckets,
            len,
            hasher: self.hasher.clone(),
            comparator: self.comparator.clone(),
            key_ops: self.key_ops.clone(),
            value_ops: self.value_ops.clone(),
            destroyed: false,
            reentry: DebugReentry::new(),
        }
    }

    /// Deep copy into this table: dispose current contents, then rebuild
    /// element-wise from `src` using `src`'s copiers and this table's own
    /// hasher and bucket array (configurations may differ, so hashes are
    /// recomputed). On a mid-copy failure the destination is left empty,
    /// never partially valid.
    pub fn copy_deep_from(&mut self, src: &Self) -> Result<(), Error> {
        self.ensure_live()?;
        src.ensure_live()?;
        if !src.key_ops.copier.is_set() || !src.value_ops.copier.is_set() {
            return Err(Error::Missing(Capability::Copier));
        }
        self.clear_entries();
        let mut result = Ok(());
        {
            let _g = self.reentry.enter();
            let _src_g = src.reentry.enter();
            'rebuild: for chain in src.buckets.iter().flatten() {
                for entry in chain.iter() {
                    let key = match src.key_ops.copier.copy(&entry.key) {
                        Ok(k) => k,
                        Err(err) => {
                            result = Err(err);
                            break 'rebuild;
                        }
                    };
                    let value = match src.value_ops.copier.copy(&entry.value) {
                        Ok(v) => v,
                        Err(err) => {
                            result = Err(err);
                            break 'rebuild;
                        }
                    };
                    let hash = self.hasher.hash(&key);
                    let index = self.bucket_index(hash);
                    self.buckets[index]
                        .get_or_insert_with(Chain::new)
                        .push_back(Entry { key, value, hash });
                    self.len += 1;
                }
            }
        }
        match result {
            Ok(()) => {
                let total = self.bucket_sum();
                debug_assert_eq!(total, self.len, "copy must account for every entry");
                self.len = total;
                Ok(())
            }
            Err(err) => {
                self.clear_entries();
                Err(err)
            }
        }
    }

    /// Shallow copy into this table: dispose current contents, then share
    /// `src`'s payload storage entry-wise, placed by this table's hasher.
    pub fn copy_shallow_from(&mut self, src: &Self) -> Result<(), Error>
    where
        K: ShareClone,
        V: ShareClone,
    {
        self.ensure_live()?;
        src.ensure_live()?;
        self.clear_entries();
        let _g = self.reentry.enter();
        let _src_g = src.reentry.enter();
        for chain in src.buckets.iter().flatten() {
            for entry in chain.iter() {
                let key = entry.key.clone();
                let value = entry.value.clone();
                let hash = self.hasher.hash(&key);
                let index = self.bucket_index(hash);
                self.buckets[index]
                    .get_or_insert_with(Chain::new)
                    .push_back(Entry { key, value, hash });
                self.len += 1;
            }
        }
        Ok(())
    }
}
