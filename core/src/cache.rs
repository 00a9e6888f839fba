//! Record/replay store for multi-valued decisions.
//!
//! A multi-valued operation (resolving a comparison, picking an
//! approximation, choosing an integer) may legitimately answer differently at
//! different precisions. To keep a retried computation on the path it took
//! before, every such answer is appended to a per-type list on first use and
//! handed back in the same order on every later attempt. The driver rewinds
//! the cursors before each attempt; entries survive until the invocation
//! ends.
//!
//! Caching is inactive outside a driver invocation and inside
//! [`SingleValued`](crate::SingleValued) regions.

use std::any::{Any, TypeId};
use std::cell::RefCell;

use exact_backend::Dyadic;
use exact_types::Outcome;
use num_bigint::BigInt;

use crate::context;

mod sealed {
    pub trait Sealed {}
}

/// Types whose values can be recorded for replay.
///
/// The set is closed: one list per type is kept, and there are exactly
/// [`MAX_ACTIVE`] of them.
pub trait Cacheable: sealed::Sealed + Clone + 'static {}

macro_rules! cacheable {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl Cacheable for $ty {}
        )*
    };
}

cacheable!(bool, i32, i64, usize, f64, String, Dyadic, BigInt);

/// Number of [`Cacheable`] types, and so the most lists a set can hold.
pub const MAX_ACTIVE: usize = 8;

struct CacheList<T> {
    items: Vec<T>,
    cursor: usize,
}

trait ErasedCache {
    fn rewind(&mut self);
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Cacheable> ErasedCache for CacheList<T> {
    fn rewind(&mut self) {
        self.cursor = 0;
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// The lists activated during one driver invocation.
#[derive(Default)]
struct CacheSet {
    active: Vec<(TypeId, Box<dyn ErasedCache>)>,
}

impl CacheSet {
    fn list<T: Cacheable>(&mut self) -> Option<&mut CacheList<T>> {
        self.active
            .iter_mut()
            .find(|(id, _)| *id == TypeId::of::<T>())
            .and_then(|(_, list)| list.as_any_mut().downcast_mut::<CacheList<T>>())
    }

    fn list_or_activate<T: Cacheable>(&mut self) -> Option<&mut CacheList<T>> {
        let id = TypeId::of::<T>();
        let index = match self.active.iter().position(|(active, _)| *active == id) {
            Some(index) => index,
            None => {
                self.active.push((
                    id,
                    Box::new(CacheList::<T> {
                        items: Vec::new(),
                        cursor: 0,
                    }),
                ));
                self.active.len() - 1
            }
        };
        self.active[index]
            .1
            .as_any_mut()
            .downcast_mut::<CacheList<T>>()
    }

    fn rewind(&mut self) {
        for (_, list) in &mut self.active {
            list.rewind();
        }
    }
}

thread_local! {
    static CACHES: RefCell<Option<CacheSet>> = const { RefCell::new(None) };
}

/// Installs a fresh cache set for one driver invocation and puts the outer
/// one back on drop.
pub(crate) struct CacheScope {
    outer: Option<CacheSet>,
}

impl CacheScope {
    pub(crate) fn enter() -> Self {
        let outer = CACHES.with(|caches| caches.replace(Some(CacheSet::default())));
        Self { outer }
    }

    /// Moves every cursor back to the first entry.
    pub(crate) fn rewind(&self) {
        CACHES.with(|caches| {
            if let Some(set) = caches.borrow_mut().as_mut() {
                set.rewind();
            }
        });
    }
}

impl Drop for CacheScope {
    fn drop(&mut self) {
        let outer = self.outer.take();
        let finished = CACHES.with(|caches| caches.replace(outer));
        if let Some(set) = finished {
            tracing::trace!(lists = set.active.len(), "releasing multi-value caches");
        }
    }
}

fn recording() -> bool {
    context::inlimit() == 0
}

/// Next recorded value of type `T`, advancing the cursor.
#[must_use]
pub fn get_cached<T: Cacheable>() -> Option<T> {
    if !recording() {
        return None;
    }
    CACHES.with(|caches| {
        let mut caches = caches.borrow_mut();
        let list = caches.as_mut()?.list::<T>()?;
        let item = list.items.get(list.cursor)?.clone();
        list.cursor += 1;
        Some(item)
    })
}

/// Records `value` after the entries replayed so far.
pub fn put_cached<T: Cacheable>(value: T) {
    if !recording() {
        return;
    }
    CACHES.with(|caches| {
        if let Some(list) = caches
            .borrow_mut()
            .as_mut()
            .and_then(CacheSet::list_or_activate::<T>)
        {
            list.items.push(value);
            list.cursor = list.items.len();
        }
    });
}

/// Overwrites the entry most recently read or written.
pub fn modify_cached<T: Cacheable>(value: T) {
    if !recording() {
        return;
    }
    CACHES.with(|caches| {
        if let Some(list) = caches.borrow_mut().as_mut().and_then(CacheSet::list::<T>)
            && let Some(slot) = list.cursor.checked_sub(1).and_then(|i| list.items.get_mut(i))
        {
            *slot = value;
        }
    });
}

/// Replays the next recorded value, or computes, records and returns a new
/// one.
///
/// `compute` must not itself record values of type `T`.
pub fn cached<T, F>(compute: F) -> Outcome<T>
where
    T: Cacheable,
    F: FnOnce() -> Outcome<T>,
{
    if let Some(value) = get_cached::<T>() {
        return Ok(value);
    }
    let value = compute()?;
    put_cached(value.clone());
    Ok(value)
}
