use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use bindle_utils::hash::HashMap;
use fixedbitset::FixedBitSet;

use super::NamedProperty;

// -----------------------------------------------------------------------------
// PropertyIndex

/// Name and alias lookup over a fixed list of properties.
///
/// Built once per bean model. Each decoded object gets a fresh [`Consumer`]
/// to track which properties it has already read.
pub struct PropertyIndex<P> {
    properties: Vec<P>,
    lookup: HashMap<String, usize>,
}

impl<P> Default for PropertyIndex<P> {
    #[inline]
    fn default() -> Self {
        Self {
            properties: Vec::new(),
            lookup: HashMap::default(),
        }
    }
}

impl<P: NamedProperty> PropertyIndex<P> {
    /// Indexes `properties` by name and aliases.
    ///
    /// Fails with the offending key if two properties claim the same name
    /// or alias.
    pub fn new(properties: Vec<P>) -> Result<Self, String> {
        let mut lookup = HashMap::with_capacity_and_hasher(properties.len(), Default::default());
        for (index, property) in properties.iter().enumerate() {
            let keys = core::iter::once(property.name()).chain(property.aliases().iter().map(String::as_str));
            for key in keys {
                match lookup.get(key) {
                    None => {
                        lookup.insert(String::from(key), index);
                    }
                    // A property may repeat its own name among its aliases.
                    Some(&existing) if existing == index => {}
                    Some(_) => return Err(String::from(key)),
                }
            }
        }
        Ok(Self { properties, lookup })
    }
}

impl<P> PropertyIndex<P> {
    #[inline]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The stable index of the property named or aliased `name`.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&P> {
        self.properties.get(index)
    }

    #[inline]
    pub fn get_by_name(&self, name: &str) -> Option<&P> {
        self.lookup(name).and_then(|index| self.get(index))
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, P> {
        self.properties.iter()
    }

    /// Returns `true` if `name` is a name or alias of some property.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Every key the index answers to, names and aliases.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.lookup.keys().map(String::as_str)
    }

    /// A fresh tracker with every property unconsumed.
    #[inline]
    pub fn consumer(&self) -> Consumer<'_, P> {
        Consumer::new(self)
    }
}

impl<P: fmt::Debug> fmt::Debug for PropertyIndex<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.properties.iter()).finish()
    }
}

// -----------------------------------------------------------------------------
// Consumer

enum Remaining {
    /// One bit per property, set while unconsumed.
    Small(u64),
    Big { set: FixedBitSet, count: usize },
}

/// Per-object record of which properties of an index were read.
///
/// Up to 64 properties fit one machine word; larger indexes fall back to a
/// bit set.
pub struct Consumer<'a, P> {
    index: &'a PropertyIndex<P>,
    remaining: Remaining,
}

impl<'a, P> Consumer<'a, P> {
    fn new(index: &'a PropertyIndex<P>) -> Self {
        let len = index.len();
        let remaining = if len <= 64 {
            Remaining::Small(u64::MAX.checked_shr((64 - len) as u32).unwrap_or(0))
        } else {
            let mut set = FixedBitSet::with_capacity(len);
            set.insert_range(..);
            Remaining::Big { set, count: len }
        };
        Self { index, remaining }
    }

    /// Marks the property named or aliased `name` consumed and returns it.
    ///
    /// Returns `None` both for unknown names and for properties consumed
    /// before; use [`PropertyIndex::lookup`] to tell them apart.
    pub fn consume(&mut self, name: &str) -> Option<(usize, &'a P)> {
        let index = self.index.lookup(name)?;
        if self.consume_index(index) {
            self.index.get(index).map(|property| (index, property))
        } else {
            None
        }
    }

    /// Marks `index` consumed. Returns `false` if it already was.
    pub fn consume_index(&mut self, index: usize) -> bool {
        match &mut self.remaining {
            Remaining::Small(mask) => {
                let bit = 1_u64.checked_shl(index as u32).unwrap_or(0);
                let unconsumed = *mask & bit != 0;
                *mask &= !bit;
                unconsumed
            }
            Remaining::Big { set, count } => {
                let unconsumed = index < set.len() && set.contains(index);
                if unconsumed {
                    set.set(index, false);
                    *count -= 1;
                }
                unconsumed
            }
        }
    }

    #[inline]
    pub fn is_consumed(&self, index: usize) -> bool {
        match &self.remaining {
            Remaining::Small(mask) => {
                index < self.index.len() && mask & (1_u64 << index) == 0
            }
            Remaining::Big { set, .. } => index < set.len() && !set.contains(index),
        }
    }

    /// Returns `true` once every property has been read.
    #[inline]
    pub fn is_all_consumed(&self) -> bool {
        match &self.remaining {
            Remaining::Small(mask) => *mask == 0,
            Remaining::Big { count, .. } => *count == 0,
        }
    }

    /// Properties not read yet, in index order.
    pub fn not_consumed(&self) -> NotConsumed<'_, 'a, P> {
        let bits = match &self.remaining {
            Remaining::Small(mask) => Bits::Small(*mask),
            Remaining::Big { set, .. } => Bits::Big(set.ones()),
        };
        NotConsumed {
            index: self.index,
            bits,
        }
    }
}

enum Bits<'c> {
    Small(u64),
    Big(fixedbitset::Ones<'c>),
}

/// Iterator returned by [`Consumer::not_consumed`].
pub struct NotConsumed<'c, 'a, P> {
    index: &'a PropertyIndex<P>,
    bits: Bits<'c>,
}

impl<'a, P> Iterator for NotConsumed<'_, 'a, P> {
    type Item = (usize, &'a P);

    fn next(&mut self) -> Option<Self::Item> {
        let next = match &mut self.bits {
            Bits::Small(mask) => {
                if *mask == 0 {
                    return None;
                }
                let next = mask.trailing_zeros() as usize;
                *mask &= *mask - 1;
                next
            }
            Bits::Big(ones) => ones.next()?,
        };
        self.index.get(next).map(|property| (next, property))
    }
}
