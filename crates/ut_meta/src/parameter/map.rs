use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::format;
use alloc::vec::Vec;
use core::hash::{BuildHasher, Hash};
use core::ptr::NonNull;

use ut_ptr::{Address, PtrMut};
use ut_utils::hash::hashbrown;

use super::{
    ContainerFlags, ContainerOp, ContainerTraits, Parameter, ParameterRef, Traits, load_type,
    save_type, share,
};
use crate::controller::Controller;
use crate::names::{node_names, positional, type_names};
use crate::{Error, Event, Reflect, Result, Snapshot};

// -----------------------------------------------------------------------------
// MapLike

/// An associative container that [`MapParameter`] can reflect.
pub trait MapLike: Default + 'static {
    type Key: Reflect + Default + Clone;
    type Value: Reflect + Default;

    /// Type name of the container node.
    const TYPE_NAME: &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self);

    fn insert(&mut self, key: Self::Key, value: Self::Value);

    fn entries_mut(&mut self) -> impl Iterator<Item = (&Self::Key, &mut Self::Value)>;
}

impl<K, V, S> MapLike for hashbrown::HashMap<K, V, S>
where
    K: Reflect + Default + Clone + Eq + Hash,
    V: Reflect + Default,
    S: BuildHasher + Default + 'static,
{
    type Key = K;
    type Value = V;

    const TYPE_NAME: &'static str = type_names::HASHMAP;

    #[inline]
    fn len(&self) -> usize {
        hashbrown::HashMap::len(self)
    }

    #[inline]
    fn clear(&mut self) {
        hashbrown::HashMap::clear(self);
    }

    #[inline]
    fn insert(&mut self, key: K, value: V) {
        hashbrown::HashMap::insert(self, key, value);
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.iter_mut()
    }
}

#[cfg(feature = "std")]
impl<K, V, S> MapLike for std::collections::HashMap<K, V, S>
where
    K: Reflect + Default + Clone + Eq + Hash,
    V: Reflect + Default,
    S: BuildHasher + Default + 'static,
{
    type Key = K;
    type Value = V;

    const TYPE_NAME: &'static str = type_names::HASHMAP;

    #[inline]
    fn len(&self) -> usize {
        std::collections::HashMap::len(self)
    }

    #[inline]
    fn clear(&mut self) {
        std::collections::HashMap::clear(self);
    }

    #[inline]
    fn insert(&mut self, key: K, value: V) {
        std::collections::HashMap::insert(self, key, value);
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.iter_mut()
    }
}

impl<K, V> MapLike for BTreeMap<K, V>
where
    K: Reflect + Default + Clone + Ord,
    V: Reflect + Default,
{
    type Key = K;
    type Value = V;

    const TYPE_NAME: &'static str = type_names::MAP;

    #[inline]
    fn len(&self) -> usize {
        BTreeMap::len(self)
    }

    #[inline]
    fn clear(&mut self) {
        BTreeMap::clear(self);
    }

    #[inline]
    fn insert(&mut self, key: K, value: V) {
        BTreeMap::insert(self, key, value);
    }

    fn entries_mut(&mut self) -> impl Iterator<Item = (&K, &mut V)> {
        self.iter_mut()
    }
}

// -----------------------------------------------------------------------------
// Proxy entries

enum Slot<'a, V> {
    /// A value living in the map.
    Borrowed(PtrMut<'a, V>),
    /// A value being loaded, moved into the map after loading.
    Owned(V),
}

struct Entry<'a, K, V> {
    key: K,
    value: Slot<'a, V>,
}

/// One `key`/`value` node of a map.
struct EntryParameter<'a, K, V> {
    entry: PtrMut<'a, Entry<'a, K, V>>,
}

impl<'a, K: Reflect, V: Reflect> Parameter<'a> for EntryParameter<'a, K, V> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(type_names::REFLECTIVE)
    }

    #[inline]
    fn address(&self) -> Address {
        self.entry.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        // Safety: the entry is reflected by this node only.
        let Entry { key, value } = unsafe { self.entry.as_mut() };
        snapshot.add(key, "key")?;
        match value {
            // Safety: each map value is borrowed by exactly one entry.
            Slot::Borrowed(value) => snapshot.add(unsafe { value.as_mut() }, "value")?,
            Slot::Owned(value) => snapshot.add(value, "value")?,
        };
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// MapParameter

/// Parameter of an associative container.
///
/// Map keys cannot be borrowed mutably, so entries are reflected through
/// proxies holding a copy of each key. On load the proxies own default
/// values; they are moved into the map on [`Event::PostLoad`].
///
/// Map values therefore cannot be pointer targets: a raw pointer linked to
/// a value during load still points at the proxy, which is freed once the
/// value moves into the map.
pub struct MapParameter<'a, M: MapLike> {
    map: PtrMut<'a, M>,
    entries: Vec<Box<Entry<'a, M::Key, M::Value>>>,
    loading: bool,
}

impl<'a, M: MapLike> MapParameter<'a, M> {
    #[inline]
    pub fn new(map: &'a mut M) -> Self {
        Self {
            map: PtrMut::from_mut(map),
            entries: Vec::new(),
            loading: false,
        }
    }

    fn import(&mut self) -> Result<()> {
        self.entries.clear();
        // Safety: the map is only reached through the proxies built here.
        let map = unsafe { self.map.as_mut() };
        self.entries.try_reserve(map.len())?;
        for (key, value) in map.entries_mut() {
            self.entries.push(Box::new(Entry {
                key: key.clone(),
                value: Slot::Borrowed(PtrMut::from_mut(value)),
            }));
        }
        Ok(())
    }

    fn export(&mut self) {
        // Safety: the proxies are detached from the map while loading.
        let map = unsafe { self.map.as_mut() };
        for entry in self.entries.drain(..) {
            let Entry { key, value } = *entry;
            if let Slot::Owned(value) = value {
                map.insert(key, value);
            }
        }
        self.loading = false;
    }
}

impl<'a, M: MapLike> Parameter<'a> for MapParameter<'a, M> {
    #[inline]
    fn type_name(&self) -> Cow<'static, str> {
        Cow::Borrowed(M::TYPE_NAME)
    }

    #[inline]
    fn address(&self) -> Address {
        self.map.address()
    }

    fn reflect(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        if !self.loading {
            self.import()?;
        }
        for (index, entry) in self.entries.iter_mut().enumerate() {
            // Safety: boxed entries keep their address until the next import
            // or export, and the owning snapshot resets its children first.
            let entry = unsafe { PtrMut::new(NonNull::from(&mut **entry)) };
            snapshot.attach(share(EntryParameter { entry }), positional(index))?;
        }
        Ok(())
    }

    fn save(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            save_type(controller, node_names::KEY_TYPE, &<M::Key as Reflect>::type_name())?;
            save_type(controller, node_names::VALUE_TYPE, &<M::Value as Reflect>::type_name())?;
        }
        let len = self.entries.len();
        let count = u32::try_from(len)
            .map_err(|_| Error::out_of_bounds(format!("{len} entries do not fit a u32 count")))?;
        controller.write_attribute(node_names::COUNT, &count)
    }

    fn load(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        if controller.info().has_type_info() {
            load_type(controller, node_names::KEY_TYPE, &<M::Key as Reflect>::type_name())?;
            load_type(controller, node_names::VALUE_TYPE, &<M::Value as Reflect>::type_name())?;
        }
        let count = controller.read_count()?;

        self.entries.clear();
        self.entries.try_reserve(count)?;
        for _ in 0..count {
            self.entries.push(Box::new(Entry {
                key: M::Key::default(),
                value: Slot::Owned(M::Value::default()),
            }));
        }
        // Safety: no entry borrows the map anymore.
        unsafe { self.map.as_mut() }.clear();
        self.loading = true;
        Ok(())
    }

    #[inline]
    fn is_dynamic(&self) -> bool {
        true
    }

    fn traits(&self) -> Traits {
        Traits {
            container: Some(ContainerTraits {
                flags: ContainerFlags::RESET,
                element_type: <M::Value as Reflect>::type_name(),
                len: self.entries.len(),
            }),
        }
    }

    fn edit(&mut self, op: ContainerOp) -> Result<()> {
        match op {
            ContainerOp::Reset => {
                self.entries.clear();
                self.loading = false;
                // Safety: the proxies are gone.
                unsafe { self.map.as_mut() }.clear();
                Ok(())
            }
            _ => Err(Error::fail(format!("`{}` supports only reset", M::TYPE_NAME))),
        }
    }

    fn on_event(&mut self, event: Event) -> Result<()> {
        if event == Event::PostLoad && self.loading {
            self.export();
        }
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Reflect

impl<K, V, S> Reflect for hashbrown::HashMap<K, V, S>
where
    K: Reflect + Default + Clone + Eq + Hash,
    V: Reflect + Default,
    S: BuildHasher + Default + 'static,
{
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::HASHMAP)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(MapParameter::new(self))
    }
}

#[cfg(feature = "std")]
impl<K, V, S> Reflect for std::collections::HashMap<K, V, S>
where
    K: Reflect + Default + Clone + Eq + Hash,
    V: Reflect + Default,
    S: BuildHasher + Default + 'static,
{
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::HASHMAP)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(MapParameter::new(self))
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Default + Clone + Ord,
    V: Reflect + Default,
{
    #[inline]
    fn type_name() -> Cow<'static, str> {
        Cow::Borrowed(type_names::MAP)
    }

    fn parameter<'a>(&'a mut self) -> ParameterRef<'a> {
        share(MapParameter::new(self))
    }
}
