//! Deferred resolution of pointers.
//!
//! Every node traversed while linkage info is on gets a [`Link`] pairing its
//! parameter, the address it observes and an id. Pointer parameters do not
//! write or read their target directly; they enqueue a task that runs once
//! the whole tree, shared objects included, has been traversed.

// -----------------------------------------------------------------------------
// Modules

mod task;

pub(crate) use task::Task;

use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::any::Any;
use core::mem;

use ut_ptr::Address;
use ut_utils::hash::HashMap;

use crate::controller::Controller;
use crate::parameter::{LinkTarget, ParameterRef};
use crate::{Error, Result};

// -----------------------------------------------------------------------------
// SharedHolder

/// Type-erased owner of one shared object during a call.
///
/// Writing caches holders by the address of the object, reading by the id
/// written by its pointers.
pub trait SharedHolder<'a> {
    /// Address of the held object, null before it is created.
    fn address(&self) -> Address;

    /// Run-time type name of the object.
    fn type_name(&self) -> &str;

    /// Link id of the object's root node, `0` before it is traversed.
    fn id(&self) -> u32;

    /// The owning handle behind `dyn Any`, for pointers to downcast.
    fn shared(&self) -> Option<&dyn Any>;

    /// Writes the object as node `name`.
    fn save(&mut self, controller: &mut Controller<'_, 'a>, name: &str) -> Result<()>;

    /// Creates the object and reads it from node `name`.
    fn load(&mut self, controller: &mut Controller<'_, 'a>, name: &str) -> Result<()>;

    /// Runs the post event of the last save or load.
    fn finish(&mut self) -> Result<()>;
}

type Holder<'a> = Box<dyn SharedHolder<'a> + 'a>;

// -----------------------------------------------------------------------------
// Link

/// A traversed node.
pub struct Link<'a> {
    pub parameter: ParameterRef<'a>,
    pub address: Address,
    pub id: u32,
}

// -----------------------------------------------------------------------------
// Linker

/// Per-call link table, task queue and shared object caches.
pub struct Linker<'a> {
    links: Vec<Link<'a>>,
    by_id: HashMap<u32, usize>,
    by_address: HashMap<Address, Vec<usize>>,
    next_id: u32,
    tasks: Vec<Task<'a>>,
    output: Vec<Option<Holder<'a>>>,
    output_index: HashMap<Address, usize>,
    next_output: usize,
    input: Vec<Holder<'a>>,
    input_index: HashMap<u32, usize>,
    preliminary: HashMap<u32, Holder<'a>>,
}

impl Default for Linker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Linker<'a> {
    pub fn new() -> Self {
        Self {
            links: Vec::new(),
            by_id: HashMap::default(),
            by_address: HashMap::default(),
            next_id: 1,
            tasks: Vec::new(),
            output: Vec::new(),
            output_index: HashMap::default(),
            next_output: 0,
            input: Vec::new(),
            input_index: HashMap::default(),
            preliminary: HashMap::default(),
        }
    }

    /// Returns a fresh id. Ids start at 1, `0` means "no id".
    pub fn generate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers a traversed node.
    pub fn add_link(&mut self, parameter: ParameterRef<'a>, id: u32) -> Result<()> {
        let address = parameter
            .try_borrow()
            .map_err(|_| Error::fail(format!("parameter of link {id} is in use")))?
            .address();
        let index = self.links.len();
        self.links.try_reserve(1)?;
        self.links.push(Link {
            parameter,
            address,
            id,
        });
        self.by_id.entry(id).or_insert(index);
        self.by_address.entry(address).or_default().push(index);
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn find_by_id(&self, id: u32) -> Option<&Link<'a>> {
        self.by_id.get(&id).map(|&index| &self.links[index])
    }

    pub fn find_by_parameter(&self, parameter: &ParameterRef<'a>) -> Option<&Link<'a>> {
        let wanted = Address::from_ptr(Rc::as_ptr(parameter));
        self.links
            .iter()
            .find(|link| Address::from_ptr(Rc::as_ptr(&link.parameter)) == wanted)
    }

    /// Finds the node observing `address`.
    ///
    /// An aggregate and its first field share an address; the first node
    /// whose type is `type_name` wins, otherwise the outermost one.
    pub fn find_by_address(&self, address: Address, type_name: Option<&str>) -> Option<&Link<'a>> {
        let candidates = self.by_address.get(&address)?;
        let matching = type_name.and_then(|wanted| {
            candidates.iter().find(|&&index| {
                self.links[index]
                    .parameter
                    .try_borrow()
                    .is_ok_and(|p| p.type_name().eq_ignore_ascii_case(wanted))
            })
        });
        matching
            .or_else(|| candidates.first())
            .map(|&index| &self.links[index])
    }

    pub(crate) fn push_task(&mut self, task: Task<'a>) -> Result<()> {
        self.tasks.try_reserve(1)?;
        self.tasks.push(task);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Shared caches

    /// Caches a shared object to write; an object already cached is ignored.
    pub(crate) fn cache_output(&mut self, holder: Holder<'a>) -> Result<()> {
        let address = holder.address();
        if self.output_index.contains_key(&address) {
            return Ok(());
        }
        self.output.try_reserve(1)?;
        self.output_index.insert(address, self.output.len());
        self.output.push(Some(holder));
        Ok(())
    }

    /// Takes the next shared object not written yet.
    pub(crate) fn next_output(&mut self) -> Option<(usize, Holder<'a>)> {
        while self.next_output < self.output.len() {
            let index = self.next_output;
            self.next_output += 1;
            if let Some(holder) = self.output[index].take() {
                return Some((index, holder));
            }
        }
        None
    }

    pub(crate) fn restore_output(&mut self, index: usize, holder: Holder<'a>) {
        self.output[index] = Some(holder);
    }

    fn output_id(&self, address: Address) -> Option<u32> {
        let index = *self.output_index.get(&address)?;
        self.output[index].as_ref().map(|holder| holder.id())
    }

    /// Records a shared object some pointer asked for.
    pub(crate) fn cache_preliminary(&mut self, id: u32, holder: Holder<'a>) {
        if !self.input_index.contains_key(&id) {
            self.preliminary.entry(id).or_insert(holder);
        }
    }

    pub(crate) fn has_preliminary(&self, id: u32) -> bool {
        self.preliminary.contains_key(&id)
    }

    pub(crate) fn take_preliminary(&mut self, id: u32) -> Option<Holder<'a>> {
        self.preliminary.remove(&id)
    }

    pub(crate) fn cache_input(&mut self, id: u32, holder: Holder<'a>) -> Result<()> {
        self.input.try_reserve(1)?;
        self.input_index.insert(id, self.input.len());
        self.input.push(holder);
        Ok(())
    }

    fn input(&self, id: u32) -> Option<&dyn Any> {
        let index = *self.input_index.get(&id)?;
        self.input[index].shared()
    }

    // -------------------------------------------------------------------------
    // Execution

    /// Runs every task in order, then the post events of shared objects.
    ///
    /// A task that fails is logged and does not stop the others; the first
    /// failure is returned.
    pub fn execute(&mut self, controller: &mut Controller<'_, 'a>) -> Result<()> {
        let mut first_error = None;
        for task in mem::take(&mut self.tasks) {
            if let Err(error) = self.run(task, controller) {
                controller.log(&format!("link failed: {error}"));
                first_error.get_or_insert(error);
            }
        }

        for holder in self.output.iter_mut().flatten() {
            holder.finish()?;
        }
        for holder in &mut self.input {
            holder.finish()?;
        }

        first_error.map_or(Ok(()), Err)
    }

    fn run(&self, task: Task<'a>, controller: &mut Controller<'_, 'a>) -> Result<()> {
        match task {
            Task::Write {
                state,
                address,
                type_name,
            } => {
                let link = self
                    .find_by_address(address, Some(&type_name))
                    .ok_or_else(|| {
                        Error::not_found(format!("no `{type_name}` at {address} in the payload"))
                    })?;
                controller.write_link_id(&state, link.id)
            }
            Task::WriteShared {
                state,
                address,
                weak,
            } => match self.output_id(address) {
                Some(id) => controller.write_link_id(&state, id),
                None if weak => {
                    controller.log(&format!(
                        "weak pointer to {address} has no owner in the payload, written as empty"
                    ));
                    Ok(())
                }
                None => Err(Error::not_found(format!("no shared object at {address}"))),
            },
            Task::Read { parameter, id } => {
                let link = self
                    .find_by_id(id)
                    .ok_or_else(|| Error::not_found(format!("no node with id {id}")))?;
                let address = link.address;
                let type_name: String = link
                    .parameter
                    .try_borrow()
                    .map_err(|_| Error::fail(format!("node {id} is in use")))?
                    .type_name()
                    .into_owned();
                parameter
                    .try_borrow_mut()
                    .map_err(|_| Error::fail(format!("pointer to node {id} is in use")))?
                    .link(LinkTarget::Object {
                        address,
                        type_name: &type_name,
                    })
            }
            Task::ReadShared {
                parameter,
                id,
                weak,
            } => match self.input(id) {
                Some(object) => parameter
                    .try_borrow_mut()
                    .map_err(|_| Error::fail(format!("pointer to shared object {id} is in use")))?
                    .link(LinkTarget::Shared(object)),
                None if weak => {
                    controller.log(&format!(
                        "weak pointer to shared object {id} has no owner, loaded as empty"
                    ));
                    Ok(())
                }
                None => Err(Error::not_found(format!("no shared object with id {id}"))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::borrow::Cow;

    use ut_ptr::Address;

    use super::Linker;
    use crate::parameter::{Parameter, share};

    struct Stub(Address, &'static str);

    impl Parameter<'_> for Stub {
        fn type_name(&self) -> Cow<'static, str> {
            Cow::Borrowed(self.1)
        }

        fn address(&self) -> Address {
            self.0
        }
    }

    #[test]
    fn ids_start_at_one() {
        let mut linker = Linker::new();
        assert_eq!(linker.generate_id(), 1);
        assert_eq!(linker.generate_id(), 2);
    }

    #[test]
    fn three_lookup_paths() {
        let value = [0u64; 2];
        let outer = Address::of(&value);
        let inner = Address::of(&value[0]);
        assert_eq!(outer, inner);

        let aggregate = share(Stub(outer, "reflective"));
        let field = share(Stub(inner, "uint64"));

        let mut linker = Linker::new();
        linker.add_link(aggregate.clone(), 1).unwrap();
        linker.add_link(field.clone(), 2).unwrap();
        assert_eq!(linker.len(), 2);

        assert_eq!(linker.find_by_id(2).unwrap().address, inner);
        assert_eq!(linker.find_by_parameter(&field).unwrap().id, 2);
        assert_eq!(linker.find_by_address(outer, Some("UINT64")).unwrap().id, 2);
        assert_eq!(linker.find_by_address(outer, Some("float")).unwrap().id, 1);
        assert_eq!(linker.find_by_address(outer, None).unwrap().id, 1);
        assert!(linker.find_by_id(3).is_none());
        assert!(linker.find_by_address(Address::NULL, None).is_none());
    }
}
