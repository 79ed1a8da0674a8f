//! Pointer links and the shared objects section.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use ut_ptr::Address;

use super::{Controller, Mode, State};
use crate::linker::{SharedHolder, Task};
use crate::names::{node_names, shared_object};
use crate::parameter::ParameterRef;
use crate::{Error, Result, Value};

type Holder<'a> = Box<dyn SharedHolder<'a> + 'a>;

impl<'a> Controller<'_, 'a> {
    fn current_parameter(&self) -> Result<ParameterRef<'a>> {
        self.current
            .clone()
            .ok_or_else(|| Error::fail("no node is being read"))
    }

    // -------------------------------------------------------------------------
    // Links

    /// Writes a placeholder id for the node observing `address`; the linker
    /// replaces it once every node has an id.
    pub fn write_link(&mut self, address: Address, type_name: &str) -> Result<()> {
        self.linker_mut()?;
        let state = self.save_state()?;
        self.write_value(&0u32)?;
        self.linker_mut()?.push_task(Task::Write {
            state,
            address,
            type_name: type_name.into(),
        })
    }

    /// Reads a link id; the node being read is linked once the whole
    /// payload has been read.
    pub fn read_link(&mut self) -> Result<()> {
        self.linker_mut()?;
        let id: u32 = self.read_value()?;
        if id == 0 {
            self.log("pointer was written without a target, loaded as null");
            return Ok(());
        }
        let parameter = self.current_parameter()?;
        self.linker_mut()?.push_task(Task::Read { parameter, id })
    }

    /// Queues a shared object for the `shared_objects` section. An object
    /// already queued is ignored.
    pub fn write_shared_object(&mut self, holder: Holder<'a>) -> Result<()> {
        self.linker_mut()?.cache_output(holder)
    }

    /// Writes a placeholder id for the shared object at `address`.
    ///
    /// A weak link to an object no strong owner wrote stays `0`.
    pub fn write_shared_link(&mut self, address: Address, weak: bool) -> Result<()> {
        self.linker_mut()?;
        let state = self.save_state()?;
        self.write_value(&0u32)?;
        self.linker_mut()?.push_task(Task::WriteShared {
            state,
            address,
            weak,
        })
    }

    /// Reads the id of a shared object and asks for it to be loaded through
    /// `holder`, unless another owner already did.
    pub fn read_shared_link(&mut self, holder: Holder<'a>) -> Result<()> {
        self.linker_mut()?;
        let id: u32 = self.read_value()?;
        if id == 0 {
            return Err(Error::empty("shared pointer was written without an object"));
        }
        let parameter = self.current_parameter()?;
        let linker = self.linker_mut()?;
        linker.cache_preliminary(id, holder);
        linker.push_task(Task::ReadShared {
            parameter,
            id,
            weak: false,
        })
    }

    /// Reads the id of a weakly referenced shared object. The object is
    /// never loaded on behalf of a weak link.
    pub fn read_weak_link(&mut self) -> Result<()> {
        self.linker_mut()?;
        let id: u32 = self.read_value()?;
        if id == 0 {
            return Ok(());
        }
        let parameter = self.current_parameter()?;
        self.linker_mut()?.push_task(Task::ReadShared {
            parameter,
            id,
            weak: true,
        })
    }

    /// Overwrites the placeholder reserved at `state`.
    pub(crate) fn write_link_id(&mut self, state: &State, id: u32) -> Result<()> {
        let current = self.save_state()?;
        self.rewind(state)?;
        let written = self.write_value(&id);
        self.rewind(&current)?;
        written
    }

    // -------------------------------------------------------------------------
    // Shared objects

    /// Writes every queued shared object, including those queued while
    /// writing the others.
    pub(super) fn write_shared_objects(&mut self) -> Result<()> {
        self.scoped(|c| {
            let endian = c.info.endianness();
            let start = match c.mode() {
                Mode::BinaryOutput => {
                    let output = c.output()?;
                    let start = output.cursor()?;
                    0u32.write_binary(endian, &mut *output)?;
                    Some(start)
                }
                _ => {
                    c.dive_into_attribute(node_names::SHARED_OBJECTS)?;
                    None
                }
            };

            let mut count = 0u32;
            while let Some((index, mut holder)) = c.linker_mut()?.next_output() {
                let saved = c.scoped(|c| {
                    if c.mode() == Mode::TextOutput {
                        let offset = c.allocate_children(1)?;
                        c.path.push(offset);
                    }
                    holder.save(c, &shared_object(index))
                });
                c.linker_mut()?.restore_output(index, holder);
                saved?;
                count += 1;
            }
            log::debug!("wrote {count} shared objects");

            if let Some(start) = start {
                let output = c.output()?;
                let end = output.cursor()?;
                output.move_cursor(start)?;
                count.write_binary(endian, &mut *output)?;
                output.move_cursor(end)?;
            }
            Ok(())
        })
    }

    /// Loads the shared objects some owner asked for and skips the others.
    pub(super) fn read_shared_objects(&mut self) -> Result<()> {
        self.scoped(|c| {
            let count = match c.mode() {
                Mode::BinaryInput => {
                    let endian = c.info.endianness();
                    u32::read_binary(endian, c.input()?)? as usize
                }
                _ => {
                    let Some(index) = c.current_text_input()?.position(node_names::SHARED_OBJECTS) else {
                        return Ok(());
                    };
                    c.path.push(index);
                    c.current_text_input()?.children.len()
                }
            };

            // Owners may come after the objects they point to when the
            // schema changed: skipped objects are retried until no owner
            // asks for one of them.
            let mut skipped: Vec<(usize, State, u32)> = Vec::new();
            for index in 0..count {
                if let Some(entry) = c.read_shared_object(index)? {
                    skipped.try_reserve(1)?;
                    skipped.push(entry);
                }
            }

            let mut end = c.save_state()?;
            loop {
                let position = skipped.iter().position(|(_, _, id)| {
                    c.linker.as_ref().is_some_and(|l| l.has_preliminary(*id))
                });
                let Some(position) = position else {
                    break;
                };
                let (index, state, id) = skipped.remove(position);
                c.rewind(&state)?;
                c.load_shared_object(index, id)?;
                c.rewind(&end)?;
                end = c.save_state()?;
            }
            Ok(())
        })
    }

    /// Reads the `index`-th shared object if requested; returns where it
    /// starts otherwise.
    fn read_shared_object(&mut self, index: usize) -> Result<Option<(usize, State, u32)>> {
        self.scoped(|c| {
            if c.mode() == Mode::TextInput {
                c.path.push(index);
            }
            let state = c.save_state()?;
            let uniform = c.scoped(|c| c.read_uniforms(true))?;
            let id = uniform
                .id
                .ok_or_else(|| Error::not_found(format!("shared object {index} has no id")))?;

            if c.linker.as_ref().is_some_and(|l| l.has_preliminary(id)) {
                c.rewind(&state)?;
                c.load_shared_object(index, id)?;
                return Ok(None);
            }
            c.skip(uniform.next)?;
            Ok(Some((index, state, id)))
        })
    }

    fn load_shared_object(&mut self, index: usize, id: u32) -> Result<()> {
        let Some(mut holder) = self.linker_mut()?.take_preliminary(id) else {
            return Ok(());
        };
        let loaded = holder.load(self, &shared_object(index));
        self.linker_mut()?.cache_input(id, holder)?;
        loaded
    }
}
