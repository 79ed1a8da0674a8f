//! The traversal engine.
//!
//! A [`Controller`] walks a [`Snapshot`] and a medium in lock-step. The same
//! algorithm serves the four modes; only the primitives in `io` look at the
//! medium.
//!
//! Per node, the controller writes the uniform attributes (name, type, id
//! and size, each depending on the [`Info`] flags), lets the parameter write
//! its own payload, then recurses into the children. Reading mirrors the
//! writing, and turns any mismatch it can recover from into a skip.

// -----------------------------------------------------------------------------
// Modules

mod io;
mod link;

#[cfg(test)]
mod tests;

// -----------------------------------------------------------------------------
// Exports

pub use io::State;

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefMut;

use crate::linker::Linker;
use crate::names::node_names;
use crate::parameter::{Parameter, ParameterRef};
use crate::stream::{InputStream, OutputStream};
use crate::text::Node;
use crate::{Endian, Error, ErrorKind, Event, Flags, Info, Registry, Result, Snapshot, Value};

// -----------------------------------------------------------------------------
// Mode

/// What a controller is attached to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Mode {
    Empty,
    BinaryInput,
    BinaryOutput,
    TextInput,
    TextOutput,
}

impl Mode {
    #[inline]
    pub const fn is_input(self) -> bool {
        matches!(self, Self::BinaryInput | Self::TextInput)
    }

    #[inline]
    pub const fn is_output(self) -> bool {
        matches!(self, Self::BinaryOutput | Self::TextOutput)
    }
}

pub(crate) enum Io<'io> {
    Empty,
    BinaryInput(&'io mut (dyn InputStream + 'io)),
    BinaryOutput(&'io mut (dyn OutputStream + 'io)),
    TextInput(&'io Node),
    TextOutput(&'io mut Node),
}

// -----------------------------------------------------------------------------
// Options

/// How one node is written or read.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SerializationOptions {
    /// Handles the `info` block, the linker and the shared objects: set for
    /// the root of a call only.
    pub initialize: bool,
    /// Reads the uniform attributes and skips the rest of the node.
    pub only_uniforms: bool,
    /// Writes or reads a size field even without size info.
    pub force_size_info: bool,
}

impl Default for SerializationOptions {
    fn default() -> Self {
        Self {
            initialize: true,
            only_uniforms: false,
            force_size_info: false,
        }
    }
}

const NESTED: SerializationOptions = SerializationOptions {
    initialize: false,
    only_uniforms: false,
    force_size_info: false,
};

/// Attributes common to all nodes, as read from a payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Uniform {
    /// Absent in binary payloads without names.
    pub name: Option<String>,
    /// Present with type info only.
    pub type_name: Option<String>,
    /// Present with linkage info only.
    pub id: Option<u32>,
    /// Binary position following the node, if the node can be skipped.
    pub next: Option<u64>,
}

// -----------------------------------------------------------------------------
// Controller

/// Drives one save or load call.
///
/// `'io` is the borrow of the medium and registry, `'a` the lifetime of the
/// snapshots being traversed.
///
/// # Examples
///
/// ```
/// use ut_meta::stream::{MemoryReader, MemoryWriter};
/// use ut_meta::{Controller, Info, Reflect, SerializationOptions, Snapshot};
///
/// #[derive(Reflect, Default)]
/// struct Header {
///     magic: u32,
///     label: String,
/// }
///
/// let mut header = Header { magic: 7, label: "ut".into() };
/// let mut bytes = MemoryWriter::new();
/// let mut snapshot = Snapshot::capture_with(&mut header, "header", Info::minimal()).unwrap();
/// Controller::binary_output(&mut bytes)
///     .write_node(&mut snapshot, SerializationOptions::default())
///     .unwrap();
///
/// let mut loaded = Header::default();
/// let mut snapshot = Snapshot::capture(&mut loaded).unwrap();
/// let mut reader = MemoryReader::new(bytes.as_slice());
/// Controller::binary_input(&mut reader)
///     .read_node(&mut snapshot, SerializationOptions::default())
///     .unwrap();
/// drop(snapshot);
///
/// assert_eq!((loaded.magic, loaded.label.as_str()), (7, "ut"));
/// ```
pub struct Controller<'io, 'a> {
    info: Info,
    io: Io<'io>,
    path: Vec<usize>,
    registry: Option<&'io Registry>,
    linker: Option<Linker<'a>>,
    current: Option<ParameterRef<'a>>,
}

impl<'io, 'a> Controller<'io, 'a> {
    fn with_io(io: Io<'io>) -> Self {
        Self {
            info: Info::default(),
            io,
            path: Vec::new(),
            registry: None,
            linker: None,
            current: None,
        }
    }

    /// A controller attached to nothing.
    pub fn new() -> Self {
        Self::with_io(Io::Empty)
    }

    pub fn binary_input(input: &'io mut (dyn InputStream + 'io)) -> Self {
        Self::with_io(Io::BinaryInput(input))
    }

    pub fn binary_output(output: &'io mut (dyn OutputStream + 'io)) -> Self {
        Self::with_io(Io::BinaryOutput(output))
    }

    pub fn text_input(root: &'io Node) -> Self {
        Self::with_io(Io::TextInput(root))
    }

    pub fn text_output(root: &'io mut Node) -> Self {
        Self::with_io(Io::TextOutput(root))
    }

    /// Sets the registry used to create polymorphic pointees.
    pub fn with_registry(mut self, registry: &'io Registry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Sets the info used by calls that do not initialize.
    pub fn with_info(mut self, info: Info) -> Self {
        self.info = info;
        self
    }

    pub fn mode(&self) -> Mode {
        match self.io {
            Io::Empty => Mode::Empty,
            Io::BinaryInput(_) => Mode::BinaryInput,
            Io::BinaryOutput(_) => Mode::BinaryOutput,
            Io::TextInput(_) => Mode::TextInput,
            Io::TextOutput(_) => Mode::TextOutput,
        }
    }

    #[inline]
    pub fn info(&self) -> &Info {
        &self.info
    }

    #[inline]
    pub fn registry(&self) -> Option<&'io Registry> {
        self.registry
    }

    /// Reports a recoverable problem, see [`Info::log`].
    pub fn log(&self, message: &str) {
        self.info.log(message);
    }

    // -------------------------------------------------------------------------
    // Writing

    /// Writes `snapshot` and its subtree.
    ///
    /// With [`initialize`](SerializationOptions::initialize), the call
    /// adopts the snapshot's [`Info`], writes the `info` block first, and
    /// finishes with the shared objects and the pending links.
    pub fn write_node(
        &mut self,
        snapshot: &mut Snapshot<'a>,
        options: SerializationOptions,
    ) -> Result<()> {
        if !self.mode().is_output() {
            return Err(Error::fail(format!("cannot write in {:?} mode", self.mode())));
        }

        if options.initialize {
            self.info = snapshot.info();
            self.linker = self.info.has_linkage_info().then(Linker::new);
            log::debug!("writing `{}` with {:?}", snapshot.name(), self.info.flags());
            snapshot.dispatch(Event::PreSave)?;
            self.write_info()?;
        }

        self.scoped(|c| {
            let size = c.write_uniforms(snapshot, options.force_size_info)?;
            let parameter = snapshot.parameter().clone();
            borrow_mut(&parameter)?.save(c)?;
            c.write_child_nodes(snapshot)?;
            c.write_size(size)
        })?;

        if options.initialize {
            if self.info.has_linkage_info() {
                self.write_shared_objects()?;
            }
            self.execute_linker()?;
            snapshot.dispatch(Event::PostSave)?;
        }
        Ok(())
    }

    fn write_uniforms(&mut self, snapshot: &mut Snapshot<'a>, force_size: bool) -> Result<Option<u64>> {
        #[cfg(feature = "debug")]
        log::trace!("write `{}`: {}", snapshot.name(), snapshot.type_name());

        if self.info.has_linkage_info() {
            // Nested calls number their nodes on their own.
            let linker = self.linker.get_or_insert_with(Linker::new);
            let id = linker.generate_id();
            linker.add_link(snapshot.parameter().clone(), id)?;
            snapshot.set_id(id);
        }

        match self.mode() {
            Mode::BinaryOutput if self.info.has_binary_names() => {
                let endian = self.info.endianness();
                String::from(snapshot.name()).write_binary(endian, self.output()?)?;
            }
            Mode::TextOutput => {
                let name = String::from(snapshot.name());
                self.current_text_output()?.name = name;
            }
            _ => {}
        }

        if self.info.has_type_info() {
            let type_name = String::from(snapshot.type_name());
            self.write_attribute(node_names::TYPE, &type_name)?;
        }
        if self.info.has_linkage_info() {
            self.write_attribute(node_names::ID, &snapshot.id())?;
        }
        self.reserve_size(force_size)
    }

    fn write_child_nodes(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        self.scoped(|c| {
            if c.info.has_value_encapsulation() {
                c.dive_into(node_names::VALUE)?;
            }

            let count = snapshot.len();
            if c.mode() == Mode::TextOutput {
                let offset = c.allocate_children(count)?;
                for (i, child) in snapshot.children_mut().iter_mut().enumerate() {
                    c.scoped(|c| {
                        c.path.push(offset + i);
                        c.write_node(child, NESTED)
                    })?;
                }
                return Ok(());
            }

            if c.info.has_binary_names() {
                let count = u32::try_from(count)
                    .map_err(|_| Error::out_of_bounds(format!("{count} child nodes")))?;
                c.write_value(&count)?;
            }
            for child in snapshot.children_mut() {
                c.write_node(child, NESTED)?;
            }
            Ok(())
        })
    }

    fn write_info(&mut self) -> Result<()> {
        let version = self.info.version();
        let flags = self.info.flags().bits();
        self.with_endian(Endian::Little, |c| {
            c.scoped(|c| {
                c.dive_into_attribute(node_names::INFO)?;
                c.write_attribute(node_names::VERSION, &version)?;
                c.write_attribute(node_names::FLAGS, &flags)
            })
        })
    }

    // -------------------------------------------------------------------------
    // Reading

    /// Reads `snapshot` and its subtree.
    ///
    /// The root always matches the payload; below it, nodes are matched by
    /// name, or by position without names. Nodes that do not match, or whose
    /// type differs, are logged and skipped.
    ///
    /// With [`only_uniforms`](SerializationOptions::only_uniforms) nothing
    /// is loaded: the uniform attributes are returned and the node skipped.
    pub fn read_node(
        &mut self,
        snapshot: &mut Snapshot<'a>,
        options: SerializationOptions,
    ) -> Result<Uniform> {
        if !self.mode().is_input() {
            return Err(Error::fail(format!("cannot read in {:?} mode", self.mode())));
        }
        if options.initialize && options.only_uniforms {
            return Err(Error::fail("cannot initialize and skip a node at once"));
        }

        if options.initialize {
            self.read_info(snapshot)?;
            self.linker = self.info.has_linkage_info().then(Linker::new);
            log::debug!("reading `{}` with {:?}", snapshot.name(), self.info.flags());
            snapshot.dispatch(Event::PreLoad)?;
        }

        let uniform = self.scoped(|c| {
            let uniform = c.read_uniforms(options.force_size_info)?;
            if options.only_uniforms {
                c.skip(uniform.next)?;
            } else {
                c.read_body(snapshot, &uniform)?;
            }
            Ok(uniform)
        })?;

        if options.initialize {
            if self.info.has_linkage_info() {
                self.read_shared_objects()?;
            }
            self.execute_linker()?;
            snapshot.dispatch(Event::PostLoad)?;
        }
        Ok(uniform)
    }

    pub(crate) fn read_uniforms(&mut self, force_size: bool) -> Result<Uniform> {
        let name = match self.mode() {
            Mode::BinaryInput if self.info.has_binary_names() => {
                let endian = self.info.endianness();
                Some(String::read_binary(endian, self.input()?)?)
            }
            Mode::TextInput => Some(self.current_text_input()?.name.clone()),
            _ => None,
        };
        let type_name = if self.info.has_type_info() {
            Some(self.read_attribute::<String>(node_names::TYPE)?)
        } else {
            None
        };
        let id = if self.info.has_linkage_info() {
            Some(self.read_attribute::<u32>(node_names::ID)?)
        } else {
            None
        };
        let next = self.read_size(force_size)?;
        Ok(Uniform {
            name,
            type_name,
            id,
            next,
        })
    }

    fn read_body(&mut self, snapshot: &mut Snapshot<'a>, uniform: &Uniform) -> Result<()> {
        #[cfg(feature = "debug")]
        log::trace!("read `{}`: {}", snapshot.name(), snapshot.type_name());

        if let Some(found) = &uniform.type_name {
            let expected = snapshot.type_name();
            if !expected.eq_ignore_ascii_case(found) {
                self.log(&format!(
                    "node `{}` has type `{expected}` but `{found}` was serialized, skipped",
                    snapshot.name()
                ));
                return self.skip(uniform.next);
            }
        }

        if let Some(id) = uniform.id.filter(|&id| id != 0) {
            if let Some(linker) = self.linker.as_mut() {
                linker.add_link(snapshot.parameter().clone(), id)?;
            }
            snapshot.set_id(id);
        }

        let parameter = snapshot.parameter().clone();
        let previous = self.current.replace(parameter.clone());
        let loaded = borrow_mut(&parameter).and_then(|mut p| p.load(self));
        self.current = previous;
        match loaded {
            Err(error) if error.kind() == ErrorKind::TypesNotMatch => {
                self.log(&format!("node `{}`: {error}, skipped", snapshot.name()));
                return self.skip(uniform.next);
            }
            loaded => loaded?,
        }

        if parameter.try_borrow().is_ok_and(|p| p.is_dynamic()) {
            snapshot.reset_children();
            snapshot.reflect_children()?;
        }
        self.read_child_nodes(snapshot)
    }

    fn read_child_nodes(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        self.scoped(|c| {
            if c.info.has_value_encapsulation() {
                if c.mode() == Mode::TextInput
                    && c.current_text_input()?.find_child(node_names::VALUE).is_none()
                {
                    return Ok(());
                }
                c.dive_into(node_names::VALUE)?;
            }

            if c.mode() == Mode::TextInput {
                let indices: Vec<usize> = c.current_text_input()?.data_children().map(|(i, _)| i).collect();
                for (i, index) in indices.into_iter().enumerate() {
                    c.scoped(|c| {
                        c.path.push(index);
                        c.read_child(snapshot, i)
                    })?;
                }
                return Ok(());
            }

            let count = if c.info.has_binary_names() {
                c.read_value::<u32>()? as usize
            } else {
                snapshot.len()
            };
            for i in 0..count {
                c.read_child(snapshot, i)?;
            }
            Ok(())
        })
    }

    /// Reads the `index`-th serialized child into the matching child of
    /// `parent`.
    fn read_child(&mut self, parent: &mut Snapshot<'a>, index: usize) -> Result<()> {
        let uniform = self.read_uniforms(false)?;
        let target = match (parent.len(), &uniform.name) {
            (0, _) => None,
            (len, None) => Some(index.min(len - 1)),
            (len, Some(name)) => {
                let hint = index.min(len - 1);
                if parent.children()[hint].name() == name {
                    Some(hint)
                } else {
                    parent.children().iter().position(|c| c.name() == name)
                }
            }
        };

        match target {
            Some(target) => self.read_body(&mut parent.children_mut()[target], &uniform),
            None => {
                log::debug!(
                    "node `{}` has no child `{}`, skipped",
                    parent.name(),
                    uniform.name.as_deref().unwrap_or_default()
                );
                self.skip(uniform.next)
            }
        }
    }

    fn read_info(&mut self, snapshot: &mut Snapshot<'a>) -> Result<()> {
        let (version, flags) = self.with_endian(Endian::Little, |c| {
            c.scoped(|c| {
                c.dive_into_attribute(node_names::INFO)?;
                let version = c.read_attribute::<u32>(node_names::VERSION)?;
                let flags = c.read_attribute::<u32>(node_names::FLAGS)?;
                Ok((version, flags))
            })
        })?;

        let current = snapshot.info();
        self.info = Info::new(Flags::from_bits_truncate(flags), version)
            .with_log_hook(current.log_hook().cloned());
        snapshot.set_info(self.info.clone());
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Linker

    fn linker_mut(&mut self) -> Result<&mut Linker<'a>> {
        self.linker
            .as_mut()
            .ok_or_else(|| Error::fail("pointers need linkage info"))
    }

    fn execute_linker(&mut self) -> Result<()> {
        let Some(mut linker) = self.linker.take() else {
            return Ok(());
        };
        log::debug!("resolving {} links", linker.len());
        linker.execute(self)
    }
}

impl Default for Controller<'_, '_> {
    fn default() -> Self {
        Self::new()
    }
}

fn borrow_mut<'p, 'a>(
    parameter: &'p ParameterRef<'a>,
) -> Result<RefMut<'p, dyn Parameter<'a> + 'a>> {
    parameter
        .try_borrow_mut()
        .map_err(|_| Error::fail("parameter is already in use"))
}
