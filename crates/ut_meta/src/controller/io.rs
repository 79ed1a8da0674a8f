//! Access to the backing medium: attributes, values, blocks and the text
//! cursor.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use super::{Controller, Io, Mode};
use crate::names::node_names;
use crate::stream::{InputStream, OutputStream};
use crate::text::Node;
use crate::{Endian, Error, Result, Value};

// -----------------------------------------------------------------------------
// State

/// A position in the medium: the text path and the binary cursor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    pub(crate) path: Vec<usize>,
    pub(crate) cursor: Option<u64>,
}

impl<'io> Controller<'io, '_> {
    /// Runs `f`, then climbs back to the current text node.
    pub(crate) fn scoped<R>(&mut self, f: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        let depth = self.path.len();
        let result = f(self);
        self.path.truncate(depth);
        result
    }

    pub(crate) fn save_state(&mut self) -> Result<State> {
        let cursor = match &mut self.io {
            Io::BinaryInput(input) => Some(input.cursor()?),
            Io::BinaryOutput(output) => Some(output.cursor()?),
            _ => None,
        };
        Ok(State {
            path: self.path.clone(),
            cursor,
        })
    }

    pub(crate) fn rewind(&mut self, state: &State) -> Result<()> {
        self.path.clone_from(&state.path);
        match (&mut self.io, state.cursor) {
            (Io::BinaryInput(input), Some(cursor)) => input.move_cursor(cursor),
            (Io::BinaryOutput(output), Some(cursor)) => output.move_cursor(cursor),
            _ => Ok(()),
        }
    }

    // -------------------------------------------------------------------------
    // Medium

    pub(crate) fn input(&mut self) -> Result<&mut (dyn InputStream + 'io)> {
        let mode = self.mode();
        match &mut self.io {
            Io::BinaryInput(input) => Ok(&mut **input),
            _ => Err(Error::fail(format!("{mode:?} controller cannot read bytes"))),
        }
    }

    pub(crate) fn output(&mut self) -> Result<&mut (dyn OutputStream + 'io)> {
        let mode = self.mode();
        match &mut self.io {
            Io::BinaryOutput(output) => Ok(&mut **output),
            _ => Err(Error::fail(format!("{mode:?} controller cannot write bytes"))),
        }
    }

    /// The current node of a text input.
    pub(crate) fn current_text_input(&self) -> Result<&'io Node> {
        let Io::TextInput(root) = &self.io else {
            return Err(Error::fail(format!("{:?} controller has no text input", self.mode())));
        };
        let mut node: &'io Node = *root;
        for &index in &self.path {
            node = node
                .children
                .get(index)
                .ok_or_else(|| Error::out_of_bounds(format!("text node {index} is gone")))?;
        }
        Ok(node)
    }

    /// The current node of a text output.
    pub(crate) fn current_text_output(&mut self) -> Result<&mut Node> {
        let mode = self.mode();
        let Io::TextOutput(root) = &mut self.io else {
            return Err(Error::fail(format!("{mode:?} controller has no text output")));
        };
        let mut node: &mut Node = root;
        for &index in &self.path {
            node = node
                .children
                .get_mut(index)
                .ok_or_else(|| Error::out_of_bounds(format!("text node {index} is gone")))?;
        }
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Navigation

    /// Moves into the child `name` of the current text node, creating it on
    /// output. Binary streams are sequential: nothing to do.
    pub(crate) fn dive_into(&mut self, name: &str) -> Result<()> {
        self.dive(name, false)
    }

    /// Same as [`dive_into`](Self::dive_into) for metadata sections.
    pub(crate) fn dive_into_attribute(&mut self, name: &str) -> Result<()> {
        self.dive(name, true)
    }

    fn dive(&mut self, name: &str, is_attribute: bool) -> Result<()> {
        let index = match self.mode() {
            Mode::TextOutput => {
                let node = self.current_text_output()?;
                match node.position(name) {
                    Some(index) => index,
                    None => {
                        node.children.try_reserve(1)?;
                        node.add_child(Node {
                            is_attribute,
                            ..Node::new(name)
                        })
                    }
                }
            }
            Mode::TextInput => {
                let node = self.current_text_input()?;
                match node.position(name) {
                    Some(index) => index,
                    None => {
                        let message = format!("node `{}` has no `{name}` node", node.name);
                        self.log(&message);
                        return Err(Error::not_found(message));
                    }
                }
            }
            _ => return Ok(()),
        };
        self.path.try_reserve(1)?;
        self.path.push(index);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Values

    /// Writes a named attribute: a text attribute node, or the bare value in
    /// binary streams.
    pub fn write_attribute<V: Value>(&mut self, name: &str, value: &V) -> Result<()> {
        if self.mode() == Mode::TextOutput {
            let node = self.current_text_output()?;
            let attribute = match node.position(name) {
                Some(index) => &mut node.children[index],
                None => {
                    node.children.try_reserve(1)?;
                    let index = node.add_child(Node::new(name));
                    &mut node.children[index]
                }
            };
            attribute.value = Some(value.to_text());
            attribute.value_type = Some(V::value_type_name().into());
            attribute.is_attribute = true;
            return Ok(());
        }
        self.write_value(value)
    }

    /// Reads what [`write_attribute`](Self::write_attribute) wrote.
    pub fn read_attribute<V: Value>(&mut self, name: &str) -> Result<V> {
        if self.mode() == Mode::TextInput {
            let node = self.current_text_input()?;
            let Some(attribute) = node.find_child(name) else {
                let message = format!("node `{}` has no `{name}` attribute", node.name);
                self.log(&message);
                return Err(Error::not_found(message));
            };
            return V::from_text(attribute.value.as_deref().unwrap_or_default());
        }
        self.read_value()
    }

    /// Reads the element count of a container.
    ///
    /// The count is checked against what the payload can still hold: the
    /// bytes left in a binary stream, or the data children of a text node.
    /// A corrupt count fails before anything is allocated.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_attribute::<u32>(node_names::COUNT)?;
        let available = match self.mode() {
            Mode::BinaryInput => {
                let per_element = self.min_node_size();
                if per_element == 0 {
                    None
                } else {
                    let input = self.input()?;
                    let left = input.size()?.saturating_sub(input.cursor()?);
                    Some(left / per_element)
                }
            }
            Mode::TextInput => {
                let mut node = self.current_text_input()?;
                if self.info.has_value_encapsulation() {
                    node = node.find_child(node_names::VALUE).unwrap_or(node);
                }
                Some(node.data_children().count() as u64)
            }
            _ => None,
        };
        match available {
            Some(available) if u64::from(count) > available => Err(Error::out_of_bounds(format!(
                "{count} elements announced, the payload holds at most {available}"
            ))),
            _ => Ok(count as usize),
        }
    }

    /// Smallest number of bytes a binary node takes with the current flags.
    fn min_node_size(&self) -> u64 {
        if self.info.has_size_info() || self.info.has_linkage_info() {
            4
        } else if self.info.has_binary_names() || self.info.has_type_info() {
            1
        } else {
            0
        }
    }

    /// Writes the payload of the current node.
    ///
    /// In text, the value is stored on the node itself, or on its `value`
    /// child with value encapsulation on.
    pub fn write_value<V: Value>(&mut self, value: &V) -> Result<()> {
        let endian = self.info.endianness();
        let encapsulated = self.info.has_value_encapsulation();
        match self.mode() {
            Mode::BinaryOutput => value.write_binary(endian, self.output()?),
            Mode::TextOutput => {
                let node = self.current_text_output()?;
                let node = if encapsulated {
                    let index = match node.position(node_names::VALUE) {
                        Some(index) => index,
                        None => {
                            node.children.try_reserve(1)?;
                            node.add_child(Node::new(node_names::VALUE))
                        }
                    };
                    &mut node.children[index]
                } else {
                    node
                };
                node.value = Some(value.to_text());
                node.value_type = Some(V::value_type_name().into());
                Ok(())
            }
            _ => Err(Error::fail(format!("{:?} controller cannot write", self.mode()))),
        }
    }

    /// Reads what [`write_value`](Self::write_value) wrote.
    pub fn read_value<V: Value>(&mut self) -> Result<V> {
        let endian = self.info.endianness();
        match self.mode() {
            Mode::BinaryInput => V::read_binary(endian, self.input()?),
            Mode::TextInput => {
                let mut node = self.current_text_input()?;
                if self.info.has_value_encapsulation() {
                    let Some(value) = node.find_child(node_names::VALUE) else {
                        let message = format!("node `{}` has no value", node.name);
                        self.log(&message);
                        return Err(Error::not_found(message));
                    };
                    node = value;
                }
                V::from_text(node.value.as_deref().unwrap_or_default())
            }
            _ => Err(Error::fail(format!("{:?} controller cannot read", self.mode()))),
        }
    }

    /// Writes a raw block: as is in binary, as a base64 value in text.
    pub fn write_block(&mut self, bytes: &[u8]) -> Result<()> {
        match self.mode() {
            Mode::BinaryOutput => self.output()?.write(bytes),
            _ => self.write_value(&STANDARD.encode(bytes)),
        }
    }

    /// Reads a block of exactly `size` bytes.
    pub fn read_block(&mut self, size: usize) -> Result<Vec<u8>> {
        match self.mode() {
            Mode::BinaryInput => {
                let mut bytes = Vec::new();
                bytes.try_reserve(size)?;
                bytes.resize(size, 0);
                self.input()?.read(&mut bytes)?;
                Ok(bytes)
            }
            _ => {
                let text: String = self.read_value()?;
                let bytes = STANDARD
                    .decode(text.trim())
                    .map_err(|e| Error::fail(format!("invalid base64 block: {e}")))?;
                if bytes.len() != size {
                    return Err(Error::out_of_bounds(format!(
                        "block of {} bytes, expected {size}",
                        bytes.len()
                    )));
                }
                Ok(bytes)
            }
        }
    }

    /// Runs `f` with multi-byte values in `endian` order.
    pub(crate) fn with_endian<R>(
        &mut self,
        endian: Endian,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let flags = self.info.flags();
        self.info.set_endianness(endian);
        let result = f(self);
        self.info.set_flags(flags);
        result
    }

    // -------------------------------------------------------------------------
    // Sizes

    pub(crate) fn skip_possible(&self, force_size: bool) -> bool {
        match self.mode() {
            Mode::TextInput | Mode::TextOutput => true,
            _ => force_size || self.info.has_size_info(),
        }
    }

    /// Reserves the size field of a binary node.
    pub(crate) fn reserve_size(&mut self, force_size: bool) -> Result<Option<u64>> {
        if self.mode() != Mode::BinaryOutput || !self.skip_possible(force_size) {
            return Ok(None);
        }
        let output = self.output()?;
        let start = output.cursor()?;
        output.write(&[0; 4])?;
        Ok(Some(start))
    }

    /// Backpatches a size field reserved by [`reserve_size`](Self::reserve_size).
    pub(crate) fn write_size(&mut self, start: Option<u64>) -> Result<()> {
        let Some(start) = start else {
            return Ok(());
        };
        let endian = self.info.endianness();
        let output = self.output()?;
        let end = output.cursor()?;
        let size = u32::try_from(end - start)
            .map_err(|_| Error::out_of_bounds(format!("node of {} bytes", end - start)))?;
        output.move_cursor(start)?;
        size.write_binary(endian, &mut *output)?;
        output.move_cursor(end)
    }

    /// Reads a size field; returns the position following the node.
    pub(crate) fn read_size(&mut self, force_size: bool) -> Result<Option<u64>> {
        if self.mode() != Mode::BinaryInput || !self.skip_possible(force_size) {
            return Ok(None);
        }
        let endian = self.info.endianness();
        let input = self.input()?;
        let start = input.cursor()?;
        let size = u32::read_binary(endian, &mut *input)?;
        Ok(Some(start + u64::from(size)))
    }

    /// Jumps over the rest of the current node.
    pub(crate) fn skip(&mut self, next: Option<u64>) -> Result<()> {
        match (&mut self.io, next) {
            (Io::BinaryInput(input), Some(next)) => input.move_cursor(next),
            (Io::BinaryInput(_), None) => Err(Error::fail(
                "nodes without size information cannot be skipped",
            )),
            _ => Ok(()),
        }
    }

    /// Appends `count` empty text children; returns the index of the first.
    pub(crate) fn allocate_children(&mut self, count: usize) -> Result<usize> {
        let node = self.current_text_output()?;
        let offset = node.children.len();
        node.children.try_reserve(count)?;
        node.children.resize_with(offset + count, Node::default);
        Ok(offset)
    }
}
