//! The reflection tree of one call.

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::slice;

use crate::controller::{Controller, SerializationOptions};
use crate::names::{node_names, positional};
use crate::parameter::{ContainerOp, ParameterRef};
use crate::stream::{InputStream, OutputStream};
use crate::text::Node;
use crate::{Error, Event, Info, Reflect, Result};

type Callback<'a> = Box<dyn FnMut(Event) -> Result<()> + 'a>;

// -----------------------------------------------------------------------------
// Snapshot

/// A tree of named nodes, one per reflected value.
///
/// Capturing an object creates its parameter and reflects its children,
/// recursively. The snapshot exclusively borrows the object for `'a`; it is
/// built for one call and dropped afterwards.
///
/// All nodes of a tree share one [`Info`] record.
///
/// # Examples
///
/// ```
/// use ut_meta::{Reflect, Snapshot};
///
/// #[derive(Reflect, Default)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// let mut points = vec![Point { x: 1, y: 2 }, Point::default()];
/// let snapshot = Snapshot::capture(&mut points).unwrap();
///
/// assert_eq!(snapshot.type_name(), "array");
/// assert_eq!(snapshot.len(), 2);
/// assert_eq!(snapshot.children()[0].name(), "p0");
/// assert_eq!(snapshot.children()[0].find_child("y").unwrap().type_name(), "int32");
/// ```
pub struct Snapshot<'a> {
    name: String,
    type_name: Cow<'static, str>,
    id: u32,
    parameter: ParameterRef<'a>,
    info: Rc<RefCell<Info>>,
    children: Vec<Snapshot<'a>>,
    callbacks: Vec<Callback<'a>>,
}

impl<'a> Snapshot<'a> {
    /// Captures `object` as a root named `snapshot`, with the complete
    /// [`Info`] preset.
    #[inline]
    pub fn capture<T: Reflect + ?Sized>(object: &'a mut T) -> Result<Self> {
        Self::capture_with(object, node_names::SNAPSHOT, Info::default())
    }

    /// Captures `object` as a root named `name`.
    pub fn capture_with<T: Reflect + ?Sized>(
        object: &'a mut T,
        name: impl Into<String>,
        info: Info,
    ) -> Result<Self> {
        Self::node(object.parameter(), name.into(), Rc::new(RefCell::new(info)))
    }

    fn node(parameter: ParameterRef<'a>, name: String, info: Rc<RefCell<Info>>) -> Result<Self> {
        let type_name = parameter
            .try_borrow()
            .map_err(|_| Error::fail(format!("parameter of `{name}` is in use")))?
            .type_name();
        let mut node = Self {
            name,
            type_name,
            id: 0,
            parameter,
            info,
            children: Vec::new(),
            callbacks: Vec::new(),
        };
        node.reflect_children()?;
        Ok(node)
    }

    // -------------------------------------------------------------------------
    // Building

    /// Adds `object` as a child named `name`.
    pub fn add<T: Reflect + ?Sized>(
        &mut self,
        object: &'a mut T,
        name: impl Into<String>,
    ) -> Result<&mut Self> {
        self.add_parameter(object.parameter(), name)
    }

    /// Adds `object` as a child named after its position: `p0`, `p1`, ...
    pub fn push<T: Reflect + ?Sized>(&mut self, object: &'a mut T) -> Result<&mut Self> {
        let name = positional(self.children.len());
        self.attach(object.parameter(), name)
    }

    /// Adds a child observing a custom parameter.
    pub fn add_parameter(
        &mut self,
        parameter: ParameterRef<'a>,
        name: impl Into<String>,
    ) -> Result<&mut Self> {
        let name = name.into();
        #[cfg(feature = "debug")]
        if self.find_child(&name).is_some() {
            return Err(Error::fail(format!(
                "`{}` already has a child named `{name}`",
                self.name
            )));
        }
        self.attach(parameter, name)
    }

    /// Adds a child whose name is known to be unique.
    pub(crate) fn attach(&mut self, parameter: ParameterRef<'a>, name: String) -> Result<&mut Self> {
        let child = Self::node(parameter, name, self.info.clone())?;
        self.children.try_reserve(1)?;
        self.children.push(child);
        Ok(self)
    }

    /// Drops every child.
    pub fn reset_children(&mut self) {
        self.children.clear();
    }

    /// Asks the parameter to register its children again.
    pub fn reflect_children(&mut self) -> Result<()> {
        let parameter = self.parameter.clone();
        let mut parameter = parameter
            .try_borrow_mut()
            .map_err(|_| Error::fail(format!("parameter of `{}` is in use", self.name)))?;
        parameter.reflect(self)
    }

    /// Registers a closure run at every [`Event`] reaching this node, after
    /// the parameter's own handler.
    pub fn set_callback(&mut self, callback: impl FnMut(Event) -> Result<()> + 'a) {
        self.callbacks.push(Box::new(callback));
    }

    /// Applies a container operation and reflects the children again.
    pub fn edit(&mut self, op: ContainerOp) -> Result<()> {
        self.parameter
            .try_borrow_mut()
            .map_err(|_| Error::fail(format!("parameter of `{}` is in use", self.name)))?
            .edit(op)?;
        self.reset_children();
        self.reflect_children()
    }

    // -------------------------------------------------------------------------
    // Events

    /// Sends `event` to the whole tree.
    ///
    /// Pre events reach parents before children, post events children
    /// before parents. Nodes whose children may change are reflected again
    /// after [`Event::PostLoad`].
    pub fn dispatch(&mut self, event: Event) -> Result<()> {
        if event.is_pre() {
            self.notify(event)?;
        }
        for child in &mut self.children {
            child.dispatch(event)?;
        }
        if !event.is_pre() {
            self.notify(event)?;
            if event == Event::PostLoad && self.is_dynamic() {
                self.reset_children();
                self.reflect_children()?;
            }
        }
        Ok(())
    }

    fn notify(&mut self, event: Event) -> Result<()> {
        self.parameter
            .try_borrow_mut()
            .map_err(|_| Error::fail(format!("parameter of `{}` is in use", self.name)))?
            .on_event(event)?;
        for callback in &mut self.callbacks {
            callback(event)?;
        }
        Ok(())
    }

    fn is_dynamic(&self) -> bool {
        self.parameter.try_borrow().is_ok_and(|p| p.is_dynamic())
    }

    // -------------------------------------------------------------------------
    // Accessors

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Type name of the observed value, e.g. `"int32"` or `"reflective"`.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Link id, `0` unless linkage info is on.
    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub(crate) fn set_id(&mut self, id: u32) {
        self.id = id;
    }

    #[inline]
    pub fn parameter(&self) -> &ParameterRef<'a> {
        &self.parameter
    }

    /// The settings shared by the whole tree.
    pub fn info(&self) -> Info {
        self.info.borrow().clone()
    }

    /// Replaces the settings of the whole tree.
    pub fn set_info(&mut self, info: Info) {
        *self.info.borrow_mut() = info;
    }

    #[inline]
    pub fn children(&self) -> &[Snapshot<'a>] {
        &self.children
    }

    #[inline]
    pub fn children_mut(&mut self) -> &mut [Snapshot<'a>] {
        &mut self.children
    }

    pub fn find_child(&self, name: &str) -> Option<&Snapshot<'a>> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn find_child_mut(&mut self, name: &str) -> Option<&mut Snapshot<'a>> {
        self.children.iter_mut().find(|c| c.name == name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> slice::Iter<'_, Snapshot<'a>> {
        self.children.iter()
    }

    // -------------------------------------------------------------------------
    // Shortcuts

    /// Writes the tree to a binary stream.
    pub fn save_binary(&mut self, output: &mut dyn OutputStream) -> Result<()> {
        Controller::binary_output(output).write_node(self, SerializationOptions::default())
    }

    /// Reads the tree from a binary stream.
    pub fn load_binary(&mut self, input: &mut dyn InputStream) -> Result<()> {
        Controller::binary_input(input)
            .read_node(self, SerializationOptions::default())
            .map(drop)
    }

    /// Writes the tree into `root`, which becomes the root node.
    pub fn save_text(&mut self, root: &mut Node) -> Result<()> {
        Controller::text_output(root).write_node(self, SerializationOptions::default())
    }

    /// Reads the tree from a text document.
    pub fn load_text(&mut self, root: &Node) -> Result<()> {
        Controller::text_input(root)
            .read_node(self, SerializationOptions::default())
            .map(drop)
    }
}

impl<'s, 'a> IntoIterator for &'s Snapshot<'a> {
    type Item = &'s Snapshot<'a>;
    type IntoIter = slice::Iter<'s, Snapshot<'a>>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for Snapshot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("id", &self.id)
            .field("children", &self.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::string::String;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::Snapshot;
    use crate::{ContainerOp, ErrorKind, Event, Info, Reflect, Result};

    #[derive(Reflect, Default)]
    struct Inner {
        flag: bool,
    }

    #[derive(Reflect, Default)]
    struct Outer {
        inner: Inner,
        values: Vec<u16>,
    }

    #[test]
    fn tree_shape() {
        let mut outer = Outer {
            values: vec![1, 2, 3],
            ..Outer::default()
        };
        let snapshot = Snapshot::capture(&mut outer).unwrap();

        assert_eq!(snapshot.name(), "snapshot");
        assert_eq!(snapshot.type_name(), "reflective");
        let names: Vec<&str> = snapshot.iter().map(Snapshot::name).collect();
        assert_eq!(names, ["inner", "values"]);

        let values = snapshot.find_child("values").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values.children()[2].name(), "p2");
        assert_eq!(values.children()[2].type_name(), "uint16");
        assert_eq!(snapshot.find_child("inner").unwrap().len(), 1);
    }

    #[test]
    fn info_is_shared() {
        let mut outer = Outer::default();
        let mut snapshot = Snapshot::capture(&mut outer).unwrap();
        snapshot.set_info(Info::pure());

        let inner = snapshot.find_child("inner").unwrap();
        assert_eq!(inner.info(), Info::pure());
    }

    #[test]
    fn edit_reflects_again() {
        let mut values: Vec<String> = Vec::new();
        let mut snapshot = Snapshot::capture(&mut values).unwrap();
        snapshot.edit(ContainerOp::Push).unwrap();
        snapshot.edit(ContainerOp::Push).unwrap();
        assert_eq!(snapshot.len(), 2);

        snapshot.edit(ContainerOp::Remove(0)).unwrap();
        assert_eq!(snapshot.len(), 1);
        let error = snapshot.edit(ContainerOp::Remove(4)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::OutOfBounds);
        drop(snapshot);
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn pre_events_parent_first_post_events_children_first() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut outer = Outer::default();
        let mut snapshot = Snapshot::capture(&mut outer).unwrap();

        let sink = order.clone();
        snapshot.set_callback(move |event| -> Result<()> {
            sink.borrow_mut().push(("outer", event));
            Ok(())
        });
        let sink = order.clone();
        snapshot
            .find_child_mut("inner")
            .unwrap()
            .set_callback(move |event| -> Result<()> {
                sink.borrow_mut().push(("inner", event));
                Ok(())
            });

        snapshot.dispatch(Event::PreSave).unwrap();
        snapshot.dispatch(Event::PostSave).unwrap();
        assert_eq!(
            *order.borrow(),
            [
                ("outer", Event::PreSave),
                ("inner", Event::PreSave),
                ("inner", Event::PostSave),
                ("outer", Event::PostSave),
            ]
        );
    }

    #[test]
    fn rename_root() {
        let mut value = 5u8;
        let mut snapshot = Snapshot::capture(&mut value).unwrap();
        snapshot.rename("level");
        assert_eq!(snapshot.name(), "level");
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.id(), 0);
    }
}
