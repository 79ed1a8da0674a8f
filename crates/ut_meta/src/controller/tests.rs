use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::rc::{Rc, Weak};
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::ptr::NonNull;

use ut_utils::hash::HashMap;

use super::{Controller, Mode, SerializationOptions};
use crate::stream::{MemoryReader, MemoryWriter};
use crate::text::Node;
use crate::{
    Binary, ErrorKind, Event, Flags, Info, Polymorphic, Reflect, Registry, Result, Snapshot,
    impl_pointee, register,
};

// -----------------------------------------------------------------------------
// Helpers

fn to_binary<T: Reflect>(object: &mut T, info: Info) -> Vec<u8> {
    let mut writer = MemoryWriter::new();
    Snapshot::capture_with(object, "root", info)
        .unwrap()
        .save_binary(&mut writer)
        .unwrap();
    writer.into_inner()
}

fn from_binary<T: Reflect + Default>(bytes: &[u8]) -> T {
    let mut object = T::default();
    let mut reader = MemoryReader::new(bytes);
    Snapshot::capture(&mut object)
        .unwrap()
        .load_binary(&mut reader)
        .unwrap();
    object
}

fn to_text<T: Reflect>(object: &mut T, info: Info) -> Node {
    let mut root = Node::default();
    Snapshot::capture_with(object, "root", info)
        .unwrap()
        .save_text(&mut root)
        .unwrap();
    root
}

fn from_text<T: Reflect + Default>(root: &Node) -> T {
    let mut object = T::default();
    Snapshot::capture(&mut object)
        .unwrap()
        .load_text(root)
        .unwrap();
    object
}

/// An info record whose hook collects every message.
fn recording(info: Info) -> (Info, Rc<RefCell<Vec<String>>>) {
    let messages = Rc::new(RefCell::new(Vec::new()));
    let sink = messages.clone();
    let mut info = info;
    info.set_log_hook(move |m| sink.borrow_mut().push(m.to_string()));
    (info, messages)
}

fn presets() -> Vec<Info> {
    vec![
        Info::complete(),
        Info::minimal(),
        Info::pure(),
        Info::new(Flags::TYPE_INFO, Info::DEFAULT_VERSION),
        Info::new(Flags::LITTLE_ENDIAN | Flags::LINKAGE_INFO, 3),
    ]
}

// -----------------------------------------------------------------------------
// Fixtures

#[derive(Reflect, Default, Debug, Clone, PartialEq)]
struct Stats {
    hp: i32,
    speed: f32,
}

#[derive(Reflect, Default, Debug, PartialEq)]
struct Hero {
    name: String,
    level: u8,
    alive: bool,
    stats: Stats,
    tags: Vec<String>,
    grid: [u16; 3],
    bounds: (i64, f64),
    inventory: BTreeMap<String, u32>,
    pet: Option<Box<Stats>>,
    blob: Binary<u32>,
}

fn hero() -> Hero {
    Hero {
        name: "Ayla".into(),
        level: 12,
        alive: true,
        stats: Stats { hp: -5, speed: 1.25 },
        tags: vec!["fast".into(), String::new(), "brave".into()],
        grid: [7, 8, 9],
        bounds: (-40, 0.5),
        inventory: BTreeMap::from([("gold".into(), 300), ("arrow".into(), 12)]),
        pet: Some(Box::new(Stats { hp: 3, speed: 4.0 })),
        blob: vec![1, 0xdead_beef, u32::MAX].into(),
    }
}

// -----------------------------------------------------------------------------
// Round trips

#[test]
fn binary_round_trip_for_every_preset() {
    for info in presets() {
        let bytes = to_binary(&mut hero(), info.clone());
        let loaded: Hero = from_binary(&bytes);
        assert_eq!(loaded, hero(), "flags {:?}", info.flags());
    }
}

#[test]
fn text_round_trip_for_every_preset() {
    for info in presets() {
        let root = to_text(&mut hero(), info.clone());
        let loaded: Hero = from_text(&root);
        assert_eq!(loaded, hero(), "flags {:?}", info.flags());
    }
}

#[test]
fn saving_twice_is_identical() {
    for info in presets() {
        let first = to_binary(&mut hero(), info.clone());
        let second = to_binary(&mut hero(), info.clone());
        assert_eq!(first, second);

        assert_eq!(to_text(&mut hero(), info.clone()), to_text(&mut hero(), info));
    }
}

#[test]
fn text_tree_survives_serde_formats() {
    let root = to_text(&mut hero(), Info::complete());

    let json = serde_json::to_string(&root).unwrap();
    let loaded: Hero = from_text(&serde_json::from_str(&json).unwrap());
    assert_eq!(loaded, hero());

    let ron = ron::to_string(&root).unwrap();
    let loaded: Hero = from_text(&ron::from_str(&ron).unwrap());
    assert_eq!(loaded, hero());
}

#[test]
fn sequence_keeps_order() {
    let mut numbers = vec![1, 2, 3, 4, 5];

    let loaded: Vec<i32> = from_binary(&to_binary(&mut numbers, Info::complete()));
    assert_eq!(loaded, [1, 2, 3, 4, 5]);

    let root = to_text(&mut numbers, Info::complete());
    let elements = root.find_child("value").unwrap();
    let names: Vec<&str> = elements.data_children().map(|(_, n)| n.name.as_str()).collect();
    assert_eq!(names, ["p0", "p1", "p2", "p3", "p4"]);
    assert_eq!(from_text::<Vec<i32>>(&root), [1, 2, 3, 4, 5]);
}

#[test]
fn hash_map_round_trip() {
    let mut scores: HashMap<String, Stats> = HashMap::default();
    scores.insert("north".into(), Stats { hp: 1, speed: 2.0 });
    scores.insert("south".into(), Stats { hp: 3, speed: 4.0 });

    let loaded: HashMap<String, Stats> = from_binary(&to_binary(&mut scores, Info::minimal()));
    assert_eq!(loaded, scores);

    let loaded: HashMap<String, Stats> = from_text(&to_text(&mut scores, Info::complete()));
    assert_eq!(loaded, scores);
}

// -----------------------------------------------------------------------------
// Layout

#[test]
fn pure_layout_is_bare_values() {
    #[derive(Reflect, Default)]
    struct Pair {
        a: u16,
        b: u8,
    }

    let bytes = to_binary(&mut Pair { a: 1, b: 2 }, Info::pure());
    assert_eq!(bytes, [1, 0, 0, 0, 1, 0, 0, 0, 1, 0, 2]);
}

#[test]
fn minimal_layout_has_names_sizes_and_counts() {
    let bytes = to_binary(&mut 7u8, Info::minimal());
    let flags = Info::minimal().flags().bits() as u8;
    assert_eq!(
        bytes,
        [
            1, 0, 0, 0, flags, 0, 0, 0, // info
            b'r', b'o', b'o', b't', 0, // name
            9, 0, 0, 0, // size, from the size field to the end of the node
            7, // value
            0, 0, 0, 0, // child count
        ]
    );
}

#[test]
fn big_endian_scalars() {
    let bytes = to_binary(&mut 0x0102u16, Info::new(Flags::empty(), 1));
    assert_eq!(&bytes[8..], [1, 2]);
    assert_eq!(from_binary::<u16>(&bytes), 0x0102);
}

#[test]
fn binary_block_is_base64_in_text() {
    let mut blob: Binary<u16> = vec![1, 2].into();
    let root = to_text(&mut blob, Info::complete());

    assert_eq!(root.find_child("size").unwrap().value.as_deref(), Some("4"));
    let value = root.find_child("value").unwrap();
    assert_eq!(value.value.as_deref(), Some("AQACAA=="));
    assert_eq!(from_text::<Binary<u16>>(&root), blob);
}

#[test]
fn text_root_structure() {
    let root = to_text(&mut Stats { hp: 4, speed: 0.5 }, Info::complete());

    assert_eq!(root.name, "root");
    let info = root.find_child("info").unwrap();
    assert!(info.is_attribute);
    assert_eq!(info.find_child("version").unwrap().value.as_deref(), Some("1"));
    assert_eq!(root.find_child("type").unwrap().value.as_deref(), Some("reflective"));
    assert_eq!(root.find_child("id").unwrap().value.as_deref(), Some("1"));
    assert!(root.find_child("shared_objects").unwrap().children.is_empty());

    let hp = root.find_child("value").unwrap().find_child("hp").unwrap();
    assert_eq!(hp.find_child("type").unwrap().value.as_deref(), Some("int32"));
    assert_eq!(hp.find_child("value").unwrap().value.as_deref(), Some("4"));
}

// -----------------------------------------------------------------------------
// Version skew

#[derive(Reflect, Default)]
struct Before {
    count: u32,
    name: String,
}

#[derive(Reflect, Default)]
struct After {
    name: String,
}

#[derive(Reflect, Default)]
struct Retyped {
    count: f32,
    name: String,
}

#[derive(Reflect, Default)]
struct Reordered {
    name: String,
    extra: u64,
    count: u32,
}

#[test]
fn removed_field_is_skipped_silently() {
    let info = Info::new(
        Flags::LITTLE_ENDIAN | Flags::TYPE_INFO | Flags::BINARY_NAMES,
        1,
    );
    let bytes = to_binary(&mut Before { count: 3, name: "abc".into() }, info.clone());
    let root = to_text(&mut Before { count: 3, name: "abc".into() }, info);

    let (hook, messages) = recording(Info::complete());
    let mut after = After::default();
    let mut reader = MemoryReader::new(&bytes);
    Snapshot::capture_with(&mut after, "root", hook.clone())
        .unwrap()
        .load_binary(&mut reader)
        .unwrap();
    assert_eq!(after.name, "abc");

    let mut after = After::default();
    Snapshot::capture_with(&mut after, "root", hook)
        .unwrap()
        .load_text(&root)
        .unwrap();
    assert_eq!(after.name, "abc");
    assert!(messages.borrow().is_empty());
}

#[test]
fn reordered_and_added_fields_match_by_name() {
    let bytes = to_binary(&mut Before { count: 9, name: "x".into() }, Info::minimal());
    let loaded: Reordered = from_binary(&bytes);
    assert_eq!((loaded.count, loaded.name.as_str(), loaded.extra), (9, "x", 0));
}

#[test]
fn retyped_field_is_logged_and_skipped() {
    for text in [false, true] {
        let mut before = Before { count: 3, name: "abc".into() };
        let (hook, messages) = recording(Info::complete());
        let mut retyped = Retyped {
            count: 0.5,
            ..Retyped::default()
        };

        if text {
            let root = to_text(&mut before, Info::complete());
            Snapshot::capture_with(&mut retyped, "root", hook)
                .unwrap()
                .load_text(&root)
                .unwrap();
        } else {
            let bytes = to_binary(&mut before, Info::complete());
            let mut reader = MemoryReader::new(&bytes);
            Snapshot::capture_with(&mut retyped, "root", hook)
                .unwrap()
                .load_binary(&mut reader)
                .unwrap();
        }

        assert_eq!(retyped.count, 0.5);
        assert_eq!(retyped.name, "abc");
        let messages = messages.borrow();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("count"));
    }
}

#[test]
fn array_of_another_length_is_skipped() {
    #[derive(Reflect, Default)]
    struct Wide {
        grid: [u8; 4],
        tail: u8,
    }

    #[derive(Reflect, Default)]
    struct Narrow {
        grid: [u8; 2],
        tail: u8,
    }

    let bytes = to_binary(&mut Wide { grid: [1, 2, 3, 4], tail: 5 }, Info::complete());
    let (hook, messages) = recording(Info::complete());
    let mut narrow = Narrow::default();
    let mut reader = MemoryReader::new(&bytes);
    Snapshot::capture_with(&mut narrow, "root", hook)
        .unwrap()
        .load_binary(&mut reader)
        .unwrap();

    assert_eq!((narrow.grid, narrow.tail), ([0, 0], 5));
    assert_eq!(messages.borrow().len(), 1);
}

// -----------------------------------------------------------------------------
// Pointers

#[derive(Reflect, Default)]
struct Shared {
    first: Option<Rc<RefCell<u32>>>,
    second: Option<Rc<RefCell<u32>>>,
    missing: Option<Rc<RefCell<u32>>>,
}

#[test]
fn shared_owners_alias_one_instance() {
    let value = Rc::new(RefCell::new(42));
    let mut shared = Shared {
        first: Some(value.clone()),
        second: Some(value),
        missing: None,
    };

    let root = to_text(&mut shared, Info::complete());
    assert_eq!(root.find_child("shared_objects").unwrap().children.len(), 1);

    for loaded in [
        from_binary::<Shared>(&to_binary(&mut shared, Info::complete())),
        from_text::<Shared>(&root),
    ] {
        let first = loaded.first.unwrap();
        let second = loaded.second.unwrap();
        assert_eq!(*first.borrow(), 42);
        assert!(Rc::ptr_eq(&first, &second));
        assert!(loaded.missing.is_none());
    }
}

#[derive(Reflect, Default)]
struct Link {
    label: String,
    next: Option<Rc<RefCell<Link>>>,
}

#[derive(Reflect, Default)]
struct Ring {
    head: Option<Rc<RefCell<Link>>>,
}

#[test]
fn cycles_resolve_in_one_call() {
    let a = Rc::new(RefCell::new(Link {
        label: "a".into(),
        next: None,
    }));
    let b = Rc::new(RefCell::new(Link {
        label: "b".into(),
        next: Some(a.clone()),
    }));
    a.borrow_mut().next = Some(b.clone());
    let mut ring = Ring { head: Some(a.clone()) };

    let bytes = to_binary(&mut ring, Info::complete());
    let root = to_text(&mut ring, Info::complete());
    a.borrow_mut().next = None;

    for loaded in [from_binary::<Ring>(&bytes), from_text::<Ring>(&root)] {
        let head = loaded.head.unwrap();
        let second = head.borrow().next.clone().unwrap();
        let third = second.borrow().next.clone().unwrap();
        assert_eq!(head.borrow().label, "a");
        assert_eq!(second.borrow().label, "b");
        assert!(Rc::ptr_eq(&head, &third));
        head.borrow_mut().next = None;
    }
}

#[test]
fn pointers_without_linkage_fail() {
    let mut shared = Shared {
        first: Some(Rc::new(RefCell::new(1))),
        ..Shared::default()
    };
    let mut writer = MemoryWriter::new();
    let error = Snapshot::capture_with(&mut shared, "root", Info::minimal())
        .unwrap()
        .save_binary(&mut writer)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fail);
}

#[derive(Reflect, Default)]
struct Targets {
    values: Vec<u32>,
    first: u32,
    favorite: Option<NonNull<u32>>,
    element: Option<NonNull<u32>>,
}

#[test]
fn raw_pointers_point_into_the_loaded_graph() {
    let mut targets = Targets {
        values: vec![10, 20, 30],
        first: 5,
        ..Targets::default()
    };
    targets.favorite = Some(NonNull::from(&targets.first));
    targets.element = Some(NonNull::from(&targets.values[1]));

    for text in [false, true] {
        let mut loaded = Targets::default();
        if text {
            let root = to_text(&mut targets, Info::complete());
            Snapshot::capture(&mut loaded).unwrap().load_text(&root).unwrap();
        } else {
            let bytes = to_binary(&mut targets, Info::complete());
            let mut reader = MemoryReader::new(&bytes);
            Snapshot::capture(&mut loaded)
                .unwrap()
                .load_binary(&mut reader)
                .unwrap();
        }

        assert_eq!(loaded.favorite, Some(NonNull::from(&loaded.first)));
        assert_eq!(loaded.element, Some(NonNull::from(&loaded.values[1])));
    }
}

#[derive(Reflect, Default)]
struct Person {
    name: String,
}

#[derive(Reflect, Default)]
struct Family {
    parent: Option<Rc<RefCell<Person>>>,
    observer: Weak<RefCell<Person>>,
    stranger: Option<Weak<RefCell<Person>>>,
}

#[test]
fn weak_pointers_reattach_to_their_owner() {
    let parent = Rc::new(RefCell::new(Person { name: "Ada".into() }));
    let orphan = Rc::new(RefCell::new(Person { name: "Bob".into() }));
    let mut family = Family {
        parent: Some(parent.clone()),
        observer: Rc::downgrade(&parent),
        stranger: Some(Rc::downgrade(&orphan)),
    };

    let (info, messages) = recording(Info::complete());
    let bytes = to_binary(&mut family, info);
    assert_eq!(messages.borrow().len(), 1);

    let loaded: Family = from_binary(&bytes);
    let parent = loaded.parent.clone().unwrap();
    assert_eq!(parent.borrow().name, "Ada");
    assert!(Rc::ptr_eq(&parent, &loaded.observer.upgrade().unwrap()));
    assert!(loaded.stranger.is_none());
}

// -----------------------------------------------------------------------------
// Polymorphism

trait Shape: Polymorphic {
    fn area(&self) -> f32;
}

impl_pointee!(dyn Shape);

#[derive(Reflect, Polymorphic, Default)]
#[polymorphic(name = "circle")]
struct Circle {
    radius: f32,
}

impl Shape for Circle {
    fn area(&self) -> f32 {
        3.0 * self.radius * self.radius
    }
}

#[derive(Reflect, Polymorphic, Default)]
#[polymorphic(name = "rect")]
struct Rect {
    width: f32,
    height: f32,
}

impl Shape for Rect {
    fn area(&self) -> f32 {
        self.width * self.height
    }
}

#[derive(Reflect, Default)]
struct Drawing {
    shapes: Vec<Option<Box<dyn Shape>>>,
    highlighted: Option<Rc<RefCell<dyn Shape>>>,
}

#[test]
fn trait_objects_are_created_through_the_registry() {
    let mut registry = Registry::new();
    register!(registry, dyn Shape => Circle, Rect);

    let mut drawing = Drawing {
        shapes: vec![
            Some(Box::new(Circle { radius: 2.0 })),
            None,
            Some(Box::new(Rect { width: 2.0, height: 5.0 })),
        ],
        highlighted: Some(Rc::new(RefCell::new(Rect { width: 1.0, height: 3.0 }))),
    };
    let bytes = to_binary(&mut drawing, Info::complete());

    let mut loaded = Drawing::default();
    let mut snapshot = Snapshot::capture(&mut loaded).unwrap();
    let mut reader = MemoryReader::new(&bytes);
    Controller::binary_input(&mut reader)
        .with_registry(&registry)
        .read_node(&mut snapshot, SerializationOptions::default())
        .unwrap();
    drop(snapshot);

    let areas: Vec<Option<f32>> = loaded
        .shapes
        .iter()
        .map(|s| s.as_ref().map(|s| s.area()))
        .collect();
    assert_eq!(areas, [Some(12.0), None, Some(10.0)]);
    let highlighted = loaded.highlighted.unwrap();
    assert_eq!(highlighted.borrow().identify(), "rect");
    assert_eq!(highlighted.borrow().area(), 3.0);
}

#[test]
fn unregistered_trait_object_fails() {
    let mut drawing = Drawing {
        shapes: vec![Some(Box::new(Circle { radius: 1.0 }))],
        highlighted: None,
    };
    let root = to_text(&mut drawing, Info::complete());

    let mut loaded = Drawing::default();
    let error = Snapshot::capture(&mut loaded)
        .unwrap()
        .load_text(&root)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fail);
}

// -----------------------------------------------------------------------------
// Controller

#[test]
fn modes_are_exclusive() {
    let mut value = 1u8;
    let mut snapshot = Snapshot::capture(&mut value).unwrap();

    let mut writer = MemoryWriter::new();
    let mut controller = Controller::binary_output(&mut writer);
    assert_eq!(controller.mode(), Mode::BinaryOutput);
    let error = controller
        .read_node(&mut snapshot, SerializationOptions::default())
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fail);

    let error = Controller::new()
        .write_node(&mut snapshot, SerializationOptions::default())
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fail);
}

#[test]
fn initialize_and_only_uniforms_conflict() {
    let mut value = 1u8;
    let mut snapshot = Snapshot::capture(&mut value).unwrap();
    let root = Node::default();
    let options = SerializationOptions {
        only_uniforms: true,
        ..SerializationOptions::default()
    };
    let error = Controller::text_input(&root)
        .read_node(&mut snapshot, options)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Fail);
}

#[test]
fn uniforms_of_a_nested_node() {
    let mut stats = Stats { hp: 1, speed: 2.0 };
    let mut writer = MemoryWriter::new();
    let mut snapshot = Snapshot::capture_with(&mut stats, "stats", Info::complete()).unwrap();
    let options = SerializationOptions {
        initialize: false,
        ..SerializationOptions::default()
    };
    Controller::binary_output(&mut writer)
        .with_info(Info::minimal())
        .write_node(&mut snapshot, options)
        .unwrap();

    let mut other = Stats::default();
    let mut snapshot = Snapshot::capture(&mut other).unwrap();
    let mut reader = MemoryReader::new(writer.as_slice());
    let uniform = Controller::binary_input(&mut reader)
        .with_info(Info::minimal())
        .read_node(
            &mut snapshot,
            SerializationOptions {
                initialize: false,
                only_uniforms: true,
                force_size_info: false,
            },
        )
        .unwrap();
    drop(snapshot);

    assert_eq!(uniform.name.as_deref(), Some("stats"));
    assert_eq!(uniform.type_name, None);
    assert_eq!(uniform.next, Some(writer.as_slice().len() as u64));
    assert_eq!(reader.remaining(), &[] as &[u8]);
    assert_eq!(other, Stats::default());
}

#[test]
fn events_reach_aggregates() {
    #[derive(Reflect, Default)]
    #[reflect(on_event = "record")]
    struct Tracked {
        value: u8,
        #[reflect(skip)]
        seen: Vec<Event>,
    }

    impl Tracked {
        fn record(&mut self, event: Event) -> Result<()> {
            self.seen.push(event);
            Ok(())
        }
    }

    let mut tracked = Tracked::default();
    let bytes = to_binary(&mut tracked, Info::complete());
    assert_eq!(tracked.seen, [Event::PreSave, Event::PostSave]);

    let loaded: Tracked = from_binary(&bytes);
    assert_eq!(loaded.seen, [Event::PreLoad, Event::PostLoad]);
}

#[test]
fn nested_calls_with_linkage_info() {
    let nested = SerializationOptions {
        initialize: false,
        ..SerializationOptions::default()
    };
    let mut stats = Stats { hp: 7, speed: 1.5 };

    let mut writer = MemoryWriter::new();
    let mut root = Node::default();
    {
        let mut snapshot = Snapshot::capture_with(&mut stats, "stats", Info::complete()).unwrap();
        Controller::binary_output(&mut writer)
            .with_info(Info::complete())
            .write_node(&mut snapshot, nested)
            .unwrap();
        Controller::text_output(&mut root)
            .with_info(Info::complete())
            .write_node(&mut snapshot, nested)
            .unwrap();
    }
    assert_eq!(root.find_child("id").unwrap().value.as_deref(), Some("1"));

    let mut from_bytes = Stats::default();
    let mut snapshot = Snapshot::capture(&mut from_bytes).unwrap();
    let mut reader = MemoryReader::new(writer.as_slice());
    let uniform = Controller::binary_input(&mut reader)
        .with_info(Info::complete())
        .read_node(&mut snapshot, nested)
        .unwrap();
    drop(snapshot);
    assert_eq!(uniform.id, Some(1));
    assert!(uniform.type_name.is_some());
    assert_eq!(from_bytes, stats);

    let mut from_text = Stats::default();
    let mut snapshot = Snapshot::capture(&mut from_text).unwrap();
    let uniform = Controller::text_input(&root)
        .with_info(Info::complete())
        .read_node(&mut snapshot, nested)
        .unwrap();
    drop(snapshot);
    assert_eq!(uniform.name.as_deref(), Some("stats"));
    assert_eq!(from_text, stats);
}

#[test]
fn corrupt_counts_are_out_of_bounds() {
    // info (8), "root\0" (5) and the size field (4) precede the count.
    const COUNT: core::ops::Range<usize> = 17..21;

    let mut bytes = to_binary(&mut vec![1u32, 2, 3], Info::minimal());
    bytes[COUNT].copy_from_slice(&u32::MAX.to_le_bytes());
    let mut values: Vec<u32> = Vec::new();
    let mut reader = MemoryReader::new(&bytes);
    let error = Snapshot::capture(&mut values)
        .unwrap()
        .load_binary(&mut reader)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::OutOfBounds);
    assert!(values.is_empty());

    let mut scores: BTreeMap<String, u32> = BTreeMap::from([("a".into(), 1)]);
    let mut bytes = to_binary(&mut scores, Info::minimal());
    bytes[COUNT].copy_from_slice(&0x1000_0000u32.to_le_bytes());
    let mut loaded: BTreeMap<String, u32> = BTreeMap::new();
    let mut reader = MemoryReader::new(&bytes);
    let error = Snapshot::capture(&mut loaded)
        .unwrap()
        .load_binary(&mut reader)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::OutOfBounds);

    let mut root = to_text(&mut vec![1u32, 2, 3], Info::complete());
    root.find_child_mut("count").unwrap().value = Some("4000000000".into());
    let mut values: Vec<u32> = Vec::new();
    let error = Snapshot::capture(&mut values)
        .unwrap()
        .load_text(&root)
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::OutOfBounds);
}

#[derive(Reflect, Default)]
struct Bookmarks {
    count: u32,
    name: String,
    to_count: Option<NonNull<u32>>,
    to_name: Option<NonNull<String>>,
}

#[derive(Reflect, Default)]
struct RetypedBookmarks {
    count: f32,
    name: String,
    to_count: Option<NonNull<u32>>,
    to_name: Option<NonNull<String>>,
}

#[test]
fn unresolved_link_fails_alone() {
    let mut bookmarks = Bookmarks {
        count: 3,
        name: "abc".into(),
        ..Bookmarks::default()
    };
    bookmarks.to_count = Some(NonNull::from(&bookmarks.count));
    bookmarks.to_name = Some(NonNull::from(&bookmarks.name));
    let bytes = to_binary(&mut bookmarks, Info::complete());

    let (hook, messages) = recording(Info::complete());
    let mut retyped = RetypedBookmarks::default();
    let mut reader = MemoryReader::new(&bytes);
    let error = Snapshot::capture_with(&mut retyped, "root", hook)
        .unwrap()
        .load_binary(&mut reader)
        .unwrap_err();

    // Ids: root 1, count 2, name 3.
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert!(error.message().contains("id 2"), "{error}");
    assert_eq!(retyped.name, "abc");
    assert!(retyped.to_count.is_none());
    assert_eq!(retyped.to_name, Some(NonNull::from(&retyped.name)));

    let messages = messages.borrow();
    assert!(messages.iter().any(|m| m.contains("skipped")));
    assert!(messages.iter().any(|m| m.contains("link failed")));
}
