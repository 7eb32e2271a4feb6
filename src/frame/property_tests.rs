//! Property-based tests for the frame tree
//!
//! Random operation sequences must keep the tree well formed and must
//! never create or lose windows except through explicit removal.

use super::navigation::resolve;
use super::*;
use crate::geometry::Direction;
use crate::identity::{RawHandle, TableResolver, WindowRegistry};
use crate::window::HeadlessWindow;
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Split(Axis),
    Close,
    Navigate(Direction),
    Move(Direction),
    Add,
    RemoveActive,
    Next,
    Previous,
    Resize(u32, u32),
}

fn direction() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Left),
        Just(Direction::Right),
        Just(Direction::Up),
        Just(Direction::Down),
    ]
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop_oneof![Just(Axis::Vertical), Just(Axis::Horizontal)].prop_map(Op::Split),
        2 => Just(Op::Close),
        3 => direction().prop_map(Op::Navigate),
        2 => direction().prop_map(Op::Move),
        3 => Just(Op::Add),
        1 => Just(Op::RemoveActive),
        1 => Just(Op::Next),
        1 => Just(Op::Previous),
        1 => (200u32..4000, 200u32..3000).prop_map(|(w, h)| Op::Resize(w, h)),
    ]
}

struct Harness {
    tree: FrameTree,
    active: FrameId,
    resolver: Arc<TableResolver>,
    registry: WindowRegistry,
    next: u64,
    expected_windows: usize,
}

impl Harness {
    fn new() -> Self {
        let resolver = Arc::new(TableResolver::new());
        let registry = WindowRegistry::new(resolver.clone());
        let tree = FrameTree::new(Rect::new(0, 0, 1920, 1080), DecorationStyle::default());
        let active = tree.root();
        Self {
            tree,
            active,
            resolver,
            registry,
            next: 0,
            expected_windows: 0,
        }
    }

    fn apply(&mut self, op: &Op) {
        match op {
            Op::Split(axis) => {
                if let Ok(child) = self.tree.split(self.active, *axis) {
                    self.active = child;
                }
            }
            Op::Close => {
                if let Ok(parent) = self.tree.close(self.active) {
                    self.active = parent;
                }
            }
            Op::Navigate(direction) => {
                if let Some(target) = resolve(&self.tree, self.active, *direction) {
                    self.active = target;
                }
            }
            Op::Move(direction) => {
                let window = self.tree.node(self.active).and_then(|n| n.active_window().cloned());
                if let (Some(window), Some(target)) = (window, resolve(&self.tree, self.active, *direction)) {
                    if self.tree.move_window(&window, self.active, target).is_ok() {
                        self.active = target;
                    }
                }
            }
            Op::Add => {
                self.next += 1;
                let handle = RawHandle(self.next);
                self.resolver.insert(handle, Some(1), Some(self.next));
                let identity = self.registry.get_or_register(handle).unwrap();
                let window = WindowRef::new(identity, Arc::new(HeadlessWindow::new(self.next, "w")));
                if self.tree.add_window(self.active, window, true).unwrap() {
                    self.expected_windows += 1;
                }
            }
            Op::RemoveActive => {
                let window = self.tree.node(self.active).and_then(|n| n.active_window().map(WindowRef::id));
                if let Some(id) = window {
                    assert!(self.tree.remove_window(self.active, id));
                    self.expected_windows -= 1;
                }
            }
            Op::Next => {
                self.tree.next_window(self.active);
            }
            Op::Previous => {
                self.tree.previous_window(self.active);
            }
            Op::Resize(w, h) => self.tree.resize_root(Rect::new(0, 0, *w, *h)),
        }
    }
}

proptest! {
    #[test]
    fn prop_tree_stays_well_formed(ops in prop::collection::vec(op(), 1..80)) {
        let mut h = Harness::new();
        for op in &ops {
            h.apply(op);
            prop_assert!(h.tree.validate().is_ok(), "{:?} after {:?}", h.tree.validate(), op);
            prop_assert!(h.tree.node(h.active).map(FrameNode::is_leaf).unwrap_or(false));
            for id in h.tree.leaves() {
                let node = h.tree.node(id).unwrap();
                prop_assert!(node.children().is_none());
            }
        }
    }

    #[test]
    fn prop_windows_are_conserved(ops in prop::collection::vec(op(), 1..80)) {
        let mut h = Harness::new();
        for op in &ops {
            h.apply(op);
            prop_assert_eq!(h.tree.window_count(), h.expected_windows);
        }
        prop_assert!(h.tree.take_stale().is_empty());
    }

    #[test]
    fn prop_split_close_round_trip_preserves_stack(count in 0usize..6, axis in prop_oneof![Just(Axis::Vertical), Just(Axis::Horizontal)]) {
        let mut h = Harness::new();
        for _ in 0..count {
            h.apply(&Op::Add);
        }
        let root = h.tree.root();
        let before: Vec<IdentityId> = h.tree.node(root).unwrap().windows().iter().map(WindowRef::id).collect();
        let before_rect = h.tree.node(root).unwrap().rect();

        let child = h.tree.split(root, axis).unwrap();
        let back = h.tree.close(child).unwrap();
        prop_assert_eq!(back, root);
        let after: Vec<IdentityId> = h.tree.node(root).unwrap().windows().iter().map(WindowRef::id).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(h.tree.node(root).unwrap().rect(), before_rect);
    }
}
