//! Property tests: index slots and selection snapshots under random edits.

use proptest::prelude::*;
use stage_core::{Scene, ShapeConfig, ShapeId, Square, StageError};
use stage_editor::{Selection, ShapeIndex};
use std::collections::{HashMap, HashSet};

const POOL: usize = 5;

// ─── Index slots ─────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum SlotOp {
    Add(usize),
    Remove(usize),
}

fn slot_op() -> impl Strategy<Value = SlotOp> {
    prop_oneof![
        (0..POOL).prop_map(SlotOp::Add),
        (0..POOL).prop_map(SlotOp::Remove),
    ]
}

#[derive(Clone, Debug)]
enum SceneOp {
    Attach(usize),
    Detach(usize),
    /// Empty the slot while the shape stays in the scene.
    Forget(usize),
    /// Re-add a forgotten shape that is still in the scene.
    Restore(usize),
}

fn scene_op() -> impl Strategy<Value = SceneOp> {
    prop_oneof![
        (0..POOL).prop_map(SceneOp::Attach),
        (0..POOL).prop_map(SceneOp::Detach),
        (0..POOL).prop_map(SceneOp::Forget),
        (0..POOL).prop_map(SceneOp::Restore),
    ]
}

fn overlapping_squares(scene: &mut Scene) -> Vec<ShapeId> {
    (0..POOL)
        .map(|i| {
            scene
                .create(
                    Square::new(i as f64 * 10.0, 0.0, 50.0),
                    ShapeConfig::default(),
                )
                .unwrap()
        })
        .collect()
}

proptest! {
    /// A live id cannot be added twice, a never-seen id cannot be removed,
    /// and an id keeps its first slot forever.
    #[test]
    fn slots_follow_the_model(ops in prop::collection::vec(slot_op(), 1..60)) {
        let ids: Vec<ShapeId> = (0..POOL).map(|_| ShapeId::next()).collect();
        let mut index = ShapeIndex::new("main");
        let mut live = HashSet::new();
        let mut first_slot: HashMap<ShapeId, usize> = HashMap::new();

        for op in &ops {
            match *op {
                SlotOp::Add(i) => {
                    let id = ids[i];
                    let result = index.add(id);
                    if live.contains(&id) {
                        prop_assert!(matches!(result, Err(StageError::InvariantViolation(_))));
                    } else {
                        prop_assert!(result.is_ok());
                        live.insert(id);
                        let slot = index.slot_of(id).unwrap();
                        prop_assert_eq!(*first_slot.entry(id).or_insert(slot), slot);
                    }
                }
                SlotOp::Remove(i) => {
                    let id = ids[i];
                    let result = index.remove(id);
                    if first_slot.contains_key(&id) {
                        prop_assert!(result.is_ok());
                        live.remove(&id);
                    } else {
                        prop_assert!(result.is_err());
                    }
                }
            }
            prop_assert_eq!(index.len(), live.len());
            for id in &ids {
                prop_assert_eq!(index.contains(*id), live.contains(id));
            }
        }
    }

    /// Hit testing never returns a shape whose slot is empty.
    #[test]
    fn hits_only_land_on_live_slots(ops in prop::collection::vec(scene_op(), 1..40)) {
        let mut scene = Scene::new();
        let ids = overlapping_squares(&mut scene);
        let mut index = ShapeIndex::attach(&mut scene, "main").unwrap();

        for op in &ops {
            match *op {
                SceneOp::Attach(i) => {
                    scene.add(ids[i]).unwrap();
                }
                SceneOp::Detach(i) => {
                    scene.remove_from_parent(ids[i]).unwrap();
                }
                SceneOp::Forget(i) => {
                    if index.contains(ids[i]) {
                        index.remove(ids[i]).unwrap();
                    }
                }
                SceneOp::Restore(i) => {
                    let id = ids[i];
                    if scene.get(id).unwrap().is_in_scene() && !index.contains(id) {
                        index.add(id).unwrap();
                    }
                }
            }
            for x in (5..95).step_by(10) {
                if let Some(hit) = index.shape_at(&scene, f64::from(x), 25.0).unwrap() {
                    prop_assert!(index.contains(hit));
                    prop_assert!(scene.get(hit).unwrap().is_in_scene());
                }
            }
        }
    }
}

// ─── Selection snapshots ─────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum SelectOp {
    Add(usize),
    Remove(usize),
    Toggle(usize),
    Clear,
    Checkpoint,
    Group,
    Ungroup,
    Detach(usize),
    Prune,
}

fn select_op() -> impl Strategy<Value = SelectOp> {
    prop_oneof![
        (0..POOL).prop_map(SelectOp::Add),
        (0..POOL).prop_map(SelectOp::Remove),
        (0..POOL).prop_map(SelectOp::Toggle),
        Just(SelectOp::Clear),
        Just(SelectOp::Checkpoint),
        Just(SelectOp::Group),
        Just(SelectOp::Ungroup),
        (0..POOL).prop_map(SelectOp::Detach),
        Just(SelectOp::Prune),
    ]
}

proptest! {
    /// Every member has exactly one saved snapshot and nothing else does.
    #[test]
    fn snapshots_match_members(ops in prop::collection::vec(select_op(), 1..40)) {
        let mut scene = Scene::new();
        let ids = overlapping_squares(&mut scene);
        for id in &ids {
            scene.add(*id).unwrap();
        }
        let mut selection = Selection::new("edit");

        for op in &ops {
            match *op {
                SelectOp::Add(i) => {
                    if scene.get(ids[i]).unwrap().is_in_scene() {
                        selection.add(&mut scene, ids[i]).unwrap();
                    }
                }
                SelectOp::Remove(i) => {
                    selection.remove(&mut scene, ids[i]).unwrap();
                }
                SelectOp::Toggle(i) => {
                    if scene.get(ids[i]).unwrap().is_in_scene() {
                        selection.toggle(&mut scene, ids[i]).unwrap();
                    }
                }
                SelectOp::Clear => {
                    selection.clear(&mut scene).unwrap();
                }
                SelectOp::Checkpoint => selection.checkpoint_shapes(&scene, None).unwrap(),
                SelectOp::Group => {
                    selection.group(&mut scene).unwrap();
                }
                SelectOp::Ungroup => {
                    selection.ungroup(&mut scene).unwrap();
                }
                SelectOp::Detach(i) => {
                    scene.remove_from_parent(ids[i]).unwrap();
                }
                SelectOp::Prune => selection.prune(&mut scene).unwrap(),
            }
            let members: HashSet<ShapeId> = selection.ids().iter().copied().collect();
            let saved: HashSet<ShapeId> = selection.saved_ids().collect();
            prop_assert_eq!(members.len(), selection.len());
            prop_assert_eq!(members, saved);
        }
    }
}
