use super::Reducer;
use crate::{channels::Channel, node::NodePartial, state::ThreadState};

/// Shallow merge into the extra channel: each key in the update overwrites
/// the existing entry (last-writer-wins). The version bumps once per merge
/// that carried any keys.
#[derive(Debug, PartialEq, Clone, Hash, Eq)]
pub struct MapMerge;

impl Reducer for MapMerge {
    fn apply(&self, state: &mut ThreadState, update: &NodePartial) {
        if let Some(extras_update) = &update.extra
            && !extras_update.is_empty()
        {
            let state_map = state.extra.get_mut();
            for (k, v) in extras_update.iter() {
                state_map.insert(k.clone(), v.clone());
            }
            state.extra.bump_version();
        }
    }
}
