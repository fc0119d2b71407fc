use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::{
    node::NodePartial,
    reducers::{AddMessages, MapMerge, Reducer, ReducerError},
    state::ThreadState,
    types::ChannelType,
};
use tracing::instrument;

/// Maps each channel to the reducers that merge deltas into it.
///
/// The default registry wires messages to [`AddMessages`] and extra data to
/// [`MapMerge`], which is what the engine uses unless a custom registry is
/// supplied at graph build time.
#[derive(Clone)]
pub struct ReducerRegistry {
    reducer_map: FxHashMap<ChannelType, Vec<Arc<dyn Reducer>>>,
}

/// Guard that checks whether a NodePartial actually has meaningful data
/// for the specified channel, so the registry can skip invoking reducers
/// when there is nothing to do.
fn channel_guard(channel: &ChannelType, partial: &NodePartial) -> bool {
    match channel {
        ChannelType::Messages => partial
            .messages
            .as_ref()
            .map(|v| !v.is_empty())
            .unwrap_or(false),
        ChannelType::Extra => partial
            .extra
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false),
    }
}

impl Default for ReducerRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry
            .register(ChannelType::Messages, Arc::new(AddMessages))
            .register(ChannelType::Extra, Arc::new(MapMerge));
        registry
    }
}

impl ReducerRegistry {
    /// Creates a new empty reducer registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reducer_map: FxHashMap::default(),
        }
    }

    /// Registers a reducer for a specific channel type.
    ///
    /// Multiple reducers can be registered for the same channel and are
    /// applied in registration order.
    pub fn register(&mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> &mut Self {
        self.reducer_map.entry(channel).or_default().push(reducer);
        self
    }

    /// Builder-style method for registering a reducer.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use stepflow::reducers::{ReducerRegistry, AddMessages};
    /// use stepflow::types::ChannelType;
    ///
    /// let registry = ReducerRegistry::new()
    ///     .with_reducer(ChannelType::Messages, Arc::new(AddMessages));
    /// ```
    #[must_use]
    pub fn with_reducer(mut self, channel: ChannelType, reducer: Arc<dyn Reducer>) -> Self {
        self.register(channel, reducer);
        self
    }

    #[instrument(skip(self, state, to_update), err)]
    pub fn try_update(
        &self,
        channel_type: ChannelType,
        state: &mut ThreadState,
        to_update: &NodePartial,
    ) -> Result<(), ReducerError> {
        // Skip if the partial has no applicable data for this channel.
        if !channel_guard(&channel_type, to_update) {
            return Ok(());
        }

        if let Some(reducers) = self.reducer_map.get(&channel_type) {
            for reducer in reducers {
                reducer.apply(state, to_update);
            }
            Ok(())
        } else {
            Err(ReducerError::UnknownChannel(channel_type))
        }
    }

    #[instrument(skip(self, state, update), err)]
    pub fn apply_all(
        &self,
        state: &mut ThreadState,
        update: &NodePartial,
    ) -> Result<(), ReducerError> {
        // Iterate all registered channels; try_update skips via guard when
        // the partial carries nothing for a channel.
        for channel in self.reducer_map.keys() {
            self.try_update(channel.clone(), state, update)?;
        }
        Ok(())
    }
}
