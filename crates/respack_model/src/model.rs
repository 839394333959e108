//! Traits implemented by models that live in a [`ModelGraph`].

use std::sync::Arc;

use respack_common::ModelId;

use crate::buffer::BufferOptions;
use crate::error::ModelError;
use crate::graph::ModelGraph;

/// A mutable entity with a node in the ownership graph.
///
/// Implementors list the fields that invalidate their cache in
/// [`WATCHED`](Model::WATCHED) and write those fields only through
/// [`Model::write_watched`].
pub trait Model {
    /// Names of the fields whose mutation clears the cached buffer.
    const WATCHED: &'static [&'static str];

    /// The node backing this model.
    fn model_id(&self) -> ModelId;

    /// Returns the current owner.
    fn owner(&self, graph: &ModelGraph) -> Option<ModelId> {
        graph.owner(self.model_id())
    }

    /// Moves the model under `owner`, or detaches it.
    fn set_owner(&self, graph: &mut ModelGraph, owner: Option<ModelId>) {
        graph.set_owner(self.model_id(), owner);
    }

    /// Returns `true` if the model has no cached buffer.
    fn has_changed(&self, graph: &ModelGraph) -> bool {
        graph.has_changed(self.model_id())
    }

    /// Clears the cached buffer of the model and its ancestors.
    fn uncache(&self, graph: &mut ModelGraph) {
        graph.uncache(self.model_id());
    }

    /// Clears the model, its ancestors, and all of its descendants.
    fn deep_uncache(&self, graph: &mut ModelGraph) {
        graph.deep_uncache(self.model_id());
    }

    /// Writes a watched field, uncaching `id` when the value changes.
    ///
    /// `property` must be listed in [`WATCHED`](Model::WATCHED); debug builds
    /// assert it.
    fn write_watched<T: PartialEq>(
        graph: &mut ModelGraph,
        id: ModelId,
        property: &'static str,
        slot: &mut T,
        value: T,
    ) -> bool
    where
        Self: Sized,
    {
        debug_assert!(
            Self::WATCHED.contains(&property),
            "`{property}` is not a watched property"
        );
        graph.set_watched(id, slot, value)
    }
}

/// A model with a binary form whose bytes are memoized in the graph.
pub trait Serializable: Model {
    /// Writes the model's binary form.
    ///
    /// Implementations embedding child models should obtain their bytes with
    /// the child's [`get_buffer`](Serializable::get_buffer) so they are cached too.
    fn serialize(&self, graph: &mut ModelGraph) -> Result<Vec<u8>, ModelError>;

    /// Returns the cached binary form, serializing only when it changed.
    fn get_buffer(
        &self,
        graph: &mut ModelGraph,
        options: BufferOptions,
    ) -> Result<Arc<[u8]>, ModelError> {
        graph.buffer(self.model_id(), options, |graph| self.serialize(graph))
    }
}

/// Values that may be stored in a tracked collection.
///
/// Values that are models return their node so the collection can re-parent
/// them; plain data keeps the default `None`.
pub trait GraphNode {
    /// The graph node of this value, if it is a model.
    fn graph_node(&self) -> Option<ModelId> {
        None
    }
}

impl GraphNode for ModelId {
    fn graph_node(&self) -> Option<ModelId> {
        Some(*self)
    }
}

impl<T: GraphNode> GraphNode for Box<T> {
    fn graph_node(&self) -> Option<ModelId> {
        (**self).graph_node()
    }
}

impl<T: GraphNode> GraphNode for Option<T> {
    fn graph_node(&self) -> Option<ModelId> {
        self.as_ref().and_then(GraphNode::graph_node)
    }
}

macro_rules! plain_graph_node {
    ($($ty:ty),* $(,)?) => {
        $(impl GraphNode for $ty {})*
    };
}

plain_graph_node!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, &'static str, Vec<u8>,
);

#[cfg(test)]
mod tests {
    use super::*;

    struct Tunable {
        id: ModelId,
        name: String,
        value: u32,
    }

    impl Model for Tunable {
        const WATCHED: &'static [&'static str] = &["name", "value"];

        fn model_id(&self) -> ModelId {
            self.id
        }
    }

    impl Tunable {
        fn set_value(&mut self, graph: &mut ModelGraph, value: u32) -> bool {
            Self::write_watched(graph, self.id, "value", &mut self.value, value)
        }
    }

    impl Serializable for Tunable {
        fn serialize(&self, _graph: &mut ModelGraph) -> Result<Vec<u8>, ModelError> {
            let mut out = self.name.as_bytes().to_vec();
            out.extend_from_slice(&self.value.to_le_bytes());
            Ok(out)
        }
    }

    fn tunable(graph: &mut ModelGraph) -> Tunable {
        Tunable {
            id: graph.insert(None),
            name: "max".to_string(),
            value: 1,
        }
    }

    #[test]
    fn get_buffer_serializes_and_caches() {
        let mut graph = ModelGraph::new();
        let t = tunable(&mut graph);
        assert!(t.has_changed(&graph));
        let bytes = t.get_buffer(&mut graph, BufferOptions::default()).unwrap();
        assert_eq!(&bytes[..], b"max\x01\0\0\0");
        assert!(!t.has_changed(&graph));
    }

    #[test]
    fn no_op_write_keeps_identical_buffer() {
        let mut graph = ModelGraph::new();
        let mut t = tunable(&mut graph);
        let before = t.get_buffer(&mut graph, BufferOptions::default()).unwrap();
        assert!(!t.set_value(&mut graph, 1));
        let after = t.get_buffer(&mut graph, BufferOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn changed_write_reserializes() {
        let mut graph = ModelGraph::new();
        let mut t = tunable(&mut graph);
        let before = t.get_buffer(&mut graph, BufferOptions::default()).unwrap();
        assert!(t.set_value(&mut graph, 2));
        assert!(t.has_changed(&graph));
        let after = t.get_buffer(&mut graph, BufferOptions::default()).unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn owner_roundtrip_through_trait() {
        let mut graph = ModelGraph::new();
        let parent = graph.insert(None);
        let t = tunable(&mut graph);
        t.set_owner(&mut graph, Some(parent));
        assert_eq!(t.owner(&graph), Some(parent));
        t.set_owner(&mut graph, None);
        assert_eq!(graph.children(parent).count(), 0);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not a watched property")]
    fn undeclared_property_panics_in_debug() {
        let mut graph = ModelGraph::new();
        let mut t = tunable(&mut graph);
        let id = t.id;
        Tunable::write_watched(&mut graph, id, "label", &mut t.name, "x".to_string());
    }

    #[test]
    fn graph_node_defaults() {
        assert_eq!(7u32.graph_node(), None);
        assert_eq!("text".to_string().graph_node(), None);
        let id = ModelId::from_raw(4);
        assert_eq!(id.graph_node(), Some(id));
        assert_eq!(Some(id).graph_node(), Some(id));
        assert_eq!(Box::new(id).graph_node(), Some(id));
    }
}
