#![forbid(unsafe_code)]

//! Node identity and payloads.

use smallvec::SmallVec;

/// Identity of a node within one [`Dom`](crate::Dom).
///
/// An id names an arena slot plus the generation the slot had when the node
/// was created. Released slots are reused under a new generation, so an id
/// that outlived its node never aliases the node that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    #[must_use]
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Raw arena slot.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.index
    }

    /// How many times the slot had been released before this node.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.index as usize
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// An element with a tag name and attributes in insertion order.
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    /// A text node.
    Text(String),
    /// A comment; the renderer uses these as anchors.
    Comment(String),
}

impl NodeKind {
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }

    /// Short label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Element { tag, .. } => tag,
            Self::Text(_) => "#text",
            Self::Comment(_) => "#comment",
        }
    }
}

/// Identity of a registered event listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

pub(crate) type Handler = std::rc::Rc<dyn Fn(&crate::Event)>;

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) handler: Handler,
}

/// Arena slot for one node.
pub(crate) struct NodeData {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: SmallVec<[NodeId; 4]>,
    pub(crate) listeners: Vec<Listener>,
}

impl NodeData {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: SmallVec::new(),
            listeners: Vec::new(),
        }
    }
}
