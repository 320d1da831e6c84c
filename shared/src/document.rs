use std::fmt;

/// Index of a node inside a [`MapDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element(Element),
    /// Raw character data, entities left undecoded.
    Text(String),
    Comment(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    /// Attributes in source order, values kept as raw markup. `style` lives in
    /// [`Element::style`] instead.
    pub attributes: Vec<(String, String)>,
    pub style: Style,
    /// Whether pointer-enter / pointer-leave highlighting applies to this element.
    pub hover_bound: bool,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

/// Inline style declarations in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Style {
    declarations: Vec<(String, String)>,
}

impl Style {
    pub fn parse(text: &str) -> Self {
        let declarations = text
            .split(';')
            .filter_map(|decl| decl.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_owned()))
            .filter(|(name, value)| !name.is_empty() && !value.is_empty())
            .collect();
        Self { declarations }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(name, _)| name == property)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, property: &str, value: impl Into<String>) {
        let value = value.into();
        match self.declarations.iter_mut().find(|(name, _)| name == property) {
            Some((_, existing)) => *existing = value,
            None => self.declarations.push((property.to_owned(), value)),
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let index = self.declarations.iter().position(|(name, _)| name == property)?;
        Some(self.declarations.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.declarations.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{name}:{value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-backed element tree standing in for the live SVG DOM.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    nodes: Vec<Node>,
    root: NodeId,
    /// Markup preceding the root element (XML declaration, doctype, comments).
    pub prolog: Vec<String>,
}

impl MapDocument {
    pub fn new(root_tag: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(Element {
                    tag: root_tag.to_owned(),
                    ..Element::default()
                }),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            prolog: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.nodes.get(id.0).map(|node| &node.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.0).map(|node| &mut node.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.element(id).and_then(Element::id)
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.element(id).is_some_and(|element| element.has_class(class))
    }

    pub fn style(&self, id: NodeId) -> Option<&Style> {
        self.element(id).map(|element| &element.style)
    }

    pub fn style_mut(&mut self, id: NodeId) -> Option<&mut Style> {
        self.element_mut(id).map(|element| &mut element.style)
    }

    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> NodeId {
        self.push_child(
            parent,
            NodeKind::Element(Element {
                tag: tag.to_owned(),
                ..Element::default()
            }),
        )
    }

    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_child(parent, NodeKind::Text(text.to_owned()))
    }

    pub fn append_comment(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_child(parent, NodeKind::Comment(text.to_owned()))
    }

    pub fn append_cdata(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push_child(parent, NodeKind::CData(text.to_owned()))
    }

    /// Set an attribute. `style` is parsed into the element's inline style.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        if name == "style" {
            element.style = Style::parse(value);
            return;
        }
        match element.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_owned(),
            None => element.attributes.push((name.to_owned(), value.to_owned())),
        }
    }

    /// First element whose `id` attribute equals `element_id`, in document order.
    pub fn find_by_id(&self, element_id: &str) -> Option<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|&id| self.element_id(id) == Some(element_id))
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn descendants_with_class(&self, id: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    /// Every element carrying `class`, in document order.
    pub fn elements_with_class(&self, class: &str) -> Vec<NodeId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .filter(|&node| self.has_class(node, class))
            .collect()
    }

    /// Walk from `id` up through its ancestors, returning the first node that
    /// satisfies `predicate`.
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Self, NodeId) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(node) = current {
            if predicate(self, node) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    pub fn closest_with_class(&self, id: NodeId, class: &str) -> Option<NodeId> {
        self.closest(id, |doc, node| doc.has_class(node, class))
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }
}
