//! The read-only tree abstraction the evaluator navigates.
use std::hash::Hash;

/// The namespace bound to the reserved `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// A qualified name as written in the source: an optional prefix and a local part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QName<'a> {
    pub prefix: Option<&'a str>,
    pub local_part: &'a str,
}

impl std::fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_part),
            None => f.write_str(self.local_part),
        }
    }
}

/// The seven node kinds of the XPath 1.0 data model, minus namespace nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Root,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

/// A node in a navigable, read-only document.
///
/// The evaluator and the XSLT executor are written only against this trait.
/// Implementations must order nodes in document order through `Ord`; node-sets
/// are sorted and deduplicated with it. Attributes sort after their owner
/// element and before the element's first child.
///
/// `'a` is the lifetime of the underlying document.
pub trait DocumentNode<'a>:
    std::fmt::Debug + Clone + Copy + PartialEq + Eq + Hash + PartialOrd + Ord
{
    fn node_type(&self) -> NodeType;

    /// The name as written in the source (`xsl:if`). `None` for root, text and
    /// comment nodes. For a processing instruction this is its target.
    fn name(&self) -> Option<QName<'a>>;

    /// The namespace URI of an element or attribute name.
    fn namespace_uri(&self) -> Option<&'a str> {
        None
    }

    /// The XPath string-value: text content for text nodes, the concatenated
    /// descendant text for elements and the root, the value for attributes.
    fn string_value(&self) -> String;

    /// Attribute nodes of an element, in source order. Empty for other nodes.
    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// Child nodes in document order. Empty for leaves.
    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a>;

    /// The parent node. For an attribute this is its owner element.
    fn parent(&self) -> Option<Self>;
}

/// An in-memory tree for exercising the evaluator in tests, here and in
/// downstream crates.
pub mod mock {
    use super::*;
    use std::cmp::Ordering;
    use std::hash::Hasher;

    #[derive(Debug, Clone)]
    struct MockNodeData<'a> {
        node_type: NodeType,
        name: Option<QName<'a>>,
        namespace: Option<&'a str>,
        value: String,
        parent: Option<usize>,
        children: Vec<usize>,
        attributes: Vec<usize>,
    }

    /// Nodes are stored in document order, so an id doubles as the order key.
    #[derive(Debug, Default)]
    pub struct MockTree<'a> {
        nodes: Vec<MockNodeData<'a>>,
    }

    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree<'a>,
    }

    impl PartialEq for MockNode<'_> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }
    impl Eq for MockNode<'_> {}

    impl PartialOrd for MockNode<'_> {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }
    impl Ord for MockNode<'_> {
        fn cmp(&self, other: &Self) -> Ordering {
            self.id.cmp(&other.id)
        }
    }

    impl Hash for MockNode<'_> {
        fn hash<H: Hasher>(&self, state: &mut H) {
            self.id.hash(state);
        }
    }

    impl<'a> MockTree<'a> {
        pub fn node(&'a self, id: usize) -> MockNode<'a> {
            MockNode { id, tree: self }
        }

        pub fn root(&'a self) -> MockNode<'a> {
            self.node(0)
        }

        fn push(
            &mut self,
            parent: Option<usize>,
            node_type: NodeType,
            name: Option<QName<'a>>,
            value: &str,
        ) -> usize {
            let id = self.nodes.len();
            self.nodes.push(MockNodeData {
                node_type,
                name,
                namespace: None,
                value: value.to_string(),
                parent,
                children: vec![],
                attributes: vec![],
            });
            if let Some(p) = parent {
                if node_type == NodeType::Attribute {
                    self.nodes[p].attributes.push(id);
                } else {
                    self.nodes[p].children.push(id);
                }
            }
            id
        }
    }

    impl<'a> DocumentNode<'a> for MockNode<'a> {
        fn node_type(&self) -> NodeType {
            self.tree.nodes[self.id].node_type
        }

        fn name(&self) -> Option<QName<'a>> {
            self.tree.nodes[self.id].name
        }

        fn namespace_uri(&self) -> Option<&'a str> {
            self.tree.nodes[self.id].namespace
        }

        fn string_value(&self) -> String {
            self.tree.nodes[self.id].value.clone()
        }

        fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.nodes[self.id]
                    .attributes
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
            let tree = self.tree;
            Box::new(
                tree.nodes[self.id]
                    .children
                    .iter()
                    .map(move |&id| MockNode { id, tree }),
            )
        }

        fn parent(&self) -> Option<Self> {
            self.tree.nodes[self.id].parent.map(|id| MockNode {
                id,
                tree: self.tree,
            })
        }
    }

    fn local(name: &str) -> Option<QName<'_>> {
        Some(QName {
            prefix: None,
            local_part: name,
        })
    }

    /// Builds the tree used throughout the unit tests. Ids follow document order:
    ///
    /// ```text
    /// 0 (root)
    /// 1 <para id="p1" xml:lang="en">     attributes 2, 3
    /// 4   Hello
    /// 5 <!-- comment node -->
    /// 6 <div/>
    /// 7 <?pi-target pi-value?>
    /// 8 <para>
    /// 9   World
    /// ```
    pub fn create_test_tree<'a>() -> MockTree<'a> {
        let mut tree = MockTree::default();
        let root = tree.push(None, NodeType::Root, None, "HelloWorld");
        let para = tree.push(Some(root), NodeType::Element, local("para"), "Hello");
        tree.push(Some(para), NodeType::Attribute, local("id"), "p1");
        let lang = tree.push(
            Some(para),
            NodeType::Attribute,
            Some(QName {
                prefix: Some("xml"),
                local_part: "lang",
            }),
            "en",
        );
        tree.nodes[lang].namespace = Some(XML_NAMESPACE);
        tree.push(Some(para), NodeType::Text, None, "Hello");
        tree.push(Some(root), NodeType::Comment, None, " comment node ");
        tree.push(Some(root), NodeType::Element, local("div"), "");
        tree.push(
            Some(root),
            NodeType::ProcessingInstruction,
            local("pi-target"),
            "pi-value",
        );
        let para2 = tree.push(Some(root), NodeType::Element, local("para"), "World");
        tree.push(Some(para2), NodeType::Text, None, "World");
        tree
    }
}
