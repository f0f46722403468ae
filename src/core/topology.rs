use crate::core::entry::NodeId;

/// Node id of the console's own radio
pub const LOCAL_NODE: NodeId = 1042;

/// Role of a node in the mesh, used for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Local,
    Peer,
}

/// A node in the demo mesh. Positions are percentages of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshNode {
    pub id: NodeId,
    pub label: &'static str,
    pub x: f32,
    pub y: f32,
    pub role: NodeRole,
}

pub const NODES: &[MeshNode] = &[
    MeshNode { id: LOCAL_NODE, label: "This Device", x: 50.0, y: 50.0, role: NodeRole::Local },
    MeshNode { id: 1001, label: "Relay A", x: 30.0, y: 30.0, role: NodeRole::Peer },
    MeshNode { id: 2056, label: "Staff", x: 70.0, y: 30.0, role: NodeRole::Peer },
    MeshNode { id: 3021, label: "Emergency", x: 30.0, y: 70.0, role: NodeRole::Peer },
    MeshNode { id: 1003, label: "Relay C", x: 70.0, y: 70.0, role: NodeRole::Peer },
];

pub const LINKS: &[(NodeId, NodeId)] = &[
    (1042, 1001),
    (1042, 2056),
    (1042, 3021),
    (1042, 1003),
    (1001, 2056),
    (3021, 1003),
];

pub fn node(id: NodeId) -> Option<&'static MeshNode> {
    NODES.iter().find(|n| n.id == id)
}

/// Links resolved to their endpoint nodes; dangling links are skipped
pub fn resolved_links() -> impl Iterator<Item = (&'static MeshNode, &'static MeshNode)> {
    LINKS
        .iter()
        .filter_map(|&(from, to)| Some((node(from)?, node(to)?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_links_reference_known_nodes() {
        assert_eq!(resolved_links().count(), LINKS.len());
    }

    #[test]
    fn test_node_ids_unique() {
        let ids: HashSet<_> = NODES.iter().map(|n| n.id).collect();
        assert_eq!(ids.len(), NODES.len());
    }

    #[test]
    fn test_local_node_reaches_every_peer() {
        assert_eq!(node(LOCAL_NODE).map(|n| n.role), Some(NodeRole::Local));
        let neighbours = LINKS.iter().filter(|&&(a, b)| a == LOCAL_NODE || b == LOCAL_NODE).count();
        assert_eq!(neighbours, NODES.len() - 1);
        assert!(node(9999).is_none());
    }
}
