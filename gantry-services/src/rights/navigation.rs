//! Navigation trees filtered by ACL

use crate::error::RightsError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// One entry of a navigation tree
///
/// `resource` is the route that grants the entry. Entries without one only
/// group their children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavNode>,
}

impl NavNode {
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            resource: None,
            children: Vec::new(),
        }
    }

    pub fn with_resource<S: Into<String>>(mut self, resource: S) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_children(mut self, children: Vec<NavNode>) -> Self {
        self.children = children;
        self
    }
}

/// Keep the nodes granted by `acl` and the ancestors of granted nodes
///
/// Sibling order is preserved.
pub fn prune_navigation(nodes: &[NavNode], acl: &HashSet<String>) -> Vec<NavNode> {
    nodes
        .iter()
        .filter_map(|node| {
            let children = prune_navigation(&node.children, acl);
            let granted = node
                .resource
                .as_ref()
                .is_some_and(|resource| acl.contains(resource));

            (granted || !children.is_empty()).then(|| NavNode {
                title: node.title.clone(),
                resource: node.resource.clone(),
                children,
            })
        })
        .collect()
}

/// Read a JSON navigation tree
pub async fn load_navigation<P: AsRef<Path>>(path: P) -> Result<Vec<NavNode>, RightsError> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&content).map_err(|source| RightsError::Seed {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> Vec<NavNode> {
        vec![
            NavNode::new("Admin").with_children(vec![
                NavNode::new("Users")
                    .with_resource("app/admin/users/getAll")
                    .with_children(vec![
                        NavNode::new("Edit").with_resource("app/admin/users/update"),
                        NavNode::new("Delete").with_resource("app/admin/users/delete"),
                    ]),
                NavNode::new("Rights").with_children(vec![
                    NavNode::new("Refresh").with_resource("app/admin/rights/refresh"),
                ]),
            ]),
            NavNode::new("Blog").with_resource("app/blog/blog/getAll"),
        ]
    }

    fn acl(routes: &[&str]) -> HashSet<String> {
        routes.iter().map(|r| r.to_string()).collect()
    }

    #[test]
    fn test_single_granted_leaf_keeps_only_its_path() {
        let pruned = prune_navigation(&tree(), &acl(&["app/admin/users/delete"]));

        let expected = vec![NavNode::new("Admin").with_children(vec![NavNode::new("Users")
            .with_resource("app/admin/users/getAll")
            .with_children(vec![
                NavNode::new("Delete").with_resource("app/admin/users/delete")
            ])])];
        assert_eq!(pruned, expected);
    }

    #[test]
    fn test_order_is_preserved() {
        let pruned = prune_navigation(
            &tree(),
            &acl(&["app/blog/blog/getAll", "app/admin/rights/refresh"]),
        );

        let titles: Vec<_> = pruned.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Admin", "Blog"]);
        assert_eq!(pruned[0].children[0].title, "Rights");
    }

    #[test]
    fn test_empty_acl_prunes_everything() {
        assert!(prune_navigation(&tree(), &HashSet::new()).is_empty());
    }
}
