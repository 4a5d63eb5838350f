//! Image hierarchy: parent name → child build instructions.
//!
//! The root key (empty string) holds every externally rooted instruction.
//! Every other key holds the instructions whose declared parent equals it.
//! Each instruction appears in exactly one list. Instructions that cannot
//! be reached from the root, because their parent was never discovered or
//! because they sit on a dependency cycle, are orphaned.

use std::collections::{HashMap, HashSet};

use container_factory_core::error::{FactoryError, Result};
use serde::{Deserialize, Serialize};

use crate::discovery::BuildInstruction;

/// Hierarchy key holding externally rooted instructions.
pub const ROOT_KEY: &str = "";

/// Buildable image tree node (export view).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildableImage {
    #[serde(rename = "image_name")]
    pub name: String,
    pub children: Vec<BuildableImage>,
}

/// Image whose parent cannot be resolved (export view).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrphanedImage {
    #[serde(rename = "image_name")]
    pub name: String,
    #[serde(rename = "parent_image_name")]
    pub parent_name: String,
}

/// Read-only dependency forest for one invocation.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    instructions: Vec<BuildInstruction>,
    children: HashMap<String, Vec<BuildInstruction>>,
}

impl Hierarchy {
    /// Group instructions by parent name in a single pass.
    ///
    /// Child order within a list follows the input order.
    pub fn build(instructions: Vec<BuildInstruction>) -> Result<Self> {
        tracing::info!("Building image hierarchy");

        let mut seen = HashSet::new();
        let mut children: HashMap<String, Vec<BuildInstruction>> = HashMap::new();
        for instruction in &instructions {
            if !seen.insert(instruction.name.as_str()) {
                return Err(FactoryError::ConfigError(format!(
                    "Duplicate image name: {}",
                    instruction.name
                )));
            }
            let key = if instruction.has_internal_dependency {
                instruction.parent_name.clone()
            } else {
                ROOT_KEY.to_string()
            };
            children.entry(key).or_default().push(instruction.clone());
        }

        Ok(Self {
            instructions,
            children,
        })
    }

    /// Instructions whose parent is `parent` (use [`ROOT_KEY`] for roots).
    pub fn children_of(&self, parent: &str) -> &[BuildInstruction] {
        self.children.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Externally rooted instructions.
    pub fn roots(&self) -> &[BuildInstruction] {
        self.children_of(ROOT_KEY)
    }

    /// Look up an instruction by image name.
    pub fn get(&self, name: &str) -> Option<&BuildInstruction> {
        self.instructions.iter().find(|i| i.name == name)
    }

    /// All instructions in discovery order.
    pub fn instructions(&self) -> &[BuildInstruction] {
        &self.instructions
    }

    /// The raw parent → children mapping.
    pub fn as_map(&self) -> &HashMap<String, Vec<BuildInstruction>> {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Split into the buildable tree and the orphaned list.
    pub fn partition(&self) -> (Vec<BuildableImage>, Vec<OrphanedImage>) {
        let mut reachable = HashSet::new();
        let buildable = self.collect_children(ROOT_KEY, &mut reachable);

        let orphaned = self
            .instructions
            .iter()
            .filter(|i| !reachable.contains(i.name.as_str()))
            .map(|i| OrphanedImage {
                name: i.name.clone(),
                parent_name: i.parent_name.clone(),
            })
            .collect();

        (buildable, orphaned)
    }

    fn collect_children<'a>(
        &'a self,
        parent: &str,
        reachable: &mut HashSet<&'a str>,
    ) -> Vec<BuildableImage> {
        self.children_of(parent)
            .iter()
            .map(|child| {
                reachable.insert(child.name.as_str());
                BuildableImage {
                    name: child.name.clone(),
                    children: self.collect_children(&child.name, reachable),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn instruction(name: &str, parent: Option<&str>) -> BuildInstruction {
        BuildInstruction {
            name: name.to_string(),
            parent_name: parent.unwrap_or_default().to_string(),
            source_path: PathBuf::from("/srv/dockerfiles").join(name),
            rewritten_path: None,
            has_internal_dependency: parent.is_some(),
        }
    }

    fn names(list: &[BuildInstruction]) -> Vec<&str> {
        list.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_chain() {
        let hierarchy = Hierarchy::build(vec![
            instruction("base", None),
            instruction("mid", Some("base")),
            instruction("leaf", Some("mid")),
        ])
        .unwrap();

        assert_eq!(names(hierarchy.roots()), vec!["base"]);
        assert_eq!(names(hierarchy.children_of("base")), vec!["mid"]);
        assert_eq!(names(hierarchy.children_of("mid")), vec!["leaf"]);
        assert!(hierarchy.children_of("leaf").is_empty());
        assert_eq!(hierarchy.as_map().len(), 3);

        let (buildable, orphaned) = hierarchy.partition();
        assert!(orphaned.is_empty());
        assert_eq!(
            buildable,
            vec![BuildableImage {
                name: "base".into(),
                children: vec![BuildableImage {
                    name: "mid".into(),
                    children: vec![BuildableImage {
                        name: "leaf".into(),
                        children: vec![],
                    }],
                }],
            }]
        );
    }

    #[test]
    fn test_orphan_with_missing_parent() {
        let hierarchy = Hierarchy::build(vec![
            instruction("base", None),
            instruction("orphan", Some("missing-parent")),
        ])
        .unwrap();

        let (buildable, orphaned) = hierarchy.partition();
        assert_eq!(buildable.len(), 1);
        assert_eq!(buildable[0].name, "base");
        assert_eq!(
            orphaned,
            vec![OrphanedImage {
                name: "orphan".into(),
                parent_name: "missing-parent".into(),
            }]
        );
    }

    #[test]
    fn test_cycle_is_orphaned() {
        let hierarchy = Hierarchy::build(vec![
            instruction("a", Some("b")),
            instruction("b", Some("a")),
            instruction("selfish", Some("selfish")),
        ])
        .unwrap();

        let (buildable, orphaned) = hierarchy.partition();
        assert!(buildable.is_empty());
        let orphan_names: Vec<_> = orphaned.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(orphan_names, vec!["a", "b", "selfish"]);
        assert_eq!(orphaned[0].parent_name, "b");
    }

    #[test]
    fn test_partition_is_total_and_exclusive() {
        let instructions = vec![
            instruction("base", None),
            instruction("tools", None),
            instruction("mid", Some("base")),
            instruction("leaf", Some("mid")),
            instruction("sidecar", Some("tools")),
            instruction("lost", Some("nowhere")),
            instruction("lost-child", Some("lost")),
        ];
        let hierarchy = Hierarchy::build(instructions.clone()).unwrap();

        let listed: usize = hierarchy.as_map().values().map(Vec::len).sum();
        assert_eq!(listed, instructions.len());

        fn flatten<'a>(tree: &'a [BuildableImage], out: &mut Vec<&'a str>) {
            for node in tree {
                out.push(&node.name);
                flatten(&node.children, out);
            }
        }
        let (buildable, orphaned) = hierarchy.partition();
        let mut seen = Vec::new();
        flatten(&buildable, &mut seen);
        seen.extend(orphaned.iter().map(|o| o.name.as_str()));
        seen.sort_unstable();

        let mut expected: Vec<_> = instructions.iter().map(|i| i.name.as_str()).collect();
        expected.sort_unstable();
        assert_eq!(seen, expected);

        // Orphaning is transitive through a missing ancestor
        let orphan_names: Vec<_> = orphaned.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(orphan_names, vec!["lost", "lost-child"]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Hierarchy::build(vec![instruction("base", None), instruction("base", None)])
            .unwrap_err();
        assert!(matches!(err, FactoryError::ConfigError(_)));
    }

    #[test]
    fn test_children_keep_input_order() {
        let hierarchy = Hierarchy::build(vec![
            instruction("base", None),
            instruction("zeta", Some("base")),
            instruction("alpha", Some("base")),
        ])
        .unwrap();
        assert_eq!(names(hierarchy.children_of("base")), vec!["zeta", "alpha"]);
        assert_eq!(hierarchy.get("alpha").unwrap().parent_name, "base");
        assert_eq!(hierarchy.len(), 3);
        assert!(!hierarchy.is_empty());
    }

    #[test]
    fn test_export_view_serialization() {
        let image = BuildableImage {
            name: "base".into(),
            children: vec![],
        };
        let json = serde_json::to_value(&image).unwrap();
        assert_eq!(json, serde_json::json!({"image_name": "base", "children": []}));

        let orphan = OrphanedImage {
            name: "orphan".into(),
            parent_name: "missing".into(),
        };
        let json = serde_json::to_value(&orphan).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"image_name": "orphan", "parent_image_name": "missing"})
        );
    }
}
