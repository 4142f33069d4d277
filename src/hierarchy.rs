//! Rebuilds the category forest from codes whose 2-digit pairs encode their ancestry.

use std::collections::HashMap;

use crate::model::{CodeLabelRecord, TreeNode};
use crate::normalization::code::{depth, parent_code};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Forest {
    pub roots: Vec<TreeNode>,
    /// Codes whose parent code never appeared in the input; absent from `roots`.
    pub orphans: Vec<String>,
}

struct Slot {
    id: String,
    name: String,
    children: Vec<usize>,
    attached: bool,
}

/// Builds the forest from pre-validated records.
///
/// Records are visited shortest code first, so a parent always exists before its children
/// try to attach. Siblings keep discovery order. A repeated code relabels the existing node.
pub fn build_forest(records: &[CodeLabelRecord]) -> Forest {
    let mut ordered: Vec<&CodeLabelRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.code.len());

    let mut slots: Vec<Slot> = Vec::with_capacity(ordered.len());
    let mut by_code: HashMap<&str, usize> = HashMap::with_capacity(ordered.len());

    for rec in ordered {
        if let Some(&idx) = by_code.get(rec.code.as_str()) {
            slots[idx].name = rec.label.clone();
            continue;
        }
        let idx = slots.len();
        slots.push(Slot {
            id: rec.code.clone(),
            name: rec.label.clone(),
            children: Vec::new(),
            attached: false,
        });
        by_code.insert(rec.code.as_str(), idx);

        if let Some(parent) = parent_code(&rec.code) {
            if let Some(&pidx) = by_code.get(parent) {
                slots[pidx].children.push(idx);
                slots[idx].attached = true;
            }
        }
    }

    let mut orphans = Vec::new();
    let mut root_idx = Vec::new();
    for (idx, slot) in slots.iter().enumerate() {
        if depth(&slot.id) == 1 {
            root_idx.push(idx);
        } else if !slot.attached {
            orphans.push(slot.id.clone());
        }
    }

    Forest {
        roots: root_idx.into_iter().map(|i| materialize(&slots, i)).collect(),
        orphans,
    }
}

fn materialize(slots: &[Slot], idx: usize) -> TreeNode {
    let slot = &slots[idx];
    TreeNode {
        id: slot.id.clone(),
        name: slot.name.clone(),
        children: slot.children.iter().map(|&c| materialize(slots, c)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recs(codes: &[&str]) -> Vec<CodeLabelRecord> {
        codes
            .iter()
            .map(|c| CodeLabelRecord {
                code: c.to_string(),
                label: format!("label {c}"),
            })
            .collect()
    }

    fn contains(nodes: &[TreeNode], id: &str) -> bool {
        nodes.iter().any(|n| n.find(id).is_some())
    }

    #[test]
    fn four_level_chain() {
        let forest = build_forest(&recs(&["01010102", "010101", "0101", "01"]));
        assert_eq!(forest.roots.len(), 1);
        let root = &forest.roots[0];
        assert_eq!(root.id, "01");
        let l2 = &root.children[0];
        let l3 = &l2.children[0];
        let l4 = &l3.children[0];
        assert_eq!(
            (l2.id.as_str(), l3.id.as_str(), l4.id.as_str()),
            ("0101", "010101", "01010102")
        );
        assert!(l4.children.is_empty());
        assert!(forest.orphans.is_empty());
    }

    #[test]
    fn missing_intermediate_level_orphans_descendant() {
        let forest = build_forest(&recs(&["01", "010101"]));
        assert_eq!(forest.roots.len(), 1);
        assert!(!contains(&forest.roots, "010101"));
        assert_eq!(forest.orphans, vec!["010101".to_string()]);
    }

    #[test]
    fn every_child_sits_under_its_prefix() {
        let codes = ["01", "02", "0101", "0102", "0201", "010201", "020101", "0301"];
        let forest = build_forest(&recs(&codes));

        fn check(node: &TreeNode) {
            for child in &node.children {
                assert_eq!(parent_code(&child.id), Some(node.id.as_str()));
                check(child);
            }
        }
        forest.roots.iter().for_each(check);
        for code in codes {
            let parent_present = parent_code(code).map_or(true, |p| codes.contains(&p));
            assert_eq!(contains(&forest.roots, code), parent_present, "{code}");
        }
        assert_eq!(forest.orphans, vec!["0301".to_string()]);
    }

    #[test]
    fn siblings_keep_discovery_order() {
        let forest = build_forest(&recs(&["0102", "01", "0101"]));
        let ids: Vec<&str> = forest.roots[0]
            .children
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["0102", "0101"]);
    }

    #[test]
    fn repeated_code_relabels_once() {
        let mut input = recs(&["01", "0101"]);
        input.push(CodeLabelRecord {
            code: "0101".into(),
            label: "renamed".into(),
        });
        let forest = build_forest(&input);
        assert_eq!(forest.roots[0].children.len(), 1);
        assert_eq!(forest.roots[0].children[0].name, "renamed");
    }
}
