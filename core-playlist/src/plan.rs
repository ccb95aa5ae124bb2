//! Reorder previews

use crate::error::ReorderError;
use crate::reorder::move_to_position;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One elementary relocation of a membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOperation {
    pub id: String,
    pub from: usize,
    pub to: usize,
}

/// Preview of a new order plus the moves that produce it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPlan {
    pub preview_order: Vec<String>,
    /// Applied in sequence to the original order, these yield `preview_order`
    pub operations: Vec<MoveOperation>,
    pub can_undo: bool,
}

impl ReorderPlan {
    /// Derive the moves turning `original` into `preview`.
    ///
    /// Walks target positions left to right and pulls the wanted id forward,
    /// so every operation has `to <= from`.
    pub fn between(original: &[String], preview: &[String]) -> Result<Self, ReorderError> {
        if !is_permutation(original, preview) {
            return Err(ReorderError::NotAPermutation);
        }

        let mut working = original.to_vec();
        let mut operations = Vec::new();

        for (target, wanted) in preview.iter().enumerate() {
            if &working[target] == wanted {
                continue;
            }
            let from = working[target..]
                .iter()
                .position(|id| id == wanted)
                .map(|offset| target + offset)
                .ok_or(ReorderError::NotAPermutation)?;

            working = move_to_position(&working, from, target)?;
            operations.push(MoveOperation {
                id: wanted.clone(),
                from,
                to: target,
            });
        }

        Ok(Self {
            preview_order: preview.to_vec(),
            can_undo: !operations.is_empty(),
            operations,
        })
    }

    /// Reconstruct the order the plan was derived from
    pub fn undo_order(&self) -> Result<Vec<String>, ReorderError> {
        self.operations
            .iter()
            .rev()
            .try_fold(self.preview_order.clone(), |order, op| {
                move_to_position(&order, op.to, op.from)
            })
    }
}

fn is_permutation(a: &[String], b: &[String]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut counts: HashMap<&str, isize> = HashMap::new();
    for id in a {
        *counts.entry(id.as_str()).or_default() += 1;
    }
    for id in b {
        *counts.entry(id.as_str()).or_default() -= 1;
    }
    counts.values().all(|count| *count == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identity_plan_has_no_operations() {
        let order = ids(&["a", "b", "c"]);
        let plan = ReorderPlan::between(&order, &order).unwrap();

        assert!(plan.operations.is_empty());
        assert!(!plan.can_undo);
        assert_eq!(plan.undo_order().unwrap(), order);
    }

    #[test]
    fn test_operations_replay_to_preview() {
        let original = ids(&["a", "b", "c", "d"]);
        let preview = ids(&["d", "b", "a", "c"]);
        let plan = ReorderPlan::between(&original, &preview).unwrap();

        let replayed = plan
            .operations
            .iter()
            .try_fold(original.clone(), |order, op| {
                move_to_position(&order, op.from, op.to)
            })
            .unwrap();

        assert_eq!(replayed, preview);
        assert!(plan.can_undo);
        assert_eq!(plan.undo_order().unwrap(), original);
    }

    #[test]
    fn test_single_move() {
        let plan = ReorderPlan::between(&ids(&["a", "b", "c"]), &ids(&["c", "a", "b"])).unwrap();
        assert_eq!(
            plan.operations,
            vec![MoveOperation {
                id: "c".to_string(),
                from: 2,
                to: 0
            }]
        );
    }

    #[test]
    fn test_rejects_non_permutation() {
        let original = ids(&["a", "b", "c"]);
        assert_eq!(
            ReorderPlan::between(&original, &ids(&["a", "b"])),
            Err(ReorderError::NotAPermutation)
        );
        assert_eq!(
            ReorderPlan::between(&original, &ids(&["a", "b", "b"])),
            Err(ReorderError::NotAPermutation)
        );
    }
}
