//! ContainerPatch: JSON patches applied to the injected sidecar and init containers

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::schema::{SpecRules, ValidationIssue};

/// ContainerPatchSpec specifies the options available for a ContainerPatch
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "kuma.io",
    version = "v1alpha1",
    kind = "ContainerPatch",
    plural = "containerpatches",
    derive = "PartialEq",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPatchSpec {
    /// SidecarPatch specifies jsonpatch to apply to a sidecar container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar_patch: Option<Vec<JsonPatchBlock>>,

    /// InitPatch specifies jsonpatch to apply to an init container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_patch: Option<Vec<JsonPatchBlock>>,
}

/// JsonPatchBlock is one json patch operation block.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, JsonSchema)]
pub struct JsonPatchBlock {
    /// Op is a jsonpatch operation string.
    pub op: PatchOp,

    /// Path is a jsonpatch path string.
    #[schemars(length(min = 1))]
    pub path: String,

    /// From is a jsonpatch from string, used by move and copy operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Value must be a string representing a valid json object used
    /// by replace and add operations. String has to be escaped with " to be valid a json object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
    Move,
    Copy,
    Test,
}

impl PatchOp {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchOp::Add => "add",
            PatchOp::Remove => "remove",
            PatchOp::Replace => "replace",
            PatchOp::Move => "move",
            PatchOp::Copy => "copy",
            PatchOp::Test => "test",
        }
    }

    /// Operand field the operation cannot do without
    fn operand(self) -> Option<&'static str> {
        match self {
            PatchOp::Add | PatchOp::Replace | PatchOp::Test => Some("value"),
            PatchOp::Move | PatchOp::Copy => Some("from"),
            PatchOp::Remove => None,
        }
    }
}

impl JsonPatchBlock {
    /// Whether the block carries the operands its operation needs
    pub fn is_complete(&self) -> bool {
        match self.op {
            PatchOp::Add | PatchOp::Replace | PatchOp::Test => self.value.is_some(),
            PatchOp::Move | PatchOp::Copy => self.from.is_some(),
            PatchOp::Remove => true,
        }
    }
}

impl SpecRules for ContainerPatchSpec {
    fn rule_issues(&self) -> Vec<ValidationIssue> {
        let patches = [
            ("sidecarPatch", &self.sidecar_patch),
            ("initPatch", &self.init_patch),
        ];
        let mut issues = Vec::new();
        for (field, blocks) in patches {
            for (i, block) in blocks.iter().flatten().enumerate() {
                if block.is_complete() {
                    continue;
                }
                if let Some(operand) = block.op.operand() {
                    issues.push(ValidationIssue {
                        path: format!("/{}/{}/{}", field, i, operand),
                        message: format!("required by op '{}'", block.op.as_str()),
                    });
                }
            }
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmarshal_container_patch() {
        let json = serde_json::json!({
            "sidecarPatch": [
                {"op": "add", "path": "/securityContext/privileged", "value": "true"},
                {"op": "remove", "path": "/resources/limits"}
            ],
            "initPatch": [
                {"op": "move", "path": "/env/0", "from": "/env/1"}
            ]
        });

        let spec: ContainerPatchSpec = serde_json::from_value(json).unwrap();
        let sidecar = spec.sidecar_patch.unwrap();
        assert_eq!(sidecar.len(), 2);
        assert_eq!(sidecar[0].op, PatchOp::Add);
        assert_eq!(sidecar[0].value.as_deref(), Some("true"));
        assert!(sidecar.iter().all(JsonPatchBlock::is_complete));

        let init = spec.init_patch.unwrap();
        assert_eq!(init[0].from.as_deref(), Some("/env/1"));
    }

    #[test]
    fn test_incomplete_blocks() {
        let block = JsonPatchBlock {
            op: PatchOp::Copy,
            path: "/a".to_string(),
            from: None,
            value: None,
        };
        assert!(!block.is_complete());
    }

    #[test]
    fn test_rules_report_missing_operands() {
        let spec: ContainerPatchSpec = serde_json::from_value(serde_json::json!({
            "sidecarPatch": [
                {"op": "remove", "path": "/a"},
                {"op": "add", "path": "/x"}
            ],
            "initPatch": [{"op": "copy", "path": "/b"}]
        }))
        .unwrap();

        let issues = spec.rule_issues();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].path, "/sidecarPatch/1/value");
        assert_eq!(issues[0].message, "required by op 'add'");
        assert_eq!(issues[1].path, "/initPatch/0/from");
        assert!(ContainerPatchSpec::default().rule_issues().is_empty());
    }

    #[test]
    fn test_op_is_lowercase() {
        for op in [PatchOp::Add, PatchOp::Move, PatchOp::Test] {
            assert_eq!(serde_json::to_value(op).unwrap(), op.as_str());
        }
        assert_eq!(serde_json::to_value(PatchOp::Replace).unwrap(), "replace");
        assert!(serde_json::from_value::<PatchOp>(serde_json::json!("Replace")).is_err());
    }
}
