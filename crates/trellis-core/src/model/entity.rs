//! Entities: caller-owned islands of DOM the model never looks inside.
//!
//! The wrapper element of an entity carries its identity as classes:
//! `_Entity _EType_<type> _EId_<id>` plus `_EReadonly_true` when read-only.
//! That class convention is the only thing that lets an entity survive a
//! trip through raw HTML.

use serde::{Deserialize, Serialize};
use smol_str::{SmolStr, format_smolstr};
use trellis_dom::FragmentNode;

use super::dom_ref::DomRef;
use super::format::SegmentFormat;
use super::segment::is_false;

pub const ENTITY_CLASS: &str = "_Entity";
pub const ENTITY_TYPE_PREFIX: &str = "_EType_";
pub const ENTITY_ID_PREFIX: &str = "_EId_";
pub const ENTITY_READONLY_PREFIX: &str = "_EReadonly_";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentModelEntity {
    pub entity_type: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_readonly: bool,
    /// Snapshot of the wrapper subtree, used when the live wrapper is gone.
    pub wrapper: FragmentNode,
    #[serde(default, skip_serializing_if = "SegmentFormat::is_empty")]
    pub format: SegmentFormat,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_selected: bool,
    /// Live wrapper element.
    #[serde(skip)]
    pub dom_ref: DomRef,
}

/// Identity decoded from wrapper classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityInfo {
    pub entity_type: SmolStr,
    pub id: Option<SmolStr>,
    pub is_readonly: bool,
}

/// Decode entity identity from a class list. Returns `None` unless the
/// `_Entity` marker class is present.
pub fn parse_entity_classes<'a>(classes: impl IntoIterator<Item = &'a str>) -> Option<EntityInfo> {
    let mut is_entity = false;
    let mut info = EntityInfo {
        entity_type: SmolStr::default(),
        id: None,
        is_readonly: false,
    };
    for class in classes {
        if class == ENTITY_CLASS {
            is_entity = true;
        } else if let Some(t) = class.strip_prefix(ENTITY_TYPE_PREFIX) {
            info.entity_type = SmolStr::new(t);
        } else if let Some(id) = class.strip_prefix(ENTITY_ID_PREFIX) {
            info.id = Some(SmolStr::new(id));
        } else if let Some(flag) = class.strip_prefix(ENTITY_READONLY_PREFIX) {
            info.is_readonly = matches!(flag, "true" | "1");
        }
    }
    is_entity.then_some(info)
}

/// Class list for a wrapper element.
pub fn entity_classes(entity: &ContentModelEntity) -> Vec<SmolStr> {
    let mut classes = vec![SmolStr::new_static(ENTITY_CLASS)];
    classes.push(format_smolstr!("{ENTITY_TYPE_PREFIX}{}", entity.entity_type));
    if let Some(id) = &entity.id {
        classes.push(format_smolstr!("{ENTITY_ID_PREFIX}{id}"));
    }
    if entity.is_readonly {
        classes.push(format_smolstr!("{ENTITY_READONLY_PREFIX}true"));
    }
    classes
}

/// True for classes that belong to the entity convention.
pub fn is_entity_class(class: &str) -> bool {
    class == ENTITY_CLASS
        || class.starts_with(ENTITY_TYPE_PREFIX)
        || class.starts_with(ENTITY_ID_PREFIX)
        || class.starts_with(ENTITY_READONLY_PREFIX)
}

pub fn create_entity(
    entity_type: impl Into<SmolStr>,
    id: Option<SmolStr>,
    is_readonly: bool,
    wrapper: FragmentNode,
) -> ContentModelEntity {
    ContentModelEntity {
        entity_type: entity_type.into(),
        id,
        is_readonly,
        wrapper,
        format: SegmentFormat::default(),
        is_selected: false,
        dom_ref: DomRef::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classes() {
        let info =
            parse_entity_classes(["_Entity", "_EType_mention", "_EId_m1", "_EReadonly_1"]).unwrap();
        assert_eq!(info.entity_type, "mention");
        assert_eq!(info.id.as_deref(), Some("m1"));
        assert!(info.is_readonly);

        assert!(parse_entity_classes(["_EType_mention", "other"]).is_none());
    }

    #[test]
    fn test_classes_roundtrip() {
        let entity = create_entity(
            "chart",
            Some("c_1".into()),
            true,
            FragmentNode::text(""),
        );
        let classes = entity_classes(&entity);
        assert_eq!(classes, ["_Entity", "_EType_chart", "_EId_c_1", "_EReadonly_true"]);
        let info = parse_entity_classes(classes.iter().map(|c| c.as_str())).unwrap();
        assert_eq!(info.entity_type, "chart");
        assert!(info.is_readonly);
    }

    #[test]
    fn test_empty_type_keeps_marker() {
        let info = parse_entity_classes(["_Entity", "_EType_", "_EId_"]).unwrap();
        assert_eq!(info.entity_type, "");
        assert_eq!(info.id.as_deref(), Some(""));

        let entity = create_entity(info.entity_type, info.id, false, FragmentNode::text(""));
        assert_eq!(entity_classes(&entity), ["_Entity", "_EType_", "_EId_"]);
    }
}
