pub mod cell_group;
pub mod exit;
pub mod giving;
pub mod leadership;
pub mod member;
pub mod prayer;
pub mod tenant;
pub mod user;

use serde::{Deserialize, Deserializer, Serialize};

/// One page of a listing plus the unpaged total
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`) in patches.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Trim a free-text field, mapping blank input to `None`.
pub fn clean_text(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve a clearable text field of a patch against the stored value.
/// Absent keeps `current`; null or blank clears; anything else is trimmed.
pub fn patch_text(patch: Option<Option<String>>, current: Option<String>) -> Option<String> {
    match patch {
        None => current,
        Some(value) => clean_text(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        leader_id: Option<Option<Uuid>>,
    }

    #[test]
    fn double_option_separates_missing_from_null() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.leader_id, None);

        let cleared: Patch = serde_json::from_str(r#"{"leader_id": null}"#).unwrap();
        assert_eq!(cleared.leader_id, Some(None));

        let id = Uuid::new_v4();
        let set: Patch = serde_json::from_value(serde_json::json!({ "leader_id": id })).unwrap();
        assert_eq!(set.leader_id, Some(Some(id)));
    }

    #[test]
    fn clean_text_drops_blank_values() {
        assert_eq!(clean_text(Some("  ".into())), None);
        assert_eq!(clean_text(Some(" Room 4 ".into())), Some("Room 4".into()));
        assert_eq!(clean_text(None), None);
    }

    #[test]
    fn patch_text_keeps_clears_or_replaces() {
        let stored = Some("Room 4".to_string());
        assert_eq!(patch_text(None, stored.clone()), stored);
        assert_eq!(patch_text(Some(None), stored.clone()), None);
        assert_eq!(patch_text(Some(Some("   ".into())), stored.clone()), None);
        assert_eq!(patch_text(Some(Some(" Hall ".into())), stored), Some("Hall".into()));
    }

    #[derive(Deserialize)]
    struct NotesPatch {
        #[serde(default, deserialize_with = "double_option")]
        notes: Option<Option<String>>,
    }

    #[test]
    fn null_text_patch_clears_stored_value() {
        let patch: NotesPatch = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        assert_eq!(patch_text(patch.notes, Some("old".into())), None);

        let patch: NotesPatch = serde_json::from_str("{}").unwrap();
        assert_eq!(patch_text(patch.notes, Some("old".into())), Some("old".into()));
    }
}
