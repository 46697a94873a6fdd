//! Transformer configuration.
//!
//! Every field has a default so a config file only needs to name what it
//! changes. Load with [`TransformerConfig::from_json_str`], which also
//! validates the result.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use transformer_proto::{SpaceType, TransformationType};

use crate::error::TransformerError;

/// Which selected node the gizmo is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GizmoPlacement {
    FirstSelection,
    #[default]
    LastSelection,
}

/// Snapping for one transformation kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnapSetting {
    pub enabled: bool,
    /// Translation in world units, rotation in degrees, scale in scale units.
    pub value: f32,
}

/// Per-kind snapping. A kind with no entry is never snapped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnappingConfig {
    entries: HashMap<TransformationType, SnapSetting>,
}

impl SnappingConfig {
    pub fn get(&self, kind: TransformationType) -> Option<SnapSetting> {
        self.entries.get(&kind).copied()
    }

    pub fn set(&mut self, kind: TransformationType, setting: SnapSetting) {
        self.entries.insert(kind, setting);
    }

    pub fn set_enabled(&mut self, kind: TransformationType, enabled: bool) {
        self.entries
            .entry(kind)
            .or_insert(SnapSetting {
                enabled,
                value: 0.0,
            })
            .enabled = enabled;
    }

    pub fn set_value(&mut self, kind: TransformationType, value: f32) {
        self.entries
            .entry(kind)
            .or_insert(SnapSetting {
                enabled: false,
                value,
            })
            .value = value;
    }

    /// Snap value to use for `kind`, if snapping is enabled with a usable value.
    pub fn active_value(&self, kind: TransformationType) -> Option<f32> {
        self.get(kind)
            .filter(|s| s.enabled && s.value > 0.0)
            .map(|s| s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransformationType, SnapSetting)> + '_ {
        self.entries.iter().map(|(k, v)| (*k, *v))
    }
}

/// Timer settings for waiting on freshly cloned nodes to replicate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloneReplicationConfig {
    /// Seconds between readiness checks.
    pub check_frequency: f32,
    /// Seconds a clone must exist before it is considered replicated.
    pub minimum_time: f32,
}

impl Default for CloneReplicationConfig {
    fn default() -> Self {
        Self {
            check_frequency: 0.05,
            minimum_time: 0.01,
        }
    }
}

/// Visual tuning of the gizmos.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GizmoTuning {
    pub scene_scale_factor: f32,
    pub camera_arc_radius: f32,
    /// World displacement to scale conversion of the scale gizmo.
    pub scaling_factor: f32,
}

impl Default for GizmoTuning {
    fn default() -> Self {
        Self {
            scene_scale_factor: 0.1,
            camera_arc_radius: 150.0,
            scaling_factor: 0.05,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformerConfig {
    pub gizmo_placement: GizmoPlacement,
    /// Transformation kind active at startup.
    pub transformation: TransformationType,
    pub space: SpaceType,
    pub snapping: SnappingConfig,
    /// Select and transform individual parts instead of whole objects.
    pub part_based: bool,
    /// Rotate every target about its own origin instead of about the gizmo.
    pub rotate_on_local_axis: bool,
    /// Transform targets even when their mobility forbids it.
    pub force_mobility: bool,
    /// Re-selecting an already selected node while appending deselects it.
    pub toggle_selected_in_multi_selection: bool,
    /// Move focusable targets as well as notifying them of the new transform.
    pub transform_focusable_objects: bool,
    /// Drop trace hits on nodes that are not network replicated.
    pub ignore_non_replicated: bool,
    pub trace_distance: f32,
    pub clone_replication: CloneReplicationConfig,
    /// Seconds between selection resync requests.
    pub resync_interval: f32,
    pub gizmo: GizmoTuning,
}

impl Default for TransformerConfig {
    fn default() -> Self {
        Self {
            gizmo_placement: GizmoPlacement::default(),
            transformation: TransformationType::Translation,
            space: SpaceType::World,
            snapping: SnappingConfig::default(),
            part_based: false,
            rotate_on_local_axis: false,
            force_mobility: false,
            toggle_selected_in_multi_selection: true,
            transform_focusable_objects: true,
            ignore_non_replicated: false,
            trace_distance: 10_000.0,
            clone_replication: CloneReplicationConfig::default(),
            resync_interval: 0.1,
            gizmo: GizmoTuning::default(),
        }
    }
}

impl TransformerConfig {
    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self, TransformerError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, TransformerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TransformerError> {
        for (kind, setting) in self.snapping.iter() {
            if setting.enabled && setting.value <= 0.0 {
                return Err(TransformerError::InvalidSnapValue {
                    kind,
                    value: setting.value,
                });
            }
        }

        let positive = [
            (
                "clone_replication.check_frequency",
                self.clone_replication.check_frequency,
            ),
            ("resync_interval", self.resync_interval),
            ("trace_distance", self.trace_distance),
            ("gizmo.camera_arc_radius", self.gizmo.camera_arc_radius),
        ];
        for (field, value) in positive {
            if value <= 0.0 {
                return Err(TransformerError::NonPositive { field, value });
            }
        }

        if self.clone_replication.minimum_time < 0.0 {
            return Err(TransformerError::Negative {
                field: "clone_replication.minimum_time",
                value: self.clone_replication.minimum_time,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransformerConfig::default();
        assert_eq!(config.gizmo_placement, GizmoPlacement::LastSelection);
        assert_eq!(config.transformation, TransformationType::Translation);
        assert_eq!(config.space, SpaceType::World);
        assert!(config.toggle_selected_in_multi_selection);
        assert!(config.snapping.active_value(TransformationType::Translation).is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{
            "space": "Local",
            "part_based": true,
            "snapping": { "Translation": { "enabled": true, "value": 5.0 } },
            "clone_replication": { "check_frequency": 0.2 }
        }"#;
        let config = TransformerConfig::from_json_str(json).expect("valid config");
        assert_eq!(config.space, SpaceType::Local);
        assert!(config.part_based);
        assert_eq!(
            config.snapping.active_value(TransformationType::Translation),
            Some(5.0)
        );
        assert!(config.snapping.active_value(TransformationType::Rotation).is_none());
        assert!((config.clone_replication.check_frequency - 0.2).abs() < f32::EPSILON);
        assert!((config.clone_replication.minimum_time - 0.01).abs() < f32::EPSILON);
        assert!((config.resync_interval - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_rejects_non_positive_snap() {
        let json = r#"{ "snapping": { "Rotation": { "enabled": true, "value": 0.0 } } }"#;
        let err = TransformerConfig::from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            TransformerError::InvalidSnapValue {
                kind: TransformationType::Rotation,
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_bad_timers() {
        let mut config = TransformerConfig::default();
        config.resync_interval = 0.0;
        assert!(matches!(
            config.validate(),
            Err(TransformerError::NonPositive { field: "resync_interval", .. })
        ));

        let mut config = TransformerConfig::default();
        config.clone_replication.minimum_time = -1.0;
        assert!(matches!(config.validate(), Err(TransformerError::Negative { .. })));
    }

    #[test]
    fn test_snapping_toggle_keeps_value() {
        let mut snapping = SnappingConfig::default();
        snapping.set_enabled(TransformationType::Scale, true);
        assert!(snapping.active_value(TransformationType::Scale).is_none());
        snapping.set_value(TransformationType::Scale, 0.25);
        assert_eq!(snapping.active_value(TransformationType::Scale), Some(0.25));
        snapping.set_enabled(TransformationType::Scale, false);
        assert!(snapping.active_value(TransformationType::Scale).is_none());
        assert_eq!(snapping.get(TransformationType::Scale).map(|s| s.value), Some(0.25));
    }

    #[test]
    fn test_invalid_json() {
        let err = TransformerConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, TransformerError::ConfigParse(_)));
    }
}
