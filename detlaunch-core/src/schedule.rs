//! Epoch schedule selection keyed by model family.
//!
//! A model identifier such as `yolox_s` or `yolov8_n` is matched against a
//! fixed, ordered list of family patterns. The first pattern contained in the
//! identifier decides the schedule; identifiers that match nothing fall back to
//! [`EpochSchedule::DEFAULT`].

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Epoch counts forwarded to the training program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSchedule {
    /// Total number of training epochs.
    pub max_epoch: u32,
    /// Initial epochs trained with a ramped learning rate.
    pub wp_epoch: u32,
    /// Evaluate every this many epochs.
    pub eval_epoch: u32,
    /// Final epochs trained with strong augmentation disabled.
    pub no_aug_epoch: u32,
}

impl EpochSchedule {
    /// Schedule used when the model name matches no known family.
    pub const DEFAULT: EpochSchedule = EpochSchedule::new(150, 3, 10, 0);

    pub const fn new(
        max_epoch: u32,
        wp_epoch: u32,
        eval_epoch: u32,
        no_aug_epoch: u32,
    ) -> Self {
        Self {
            max_epoch,
            wp_epoch,
            eval_epoch,
            no_aug_epoch,
        }
    }

    /// Select the schedule for a model identifier.
    pub fn for_model(model: &str) -> Self {
        match ModelFamily::detect(model) {
            Some(family) => {
                debug!(model, family = %family, "Matched model family");
                family.schedule()
            }
            None => {
                debug!(model, "No model family matched, using default schedule");
                Self::DEFAULT
            }
        }
    }
}

impl Default for EpochSchedule {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for EpochSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "max_epoch={} wp_epoch={} eval_epoch={} no_aug_epoch={}",
            self.max_epoch, self.wp_epoch, self.eval_epoch, self.no_aug_epoch
        )
    }
}

/// Per-field schedule override; unset fields keep the selected schedule's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_epoch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wp_epoch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_epoch: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_aug_epoch: Option<u32>,
}

impl ScheduleOverride {
    pub fn apply(&self, base: EpochSchedule) -> EpochSchedule {
        EpochSchedule {
            max_epoch: self.max_epoch.unwrap_or(base.max_epoch),
            wp_epoch: self.wp_epoch.unwrap_or(base.wp_epoch),
            eval_epoch: self.eval_epoch.unwrap_or(base.eval_epoch),
            no_aug_epoch: self.no_aug_epoch.unwrap_or(base.no_aug_epoch),
        }
    }
}

impl From<EpochSchedule> for ScheduleOverride {
    fn from(s: EpochSchedule) -> Self {
        Self {
            max_epoch: Some(s.max_epoch),
            wp_epoch: Some(s.wp_epoch),
            eval_epoch: Some(s.eval_epoch),
            no_aug_epoch: Some(s.no_aug_epoch),
        }
    }
}

/// Known detector families with a dedicated schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    Yolov8,
    Yolox2,
    Yolox,
    Yolov7,
    Yolov5,
    Yolov4,
    Yolov3,
}

impl ModelFamily {
    /// Families in match order. `Yolox2` precedes `Yolox` because every
    /// `yolox2` name also contains `yolox`.
    pub const ALL: [ModelFamily; 7] = [
        ModelFamily::Yolov8,
        ModelFamily::Yolox2,
        ModelFamily::Yolox,
        ModelFamily::Yolov7,
        ModelFamily::Yolov5,
        ModelFamily::Yolov4,
        ModelFamily::Yolov3,
    ];

    /// Substring identifying the family inside a model name.
    pub fn pattern(&self) -> &'static str {
        match self {
            ModelFamily::Yolov8 => "yolov8",
            ModelFamily::Yolox2 => "yolox2",
            ModelFamily::Yolox => "yolox",
            ModelFamily::Yolov7 => "yolov7",
            ModelFamily::Yolov5 => "yolov5",
            ModelFamily::Yolov4 => "yolov4",
            ModelFamily::Yolov3 => "yolov3",
        }
    }

    pub fn schedule(&self) -> EpochSchedule {
        match self {
            ModelFamily::Yolov8 => EpochSchedule::new(500, 3, 10, 20),
            ModelFamily::Yolox2 | ModelFamily::Yolox => EpochSchedule::new(300, 3, 10, 20),
            ModelFamily::Yolov7 | ModelFamily::Yolov5 => EpochSchedule::new(300, 3, 10, 20),
            ModelFamily::Yolov4 | ModelFamily::Yolov3 => EpochSchedule::new(250, 3, 10, 20),
        }
    }

    /// First family whose pattern occurs in `model`. Matching is case-sensitive.
    pub fn detect(model: &str) -> Option<ModelFamily> {
        Self::ALL.into_iter().find(|f| model.contains(f.pattern()))
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.pattern())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_yolox_s_schedule() {
        assert_eq!(
            EpochSchedule::for_model("yolox_s"),
            EpochSchedule::new(300, 3, 10, 20)
        );
    }

    #[test]
    fn test_yolov8_schedule() {
        let s = EpochSchedule::for_model("yolov8_n");
        assert_eq!(s.max_epoch, 500);
        assert_eq!(s.no_aug_epoch, 20);
    }

    #[test]
    fn test_each_family_detected() {
        let cases = [
            ("yolov8_l", ModelFamily::Yolov8),
            ("yolox2_m", ModelFamily::Yolox2),
            ("yolox_nano", ModelFamily::Yolox),
            ("yolov7_tiny", ModelFamily::Yolov7),
            ("yolov5_s", ModelFamily::Yolov5),
            ("yolov4_e", ModelFamily::Yolov4),
            ("yolov3_t", ModelFamily::Yolov3),
        ];
        for (model, family) in cases {
            assert_eq!(ModelFamily::detect(model), Some(family), "model {model}");
            assert_eq!(EpochSchedule::for_model(model), family.schedule());
        }
    }

    #[test]
    fn test_yolox2_not_shadowed_by_yolox() {
        assert_eq!(ModelFamily::detect("yolox2_s"), Some(ModelFamily::Yolox2));
    }

    #[test]
    fn test_unknown_model_uses_default() {
        for model in ["yolov1", "rtcdet_s", "", "YOLOX_S"] {
            assert_eq!(EpochSchedule::for_model(model), EpochSchedule::new(150, 3, 10, 0));
        }
    }

    #[test]
    fn test_schedule_display() {
        assert_eq!(
            EpochSchedule::DEFAULT.to_string(),
            "max_epoch=150 wp_epoch=3 eval_epoch=10 no_aug_epoch=0"
        );
    }

    #[test]
    fn test_override_fills_unset_fields_from_base() {
        let partial = ScheduleOverride {
            max_epoch: Some(10),
            ..ScheduleOverride::default()
        };
        assert_eq!(
            partial.apply(ModelFamily::Yolox.schedule()),
            EpochSchedule::new(10, 3, 10, 20)
        );
        assert_eq!(
            ScheduleOverride::default().apply(EpochSchedule::DEFAULT),
            EpochSchedule::DEFAULT
        );
    }

    #[test]
    fn test_full_override_replaces_base() {
        let full = ScheduleOverride::from(EpochSchedule::new(12, 1, 2, 0));
        assert_eq!(
            full.apply(ModelFamily::Yolov8.schedule()),
            EpochSchedule::new(12, 1, 2, 0)
        );
    }

    #[test]
    fn test_family_serde_lowercase() {
        let json = serde_json::to_string(&ModelFamily::Yolox2).unwrap();
        assert_eq!(json, "\"yolox2\"");
    }
}
