//! Named training invocations kept for manual experimentation.
//!
//! The built-in book mirrors a list of hand-tuned command lines, exactly one
//! of which is active at a time. Workspace or user config can add entries,
//! replace built-ins by name and switch the active entry.

use serde::{Deserialize, Serialize};

use crate::config::PresetsConfig;
use crate::error::{LaunchError, Result};
use crate::launch::LaunchPlan;

/// Preset selected when the configuration names none.
pub const DEFAULT_ACTIVE: &str = "yolox_s-coco";

/// A fixed argument list for the training program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Arguments passed after the interpreter, starting with the script.
    pub args: Vec<String>,
}

impl Preset {
    pub fn new(name: &str, description: &str, args: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            args: args.split_whitespace().map(str::to_string).collect(),
        }
    }

    pub fn plan(&self, program: &str) -> LaunchPlan {
        LaunchPlan {
            program: program.to_string(),
            args: self.args.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresetBook {
    active: String,
    presets: Vec<Preset>,
}

impl PresetBook {
    pub fn builtin() -> Self {
        let presets = vec![
            Preset::new(
                "yolov1-voc",
                "YOLOv1 on VOC, short schedule",
                "train.py --cuda -d voc --root /data/datasets/ -m yolov1 -bs 16 \
                 --max_epoch 150 --wp_epoch 1 --eval_epoch 10 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                "yolov2-voc",
                "YOLOv2 on VOC, short schedule",
                "train.py --cuda -d voc --root /data/datasets/ -m yolov2 -bs 16 \
                 --max_epoch 150 --wp_epoch 1 --eval_epoch 10 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                "yolov3-coco",
                "YOLOv3 on COCO",
                "train.py --cuda -d coco --root /data/datasets/ -m yolov3 -bs 16 \
                 --max_epoch 250 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
                 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                "yolov5_s-coco",
                "YOLOv5-S on COCO",
                "train.py --cuda -d coco --root /data/datasets/ -m yolov5_s -bs 16 \
                 --max_epoch 300 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
                 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                "yolov7_tiny-coco",
                "YOLOv7-Tiny on COCO",
                "train.py --cuda -d coco --root /data/datasets/ -m yolov7_tiny -bs 16 \
                 --max_epoch 300 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
                 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                DEFAULT_ACTIVE,
                "YOLOX-S on COCO",
                "train.py --cuda -d coco --root /data/datasets/ -m yolox_s -bs 16 \
                 --max_epoch 300 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
                 --fp16 --ema --multi_scale",
            ),
            Preset::new(
                "yolov8_n-coco",
                "YOLOv8-N on COCO, long schedule",
                "train.py --cuda -d coco --root /data/datasets/ -m yolov8_n -bs 16 \
                 --max_epoch 500 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
                 --fp16 --ema --multi_scale",
            ),
        ];
        Self {
            active: DEFAULT_ACTIVE.to_string(),
            presets,
        }
    }

    /// Built-ins merged with configured entries; validates the active name.
    pub fn from_config(config: &PresetsConfig) -> Result<Self> {
        let mut book = Self::builtin();
        for entry in &config.entries {
            book.insert(entry.clone());
        }
        if let Some(active) = &config.active {
            book.set_active(active)?;
        }
        Ok(book)
    }

    /// Add a preset, replacing any existing one with the same name.
    pub fn insert(&mut self, preset: Preset) {
        match self.presets.iter_mut().find(|p| p.name == preset.name) {
            Some(existing) => *existing = preset,
            None => self.presets.push(preset),
        }
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        if self.get(name).is_none() {
            return Err(LaunchError::PresetNotFound {
                name: name.to_string(),
            });
        }
        self.active = name.to_string();
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Preset> {
        self.presets.iter().find(|p| p.name == name)
    }

    /// Look up `name`, or the active preset when `name` is `None`.
    pub fn resolve(&self, name: Option<&str>) -> Result<&Preset> {
        let name = name.unwrap_or(self.active.as_str());
        self.get(name).ok_or_else(|| LaunchError::PresetNotFound {
            name: name.to_string(),
        })
    }

    pub fn active(&self) -> &Preset {
        // set_active and builtin keep `active` pointing at an existing entry
        self.get(&self.active).unwrap_or(&self.presets[0])
    }

    pub fn active_name(&self) -> &str {
        &self.active
    }

    pub fn names(&self) -> Vec<&str> {
        self.presets.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }
}

impl Default for PresetBook {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_has_single_active() {
        let book = PresetBook::builtin();
        assert_eq!(book.active_name(), "yolox_s-coco");
        assert_eq!(book.active().name, "yolox_s-coco");
        assert!(book.names().len() >= 7);
    }

    #[test]
    fn test_active_plan_render() {
        let book = PresetBook::builtin();
        let plan = book.active().plan("python");
        assert_eq!(
            plan.render(),
            "python train.py --cuda -d coco --root /data/datasets/ -m yolox_s -bs 16 \
             --max_epoch 300 --wp_epoch 3 --eval_epoch 10 --no_aug_epoch 20 \
             --fp16 --ema --multi_scale"
        );
    }

    #[test]
    fn test_resolve_named_and_missing() {
        let book = PresetBook::builtin();
        assert_eq!(book.resolve(Some("yolov1-voc")).unwrap().name, "yolov1-voc");
        assert_eq!(book.resolve(None).unwrap().name, "yolox_s-coco");
        assert!(matches!(
            book.resolve(Some("yolov9-coco")),
            Err(LaunchError::PresetNotFound { .. })
        ));
    }

    #[test]
    fn test_from_config_replaces_and_adds() {
        let config = PresetsConfig {
            active: Some("rtcdet-coco".into()),
            entries: vec![
                Preset::new("yolov1-voc", "patched", "train.py -m yolov1 -bs 8"),
                Preset::new("rtcdet-coco", "custom", "train.py -m rtcdet_s"),
            ],
        };
        let book = PresetBook::from_config(&config).unwrap();
        assert_eq!(book.active().name, "rtcdet-coco");
        assert_eq!(book.get("yolov1-voc").unwrap().description, "patched");
        assert_eq!(
            book.names().iter().filter(|n| **n == "yolov1-voc").count(),
            1
        );
    }

    #[test]
    fn test_from_config_unknown_active() {
        let config = PresetsConfig {
            active: Some("nope".into()),
            entries: Vec::new(),
        };
        let err = PresetBook::from_config(&config).unwrap_err();
        assert_eq!(err.to_string(), "Preset not found: nope");
    }
}
