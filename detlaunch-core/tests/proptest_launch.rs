//! Property-based tests for dispatch and schedule selection using proptest.

use proptest::prelude::*;

use detlaunch_core::{
    EpochSchedule, LaunchConfig, LaunchError, LaunchMode, ModelFamily, dispatch,
};

// --- Worker count properties ---

proptest! {
    #[test]
    fn in_range_world_size_dispatches(n in 1i64..=8) {
        let d = dispatch(&LaunchConfig::default(), n).unwrap();
        prop_assert_eq!(i64::from(d.mode.world_size()), n);
        prop_assert_eq!(d.mode.is_distributed(), n > 1);
        prop_assert_eq!(d.plan.args.iter().any(|a| a == "--sybn"), n > 1);
        let nproc = format!("--nproc_per_node={n}");
        prop_assert_eq!(d.plan.args.contains(&nproc), n > 1);
    }

    #[test]
    fn too_large_world_size_rejected(n in 9i64..10_000) {
        let err = LaunchMode::from_world_size(n).unwrap_err();
        prop_assert!(
            matches!(err, LaunchError::WorldSizeTooLarge { value } if value == n),
            "unexpected error for {}",
            n
        );
        prop_assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn non_positive_world_size_rejected(n in -10_000i64..=0) {
        let err = LaunchMode::from_world_size(n).unwrap_err();
        prop_assert!(err.is_world_size());
        prop_assert_eq!(err.exit_code(), 1);
    }
}

// --- Schedule selection properties ---

proptest! {
    #[test]
    fn unrecognized_model_uses_default(model in "[a-z0-9_]{0,16}") {
        prop_assume!(ModelFamily::detect(&model).is_none());
        prop_assert_eq!(EpochSchedule::for_model(&model), EpochSchedule::new(150, 3, 10, 0));
    }

    #[test]
    fn family_pattern_anywhere_selects_family(
        prefix in "[A-Z0-9_]{0,6}",
        suffix in "(_[A-Z0-9]{0,5})?",
        idx in 0usize..ModelFamily::ALL.len(),
    ) {
        let family = ModelFamily::ALL[idx];
        let model = format!("{prefix}{}{suffix}", family.pattern());
        prop_assert_eq!(ModelFamily::detect(&model), Some(family));
        prop_assert_eq!(EpochSchedule::for_model(&model), family.schedule());
    }

    #[test]
    fn plan_forwards_selected_schedule(idx in 0usize..ModelFamily::ALL.len(), n in 1i64..=8) {
        let family = ModelFamily::ALL[idx];
        let config = LaunchConfig {
            model: format!("{}_s", family.pattern()),
            ..LaunchConfig::default()
        };
        let d = dispatch(&config, n).unwrap();
        let s = family.schedule();
        let max_epoch = s.max_epoch.to_string();
        let no_aug_epoch = s.no_aug_epoch.to_string();
        prop_assert_eq!(d.plan.flag_value("--max_epoch"), Some(max_epoch.as_str()));
        prop_assert_eq!(d.plan.flag_value("--no_aug_epoch"), Some(no_aug_epoch.as_str()));
    }
}
