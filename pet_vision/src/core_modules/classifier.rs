// THEORY:
// The `classifier` is the decision layer of the activity pipeline. It is a pure
// function: given the subject's box, every prediction in the frame, the subject's
// movement since the last frame and the operator's zones, it returns exactly one
// activity and a confidence. It never fails; at worst the movement thresholds
// decide and the detector's own score is reported.
//
// Evaluation order matters. The rules are not first-match: each matching rule
// overwrites the label written by the rules before it.
// 1.  **Zone Proximity**: food, then water, then bed. A subject standing between
//     the food and water zones ends up `Drinking` because water is checked last.
// 2.  **Movement Magnitude**: only when no zone rule fired.
// 3.  **Ancillary Objects**: a bowl, cup or bottle right next to a still subject
//     overwrites whatever came before, including a zone match with a higher
//     confidence. `AncillaryPolicy::PreferZones` turns that override off for
//     frames where a zone already matched.

use crate::core_modules::activity::{Activity, Classification};
use crate::core_modules::detection::{BOWL_CLASS, DRINK_CLASSES, Detection};
use crate::core_modules::zone::{ZoneKind, ZoneRegistry};
use serde::{Deserialize, Serialize};

/// How bowl/cup/bottle detections interact with an earlier zone match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AncillaryPolicy {
    /// A nearby object always overwrites the label, whatever matched before.
    #[default]
    Overwrite,
    /// A nearby object only decides frames where no zone rule matched.
    PreferZones,
}

/// Tunable thresholds for the classifier. Distances are in pixels, movement in
/// pixels per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub feeding_zone_radius: f64,
    pub bed_zone_radius: f64,
    pub ancillary_object_radius: f64,
    /// Below this the subject counts as still enough to eat, drink or rest.
    pub still_movement: f64,
    pub sleep_movement: f64,
    pub standing_movement: f64,
    pub walking_movement: f64,
    pub zone_confidence: f64,
    pub sleep_confidence: f64,
    pub ancillary_confidence: f64,
    pub ancillary_policy: AncillaryPolicy,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            feeding_zone_radius: 150.0,
            bed_zone_radius: 200.0,
            ancillary_object_radius: 100.0,
            still_movement: 5.0,
            sleep_movement: 2.0,
            standing_movement: 10.0,
            walking_movement: 30.0,
            zone_confidence: 0.85,
            sleep_confidence: 0.9,
            ancillary_confidence: 0.8,
            ancillary_policy: AncillaryPolicy::Overwrite,
        }
    }
}

/// Maps one frame's subject, predictions, movement and zones to an activity.
pub fn classify(
    subject: &Detection,
    predictions: &[Detection],
    movement: f64,
    zones: &ZoneRegistry,
    config: &ClassifierConfig,
) -> Classification {
    let center = subject.bbox.centroid();
    let mut result = Classification::new(Activity::Unknown, subject.score);
    let still = movement < config.still_movement;

    // --- 1. Zone Proximity ---
    if let Some(distance) = zones.distance_to(ZoneKind::Food, &center) {
        if distance < config.feeding_zone_radius && still {
            result = Classification::new(Activity::Eating, config.zone_confidence);
        }
    }

    if let Some(distance) = zones.distance_to(ZoneKind::Water, &center) {
        if distance < config.feeding_zone_radius && still {
            result = Classification::new(Activity::Drinking, config.zone_confidence);
        }
    }

    if let Some(distance) = zones.distance_to(ZoneKind::Bed, &center) {
        if distance < config.bed_zone_radius {
            if movement < config.sleep_movement {
                result = Classification::new(Activity::Sleeping, config.sleep_confidence);
            } else if still {
                result = Classification::new(Activity::Resting, config.zone_confidence);
            }
        }
    }

    let zone_matched = result.activity != Activity::Unknown;

    // --- 2. Movement Magnitude ---
    if !zone_matched {
        result.activity = activity_for_movement(movement, config);
    }

    // --- 3. Ancillary Objects ---
    if zone_matched && config.ancillary_policy == AncillaryPolicy::PreferZones {
        return result;
    }

    for prediction in predictions {
        let activity = if prediction.class == BOWL_CLASS {
            Activity::Eating
        } else if DRINK_CLASSES.contains(&prediction.class.as_str()) {
            Activity::Drinking
        } else {
            continue;
        };

        let distance = prediction.bbox.centroid().distance_to(&center);
        if distance < config.ancillary_object_radius && still {
            result = Classification::new(activity, config.ancillary_confidence);
        }
    }

    result
}

/// Movement-only fallback used when no zone explains the frame.
pub fn activity_for_movement(movement: f64, config: &ClassifierConfig) -> Activity {
    if movement < config.sleep_movement {
        Activity::SleepingLying
    } else if movement < config.standing_movement {
        Activity::StandingSitting
    } else if movement < config.walking_movement {
        Activity::Walking
    } else {
        Activity::RunningPlaying
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::detection::BoundingBox;
    use crate::core_modules::zone::Zone;

    /// A dog whose box is centered on `(cx, cy)`.
    fn dog_at(cx: f64, cy: f64, score: f64) -> Detection {
        Detection::new("dog", score, BoundingBox::new(cx - 50.0, cy - 50.0, 100.0, 100.0))
    }

    fn object_at(class: &str, cx: f64, cy: f64) -> Detection {
        Detection::new(class, 0.6, BoundingBox::new(cx - 10.0, cy - 10.0, 20.0, 20.0))
    }

    fn run(subject: &Detection, predictions: &[Detection], movement: f64, zones: &ZoneRegistry) -> Classification {
        classify(subject, predictions, movement, zones, &ClassifierConfig::default())
    }

    #[test]
    fn movement_thresholds_without_zones() {
        let dog = dog_at(300.0, 300.0, 0.77);
        let zones = ZoneRegistry::new();
        let cases = [
            (0.0, Activity::SleepingLying),
            (1.999, Activity::SleepingLying),
            (2.0, Activity::StandingSitting),
            (9.999, Activity::StandingSitting),
            (10.0, Activity::Walking),
            (29.999, Activity::Walking),
            (30.0, Activity::RunningPlaying),
        ];
        for (movement, expected) in cases {
            let result = run(&dog, &[dog.clone()], movement, &zones);
            assert_eq!(result.activity, expected, "movement {movement}");
            assert_eq!(result.confidence, 0.77, "movement {movement}");
        }
    }

    #[test]
    fn near_food_and_still_is_eating() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Food, Zone::new(100.0, 100.0));
        let dog = dog_at(200.0, 100.0, 0.6);
        assert_eq!(run(&dog, &[], 3.0, &zones), Classification::new(Activity::Eating, 0.85));
    }

    #[test]
    fn near_food_but_moving_falls_back_to_movement() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Food, Zone::new(100.0, 100.0));
        let dog = dog_at(100.0, 100.0, 0.6);
        assert_eq!(run(&dog, &[], 12.0, &zones), Classification::new(Activity::Walking, 0.6));
    }

    #[test]
    fn water_overwrites_food_when_both_are_close() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Food, Zone::new(90.0, 100.0));
        zones.set(ZoneKind::Water, Zone::new(110.0, 100.0));
        let dog = dog_at(100.0, 100.0, 0.6);
        assert_eq!(run(&dog, &[], 1.0, &zones), Classification::new(Activity::Drinking, 0.85));
    }

    #[test]
    fn bed_zone_sleeping_and_resting() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Bed, Zone::new(100.0, 100.0));
        let dog = dog_at(250.0, 100.0, 0.6);
        assert_eq!(run(&dog, &[], 1.0, &zones), Classification::new(Activity::Sleeping, 0.9));
        assert_eq!(run(&dog, &[], 4.0, &zones), Classification::new(Activity::Resting, 0.85));
        // Inside the bed radius but too lively to rest.
        assert_eq!(run(&dog, &[], 6.0, &zones).activity, Activity::StandingSitting);
    }

    #[test]
    fn bowl_next_to_subject_overrides_zone_match() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Food, Zone::new(100.0, 100.0));
        let dog = dog_at(100.0, 100.0, 0.6);
        let cup = object_at("cup", 120.0, 100.0);
        let result = run(&dog, &[dog.clone(), cup], 1.0, &zones);
        assert_eq!(result, Classification::new(Activity::Drinking, 0.8));
    }

    #[test]
    fn later_ancillary_object_wins() {
        let dog = dog_at(100.0, 100.0, 0.6);
        let zones = ZoneRegistry::new();
        let cup = object_at("cup", 110.0, 100.0);
        let bowl = object_at("bowl", 90.0, 100.0);

        let cup_then_bowl = run(&dog, &[cup.clone(), bowl.clone()], 0.5, &zones);
        assert_eq!(cup_then_bowl, Classification::new(Activity::Eating, 0.8));

        let bowl_then_cup = run(&dog, &[bowl, cup], 0.5, &zones);
        assert_eq!(bowl_then_cup, Classification::new(Activity::Drinking, 0.8));
    }

    #[test]
    fn far_or_moving_ancillary_objects_are_ignored() {
        let dog = dog_at(100.0, 100.0, 0.6);
        let zones = ZoneRegistry::new();
        let far_bowl = object_at("bowl", 300.0, 100.0);
        assert_eq!(run(&dog, &[far_bowl], 0.5, &zones).activity, Activity::SleepingLying);

        let near_bowl = object_at("bowl", 110.0, 100.0);
        assert_eq!(run(&dog, &[near_bowl], 7.0, &zones).activity, Activity::StandingSitting);
    }

    #[test]
    fn prefer_zones_keeps_zone_match() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Bed, Zone::new(100.0, 100.0));
        let dog = dog_at(100.0, 100.0, 0.6);
        let cup = object_at("cup", 105.0, 100.0);
        let config = ClassifierConfig {
            ancillary_policy: AncillaryPolicy::PreferZones,
            ..ClassifierConfig::default()
        };

        let result = classify(&dog, &[cup.clone()], 0.0, &zones, &config);
        assert_eq!(result, Classification::new(Activity::Sleeping, 0.9));

        // Without a zone match the cup still decides.
        let result = classify(&dog, &[cup], 0.0, &ZoneRegistry::new(), &config);
        assert_eq!(result, Classification::new(Activity::Drinking, 0.8));
    }
}
