use crate::core_modules::detection::Centroid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed set of points of interest an operator can place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneKind {
    Food,
    Water,
    Bed,
}

impl ZoneKind {
    pub const ALL: [ZoneKind; 3] = [ZoneKind::Food, ZoneKind::Water, ZoneKind::Bed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Water => "water",
            Self::Bed => "bed",
        }
    }
}

impl fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ZoneKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "food" => Ok(Self::Food),
            "water" => Ok(Self::Water),
            "bed" => Ok(Self::Bed),
            other => Err(format!("unknown zone `{other}`")),
        }
    }
}

/// A zone's location in image-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub x: f64,
    pub y: f64,
}

impl Zone {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn as_centroid(&self) -> Centroid {
        Centroid::new(self.x, self.y)
    }
}

/// Session-scoped slots for the food, water and bed zones.
/// A slot is overwritten when re-placed and never cleared.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneRegistry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<Zone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water: Option<Zone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bed: Option<Zone>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: ZoneKind, zone: Zone) {
        *self.slot_mut(kind) = Some(zone);
    }

    pub fn get(&self, kind: ZoneKind) -> Option<Zone> {
        match kind {
            ZoneKind::Food => self.food,
            ZoneKind::Water => self.water,
            ZoneKind::Bed => self.bed,
        }
    }

    /// Distance from `point` to the zone, or `None` when the zone was never placed.
    pub fn distance_to(&self, kind: ZoneKind, point: &Centroid) -> Option<f64> {
        self.get(kind).map(|z| z.as_centroid().distance_to(point))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ZoneKind, Zone)> + '_ {
        ZoneKind::ALL
            .into_iter()
            .filter_map(move |kind| self.get(kind).map(|z| (kind, z)))
    }

    fn slot_mut(&mut self, kind: ZoneKind) -> &mut Option<Zone> {
        match kind {
            ZoneKind::Food => &mut self.food,
            ZoneKind::Water => &mut self.water,
            ZoneKind::Bed => &mut self.bed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites_previous_zone() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Bed, Zone::new(10.0, 10.0));
        zones.set(ZoneKind::Bed, Zone::new(30.0, 40.0));
        assert_eq!(zones.get(ZoneKind::Bed), Some(Zone::new(30.0, 40.0)));
        assert_eq!(zones.iter().count(), 1);
    }

    #[test]
    fn unset_zone_has_no_distance() {
        let zones = ZoneRegistry::new();
        assert!(zones.distance_to(ZoneKind::Food, &Centroid::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn distance_is_euclidean() {
        let mut zones = ZoneRegistry::new();
        zones.set(ZoneKind::Water, Zone::new(3.0, 4.0));
        let d = zones.distance_to(ZoneKind::Water, &Centroid::new(0.0, 0.0)).unwrap();
        assert!((d - 5.0).abs() < 1e-9);
    }
}
