use crate::components::{DisasterEffects, DisasterKind};

#[derive(Debug, Clone, Copy)]
pub struct HazardProfile {
    pub kind: DisasterKind,
    pub annual_probability: f64,
    pub radius: (f64, f64),
    pub duration_days: (f64, f64),
    pub city_wide: bool,
    pub building_damage: f64,
    pub happiness: f64,
    pub safety: f64,
    pub health: f64,
    pub mortality: f64,
}

pub const SEVERITY_RANGE: (f64, f64) = (0.3, 1.0);

const HAZARDS: &[HazardProfile] = &[
    HazardProfile {
        kind: DisasterKind::Fire,
        annual_probability: 1.5,
        radius: (2.0, 4.0),
        duration_days: (2.0, 5.0),
        city_wide: false,
        building_damage: 12.0,
        happiness: 1.5,
        safety: 6.0,
        health: 0.5,
        mortality: 0.000_5,
    },
    HazardProfile {
        kind: DisasterKind::Flood,
        annual_probability: 0.6,
        radius: (3.0, 6.0),
        duration_days: (3.0, 8.0),
        city_wide: false,
        building_damage: 5.0,
        happiness: 1.0,
        safety: 3.0,
        health: 1.0,
        mortality: 0.000_2,
    },
    HazardProfile {
        kind: DisasterKind::Earthquake,
        annual_probability: 0.15,
        radius: (5.0, 10.0),
        duration_days: (1.0, 2.0),
        city_wide: false,
        building_damage: 25.0,
        happiness: 4.0,
        safety: 10.0,
        health: 2.0,
        mortality: 0.002,
    },
    HazardProfile {
        kind: DisasterKind::Tornado,
        annual_probability: 0.25,
        radius: (2.0, 4.0),
        duration_days: (1.0, 2.0),
        city_wide: false,
        building_damage: 22.0,
        happiness: 3.0,
        safety: 8.0,
        health: 1.0,
        mortality: 0.001,
    },
    HazardProfile {
        kind: DisasterKind::Epidemic,
        annual_probability: 0.35,
        radius: (0.0, 0.0),
        duration_days: (10.0, 25.0),
        city_wide: true,
        building_damage: 0.0,
        happiness: 0.8,
        safety: 0.5,
        health: 5.0,
        mortality: 0.000_8,
    },
];

pub fn profile(kind: DisasterKind) -> &'static HazardProfile {
    HAZARDS
        .iter()
        .find(|hazard| hazard.kind == kind)
        .unwrap_or(&HAZARDS[0])
}

pub fn profiles() -> &'static [HazardProfile] {
    HAZARDS
}

impl HazardProfile {
    pub fn effects(&self, severity: f64) -> DisasterEffects {
        DisasterEffects {
            building_damage: self.building_damage * severity,
            happiness: self.happiness * severity,
            safety: self.safety * severity,
            health: self.health * severity,
            mortality: self.mortality * severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_profile() {
        for kind in DisasterKind::ALL {
            assert_eq!(profile(kind).kind, kind);
        }
    }

    #[test]
    fn effects_scale_with_severity() {
        let quake = profile(DisasterKind::Earthquake);
        let mild = quake.effects(0.3);
        let severe = quake.effects(1.0);
        assert!(severe.building_damage > mild.building_damage);
        assert_eq!(severe.building_damage, quake.building_damage);
    }
}
