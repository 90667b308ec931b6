use serde::{Deserialize, Serialize};

/// Closed enumeration of OSM highway classes the planner understands.
/// `_link` variants share their parent's hierarchy rank.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HighwayClass {
    Motorway,
    MotorwayLink,
    Trunk,
    TrunkLink,
    Primary,
    PrimaryLink,
    Secondary,
    SecondaryLink,
    Tertiary,
    TertiaryLink,
    Residential,
    LivingStreet,
    Unclassified,
    Service,
    Pedestrian,
}

impl HighwayClass {
    /// `HIERARCHY_MAP` from the original partitioner: lower is more
    /// important. Unknown classes (not representable here) default to 6
    /// in the constraint enforcer's cut-cost lookup, not here.
    pub fn hierarchy(&self) -> u8 {
        use HighwayClass::*;
        match self {
            Motorway | MotorwayLink => 1,
            Trunk | TrunkLink => 2,
            Primary | PrimaryLink => 3,
            Secondary | SecondaryLink => 4,
            Tertiary | TertiaryLink => 5,
            Residential => 6,
            LivingStreet => 7,
            Unclassified => 8,
            Service | Pedestrian => 9,
        }
    }

    /// Whether this class alone qualifies an edge as arterial, regardless
    /// of its centrality score (Arterializer §4.4).
    pub fn is_arterial_class(&self) -> bool {
        use HighwayClass::*;
        matches!(
            self,
            Primary | PrimaryLink | Secondary | SecondaryLink | Tertiary | TertiaryLink
        )
    }

    pub fn from_osm_tag(tag: &str) -> Option<HighwayClass> {
        use HighwayClass::*;
        Some(match tag {
            "motorway" => Motorway,
            "motorway_link" => MotorwayLink,
            "trunk" => Trunk,
            "trunk_link" => TrunkLink,
            "primary" => Primary,
            "primary_link" => PrimaryLink,
            "secondary" => Secondary,
            "secondary_link" => SecondaryLink,
            "tertiary" => Tertiary,
            "tertiary_link" => TertiaryLink,
            "residential" => Residential,
            "living_street" => LivingStreet,
            "unclassified" => Unclassified,
            "service" => Service,
            "pedestrian" => Pedestrian,
            _ => return None,
        })
    }
}
