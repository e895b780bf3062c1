use serde::{Deserialize, Serialize};

use super::asset::AssetType;

/// The ten fixed lineup slots.
///
/// Two of each scored archetype, one brand slot, one flexible slot that may
/// hold any archetype. Slot assignment is owned by the roster subsystem;
/// this core only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotKind {
    Manufacturer1,
    Manufacturer2,
    Cultivar1,
    Cultivar2,
    Product1,
    Product2,
    Pharmacy1,
    Pharmacy2,
    Brand,
    Flex,
}

impl SlotKind {
    pub const ALL: [SlotKind; 10] = [
        SlotKind::Manufacturer1,
        SlotKind::Manufacturer2,
        SlotKind::Cultivar1,
        SlotKind::Cultivar2,
        SlotKind::Product1,
        SlotKind::Product2,
        SlotKind::Pharmacy1,
        SlotKind::Pharmacy2,
        SlotKind::Brand,
        SlotKind::Flex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Manufacturer1 => "manufacturer_1",
            SlotKind::Manufacturer2 => "manufacturer_2",
            SlotKind::Cultivar1 => "cultivar_1",
            SlotKind::Cultivar2 => "cultivar_2",
            SlotKind::Product1 => "product_1",
            SlotKind::Product2 => "product_2",
            SlotKind::Pharmacy1 => "pharmacy_1",
            SlotKind::Pharmacy2 => "pharmacy_2",
            SlotKind::Brand => "brand",
            SlotKind::Flex => "flex",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// The archetype a non-flex slot is pinned to. `None` for the flex slot,
    /// whose archetype comes from the asset actually placed in it.
    pub fn fixed_type(&self) -> Option<AssetType> {
        match self {
            SlotKind::Manufacturer1 | SlotKind::Manufacturer2 => Some(AssetType::Manufacturer),
            SlotKind::Cultivar1 | SlotKind::Cultivar2 => Some(AssetType::Cultivar),
            SlotKind::Product1 | SlotKind::Product2 => Some(AssetType::Product),
            SlotKind::Pharmacy1 | SlotKind::Pharmacy2 => Some(AssetType::Pharmacy),
            SlotKind::Brand => Some(AssetType::Brand),
            SlotKind::Flex => None,
        }
    }
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One populated slot in a team's lineup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineupSlot {
    pub slot: SlotKind,
    pub asset_id: i64,
    /// The asset's actual archetype. Equals `slot.fixed_type()` for non-flex
    /// slots; resolves the flex slot's archetype.
    pub asset_type: AssetType,
}

/// A team's slot assignments for one scoring period. Unpopulated slots are
/// simply absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lineup {
    pub team_id: i64,
    pub slots: Vec<LineupSlot>,
}

impl Lineup {
    /// Effective archetype grouping used by composition bonuses: the flex
    /// slot counts toward the archetype of the asset that fills it.
    pub fn effective_type(slot: &LineupSlot) -> AssetType {
        slot.slot.fixed_type().unwrap_or(slot.asset_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_roundtrip() {
        for k in SlotKind::ALL {
            assert_eq!(SlotKind::parse(k.as_str()), Some(k));
        }
    }

    #[test]
    fn test_flex_folds_into_actual_type() {
        let slot = LineupSlot {
            slot: SlotKind::Flex,
            asset_id: 7,
            asset_type: AssetType::Cultivar,
        };
        assert_eq!(Lineup::effective_type(&slot), AssetType::Cultivar);

        let pinned = LineupSlot {
            slot: SlotKind::Pharmacy1,
            asset_id: 8,
            asset_type: AssetType::Pharmacy,
        };
        assert_eq!(Lineup::effective_type(&pinned), AssetType::Pharmacy);
    }
}
