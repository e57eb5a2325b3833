// 🏠 Housing Records - Partial views of houses and prices
//
// Every source only knows part of a house. Readers build partial records,
// the merge engine completes them, the loader writes them.
//
// Absent fields are None: "unknown", never "false" or "zero".

use serde::{Deserialize, Serialize};

// ============================================================================
// RECORD TRAIT
// ============================================================================

/// Record - anything the merge engine can reconcile
///
/// Implementors have a unique integer identifier and a fixed set of optional
/// fields. `merge_with` combines two views field by field, keeping the value
/// of `self` when present and falling back to `other`.
pub trait Record: Sized {
    /// Human-readable entity name (used in logs and errors)
    const ENTITY: &'static str;

    fn house_id(&self) -> i64;

    /// Field-wise merge; callers guarantee both sides share `house_id`
    fn merge_with(self, other: Self) -> Self;
}

// ============================================================================
// FURNISHING STATUS
// ============================================================================

/// FurnishingStatus - closed enumeration stored by integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FurnishingStatus {
    Furnished,
    Unfurnished,
    SemiFurnished,
}

impl FurnishingStatus {
    /// All statuses, in code order (seeds the lookup table)
    pub const ALL: [FurnishingStatus; 3] = [
        FurnishingStatus::Furnished,
        FurnishingStatus::Unfurnished,
        FurnishingStatus::SemiFurnished,
    ];

    pub fn code(&self) -> i64 {
        match self {
            FurnishingStatus::Furnished => 0,
            FurnishingStatus::Unfurnished => 1,
            FurnishingStatus::SemiFurnished => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FurnishingStatus::Furnished => "furnished",
            FurnishingStatus::Unfurnished => "unfurnished",
            FurnishingStatus::SemiFurnished => "semi-furnished",
        }
    }

    /// Map a source label to a status.
    ///
    /// Unrecognized labels fall back to `Furnished`, which makes them
    /// indistinguishable from a real "furnished" row once loaded.
    pub fn from_label(label: &str) -> Self {
        match label {
            "unfurnished" => FurnishingStatus::Unfurnished,
            "semi-furnished" => FurnishingStatus::SemiFurnished,
            _ => FurnishingStatus::Furnished,
        }
    }
}

// ============================================================================
// HOUSE RECORD
// ============================================================================

/// HouseRecord - one row of `house_data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HouseRecord {
    pub house_id: i64,
    pub n_bedroom: Option<i64>,
    pub n_bathroom: Option<i64>,
    pub n_stories: Option<i64>,
    pub n_parking_slot: Option<i64>,
    pub is_mainroad: Option<bool>,
    pub has_guestroom: Option<bool>,
    pub has_basement: Option<bool>,
    pub has_hot_water: Option<bool>,
    pub has_air_conditioning: Option<bool>,
    pub is_pref_area: Option<bool>,
    pub furnishing_id: Option<i64>,
}

impl HouseRecord {
    /// Record with only the identifier known
    pub fn new(house_id: i64) -> Self {
        HouseRecord {
            house_id,
            ..Default::default()
        }
    }

    /// Builder pattern: add bedroom count
    pub fn with_bedrooms(mut self, n_bedroom: i64) -> Self {
        self.n_bedroom = Some(n_bedroom);
        self
    }

    /// Builder pattern: add furnishing status
    pub fn with_furnishing(mut self, status: FurnishingStatus) -> Self {
        self.furnishing_id = Some(status.code());
        self
    }
}

impl Record for HouseRecord {
    const ENTITY: &'static str = "house";

    fn house_id(&self) -> i64 {
        self.house_id
    }

    fn merge_with(self, other: Self) -> Self {
        HouseRecord {
            house_id: self.house_id,
            n_bedroom: self.n_bedroom.or(other.n_bedroom),
            n_bathroom: self.n_bathroom.or(other.n_bathroom),
            n_stories: self.n_stories.or(other.n_stories),
            n_parking_slot: self.n_parking_slot.or(other.n_parking_slot),
            is_mainroad: self.is_mainroad.or(other.is_mainroad),
            has_guestroom: self.has_guestroom.or(other.has_guestroom),
            has_basement: self.has_basement.or(other.has_basement),
            has_hot_water: self.has_hot_water.or(other.has_hot_water),
            has_air_conditioning: self.has_air_conditioning.or(other.has_air_conditioning),
            is_pref_area: self.is_pref_area.or(other.is_pref_area),
            furnishing_id: self.furnishing_id.or(other.furnishing_id),
        }
    }
}

// ============================================================================
// HOUSE PRICE RECORD
// ============================================================================

/// HousePriceRecord - one row of `house_price_data`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HousePriceRecord {
    pub house_id: i64,
    pub area: Option<i64>,
    pub price: Option<i64>,
}

impl HousePriceRecord {
    pub fn new(house_id: i64) -> Self {
        HousePriceRecord {
            house_id,
            ..Default::default()
        }
    }

    pub fn with_area(mut self, area: i64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn with_price(mut self, price: i64) -> Self {
        self.price = Some(price);
        self
    }
}

impl Record for HousePriceRecord {
    const ENTITY: &'static str = "house price";

    fn house_id(&self) -> i64 {
        self.house_id
    }

    fn merge_with(self, other: Self) -> Self {
        HousePriceRecord {
            house_id: self.house_id,
            area: self.area.or(other.area),
            price: self.price.or(other.price),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
