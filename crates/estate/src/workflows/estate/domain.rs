use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::metrics::{InvestmentInputs, RentalInputs};
use super::stage::{stage_for, StageKey};

/// Default offer validity in days.
pub const DEFAULT_OFFER_VALIDITY_DAYS: i64 = 7;
/// Garden area applied when a garden is switched on without an explicit area.
pub const DEFAULT_GARDEN_AREA: u32 = 100;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

record_id!(
    /// Identifier of a listed property.
    PropertyId
);
record_id!(OfferId);
record_id!(ImageId);
record_id!(
    /// Buyer or website visitor contact.
    PartnerId
);
record_id!(
    /// Salesperson account.
    UserId
);
record_id!(
    /// Fixed identifier of a type, tag or utility entry.
    ReferenceId
);

/// Lifecycle of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyState {
    New,
    OfferReceived,
    OfferAccepted,
    Sold,
    Canceled,
}

impl PropertyState {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::New,
            Self::OfferReceived,
            Self::OfferAccepted,
            Self::Sold,
            Self::Canceled,
        ]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::OfferReceived => "offer_received",
            Self::OfferAccepted => "offer_accepted",
            Self::Sold => "sold",
            Self::Canceled => "canceled",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::OfferReceived => "Offer Received",
            Self::OfferAccepted => "Offer Accepted",
            Self::Sold => "Sold",
            Self::Canceled => "Canceled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|state| state.as_str() == raw.trim())
    }

    /// Sold and canceled listings no longer take offers.
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Sold | Self::Canceled)
    }

    pub const fn is_deletable(self) -> bool {
        matches!(self, Self::New | Self::Canceled)
    }

    /// States counted as a salesperson's open workload.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::New | Self::OfferReceived | Self::OfferAccepted)
    }
}

impl fmt::Display for PropertyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferState {
    Pending,
    Accepted,
    Refused,
}

impl OfferState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Accepted => "Accepted",
            Self::Refused => "Refused",
        }
    }

    /// Pending and accepted offers set the floor for new bids.
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Accepted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GardenOrientation {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "W")]
    West,
}

impl GardenOrientation {
    pub const fn label(self) -> &'static str {
        match self {
            Self::North => "North",
            Self::South => "South",
            Self::East => "East",
            Self::West => "West",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyAddress {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub street2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postcode: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFeatures {
    pub bedrooms: u32,
    pub bathrooms: f32,
    pub living_area: u32,
    pub lot_size: u32,
    pub facades: u32,
    pub garage: bool,
    pub garden: bool,
    pub garden_area: u32,
    pub garden_orientation: Option<GardenOrientation>,
}

impl Default for PropertyFeatures {
    fn default() -> Self {
        Self {
            bedrooms: 2,
            bathrooms: 1.0,
            living_area: 0,
            lot_size: 0,
            facades: 0,
            garage: false,
            garden: false,
            garden_area: 0,
            garden_orientation: None,
        }
    }
}

impl PropertyFeatures {
    pub fn total_area(&self) -> u64 {
        u64::from(self.living_area) + u64::from(self.garden_area)
    }

    /// Switch the garden on or off, filling in the usual defaults.
    pub fn set_garden(&mut self, garden: bool) {
        self.garden = garden;
        if garden {
            self.garden_area = DEFAULT_GARDEN_AREA;
            self.garden_orientation = Some(GardenOrientation::South);
        } else {
            self.garden_area = 0;
            self.garden_orientation = None;
        }
    }
}

/// A listing under management.
///
/// `state` and `stage` are private so the stage projection can only change
/// together with the state, through [`Property::set_state`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub revision: u64,
    pub name: String,
    pub description: Option<String>,
    pub address: PropertyAddress,
    pub date_availability: Option<NaiveDate>,
    pub created_on: NaiveDate,
    pub expected_price: f64,
    pub selling_price: f64,
    pub investment: InvestmentInputs,
    pub rental: RentalInputs,
    pub features: PropertyFeatures,
    state: PropertyState,
    stage: StageKey,
    pub active: bool,
    pub website_published: bool,
    pub property_type: Option<ReferenceId>,
    pub salesperson: Option<UserId>,
    pub buyer: Option<PartnerId>,
    pub tags: Vec<ReferenceId>,
    pub utilities: Vec<ReferenceId>,
}

impl Property {
    pub fn new(
        id: PropertyId,
        name: impl Into<String>,
        expected_price: f64,
        today: NaiveDate,
    ) -> Self {
        Self {
            id,
            revision: 0,
            name: name.into(),
            description: None,
            address: PropertyAddress::default(),
            date_availability: today.checked_add_months(Months::new(3)),
            created_on: today,
            expected_price,
            selling_price: 0.0,
            investment: InvestmentInputs::default(),
            rental: RentalInputs::default(),
            features: PropertyFeatures::default(),
            state: PropertyState::New,
            stage: stage_for(PropertyState::New),
            active: true,
            website_published: false,
            property_type: None,
            salesperson: None,
            buyer: None,
            tags: Vec::new(),
            utilities: Vec::new(),
        }
    }

    pub fn state(&self) -> PropertyState {
        self.state
    }

    pub fn stage(&self) -> StageKey {
        self.stage
    }

    /// Write the state and its stage projection together. Returns the previous
    /// state when it actually changed.
    pub fn set_state(&mut self, state: PropertyState) -> Option<PropertyState> {
        let previous = self.state;
        self.state = state;
        self.stage = stage_for(state);
        (previous != state).then_some(previous)
    }

    pub fn is_public(&self) -> bool {
        self.website_published && self.active
    }
}

/// A buyer's bid on a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: OfferId,
    pub property_id: PropertyId,
    pub partner_id: PartnerId,
    pub price: f64,
    pub validity: i64,
    pub date_deadline: NaiveDate,
    pub created_at: Option<DateTime<Utc>>,
    pub state: OfferState,
}

impl Offer {
    /// The date validity is counted from: the creation date, or `today` before creation.
    pub fn anchor_date(&self, today: NaiveDate) -> NaiveDate {
        self.created_at
            .map(|created| created.date_naive())
            .unwrap_or(today)
    }

    pub fn set_validity(&mut self, validity: i64, today: NaiveDate) {
        self.validity = validity;
        self.date_deadline = add_days(self.anchor_date(today), validity);
    }

    pub fn set_deadline(&mut self, deadline: NaiveDate, today: NaiveDate) {
        self.date_deadline = deadline;
        self.validity = deadline
            .signed_duration_since(self.anchor_date(today))
            .num_days();
    }
}

/// Calendar-day arithmetic that tolerates negative offsets.
pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    let shifted = if days >= 0 {
        date.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted.unwrap_or(date)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyImage {
    pub id: ImageId,
    pub property_id: PropertyId,
    pub name: Option<String>,
    pub sequence: u32,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Partner {
    pub fn has_email(&self, email: &str) -> bool {
        self.email
            .as_deref()
            .is_some_and(|own| own.trim().eq_ignore_ascii_case(email.trim()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Salesperson {
    pub id: UserId,
    pub name: String,
    pub email: Option<String>,
}

/// Payload for listing a new property.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewProperty {
    pub name: String,
    pub expected_price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: PropertyAddress,
    #[serde(default)]
    pub date_availability: Option<NaiveDate>,
    #[serde(default)]
    pub investment: InvestmentInputs,
    #[serde(default)]
    pub rental: RentalInputs,
    #[serde(default)]
    pub features: Option<PropertyFeatures>,
    #[serde(default)]
    pub state: Option<PropertyState>,
    #[serde(default)]
    pub website_published: bool,
    #[serde(default)]
    pub property_type: Option<ReferenceId>,
    #[serde(default)]
    pub salesperson: Option<UserId>,
    #[serde(default)]
    pub tags: Vec<ReferenceId>,
    #[serde(default)]
    pub utilities: Vec<ReferenceId>,
}

/// Partial write to an existing property; absent fields are left untouched.
///
/// Setting `state` is a direct field write: no lifecycle guard applies, only
/// the stage projection follows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<PropertyAddress>,
    #[serde(default)]
    pub date_availability: Option<NaiveDate>,
    #[serde(default)]
    pub expected_price: Option<f64>,
    #[serde(default)]
    pub selling_price: Option<f64>,
    #[serde(default)]
    pub investment: Option<InvestmentInputs>,
    #[serde(default)]
    pub rental: Option<RentalInputs>,
    #[serde(default)]
    pub bedrooms: Option<u32>,
    #[serde(default)]
    pub bathrooms: Option<f32>,
    #[serde(default)]
    pub living_area: Option<u32>,
    #[serde(default)]
    pub lot_size: Option<u32>,
    #[serde(default)]
    pub facades: Option<u32>,
    #[serde(default)]
    pub garage: Option<bool>,
    #[serde(default)]
    pub garden: Option<bool>,
    #[serde(default)]
    pub garden_area: Option<u32>,
    #[serde(default)]
    pub garden_orientation: Option<GardenOrientation>,
    #[serde(default)]
    pub state: Option<PropertyState>,
    #[serde(default)]
    pub active: Option<bool>,
    #[serde(default)]
    pub website_published: Option<bool>,
    #[serde(default)]
    pub property_type: Option<ReferenceId>,
    #[serde(default)]
    pub salesperson: Option<UserId>,
    #[serde(default)]
    pub tags: Option<Vec<ReferenceId>>,
    #[serde(default)]
    pub utilities: Option<Vec<ReferenceId>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffer {
    pub partner_id: PartnerId,
    pub price: f64,
    #[serde(default = "default_validity")]
    pub validity: i64,
    #[serde(default)]
    pub date_deadline: Option<NaiveDate>,
}

fn default_validity() -> i64 {
    DEFAULT_OFFER_VALIDITY_DAYS
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewImage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub sequence: Option<u32>,
    pub location: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPartner {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSalesperson {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}
