//! Pipeline stages: a read-side projection of [`PropertyState`] used for
//! kanban grouping and reporting. Stages never drive the lifecycle.

use serde::{Deserialize, Serialize};

use super::domain::PropertyState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKey {
    New,
    OfferReceived,
    UnderContract,
    Won,
    Lost,
}

impl StageKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::OfferReceived => "offer_received",
            Self::UnderContract => "under_contract",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Canonical stage for a lifecycle state.
pub const fn stage_for(state: PropertyState) -> StageKey {
    match state {
        PropertyState::New => StageKey::New,
        PropertyState::OfferReceived => StageKey::OfferReceived,
        PropertyState::OfferAccepted => StageKey::UnderContract,
        PropertyState::Sold => StageKey::Won,
        PropertyState::Canceled => StageKey::Lost,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub key: StageKey,
    pub name: String,
    pub sequence: u32,
    pub fold: bool,
    pub is_won: bool,
    pub is_lost: bool,
    pub requirements: Option<String>,
}

/// Static stage table, built once at startup.
#[derive(Debug, Clone)]
pub struct StageCatalog {
    stages: Vec<Stage>,
}

impl StageCatalog {
    pub fn standard() -> Self {
        let stage = |key: StageKey, name: &str, sequence: u32, requirements: &str| Stage {
            key,
            name: name.to_string(),
            sequence,
            fold: key == StageKey::Lost,
            is_won: key == StageKey::Won,
            is_lost: key == StageKey::Lost,
            requirements: Some(requirements.to_string()),
        };

        Self::from_stages(vec![
            stage(
                StageKey::New,
                "New",
                10,
                "Listing details, expected price and salesperson are filled in.",
            ),
            stage(
                StageKey::OfferReceived,
                "Offer Received",
                20,
                "At least one buyer offer is on file.",
            ),
            stage(
                StageKey::UnderContract,
                "Offer Accepted",
                30,
                "One offer accepted; buyer and selling price are set.",
            ),
            stage(StageKey::Won, "Sold", 40, "Closing completed."),
            stage(StageKey::Lost, "Canceled", 50, "Listing withdrawn."),
        ])
    }

    pub fn from_stages(mut stages: Vec<Stage>) -> Self {
        stages.sort_by_key(|stage| stage.sequence);
        Self { stages }
    }

    /// Stages in display order.
    pub fn ordered(&self) -> &[Stage] {
        &self.stages
    }

    pub fn get(&self, key: StageKey) -> Option<&Stage> {
        self.stages.iter().find(|stage| stage.key == key)
    }

    pub fn for_state(&self, state: PropertyState) -> Option<&Stage> {
        self.get(stage_for(state))
    }

    pub fn name_of(&self, key: StageKey) -> &str {
        self.get(key)
            .map(|stage| stage.name.as_str())
            .unwrap_or_else(|| key.as_str())
    }
}

impl Default for StageCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_maps_to_a_catalogued_stage() {
        let catalog = StageCatalog::standard();
        for state in PropertyState::ordered() {
            let stage = catalog.for_state(state).expect("stage present");
            assert_eq!(stage.key, stage_for(state));
        }
    }

    #[test]
    fn mapping_matches_pipeline_table() {
        assert_eq!(stage_for(PropertyState::New), StageKey::New);
        assert_eq!(stage_for(PropertyState::OfferReceived), StageKey::OfferReceived);
        assert_eq!(stage_for(PropertyState::OfferAccepted), StageKey::UnderContract);
        assert_eq!(stage_for(PropertyState::Sold), StageKey::Won);
        assert_eq!(stage_for(PropertyState::Canceled), StageKey::Lost);
    }

    #[test]
    fn only_terminal_stages_carry_outcome_flags() {
        let catalog = StageCatalog::standard();
        let won: Vec<_> = catalog.ordered().iter().filter(|s| s.is_won).collect();
        let lost: Vec<_> = catalog.ordered().iter().filter(|s| s.is_lost).collect();
        assert_eq!(won.len(), 1);
        assert_eq!(won[0].key, StageKey::Won);
        assert_eq!(lost.len(), 1);
        assert!(lost[0].fold);
    }

    #[test]
    fn stages_are_sorted_by_sequence() {
        let catalog = StageCatalog::from_stages(vec![
            Stage {
                key: StageKey::Won,
                name: "Sold".to_string(),
                sequence: 40,
                fold: false,
                is_won: true,
                is_lost: false,
                requirements: None,
            },
            Stage {
                key: StageKey::New,
                name: "New".to_string(),
                sequence: 10,
                fold: false,
                is_won: false,
                is_lost: false,
                requirements: None,
            },
        ]);
        let keys: Vec<_> = catalog.ordered().iter().map(|s| s.key).collect();
        assert_eq!(keys, vec![StageKey::New, StageKey::Won]);
        assert_eq!(catalog.name_of(StageKey::Lost), "lost");
    }
}
