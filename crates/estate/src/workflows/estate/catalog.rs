use serde::Serialize;

use super::domain::ReferenceId;
use super::error::InvariantViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    PropertyType,
    Tag,
    Utility,
}

impl ReferenceKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PropertyType => "property type",
            Self::Tag => "tag",
            Self::Utility => "utility",
        }
    }

    pub fn from_segment(raw: &str) -> Option<Self> {
        match raw {
            "types" => Some(Self::PropertyType),
            "tags" => Some(Self::Tag),
            "utilities" => Some(Self::Utility),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub id: ReferenceId,
    pub kind: ReferenceKind,
    pub name: String,
    pub sequence: u32,
    pub color: u32,
}

/// Shared lookup data referenced by listings: property types, tags and utilities.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCatalog {
    entries: Vec<ReferenceEntry>,
}

impl ReferenceCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Seed data loaded at startup.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        let seeds: [(ReferenceKind, &str, &str); 13] = [
            (ReferenceKind::PropertyType, "type_house", "House"),
            (ReferenceKind::PropertyType, "type_apartment", "Apartment"),
            (ReferenceKind::PropertyType, "type_land", "Land"),
            (ReferenceKind::PropertyType, "type_commercial", "Commercial"),
            (ReferenceKind::PropertyType, "type_multi_family", "Multi-Family"),
            (ReferenceKind::Tag, "tag_renovated", "Renovated"),
            (ReferenceKind::Tag, "tag_fixer_upper", "Fixer Upper"),
            (ReferenceKind::Tag, "tag_investment", "Investment"),
            (ReferenceKind::Tag, "tag_rental", "Rental"),
            (ReferenceKind::Utility, "utility_electric", "Electric"),
            (ReferenceKind::Utility, "utility_sewer", "Sewer"),
            (ReferenceKind::Utility, "utility_water", "Water"),
            (ReferenceKind::Utility, "utility_gas", "Gas"),
        ];

        for (position, (kind, id, name)) in seeds.into_iter().enumerate() {
            let sequence = (position as u32 + 1) * 10;
            // Seed names are distinct per kind.
            let _ = catalog.register(kind, ReferenceId::from(id), name, sequence);
        }
        catalog
    }

    /// Add an entry. Names are unique per kind, ignoring case and surrounding blanks.
    pub fn register(
        &mut self,
        kind: ReferenceKind,
        id: ReferenceId,
        name: &str,
        sequence: u32,
    ) -> Result<&ReferenceEntry, InvariantViolation> {
        let name = name.trim();
        if name.is_empty() {
            return Err(InvariantViolation::MissingName {
                kind: kind.label(),
            });
        }
        if self
            .entries
            .iter()
            .any(|entry| entry.kind == kind && entry.name.eq_ignore_ascii_case(name))
        {
            return Err(InvariantViolation::DuplicateName {
                kind: kind.label(),
                name: name.to_string(),
            });
        }
        if self.entries.iter().any(|entry| entry.id == id) {
            return Err(InvariantViolation::DuplicateName {
                kind: kind.label(),
                name: id.0,
            });
        }

        let index = self.entries.len();
        self.entries.push(ReferenceEntry {
            id,
            kind,
            name: name.to_string(),
            sequence,
            color: 0,
        });
        Ok(&self.entries[index])
    }

    pub fn get(&self, id: &ReferenceId) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|entry| &entry.id == id)
    }

    /// Entries of one kind; types by sequence then name, the rest by name.
    pub fn entries(&self, kind: ReferenceKind) -> Vec<&ReferenceEntry> {
        let mut entries: Vec<_> = self.entries.iter().filter(|e| e.kind == kind).collect();
        match kind {
            ReferenceKind::PropertyType => {
                entries.sort_by(|a, b| a.sequence.cmp(&b.sequence).then(a.name.cmp(&b.name)))
            }
            ReferenceKind::Tag | ReferenceKind::Utility => {
                entries.sort_by(|a, b| a.name.cmp(&b.name))
            }
        }
        entries
    }

    /// Reject references that are unknown or point at an entry of another kind.
    pub fn ensure_known(
        &self,
        kind: ReferenceKind,
        ids: &[ReferenceId],
    ) -> Result<(), InvariantViolation> {
        match ids
            .iter()
            .find(|id| self.get(id).map(|entry| entry.kind) != Some(kind))
        {
            Some(unknown) => Err(InvariantViolation::UnknownReference {
                kind: kind.label(),
                id: unknown.0.clone(),
            }),
            None => Ok(()),
        }
    }
}
