//! Chart state and the wire shapes the backend speaks.
//! Field names on the wire are the backend's (`nomeCompleto`, `numeroMembro`,
//! `cargos`, `fotos`); everything past this module uses the Rust names.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::positions;

/// One filled or vacant slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Entry {
    pub name: String,
    pub member_number: String,
    /// Data URL or remote URL of the photo.
    pub photo: Option<String>,
}

impl Entry {
    pub fn is_vacant(&self) -> bool {
        self.name.trim().is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "numeroMembro", default, deserialize_with = "lenient_string")]
    pub number: String,
    #[serde(rename = "nome", default, deserialize_with = "lenient_string")]
    pub name: String,
}

impl Member {
    pub fn new(number: &str, name: &str) -> Self {
        Self {
            number: number.to_string(),
            name: name.to_string(),
        }
    }
}

/// Roster used when the backend cannot be reached.
pub fn fallback_members() -> Vec<Member> {
    vec![
        Member::new("001", "GERALDINA FRANCISCO"),
        Member::new("002", "UMBELINO CLEMENTE"),
        Member::new("003", "JEREMIAS JERÔNIMO"),
    ]
}

/// Members that can be offered in a selection list.
pub fn selectable(members: &[Member]) -> impl Iterator<Item = &Member> {
    members.iter().filter(|m| !m.name.trim().is_empty())
}

/// Mapping from position id to entry. Rebuilt wholesale on every load.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Chart {
    entries: BTreeMap<String, Entry>,
}

impl Chart {
    /// Every core position present and empty.
    pub fn vacant() -> Self {
        let entries = positions::core_ids()
            .map(|id| (id.to_string(), Entry::default()))
            .collect();
        Self { entries }
    }

    /// Overlays a snapshot on the vacant default, so positions the snapshot
    /// omits still exist and render as vacant.
    pub fn from_snapshot(snapshot: ChartSnapshot) -> Self {
        let mut chart = Self::vacant();
        let ChartSnapshot { cargos, mut fotos } = snapshot;
        for (id, cargo) in cargos {
            let photo = fotos
                .remove(&id)
                .flatten()
                .filter(|p| !p.is_empty());
            chart.entries.insert(
                id,
                Entry {
                    name: cargo.full_name.unwrap_or_default(),
                    member_number: cargo.member_number.unwrap_or_default(),
                    photo,
                },
            );
        }
        chart
    }

    pub fn get(&self, id: &str) -> Option<&Entry> {
        self.entries.get(id)
    }

    pub fn set(&mut self, id: &str, entry: Entry) {
        self.entries.insert(id.to_string(), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// *************** Wire types ***************

#[derive(Debug, Deserialize)]
pub(crate) struct MembersResponse {
    #[serde(default)]
    pub success: bool,
    pub members: Option<Vec<Member>>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    #[serde(default)]
    pub success: bool,
    pub cargos: Option<HashMap<String, Cargo>>,
    pub fotos: Option<HashMap<String, Option<String>>>,
    pub error: Option<String>,
}

/// Write acknowledgement, only read in acknowledged mode.
#[derive(Debug, Deserialize)]
pub(crate) struct WriteResponse {
    #[serde(default)]
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Cargo {
    #[serde(rename = "nomeCompleto", default, deserialize_with = "lenient_opt_string")]
    pub full_name: Option<String>,
    #[serde(rename = "numeroMembro", default, deserialize_with = "lenient_opt_string")]
    pub member_number: Option<String>,
}

// Spreadsheet cells come back as strings, numbers or null depending on content.
fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    lenient_opt_string(d).map(Option::unwrap_or_default)
}

/// Chart data as returned by a successful fetch.
#[derive(Clone, Debug, Default)]
pub struct ChartSnapshot {
    pub cargos: HashMap<String, Cargo>,
    pub fotos: HashMap<String, Option<String>>,
}
