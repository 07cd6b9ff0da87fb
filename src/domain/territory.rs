//! Territory resolution for on-duty squad combinations.
//!
//! A [`TerritoryTable`] is immutable configuration: the squad roster, the
//! territory list, and covering tables for every two- and three-squad
//! combination. [`TerritoryResolver`] answers "who covers what" for the set
//! of squads active on a segment.
//!
//! | Active squads | Result                                     |
//! |---------------|--------------------------------------------|
//! | 0             | empty map                                  |
//! | 1             | that squad covers [`Coverage::All`]        |
//! | 2             | pair table, keyed by the unordered pair    |
//! | 3             | triple table, keyed by the unordered triple|
//! | otherwise     | [`ScheduleError::UnknownCombination`]      |

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::schedule::{Coverage, DaySchedule};
use super::squad_id::{SquadId, TerritoryId};
use crate::error::ScheduleError;

/// One row of a covering table: the squads on duty and what each covers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoveringEntry {
    /// Squads in the combination (order irrelevant).
    pub squads: Vec<SquadId>,
    /// Territories per squad.
    pub covering: BTreeMap<SquadId, Vec<TerritoryId>>,
}

/// Serialized form of the territory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerritoryTableFile {
    /// Fixed squad roster.
    pub roster: Vec<SquadId>,
    /// Every territory, in display order.
    pub territories: Vec<TerritoryId>,
    /// Two-squad covering table.
    pub pairs: Vec<CoveringEntry>,
    /// Three-squad covering table.
    pub triples: Vec<CoveringEntry>,
}

type Assignment = BTreeMap<SquadId, BTreeSet<TerritoryId>>;

/// Validated, immutable territory configuration.
#[derive(Debug, Clone)]
pub struct TerritoryTable {
    roster: BTreeSet<SquadId>,
    territories: BTreeSet<TerritoryId>,
    combinations: HashMap<Vec<SquadId>, Assignment>,
}

impl TerritoryTable {
    /// Validates a table file.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if an entry has the wrong
    /// arity, repeats a squad, names a squad outside the roster, covers an
    /// unknown territory, or is listed twice.
    pub fn from_file(file: TerritoryTableFile) -> Result<Self, ScheduleError> {
        let roster: BTreeSet<SquadId> = file.roster.into_iter().collect();
        let territories: BTreeSet<TerritoryId> = file.territories.into_iter().collect();
        let mut combinations = HashMap::new();

        let tables = [(2_usize, file.pairs), (3_usize, file.triples)];
        for (arity, entries) in tables {
            for entry in entries {
                let key = combination_key(&entry.squads);
                let label = join_ids(&key);
                if key.len() != arity || entry.squads.len() != arity {
                    return Err(ScheduleError::InvalidRequest(format!(
                        "covering entry {label} must name {arity} distinct squads"
                    )));
                }
                if let Some(stranger) = key.iter().find(|id| !roster.contains(id)) {
                    return Err(ScheduleError::InvalidRequest(format!(
                        "covering entry {label} names squad {stranger} outside the roster"
                    )));
                }
                let mut assignment = Assignment::new();
                for id in &key {
                    let covered: BTreeSet<TerritoryId> = entry
                        .covering
                        .get(id)
                        .map(|list| list.iter().copied().collect())
                        .unwrap_or_default();
                    if let Some(unknown) = covered.iter().find(|t| !territories.contains(t)) {
                        return Err(ScheduleError::InvalidRequest(format!(
                            "covering entry {label} assigns unknown territory {unknown}"
                        )));
                    }
                    assignment.insert(*id, covered);
                }
                if combinations.insert(key, assignment).is_some() {
                    return Err(ScheduleError::InvalidRequest(format!(
                        "covering entry {label} is listed twice"
                    )));
                }
            }
        }

        Ok(Self {
            roster,
            territories,
            combinations,
        })
    }

    /// Loads and validates a JSON table file.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the file cannot be read,
    /// is not valid JSON, or fails validation.
    pub fn load(path: &Path) -> Result<Self, ScheduleError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScheduleError::InvalidRequest(format!("cannot read {}: {e}", path.display()))
        })?;
        let file: TerritoryTableFile = serde_json::from_str(&text).map_err(|e| {
            ScheduleError::InvalidRequest(format!("cannot parse {}: {e}", path.display()))
        })?;
        Self::from_file(file)
    }

    /// Built-in table for the five-squad station (34, 35, 42, 43, 54).
    ///
    /// Every squad's home territory shares its number. Pairs split all five
    /// territories between the two squads; triples give each squad its home
    /// territory plus at most one neighbour.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::InvalidRequest`] if the built-in entries fail
    /// the same validation as a loaded file.
    pub fn station_default() -> Result<Self, ScheduleError> {
        const PAIRS: &[(u16, &[u16], u16, &[u16])] = &[
            (34, &[34, 42, 54], 35, &[35, 43]),
            (34, &[34, 35, 43], 42, &[42, 54]),
            (34, &[34, 35, 42], 43, &[43, 54]),
            (34, &[34, 35, 42], 54, &[43, 54]),
            (35, &[34, 35, 43], 42, &[42, 54]),
            (35, &[34, 35], 43, &[42, 43, 54]),
            (35, &[34, 35, 43], 54, &[42, 54]),
            (42, &[34, 42, 54], 43, &[35, 43]),
            (42, &[34, 35, 42], 54, &[43, 54]),
            (43, &[35, 43], 54, &[34, 42, 54]),
        ];
        const TRIPLES: &[(u16, &[u16], u16, &[u16], u16, &[u16])] = &[
            (34, &[34], 35, &[35, 43], 42, &[42, 54]),
            (34, &[34, 42], 35, &[35], 43, &[43, 54]),
            (34, &[34, 42], 35, &[35, 43], 54, &[54]),
            (34, &[34, 35], 42, &[42], 43, &[43, 54]),
            (34, &[34, 35], 42, &[42], 54, &[43, 54]),
            (34, &[34, 42], 43, &[35, 43], 54, &[54]),
            (35, &[34, 35], 42, &[42, 54], 43, &[43]),
            (35, &[35, 43], 42, &[34, 42], 54, &[54]),
            (35, &[34, 35], 43, &[43], 54, &[42, 54]),
            (42, &[34, 42], 43, &[35, 43], 54, &[54]),
        ];

        let to_ids = |list: &[u16]| list.iter().copied().map(TerritoryId::new).collect();
        let entry = |rows: &[(u16, &[u16])]| CoveringEntry {
            squads: rows.iter().map(|(id, _)| SquadId::new(*id)).collect(),
            covering: rows
                .iter()
                .map(|(id, covered)| (SquadId::new(*id), to_ids(covered)))
                .collect(),
        };

        let station = [34_u16, 35, 42, 43, 54];
        let file = TerritoryTableFile {
            roster: station.iter().copied().map(SquadId::new).collect(),
            territories: station.iter().copied().map(TerritoryId::new).collect(),
            pairs: PAIRS
                .iter()
                .map(|&(a, ta, b, tb)| entry(&[(a, ta), (b, tb)]))
                .collect(),
            triples: TRIPLES
                .iter()
                .map(|&(a, ta, b, tb, c, tc)| entry(&[(a, ta), (b, tb), (c, tc)]))
                .collect(),
        };

        Self::from_file(file)
    }

    /// Returns `true` if the squad is on the roster.
    #[must_use]
    pub fn is_rostered(&self, id: SquadId) -> bool {
        self.roster.contains(&id)
    }

    /// The squad roster, ascending.
    #[must_use]
    pub fn roster(&self) -> Vec<SquadId> {
        self.roster.iter().copied().collect()
    }

    /// Every territory, ascending.
    #[must_use]
    pub fn territories(&self) -> Vec<TerritoryId> {
        self.territories.iter().copied().collect()
    }

    fn lookup(&self, key: &[SquadId]) -> Option<&Assignment> {
        self.combinations.get(key)
    }
}

/// Resolves territory coverage for active squad sets.
#[derive(Debug, Clone)]
pub struct TerritoryResolver {
    table: TerritoryTable,
}

impl TerritoryResolver {
    /// Creates a resolver over a validated table.
    #[must_use]
    pub fn new(table: TerritoryTable) -> Self {
        Self { table }
    }

    /// The table this resolver reads.
    #[must_use]
    pub fn table(&self) -> &TerritoryTable {
        &self.table
    }

    /// Maps each active squad to the territories it covers.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::UnknownCombination`] if a squad is not on
    /// the roster or the combination has no table entry.
    pub fn resolve(
        &self,
        active: &[SquadId],
    ) -> Result<BTreeMap<SquadId, Coverage>, ScheduleError> {
        let key = combination_key(active);
        if let Some(stranger) = key.iter().find(|id| !self.table.is_rostered(**id)) {
            return Err(ScheduleError::UnknownCombination(format!(
                "squad {stranger} is not on the roster (combination {})",
                join_ids(&key)
            )));
        }
        match key.as_slice() {
            [] => Ok(BTreeMap::new()),
            [only] => Ok(BTreeMap::from([(*only, Coverage::All)])),
            _ => {
                let assignment = self
                    .table
                    .lookup(&key)
                    .ok_or_else(|| ScheduleError::UnknownCombination(join_ids(&key)))?;
                Ok(assignment
                    .iter()
                    .map(|(id, covered)| (*id, Coverage::Listed(covered.clone())))
                    .collect())
            }
        }
    }

    /// Re-derives territories for every segment of a day.
    ///
    /// Inactive squads get an empty set.
    ///
    /// # Errors
    ///
    /// Propagates [`ScheduleError::UnknownCombination`] from [`Self::resolve`].
    pub fn assign_day(&self, day: &mut DaySchedule) -> Result<(), ScheduleError> {
        for shift in &mut day.shifts {
            for segment in &mut shift.segments {
                let coverage = self.resolve(&segment.active_ids())?;
                for squad in &mut segment.squads {
                    squad.territories = if squad.active {
                        coverage.get(&squad.id).cloned().unwrap_or_default()
                    } else {
                        Coverage::none()
                    };
                }
            }
        }
        Ok(())
    }
}

fn combination_key(ids: &[SquadId]) -> Vec<SquadId> {
    let set: BTreeSet<SquadId> = ids.iter().copied().collect();
    set.into_iter().collect()
}

fn join_ids(ids: &[SquadId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn ids(list: &[u16]) -> Vec<SquadId> {
        list.iter().copied().map(SquadId::new).collect()
    }

    fn listed(list: &[u16]) -> Coverage {
        Coverage::Listed(list.iter().copied().map(TerritoryId::new).collect())
    }

    fn resolver() -> TerritoryResolver {
        let Ok(table) = TerritoryTable::station_default() else {
            panic!("built-in table must validate");
        };
        TerritoryResolver::new(table)
    }

    #[test]
    fn default_table_is_complete() {
        let table = match TerritoryTable::station_default() {
            Ok(table) => table,
            Err(e) => panic!("built-in table rejected: {e}"),
        };
        assert_eq!(table.roster().len(), 5);
        assert_eq!(table.territories().len(), 5);
        assert_eq!(table.combinations.len(), 20);
    }

    #[test]
    fn single_squad_covers_all() {
        let Ok(map) = resolver().resolve(&ids(&[54])) else {
            panic!("single squad should resolve");
        };
        assert_eq!(map.get(&SquadId::new(54)), Some(&Coverage::All));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn no_squads_resolve_to_nothing() {
        let Ok(map) = resolver().resolve(&[]) else {
            panic!("empty set should resolve");
        };
        assert!(map.is_empty());
    }

    #[test]
    fn pair_lookup_ignores_order() {
        let r = resolver();
        let (Ok(forward), Ok(backward)) = (r.resolve(&ids(&[42, 43])), r.resolve(&ids(&[43, 42])))
        else {
            panic!("pair should resolve");
        };
        assert_eq!(forward, backward);
        assert_eq!(forward.get(&SquadId::new(42)), Some(&listed(&[34, 42, 54])));
        assert_eq!(forward.get(&SquadId::new(43)), Some(&listed(&[35, 43])));
    }

    #[test]
    fn triples_do_not_overlap() {
        let r = resolver();
        let Ok(map) = r.resolve(&ids(&[34, 35, 42])) else {
            panic!("triple should resolve");
        };
        let mut seen = BTreeSet::new();
        for coverage in map.values() {
            let Coverage::Listed(set) = coverage else {
                panic!("triples never cover all");
            };
            for t in set {
                assert!(seen.insert(*t), "territory {t} assigned twice");
            }
        }
    }

    #[test]
    fn unknown_squad_is_rejected() {
        let result = resolver().resolve(&ids(&[34, 99]));
        assert!(matches!(result, Err(ScheduleError::UnknownCombination(_))));
    }

    #[test]
    fn four_squads_have_no_entry() {
        let result = resolver().resolve(&ids(&[34, 35, 42, 43]));
        assert!(matches!(result, Err(ScheduleError::UnknownCombination(_))));
    }

    #[test]
    fn validation_rejects_strangers_and_duplicates() {
        let mut file = TerritoryTableFile {
            roster: ids(&[1, 2]),
            territories: vec![TerritoryId::new(1), TerritoryId::new(2)],
            pairs: vec![CoveringEntry {
                squads: ids(&[1, 3]),
                covering: BTreeMap::new(),
            }],
            triples: vec![],
        };
        assert!(TerritoryTable::from_file(file.clone()).is_err());

        file.pairs = vec![
            CoveringEntry {
                squads: ids(&[1, 2]),
                covering: BTreeMap::new(),
            },
            CoveringEntry {
                squads: ids(&[2, 1]),
                covering: BTreeMap::new(),
            },
        ];
        assert!(TerritoryTable::from_file(file).is_err());
    }

    #[test]
    fn table_file_parses_from_json() {
        let json = r#"{
            "roster": [1, 2],
            "territories": [10, 20],
            "pairs": [{"squads": [2, 1], "covering": {"1": [10], "2": [20]}}],
            "triples": []
        }"#;
        let Ok(file) = serde_json::from_str::<TerritoryTableFile>(json) else {
            panic!("table json should parse");
        };
        let Ok(table) = TerritoryTable::from_file(file) else {
            panic!("table should validate");
        };
        let r = TerritoryResolver::new(table);
        let Ok(map) = r.resolve(&ids(&[1, 2])) else {
            panic!("pair should resolve");
        };
        assert_eq!(
            map.get(&SquadId::new(2)),
            Some(&Coverage::Listed(BTreeSet::from([TerritoryId::new(20)])))
        );
    }
}
