//! Geography hierarchy (region → county → community) and tournament levels.

use crate::models::error::TournamentError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type CommunityId = u32;
pub type CountyId = u32;
pub type RegionId = u32;

/// Identifier of a bracket group at some level: a community, county or region id.
/// The national level has a single group with no id.
pub type GroupId = u32;

/// Geographic scope of a bracket.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Community,
    County,
    Regional,
    National,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Community, Level::County, Level::Regional, Level::National];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Community => "community",
            Level::County => "county",
            Level::Regional => "regional",
            Level::National => "national",
        }
    }

    /// Level whose winners feed this one.
    pub fn previous(self) -> Option<Level> {
        match self {
            Level::Community => None,
            Level::County => Some(Level::Community),
            Level::Regional => Some(Level::County),
            Level::National => Some(Level::Regional),
        }
    }

    pub fn next(self) -> Option<Level> {
        match self {
            Level::Community => Some(Level::County),
            Level::County => Some(Level::Regional),
            Level::Regional => Some(Level::National),
            Level::National => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = TournamentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "community" => Ok(Level::Community),
            "county" => Ok(Level::County),
            "regional" => Ok(Level::Regional),
            "national" => Ok(Level::National),
            other => Err(TournamentError::Validation(format!("Unknown level: {}", other))),
        }
    }
}

/// Full geographic assignment of a player.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub community_id: CommunityId,
    pub county_id: CountyId,
    pub region_id: RegionId,
}

impl Location {
    /// Group this location falls into at the given level (None for the national group).
    pub fn group_for(&self, level: Level) -> Option<GroupId> {
        match level {
            Level::Community => Some(self.community_id),
            Level::County => Some(self.county_id),
            Level::Regional => Some(self.region_id),
            Level::National => None,
        }
    }
}

/// One line of the geography CSV.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct GeographyRecord {
    pub community_id: CommunityId,
    pub county_id: CountyId,
    pub region_id: RegionId,
}

/// Static community → county → region ancestry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Geography {
    county_of: HashMap<CommunityId, CountyId>,
    region_of: HashMap<CountyId, RegionId>,
}

impl Geography {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a county under a region. A county cannot move between regions.
    pub fn add_county(&mut self, county_id: CountyId, region_id: RegionId) -> Result<(), TournamentError> {
        match self.region_of.get(&county_id) {
            Some(&existing) if existing != region_id => Err(TournamentError::Validation(format!(
                "County {} already belongs to region {}",
                county_id, existing
            ))),
            _ => {
                self.region_of.insert(county_id, region_id);
                Ok(())
            }
        }
    }

    /// Register a community under a county; the county must already be known.
    pub fn add_community(&mut self, community_id: CommunityId, county_id: CountyId) -> Result<(), TournamentError> {
        if !self.region_of.contains_key(&county_id) {
            return Err(TournamentError::NotFound(format!("County {} not found", county_id)));
        }
        match self.county_of.get(&community_id) {
            Some(&existing) if existing != county_id => Err(TournamentError::Validation(format!(
                "Community {} already belongs to county {}",
                community_id, existing
            ))),
            _ => {
                self.county_of.insert(community_id, county_id);
                Ok(())
            }
        }
    }

    /// Add one CSV record (county and community in one go).
    pub fn add_record(&mut self, record: GeographyRecord) -> Result<(), TournamentError> {
        self.add_county(record.county_id, record.region_id)?;
        self.add_community(record.community_id, record.county_id)
    }

    /// Load `community_id,county_id,region_id` rows (with header).
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self, TournamentError> {
        let mut geography = Self::new();
        let mut rdr = csv::Reader::from_reader(reader);
        for row in rdr.deserialize::<GeographyRecord>() {
            let record =
                row.map_err(|e| TournamentError::Validation(format!("Invalid geography row: {}", e)))?;
            geography.add_record(record)?;
        }
        Ok(geography)
    }

    pub fn locate(&self, community_id: CommunityId) -> Result<Location, TournamentError> {
        let county_id = *self
            .county_of
            .get(&community_id)
            .ok_or_else(|| TournamentError::NotFound(format!("Community {} not found", community_id)))?;
        let region_id = *self
            .region_of
            .get(&county_id)
            .ok_or_else(|| TournamentError::NotFound(format!("County {} not found", county_id)))?;
        Ok(Location {
            community_id,
            county_id,
            region_id,
        })
    }

    pub fn community_count(&self) -> usize {
        self.county_of.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locate_resolves_full_ancestry() {
        let mut g = Geography::new();
        g.add_county(10, 1).unwrap();
        g.add_community(100, 10).unwrap();
        let loc = g.locate(100).unwrap();
        assert_eq!(loc.county_id, 10);
        assert_eq!(loc.region_id, 1);
        assert_eq!(loc.group_for(Level::Regional), Some(1));
        assert_eq!(loc.group_for(Level::National), None);
    }

    #[test]
    fn community_cannot_change_county() {
        let mut g = Geography::new();
        g.add_county(10, 1).unwrap();
        g.add_county(11, 1).unwrap();
        g.add_community(100, 10).unwrap();
        assert!(matches!(g.add_community(100, 11), Err(TournamentError::Validation(_))));
    }

    #[test]
    fn loads_from_csv() {
        let data = "community_id,county_id,region_id\n1,10,100\n2,10,100\n3,11,100\n";
        let g = Geography::from_csv_reader(data.as_bytes()).unwrap();
        assert_eq!(g.community_count(), 3);
        assert_eq!(g.locate(3).unwrap().county_id, 11);
    }

    #[test]
    fn level_order_and_parsing() {
        assert_eq!(Level::Community.next(), Some(Level::County));
        assert_eq!(Level::National.previous(), Some(Level::Regional));
        assert_eq!("Regional".parse::<Level>().unwrap(), Level::Regional);
        assert!("planet".parse::<Level>().is_err());
    }
}
