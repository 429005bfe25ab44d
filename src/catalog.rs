use std::fmt;

use chrono::{NaiveTime, Timelike};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Timetable compiled into the binary so the app works without any data file.
const EMBEDDED_ROUTES: &str = include_str!("../data/routes.yaml");

/// Wall-clock departure time within a single day ("HH:MM").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DepartureTime(NaiveTime);

impl DepartureTime {
    pub fn parse(s: &str) -> Result<Self> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| Error::InvalidTime {
                time: s.to_owned(),
            })
    }

    pub fn minute_of_day(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for DepartureTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl TryFrom<String> for DepartureTime {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DepartureTime> for String {
    fn from(time: DepartureTime) -> Self {
        time.to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub id: String,
    #[serde(rename = "route_name")]
    pub name: String,
    pub times: Vec<DepartureTime>,
}

/// All routes known for the session, in the order the data source lists them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteCatalog {
    routes: Vec<Route>,
}

impl RouteCatalog {
    pub fn new(routes: Vec<Route>) -> Result<Self> {
        let catalog = Self { routes };
        catalog.validate()?;

        Ok(catalog)
    }

    pub fn embedded() -> Result<Self> {
        Self::from_yaml(EMBEDDED_ROUTES)
    }

    /// Parses a catalog from YAML. JSON documents are accepted as well since
    /// they are valid YAML.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let routes: Vec<Route> = serde_yaml::from_str(content)?;

        Self::new(routes)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn first(&self) -> Option<&Route> {
        self.routes.first()
    }

    pub fn get(&self, id: &str) -> Option<&Route> {
        self.routes.iter().find(|route| route.id == id)
    }

    /// Looks a route up either by id or by its 1-based position in the catalog.
    pub fn lookup(&self, key: &str) -> Option<&Route> {
        self.get(key).or_else(|| {
            key.parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| self.routes.get(i))
        })
    }

    fn validate(&self) -> Result<()> {
        if self.routes.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        if let Some(id) = self.routes.iter().map(|r| &r.id).duplicates().next() {
            return Err(Error::DuplicateRoute {
                route_id: id.clone(),
            });
        }

        for route in &self.routes {
            // Times may repeat but never go backwards.
            if let Some((previous, current)) =
                route.times.iter().tuple_windows().find(|(a, b)| b < a)
            {
                return Err(Error::UnsortedTimes {
                    route_id: route.id.clone(),
                    previous: previous.to_string(),
                    current: current.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_catalog_loads() {
        let catalog = RouteCatalog::embedded().unwrap();

        assert_eq!(catalog.routes().len(), 2);

        let first = catalog.first().unwrap();
        assert_eq!(first.id, "planalto-praiadomeio-bomjesus");
        assert_eq!(first.name, "Planalto/Praia do Meio - Bom Jesus");
        assert_eq!(first.times.len(), 60);
        assert_eq!(first.times[0].to_string(), "00:13");
        assert_eq!(first.times[59].to_string(), "22:17");

        let second = catalog.get("praiadomeio-planalto-wm").unwrap();
        assert_eq!(second.times.last().unwrap().to_string(), "23:39");
    }

    #[test]
    fn lookup_by_id_or_position() {
        let catalog = RouteCatalog::embedded().unwrap();

        assert_eq!(
            catalog.lookup("2").map(|r| r.id.as_str()),
            Some("praiadomeio-planalto-wm")
        );
        assert_eq!(
            catalog.lookup("planalto-praiadomeio-bomjesus").map(|r| r.id.as_str()),
            Some("planalto-praiadomeio-bomjesus")
        );
        assert!(catalog.lookup("0").is_none());
        assert!(catalog.lookup("3").is_none());
        assert!(catalog.lookup("nope").is_none());
    }

    #[test]
    fn accepts_json() {
        let json = r#"[{"id": "a", "route_name": "A", "times": ["05:17", "05:31"]}]"#;
        let catalog = RouteCatalog::from_yaml(json).unwrap();

        assert_eq!(catalog.get("a").unwrap().times[1].minute_of_day(), 5 * 60 + 31);
    }

    #[test]
    fn rejects_empty_catalog() {
        let err = RouteCatalog::from_yaml("[]").unwrap_err();

        assert!(matches!(err, Error::EmptyCatalog));
        assert_eq!(err.to_string(), "Nenhuma rota encontrada nos dados.");
    }

    #[test]
    fn rejects_malformed_time() {
        let yaml = "- id: a\n  route_name: A\n  times: [\"25:61\"]\n";

        assert!(matches!(
            RouteCatalog::from_yaml(yaml).unwrap_err(),
            Error::Yaml(_)
        ));
        assert!(DepartureTime::parse("nope").is_err());
    }

    #[test]
    fn rejects_unsorted_times() {
        let yaml = "- id: a\n  route_name: A\n  times: [\"06:00\", \"05:00\"]\n";

        match RouteCatalog::from_yaml(yaml).unwrap_err() {
            Error::UnsortedTimes {
                route_id,
                previous,
                current,
            } => {
                assert_eq!(route_id, "a");
                assert_eq!(previous, "06:00");
                assert_eq!(current, "05:00");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn accepts_repeated_times_and_empty_routes() {
        let yaml = "- id: a\n  route_name: A\n  times: [\"06:00\", \"06:00\"]\n\
                    - id: b\n  route_name: B\n  times: []\n";

        assert!(RouteCatalog::from_yaml(yaml).is_ok());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let yaml = "- id: a\n  route_name: A\n  times: []\n- id: a\n  route_name: B\n  times: []\n";

        assert!(matches!(
            RouteCatalog::from_yaml(yaml).unwrap_err(),
            Error::DuplicateRoute { .. }
        ));
    }

    #[test]
    fn yaml_round_trip_keeps_wire_names() {
        let catalog = RouteCatalog::embedded().unwrap();
        let yaml = catalog.to_yaml().unwrap();

        assert!(yaml.contains("route_name:"));
        assert_eq!(RouteCatalog::from_yaml(&yaml).unwrap().routes().len(), 2);
    }
}
