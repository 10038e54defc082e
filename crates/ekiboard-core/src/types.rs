use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

/// One single-train leg of an itinerary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Line name with operator and train type removed (e.g. "小田急線").
    pub line: String,
    /// Train type from the type lexicon (e.g. "快速急行").
    #[serde(rename = "type")]
    pub train_type: String,
    /// Terminal station of the train, without the "-bound" suffix.
    pub destination: String,
    /// Departure time at the boarding station, `HH:MM`.
    pub departure: String,
    /// Arrival time at the alighting station, `HH:MM`.
    pub arrival: String,
}

/// Whether a live departure coincides with the day's first or last train.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DepartureTag {
    #[serde(rename = "始発")]
    FirstTrain,
    #[serde(rename = "終電")]
    LastTrain,
    #[default]
    #[serde(rename = "")]
    None,
}

/// The primary suggested itinerary ("route 1") to one destination.
///
/// `segments` is never empty: a page without parseable segments yields no
/// `RouteInfo` at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteInfo {
    pub departure_time: String,
    pub arrival_time: String,
    pub segments: Vec<RouteSegment>,
    #[serde(default)]
    pub status: DepartureTag,
}

/// Departure/arrival pair of a first or last train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainTimes {
    pub departure: String,
    pub arrival: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstLastInfo {
    #[serde(default)]
    pub first_train: Option<TrainTimes>,
    #[serde(default)]
    pub last_train: Option<TrainTimes>,
}

// ---------------------------------------------------------------------------
// ByDestination
// ---------------------------------------------------------------------------

/// Per-destination map that keeps the configured destination order.
///
/// Serialises as a JSON object; the renderer lays destinations out in the
/// order the keys appear, so a sorted map would shuffle the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByDestination<T>(Vec<(String, T)>);

impl<T> ByDestination<T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the value for `destination`, keeping its position.
    pub fn insert(&mut self, destination: impl Into<String>, value: T) {
        let destination = destination.into();
        match self.0.iter_mut().find(|(k, _)| *k == destination) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((destination, value)),
        }
    }

    pub fn get(&self, destination: &str) -> Option<&T> {
        self.0
            .iter()
            .find(|(k, _)| k == destination)
            .map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, destination: &str) -> Option<&mut T> {
        self.0
            .iter_mut()
            .find(|(k, _)| k == destination)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut T)> {
        self.0.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for ByDestination<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for ByDestination<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<T: Serialize> Serialize for ByDestination<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct ByDestinationVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for ByDestinationVisitor<T> {
    type Value = ByDestination<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map keyed by destination station")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = ByDestination::new();
        while let Some((k, v)) = access.next_entry::<String, T>()? {
            map.insert(k, v);
        }
        Ok(map)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for ByDestination<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ByDestinationVisitor(PhantomData))
    }
}

/// Content of `departure.json` when a search succeeded: `null` per
/// destination means "no route found".
pub type DepartureSnapshot = ByDestination<Option<RouteInfo>>;

/// Content of `first_last_train.json`.
pub type FirstLastSnapshot = ByDestination<FirstLastInfo>;

// ---------------------------------------------------------------------------
// Operation status
// ---------------------------------------------------------------------------

/// One line on the delay board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationEntry {
    /// Route display name (e.g. "ＪＲ埼京線").
    pub name: String,
    pub detail: String,
    /// Operator from the operator lexicon, or "社名未定義".
    pub company: String,
}

/// Delay board partitioned into three disjoint buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub suspend: Vec<OperationEntry>,
    #[serde(default)]
    pub delay: Vec<OperationEntry>,
    #[serde(default)]
    pub trouble: Vec<OperationEntry>,
}

impl OperationStatus {
    pub fn is_empty(&self) -> bool {
        self.suspend.is_empty() && self.delay.is_empty() && self.trouble.is_empty()
    }

    pub fn len(&self) -> usize {
        self.suspend.len() + self.delay.len() + self.trouble.len()
    }
}

/// Content of `operation.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSnapshot {
    #[serde(flatten)]
    pub status: OperationStatus,
    pub last_updated: String,
}

// ---------------------------------------------------------------------------
// Weather
// ---------------------------------------------------------------------------

/// Content of `weather_forecast.json`.
///
/// `last_fetched` is this program's own fetch time and is the only field
/// that governs cache freshness; `report_time` is the upstream's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub publishing_office: String,
    pub area_name: String,
    pub report_time: String,
    pub weather: String,
    pub wind: String,
    pub wave: String,
    #[serde(default)]
    pub jma_latest_update: Option<String>,
    pub last_fetched: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(dep: &str) -> RouteInfo {
        RouteInfo {
            departure_time: dep.to_string(),
            arrival_time: "07:30".to_string(),
            segments: vec![RouteSegment {
                line: "小田急線".to_string(),
                train_type: "快速急行".to_string(),
                destination: "新宿".to_string(),
                departure: dep.to_string(),
                arrival: "07:30".to_string(),
            }],
            status: DepartureTag::None,
        }
    }

    #[test]
    fn by_destination_keeps_insertion_order() {
        let mut map = ByDestination::new();
        map.insert("町田", 1);
        map.insert("新宿", 2);
        map.insert("町田", 3);
        let keys: Vec<_> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["町田", "新宿"]);
        assert_eq!(map.get("町田"), Some(&3));
    }

    #[test]
    fn by_destination_serializes_in_order() {
        let mut map: DepartureSnapshot = ByDestination::new();
        map.insert("新宿", Some(route("07:00")));
        map.insert("町田", None);
        let json = serde_json::to_string(&map).unwrap();
        let shinjuku = json.find("新宿").unwrap();
        let machida = json.find("町田").unwrap();
        assert!(shinjuku < machida);
        assert!(json.contains(r#""町田":null"#));

        let back: DepartureSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn departure_tag_wire_format() {
        let mut r = route("05:10");
        r.status = DepartureTag::FirstTrain;
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "始発");
        assert_eq!(json["segments"][0]["type"], "快速急行");

        r.status = DepartureTag::None;
        assert_eq!(serde_json::to_value(&r).unwrap()["status"], "");
    }

    #[test]
    fn route_without_status_defaults_to_none() {
        let json = r#"{"departure_time":"07:00","arrival_time":"07:30","segments":[]}"#;
        let r: RouteInfo = serde_json::from_str(json).unwrap();
        assert_eq!(r.status, DepartureTag::None);
    }

    #[test]
    fn operation_snapshot_is_flat() {
        let snap = OperationSnapshot {
            status: OperationStatus {
                suspend: vec![OperationEntry {
                    name: "ＪＲ埼京線".into(),
                    detail: "運転を見合わせています".into(),
                    company: "ＪＲ".into(),
                }],
                ..Default::default()
            },
            last_updated: "2025-11-07T03:00:00".into(),
        };
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["suspend"][0]["company"], "ＪＲ");
        assert!(json["delay"].as_array().unwrap().is_empty());
        assert_eq!(json["last_updated"], "2025-11-07T03:00:00");
    }

    #[test]
    fn operation_status_counts() {
        let mut status = OperationStatus::default();
        assert!(status.is_empty());
        status.trouble.push(OperationEntry {
            name: "京王線".into(),
            detail: "お知らせ".into(),
            company: "京王".into(),
        });
        assert_eq!(status.len(), 1);
        assert!(!status.is_empty());
    }
}
