//! Request and response shapes of the orchestrator use cases.
//!
//! Request structs decode leniently: every field is optional and a missing
//! value means "clear the cell". A value of the wrong shape (an object where
//! a scalar belongs, a number where a list belongs) decodes as if it were
//! missing, and keys no cell is bound to are ignored. Only a body that is not
//! a JSON object is rejected. Responses serialize to the JSON the front-end
//! consumes.

use std::collections::BTreeMap;

use pitwall_common::{CellValue, DomainValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Loosely keyed scalar inputs (`{"tempQ1": 21, "weatherQ1": "Dry"}`).
pub type FieldValues = BTreeMap<String, CellValue>;

/// Outputs keyed by field name.
pub type Fields = BTreeMap<&'static str, DomainValue>;

const EMPTY: &CellValue = &CellValue::Empty;

/// Value of `key`, or an empty cell when the request omitted it.
pub fn field<'a>(values: &'a FieldValues, key: &str) -> &'a CellValue {
    values.get(key).unwrap_or(EMPTY)
}

/// Scalar of a JSON value; lists and objects are no cell value.
fn scalar(value: Value) -> CellValue {
    match value {
        Value::Bool(b) => CellValue::Bool(b),
        Value::Number(n) => n.as_f64().map_or(CellValue::Empty, CellValue::Number),
        Value::String(s) => CellValue::Text(s),
        Value::Null | Value::Array(_) | Value::Object(_) => CellValue::Empty,
    }
}

fn scalars(map: Map<String, Value>) -> FieldValues {
    map.into_iter().map(|(key, value)| (key, scalar(value))).collect()
}

fn lenient_cell<'de, D: Deserializer<'de>>(de: D) -> Result<CellValue, D::Error> {
    Value::deserialize(de).map(scalar)
}

fn lenient_fields<'de, D: Deserializer<'de>>(de: D) -> Result<FieldValues, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Object(map) => scalars(map),
        _ => FieldValues::new(),
    })
}

fn or_default<T: DeserializeOwned + Default>(value: Value) -> T {
    serde_json::from_value(value).unwrap_or_default()
}

fn lenient_list<'de, D, T>(de: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    // Positions matter (part i is row i), so bad entries become defaults.
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => items.into_iter().map(or_default).collect(),
        _ => Vec::new(),
    })
}

fn lenient_map<'de, D, T>(de: D) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(de)? {
        Value::Object(map) => map.into_iter().map(|(k, v)| (k, or_default(v))).collect(),
        _ => BTreeMap::new(),
    })
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CarPartInput {
    #[serde(deserialize_with = "lenient_cell")]
    pub lvl: CellValue,
    #[serde(deserialize_with = "lenient_cell")]
    pub wear: CellValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DriverCarUpdate {
    #[serde(deserialize_with = "lenient_fields")]
    pub driver: FieldValues,
    #[serde(deserialize_with = "lenient_list")]
    pub car: Vec<CarPartInput>,
    #[serde(deserialize_with = "lenient_fields")]
    pub test_points: FieldValues,
}

/// Weather inputs and the four temperature windows.
#[derive(Debug, Clone, Default)]
pub struct SetupWeatherUpdate {
    pub values: FieldValues,
}

impl<'de> Deserialize<'de> for SetupWeatherUpdate {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let values = scalars(Map::deserialize(de)?);
        Ok(SetupWeatherUpdate { values })
    }
}

/// Track plus the weather keys, sent as one flat object next to whatever
/// else the setup page holds (driver attributes, car parts, ...).
#[derive(Debug, Clone, Default)]
pub struct SetupRequest {
    pub pista: CellValue,
    pub weather: FieldValues,
}

impl<'de> Deserialize<'de> for SetupRequest {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let mut weather = scalars(Map::deserialize(de)?);
        let pista = weather.remove("pista").unwrap_or_default();
        Ok(SetupRequest { pista, weather })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BoostLapInput {
    #[serde(deserialize_with = "lenient_cell")]
    pub volta: CellValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StrategyRequest {
    #[serde(deserialize_with = "lenient_cell")]
    pub pista: CellValue,
    #[serde(deserialize_with = "lenient_fields")]
    pub race_options: FieldValues,
    #[serde(deserialize_with = "lenient_fields")]
    pub personal_stint_voltas: FieldValues,
    #[serde(deserialize_with = "lenient_map")]
    pub boost_laps: BTreeMap<String, BoostLapInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarPartState {
    pub name: &'static str,
    pub lvl: DomainValue,
    pub wear: DomainValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateSnapshot {
    pub current_track: DomainValue,
    pub driver: Fields,
    pub car: Vec<CarPartState>,
    pub weather: Fields,
    pub test_points: Fields,
    pub race_options: Fields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverCarResult {
    pub oa: DomainValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WearPair {
    pub start: DomainValue,
    pub end: DomainValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSetup {
    pub q1: DomainValue,
    pub q2: DomainValue,
    pub race: DomainValue,
}

/// Setup result of one part. Wear-only parts carry no session values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetupPartResult {
    #[serde(flatten)]
    pub setup: Option<SessionSetup>,
    pub wear: WearPair,
}

pub type SetupResult = BTreeMap<&'static str, SetupPartResult>;

/// Metric → (`stint1`..`stint8`, `total`) → value.
pub type StintTableOutput = BTreeMap<&'static str, Fields>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoostOutput {
    pub stint: DomainValue,
    pub voltas_list: DomainValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MiniStintOutput {
    pub val1: DomainValue,
    pub val2: DomainValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyOutputs {
    pub race_calculated_data: Fields,
    pub compound_details_outputs: BTreeMap<&'static str, Fields>,
    pub stints_predefined: StintTableOutput,
    pub stints_personal: StintTableOutput,
    pub boost_laps_outputs: BTreeMap<&'static str, BoostOutput>,
    pub boost_mini_stints_outputs: BTreeMap<&'static str, MiniStintOutput>,
}
