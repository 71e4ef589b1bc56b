//! Where every domain field lives inside the calculator workbook.
//!
//! The tables below mirror the physical layout of the `Setup&WS`, `Tyre&Fuel`
//! and `Tracks` sheets. A layout change in the workbook is a change to this file
//! only; the orchestrator never computes coordinates on its own.

use once_cell::sync::Lazy;
use pitwall_common::{CellAddress, DomainValue, RangeAddress, Sheet};

const S: Sheet = Sheet::Setup;
const TF: Sheet = Sheet::TyreFuel;

/// Value a read reports when the engine hands back an absent cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Fallback {
    None,
    Int(i64),
    Text(&'static str),
}

impl Fallback {
    /// Substitute the fallback for an absent value; present values (including
    /// zero and `false`) are returned untouched.
    pub fn apply(self, value: DomainValue) -> DomainValue {
        match self {
            Fallback::None => value,
            Fallback::Int(i) => value.or(DomainValue::Int(i)),
            Fallback::Text(text) => value.or(DomainValue::Text(text.to_string())),
        }
    }
}

/// One named scalar of the domain model bound to a single cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Field {
    pub key: &'static str,
    pub cell: CellAddress,
    pub fallback: Fallback,
}

impl Field {
    pub const fn new(key: &'static str, sheet: Sheet, a1: &str) -> Self {
        Field {
            key,
            cell: CellAddress::a1(sheet, a1),
            fallback: Fallback::None,
        }
    }

    pub const fn at(key: &'static str, cell: CellAddress) -> Self {
        Field {
            key,
            cell,
            fallback: Fallback::None,
        }
    }

    pub const fn or(self, fallback: Fallback) -> Self {
        Field { fallback, ..self }
    }
}

/// Logical groups of the layout; used for lookups and issue paths.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Group {
    Race,
    Driver,
    CarParts,
    Weather,
    TestPoints,
    SetupResults,
    WearEnd,
    RaceOptions,
    RaceSummary,
    Compounds,
    Stints,
    Boosts,
    BoostMiniStints,
    Tracks,
}

impl Group {
    pub const fn name(self) -> &'static str {
        match self {
            Group::Race => "race",
            Group::Driver => "driver",
            Group::CarParts => "car_parts",
            Group::Weather => "weather",
            Group::TestPoints => "test_points",
            Group::SetupResults => "setup_results",
            Group::WearEnd => "wear_end",
            Group::RaceOptions => "race_options",
            Group::RaceSummary => "race_summary",
            Group::Compounds => "compounds",
            Group::Stints => "stints",
            Group::Boosts => "boosts",
            Group::BoostMiniStints => "boost_mini_stints",
            Group::Tracks => "tracks",
        }
    }
}

/// Value of the track selector meaning "nothing selected"; never written.
pub const TRACK_PLACEHOLDER: &str = "Selecionar Pista";

pub const TYRE_SUPPLIERS: [&str; 9] = [
    "Pipirelli",
    "Avonn",
    "Yokomama",
    "Dunnolop",
    "Contimental",
    "Badyear",
    "Hancock",
    "Michelini",
    "Bridgerock",
];

pub const TRACKS_RANGE: RangeAddress = RangeAddress::a1(Sheet::Tracks, "A4", "A67");

pub const CURRENT_TRACK: Field = Field::new("current_track", S, "R5");

/// Overall driver rating ("oa"), computed by the workbook.
pub const DRIVER_TOTAL: Field = Field::new("total", S, "E5");

pub const DRIVER_ATTRIBUTES: [Field; 12] = [
    Field::new("concentracao", S, "E6"),
    Field::new("talento", S, "E7"),
    Field::new("agressividade", S, "E8"),
    Field::new("experiencia", S, "E9"),
    Field::new("tecnica", S, "E10"),
    Field::new("resistencia", S, "E11"),
    Field::new("carisma", S, "E12"),
    Field::new("motivacao", S, "E13"),
    Field::new("reputacao", S, "E14"),
    Field::new("peso", S, "E15"),
    Field::new("idade", S, "E16"),
    Field::new("energia", S, "E17"),
];

pub const CAR_PART_NAMES: [&str; 11] = [
    "Chassi",
    "Motor",
    "Asa dianteira",
    "Asa traseira",
    "Assoalho",
    "Laterais",
    "Radiador",
    "Câmbio",
    "Freios",
    "Suspensão",
    "Eletrônicos",
];

const CAR_FIRST_ROW: u32 = 6;
const CAR_LEVEL_COL: u32 = 9; // I
const CAR_WEAR_COL: u32 = 10; // J
const CAR_WEAR_END_COL: u32 = 11; // K

const DRY: Fallback = Fallback::Text("Dry");
const ZERO: Fallback = Fallback::Int(0);

/// Weather inputs shared by the setup page and the setup calculation.
pub const WEATHER: [Field; 6] = [
    Field::new("tempQ1", S, "R7").or(ZERO),
    Field::new("tempQ2", S, "R8").or(ZERO),
    Field::new("avgTemp", S, "R9").or(ZERO),
    Field::new("weatherQ1", S, "T7").or(DRY),
    Field::new("weatherQ2", S, "T8").or(DRY),
    Field::new("weatherRace", S, "T9").or(DRY),
];

/// Index of `avgTemp` in [`WEATHER`]; the race options reuse this cell.
pub const AVG_TEMP: usize = 2;

pub const TEMPERATURE_BOUNDS: [Field; 8] = [
    Field::new("r1_temp_min", S, "S12").or(ZERO),
    Field::new("r1_temp_max", S, "T12").or(ZERO),
    Field::new("r2_temp_min", S, "S13").or(ZERO),
    Field::new("r2_temp_max", S, "T13").or(ZERO),
    Field::new("r3_temp_min", S, "S14").or(ZERO),
    Field::new("r3_temp_max", S, "T14").or(ZERO),
    Field::new("r4_temp_min", S, "S15").or(ZERO),
    Field::new("r4_temp_max", S, "T15").or(ZERO),
];

pub const TEST_POINTS: [Field; 3] = [
    Field::new("power", S, "N6").or(ZERO),
    Field::new("handling", S, "N7").or(ZERO),
    Field::new("accel", S, "N8").or(ZERO),
];

pub const SETUP_KEYS: [&str; 6] = [
    "asaDianteira",
    "asaTraseira",
    "motor",
    "freios",
    "cambio",
    "suspensao",
];

const SETUP_FIRST_ROW: u32 = 6;
/// Session columns of the setup result block: AC, AD, AE.
pub const SETUP_SESSIONS: [(&str, u32); 3] = [("q1", 29), ("q2", 30), ("race", 31)];

/// How the setup response names a part, which setup row feeds it and which
/// car-part row carries its wear.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SetupPart {
    pub key: &'static str,
    pub setup_row: Option<usize>,
    pub wear_part: usize,
}

const fn setup_part(key: &'static str, setup_row: Option<usize>, wear_part: usize) -> SetupPart {
    SetupPart {
        key,
        setup_row,
        wear_part,
    }
}

pub const SETUP_PARTS: [SetupPart; 11] = [
    setup_part("asaDianteira", Some(0), 2),
    setup_part("asaTraseira", Some(1), 3),
    setup_part("motor", Some(2), 1),
    setup_part("freios", Some(3), 8),
    setup_part("cambio", Some(4), 7),
    setup_part("suspensao", Some(5), 9),
    setup_part("chassi", None, 0),
    setup_part("assoalho", None, 4),
    setup_part("laterais", None, 5),
    setup_part("radiador", None, 6),
    setup_part("eletronicos", None, 10),
];

pub const RACE_OPTIONS: [Field; 6] = [
    Field::new("desgaste_pneu_percent", TF, "G3"),
    Field::new("condicao", TF, "C3"),
    Field::new("ct_valor", TF, "C4"),
    Field::new("pneus_fornecedor", TF, "C5"),
    Field::new("tipo_pneu", TF, "C6"),
    Field::new("pitstops_num", TF, "C7"),
];

pub const RACE_SUMMARY: [Field; 7] = [
    Field::new("nivel_aderencia", TF, "D24"),
    Field::new("consumo_combustivel", TF, "D22"),
    Field::new("desgaste_pneu_str", TF, "D23"),
    Field::new("ultrapassagem", TF, "D17"),
    Field::new("voltas", TF, "D18"),
    Field::new("pit_io", TF, "D19"),
    Field::new("tcd_corrida", TF, "D21"),
];

pub const COMPOUND_NAMES: [&str; 4] = ["Extra Soft", "Soft", "Medium", "Hard"];
const COMPOUND_FIRST_ROW: u32 = 6;
/// Output columns of the compound block: G, K, N, O.
pub const COMPOUND_COLUMNS: [(&str, u32); 4] = [
    ("req_stops", 7),
    ("fuel_load", 11),
    ("tyre_wear", 14),
    ("total", 15),
];

/// Number of stints in every 8-wide table.
pub const STINT_COUNT: u32 = 8;
/// Column F; stint `i` lives `i` columns to its right.
pub const STINT_BASE_COL: u32 = 6;
/// Column O.
pub const STINT_TOTAL_COL: u32 = 15;
pub const STINT_METRICS: [&str; 5] = [
    "voltas",
    "desg_final_pneu",
    "comb_necessario",
    "est_tempo_pit",
    "voltas_em_bad",
];

/// Column Q; boost mini-stint `i` lives `i` columns to its right.
pub const BOOST_MINI_BASE_COL: u32 = 17;
const BOOST_MINI_VAL1_ROW: u32 = 25;
const BOOST_MINI_VAL2_ROW: u32 = 24;

pub const BOOST_SLOTS: u32 = 3;
const BOOST_FIRST_ROW: u32 = 20;
const BOOST_VOLTA_COL: u32 = 18; // R
const BOOST_STINT_COL: u32 = 19; // S
const BOOST_LIST_COL: u32 = 20; // T

/// Column of stint `index` (1-based) in the stint tables: 1 → G … 8 → N.
pub const fn stint_column(index: u32) -> Option<u32> {
    if index >= 1 && index <= STINT_COUNT {
        Some(STINT_BASE_COL + index)
    } else {
        None
    }
}

/// Column of boost mini-stint `index` (1-based): 1 → R … 8 → Y.
pub const fn boost_mini_column(index: u32) -> Option<u32> {
    if index >= 1 && index <= STINT_COUNT {
        Some(BOOST_MINI_BASE_COL + index)
    } else {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CarPartRow {
    pub name: &'static str,
    pub level: Field,
    /// Wear at the start of the race; also the setup calculation's wear start.
    pub wear: Field,
    pub wear_end: CellAddress,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SetupRow {
    pub key: &'static str,
    /// Cells in [`SETUP_SESSIONS`] order.
    pub sessions: [CellAddress; 3],
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompoundRow {
    pub name: &'static str,
    /// Cells in [`COMPOUND_COLUMNS`] order.
    pub outputs: [CellAddress; 4],
}

/// One 5×(8+1) stint block of `Tyre&Fuel`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StintTable {
    pub key: &'static str,
    pub base_row: u32,
}

impl StintTable {
    fn row(&self, metric: usize) -> Option<u32> {
        (metric < STINT_METRICS.len()).then(|| self.base_row + metric as u32)
    }

    /// Cell of stint `index` (1-based) for the metric at `metric` in [`STINT_METRICS`].
    pub fn cell(&self, metric: usize, index: u32) -> Option<CellAddress> {
        Some(CellAddress::new(TF, self.row(metric)?, stint_column(index)?))
    }

    pub fn total(&self, metric: usize) -> Option<CellAddress> {
        Some(CellAddress::new(TF, self.row(metric)?, STINT_TOTAL_COL))
    }

    /// The laps row; the personal table takes manual lap counts here.
    pub fn laps(&self, index: u32) -> Option<CellAddress> {
        self.cell(0, index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoostSlot {
    pub key: &'static str,
    pub volta: CellAddress,
    pub stint: CellAddress,
    pub voltas_list: CellAddress,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoostMiniStint {
    pub key: &'static str,
    pub val1: CellAddress,
    pub val2: CellAddress,
}

/// A resolved `(group, key) → cell` pair of the flattened layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub group: Group,
    pub key: String,
    pub cell: CellAddress,
}

const STINT_KEYS: [&str; 8] = [
    "stint1", "stint2", "stint3", "stint4", "stint5", "stint6", "stint7", "stint8",
];
const BOOST_KEYS: [&str; 3] = ["boost1", "boost2", "boost3"];

/// Stable `stintN` key for a 1-based stint index.
pub fn stint_key(index: u32) -> Option<&'static str> {
    STINT_KEYS.get((index as usize).checked_sub(1)?).copied()
}

/// The complete workbook layout.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub current_track: Field,
    pub driver_total: Field,
    pub driver: [Field; 12],
    pub car_parts: [CarPartRow; 11],
    pub weather: [Field; 6],
    pub temperature_bounds: [Field; 8],
    pub test_points: [Field; 3],
    pub setup_results: [SetupRow; 6],
    pub setup_parts: [SetupPart; 11],
    pub race_options: [Field; 6],
    pub race_summary: [Field; 7],
    pub compounds: [CompoundRow; 4],
    pub stints_predefined: StintTable,
    pub stints_personal: StintTable,
    pub boosts: [BoostSlot; 3],
    pub boost_mini_stints: Vec<BoostMiniStint>,
    pub tracks: RangeAddress,
}

static STANDARD: Lazy<Layout> = Lazy::new(Layout::build);

impl Layout {
    /// The layout of the shipped calculator workbook.
    pub fn standard() -> &'static Layout {
        &STANDARD
    }

    fn build() -> Layout {
        let car_parts = std::array::from_fn(|i| {
            let row = CAR_FIRST_ROW + i as u32;
            CarPartRow {
                name: CAR_PART_NAMES[i],
                level: Field::at("lvl", CellAddress::new(S, row, CAR_LEVEL_COL))
                    .or(Fallback::Int(1)),
                wear: Field::at("wear", CellAddress::new(S, row, CAR_WEAR_COL)).or(ZERO),
                wear_end: CellAddress::new(S, row, CAR_WEAR_END_COL),
            }
        });
        let setup_results = std::array::from_fn(|i| {
            let row = SETUP_FIRST_ROW + i as u32;
            SetupRow {
                key: SETUP_KEYS[i],
                sessions: SETUP_SESSIONS.map(|(_, col)| CellAddress::new(S, row, col)),
            }
        });
        let compounds = std::array::from_fn(|i| {
            let row = COMPOUND_FIRST_ROW + i as u32;
            CompoundRow {
                name: COMPOUND_NAMES[i],
                outputs: COMPOUND_COLUMNS.map(|(_, col)| CellAddress::new(TF, row, col)),
            }
        });
        let boosts = std::array::from_fn(|i| {
            let row = BOOST_FIRST_ROW + i as u32;
            BoostSlot {
                key: BOOST_KEYS[i],
                volta: CellAddress::new(TF, row, BOOST_VOLTA_COL),
                stint: CellAddress::new(TF, row, BOOST_STINT_COL),
                voltas_list: CellAddress::new(TF, row, BOOST_LIST_COL),
            }
        });
        let boost_mini_stints = (1..=STINT_COUNT)
            .filter_map(|index| {
                let col = boost_mini_column(index)?;
                Some(BoostMiniStint {
                    key: stint_key(index)?,
                    val1: CellAddress::new(TF, BOOST_MINI_VAL1_ROW, col),
                    val2: CellAddress::new(TF, BOOST_MINI_VAL2_ROW, col),
                })
            })
            .collect();

        Layout {
            current_track: CURRENT_TRACK,
            driver_total: DRIVER_TOTAL,
            driver: DRIVER_ATTRIBUTES,
            car_parts,
            weather: WEATHER,
            temperature_bounds: TEMPERATURE_BOUNDS,
            test_points: TEST_POINTS,
            setup_results,
            setup_parts: SETUP_PARTS,
            race_options: RACE_OPTIONS,
            race_summary: RACE_SUMMARY,
            compounds,
            stints_predefined: StintTable {
                key: "stints_predefined",
                base_row: 14,
            },
            stints_personal: StintTable {
                key: "stints_personal",
                base_row: 21,
            },
            boosts,
            boost_mini_stints,
            tracks: TRACKS_RANGE,
        }
    }

    /// The race options' average temperature is the weather `avgTemp` cell.
    pub fn avg_temp(&self) -> &Field {
        &self.weather[AVG_TEMP]
    }

    pub fn stint_tables(&self) -> [&StintTable; 2] {
        [&self.stints_predefined, &self.stints_personal]
    }

    /// Every cell the layout owns, each physical cell exactly once. Keys are
    /// dotted paths inside their group (`Motor.lvl`, `stints_personal.voltas.stint1`).
    pub fn entries(&self) -> Vec<Entry> {
        let mut out = Vec::new();
        let mut push = |group: Group, key: String, cell: CellAddress| {
            out.push(Entry { group, key, cell });
        };

        push(Group::Race, self.current_track.key.into(), self.current_track.cell);
        push(Group::Driver, self.driver_total.key.into(), self.driver_total.cell);
        for field in &self.driver {
            push(Group::Driver, field.key.into(), field.cell);
        }
        for part in &self.car_parts {
            push(Group::CarParts, format!("{}.lvl", part.name), part.level.cell);
            push(Group::CarParts, format!("{}.wear", part.name), part.wear.cell);
            push(Group::WearEnd, format!("{}.end", part.name), part.wear_end);
        }
        for field in self.weather.iter().chain(&self.temperature_bounds) {
            push(Group::Weather, field.key.into(), field.cell);
        }
        for field in &self.test_points {
            push(Group::TestPoints, field.key.into(), field.cell);
        }
        for row in &self.setup_results {
            for ((session, _), cell) in SETUP_SESSIONS.iter().zip(row.sessions) {
                push(Group::SetupResults, format!("{}.{session}", row.key), cell);
            }
        }
        for field in &self.race_options {
            push(Group::RaceOptions, field.key.into(), field.cell);
        }
        for field in &self.race_summary {
            push(Group::RaceSummary, field.key.into(), field.cell);
        }
        for compound in &self.compounds {
            for ((column, _), cell) in COMPOUND_COLUMNS.iter().zip(compound.outputs) {
                push(Group::Compounds, format!("{}.{column}", compound.name), cell);
            }
        }
        for table in self.stint_tables() {
            for (metric_idx, metric) in STINT_METRICS.iter().enumerate() {
                for index in 1..=STINT_COUNT {
                    if let (Some(cell), Some(stint)) = (table.cell(metric_idx, index), stint_key(index)) {
                        push(Group::Stints, format!("{}.{metric}.{stint}", table.key), cell);
                    }
                }
                if let Some(cell) = table.total(metric_idx) {
                    push(Group::Stints, format!("{}.{metric}.total", table.key), cell);
                }
            }
        }
        for slot in &self.boosts {
            push(Group::Boosts, format!("{}.volta", slot.key), slot.volta);
            push(Group::Boosts, format!("{}.stint", slot.key), slot.stint);
            push(Group::Boosts, format!("{}.voltas_list", slot.key), slot.voltas_list);
        }
        for mini in &self.boost_mini_stints {
            push(Group::BoostMiniStints, format!("{}.val1", mini.key), mini.val1);
            push(Group::BoostMiniStints, format!("{}.val2", mini.key), mini.val2);
        }
        for (offset, cell) in self.tracks.cells().enumerate() {
            push(Group::Tracks, offset.to_string(), cell);
        }
        out
    }

    /// Look up a field's cell by group and dotted key.
    ///
    /// Two keys are aliases of cells owned by another group: race options
    /// `avg_temp` (the weather `avgTemp` cell) and wear `<part>.start` (the
    /// car-part wear cell).
    pub fn resolve(&self, group: Group, key: &str) -> Option<CellAddress> {
        match (group, key) {
            (Group::RaceOptions, "avg_temp") => return Some(self.avg_temp().cell),
            (Group::WearEnd, _) => {
                if let Some(name) = key.strip_suffix(".start") {
                    return self
                        .car_parts
                        .iter()
                        .find(|part| part.name == name)
                        .map(|part| part.wear.cell);
                }
            }
            _ => {}
        }
        self.entries()
            .into_iter()
            .find(|entry| entry.group == group && entry.key == key)
            .map(|entry| entry.cell)
    }

    /// Sheets the workbook must expose for this layout.
    pub fn required_sheets(&self) -> Vec<Sheet> {
        let mut sheets: Vec<Sheet> = self.entries().iter().map(|entry| entry.cell.sheet).collect();
        sheets.sort();
        sheets.dedup();
        sheets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stint_columns_follow_the_workbook() {
        assert_eq!(stint_column(1), Some(7));
        assert_eq!(stint_column(8), Some(14));
        assert_eq!(stint_column(0), None);
        assert_eq!(stint_column(9), None);
        assert_eq!(boost_mini_column(1), Some(18));
        assert_eq!(boost_mini_column(8), Some(25));
    }

    #[test]
    fn personal_laps_start_at_g21() {
        let layout = Layout::standard();
        let cell = layout.stints_personal.laps(1).expect("stint 1");
        assert_eq!(cell, CellAddress::a1(Sheet::TyreFuel, "G21"));
        assert_eq!(
            layout.stints_predefined.total(4),
            Some(CellAddress::a1(Sheet::TyreFuel, "O18"))
        );
        assert_eq!(layout.stints_personal.cell(5, 1), None);
    }

    #[test]
    fn fallbacks_only_fill_absent() {
        assert_eq!(Fallback::Int(1).apply(DomainValue::Absent), DomainValue::Int(1));
        assert_eq!(Fallback::Int(1).apply(DomainValue::Int(0)), DomainValue::Int(0));
        assert_eq!(
            Fallback::Text("Dry").apply(DomainValue::Absent),
            DomainValue::Text("Dry".into())
        );
    }

    #[test]
    fn mini_stint_cells_sit_in_boost_mini_columns() {
        let minis = &Layout::standard().boost_mini_stints;
        assert_eq!(minis.len(), STINT_COUNT as usize);
        for (index, mini) in (1..=STINT_COUNT).zip(minis) {
            assert_eq!(Some(mini.key), stint_key(index));
            assert_eq!(Some(mini.val1.col), boost_mini_column(index));
            assert_eq!(Some(mini.val2.col), boost_mini_column(index));
        }
        assert_eq!(minis[0].val1, CellAddress::a1(Sheet::TyreFuel, "R25"));
    }

    #[test]
    fn stint_keys_are_one_based() {
        assert_eq!(stint_key(1), Some("stint1"));
        assert_eq!(stint_key(8), Some("stint8"));
        assert_eq!(stint_key(0), None);
        assert_eq!(stint_key(9), None);
    }
}
