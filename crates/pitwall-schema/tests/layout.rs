use std::collections::HashSet;

use pitwall_common::{CellAddress, Sheet};
use pitwall_schema::{Group, Layout, STINT_COUNT, boost_mini_column, stint_column};

#[test]
fn standard_layout_validates() {
    Layout::standard().validate().expect("shipped layout is consistent");
}

#[test]
fn no_two_fields_share_a_cell() {
    let entries = Layout::standard().entries();
    let mut seen = HashSet::new();
    for entry in &entries {
        assert!(
            seen.insert(entry.cell),
            "{}.{} reuses {}",
            entry.group.name(),
            entry.key,
            entry.cell
        );
    }
    // 1 track + 13 driver + 33 car/wear + 14 weather + 3 tests + 18 setup
    // + 6 options + 7 summary + 16 compounds + 90 stints + 9 boosts + 16 mini + 64 tracks
    assert_eq!(entries.len(), 290);
}

#[test]
fn column_functions_are_injective() {
    let stints: HashSet<u32> = (1..=STINT_COUNT).filter_map(stint_column).collect();
    let minis: HashSet<u32> = (1..=STINT_COUNT).filter_map(boost_mini_column).collect();
    assert_eq!(stints.len(), STINT_COUNT as usize);
    assert_eq!(minis.len(), STINT_COUNT as usize);
}

#[test]
fn resolve_finds_fields_and_aliases() {
    let layout = Layout::standard();
    let s = |a1| CellAddress::a1(Sheet::Setup, a1);
    let tf = |a1| CellAddress::a1(Sheet::TyreFuel, a1);

    assert_eq!(layout.resolve(Group::Race, "current_track"), Some(s("R5")));
    assert_eq!(layout.resolve(Group::Driver, "energia"), Some(s("E17")));
    assert_eq!(layout.resolve(Group::CarParts, "Eletrônicos.wear"), Some(s("J16")));
    assert_eq!(layout.resolve(Group::WearEnd, "Motor.end"), Some(s("K7")));
    assert_eq!(layout.resolve(Group::WearEnd, "Motor.start"), Some(s("J7")));
    assert_eq!(layout.resolve(Group::SetupResults, "suspensao.race"), Some(s("AE11")));
    assert_eq!(layout.resolve(Group::RaceOptions, "avg_temp"), Some(s("R9")));
    assert_eq!(layout.resolve(Group::RaceOptions, "pitstops_num"), Some(tf("C7")));
    assert_eq!(layout.resolve(Group::Compounds, "Hard.total"), Some(tf("O9")));
    assert_eq!(
        layout.resolve(Group::Stints, "stints_personal.voltas.stint2"),
        Some(tf("H21"))
    );
    assert_eq!(
        layout.resolve(Group::Stints, "stints_predefined.voltas_em_bad.total"),
        Some(tf("O18"))
    );
    assert_eq!(layout.resolve(Group::Boosts, "boost3.voltas_list"), Some(tf("T22")));
    assert_eq!(layout.resolve(Group::BoostMiniStints, "stint8.val2"), Some(tf("Y24")));
    assert_eq!(layout.resolve(Group::Driver, "unknown"), None);
}

#[test]
fn duplicate_cells_are_reported_with_both_paths() {
    let mut layout = Layout::standard().clone();
    layout.test_points[0].cell = layout.driver[0].cell;

    let err = layout.validate().expect_err("aliasing must be rejected");
    let issue = &err.issues()[0];
    assert_eq!(issue.path, "test_points.power");
    assert!(issue.message.contains("driver.concentracao"), "{}", issue.message);
}

#[test]
fn broken_setup_mapping_is_reported() {
    let mut layout = Layout::standard().clone();
    layout.setup_parts[1].wear_part = layout.setup_parts[0].wear_part;
    layout.setup_parts[2].setup_row = Some(7);

    let err = layout.validate().expect_err("mapping must be rejected");
    let paths: Vec<_> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"setup_parts[1]"), "{paths:?}");
    assert!(paths.contains(&"setup_parts[2]"), "{paths:?}");
    assert!(err.to_string().starts_with("invalid cell layout: "));
}

#[test]
fn layout_uses_all_three_sheets() {
    assert_eq!(
        Layout::standard().required_sheets(),
        vec![Sheet::Setup, Sheet::TyreFuel, Sheet::Tracks]
    );
}

#[test]
fn shifted_mini_stint_is_reported() {
    let mut layout = Layout::standard().clone();
    layout.boost_mini_stints[2].val2.col += 1;
    layout.boost_mini_stints.pop();

    let err = layout.validate().expect_err("mini-stint table must be rejected");
    let paths: Vec<_> = err.issues().iter().map(|i| i.path.as_str()).collect();
    assert!(paths.contains(&"boost_mini_stints"), "{paths:?}");
    assert!(paths.contains(&"boost_mini_stints.stint3"), "{paths:?}");
}
