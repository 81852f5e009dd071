//! History documents going through the cache and the cleaner.

use subtopo_algo::test_utils::{bus, choice, history, substation, topology};
use subtopo_algo::{CleaningConfig, HistoryCleaner};
use subtopo_core::{EquipmentKind, Network};
use subtopo_io::{
    load_history, load_network, save_history, save_network, CacheKeyInputs, HistoryCache,
};

fn network() -> Network {
    let mut n = Network::new("io");
    n.add_voltage_level("VL1", "S1").add_voltage_level("VL2", "S2");
    n.add_bus("VL1", "B1").unwrap().add_bus("VL2", "B2").unwrap();
    n.add_branch("L1", EquipmentKind::Line, ("VL1", "B1"), ("VL2", "B2"))
        .unwrap();
    n.add_branch("L2", EquipmentKind::Line, ("VL1", "B1"), ("VL2", "B2"))
        .unwrap();
    n.add_injection("LOAD1", EquipmentKind::Load, "VL1", "B1")
        .unwrap();
    n
}

#[test]
fn test_saved_history_cleans_like_the_original() {
    let dir = tempfile::tempdir().unwrap();
    let original = history(vec![choice(
        0,
        vec![
            topology("a", 0.3, vec![substation("VL1", vec![bus(&["L1", "LOAD1"]), bus(&["L2"])])]),
            topology("b", 0.7, vec![substation("VL1", vec![bus(&["L2"]), bus(&["LOAD1", "L1"])])]),
        ],
    )]);
    let history_path = dir.path().join("history.json");
    let network_path = dir.path().join("network.json");
    save_history(&history_path, &original).unwrap();
    save_network(&network_path, &network()).unwrap();

    let n = load_network(&network_path).unwrap();
    let mut loaded = load_history(&history_path).unwrap();
    assert_eq!(loaded.stats(), original.stats());

    let report = HistoryCleaner::new(&n, &CleaningConfig::default())
        .clean(&mut loaded)
        .unwrap();
    assert_eq!(report.total_actions(), 1);
    assert_eq!(loaded.topology_choices[0].possible_topologies[0].topo_hash, "b");
}

#[test]
fn test_cache_key_is_stable_through_storage() {
    let dir = tempfile::tempdir().unwrap();
    let cache = HistoryCache::new(dir.path().join("cache"));
    let h = history(vec![choice(
        2,
        vec![topology("a", 1.0, vec![substation("VL2", vec![bus(&["L1", "L2"])])])],
    )]);
    let key = CacheKeyInputs::of_history(&h).key();
    cache.store(&key, &h).unwrap();

    let back = cache.load(&key).unwrap().unwrap();
    assert_eq!(CacheKeyInputs::of_history(&back).key(), key);
    assert_eq!(back.topology_choices[0].cluster_id, 2);
}
