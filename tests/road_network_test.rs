//! Road graph and pathfinding tests

use apb_traffic::simulation::{
    CellClass, CellCoord, Layout, SimGrid, SimRoadNetwork, SimWorld, PATH_EXPANSION_BUDGET,
};

fn open_layout(width: usize, height: usize) -> Layout {
    let row = vec!["r"; width].join(" ");
    let rows: Vec<&str> = (0..height).map(|_| row.as_str()).collect();
    Layout::from_rows(&rows)
}

fn assert_connected_route(path: &[CellCoord], grid: &SimGrid) {
    for cell in path {
        assert!(grid.is_driveable(*cell), "{:?} is not driveable", cell);
    }
    for pair in path.windows(2) {
        assert!(pair[0].is_adjacent(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
    }
}

#[test]
fn test_bfs_path_length_is_manhattan_on_open_grid() {
    let grid = SimGrid::from_layout(&open_layout(8, 6));
    let mut network = SimRoadNetwork::from_grid(&grid);
    assert_eq!(network.cell_count(), 48);
    // 7 horizontal links per row, 5 vertical links per column
    assert_eq!(network.edge_count(), 7 * 6 + 5 * 8);

    let pairs = [
        (CellCoord::new(0, 0), CellCoord::new(7, 5)),
        (CellCoord::new(1, 4), CellCoord::new(6, 0)),
        (CellCoord::new(3, 2), CellCoord::new(3, 2)),
    ];
    for (start, goal) in pairs {
        let path = network.find_path(start, goal).unwrap();
        assert_eq!(path.len(), start.manhattan(goal) as usize + 1);
        assert_eq!(path.first(), Some(&start));
        assert_eq!(path.last(), Some(&goal));
        assert_connected_route(&path, &grid);
    }
}

#[test]
fn test_disconnected_components_have_no_path() {
    let grid = SimGrid::from_layout(&Layout::from_rows(&[
        "r r h r r",
        "r r h r r",
        "r r h r r",
    ]));
    let mut network = SimRoadNetwork::from_grid(&grid);

    assert!(network.find_path(CellCoord::new(0, 0), CellCoord::new(4, 2)).is_none());
    // The miss is cached and stays a miss
    assert!(network.find_path(CellCoord::new(0, 0), CellCoord::new(4, 2)).is_none());
    assert!(network.find_path(CellCoord::new(0, 0), CellCoord::new(1, 2)).is_some());

    // Buildings are not part of the graph
    assert!(!network.contains(CellCoord::new(2, 1)));
    assert!(network.find_path(CellCoord::new(2, 1), CellCoord::new(0, 0)).is_none());
}

#[test]
fn test_expansion_budget_limits_search() {
    let grid = SimGrid::from_layout(&open_layout(40, 40));
    let mut network = SimRoadNetwork::from_grid(&grid);
    let start = CellCoord::new(0, 0);
    let goal = CellCoord::new(39, 39);

    assert!(network.cell_count() > PATH_EXPANSION_BUDGET);
    assert!(network.find_path(start, goal).is_none());

    let path = network.find_path_with_budget(start, goal, 5000).unwrap();
    assert_eq!(path.len(), 79);
}

#[test]
fn test_default_city_routes_reach_the_roundabout() {
    let grid = SimGrid::from_layout(&Layout::default_city());
    let mut network = SimRoadNetwork::from_grid(&grid);
    let roundabout = CellCoord::new(4, 3);
    let start_cell = CellCoord::new(4, 4);
    assert_eq!(grid.cell_class(roundabout), CellClass::Roundabout);
    assert_eq!(grid.cell_class(start_cell), CellClass::Spawn);

    let path = network.find_path(CellCoord::new(11, 9), roundabout).unwrap();
    assert_eq!(path.len(), 14);
    assert_eq!(path.last(), Some(&roundabout));
    assert!(path[path.len() - 2].is_adjacent(roundabout));
    assert_connected_route(&path, &grid);

    // Leaving the start cell northwards goes through the roundabout
    let north = network.find_path(start_cell, CellCoord::new(4, 0)).unwrap();
    assert_eq!(north.len(), 5);
    assert_eq!(north[1], roundabout);
}

#[test]
fn test_layout_reload_rebuilds_the_graph() {
    let mut world = SimWorld::new_with_seed(&Layout::default_city(), 1);
    world.spawn_car().unwrap();
    let before = world.road_network.cell_count();

    world.reload_layout(&Layout::from_rows(&["r r r", "h h r"]));
    assert!(world.cars.is_empty());
    assert_ne!(world.road_network.cell_count(), before);
    assert_eq!(world.road_network.cell_count(), 4);
    assert!(world
        .road_network
        .find_path(CellCoord::new(0, 0), CellCoord::new(2, 1))
        .is_some());
}

#[test]
fn test_layout_json_normalizes_codes() {
    let layout = Layout::from_json_str(
        r#"{"width": 4, "height": 2,
            "grid": [["road", "AV", "rb:2", "house-blue"], ["spawn", "???"]]}"#,
    )
    .unwrap();
    let grid = SimGrid::from_layout(&layout);

    assert_eq!(grid.cell_class(CellCoord::new(0, 0)), CellClass::Road);
    assert_eq!(grid.cell_class(CellCoord::new(1, 0)), CellClass::Avenue);
    assert_eq!(grid.cell_class(CellCoord::new(2, 0)), CellClass::Roundabout);
    assert!(!grid.is_driveable(CellCoord::new(3, 0)));
    assert_eq!(grid.cell_class(CellCoord::new(0, 1)), CellClass::Spawn);
    assert_eq!(grid.cell_class(CellCoord::new(1, 1)), CellClass::Empty);
    // Short rows are padded
    assert_eq!(grid.cell_class(CellCoord::new(3, 1)), CellClass::Empty);

    assert!(Layout::from_json_str("{ not json").is_err());
}
