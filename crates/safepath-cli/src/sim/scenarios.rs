//! Pre-defined indoor layouts for exercising the planner.

use safepath_core::{Vec3, Waypoint, WaypointSource};

pub const SCENARIO_NAMES: [&str; 4] = ["hallway", "lobby", "maze", "landmarks"];

/// A named waypoint snapshot, as a mapping session would hand it over.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub waypoints: Vec<Waypoint>,
}

impl WaypointSource for Scenario {
    fn snapshot(&self) -> Vec<Waypoint> {
        self.waypoints.clone()
    }
}

pub fn scenario_by_name(name: &str) -> Option<Scenario> {
    match name {
        "hallway" => Some(create_hallway_scenario()),
        "lobby" => Some(create_lobby_scenario()),
        "maze" => Some(create_maze_scenario()),
        "landmarks" => Some(create_landmarks_scenario()),
        _ => None,
    }
}

fn wall(from: Vec3, to: Vec3, spacing: f64, width: f64) -> Vec<Waypoint> {
    let count = (from.horizontal_distance(&to) / spacing).ceil().max(1.0) as usize;
    (0..=count)
        .map(|i| Waypoint::obstacle(from.lerp(&to, i as f64 / count as f64), width))
        .collect()
}

/// 20m corridor heading north with a bin against the right wall.
pub fn create_hallway_scenario() -> Scenario {
    let mut waypoints = vec![
        Waypoint::start(Vec3::new(0.0, 0.0, 0.0)).with_description("Office door"),
        Waypoint::end(Vec3::new(0.0, 0.0, 20.0)).with_description("Stairwell"),
    ];
    waypoints.extend(wall(
        Vec3::new(-2.0, 0.0, -1.0),
        Vec3::new(-2.0, 0.0, 21.0),
        1.0,
        0.6,
    ));
    waypoints.extend(wall(
        Vec3::new(2.0, 0.0, -1.0),
        Vec3::new(2.0, 0.0, 21.0),
        1.0,
        0.6,
    ));
    waypoints.push(Waypoint::obstacle(Vec3::new(0.6, 0.0, 10.0), 0.5).with_description("Trash bin"));

    Scenario {
        name: "hallway".to_string(),
        waypoints,
    }
}

/// Open lobby with furniture and a reception desk to pass by.
pub fn create_lobby_scenario() -> Scenario {
    let waypoints = vec![
        Waypoint::start(Vec3::new(0.0, 0.0, 0.0)).with_description("Entrance"),
        Waypoint::obstacle(Vec3::new(4.0, 0.0, 3.0), 1.0).with_description("Pillar"),
        Waypoint::obstacle(Vec3::new(7.0, 0.0, 6.0), 0.8).with_description("Bench"),
        Waypoint::obstacle(Vec3::new(2.0, 0.0, 6.0), 0.6).with_description("Planter"),
        Waypoint::path_point(Vec3::new(5.0, 0.0, 5.0)).with_description("Reception desk"),
        Waypoint::end(Vec3::new(10.0, 0.0, 8.0)).with_description("Elevator"),
    ];

    Scenario {
        name: "lobby".to_string(),
        waypoints,
    }
}

/// Two staggered partitions forcing an S-shaped walk.
pub fn create_maze_scenario() -> Scenario {
    let mut waypoints = vec![
        Waypoint::start(Vec3::new(0.0, 0.0, 0.0)),
        Waypoint::end(Vec3::new(10.0, 0.0, 10.0)),
    ];
    waypoints.extend(wall(
        Vec3::new(-2.0, 0.0, 3.0),
        Vec3::new(8.0, 0.0, 3.0),
        1.0,
        0.6,
    ));
    waypoints.extend(wall(
        Vec3::new(2.0, 0.0, 7.0),
        Vec3::new(12.0, 0.0, 7.0),
        1.0,
        0.6,
    ));

    Scenario {
        name: "maze".to_string(),
        waypoints,
    }
}

/// Straight gallery with named landmarks slightly off the direct line.
pub fn create_landmarks_scenario() -> Scenario {
    let waypoints = vec![
        Waypoint::start(Vec3::new(0.0, 0.0, 0.0)).with_description("Gallery entrance"),
        Waypoint::path_point(Vec3::new(4.0, 0.0, 0.8)).with_description("Elevator"),
        Waypoint::obstacle(Vec3::new(6.0, 0.0, 0.0), 0.8).with_description("Wet floor sign"),
        Waypoint::path_point(Vec3::new(8.0, 0.0, -0.6)).with_description("Restroom"),
        Waypoint::path_point(Vec3::new(12.0, 0.0, 0.5)).with_description("Exit sign"),
        Waypoint::end(Vec3::new(16.0, 0.0, 0.0)).with_description("Cafe"),
    ];

    Scenario {
        name: "landmarks".to_string(),
        waypoints,
    }
}
