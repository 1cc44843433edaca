//! Simulation helpers: indoor scenarios and a simulated walker.

pub mod scenarios;
pub mod walker;

pub use scenarios::{
    create_hallway_scenario, create_landmarks_scenario, create_lobby_scenario,
    create_maze_scenario, scenario_by_name, Scenario, SCENARIO_NAMES,
};
pub use walker::{SimulatedWalker, StraightWalk, WalkPath};
