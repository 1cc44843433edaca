//! Guidance loop tests against the built-in scenarios.

use safepath_cli::sim::{scenario_by_name, SimulatedWalker, SCENARIO_NAMES};
use safepath_cli::{guidance_tick, plan_on_worker, CliConfig};
use safepath_core::{resolve_endpoints, SafePathPlanner, TrackingStatus, Vec3, Waypoint};

#[tokio::test]
async fn planning_on_a_worker_returns_the_planner() {
    let scenario = scenario_by_name("lobby").unwrap();
    let planner = SafePathPlanner::new(CliConfig::default().planner_config()).unwrap();

    let (planner, summary) = plan_on_worker(planner, scenario.waypoints.clone())
        .await
        .unwrap();

    assert_eq!(summary.point_count, planner.route().len());
    assert!(planner.next_target().is_some());
}

#[tokio::test]
async fn planning_failure_surfaces_as_error() {
    let planner = SafePathPlanner::new(CliConfig::default().planner_config()).unwrap();
    let lone = vec![Waypoint::start(Vec3::ZERO)];
    let err = plan_on_worker(planner, lone).await.err().unwrap();
    assert!(err.to_string().contains("planning failed"));
}

#[tokio::test]
async fn simulated_walker_reaches_every_destination() {
    for name in SCENARIO_NAMES {
        let scenario = scenario_by_name(name).unwrap();
        let (start, end) = resolve_endpoints(&scenario.waypoints).unwrap();
        let planner = SafePathPlanner::new(CliConfig::default().planner_config()).unwrap();
        let (mut planner, _) = plan_on_worker(planner, scenario.waypoints.clone())
            .await
            .unwrap();

        let mut walker = SimulatedWalker::new(start, 1.2, 0.05, 11);
        let mut arrived = false;
        for tick in 0..2_000u64 {
            let event = guidance_tick(&mut planner, tick, walker.position(), 3);
            if event.status == TrackingStatus::Complete {
                arrived = true;
                assert_eq!(event.message, "You have arrived");
                break;
            }
            let target = planner.next_target().unwrap();
            walker.step_toward(target, 0.5);
        }

        assert!(arrived, "walker never arrived in {name}");
        assert!(walker.position().horizontal_distance(&end) <= 1.5, "{name}");
    }
}
