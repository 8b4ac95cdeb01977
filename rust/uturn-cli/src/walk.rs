use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use uturn_core::models::direction;
use uturn_core::{RecordingSink, TickInput, TurnCompleted, TurnPhase, TurnStateMachine, Vec3};

use crate::scenario::Scenario;

/// Simulation step in seconds.
const STEP: f64 = 0.25;
const MAX_TICKS: usize = 4000;

#[derive(Clone, Debug, Serialize)]
pub struct Transition {
    pub tick: usize,
    pub from: TurnPhase,
    pub to: TurnPhase,
    pub pose: Vec3,
}

#[derive(Clone, Debug, Serialize)]
pub struct WalkReport {
    pub ticks: usize,
    pub distance_m: f64,
    pub transitions: Vec<Transition>,
    pub statuses: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<TurnCompleted>,
    pub final_paths_away: i32,
    pub final_pose: Vec3,
}

/// Kinematic bicycle step. Positive steer turns right.
fn advance(pose: Vec3, distance: f64, steer: f64, wheelbase: f64) -> Vec3 {
    let heading = pose.heading + distance / wheelbase * steer.tan();
    let mid = pose.heading + 0.5 * (heading - pose.heading);
    let p = pose.xy() + direction(mid) * distance;
    p.with_heading(heading)
}

/// Drives straight from the scenario pose until a turn starts, then lets the
/// follower steer a bicycle model through it. Stops after the first completed
/// turn, when the vehicle leaves the field, or after `MAX_TICKS`.
pub fn walk(scenario: &Scenario) -> Result<WalkReport> {
    let options = scenario.options();
    let field = scenario.field()?;
    let speed = scenario.speed.max(0.1);
    let step = speed * STEP;

    let mut machine = TurnStateMachine::new();
    if let Some(left) = scenario.turn_left {
        machine.set_turn_direction(left);
    }
    let mut sink = RecordingSink::new();
    let mut pose = scenario.pose;
    let mut phase = machine.phase();
    let mut transitions = Vec::new();
    let mut completed = None;
    let mut distance_m = 0.0;
    let mut ticks = 0;

    while ticks < MAX_TICKS {
        let input = TickInput { pose, speed, reference: Some(&scenario.track), field: Some(&field), options: &options };
        let out = machine.tick(&input, &mut sink);
        ticks += 1;
        if out.phase != phase {
            info!(tick = ticks, from = ?phase, to = ?out.phase, easting = pose.easting, northing = pose.northing, "phase change");
            transitions.push(Transition { tick: ticks, from: phase, to: out.phase, pose });
            phase = out.phase;
        }
        if out.completed {
            completed = sink.completions().last().copied();
            break;
        }

        let steer = out.steer.map_or(0.0, |c| c.angle);
        pose = advance(pose, step, steer, options.vehicle.wheelbase);
        distance_m += step;
        debug!(easting = pose.easting, northing = pose.northing, heading = pose.heading, steer, "walk step");
        if !field.inside_boundary(pose.xy()) {
            warn!(tick = ticks, easting = pose.easting, northing = pose.northing, "vehicle left the field");
            break;
        }
    }

    Ok(WalkReport {
        ticks,
        distance_m,
        transitions,
        statuses: sink.statuses().map(ToString::to_string).collect(),
        completed,
        final_paths_away: machine.paths_away(),
        final_pose: pose,
    })
}
