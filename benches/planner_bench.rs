// Benchmark for the RBT-Connect planner
// Run with: cargo bench --bench planner_bench

use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{DVector, Isometry3, Translation3, UnitQuaternion};
use parry3d_f64::shape::SharedShape;

use burplan::robot::SerialChain;
use burplan::{planar_arm, CollisionEnv, PlannerParams, RbtPlanner};

fn arm_env(with_obstacle: bool) -> CollisionEnv {
    let mut env = CollisionEnv::new();
    let at_tip = Isometry3::from_parts(
        Translation3::new(1.0, 0.0, 0.0),
        UnitQuaternion::identity(),
    );
    env.add_robot_part("elbow", Some(0), at_tip, SharedShape::ball(0.05));
    env.add_robot_part("tip", Some(1), at_tip, SharedShape::ball(0.05));
    if with_obstacle {
        env.add_obstacle(
            "ball",
            SharedShape::ball(0.3),
            Isometry3::from_parts(
                Translation3::new(2.0, 0.0, 0.0),
                UnitQuaternion::identity(),
            ),
        );
    }
    env
}

fn bench_params() -> PlannerParams {
    let mut params = PlannerParams::default();
    params.max_iters = 5000;
    params.seed = Some(7);
    params
}

fn benchmark_open_space(c: &mut Criterion) {
    let model = Arc::new(planar_arm(&[1.0, 1.0], (-PI, PI)).unwrap());
    let start = DVector::from_vec(vec![0.0, 0.0]);
    let goal = DVector::from_vec(vec![1.0, 0.5]);

    c.bench_function("plan_open_space_2dof", |b| {
        b.iter(|| {
            let mut planner: RbtPlanner<SerialChain> =
                RbtPlanner::new(model.clone(), arm_env(false), bench_params());
            black_box(planner.plan(&start, &goal)).unwrap()
        });
    });
}

fn benchmark_around_obstacle(c: &mut Criterion) {
    let model = Arc::new(planar_arm(&[1.0, 1.0], (-PI, PI)).unwrap());
    let start = DVector::from_vec(vec![FRAC_PI_2, 0.0]);
    let goal = DVector::from_vec(vec![-FRAC_PI_2, 0.0]);

    c.bench_function("plan_around_obstacle_2dof", |b| {
        b.iter(|| {
            let mut planner: RbtPlanner<SerialChain> =
                RbtPlanner::new(model.clone(), arm_env(true), bench_params());
            black_box(planner.plan(&start, &goal)).ok()
        });
    });
}

criterion_group!(benches, benchmark_open_space, benchmark_around_obstacle);
criterion_main!(benches);
