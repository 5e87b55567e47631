use std::cell::{Cell, RefCell};
use std::rc::Rc;

use strata::{ECSError, SystemDesc, SystemError, TypeDesc, World};

#[test]
fn user_data_mutation_is_observable() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("score", 4, 4)).unwrap();

    let total = Rc::new(Cell::new(0i64));
    let desc = SystemDesc::new("tally", "score", |ctx, _dt| {
        let total = ctx.user_data_mut::<Rc<Cell<i64>>>().unwrap();
        total.set(total.get() + 1);
    })
    .with_user_data(Rc::clone(&total));
    world.register_system(desc).unwrap();

    world.spawn(7, "score").unwrap();
    world.run("tally", 0.0).unwrap();

    assert_eq!(total.get(), 7, "callback mutation must reach the caller's handle");
}

#[test]
fn dt_reaches_the_callback() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("a", 4, 4)).unwrap();

    let seen = Rc::new(Cell::new(0.0f64));
    let recorded = Rc::clone(&seen);
    world
        .register_system(SystemDesc::new("observe_dt", "a", move |_ctx, dt| {
            recorded.set(dt);
        }))
        .unwrap();

    world.spawn(1, "a").unwrap();
    world.run("observe_dt", 0.25).unwrap();

    assert_eq!(seen.get(), 0.25);
}

#[test]
fn running_an_unknown_system_fails() {
    let mut world = World::new();
    let err = world.run("missing", 0.0).unwrap_err();
    assert_eq!(
        err,
        ECSError::System(SystemError::UnknownSystem { identifier: "missing".into() })
    );
}

#[test]
fn step_runs_systems_in_registration_order() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("a", 4, 4)).unwrap();

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let log = Rc::clone(&order);
    world
        .register_system(SystemDesc::new("first", "a", move |_ctx, _dt| {
            log.borrow_mut().push("first");
        }))
        .unwrap();

    let log = Rc::clone(&order);
    world
        .register_system(SystemDesc::new("second", "a", move |_ctx, _dt| {
            log.borrow_mut().push("second");
        }))
        .unwrap();

    world.spawn(1, "a").unwrap();
    world.step(0.0).unwrap();

    assert_eq!(*order.borrow(), vec!["first", "second"]);
}

#[test]
fn component_indices_follow_requirement_order() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("position", 8, 4)).unwrap();
    world.register_type(TypeDesc::new("velocity", 8, 4)).unwrap();

    // Requirement order is "velocity, position": index 0 is velocity even
    // though position was registered first.
    world
        .register_system(SystemDesc::new("integrate", "velocity, position", |ctx, dt| {
            let velocity = unsafe { *ctx.component_ref::<[f32; 2]>(0).unwrap() };
            let position = unsafe { ctx.component_mut::<[f32; 2]>(1).unwrap() };
            position[0] += velocity[0] * dt as f32;
            position[1] += velocity[1] * dt as f32;
        }))
        .unwrap();

    let entities = world.spawn(3, "position, velocity").unwrap().to_vec();
    for &entity in &entities {
        unsafe {
            *world.component_mut::<[f32; 2]>(entity, "velocity").unwrap() = [2.0, -1.0];
        }
    }

    world.run("integrate", 0.5).unwrap();
    world.run("integrate", 0.5).unwrap();

    for &entity in &entities {
        let position = unsafe { *world.component_ref::<[f32; 2]>(entity, "position").unwrap() };
        assert_eq!(position, [2.0, -1.0], "two half steps must equal one unit step");
    }
}

#[test]
fn context_reports_component_count_and_bounds() {
    let mut world = World::new();
    world.register_type(TypeDesc::new("a", 4, 4)).unwrap();
    world.register_type(TypeDesc::new("b", 4, 4)).unwrap();

    let checked = Rc::new(Cell::new(false));
    let flag = Rc::clone(&checked);
    world
        .register_system(SystemDesc::new("probe", "a, !b", move |ctx, _dt| {
            assert_eq!(ctx.component_count(), 1, "negative requirements take no index");
            assert!(ctx.component_ptr(0).is_some());
            assert!(ctx.component_ptr(1).is_none());
            flag.set(true);
        }))
        .unwrap();

    world.spawn(1, "a").unwrap();
    world.run("probe", 0.0).unwrap();

    assert!(checked.get(), "callback must have run");
}
