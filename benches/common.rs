#![allow(dead_code)]

use strata::{SystemDesc, TypeDesc, World};

pub const AGENTS_SMALL: usize = 100_000;
pub const AGENTS_MED: usize = 1_000_000;

pub fn make_world() -> World {
    let mut world = World::new();
    world.register_type(TypeDesc::new("position", 8, 4)).unwrap();
    world.register_type(TypeDesc::new("wealth", 4, 4)).unwrap();
    world.register_type(TypeDesc::new("productivity", 4, 4)).unwrap();
    world
}

pub fn populate(world: &mut World, agent_count: usize) {
    world
        .spawn(agent_count, "position, wealth, productivity")
        .unwrap();
}

pub fn add_accrue_system(world: &mut World) {
    world
        .register_system(SystemDesc::new("accrue", "wealth, productivity", |ctx, dt| {
            let rate = unsafe { *ctx.component_ref::<f32>(1).unwrap() };
            let wealth = unsafe { ctx.component_mut::<f32>(0).unwrap() };
            *wealth += rate * dt as f32;
        }))
        .unwrap();
}
