use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pawsim_core::prelude::*;
use pawsim_logic::config::SimConfig;
use pawsim_logic::surface::Collider;
use pawsim_logic::world::InteractableKind;

fn crowded_room(pets: usize) -> PetSimulation {
    let config = SimConfig {
        seed: Some(42),
        ..SimConfig::default()
    };
    let mut sim = PetSimulation::new(config).expect("default surface builds");
    for i in 0..pets {
        let x = 1.0 + (i % 20) as f32;
        let y = 1.0 + (i / 20) as f32 * 2.0;
        sim.spawn_pet("cat", Vec2::new(x, y));
    }
    for i in 0..8 {
        sim.spawn_interactable(InteractableKind::CatTeaser, Vec2::new(2.5 * i as f32 + 2.0, 13.0));
    }
    for i in 0..4 {
        sim.place_furniture("crate", Vec2::new(4.0 + 5.0 * i as f32, 9.0), Collider::Solid, None);
    }
    sim.build_surface_now();
    sim
}

fn bench_update(c: &mut Criterion) {
    let mut sim = crowded_room(50);
    c.bench_function("update 50 pets", |b| b.iter(|| sim.update(black_box(1.0 / 30.0))));
}

fn bench_rebuild(c: &mut Criterion) {
    let mut sim = crowded_room(10);
    c.bench_function("surface rebuild", |b| b.iter(|| sim.build_surface_now()));
}

criterion_group!(benches, bench_update, bench_rebuild);
criterion_main!(benches);
