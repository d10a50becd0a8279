use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use floorgrid::export::build_export_svg;
use floorgrid::geometry::Point;
use floorgrid::layout::{RenderTarget, compute_layout};
use floorgrid::plan::{FloorPlan, GridSpec, Obstacle, ObstacleKind};
use floorgrid::render::{ModalFrame, render_modal_svg, render_svg};
use floorgrid::theme::Theme;
use floorgrid::viewport::{ViewportController, ViewportEvent};
use std::hint::black_box;

/// A `side` x `side` floor tiled with 2x2 rooms on a 3-cell pitch.
fn tiled_plan(side: u32) -> FloorPlan {
    let mut obstacles = Vec::new();
    for row in (0..side.saturating_sub(2)).step_by(3) {
        for col in (0..side.saturating_sub(2)).step_by(3) {
            let id = format!("R{row}_{col}");
            obstacles.push(
                Obstacle::new(&id, ObstacleKind::Room, col as f32, row as f32, 2.0, 2.0)
                    .with_color("#FFF8E1")
                    .with_label(&format!("ROOM\n{row}-{col}")),
            );
        }
    }
    let grid = GridSpec {
        width_cells: side,
        height_cells: side,
        ..GridSpec::default()
    };
    FloorPlan::new("Tiled", grid, obstacles).expect("tiled plan is valid")
}

fn plan(name: &str) -> FloorPlan {
    match name {
        "builtin" => FloorPlan::builtin(),
        "tiled_30" => tiled_plan(30),
        "tiled_90" => tiled_plan(90),
        _ => panic!("unknown plan"),
    }
}

const PLANS: [&str; 3] = ["builtin", "tiled_30", "tiled_90"];

fn bench_layout(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout");
    let theme = Theme::classic();
    for name in PLANS {
        let plan = plan(name);
        for target in [RenderTarget::Modal, RenderTarget::Export] {
            group.bench_with_input(
                BenchmarkId::new(format!("{target:?}"), name),
                &plan,
                |b, plan| {
                    b.iter(|| {
                        let layout = compute_layout(black_box(plan), &theme, target);
                        black_box(layout.cells.len());
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("render");
    let theme = Theme::classic();
    for name in PLANS {
        let layout = compute_layout(&plan(name), &theme, RenderTarget::Inline);
        group.bench_with_input(BenchmarkId::from_parameter(name), &layout, |b, layout| {
            b.iter(|| {
                let svg = render_svg(black_box(layout), &theme);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

fn bench_modal_interaction(c: &mut Criterion) {
    let theme = Theme::classic();
    let layout = compute_layout(&FloorPlan::builtin(), &theme, RenderTarget::Modal);
    let frame = ModalFrame::new(1200.0, 800.0);
    c.bench_function("modal_drag_frame", |b| {
        let mut controller: ViewportController = ViewportController::default();
        controller.open();
        controller.handle(ViewportEvent::PointerDown {
            position: Point::new(600.0, 400.0),
            button: Default::default(),
        });
        let mut step = 0.0f32;
        b.iter(|| {
            step = (step + 1.0) % 200.0;
            controller.handle(ViewportEvent::PointerMove {
                position: Point::new(600.0 + step, 400.0 - step),
            });
            let transform = controller.transform().expect("controller is open");
            let svg = render_modal_svg(&layout, &theme, &transform, frame);
            black_box(svg.len());
        });
    });
}

fn bench_export_svg(c: &mut Criterion) {
    let mut group = c.benchmark_group("export_svg");
    let theme = Theme::classic();
    for name in PLANS {
        let plan = plan(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &plan, |b, plan| {
            b.iter(|| {
                let svg = build_export_svg(black_box(plan), &theme);
                black_box(svg.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_layout,
    bench_render,
    bench_modal_interaction,
    bench_export_svg
);
criterion_main!(benches);
