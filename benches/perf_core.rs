use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orgpulse::api::{INSTAGRAM_ANALYSIS, STRATEGY};
use orgpulse::loader::TabLoader;
use orgpulse::reconcile::{reconcile, NormalizedResult};
use orgpulse::session::{MemoryStore, SessionContext};
use orgpulse::ui::{self, App, DetailData, ResultSlotKind, Screen};
use ratatui::backend::TestBackend;
use ratatui::Terminal;
use serde_json::{json, Value};

fn embedded_strategy(filler_words: usize) -> Value {
    let filler = "lorem ipsum ".repeat(filler_words);
    json!({
        "error": "parse_failed",
        "raw_strategy": format!(
            "{filler}\n```json\n{{\"title\": \"Grow\", \"summary\": \"s\", \"goals\": [\"a\", \"b\"], \"tactics\": [], \"kpis\": [],}}\n```\n{filler}"
        )
    })
}

fn bench_reconcile(c: &mut Criterion) {
    let direct = json!({
        "summary": "Strong visual identity",
        "engagement_rate": 3.4,
        "audience": {"age": "18-24"},
        "content_themes": ["travel", "food"],
        "top_posts": [],
        "recommendations": ["post more reels"]
    });
    c.bench_function("reconcile_direct", |b| {
        b.iter(|| black_box(reconcile(black_box(direct.clone()), &INSTAGRAM_ANALYSIS)));
    });

    let embedded = embedded_strategy(2_000);
    c.bench_function("reconcile_embedded_block", |b| {
        b.iter(|| black_box(reconcile(black_box(embedded.clone()), &STRATEGY)));
    });

    let unrecoverable = json!({"error": "parse_failed", "raw_strategy": "no json here ".repeat(2_000)});
    c.bench_function("reconcile_fallback", |b| {
        b.iter(|| black_box(reconcile(black_box(unrecoverable.clone()), &STRATEGY)));
    });
}

fn bench_render_frame(c: &mut Criterion) {
    let loader = TabLoader::new("").with_tab("Projects", |_org: &str| async {
        Ok::<_, String>(DetailData::Projects(Vec::new()))
    });
    let mut app = App::new(
        loader,
        SessionContext::default(),
        Box::new(MemoryStore::new()),
        "bench",
    );
    app.screen = Screen::Analyzers;
    app.set_analyzer_target("acme".to_string());
    if let Some(job) = app.start_analysis(ResultSlotKind::Strategy) {
        let result: NormalizedResult = reconcile(embedded_strategy(50), &STRATEGY);
        app.apply_analysis(job.panel, job.slot, job.request_id, Ok(result));
    }

    let backend = TestBackend::new(140, 42);
    let mut terminal = Terminal::new(backend).expect("terminal should initialize");

    c.bench_function("render_frame_analyzers", |b| {
        b.iter(|| {
            terminal
                .draw(|frame| ui::render(frame, &app))
                .expect("draw should succeed");
        });
    });
}

criterion_group!(perf_core, bench_reconcile, bench_render_frame);
criterion_main!(perf_core);
