use criterion::{Criterion, black_box, criterion_group, criterion_main};

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use quill_apps::{AppCommand, AppId, AppRole, AssignContributor, CommandOutcome, CreateApp};
use quill_commands::CommandPipeline;
use quill_events::{EventEnvelope, InMemoryEventBus};
use quill_infra::command_dispatcher::AppCommandHandler;
use quill_infra::event_store::InMemoryEventStore;
use quill_infra::pipeline::app_command_pipeline;
use quill_users::InMemoryUserResolver;

type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;
type Pipeline = CommandPipeline<AppCommand, CommandOutcome>;

fn create(app_id: AppId) -> AppCommand {
    AppCommand::Create(CreateApp {
        app_id,
        name: "bench".to_string(),
        occurred_at: Utc::now(),
    })
}

fn assign(app_id: AppId, contributor_id: &str) -> AppCommand {
    AppCommand::AssignContributor(AssignContributor {
        app_id,
        contributor_id: contributor_id.to_string(),
        role: AppRole::Editor,
        is_inviting: true,
        occurred_at: Utc::now(),
    })
}

/// Terminal handler only, no middleware: the floor the chain overhead is
/// measured against.
fn bare_pipeline() -> Pipeline {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
    CommandPipeline::new(Arc::new(AppCommandHandler::new(store, bus)))
}

fn default_pipeline() -> Pipeline {
    let store = Arc::new(InMemoryEventStore::new());
    let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
    let users = Arc::new(InMemoryUserResolver::new());
    app_command_pipeline(store, bus, users)
}

fn bench_create_app(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("create_app");

    group.bench_function("terminal_only", |b| {
        b.iter(|| {
            rt.block_on(async {
                let pipeline = bare_pipeline();
                let ctx = pipeline.publish(create(AppId::new())).await.unwrap();
                black_box(ctx.into_result())
            })
        })
    });

    group.bench_function("default_chain", |b| {
        b.iter(|| {
            rt.block_on(async {
                let pipeline = default_pipeline();
                let ctx = pipeline.publish(create(AppId::new())).await.unwrap();
                black_box(ctx.into_result())
            })
        })
    });

    group.finish();
}

fn bench_invite_assignment(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("tokio runtime");

    let mut group = c.benchmark_group("assign_contributor");

    // Chain overhead including user resolution and result rewriting.
    group.bench_function("invite_flow", |b| {
        b.iter(|| {
            rt.block_on(async {
                let pipeline = default_pipeline();
                let app_id = AppId::new();
                pipeline.publish(create(app_id)).await.unwrap();
                let ctx = pipeline
                    .publish(assign(app_id, "bench@example.com"))
                    .await
                    .unwrap();
                black_box(ctx.into_result())
            })
        })
    });

    group.bench_function("by_user_id", |b| {
        b.iter(|| {
            rt.block_on(async {
                let pipeline = default_pipeline();
                let app_id = AppId::new();
                pipeline.publish(create(app_id)).await.unwrap();
                let ctx = pipeline.publish(assign(app_id, "user-1")).await.unwrap();
                black_box(ctx.into_result())
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_create_app, bench_invite_assignment);
criterion_main!(benches);
