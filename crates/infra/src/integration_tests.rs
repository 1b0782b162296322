//! Integration tests for the full command pipeline.
//!
//! Tests: Command → Pipeline (log → invite → terminal) → EventStore → EventBus
//!
//! Verifies:
//! - Baseline outcomes per command variant
//! - Invite enrichment end-to-end (fresh account vs existing account)
//! - Fault propagation leaves the result slot unset
//! - Committed events reach the bus in stream order
//! - Optimistic concurrency conflicts are detected

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::Value as JsonValue;

    use quill_apps::{
        AppCommand, AppId, AppRole, AssignContributor, CommandOutcome, CreateApp, RemoveContributor,
    };
    use quill_commands::{CommandContext, CommandPipeline, PipelineError};
    use quill_core::{DomainError, ExpectedVersion};
    use quill_events::{EventBus, EventEnvelope, InMemoryEventBus};
    use quill_users::{InMemoryUserResolver, UserResolver};

    use crate::event_store::{EventStore, InMemoryEventStore};
    use crate::pipeline::app_command_pipeline;

    type Pipeline = CommandPipeline<AppCommand, CommandOutcome>;
    type Bus = InMemoryEventBus<EventEnvelope<JsonValue>>;

    fn setup() -> (
        Pipeline,
        Arc<InMemoryEventStore>,
        Arc<Bus>,
        Arc<InMemoryUserResolver>,
    ) {
        quill_observability::init();

        let store = Arc::new(InMemoryEventStore::new());
        let bus: Arc<Bus> = Arc::new(InMemoryEventBus::new());
        let users = Arc::new(InMemoryUserResolver::new());

        let pipeline = app_command_pipeline(store.clone(), bus.clone(), users.clone());

        (pipeline, store, bus, users)
    }

    fn create(app_id: AppId) -> AppCommand {
        AppCommand::Create(CreateApp {
            app_id,
            name: "blog".to_string(),
            occurred_at: Utc::now(),
        })
    }

    fn assign(app_id: AppId, contributor_id: &str, is_inviting: bool) -> AppCommand {
        AppCommand::AssignContributor(AssignContributor {
            app_id,
            contributor_id: contributor_id.to_string(),
            role: AppRole::Editor,
            is_inviting,
            occurred_at: Utc::now(),
        })
    }

    #[tokio::test]
    async fn create_app_produces_a_created_outcome() {
        let (pipeline, _store, _bus, _users) = setup();
        let app_id = AppId::new();

        let ctx = pipeline.publish(create(app_id)).await.unwrap();

        assert_eq!(
            ctx.into_result(),
            Some(CommandOutcome::Created {
                id: app_id.to_string(),
                version: 1,
            })
        );
    }

    #[tokio::test]
    async fn inviting_an_unknown_email_yields_an_invited_outcome() {
        let (pipeline, _store, _bus, users) = setup();
        let app_id = AppId::new();
        pipeline.publish(create(app_id)).await.unwrap();

        let ctx = pipeline
            .publish(assign(app_id, "alice@example.com", true))
            .await
            .unwrap();

        assert_eq!(
            ctx.into_result(),
            Some(CommandOutcome::Invited {
                id: "alice@example.com".to_string(),
                version: 2,
            })
        );

        // The account was provisioned on the way in.
        let account = users.find_by_email("alice@example.com").await.unwrap();
        assert!(account.is_some());
    }

    #[tokio::test]
    async fn inviting_an_already_registered_email_keeps_the_created_outcome() {
        let (pipeline, _store, _bus, users) = setup();
        let app_id = AppId::new();
        pipeline.publish(create(app_id)).await.unwrap();
        users.seed("alice@example.com").unwrap();

        let ctx = pipeline
            .publish(assign(app_id, "alice@example.com", true))
            .await
            .unwrap();

        assert_eq!(
            ctx.into_result(),
            Some(CommandOutcome::Created {
                id: "alice@example.com".to_string(),
                version: 2,
            })
        );
    }

    #[tokio::test]
    async fn assigning_by_user_id_never_provisions_an_account() {
        let (pipeline, _store, _bus, users) = setup();
        let app_id = AppId::new();
        pipeline.publish(create(app_id)).await.unwrap();

        let ctx = pipeline
            .publish(assign(app_id, "user-123", true))
            .await
            .unwrap();

        assert_eq!(
            ctx.into_result(),
            Some(CommandOutcome::Created {
                id: "user-123".to_string(),
                version: 2,
            })
        );
        // No email, no resolution: the store of accounts stays empty.
        assert!(users.find_by_email("user-123@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removing_a_contributor_commits_without_creating() {
        let (pipeline, _store, _bus, _users) = setup();
        let app_id = AppId::new();
        pipeline.publish(create(app_id)).await.unwrap();
        pipeline
            .publish(assign(app_id, "alice@example.com", false))
            .await
            .unwrap();

        let ctx = pipeline
            .publish(AppCommand::RemoveContributor(RemoveContributor {
                app_id,
                contributor_id: "alice@example.com".to_string(),
                occurred_at: Utc::now(),
            }))
            .await
            .unwrap();

        assert_eq!(ctx.into_result(), Some(CommandOutcome::Committed { version: 3 }));
    }

    #[tokio::test]
    async fn domain_fault_propagates_and_leaves_the_result_unset() {
        let (pipeline, _store, _bus, _users) = setup();
        let app_id = AppId::new();

        // Assigning on an app that was never created.
        let mut ctx = CommandContext::new(assign(app_id, "alice@example.com", true));
        let outcome = pipeline.execute(&mut ctx).await;

        assert!(matches!(
            outcome,
            Err(PipelineError::Domain(DomainError::NotFound))
        ));
        assert!(ctx.result().is_none());
    }

    #[tokio::test]
    async fn committed_events_reach_the_bus_in_stream_order() {
        let (pipeline, _store, bus, _users) = setup();
        let subscription = bus.subscribe();
        let app_id = AppId::new();

        pipeline.publish(create(app_id)).await.unwrap();
        pipeline
            .publish(assign(app_id, "alice@example.com", true))
            .await
            .unwrap();

        let first = subscription.try_recv().unwrap();
        let second = subscription.try_recv().unwrap();

        assert_eq!(first.aggregate_id(), app_id.into());
        assert_eq!(first.sequence_number(), 1);
        assert_eq!(second.sequence_number(), 2);
        assert!(subscription.try_recv().is_err());
    }

    #[tokio::test]
    async fn stale_appends_are_rejected_by_the_store() {
        let (pipeline, store, _bus, _users) = setup();
        let app_id = AppId::new();
        pipeline.publish(create(app_id)).await.unwrap();

        // A writer holding a stale version (0) must lose against the
        // committed stream (version 1).
        let stream = store.load_stream(app_id.into()).unwrap();
        let stale = crate::event_store::UncommittedEvent {
            event_id: uuid::Uuid::now_v7(),
            aggregate_id: app_id.into(),
            aggregate_type: stream[0].aggregate_type.clone(),
            event_type: stream[0].event_type.clone(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: stream[0].payload.clone(),
        };

        let result = store.append(vec![stale], ExpectedVersion::Exact(0));
        assert!(matches!(
            result,
            Err(crate::event_store::EventStoreError::Concurrency(_))
        ));
    }
}
