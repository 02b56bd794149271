//! End-to-end setup pipelines against the scripted transport.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use index_tasks::clock::ManualClock;
use index_tasks::pipeline::{IndexSetup, PipelineState, SetupPipeline};
use index_tasks::transport::{Mutation, ScriptedTransport, TaskScript};
use index_tasks::{
    CancellationToken, Error, Settings, TaskClient, TaskErrorPayload, TaskStatus, TransportError,
    WaitOptions,
};

fn client(transport: &Arc<ScriptedTransport>) -> TaskClient {
    TaskClient::new(transport.clone()).with_clock(Arc::new(ManualClock::new()))
}

fn movies() -> Vec<serde_json::Value> {
    vec![
        json!({ "id": "1", "title": "Carol", "genre": "romance" }),
        json!({ "id": "2", "title": "Wonder Woman", "genre": "action" }),
        json!({ "id": "3", "title": "Life of Pi", "genre": "adventure" }),
    ]
}

fn movies_pipeline() -> SetupPipeline {
    SetupPipeline::new()
        .step(Mutation::CreateIndex {
            uid: "movies".to_string(),
            primary_key: None,
        })
        .step(Mutation::AddDocuments {
            index_uid: "movies".to_string(),
            documents: movies(),
            primary_key: None,
        })
        .labeled_step(
            "set filterable attributes",
            Mutation::UpdateSettings {
                index_uid: "movies".to_string(),
                settings: Settings::new().with_filterable_attributes(["genre"]),
            },
        )
}

#[tokio::test]
async fn movies_setup_fails_on_settings_step() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_script(TaskScript::succeeds_after(2));
    transport.push_script(TaskScript::succeeds_after(1));
    transport.push_script(TaskScript::fails_after(
        1,
        TaskErrorPayload::new(
            "invalid_filterable_attribute",
            "Attribute `genre` is not filterable.",
        ),
    ));

    let failure = movies_pipeline()
        .run(&client(&transport), WaitOptions::default(), None)
        .await
        .unwrap_err();

    assert_eq!(failure.step, "set filterable attributes");
    assert_eq!(failure.step_index, 2);
    assert_eq!(failure.task_uid(), Some(2));
    assert_eq!(
        failure.remote_error().map(|e| e.code.as_str()),
        Some("invalid_filterable_attribute")
    );
    assert!(failure.to_string().contains("invalid_filterable_attribute"));
    assert_eq!(failure.completed.len(), 2);

    let submitted: Vec<&'static str> = transport
        .submissions()
        .iter()
        .map(|m| match m {
            Mutation::CreateIndex { .. } => "create",
            Mutation::AddDocuments { .. } => "documents",
            Mutation::UpdateSettings { .. } => "settings",
            Mutation::DeleteIndex { .. } => "delete",
        })
        .collect();
    assert_eq!(submitted, vec!["create", "documents", "settings"]);
    assert_eq!(transport.fetch_log(), vec![0, 0, 1, 2]);
}

#[tokio::test]
async fn failing_step_stops_later_submissions() {
    for failing in 0..4 {
        let transport = Arc::new(ScriptedTransport::new());
        for position in 0..4 {
            let script = if position == failing {
                TaskScript::fails_after(2, TaskErrorPayload::new("internal", "boom"))
            } else {
                TaskScript::succeeds_after(1)
            };
            transport.push_script(script);
        }

        let pipeline = (0..4).fold(SetupPipeline::new(), |pipeline, position| {
            pipeline.step(Mutation::DeleteIndex {
                uid: format!("index-{position}"),
            })
        });
        let failure = pipeline
            .run(&client(&transport), WaitOptions::default(), None)
            .await
            .unwrap_err();

        assert_eq!(failure.step_index, failing);
        assert_eq!(failure.step, format!("delete index 'index-{failing}'"));
        assert_eq!(transport.submissions().len(), failing + 1);
    }
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(2)]
#[tokio::test]
async fn rejected_submit_stops_at_that_step(#[case] failing: usize) {
    let transport = Arc::new(ScriptedTransport::new());
    let pipeline = (0..4).fold(SetupPipeline::new(), |pipeline, position| {
        pipeline.step(Mutation::DeleteIndex {
            uid: format!("index-{position}"),
        })
    });

    // Arm the failure right before step `failing` submits.
    let scripted = transport.clone();
    let failure = pipeline
        .run_observed(&client(&transport), WaitOptions::default(), None, |state| {
            if state == (PipelineState::Running { step: failing }) {
                scripted.fail_next_submit(TransportError::Unavailable("connection refused".into()));
            }
        })
        .await
        .unwrap_err();

    assert_eq!(failure.step_index, failing);
    assert!(matches!(failure.cause, Error::Transport(_)));
    assert_eq!(failure.task_uid(), None);
    assert_eq!(failure.completed.len(), failing);
    assert_eq!(transport.submissions().len(), failing);
}

#[tokio::test]
async fn all_steps_succeed_in_order() {
    let transport = Arc::new(ScriptedTransport::new());
    for polls in [3, 1, 2] {
        transport.push_script(TaskScript::succeeds_after(polls));
    }
    let mut states = Vec::new();

    let report = movies_pipeline()
        .run_observed(
            &client(&transport),
            WaitOptions::default(),
            None,
            |state| states.push(state),
        )
        .await
        .unwrap();

    assert_eq!(report.task_uids(), vec![0, 1, 2]);
    assert!(report
        .steps
        .iter()
        .all(|step| step.task.status == TaskStatus::Succeeded));
    assert_eq!(transport.submissions().len(), 3);
    // Each task is polled to completion before the next one is submitted.
    assert_eq!(transport.fetch_log(), vec![0, 0, 0, 1, 2, 2]);
    assert_eq!(
        states,
        vec![
            PipelineState::NotStarted,
            PipelineState::Running { step: 0 },
            PipelineState::Running { step: 1 },
            PipelineState::Running { step: 2 },
            PipelineState::Succeeded,
        ]
    );
}

#[tokio::test]
async fn canceled_remote_task_aborts() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.push_script(TaskScript::canceled_after(2));

    let failure = IndexSetup::empty("books", Some("isbn"))
        .run(&client(&transport), WaitOptions::default(), None)
        .await
        .unwrap_err();

    assert!(matches!(failure.cause, Error::TaskCanceled { task_uid: 0 }));
    assert!(failure.remote_error().is_none());
}

#[tokio::test]
async fn cancelled_token_aborts_before_polling() {
    let transport = Arc::new(ScriptedTransport::new());
    let token = CancellationToken::new();
    token.cancel();

    let failure = movies_pipeline()
        .run(&client(&transport), WaitOptions::default(), Some(&token))
        .await
        .unwrap_err();

    assert_eq!(failure.step_index, 0);
    assert!(matches!(failure.cause, Error::Cancelled { task_uid: 0 }));
    assert_eq!(transport.submissions().len(), 1);
    assert!(transport.fetch_log().is_empty());
}

#[tokio::test]
async fn faceting_recipe_runs_ingest_then_settings() {
    let transport = Arc::new(ScriptedTransport::new());
    let per_step = WaitOptions::new(Duration::from_millis(10), Duration::from_secs(1));

    let report = IndexSetup::faceting("movies", movies())
        .run(&client(&transport), per_step, None)
        .await
        .unwrap();

    assert_eq!(report.steps.len(), 2);
    assert!(matches!(
        transport.submissions()[1],
        Mutation::UpdateSettings { .. }
    ));
}

#[tokio::test]
async fn independent_pipelines_run_concurrently() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = client(&transport);

    let (books, movies) = tokio::join!(
        IndexSetup::empty("books", None).run(&client, WaitOptions::default(), None),
        IndexSetup::empty("movies", None).run(&client, WaitOptions::default(), None),
    );

    assert!(books.is_ok());
    assert!(movies.is_ok());
    assert_eq!(transport.submissions().len(), 2);
}
