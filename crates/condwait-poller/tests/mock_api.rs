// SPDX-License-Identifier: GPL-3.0-or-later

//! Waits driven by a mocked HTTP API: a background "component" loads a todo
//! list from the mock server and the test waits for its state to change.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use condwait_poller::{ConditionPoller, PollError, PollOptions};
use serde::Deserialize;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Deserialize)]
struct Todo {
    #[allow(dead_code)]
    id: u32,
    text: String,
}

#[derive(Debug, Default)]
struct TodoList {
    items: Vec<Todo>,
    error: Option<String>,
}

/// Fetch todos in the background, like a component mounted against the API.
fn mount_todo_list(base_url: String) -> Arc<Mutex<TodoList>> {
    let state = Arc::new(Mutex::new(TodoList::default()));
    let shared = state.clone();
    tokio::spawn(async move {
        let result = async {
            reqwest::get(format!("{base_url}/api/todos"))
                .await?
                .error_for_status()?
                .json::<Vec<Todo>>()
                .await
        }
        .await;

        let mut list = shared.lock().unwrap();
        match result {
            Ok(todos) => list.items = todos,
            Err(err) => list.error = Some(err.to_string()),
        }
    });
    state
}

fn todos_body() -> serde_json::Value {
    serde_json::json!([
        { "id": 1, "text": "Buy groceries" },
        { "id": 2, "text": "Walk the dog" }
    ])
}

fn poller() -> ConditionPoller {
    ConditionPoller::new(
        PollOptions::new(Duration::from_millis(20)).with_timeout(Duration::from_secs(5)),
    )
}

#[tokio::test]
async fn test_waits_for_todos_loaded_from_mock_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(todos_body())
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let list = mount_todo_list(server.uri());
    assert!(list.lock().unwrap().items.is_empty());

    poller()
        .await_condition(|| list.lock().unwrap().items.len() == 2)
        .await
        .expect("todos rendered");

    let list = list.lock().unwrap();
    assert_eq!(list.items[0].text, "Buy groceries");
    assert_eq!(list.items[1].text, "Walk the dog");
}

#[tokio::test]
async fn test_server_error_surfaces_as_predicate_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database offline"))
        .mount(&server)
        .await;

    let list = mount_todo_list(server.uri());

    let err = poller()
        .try_await_condition(|| {
            let list = list.lock().unwrap();
            match &list.error {
                Some(error) => Err(format!("todo list failed to load: {error}")),
                None => Ok(list.items.len() == 2),
            }
        })
        .await
        .expect_err("load fails");

    match err {
        PollError::Predicate { source, .. } => {
            assert!(source.to_string().contains("500"), "got {source}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_times_out_when_list_never_fills() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&server)
        .await;

    let list = mount_todo_list(server.uri());

    let err = ConditionPoller::new(
        PollOptions::new(Duration::from_millis(20)).with_timeout(Duration::from_millis(300)),
    )
    .await_condition(|| list.lock().unwrap().items.len() == 2)
    .await
    .expect_err("never two items");

    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_async_predicate_waits_for_received_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(todos_body()))
        .mount(&server)
        .await;

    let first = mount_todo_list(server.uri());
    let second = mount_todo_list(server.uri());

    let server = &server;
    poller()
        .await_condition_async(move || async move {
            let received = server
                .received_requests()
                .await
                .ok_or("request recording disabled")?;
            Ok::<_, &str>(received.len() >= 2)
        })
        .await
        .expect("both components fetched");

    poller()
        .await_condition(|| {
            first.lock().unwrap().items.len() == 2 && second.lock().unwrap().items.len() == 2
        })
        .await
        .expect("both lists rendered");
}

#[tokio::test]
async fn test_readiness_probe_retries_until_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = reqwest::Client::new();
    let url = format!("{}/health", server.uri());
    ConditionPoller::new(
        PollOptions::new(Duration::from_millis(20))
            .with_timeout(Duration::from_secs(5))
            .immediate(),
    )
    .await_condition_async(|| {
        let request = client.get(&url).send();
        async move { Ok::<_, reqwest::Error>(request.await?.status().is_success()) }
    })
    .await
    .expect("server becomes healthy");

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_spawned_wait_cancelled_on_teardown() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/todos"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(todos_body())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let list = mount_todo_list(server.uri());
    let observed = list.clone();
    let handle = poller().spawn(move || {
        Ok::<_, std::convert::Infallible>(observed.lock().unwrap().items.len() == 2)
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(handle.cancel());
    let evaluations = handle.evaluations();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(handle.evaluations(), evaluations);
    assert!(handle.wait().await.unwrap_err().is_cancelled());
}
