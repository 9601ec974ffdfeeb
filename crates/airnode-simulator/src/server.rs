//! warp front end for the metrics endpoint
//!
//! The node stays on the main task. Requests reach it through a
//! [`NodeHandle`] and are answered over a oneshot channel, so any number of
//! connections can be open while sensors are being read.

use airnode_core::http::{Method, Request, Response};
use log::warn;
use tokio::sync::{mpsc, oneshot};
use warp::Filter;
use warp::http::StatusCode;
use warp::path::FullPath;
use warp::reply::{WithHeader, WithStatus};

/// A request waiting for the node, with the channel its answer goes back on
pub struct NodeRequest {
    pub request: Request,
    pub reply: oneshot::Sender<Response>,
}

#[derive(Debug, Clone)]
pub struct NodeHandle {
    requests: mpsc::Sender<NodeRequest>,
}

impl NodeHandle {
    /// A handle and the receiving end the node loop drains. Up to `capacity`
    /// requests queue up before callers wait.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<NodeRequest>) {
        let (requests, receiver) = mpsc::channel(capacity);
        (Self { requests }, receiver)
    }

    /// Ask the node; a node that has gone away answers 503
    pub async fn ask(&self, request: Request) -> Response {
        let (reply, answer) = oneshot::channel();

        if self.requests.send(NodeRequest { request, reply }).await.is_err() {
            warn!("Node loop has stopped, cannot answer request");
            return Response::unavailable();
        }

        answer.await.unwrap_or_else(|_| Response::unavailable())
    }
}

/// `GET /` and `GET /metrics` serve the metrics document. Everything else is
/// handed to the node as is and gets its 404 diagnostic.
pub fn routes(
    node: NodeHandle,
) -> impl Filter<Extract = (WithStatus<WithHeader<String>>,), Error = std::convert::Infallible> + Clone {
    let with_node = warp::any().map(move || node.clone());

    let metrics = warp::get()
        .and(warp::path::end().or(warp::path!("metrics")).unify())
        .and(with_node.clone())
        .then(|node: NodeHandle| async move {
            into_reply(node.ask(Request::get("/metrics")).await)
        });

    let fallback = warp::method()
        .and(warp::path::full())
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and(with_node)
        .then(forward);

    metrics.or(fallback).unify()
}

async fn forward(
    method: warp::http::Method,
    path: FullPath,
    query: String,
    node: NodeHandle,
) -> WithStatus<WithHeader<String>> {
    let request = Request::new(Method::from(method.as_str()), path.as_str()).with_query(&query);
    into_reply(node.ask(request).await)
}

fn into_reply(response: Response) -> WithStatus<WithHeader<String>> {
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    warp::reply::with_status(
        warp::reply::with_header(response.body, "content-type", response.content_type),
        status,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use airnode_core::http::route;

    const METRICS: &str = "pm25{id=\"\",mac=\"\"} 12\n";

    /// Stand-in node loop answering with the real routing
    fn spawn_node() -> NodeHandle {
        let (node, mut requests) = NodeHandle::new(4);
        tokio::spawn(async move {
            while let Some(NodeRequest { request, reply }) = requests.recv().await {
                let _ = reply.send(route(&request, || METRICS.to_string()));
            }
        });
        node
    }

    #[tokio::test]
    async fn test_serves_metrics() {
        let routes = routes(spawn_node());

        for path in ["/", "/metrics"] {
            let response = warp::test::request().path(path).reply(&routes).await;

            assert_eq!(response.status(), 200);
            assert_eq!(response.headers()["content-type"], "text/plain");
            assert_eq!(response.body(), METRICS);
        }
    }

    #[tokio::test]
    async fn test_undecodable_query_still_serves_metrics() {
        let response = warp::test::request()
            .path("/metrics?x=%zz")
            .reply(&routes(spawn_node()))
            .await;

        assert_eq!(response.status(), 200);
        assert_eq!(response.body(), METRICS);
    }

    #[tokio::test]
    async fn test_unknown_path_gets_diagnostic() {
        let response = warp::test::request()
            .path("/nope?x=%zz")
            .reply(&routes(spawn_node()))
            .await;

        assert_eq!(response.status(), 404);
        assert_eq!(response.headers()["content-type"], "text/html");
        assert_eq!(
            response.body(),
            "File Not Found\n\nURI: /nope\nMethod: GET\nArguments: 1\n x: %zz\n"
        );
    }

    #[tokio::test]
    async fn test_other_methods_reach_the_node() {
        let routes = routes(spawn_node());

        let response = warp::test::request()
            .method("POST")
            .path("/metrics")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 200);

        let response = warp::test::request()
            .method("BREW")
            .path("/pot")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 404);
        assert!(std::str::from_utf8(response.body()).unwrap().contains("Method: BREW\n"));
    }

    #[tokio::test]
    async fn test_stopped_node_is_unavailable() {
        let (node, requests) = NodeHandle::new(1);
        drop(requests);

        let response = warp::test::request().path("/metrics").reply(&routes(node)).await;

        assert_eq!(response.status(), 503);
    }
}
