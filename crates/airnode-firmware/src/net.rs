//! WiFi station, network stack and the metrics endpoint
//!
//! [`WEB_TASK_POOL_SIZE`] picoserve listeners accept connections in parallel.
//! The node itself stays owned by [`run_node`]: listeners hand each request
//! over through [`ask_node`] and wait for the answer, so a scrape arriving
//! while sensors are being read is delayed rather than refused.

use alloc::string::ToString;

use airnode_core::http::{self, Method, Request, Response};
use airnode_core::node::AirNode;
use airnode_core::sensors::{ClimateSensor, Co2Sensor, ParticulateSensor};
use airnode_core::ui::StatusDisplay;
use embassy_futures::select::{Either, select};
use embassy_net::{Runner, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal_async::delay::DelayNs;
use esp_radio::wifi::{
    ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiStaState,
};
use log::{debug, info, warn};
use picoserve::response::IntoResponse;

use crate::wifi_secrets::{WIFI_PASSWORD, WIFI_SSID};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Connections that can be open at the same time
pub const WEB_TASK_POOL_SIZE: usize = 2;

const SERVER_CONFIG: picoserve::Config<Duration> = picoserve::Config::new(picoserve::Timeouts {
    start_read_request: Some(Duration::from_secs(5)),
    persistent_start_read_request: Some(Duration::from_secs(1)),
    read_request: Some(Duration::from_secs(1)),
    write: Some(Duration::from_secs(1)),
});

/// Held by the listener whose request is with the node; the value numbers
/// the exchanges
static EXCHANGE: Mutex<CriticalSectionRawMutex, u32> = Mutex::new(0);
static REQUESTS: Channel<CriticalSectionRawMutex, (u32, Request), 1> = Channel::new();
static RESPONSES: Signal<CriticalSectionRawMutex, (u32, Response)> = Signal::new();

#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) -> ! {
    runner.run().await
}

/// Keep the station associated, reconnecting after every drop
#[embassy_executor::task]
pub async fn connection(mut controller: WifiController<'static>) {
    info!("Connecting to {}", WIFI_SSID);

    loop {
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            warn!("WiFi disconnected");
            Timer::after(RECONNECT_DELAY).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(WIFI_SSID.to_string())
                    .with_password(WIFI_PASSWORD.to_string()),
            );
            if let Err(e) = controller.set_config(&client_config) {
                warn!("Failed to configure WiFi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                warn!("Failed to start WiFi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            debug!("WiFi started");
        }

        match controller.connect_async().await {
            Ok(()) => info!("WiFi connected"),
            Err(e) => {
                warn!("Failed to connect to WiFi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
            }
        }
    }
}

/// Wait for DHCP and return the node's address
pub async fn wait_for_address(stack: Stack<'static>) -> embassy_net::Ipv4Address {
    stack.wait_config_up().await;

    loop {
        if let Some(config) = stack.config_v4() {
            return config.address.address();
        }
        Timer::after(Duration::from_millis(500)).await;
    }
}

/// Hand a request to the node task and wait for its answer.
///
/// A listener dropped mid-exchange (e.g. on a picoserve timeout) can leave a
/// late answer behind; exchange numbers keep it from reaching the next caller.
pub async fn ask_node(request: Request) -> Response {
    let mut exchange = EXCHANGE.lock().await;
    *exchange = exchange.wrapping_add(1);
    let id = *exchange;

    RESPONSES.reset();
    REQUESTS.send((id, request)).await;

    loop {
        let (answered, response) = RESPONSES.wait().await;
        if answered == id {
            return response;
        }
        debug!("Dropping stale answer to exchange {}", answered);
    }
}

/// Drive the node forever: run due scheduler tasks and answer requests from
/// the listeners in between
pub async fn run_node<P, C, T, D, S>(node: &mut AirNode<P, C, T, D, S>) -> !
where
    P: ParticulateSensor,
    C: Co2Sensor,
    T: ClimateSensor,
    D: DelayNs,
    S: StatusDisplay,
{
    loop {
        node.tick(Instant::now().as_millis()).await;

        let deadline = node
            .next_deadline()
            .map(Instant::from_millis)
            .unwrap_or(Instant::MAX);

        let woken = select(REQUESTS.receive(), Timer::at(deadline)).await;
        if let Either::First((id, request)) = woken {
            let response = node.handle_request(&request);
            RESPONSES.signal((id, response));
        }
    }
}

/// Accept and serve metrics connections on `port` forever
#[embassy_executor::task(pool_size = WEB_TASK_POOL_SIZE)]
pub async fn web_task(task_id: usize, stack: Stack<'static>, port: u16) -> ! {
    let mut tcp_rx_buffer = [0; 1024];
    let mut tcp_tx_buffer = [0; 2048];
    let mut http_buffer = [0; 2048];

    let app = picoserve::Router::from_service(NodeFallback)
        .route("/", picoserve::routing::get(metrics))
        .route("/metrics", picoserve::routing::get(metrics));

    info!("Web task {} listening on port {}", task_id, port);
    picoserve::listen_and_serve(
        task_id,
        &app,
        &SERVER_CONFIG,
        stack,
        port,
        &mut tcp_rx_buffer,
        &mut tcp_tx_buffer,
        &mut http_buffer,
    )
    .await
}

async fn metrics() -> NodeReply {
    NodeReply(ask_node(Request::get(http::METRICS_PATHS[1])).await)
}

/// Everything no route matched: the node answers with its 404 diagnostic
struct NodeFallback;

impl<State> picoserve::routing::RequestHandlerService<State> for NodeFallback {
    async fn call_request_handler_service<
        R: picoserve::io::Read,
        W: picoserve::response::ResponseWriter<Error = R::Error>,
    >(
        &self,
        _state: &State,
        _path_parameters: (),
        request: picoserve::request::Request<'_, R>,
        response_writer: W,
    ) -> Result<picoserve::ResponseSent, W::Error> {
        let parts = &request.parts;
        let mut node_request = Request::new(Method::from(parts.method()), parts.path().encoded());
        if let Some(query) = parts.query() {
            node_request = node_request.with_query(query.0);
        }

        let response = ask_node(node_request).await;
        let connection = request.body_connection.finalize().await?;

        NodeReply(response).write_to(connection, response_writer).await
    }
}

/// A node [`Response`] as picoserve writes it
struct NodeReply(Response);

impl IntoResponse for NodeReply {
    async fn write_to<
        R: picoserve::io::Read,
        W: picoserve::response::ResponseWriter<Error = R::Error>,
    >(
        self,
        connection: picoserve::response::Connection<'_, R>,
        response_writer: W,
    ) -> Result<picoserve::ResponseSent, W::Error> {
        let status = picoserve::response::StatusCode::new(self.0.status);
        picoserve::response::Response::new(status, NodeBody(self.0))
            .write_to(connection, response_writer)
            .await
    }
}

struct NodeBody(Response);

impl picoserve::response::Content for NodeBody {
    fn content_type(&self) -> &'static str {
        self.0.content_type
    }

    fn content_length(&self) -> usize {
        self.0.body.len()
    }

    async fn write_content<W: picoserve::io::Write>(self, mut writer: W) -> Result<(), W::Error> {
        writer.write_all(self.0.body.as_bytes()).await
    }
}
