use crate::correlator::ObservationLog;
use crate::dispatch::DispatchQueue;
use crate::error::Error;
use crate::handles::{self, Connection};
use crate::ledger::TicketLedger;
use crate::models::{io::Message, Camera, Observation, Ticket};
use crate::state::Role;
use crate::types::PlateNumber;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// How often to retry delivering every pending ticket. `None` only retries when a ticket is
    /// issued or a dispatcher registers.
    pub sweep_interval: Option<Duration>,
}

/// Shared state of the Speed Daemon. Each table has its own lock; when both are needed the
/// observation log is always locked before the ledger.
pub struct Application {
    config: Config,
    observations: Mutex<ObservationLog>,
    ledger: Mutex<TicketLedger>,
    dispatch: Mutex<DispatchQueue>,
}
impl Application {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            observations: Mutex::new(ObservationLog::default()),
            ledger: Mutex::new(TicketLedger::default()),
            dispatch: Mutex::new(DispatchQueue::default()),
        }
    }

    pub async fn run(self: Arc<Self>, listener: TcpListener) {
        if let Some(period) = self.config.sweep_interval {
            tokio::spawn(self.clone().sweep(period));
        }
        common::run(listener, move |stream, addr| self.clone().handle_connection(stream, addr)).await
    }

    /// Per-connection entry point; returns once the connection is closed.
    pub async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) {
        let id = Uuid::new_v4();
        let span = info_span!("connection", %id, %addr);
        handles::connection(self, id, stream).instrument(span).await
    }

    pub(crate) async fn handle_message(&self, connection: &mut Connection, message: Message) -> Result<(), Error> {
        debug!("{message:?}");
        match message {
            Message::Plate { plate, timestamp } => {
                let camera = *connection.state.camera()?;
                let observation = Observation {
                    camera: connection.id,
                    mile: camera.mile,
                    timestamp,
                };
                if let Some(ticket) = self.observe(&camera, plate, observation).await {
                    self.issue_ticket(ticket).await;
                }
            }

            Message::WantHeartbeat(deciseconds) => {
                connection.state.want_heartbeat(deciseconds)?;
                connection.heartbeat = handles::heartbeat(deciseconds, connection.outbox.clone());
            }

            Message::IAmCamera(camera) => {
                connection.state.identify_as_camera(camera)?;
                info!(road = camera.road, mile = camera.mile, limit = camera.limit, "Camera identified");
            }

            Message::IAmDispatcher(dispatcher) => {
                connection.state.identify_as_dispatcher(dispatcher.clone())?;
                self.dispatch
                    .lock()
                    .await
                    .register(connection.id, dispatcher, connection.outbox.clone());
            }

            Message::Error(_) | Message::Ticket(_) | Message::Heartbeat => {
                return Err(Error::protocol(format!(
                    "illegal message type 0x{:02x}",
                    message.message_type()
                )));
            }
        }
        Ok(())
    }

    /// Records a sighting; the dedup check, ticket creation and day claims happen under both locks.
    async fn observe(&self, camera: &Camera, plate: PlateNumber, observation: Observation) -> Option<Ticket> {
        let mut observations = self.observations.lock().await;
        let mut ledger = self.ledger.lock().await;
        observations.record(camera, plate, observation, &mut ledger)
    }

    async fn issue_ticket(&self, ticket: Ticket) {
        info!(
            plate = %ticket.plate,
            road = ticket.road,
            speed = ticket.speed,
            "Issuing ticket"
        );
        self.dispatch.lock().await.issue(ticket);
    }

    pub(crate) async fn requeue(&self, tickets: Vec<Ticket>) {
        self.dispatch.lock().await.requeue(tickets);
    }

    /// Forgets the connection's registrations. Its sightings and tickets stay.
    pub(crate) async fn disconnect(&self, connection: &Connection) {
        if let Role::Dispatcher(_) = connection.state.role() {
            self.dispatch.lock().await.unregister(&connection.id);
        }
    }

    async fn sweep(self: Arc<Self>, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        loop {
            interval.tick().await;
            let delivered = self.dispatch.lock().await.sweep();
            if delivered > 0 {
                info!(delivered, "Sweep delivered pending tickets");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RoleViolation;
    use crate::models::Dispatcher;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn application() -> Application {
        Application::new(Config::default())
    }

    fn connection() -> (Connection, UnboundedReceiver<Message>) {
        let (outbox, inbox) = unbounded_channel();
        (Connection::new(Uuid::new_v4(), outbox), inbox)
    }

    fn camera(road: u16, mile: u16, limit: u16) -> Message {
        Message::IAmCamera(Camera { road, mile, limit })
    }

    fn plate(plate: &str, timestamp: u32) -> Message {
        Message::Plate {
            plate: plate.to_string(),
            timestamp,
        }
    }

    fn dispatcher(roads: Vec<u16>) -> Message {
        Message::IAmDispatcher(Dispatcher { roads })
    }

    fn un1x() -> Message {
        Message::Ticket(Ticket {
            plate: "UN1X".to_string(),
            road: 66,
            mile1: 8,
            timestamp1: 0,
            mile2: 9,
            timestamp2: 45,
            speed: 8000,
        })
    }

    #[tokio::test]
    async fn test_late_dispatcher_receives_ticket() {
        let app = application();
        let (mut first, _) = connection();
        let (mut second, _) = connection();
        let (mut desk, mut desk_inbox) = connection();

        app.handle_message(&mut first, camera(66, 8, 60)).await.expect("camera");
        app.handle_message(&mut second, camera(66, 9, 60)).await.expect("camera");
        app.handle_message(&mut second, plate("UN1X", 45)).await.expect("plate");
        app.handle_message(&mut first, plate("UN1X", 0)).await.expect("plate");
        assert_eq!(1, app.dispatch.lock().await.pending().count());

        app.handle_message(&mut desk, dispatcher(vec![66])).await.expect("dispatcher");
        assert_eq!(Ok(un1x()), desk_inbox.try_recv());
        assert!(desk_inbox.try_recv().is_err());
        assert_eq!(0, app.dispatch.lock().await.pending().count());
    }

    #[tokio::test]
    async fn test_connected_dispatcher_receives_ticket() {
        let app = application();
        let (mut first, _) = connection();
        let (mut second, _) = connection();
        let (mut desk, mut desk_inbox) = connection();

        app.handle_message(&mut desk, dispatcher(vec![1, 66])).await.expect("dispatcher");
        app.handle_message(&mut first, camera(66, 8, 60)).await.expect("camera");
        app.handle_message(&mut second, camera(66, 9, 60)).await.expect("camera");
        app.handle_message(&mut first, plate("UN1X", 0)).await.expect("plate");
        assert!(desk_inbox.try_recv().is_err());
        app.handle_message(&mut second, plate("UN1X", 45)).await.expect("plate");
        assert_eq!(Ok(un1x()), desk_inbox.try_recv());
    }

    #[tokio::test]
    async fn test_disconnected_dispatcher_no_longer_served() {
        let app = application();
        let (mut first, _) = connection();
        let (mut second, _) = connection();
        let (mut desk, _desk_inbox) = connection();

        app.handle_message(&mut desk, dispatcher(vec![66])).await.expect("dispatcher");
        app.disconnect(&desk).await;

        app.handle_message(&mut first, camera(66, 8, 60)).await.expect("camera");
        app.handle_message(&mut second, camera(66, 9, 60)).await.expect("camera");
        app.handle_message(&mut first, plate("UN1X", 0)).await.expect("plate");
        app.handle_message(&mut second, plate("UN1X", 45)).await.expect("plate");
        assert_eq!(1, app.dispatch.lock().await.pending().count());
    }

    #[tokio::test]
    async fn test_role_violations() {
        let app = application();
        let (mut client, _) = connection();

        assert!(matches!(
            app.handle_message(&mut client, plate("UN1X", 0)).await,
            Err(Error::Role(RoleViolation::NotACamera))
        ));
        app.handle_message(&mut client, dispatcher(vec![66])).await.expect("dispatcher");
        assert!(matches!(
            app.handle_message(&mut client, camera(66, 8, 60)).await,
            Err(Error::Role(RoleViolation::AlreadyIdentified("dispatcher")))
        ));
        assert!(matches!(
            app.handle_message(&mut client, plate("UN1X", 0)).await,
            Err(Error::Role(RoleViolation::NotACamera))
        ));
    }

    #[tokio::test]
    async fn test_second_heartbeat_request() {
        let app = application();
        let (mut client, _) = connection();

        app.handle_message(&mut client, Message::WantHeartbeat(0)).await.expect("heartbeat");
        assert!(client.heartbeat.is_none());
        assert!(matches!(
            app.handle_message(&mut client, Message::WantHeartbeat(10)).await,
            Err(Error::Role(RoleViolation::AlreadyBeating))
        ));
    }

    #[tokio::test]
    async fn test_dispatcher_cannot_identify_twice() {
        let app = application();
        let (mut client, _) = connection();

        app.handle_message(&mut client, dispatcher(vec![66])).await.expect("dispatcher");
        assert!(matches!(
            app.handle_message(&mut client, dispatcher(vec![66])).await,
            Err(Error::Role(RoleViolation::AlreadyIdentified("dispatcher")))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_delivers_pending_tickets() {
        let app = Arc::new(Application::new(Config {
            sweep_interval: Some(Duration::from_secs(5)),
        }));
        let (mut desk, mut desk_inbox) = connection();
        app.handle_message(&mut desk, dispatcher(vec![66])).await.expect("dispatcher");

        // Put back by a writer that failed after the dispatcher registered, so only a sweep finds it.
        let Message::Ticket(ticket) = un1x() else {
            unreachable!();
        };
        app.requeue(vec![ticket]).await;
        assert!(desk_inbox.try_recv().is_err());

        let start = Instant::now();
        tokio::spawn(app.clone().sweep(Duration::from_secs(5)));
        assert_eq!(Some(un1x()), desk_inbox.recv().await);
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(0, app.dispatch.lock().await.pending().count());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_violations_ticketed_once() {
        let app = Arc::new(application());

        // Every pair of these cameras sees the car at 80 mph, all on day 0.
        let reports = (0..8u16)
            .map(|mile| {
                let app = app.clone();
                tokio::spawn(async move {
                    let (mut camera_connection, _inbox) = connection();
                    app.handle_message(&mut camera_connection, camera(66, mile, 60))
                        .await
                        .expect("camera");
                    app.handle_message(&mut camera_connection, plate("UN1X", u32::from(mile) * 45))
                        .await
                        .expect("plate");
                })
            })
            .collect::<Vec<_>>();
        for report in reports {
            report.await.expect("Reporting task panicked");
        }

        assert_eq!(1, app.dispatch.lock().await.pending().count());
        assert!(app.ledger.lock().await.is_day_claimed("UN1X", 0));
    }

    #[tokio::test]
    async fn test_server_message_from_client() {
        let app = application();
        let (mut client, _) = connection();

        assert!(matches!(
            app.handle_message(&mut client, Message::Heartbeat).await,
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            app.handle_message(&mut client, un1x()).await,
            Err(Error::Protocol(_))
        ));
    }
}
