use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

pub async fn get_tcp_listener(host: IpAddr, port: u16) -> io::Result<TcpListener> {
    let address: SocketAddr = SocketAddr::new(host, port);
    let listener: TcpListener = TcpListener::bind(address).await?;
    info!("Listening to connections on {address}...");
    Ok(listener)
}

/// Accept connections forever, handing each one to `stream_handler` on its own task.
pub async fn run<F, Fut>(listener: TcpListener, stream_handler: F)
where
    F: Fn(TcpStream, SocketAddr) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                tokio::spawn(stream_handler(stream, addr));
            }
            Err(err) => warn!("Incoming TCP connection errored... {err:?}"),
        }
    }
}
