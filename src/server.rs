//! The connection-accepting loop: binds a listener and drives each accepted
//! connection through a dedicated [`ProtocolEngine`] (spec.md §5: "response(i)
//! fully written before any byte of request(i+1) is processed").

// ----------

use std::{
	convert::Infallible,
	io::Error as IoError,
	net::ToSocketAddrs,
	pin::pin,
	sync::Arc,
	time::Duration,
};

use hyper::{body::Incoming, service::service_fn};
use hyper_util::{
	rt::{TokioExecutor, TokioIo},
	server::{conn::auto::Builder, graceful::GracefulShutdown},
};
use tokio::{net::TcpListener, sync::Mutex as AsyncMutex};

#[cfg(feature = "tls")]
use tokio_rustls::{rustls::ServerConfig as TlsServerConfig, TlsAcceptor};

use crate::{config::GatewayConfig, engine::ProtocolEngine, page::PageRegistry, rest::MethodRegistry};

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// A high-level server type binding the gateway's registries to a listener.
///
/// One [`ProtocolEngine`] is created per accepted connection and never shared
/// across connections (spec.md §5's per-connection state): HTTP/1.1
/// keep-alive requests on the same connection are processed one at a time
/// through the same engine, matching the sequential-processing guarantee.
pub struct GatewayServer {
	connection_builder: Builder<TokioExecutor>,
	some_shutdown_duration: Option<Duration>,
	config: Arc<GatewayConfig>,
	pages: Arc<PageRegistry>,
	rest: Option<Arc<MethodRegistry>>,
}

impl GatewayServer {
	pub fn new(config: GatewayConfig, pages: PageRegistry, rest: Option<MethodRegistry>) -> Self {
		Self {
			connection_builder: Builder::new(TokioExecutor::new()),
			some_shutdown_duration: None,
			config: Arc::new(config),
			pages: Arc::new(pages),
			rest: rest.map(Arc::new),
		}
	}

	/// Sets the graceful shutdown duration. By default the server shuts down immediately.
	pub fn with_graceful_shutdown_duration(mut self, duration: Duration) -> Self {
		self.some_shutdown_duration = Some(duration);

		self
	}

	/// Serves HTTP connections on the first successfully bound listener address.
	///
	/// # Panics
	/// - if there is no valid address with an unused port to bind `TcpListener`
	/// - on Unix systems if getting a signal listener to listen to `SIGTERM` has failed
	pub async fn serve<A: ToSocketAddrs>(&self, listener_addresses: A) -> Result<(), ServerError> {
		#[cfg(not(feature = "tls"))]
		return self.serve_inner(listener_addresses).await;

		#[cfg(feature = "tls")]
		self.serve_inner(listener_addresses, None).await
	}

	/// Serves HTTPS connections on the first successfully bound listener address.
	#[cfg(feature = "tls")]
	pub async fn serve_with_tls<A: ToSocketAddrs>(
		&self,
		listener_addresses: A,
		tls_server_config: TlsServerConfig,
	) -> Result<(), ServerError> {
		self.serve_inner(listener_addresses, Some(tls_server_config)).await
	}

	async fn serve_inner<A: ToSocketAddrs>(
		&self,
		listener_addresses: A,
		#[cfg(feature = "tls")] some_tls_server_config: Option<TlsServerConfig>,
	) -> Result<(), ServerError> {
		let mut addresses = listener_addresses.to_socket_addrs()?;
		let some_listener = loop {
			let Some(address) = addresses.next() else {
				panic!("no valid address with an unbound port given");
			};

			if let Ok(listener) = TcpListener::bind(address).await {
				break Some(listener);
			}
		};

		let Some(listener) = some_listener else {
			panic!("no valid address with an unbound port given");
		};

		let mut accept_error_count = 0;
		let mut pinned_ctrl_c = pin!(tokio::signal::ctrl_c());

		#[cfg(unix)]
		let mut signal = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
			.expect("couldn't get the unix signal listener");

		#[cfg(unix)]
		let mut pinned_terminate = pin!(signal.recv());

		#[cfg(not(unix))]
		let mut pinned_terminate = pin!(std::future::pending::<()>());

		#[cfg(feature = "tls")]
		let some_tls_acceptor = some_tls_server_config.map(|config| TlsAcceptor::from(Arc::new(config)));

		let graceful_shutdown_watcher = GracefulShutdown::new();

		loop {
			#[cfg(feature = "tls")]
			let some_tls_acceptor_clone = some_tls_acceptor.clone();

			tokio::select! {
				connection = listener.accept() => {
					match connection {
						Ok((stream, peer_address)) => {
							let engine = Arc::new(AsyncMutex::new(ProtocolEngine::activate(
								self.config.clone(),
								self.pages.clone(),
								self.rest.clone(),
								Some(peer_address),
							)));

							let service = service_fn(move |request: hyper::Request<Incoming>| {
								let engine = engine.clone();

								async move {
									let (head, body) = request.into_parts();
									let mut engine = engine.lock().await;
									let response = engine.handle(head, body).await;

									Ok::<_, Infallible>(response)
								}
							});

							#[cfg(feature = "tls")]
							if let Some(tls_acceptor) = some_tls_acceptor_clone {
								let stream = match tls_acceptor.accept(stream).await {
									Ok(stream) => stream,
									Err(_) => continue,
								};

								let connection = self
									.connection_builder
									.serve_connection_with_upgrades(TokioIo::new(stream), service);
								let connection = graceful_shutdown_watcher.watch(connection.into_owned());

								tokio::spawn(connection);

								continue;
							}

							let connection = self
								.connection_builder
								.serve_connection_with_upgrades(TokioIo::new(stream), service);
							let connection = graceful_shutdown_watcher.watch(connection.into_owned());

							tokio::spawn(connection);
						}
						Err(error) => {
							tokio::time::sleep(Duration::from_secs(1)).await;

							if accept_error_count < 3 {
								accept_error_count += 1;

								continue;
							}

							return Err(ServerError::from(error));
						}
					}
				},
				_ = pinned_ctrl_c.as_mut() => break,
				_ = pinned_terminate.as_mut() => break,
			}
		}

		if let Some(duration) = self.some_shutdown_duration {
			tokio::select! {
				_ = graceful_shutdown_watcher.shutdown() => {},
				_ = tokio::time::sleep(duration) => {},
			}
		}

		Ok(())
	}
}

// --------------------------------------------------------------------------------
// --------------------------------------------------------------------------------

/// An error type of server failures.
#[derive(Debug, crate::ImplError)]
#[error(transparent)]
pub struct ServerError(#[from] IoError);
