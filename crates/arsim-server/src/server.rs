use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::session::Session;
use crate::{livereload, scheduler, watcher};

const CHANGE_QUEUE: usize = 16;

/// The dev server: API and app on one port, live reload on another, and a
/// watcher driving rebuilds.
pub struct ArsimServer {
    session: Arc<Session>,
    ignored: Vec<PathBuf>,
}

impl ArsimServer {
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            ignored: Vec::new(),
        }
    }

    /// Exclude a directory from change watching.
    pub fn ignoring(mut self, dir: impl Into<PathBuf>) -> Self {
        self.ignored.push(dir.into());
        self
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.session.clone())
    }

    pub fn app_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.session.config().port))
    }

    pub fn live_reload_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, self.session.config().live_reload_port))
    }

    /// Start watching, run the first build, and serve until a listener fails.
    pub async fn serve(self) -> ServerResult<()> {
        let root = self
            .session
            .entry()
            .parent()
            .map(PathBuf::from)
            .ok_or_else(|| ServerError::Config("entry has no parent directory".into()))?;

        let (changes, feed) = mpsc::channel(CHANGE_QUEUE);
        let _watcher = watcher::watch(&root, self.ignored.clone(), changes)?;
        tokio::spawn(scheduler::run(self.session.clone(), feed));

        let app_addr = self.app_addr();
        let reload_addr = self.live_reload_addr();
        let app_listener = TcpListener::bind(app_addr).await?;
        let reload_listener = TcpListener::bind(reload_addr).await?;
        info!(%app_addr, %reload_addr, "arsim dev server listening");

        let app = self.router();
        let reload = livereload::router(self.session.clone());
        tokio::try_join!(
            async { axum::serve(app_listener, app).await },
            async { axum::serve(reload_listener, reload).await },
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServeConfig;
    use crate::network::tests::StaticNetwork;
    use crate::session::tests::session_with;
    use std::path::Path;

    #[test]
    fn addresses_follow_config() {
        let config = ServeConfig {
            port: 4000,
            live_reload_port: 4001,
            ..ServeConfig::default()
        };
        let server = ArsimServer::new(Arc::new(session_with(config, StaticNetwork::new(), Path::new("index.html"))));
        assert_eq!(server.app_addr(), "127.0.0.1:4000".parse().unwrap());
        assert_eq!(server.live_reload_addr(), "127.0.0.1:4001".parse().unwrap());
    }

    #[test]
    fn router_builds() {
        let server = ArsimServer::new(Arc::new(session_with(
            ServeConfig::default(),
            StaticNetwork::new(),
            Path::new("index.html"),
        )))
        .ignoring(".arsim");
        assert_eq!(server.ignored, vec![PathBuf::from(".arsim")]);
        let _router = server.router();
    }
}
