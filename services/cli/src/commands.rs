//! Subcommand handlers

use anyhow::{Context, Result, anyhow, bail};
use api::{ApiClient, HistoryQuery, SystemDeviceInfo};
use chrono::Utc;
use common::{ClientConfig, Session, SessionStore};
use scanner::{
    FrameSequence, NativeScanner, ScanAdapter, ScanTarget, Scanner, ScannerKind, ZbarPlugin,
    native_available, scan_once,
};
use std::io::{BufRead, IsTerminal, Write};
use std::sync::Arc;
use tracing::{info, warn};

use crate::args::{
    Command, HistoryArgs, HistoryCommand, ScanArgs, SessionCommand, UsersCommand,
};
use crate::render;

/// Loaded configuration plus the persisted session
pub struct App {
    config: ClientConfig,
    store: SessionStore,
    session: Session,
}

impl App {
    pub fn new(config: ClientConfig, store: SessionStore, session: Session) -> Self {
        Self {
            config,
            store,
            session,
        }
    }

    pub async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Session(command) => self.session_command(command).await,
            Command::Users(command) => self.users_command(command).await,
            Command::Signin { payload, user } => {
                let user_id = self.submitting_user(user)?;
                self.submit(&payload, &user_id).await
            }
            Command::Scan(args) => self.scan(args).await,
            Command::History(command) => self.history(command).await,
        }
    }

    fn client(&self) -> Result<ApiClient> {
        let device = Arc::new(SystemDeviceInfo::new("signin", env!("CARGO_PKG_VERSION")));
        let client = match self.config.request_timeout() {
            Some(timeout) => ApiClient::with_timeout(self.session.clone(), device, timeout)
                .context("failed to build HTTP client")?,
            None => ApiClient::new(self.session.clone(), device),
        };
        Ok(client)
    }

    async fn persist(&self) -> Result<()> {
        self.store
            .save(&self.session)
            .await
            .context("failed to save session")
    }

    /// User submitting a scan; checked before any request goes out
    fn submitting_user(&self, explicit: Option<String>) -> Result<String> {
        let user_id = explicit.unwrap_or_else(|| self.session.user_id());
        if user_id.is_empty() {
            bail!("No user selected. Run `signin session user <id>` or pass --user.");
        }
        Ok(user_id)
    }

    async fn session_command(&self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Show => {
                print!("{}", render::session(&self.session.snapshot()));
                return Ok(());
            }
            SessionCommand::Endpoint { url } => {
                self.session.set_api_endpoint(url.as_str());
                println!("Endpoint set to {}", self.session.api_endpoint());
            }
            SessionCommand::ClearEndpoint => {
                self.session.clear_api_endpoint();
                println!("Endpoint cleared");
            }
            SessionCommand::User { id, name } => {
                let name = match name {
                    Some(name) => name,
                    None => self.lookup_user_name(&id).await,
                };
                self.session.set_user_id(id.as_str());
                self.session.set_user_name(name.as_str());
                println!("Current user: {} {}", id, name);
            }
            SessionCommand::ClearUser => {
                self.session.clear_user();
                println!("User cleared");
            }
            SessionCommand::ClearAll => {
                self.session.clear_all();
                println!("Session cleared");
            }
            SessionCommand::ScanMode { mode } => {
                self.session.set_scan_mode(mode);
                println!("Scan mode set to {}", mode);
            }
        }
        self.persist().await
    }

    /// Name of `id` on the backend; empty when it cannot be found
    async fn lookup_user_name(&self, id: &str) -> String {
        let lookup = async { self.client()?.get_user_list().await.map_err(anyhow::Error::from) };
        match lookup.await {
            Ok(users) => match users.into_iter().find(|entry| entry.user.id == id) {
                Some(entry) => entry.user.name,
                None => {
                    warn!("User {} is not registered on the backend", id);
                    String::new()
                }
            },
            Err(e) => {
                warn!("Could not look up user {}: {:#}", id, e);
                String::new()
            }
        }
    }

    async fn users_command(&self, command: UsersCommand) -> Result<()> {
        let client = self.client()?;
        match command {
            UsersCommand::List => {
                let users = client.get_user_list().await?;
                print!("{}", render::users(&users, &self.session.user_id()));
            }
            UsersCommand::Add { name } => {
                let created = client.add_user(&name).await?;
                println!("Added user {} ({})", name, created.id);
            }
            UsersCommand::Remove { id } => {
                client.remove_user(&id).await?;
                println!("Removed user {}", id);
                if self.session.user_id() == id {
                    self.session.clear_user();
                    self.persist().await?;
                    println!("Current user cleared");
                }
            }
            UsersCommand::Rename { id, name } => {
                client.rename_user(&id, &name).await?;
                println!("Renamed user {} to {}", id, name);
                if self.session.user_id() == id {
                    self.session.set_user_name(name.as_str());
                    self.persist().await?;
                }
            }
            UsersCommand::Refresh { id, cookie } => {
                client.refresh_user_cookie(&id, &cookie).await?;
                println!("Cookie updated for {}", id);
            }
            UsersCommand::Auto { id, enabled } => {
                client.update_user_auto(&id, enabled).await?;
                let state = if enabled { "enabled" } else { "disabled" };
                println!("Automatic sign-in {} for {}", state, id);
            }
        }
        Ok(())
    }

    async fn submit(&self, payload: &str, user_id: &str) -> Result<()> {
        let response = self
            .client()?
            .signin(payload, user_id)
            .await
            .context("sign-in failed")?;
        print!("{}", render::signin_response(&response, Utc::now()));
        Ok(())
    }

    async fn scan(&self, args: ScanArgs) -> Result<()> {
        let user_id = if args.dry_run {
            None
        } else {
            Some(self.submitting_user(args.user.clone())?)
        };

        let kind = if args.native {
            ScannerKind::Native
        } else if args.image.is_some() {
            ScannerKind::Photo
        } else if args.frames.is_some() {
            ScannerKind::Camera
        } else {
            ScannerKind::select(
                self.session.scan_mode(),
                self.config.prefer_native,
                native_available(),
            )
        };
        info!("Scanning with the {} scanner", kind);

        let (scanner, target) = self.build_scanner(kind, args)?;
        let payload = tokio::select! {
            result = scan_once(&scanner, target) => result?,
            _ = tokio::signal::ctrl_c() => {
                scanner.stop().await;
                bail!("scan interrupted");
            }
        };
        println!("Scanned: {}", payload);

        match user_id {
            Some(user_id) => self.submit(&payload, &user_id).await,
            None => Ok(()),
        }
    }

    fn build_scanner(&self, kind: ScannerKind, args: ScanArgs) -> Result<(Scanner, ScanTarget)> {
        match kind {
            ScannerKind::Camera => {
                let dir = args
                    .frames
                    .ok_or_else(|| anyhow!("Camera scanning needs a frame directory (--frames <dir>)"))?;
                let frames = FrameSequence::from_dir(&dir)
                    .with_context(|| format!("failed to open frames in {}", dir.display()))?;
                Ok((
                    Scanner::camera(self.config.scan_interval()),
                    ScanTarget::Frames(Box::new(frames)),
                ))
            }
            ScannerKind::Photo => {
                let path = args
                    .image
                    .ok_or_else(|| anyhow!("Photo scanning needs an image (--image <path>)"))?;
                Ok((Scanner::photo(), ScanTarget::Image(path)))
            }
            ScannerKind::Native => {
                let plugin = Arc::new(ZbarPlugin::new(&self.config.video_device));
                let native = NativeScanner::new(plugin)
                    .with_settings_prompt(Box::new(confirm_open_settings));
                Ok((Scanner::Native(native), ScanTarget::Device))
            }
        }
    }

    async fn history(&self, command: HistoryCommand) -> Result<()> {
        let client = self.client()?;
        let now = Utc::now();
        match command {
            HistoryCommand::Signin(filters) => {
                let entries = client.get_signin_history(&query(filters)).await?;
                print!("{}", render::signin_history(&entries, now));
            }
            HistoryCommand::Scan(filters) => {
                let entries = client.get_scan_history(&query(filters)).await?;
                print!("{}", render::scan_history(&entries, now));
            }
        }
        Ok(())
    }
}

fn query(filters: HistoryArgs) -> HistoryQuery {
    HistoryQuery {
        count: filters.count,
        user_id: filters.user,
        index: filters.index,
    }
}

/// Ask on the terminal whether to open the camera settings
fn confirm_open_settings() -> bool {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return false;
    }

    eprint!("Camera permission denied. Open settings? [y/N] ");
    let _ = std::io::stderr().flush();
    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
