//! In-memory data behind the development backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use dashmap::DashMap;

use crate::api::models::{PdfType, Robot, RobotPdf, User};
use crate::widget::persona::presets;

/// Default port.
pub const DEFAULT_PORT: u16 = 8000;

const PORT_ENV: &str = "SIDREX_MOCK_PORT";
const CHAT_DELAY_ENV: &str = "SIDREX_MOCK_CHAT_DELAY_MS";

/// Settings for the development backend.
#[derive(Clone, Debug)]
pub struct MockConfig {
    /// Listen port.
    pub port: u16,
    /// Artificial latency of every chat reply.
    pub chat_delay: Duration,
    /// Replies slower than this answer 504, like the production gateway.
    pub gateway_timeout: Duration,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            chat_delay: Duration::ZERO,
            gateway_timeout: Duration::from_secs(55),
        }
    }
}

impl MockConfig {
    /// Defaults overridden by `SIDREX_MOCK_PORT` and `SIDREX_MOCK_CHAT_DELAY_MS`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(port) = std::env::var(PORT_ENV).ok().and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(ms) = std::env::var(CHAT_DELAY_ENV)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.chat_delay = Duration::from_millis(ms);
        }
        config
    }

    /// Set the chat latency.
    #[must_use]
    pub const fn with_chat_delay(mut self, delay: Duration) -> Self {
        self.chat_delay = delay;
        self
    }

    /// Set the gateway timeout.
    #[must_use]
    pub const fn with_gateway_timeout(mut self, timeout: Duration) -> Self {
        self.gateway_timeout = timeout;
        self
    }
}

/// A stored account.
#[derive(Clone, Debug)]
pub struct Account {
    /// Password in clear; this backend is for local use only.
    pub password: String,
    /// Public user record.
    pub user: User,
}

/// Shared state of the development backend.
#[derive(Debug)]
pub struct MockState {
    /// Active settings.
    pub config: MockConfig,
    /// Accounts by username.
    pub accounts: DashMap<String, Account>,
    /// Session id to username.
    pub sessions: DashMap<String, String>,
    /// Robots in id order.
    pub robots: Vec<Robot>,
    /// Opening messages per robot id.
    pub robot_messages: DashMap<u64, Vec<String>>,
    /// PDFs by id.
    pub pdfs: DashMap<u64, RobotPdf>,
    next_user_id: AtomicU64,
    chat_calls: AtomicUsize,
}

impl MockState {
    /// Seeded state: an admin, a premium brand user, every preset robot and
    /// a few PDFs.
    #[must_use]
    pub fn new(config: MockConfig) -> Arc<Self> {
        let robots: Vec<Robot> = presets::all()
            .into_iter()
            .zip(1_u64..)
            .map(|(persona, id)| Robot {
                id,
                name: persona.name,
                product_name: persona.slug.as_str().to_string(),
                brand_id: Some(1),
                brand_name: Some("Sidrex".to_string()),
                slug: Some(persona.slug.as_str().to_string()),
                pdf_count: Some(0),
                active_pdf_count: Some(0),
            })
            .collect();

        let robot_messages = DashMap::new();
        for persona in presets::all() {
            if let Some(robot) = robots
                .iter()
                .find(|r| r.slug.as_deref() == Some(persona.slug.as_str()))
            {
                let _ = robot_messages.insert(robot.id, persona.bubble_messages);
            }
        }

        let pdfs = DashMap::new();
        for (id, robot, file, pdf_type, active) in [
            (1, 1, "sidrex-genel.pdf", PdfType::Bilgi, true),
            (2, 1, "sidrex-kurallar.pdf", PdfType::Kural, true),
            (3, 4, "zzen-bilgi.pdf", PdfType::Bilgi, true),
            (4, 4, "zzen-eski.pdf", PdfType::Bilgi, false),
        ] {
            let _ = pdfs.insert(
                id,
                RobotPdf {
                    id,
                    robot: Some(robot),
                    file_name: file.to_string(),
                    is_active: active,
                    pdf_type,
                    file_size: Some(4096),
                    ..RobotPdf::default()
                },
            );
        }

        let state = Self {
            config,
            accounts: DashMap::new(),
            sessions: DashMap::new(),
            robots,
            robot_messages,
            pdfs,
            next_user_id: AtomicU64::new(1),
            chat_calls: AtomicUsize::new(0),
        };
        state.add_account("admin", "admin123", |user| {
            user.is_staff = true;
            user.is_superuser = true;
        });
        state.add_account("marka", "marka123", |user| {
            user.brand_id = Some(1);
            user.brand_name = Some("Sidrex".to_string());
            user.brand_package_type = Some("premium".to_string());
        });
        Arc::new(state)
    }

    /// Create an account. Returns the new user.
    pub fn add_account(
        &self,
        username: &str,
        password: &str,
        customize: impl FnOnce(&mut User),
    ) -> User {
        let mut user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: username.to_string(),
            email: format!("{username}@sidrex.local"),
            is_active: true,
            ..User::default()
        };
        customize(&mut user);
        let _ = self.accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Robot by numeric id or slug.
    #[must_use]
    pub fn robot(&self, key: &str) -> Option<Robot> {
        let by_id = key.parse::<u64>().ok();
        self.robots
            .iter()
            .find(|robot| Some(robot.id) == by_id || robot.slug.as_deref() == Some(key))
            .map(|robot| self.with_counts(robot.clone()))
    }

    /// All robots.
    #[must_use]
    pub fn list_robots(&self) -> Vec<Robot> {
        self.robots
            .iter()
            .map(|robot| self.with_counts(robot.clone()))
            .collect()
    }

    fn with_counts(&self, mut robot: Robot) -> Robot {
        let owned: Vec<bool> = self
            .pdfs
            .iter()
            .filter(|pdf| pdf.robot == Some(robot.id))
            .map(|pdf| pdf.is_active)
            .collect();
        robot.pdf_count = u32::try_from(owned.len()).ok();
        robot.active_pdf_count = u32::try_from(owned.iter().filter(|a| **a).count()).ok();
        robot
    }

    /// Start a session for `username`. Returns the session id.
    pub fn open_session(&self, username: &str) -> String {
        let session = uuid::Uuid::new_v4().simple().to_string();
        let _ = self.sessions.insert(session.clone(), username.to_string());
        session
    }

    /// User owning `session`.
    #[must_use]
    pub fn session_user(&self, session: &str) -> Option<User> {
        let username = self.sessions.get(session)?.value().clone();
        self.accounts.get(&username).map(|a| a.user.clone())
    }

    /// Record a chat call. Returns the new count.
    pub fn count_chat_call(&self) -> usize {
        self.chat_calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Chat calls received so far.
    #[must_use]
    pub fn chat_calls(&self) -> usize {
        self.chat_calls.load(Ordering::SeqCst)
    }
}
