//! Embeddable robot widget.
//!
//! A [`Widget`] ties one [`RobotPersona`] to a chat session and to the
//! cross-frame channel of the iframe it runs in. Opening and closing the
//! panel signals the host and asks it to resize; state changes forced by the
//! host are applied silently.

pub mod channel;
pub mod layout;
pub mod persona;
pub mod protocol;

pub use channel::{
    ChannelOptions, DetachedFrame, ForwardingFrame, InboundMessage, OriginPolicy, ParentFrame,
    WidgetChannel,
};
pub use layout::{DeviceClass, SizeTable, WidgetSize};
pub use persona::{RobotPersona, RobotSlug};
pub use protocol::{HostCommand, ResizeAction, WidgetEvent, WidgetStatus, WireFormat};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::{ChatBackend, ChatSession, SubmitOutcome};

/// Viewport assumed until the host reports one.
const DEFAULT_VIEWPORT: WidgetSize = WidgetSize::new(1280, 800);

/// One robot widget.
#[derive(Debug)]
pub struct Widget {
    session: ChatSession,
    channel: Arc<WidgetChannel>,
    sizes: SizeTable,
    device: DeviceClass,
    viewport: WidgetSize,
    open: AtomicBool,
}

impl Widget {
    /// Widget for `persona`, sending chat through `backend`.
    #[must_use]
    pub fn new(
        persona: RobotPersona,
        backend: Arc<dyn ChatBackend>,
        channel: WidgetChannel,
        max_message_chars: usize,
    ) -> Self {
        Self {
            session: ChatSession::new(persona, backend, max_message_chars),
            channel: Arc::new(channel),
            sizes: SizeTable::default(),
            device: DeviceClass::Desktop,
            viewport: DEFAULT_VIEWPORT,
            open: AtomicBool::new(false),
        }
    }

    /// Size for the given user agent and viewport.
    #[must_use]
    pub fn with_device(mut self, user_agent: &str, viewport: WidgetSize) -> Self {
        self.device = DeviceClass::from_user_agent(user_agent);
        self.viewport = viewport;
        self
    }

    /// Replace the size table.
    #[must_use]
    pub const fn with_sizes(mut self, sizes: SizeTable) -> Self {
        self.sizes = sizes;
        self
    }

    /// Persona shown.
    #[must_use]
    pub const fn persona(&self) -> &RobotPersona {
        self.session.persona()
    }

    /// Chat transcript and request lifecycle.
    #[must_use]
    pub const fn session(&self) -> &ChatSession {
        &self.session
    }

    /// Cross-frame channel.
    #[must_use]
    pub fn channel(&self) -> &WidgetChannel {
        &self.channel
    }

    /// Whether the chat panel is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn resize(&self, action: ResizeAction) {
        let request = self.sizes.resize_request(action, self.device, self.viewport);
        let _ = self.channel.request_resize(request);
    }

    /// Report readiness and initial size to the host.
    pub fn mount(&self) {
        let _ = self.channel.notify_parent(WidgetStatus::Ready);
        self.resize(ResizeAction::Init);
        tracing::debug!(robot = %self.persona().slug, "widget mounted");
    }

    /// Button press: signal the click and toggle the panel.
    pub fn click(&self) -> bool {
        let _ = self.channel.notify_robot_clicked();
        if self.is_open() {
            let _ = self.close();
            false
        } else {
            let _ = self.open();
            true
        }
    }

    /// Open the panel. Returns false if it was already open.
    pub fn open(&self) -> bool {
        if self.open.swap(true, Ordering::SeqCst) {
            return false;
        }
        let _ = self.channel.notify_open_chatbox();
        self.resize(ResizeAction::Expand);
        true
    }

    /// Close the panel. Returns false if it was already closed.
    pub fn close(&self) -> bool {
        if !self.open.swap(false, Ordering::SeqCst) {
            return false;
        }
        let _ = self.channel.notify_close_chatbox();
        self.resize(ResizeAction::Collapse);
        true
    }

    /// Close the panel and tell the host the widget is gone.
    pub fn dismiss(&self) {
        let _ = self.close();
        let _ = self.channel.notify_widget_closed();
    }

    /// Apply a host command without signaling back.
    pub fn apply_host_command(&self, command: HostCommand) {
        self.open.store(command.opens(), Ordering::SeqCst);
        tracing::debug!(robot = %self.persona().slug, ?command, "host command applied");
    }

    /// Validate a raw host message, run the channel handlers and apply it.
    pub fn handle_host_message(&self, message: &InboundMessage) -> Option<HostCommand> {
        let command = self.channel.handle_inbound(message)?;
        self.apply_host_command(command);
        Some(command)
    }

    /// Apply host messages from `rx` until the sender side closes.
    pub fn spawn_listener(self: Arc<Self>, mut rx: mpsc::Receiver<InboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                let _ = self.handle_host_message(&message);
            }
        })
    }

    /// Submit user text to the robot.
    pub async fn send(&self, text: &str) -> SubmitOutcome {
        self.session.submit(text).await
    }
}

/// Several widgets on one page, at most one with an open panel.
#[derive(Debug, Default)]
pub struct WidgetManager {
    widgets: DashMap<RobotSlug, Arc<Widget>>,
}

impl WidgetManager {
    /// Empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a widget, replacing one with the same slug.
    pub fn insert(&self, widget: Widget) -> Arc<Widget> {
        let widget = Arc::new(widget);
        let _ = self
            .widgets
            .insert(widget.persona().slug.clone(), Arc::clone(&widget));
        widget
    }

    /// Widget for `slug`.
    #[must_use]
    pub fn get(&self, slug: &RobotSlug) -> Option<Arc<Widget>> {
        self.widgets.get(slug).map(|entry| Arc::clone(entry.value()))
    }

    /// Number of widgets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    /// Whether no widget is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    fn all(&self) -> Vec<Arc<Widget>> {
        self.widgets
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    /// Open the panel of `slug`, closing every other one first.
    pub fn open(&self, slug: &RobotSlug) -> bool {
        let Some(target) = self.get(slug) else {
            return false;
        };
        for widget in self.all() {
            if widget.persona().slug != *slug {
                let _ = widget.close();
            }
        }
        target.open()
    }

    /// Toggle the panel of `slug` the way a button press does.
    pub fn click(&self, slug: &RobotSlug) -> bool {
        let Some(target) = self.get(slug) else {
            return false;
        };
        if target.is_open() {
            let _ = target.channel().notify_robot_clicked();
            let _ = target.close();
            false
        } else {
            let _ = target.channel().notify_robot_clicked();
            self.open(slug)
        }
    }

    /// Slug of the widget whose panel is open.
    #[must_use]
    pub fn open_panel(&self) -> Option<RobotSlug> {
        self.all()
            .into_iter()
            .find(|widget| widget.is_open())
            .map(|widget| widget.persona().slug.clone())
    }

    /// Close every panel.
    pub fn close_all(&self) {
        for widget in self.all() {
            let _ = widget.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::chat::request::tests::ScriptedBackend;
    use crate::widget::channel::PostedMessage;
    use crate::widget::persona::presets;

    fn embedded(persona: RobotPersona) -> (Widget, mpsc::UnboundedReceiver<PostedMessage>) {
        let (frame, rx) = ForwardingFrame::new();
        let channel = WidgetChannel::new(Arc::new(frame), ChannelOptions::default());
        let backend = ScriptedBackend::echo(Duration::ZERO, 4);
        (Widget::new(persona, backend, channel, 1000), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<PostedMessage>) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();
        while let Ok(posted) = rx.try_recv() {
            messages.push(posted.message);
        }
        messages
    }

    #[test]
    fn open_and_close_signal_and_resize() {
        let (widget, mut rx) = embedded(presets::zzen());
        widget.mount();
        assert!(widget.open());
        assert!(!widget.open());
        assert!(widget.close());

        let messages = drain(&mut rx);
        assert_eq!(messages[0], json!("widget-ready"));
        assert_eq!(messages[1]["action"], "init");
        assert_eq!(messages[2], json!("openChatbox"));
        assert_eq!(messages[3]["action"], "expand");
        assert_eq!(messages[3]["width"], 400);
        assert_eq!(messages[4], json!("closeChatbox"));
        assert_eq!(messages[5]["action"], "collapse");
        assert_eq!(messages.len(), 6);
    }

    #[test]
    fn click_toggles_and_reports() {
        let (widget, mut rx) = embedded(presets::olivia());
        assert!(widget.click());
        assert!(widget.is_open());
        assert!(!widget.click());
        assert!(!widget.is_open());

        let tokens: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(serde_json::Value::is_string)
            .collect();
        assert_eq!(
            tokens,
            vec![
                json!("robotClicked"),
                json!("openChatbox"),
                json!("robotClicked"),
                json!("closeChatbox")
            ]
        );
    }

    #[test]
    fn host_commands_do_not_echo() {
        let (widget, mut rx) = embedded(presets::kalkan());
        let origin = "https://shop.example";
        assert_eq!(
            widget.handle_host_message(&InboundMessage::new(origin, json!("forceOpenChatbox"))),
            Some(HostCommand::ForceOpenChatbox)
        );
        assert!(widget.is_open());
        widget.apply_host_command(HostCommand::ForceCloseChatbox);
        assert!(!widget.is_open());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn host_commands_run_channel_handlers() {
        let opened = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let (frame, mut rx) = ForwardingFrame::new();
        let channel = WidgetChannel::new(Arc::new(frame), ChannelOptions::default())
            .on_open({
                let opened = Arc::clone(&opened);
                move || {
                    opened.fetch_add(1, Ordering::SeqCst);
                }
            })
            .on_close({
                let closed = Arc::clone(&closed);
                move || {
                    closed.fetch_add(1, Ordering::SeqCst);
                }
            });
        let widget = Widget::new(
            presets::zzen(),
            ScriptedBackend::echo(Duration::ZERO, 0),
            channel,
            1000,
        );

        let origin = "https://h";
        assert_eq!(
            widget.handle_host_message(&InboundMessage::new(origin, json!("openWidget"))),
            Some(HostCommand::OpenWidget)
        );
        assert_eq!(opened.load(Ordering::SeqCst), 1);
        assert!(widget.is_open());

        let _ = widget.handle_host_message(&InboundMessage::new(origin, json!("closeWidget")));
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(!widget.is_open());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn mobile_panels_fill_viewport() {
        let (widget, mut rx) = embedded(presets::ana_robot());
        let widget = widget.with_device("Mozilla/5.0 (Linux; Android 14)", WidgetSize::new(412, 915));
        assert!(widget.open());
        let resize = drain(&mut rx).pop().unwrap();
        assert_eq!(resize["width"], 412);
        assert_eq!(resize["height"], 915);
    }

    #[test]
    fn manager_keeps_one_panel_open() {
        let manager = WidgetManager::new();
        let (zzen, _zzen_rx) = embedded(presets::zzen());
        let (olivia, _olivia_rx) = embedded(presets::olivia());
        let zzen = manager.insert(zzen);
        let olivia = manager.insert(olivia);

        assert!(manager.open(&zzen.persona().slug));
        assert!(manager.click(&olivia.persona().slug));
        assert!(!zzen.is_open());
        assert!(olivia.is_open());
        assert_eq!(manager.open_panel(), Some(olivia.persona().slug.clone()));

        manager.close_all();
        assert!(manager.open_panel().is_none());
        assert_eq!(manager.len(), 2);
        assert!(!manager.open(&RobotSlug::new("missing").unwrap()));
    }

    #[tokio::test]
    async fn send_goes_through_session() {
        let (widget, _rx) = embedded(presets::zzen());
        let outcome = widget.send("selam").await;
        assert!(matches!(outcome, SubmitOutcome::Replied { .. }));
        assert_eq!(
            widget.session().messages().last().unwrap().text,
            "yanıt: selam"
        );
    }
}
