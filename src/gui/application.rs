use futures::channel::mpsc::Sender;
use futures::SinkExt;
use iced::{Alignment, Application, Command, Element, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::theme::{self, Theme};
use iced::widget::{Space, button, column, container, horizontal_rule, text};
use iced::window::icon;
use log::{error, info, warn};
use tokio_util::sync::{CancellationToken};

use crate::config::io::{ConfigIO};
use crate::config::types::Config;
use crate::device::connection::connect_device_subscription;
use crate::device::constants::CIRCLE_SIZE;
use crate::device::controller::LinkSettings;
use crate::device::types::{CircleStyle, DeviceCommand, DeviceEvent, DeviceState};
use crate::error::AppRunError;
use crate::gui::executor::MyExecutor;
use crate::gui::style::CircleStyleSheet;
use crate::gui::types::Message;

pub struct ApplicationFlags {
    pub config_io: ConfigIO,
    // scan as soon as the sensor link is ready, regardless of the config
    pub scan_on_start: bool,
}

pub struct MyApplication {
    // this token is cancelled upon exit
    app_cancel: CancellationToken,

    // messages that the user must click away
    notices: Vec<String>,

    config_io: ConfigIO,
    config: Config,
    // the sensor link is started once the config has been loaded
    config_loaded: bool,
    scan_on_start: bool,

    // commands to the sensor link, available once it is running
    command_sender: Option<Sender<DeviceCommand>>,

    // latest state from the device
    latest_device_state: DeviceState,
    circle: CircleStyle,
}

/// Applies a reading to the displayed circle. Sizes that are not a number are ignored and the
/// previous circle stays, like an invalid length assigned to a style property.
fn apply_circle(current: CircleStyle, reading: CircleStyle) -> CircleStyle {
    if reading.is_finite() {
        reading
    } else {
        current
    }
}

/// Returns the outer diameter and the border width of the drawn circle, in pixels.
///
/// A negative border (more pressure than the range covers) is not drawn, so the filled part
/// grows past the nominal size. A border wider than the radius fills the whole circle.
fn circle_geometry(circle: CircleStyle, unit: f32) -> (f32, f32) {
    let border = circle.border.max(0.0);
    let outer = (circle.size + 2.0 * border) as f32 * unit;
    let border_width = (border as f32 * unit).min(outer / 2.0);
    (outer, border_width)
}

fn initial_circle() -> CircleStyle {
    CircleStyle { size: 0.0, border: CIRCLE_SIZE / 2.0 }
}

impl MyApplication {
    fn before_close(&mut self) {
        self.app_cancel.cancel();
    }

    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();

        let fut = async move {
            match config_io.load_or_init().await {
                Ok(config) => (config, None),
                Err(err) => {
                    error!("Failed to load config: {:?}", &err);
                    let message = format!("Failed to load config {}: {}", config_io.path().to_string_lossy(), &err);
                    (Config::default(), Some(message))
                }
            }
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn send_command(&self, command: DeviceCommand) -> Command<Message> {
        let Some(mut sender) = self.command_sender.clone() else {
            warn!("Sensor link is not ready, ignoring {:?}", command);
            return Command::none();
        };

        let fut = async move {
            match sender.send(command).await {
                Ok(_) => true,
                Err(err) => {
                    error!("Failed to send {:?} to the sensor link: {:?}", command, err);
                    false
                },
            }
        };

        Command::perform(fut, Message::CommandSent)
    }
}

impl Application for MyApplication {
    type Executor = MyExecutor;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (MyApplication, Command<Self::Message>) {
        let app = MyApplication {
            app_cancel: CancellationToken::new(),
            notices: Vec::new(),
            config_io: flags.config_io,
            config: Config::default(),
            config_loaded: false,
            scan_on_start: flags.scan_on_start,
            command_sender: None,
            latest_device_state: DeviceState::Idle,
            circle: initial_circle(),
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        String::from(concat!("DLG-CAP Link ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((config, error_message)) => {
                info!("Config load complete");
                self.scan_on_start = self.scan_on_start || config.scan_on_start;
                self.config = config;
                self.config_loaded = true;
                if let Some(error_message) = error_message {
                    self.notices.push(error_message);
                }
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                self.before_close();
                return window::close(id);
            },
            Message::DeviceEvent(DeviceEvent::Ready(sender)) => {
                info!("Sensor link ready");
                self.command_sender = Some(sender);
                if self.scan_on_start {
                    return self.send_command(DeviceCommand::Scan);
                }
            },
            Message::DeviceEvent(DeviceEvent::StateChange(state)) => {
                if !state.is_connected() {
                    self.circle = initial_circle();
                }
                self.latest_device_state = state;
            },
            Message::DeviceEvent(DeviceEvent::Reading(reading)) => {
                self.circle = apply_circle(self.circle, reading.circle);
            },
            Message::DeviceEvent(DeviceEvent::Alert(message)) => {
                self.notices.push(message);
            },
            Message::ScanPress => {
                return self.send_command(DeviceCommand::Scan);
            },
            Message::DisconnectPress => {
                return self.send_command(DeviceCommand::Disconnect);
            },
            Message::CommandSent(false) => {
                self.command_sender = None;
            },

            _ => {}
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            event::listen().map(Message::EventOccurred),
        ];

        if self.config_loaded {
            subscriptions.push(
                connect_device_subscription(
                    self.app_cancel.clone(),
                    LinkSettings::from(&self.config),
                ).map(Message::DeviceEvent)
            );
        }

        Subscription::batch(subscriptions)
    }

    fn view(&self) -> Element<Message> {
        if let Some(notice) = self.notices.first() {
            return container(
                column![
                    text(notice),

                    button(text("Okay"))
                        .on_press(Message::NoticeConfirmed),

                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let affordances = self.latest_device_state.affordances();
        let unit = self.config.circle_unit;

        let control: Element<Message> = if affordances.disconnect_control {
            button(text("Disconnect"))
                .style(theme::Button::Destructive)
                .on_press(Message::DisconnectPress)
                .into()
        } else if affordances.scan_control {
            let mut scan_button = button(text("Scan"))
                .style(theme::Button::Primary);
            if affordances.scan_enabled && self.command_sender.is_some() {
                scan_button = scan_button.on_press(Message::ScanPress);
            }
            scan_button.into()
        } else {
            Space::with_height(0).into()
        };

        let (outer, border_width) = circle_geometry(self.circle, unit);
        let circle = container(Space::new(Length::Fill, Length::Fill))
            .width(outer)
            .height(outer)
            .style(theme::Container::Custom(Box::new(CircleStyleSheet {
                border_width,
                radius: outer / 2.0,
            })));

        container(
            column![
                text(affordances.device_text),
                control,
                horizontal_rule(10),
                circle,
            ]
                .spacing(20)
                .width(Length::Fill)
                .align_items(Alignment::Center),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

fn make_icon() -> icon::Icon {
    let bytes = include_bytes!(concat!(env!("OUT_DIR"), "/icon-32-rgba"));
    let bytes = bytes.to_vec();
    icon::from_rgba(bytes, 32, 32).expect("Failed to load window icon")
}

pub fn run_application(flags: ApplicationFlags) -> Result<(), AppRunError> {
    let mut config_io = flags.config_io.clone();
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested)
    settings.id = Some("dlg-cap-link".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(400.0, 420.0);
    settings.window.resizable = false;
    settings.window.icon = Some(make_icon());

    // this function will call process::exit() unless there was a startup error
    MyApplication::run(settings)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_circle_keeps_previous_on_nan() {
        let current = CircleStyle { size: 25.0, border: 12.5 };
        let nan = CircleStyle { size: f64::NAN, border: f64::NAN };
        assert_eq!(apply_circle(current, nan), current);

        let next = CircleStyle { size: 40.0, border: 5.0 };
        assert_eq!(apply_circle(current, next), next);
    }

    #[test]
    fn test_circle_geometry_within_range() {
        // half pressure: a 25 wide fill inside a 12.5 ring
        let circle = CircleStyle::from_normalized(0.5);
        assert_eq!(circle_geometry(circle, 4.0), (200.0, 50.0));

        assert_eq!(circle_geometry(initial_circle(), 2.0), (100.0, 50.0));
    }

    #[test]
    fn test_circle_geometry_grows_past_range() {
        // raw -490 normalizes to 1.2
        let circle = CircleStyle::from_normalized(1.2);
        assert!(circle.border < 0.0);

        let (outer, border_width) = circle_geometry(circle, 4.0);
        assert!((outer - 240.0).abs() < 1e-3);
        assert_eq!(border_width, 0.0);
    }

    #[test]
    fn test_circle_geometry_below_range() {
        // raw above the maximum: the ring covers the whole circle, which keeps its size
        let circle = CircleStyle::from_normalized(-0.2);
        let (outer, border_width) = circle_geometry(circle, 1.0);
        assert!((outer - CIRCLE_SIZE as f32).abs() < 1e-3);
        assert_eq!(border_width, outer / 2.0);
    }

    #[test]
    fn test_initial_circle_is_empty() {
        let circle = initial_circle();
        assert_eq!(circle.size, 0.0);
        assert_eq!(circle.border * 2.0, CIRCLE_SIZE);
    }
}
